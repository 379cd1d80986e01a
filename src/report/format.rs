//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline code only computes, and output changes
//! stay in one file.

use crate::app::pipeline::{ExtractRun, IngestRun};
use crate::data::{DownloadStatus, DownloadedFile};
use crate::domain::{ExtractConfig, RecordCollection, SampleConfig};
use crate::report::{band_summaries, label_counts};

/// One line per directory, plus the timing line when requested.
pub fn format_ingest_summary(run: &IngestRun, timed: bool) -> String {
    let mut out = String::new();
    for o in &run.outcomes {
        out.push_str(&format!(
            "SN data from {} processed ({} table pairs, {} train, {} target)\n",
            o.directory.display(),
            o.table_pairs,
            o.train,
            o.target
        ));
        for path in &o.written {
            out.push_str(&format!("  -> {}\n", path.display()));
        }
    }
    if timed {
        out.push_str(&format!(
            "Light curves serialized in {:.1} seconds\n",
            run.elapsed.as_secs_f64()
        ));
    }
    out
}

pub fn format_download_summary(files: &[DownloadedFile]) -> String {
    let mut out = String::new();
    for f in files {
        match f.status {
            DownloadStatus::Fetched { bytes } => {
                out.push_str(&format!("{:<28} saved as {} ({bytes} bytes)\n", f.name, f.path.display()));
            }
            DownloadStatus::AlreadyPresent => {
                out.push_str(&format!("{:<28} already present\n", f.name));
            }
        }
    }
    out
}

pub fn format_sample_summary(collection: &RecordCollection, config: &SampleConfig) -> String {
    let ia = collection
        .values()
        .filter(|r| r.header().sn_type == Some(0))
        .count();
    format!(
        "Generated {} {} objects (seed {}): {} Type Ia, {} other\n",
        collection.len(),
        config.survey.name(),
        config.seed,
        ia,
        collection.len() - ia
    )
}

/// Dataset line, per-band fit table, and totals.
pub fn format_extract_summary(run: &ExtractRun, config: &ExtractConfig) -> String {
    let mut out = String::new();

    out.push_str("=== lcfeat - Bazin feature extraction ===\n");
    out.push_str(&format!(
        "Dataset: {}_{} ({:?}) from {}\n",
        config.survey.name(),
        config.split.name(),
        config.variant,
        config.data_dir.display()
    ));
    let (ia, other) = label_counts(&run.dataset.labels);
    out.push_str(&format!(
        "Objects: {} loaded | {} after cut | labels: {ia} Ia / {other} other\n",
        run.loaded,
        run.dataset.len()
    ));
    if let Some(cut) = &config.snr_cut {
        out.push_str(&format!(
            "SNR cut: > {} samples with flux/err > {} in every band\n",
            cut.min_count, cut.min_snr
        ));
    }
    out.push_str(&format!(
        "Features: {} x {}\n\n",
        run.extraction.features.nrows(),
        run.extraction.features.ncols()
    ));

    out.push_str(
        format!(
            "{:<6} {:>8} {:>9} {:>12} {:>12}",
            "band", "fitted", "fallback", "med_tfall", "med_trise"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<8} {:-<9} {:-<12} {:-<12}", "", "", "", "", "").trim_end());
    out.push('\n');
    for s in band_summaries(&run.extraction) {
        out.push_str(
            format!(
                "{:<6} {:>8} {:>9} {:>12} {:>12}",
                s.band,
                s.fitted,
                s.fallback,
                fmt_opt(s.median_tfall),
                fmt_opt(s.median_trise)
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out.push_str(&format!(
        "\nTotal: {} fitted, {} zero-filled\n",
        run.extraction.fitted_count(),
        run.extraction.fallback_count()
    ));
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.3}")).unwrap_or_else(|| "-".to_string())
}
