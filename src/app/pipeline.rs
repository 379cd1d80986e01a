//! Shared workflows behind the CLI commands.
//!
//! - ingest: raw CSV tables → train/target record collections on disk
//! - extract: record collection → dataset → (optional cut) → feature matrix
//! - simulate: seeded synthetic collection on disk
//!
//! Printing stays in `app`/`report`; these functions only compute and write files.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::data::{Dataset, generate_collection, load_dataset};
use crate::domain::{ExtractConfig, IngestConfig, RecordCollection, SampleConfig, Survey};
use crate::error::AppError;
use crate::fit::{Extraction, FeatureExtractor};
use crate::io::{build_record, find_table_pairs, parse_header_row, read_header_file, read_phot_file, write_collection};

/// Records parsed from one simulation directory, routed by the target flag.
#[derive(Debug, Clone, Default)]
pub struct IngestedBatch {
    pub train: RecordCollection,
    pub target: RecordCollection,
    pub table_pairs: usize,
}

/// Result of serializing one directory.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub directory: PathBuf,
    pub table_pairs: usize,
    pub train: usize,
    pub target: usize,
    pub written: Vec<PathBuf>,
}

/// All outcomes of one `ingest` run.
#[derive(Debug, Clone)]
pub struct IngestRun {
    pub outcomes: Vec<IngestOutcome>,
    pub elapsed: Duration,
}

/// All computed outputs of one `extract` run.
#[derive(Debug, Clone)]
pub struct ExtractRun {
    /// Objects loaded before the signal-quality cut.
    pub loaded: usize,
    pub dataset: Dataset,
    pub extraction: Extraction,
}

/// Parse every header/photometry pair in `dir`.
pub fn ingest_directory(dir: &Path, survey: Survey) -> Result<IngestedBatch, AppError> {
    let pairs = find_table_pairs(dir)?;
    let mut batch = IngestedBatch {
        table_pairs: pairs.len(),
        ..IngestedBatch::default()
    };

    for (head_path, phot_path) in &pairs {
        let headers = read_header_file(head_path, survey)?;
        let phot = read_phot_file(phot_path)?;
        log::debug!(
            "{}: {} objects, {} photometry rows",
            head_path.display(),
            headers.len(),
            phot.len()
        );

        for row in &headers {
            let object = parse_header_row(row, phot.len())?;
            let is_target = object.is_target;
            let record = build_record(object, &phot, survey)?;
            let snid = record.snid();
            let dest = if is_target { &mut batch.target } else { &mut batch.train };
            if dest.insert(snid, record).is_some() {
                log::warn!("duplicate SNID {snid} in {}; keeping the last one", dir.display());
            }
        }
    }

    Ok(batch)
}

/// Ingest `dir` and write `<dirname>_train.json.gz` / `<dirname>_target.json.gz`
/// into `out_dir`, skipping empty sets.
pub fn serialize_directory(dir: &Path, survey: Survey, out_dir: &Path) -> Result<IngestOutcome, AppError> {
    if !dir.is_dir() {
        return Err(AppError::new(2, format!("'{}' is not a directory.", dir.display())));
    }
    let stem = directory_stem(dir)?;
    let batch = ingest_directory(dir, survey)?;
    if batch.table_pairs == 0 {
        log::warn!("no *HEAD*.csv / *PHOT*.csv pairs in {}", dir.display());
    }

    let mut written = Vec::new();
    for (kind, collection) in [("train", &batch.train), ("target", &batch.target)] {
        if collection.is_empty() {
            continue;
        }
        let path = out_dir.join(format!("{stem}_{kind}.json.gz"));
        write_collection(&path, collection)?;
        written.push(path);
    }

    Ok(IngestOutcome {
        directory: dir.to_path_buf(),
        table_pairs: batch.table_pairs,
        train: batch.train.len(),
        target: batch.target.len(),
        written,
    })
}

pub fn run_ingest(config: &IngestConfig) -> Result<IngestRun, AppError> {
    if config.directories.is_empty() {
        return Err(AppError::new(2, "No input directories given."));
    }
    std::fs::create_dir_all(&config.out_dir).map_err(|e| {
        AppError::new(2, format!("Failed to create '{}': {e}", config.out_dir.display()))
    })?;

    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(config.directories.len());
    for dir in &config.directories {
        outcomes.push(serialize_directory(dir, config.survey, &config.out_dir)?);
    }
    Ok(IngestRun {
        outcomes,
        elapsed: start.elapsed(),
    })
}

/// Load, optionally cut, and extract features.
pub fn run_extract(config: &ExtractConfig) -> Result<ExtractRun, AppError> {
    let dataset = load_dataset(
        &config.data_dir,
        config.survey,
        config.split,
        config.variant,
        config.fraction,
    )?;
    let loaded = dataset.len();
    let dataset = match &config.snr_cut {
        Some(cut) => {
            let kept = dataset.apply_snr_cut(cut);
            log::info!("signal-quality cut kept {} of {loaded} objects", kept.len());
            kept
        }
        None => dataset,
    };
    if dataset.is_empty() {
        return Err(AppError::new(3, "No objects left to extract features from."));
    }

    let mut extractor = FeatureExtractor::new(config.solver);
    extractor.fit(&dataset.table, &dataset.labels);
    log::info!("fitting {} objects × {} bands", dataset.len(), config.survey.bands().len());
    let extraction = extractor.transform_with_report(&dataset.table);

    Ok(ExtractRun {
        loaded,
        dataset,
        extraction,
    })
}

/// Generate a synthetic collection and write it to `path`.
pub fn run_simulate(config: &SampleConfig, path: &Path) -> Result<RecordCollection, AppError> {
    let collection = generate_collection(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }
    write_collection(path, &collection)?;
    Ok(collection)
}

fn directory_stem(dir: &Path) -> Result<String, AppError> {
    // `canonicalize` resolves `.` and trailing slashes to a real name.
    let resolved = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    resolved
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::new(2, format!("Cannot derive an output name from '{}'.", dir.display())))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::domain::{DatasetVariant, SolverOptions, Split};
    use crate::io::read_collection;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lcfeat-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_tables(dir: &Path) {
        fs::write(
            dir.join("SIM_B01_HEAD.csv"),
            "SNID,SNTYPE,SIM_NON1a,SIM_REDSHIFT_HOST,SIM_PEAKMJD,\
             SIM_PEAKMAG_g,SIM_PEAKMAG_r,SIM_PEAKMAG_i,SIM_PEAKMAG_z,PTROBS_MIN,PTROBS_MAX\n\
             11,1,0,0.3,56010.0,22.0,21.5,21.6,22.1,1,4\n\
             12,-9,2,0.5,56020.0,23.0,22.5,22.4,22.8,4,7\n",
        )
        .unwrap();
        fs::write(
            dir.join("SIM_B01_PHOT.csv"),
            "MJD,FLT,FLUXCAL,FLUXCALERR\n\
             56000,g,1,1\n56001,r,2,1\n56002,q,3,1\n\
             56003,i,4,1\n56004,i,5,1\n56005,z,6,1\n",
        )
        .unwrap();
    }

    #[test]
    fn ingest_routes_train_and_target() {
        let root = scratch("ingest");
        let sims = root.join("SIMS_A");
        fs::create_dir_all(&sims).unwrap();
        write_tables(&sims);

        let batch = ingest_directory(&sims, Survey::Des).unwrap();
        assert_eq!(batch.table_pairs, 1);
        assert_eq!(batch.train.keys().copied().collect::<Vec<_>>(), vec![11]);
        assert_eq!(batch.target.keys().copied().collect::<Vec<_>>(), vec![12]);

        // Rows 0..3 for object 11; the `q` observation is dropped.
        let rec = &batch.train[&11];
        assert_eq!(rec.band('g').unwrap().len(), 1);
        assert_eq!(rec.band('r').unwrap().len(), 1);
        assert_eq!(rec.band('i').unwrap().len(), 0);
        assert_eq!(batch.target[&12].band('i').unwrap().len(), 2);
        assert_eq!(rec.header().pkmag.len(), 4);

        let out = root.join("out");
        fs::create_dir_all(&out).unwrap();
        let outcome = serialize_directory(&sims, Survey::Des, &out).unwrap();
        assert_eq!(outcome.written.len(), 2);
        assert!(out.join("SIMS_A_train.json.gz").is_file());
        let target = read_collection(&out.join("SIMS_A_target.json.gz")).unwrap();
        assert_eq!(target, batch.target);

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn empty_sets_are_not_written() {
        let root = scratch("ingest-empty");
        let sims = root.join("EMPTY");
        fs::create_dir_all(&sims).unwrap();
        let outcome = serialize_directory(&sims, Survey::Des, &root).unwrap();
        assert!(outcome.written.is_empty());
        assert!(!root.join("EMPTY_train.json.gz").exists());
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn simulate_then_extract() {
        let dir = scratch("extract");
        let sample = SampleConfig {
            count: 6,
            noise: 0.5,
            dropout: 0.25,
            ..SampleConfig::default()
        };
        run_simulate(&sample, &dir.join("des_train_mini.json.gz")).unwrap();

        let config = ExtractConfig {
            data_dir: dir.clone(),
            survey: Survey::Des,
            split: Split::Train,
            variant: DatasetVariant::Reduced,
            fraction: None,
            snr_cut: None,
            solver: SolverOptions::default(),
            export: None,
        };
        let run = run_extract(&config).unwrap();
        assert_eq!(run.loaded, 6);
        assert_eq!(run.extraction.features.shape(), (6, 20));
        assert!(run.extraction.features.iter().all(|v| v.is_finite()));
        assert_eq!(run.extraction.fits.len(), run.dataset.labels.len());

        let half = run_extract(&ExtractConfig {
            fraction: Some(0.5),
            ..config
        })
        .unwrap();
        assert_eq!(half.dataset.len(), 3);
        assert_eq!(half.dataset.labels, run.dataset.labels[..3]);

        fs::remove_dir_all(&dir).ok();
    }
}
