//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - turns them into config structs
//! - runs the matching pipeline
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{Command, DownloadArgs, ExtractArgs, IngestArgs, SimulateArgs};
use crate::data::{DataClient, dataset_files};
use crate::domain::{DatasetVariant, ExtractConfig, IngestConfig, SampleConfig, SnrCut, SolverOptions};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `lcfeat` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Ingest(args) => handle_ingest(args),
        Command::Download(args) => handle_download(args),
        Command::Extract(args) => handle_extract(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_ingest(args: IngestArgs) -> Result<(), AppError> {
    let config = ingest_config_from_args(&args);
    let run = pipeline::run_ingest(&config)?;
    print!("{}", crate::report::format_ingest_summary(&run, config.timed));
    Ok(())
}

fn handle_download(args: DownloadArgs) -> Result<(), AppError> {
    let variants = match args.variant {
        Some(v) => vec![v],
        None => vec![DatasetVariant::Full, DatasetVariant::Reduced],
    };
    let names = dataset_files(args.survey, &variants);
    let client = DataClient::new(&args.base_url)?;
    let files = client.fetch_all(&names, &args.data_dir)?;
    print!("{}", crate::report::format_download_summary(&files));
    Ok(())
}

fn handle_extract(args: ExtractArgs) -> Result<(), AppError> {
    let config = extract_config_from_args(&args)?;
    let run = pipeline::run_extract(&config)?;

    println!("{}", crate::report::format_extract_summary(&run, &config));

    if let Some(path) = &config.export {
        crate::io::write_features_csv(
            path,
            config.survey,
            &run.dataset.table.ids(),
            &run.extraction.features,
            Some(run.dataset.labels.as_slice()),
        )?;
        println!("Features written to {}", path.display());
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = sample_config_from_args(&args);
    let collection = pipeline::run_simulate(&config, &args.out)?;
    print!("{}", crate::report::format_sample_summary(&collection, &config));
    Ok(())
}

pub fn ingest_config_from_args(args: &IngestArgs) -> IngestConfig {
    IngestConfig {
        directories: args.directories.clone(),
        survey: args.survey,
        out_dir: args.out_dir.clone(),
        timed: args.timed,
    }
}

pub fn extract_config_from_args(args: &ExtractArgs) -> Result<ExtractConfig, AppError> {
    if let Some(f) = args.fraction {
        if !(f.is_finite() && (0.0..=1.0).contains(&f)) {
            return Err(AppError::new(2, format!("--fraction must be in [0, 1], got {f}.")));
        }
    }
    if args.max_evaluations == 0 {
        return Err(AppError::new(2, "--max-evaluations must be > 0."));
    }
    for (name, tol) in [("ftol", args.ftol), ("xtol", args.xtol), ("gtol", args.gtol)] {
        if !(tol.is_finite() && tol >= 0.0) {
            return Err(AppError::new(2, format!("--{name} must be finite and >= 0.")));
        }
    }

    Ok(ExtractConfig {
        data_dir: args.data_dir.clone(),
        survey: args.survey,
        split: args.split,
        variant: args.variant,
        fraction: args.fraction,
        snr_cut: args.min_snr.map(|min_snr| SnrCut {
            min_snr,
            min_count: args.min_count,
        }),
        solver: SolverOptions {
            max_evaluations: args.max_evaluations,
            ftol: args.ftol,
            xtol: args.xtol,
            gtol: args.gtol,
        },
        export: args.export.clone(),
    })
}

pub fn sample_config_from_args(args: &SimulateArgs) -> SampleConfig {
    SampleConfig {
        survey: args.survey,
        count: args.count,
        seed: args.seed,
        noise: args.noise,
        dropout: args.dropout,
        epochs_per_band: args.epochs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn extract_args(argv: &[&str]) -> ExtractArgs {
        let mut full = vec!["lcfeat", "extract"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Extract(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn snr_cut_is_off_unless_requested() {
        let config = extract_config_from_args(&extract_args(&[])).unwrap();
        assert!(config.snr_cut.is_none());
        assert_eq!(config.solver, SolverOptions::default());

        let config = extract_config_from_args(&extract_args(&["--min-snr", "5", "--min-count", "4"])).unwrap();
        assert_eq!(
            config.snr_cut,
            Some(SnrCut {
                min_snr: 5.0,
                min_count: 4
            })
        );
    }

    #[test]
    fn bad_fraction_is_a_config_error() {
        let err = extract_config_from_args(&extract_args(&["--fraction", "2"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
