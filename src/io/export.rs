//! Export the feature matrix to CSV.
//!
//! One row per object: `snid`, then `label` when labels are known, then the
//! `bands × 5` feature columns (`g_a`, `g_b`, ...).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::DMatrix;

use crate::domain::Survey;
use crate::error::AppError;
use crate::fit::feature_names;

/// Write features (and optional labels) to a CSV file.
pub fn write_features_csv(
    path: &Path,
    survey: Survey,
    ids: &[i64],
    features: &DMatrix<f64>,
    labels: Option<&[u8]>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_features(BufWriter::new(file), survey, ids, features, labels)
}

/// Write features to any writer.
pub fn write_features<W: Write>(
    mut out: W,
    survey: Survey,
    ids: &[i64],
    features: &DMatrix<f64>,
    labels: Option<&[u8]>,
) -> Result<(), AppError> {
    if ids.len() != features.nrows() || labels.is_some_and(|l| l.len() != ids.len()) {
        return Err(AppError::new(
            4,
            format!(
                "Export shape mismatch: {} ids, {} feature rows, {} labels.",
                ids.len(),
                features.nrows(),
                labels.map_or(0, <[u8]>::len)
            ),
        ));
    }
    let names = feature_names(survey);
    if names.len() != features.ncols() {
        return Err(AppError::new(
            4,
            format!("Expected {} feature columns, got {}.", names.len(), features.ncols()),
        ));
    }

    let mut header = String::from("snid");
    if labels.is_some() {
        header.push_str(",label");
    }
    for name in &names {
        header.push(',');
        header.push_str(name);
    }
    writeln!(out, "{header}").map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (k, id) in ids.iter().enumerate() {
        let mut line = id.to_string();
        if let Some(labels) = labels {
            line.push_str(&format!(",{}", labels[k]));
        }
        for v in features.row(k).iter() {
            line.push_str(&format!(",{v:.10}"));
        }
        writeln!(out, "{line}").map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_labels_and_rows() {
        let mut features = DMatrix::<f64>::zeros(2, 20);
        features[(1, 0)] = 1.5;
        let mut buf = Vec::new();
        write_features(&mut buf, Survey::Des, &[7, 9], &features, Some(&[1u8, 0][..])).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("snid,label,g_a,g_b,g_t0"));
        assert!(lines[0].ends_with("z_trise"));
        assert!(lines[1].starts_with("7,1,0.0000000000"));
        assert!(lines[2].starts_with("9,0,1.5000000000"));
        assert_eq!(lines[2].split(',').count(), 22);
    }

    #[test]
    fn labels_are_optional() {
        let features = DMatrix::<f64>::zeros(1, 20);
        let mut buf = Vec::new();
        write_features(&mut buf, Survey::Des, &[3], &features, None).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("snid,g_a"));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let features = DMatrix::<f64>::zeros(2, 20);
        let mut buf = Vec::new();
        let err = write_features(&mut buf, Survey::Des, &[1], &features, None).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
