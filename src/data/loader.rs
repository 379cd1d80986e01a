//! Dataset loading: serialized collection → (table, labels).
//!
//! The type code is split off every record before the table is built, so
//! features can never see it. Labels are binary: `1` for Type Ia (`type == 0`),
//! `0` otherwise.

use std::path::Path;

use crate::domain::{DatasetVariant, LightCurveTable, RecordCollection, SnrCut, Split, Survey};
use crate::error::AppError;
use crate::fit::snr_mask;
use crate::io::{collection_file_name, read_collection};

/// Type code of a Type Ia supernova.
const TYPE_IA: i64 = 0;

/// Rows and their labels, always the same length and order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub table: LightCurveTable,
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Keep the leading `floor(n × fraction)` rows.
    pub fn truncate_fraction(self, fraction: f64) -> Result<Self, AppError> {
        if !(fraction.is_finite() && (0.0..=1.0).contains(&fraction)) {
            return Err(AppError::new(2, format!("Fraction must be in [0, 1], got {fraction}.")));
        }
        let keep = (self.len() as f64 * fraction).floor() as usize;
        let survey = self.table.survey();
        let mut rows = self.table.into_rows();
        rows.truncate(keep);
        let mut labels = self.labels;
        labels.truncate(keep);
        Ok(Self {
            table: LightCurveTable::from_records(rows, survey),
            labels,
        })
    }

    /// Drop rows failing the signal-quality cut, together with their labels.
    pub fn apply_snr_cut(self, cut: &SnrCut) -> Self {
        let mask = snr_mask(&self.table, cut);
        let survey = self.table.survey();
        let (rows, labels): (Vec<_>, Vec<_>) = self
            .table
            .into_rows()
            .into_iter()
            .zip(self.labels)
            .zip(mask)
            .filter_map(|(pair, keep)| keep.then_some(pair))
            .unzip();
        Self {
            table: LightCurveTable::from_records(rows, survey),
            labels,
        }
    }
}

pub fn label_for(sn_type: i64) -> u8 {
    u8::from(sn_type == TYPE_IA)
}

/// Split type codes off a decoded collection (rows in id order).
pub fn dataset_from_collection(collection: RecordCollection, survey: Survey) -> Result<Dataset, AppError> {
    let mut rows = Vec::with_capacity(collection.len());
    let mut labels = Vec::with_capacity(collection.len());
    for (snid, record) in collection {
        let (record, sn_type) = record.split_type();
        let sn_type = sn_type.ok_or_else(|| AppError::new(3, format!("Object {snid} has no type code.")))?;
        rows.push(record);
        labels.push(label_for(sn_type));
    }
    Ok(Dataset {
        table: LightCurveTable::from_records(rows, survey),
        labels,
    })
}

/// Load `<survey>_<split><suffix>.json.gz` from `data_dir`.
pub fn load_dataset(
    data_dir: &Path,
    survey: Survey,
    split: Split,
    variant: DatasetVariant,
    fraction: Option<f64>,
) -> Result<Dataset, AppError> {
    let path = data_dir.join(collection_file_name(survey, split, variant));
    let dataset = dataset_from_collection(read_collection(&path)?, survey)?;
    match fraction {
        Some(f) => dataset.truncate_fraction(f),
        None => Ok(dataset),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::{BandSeries, LightCurveRecord, ObjectHeader};
    use crate::io::write_collection;

    fn record(snid: i64, sn_type: Option<i64>, snr: f64) -> LightCurveRecord {
        let header = ObjectHeader {
            snid,
            z: 0.3,
            sn_type,
            pkmjd: 56_000.0,
            pkmag: BTreeMap::new(),
        };
        let bands = Survey::Des
            .bands()
            .iter()
            .map(|&b| {
                let series = BandSeries::new(vec![1.0, 2.0, 3.0], vec![snr; 3], vec![1.0; 3]).unwrap();
                (b, series)
            })
            .collect();
        LightCurveRecord::new(header, bands, Survey::Des)
    }

    fn collection(types: &[i64]) -> RecordCollection {
        types
            .iter()
            .enumerate()
            .map(|(i, &t)| (i as i64 + 1, record(i as i64 + 1, Some(t), 10.0)))
            .collect()
    }

    #[test]
    fn labels_mark_type_ia() {
        let ds = dataset_from_collection(collection(&[0, 1, 2, 0]), Survey::Des).unwrap();
        assert_eq!(ds.labels, vec![1, 0, 0, 1]);
        assert_eq!(ds.table.ids(), vec![1, 2, 3, 4]);
        assert!(ds.table.rows().iter().all(|r| r.header().sn_type.is_none()));
    }

    #[test]
    fn labels_do_not_depend_on_truncation() {
        let full = dataset_from_collection(collection(&[0, 1, 0, 3, 0]), Survey::Des).unwrap();
        let labels = full.labels.clone();
        let part = full.truncate_fraction(0.5).unwrap();
        assert_eq!(part.len(), 2);
        assert_eq!(part.table.len(), 2);
        assert_eq!(part.labels, labels[..2]);
    }

    #[test]
    fn missing_type_is_a_data_error() {
        let mut c = collection(&[0]);
        c.insert(9, record(9, None, 10.0));
        let err = dataset_from_collection(c, Survey::Des).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains('9'));
    }

    #[test]
    fn snr_cut_keeps_labels_aligned() {
        let mut c = RecordCollection::new();
        c.insert(1, record(1, Some(0), 10.0));
        c.insert(2, record(2, Some(1), 0.5));
        c.insert(3, record(3, Some(2), 10.0));
        let ds = dataset_from_collection(c, Survey::Des)
            .unwrap()
            .apply_snr_cut(&SnrCut {
                min_snr: 3.0,
                min_count: 2,
            });
        assert_eq!(ds.table.ids(), vec![1, 3]);
        assert_eq!(ds.labels, vec![1, 0]);
    }

    #[test]
    fn bad_fraction_is_rejected() {
        let ds = dataset_from_collection(collection(&[0]), Survey::Des).unwrap();
        assert!(ds.truncate_fraction(1.5).is_err());
    }

    #[test]
    fn loads_by_variant_and_reports_missing_files() {
        let dir = std::env::temp_dir().join(format!("lcfeat-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_collection(&dir.join("des_train_mini.json.gz"), &collection(&[1, 0])).unwrap();

        let ds = load_dataset(&dir, Survey::Des, Split::Train, DatasetVariant::Reduced, None).unwrap();
        assert_eq!(ds.labels, vec![0, 1]);

        let err = load_dataset(&dir, Survey::Des, Split::Train, DatasetVariant::Full, None).unwrap_err();
        assert!(err.message().contains("des_train.json.gz"));
        assert!(err.message().contains("lcfeat download"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
