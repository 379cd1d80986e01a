//! Signal-quality cut.
//!
//! For every band we count the samples with `flux / err > min_snr`. An object
//! survives only if *every* band has more than `min_count` such samples; one
//! weak band is enough to drop it.
//!
//! The cut is optional and off by default. It never edits records: it returns
//! a keep-mask or a new table.

use crate::domain::{LightCurveRecord, LightCurveTable, SnrCut, Survey};

/// Per-band count of samples above `min_snr`, in survey band order.
pub fn snr_counts(record: &LightCurveRecord, survey: Survey, min_snr: f64) -> Vec<usize> {
    survey
        .bands()
        .iter()
        .map(|&b| match record.band(b) {
            Some(series) => series
                .fluxcal()
                .iter()
                .zip(series.fluxcalerr())
                .filter(|&(&f, &e)| f / e > min_snr)
                .count(),
            None => 0,
        })
        .collect()
}

pub fn passes_snr_cut(record: &LightCurveRecord, survey: Survey, cut: &SnrCut) -> bool {
    snr_counts(record, survey, cut.min_snr)
        .into_iter()
        .all(|n| n > cut.min_count)
}

/// `true` for every row that survives the cut.
pub fn snr_mask(table: &LightCurveTable, cut: &SnrCut) -> Vec<bool> {
    table
        .rows()
        .iter()
        .map(|r| passes_snr_cut(r, table.survey(), cut))
        .collect()
}

/// New table holding the surviving rows, in their original order.
pub fn filter_snr(table: &LightCurveTable, cut: &SnrCut) -> LightCurveTable {
    let kept = table
        .rows()
        .iter()
        .filter(|r| passes_snr_cut(r, table.survey(), cut))
        .cloned()
        .collect();
    LightCurveTable::from_records(kept, table.survey())
}
