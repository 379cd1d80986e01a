//! Light-curve record builder.
//!
//! Takes one object's slice of the photometry table, groups it by band, and
//! merges the result with the object header. Observations in bands outside the
//! survey alphabet are dropped; survey bands without observations become empty
//! series.

use std::collections::BTreeMap;

use crate::domain::{BandSeries, LightCurveRecord, Survey};
use crate::error::AppError;
use crate::io::tables::{ParsedObject, PhotRow};

#[derive(Default)]
struct SeriesBuilder {
    mjd: Vec<f64>,
    fluxcal: Vec<f64>,
    fluxcalerr: Vec<f64>,
}

/// Group photometry rows by band, keeping only bands of `survey`.
pub fn build_bands(rows: &[PhotRow], survey: Survey) -> Result<BTreeMap<char, BandSeries>, AppError> {
    let mut builders: BTreeMap<char, SeriesBuilder> = BTreeMap::new();
    for row in rows {
        let Some(band) = band_code(&row.band).filter(|&b| survey.contains(b)) else {
            continue;
        };
        let b = builders.entry(band).or_default();
        b.mjd.push(row.mjd);
        b.fluxcal.push(row.fluxcal);
        b.fluxcalerr.push(row.fluxcalerr);
    }

    builders
        .into_iter()
        .map(|(band, b)| -> Result<(char, BandSeries), AppError> {
            Ok((band, BandSeries::new(b.mjd, b.fluxcal, b.fluxcalerr)?))
        })
        .collect()
}

/// Build the record for `object` from the full photometry table.
pub fn build_record(object: ParsedObject, phot: &[PhotRow], survey: Survey) -> Result<LightCurveRecord, AppError> {
    let slice = phot.get(object.rows.clone()).ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "Object {}: photometry rows {:?} outside table of {} rows.",
                object.header.snid,
                object.rows,
                phot.len()
            ),
        )
    })?;
    let bands = build_bands(slice, survey)?;
    Ok(LightCurveRecord::new(object.header, bands, survey))
}

/// Single-character band code, or `None` for anything longer.
fn band_code(raw: &str) -> Option<char> {
    let mut chars = raw.trim().chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}
