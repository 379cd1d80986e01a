//! Synthetic light-curve collections.
//!
//! Every object gets a random type code, redshift and peak epoch; every band
//! either drops out entirely (probability `dropout`) or gets
//! `epochs_per_band` observations of a Bazin curve plus Gaussian noise.
//! The same config always produces the same collection.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{BandSeries, BazinParams, LightCurveRecord, ObjectHeader, RecordCollection, SampleConfig};
use crate::error::AppError;
use crate::models::evaluate;

/// First generated object id.
const FIRST_SNID: i64 = 1_000;
/// Share of Type Ia objects.
const IA_FRACTION: f64 = 0.5;
/// Non-Ia simulation type codes to draw from.
const NON_IA_TYPES: [i64; 6] = [2, 3, 21, 22, 32, 33];
/// Observation window around peak (days).
const WINDOW_BEFORE: f64 = 30.0;
const WINDOW_AFTER: f64 = 90.0;
/// Magnitude zero point of `FLUXCAL`.
const ZERO_POINT: f64 = 27.5;

pub fn generate_collection(config: &SampleConfig) -> Result<RecordCollection, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::new(2, "Noise level must be finite and >= 0."));
    }
    if !(0.0..=1.0).contains(&config.dropout) {
        return Err(AppError::new(2, "Band dropout probability must be in [0, 1]."));
    }
    if config.epochs_per_band == 0 {
        return Err(AppError::new(2, "Epochs per band must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    // Reported uncertainty never drops to zero, so SNR stays defined.
    let flux_err = config.noise.max(0.1);

    let mut out = RecordCollection::new();
    for i in 0..config.count {
        let snid = FIRST_SNID + i as i64;
        let is_ia = rng.gen_bool(IA_FRACTION);
        let sn_type = if is_ia {
            0
        } else {
            NON_IA_TYPES[rng.gen_range(0..NON_IA_TYPES.len())]
        };
        let pkmjd = 56_000.0 + rng.gen_range(0.0..365.0);

        let mut pkmag = BTreeMap::new();
        let mut bands = BTreeMap::new();
        for &band in config.survey.bands() {
            let params = draw_params(&mut rng, is_ia);
            pkmag.insert(band, peak_magnitude(&params));

            if rng.gen_bool(config.dropout) {
                continue;
            }

            let mut mjd: Vec<f64> = (0..config.epochs_per_band)
                .map(|_| pkmjd + rng.gen_range(-WINDOW_BEFORE..WINDOW_AFTER))
                .collect();
            mjd.sort_by(f64::total_cmp);
            let fluxcal = mjd
                .iter()
                .map(|&t| evaluate(t - pkmjd, &params) + noise.sample(&mut rng))
                .collect();
            let n = mjd.len();
            bands.insert(band, BandSeries::new(mjd, fluxcal, vec![flux_err; n])?);
        }

        let header = ObjectHeader {
            snid,
            z: rng.gen_range(0.05..1.2),
            sn_type: Some(sn_type),
            pkmjd,
            pkmag,
        };
        out.insert(snid, LightCurveRecord::new(header, bands, config.survey));
    }

    log::info!("generated {} synthetic objects (seed {})", out.len(), config.seed);
    Ok(out)
}

/// Curve shape centred on the peak epoch (`t0 = 0`).
fn draw_params(rng: &mut StdRng, is_ia: bool) -> BazinParams {
    let (tfall_lo, tfall_hi) = if is_ia { (15.0, 35.0) } else { (30.0, 80.0) };
    BazinParams {
        a: rng.gen_range(50.0..500.0),
        b: rng.gen_range(-5.0..5.0),
        t0: 0.0,
        tfall: rng.gen_range(tfall_lo..tfall_hi),
        trise: -rng.gen_range(1.5..6.0),
    }
}

fn peak_magnitude(params: &BazinParams) -> f64 {
    let peak = params.a.max(1e-3);
    ZERO_POINT - 2.5 * peak.log10()
}
