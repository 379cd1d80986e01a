//! Reporting utilities: per-band fit statistics and formatted terminal output.

use crate::fit::{BandFit, Extraction};

pub mod format;

pub use format::*;

/// Fit outcome counts for one band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSummary {
    pub band: char,
    pub fitted: usize,
    pub fallback: usize,
    /// Median fitted `tfall` / `trise` over fitted objects (`None` if none).
    pub median_tfall: Option<f64>,
    pub median_trise: Option<f64>,
}

/// Per-band outcome counts, in survey band order.
pub fn band_summaries(extraction: &Extraction) -> Vec<BandSummary> {
    extraction
        .survey
        .bands()
        .iter()
        .enumerate()
        .map(|(j, &band)| {
            let mut tfall = Vec::new();
            let mut trise = Vec::new();
            let mut fallback = 0usize;
            for object in &extraction.fits {
                match &object.bands[j].1 {
                    BandFit::Fitted(p) => {
                        tfall.push(p.tfall);
                        trise.push(p.trise);
                    }
                    BandFit::Fallback(_) => fallback += 1,
                }
            }
            BandSummary {
                band,
                fitted: tfall.len(),
                fallback,
                median_tfall: median(&mut tfall),
                median_trise: median(&mut trise),
            }
        })
        .collect()
}

/// `(positives, negatives)` of a binary label vector.
pub fn label_counts(labels: &[u8]) -> (usize, usize) {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    (positives, labels.len() - positives)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    })
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use super::*;
    use crate::domain::{BazinParams, Survey};
    use crate::fit::{FitFailure, ObjectFit};

    fn fitted(tfall: f64) -> BandFit {
        BandFit::Fitted(BazinParams {
            a: 1.0,
            b: 0.0,
            t0: 0.0,
            tfall,
            trise: -2.0,
        })
    }

    #[test]
    fn summaries_count_per_band() {
        let fallback = || BandFit::Fallback(FitFailure::Empty);
        let fits = vec![
            ObjectFit {
                snid: 1,
                bands: vec![('g', fitted(10.0)), ('r', fallback()), ('i', fallback()), ('z', fitted(5.0))],
            },
            ObjectFit {
                snid: 2,
                bands: vec![('g', fitted(30.0)), ('r', fallback()), ('i', fitted(7.0)), ('z', fitted(9.0))],
            },
        ];
        let extraction = Extraction {
            survey: Survey::Des,
            features: DMatrix::zeros(2, 20),
            fits,
        };
        let s = band_summaries(&extraction);
        assert_eq!(s[0].fitted, 2);
        assert_eq!(s[0].median_tfall, Some(20.0));
        assert_eq!(s[1].fallback, 2);
        assert_eq!(s[1].median_tfall, None);
        assert_eq!(s[3].median_tfall, Some(7.0));
        assert_eq!(s[3].median_trise, Some(-2.0));
    }

    #[test]
    fn label_counts_split_binary_labels() {
        assert_eq!(label_counts(&[1, 0, 0, 1, 1]), (3, 2));
        assert_eq!(label_counts(&[]), (0, 0));
    }
}
