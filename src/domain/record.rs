//! Light-curve records and the flat key layout they are stored under.
//!
//! A record is built once from its header and band series and never edited
//! afterwards. Derived views (`with_survey`, `split_type`) consume the record
//! and return a new one.
//!
//! Flat layout (one map per object):
//!
//! ```text
//! snid, z, type, pkmjd, pkmag_<b>, <b>_mjd, <b>_fluxcal, <b>_fluxcalerr
//! ```

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::Survey;
use crate::error::AppError;

/// Object identifier → record. The unit of serialization.
pub type RecordCollection = BTreeMap<i64, LightCurveRecord>;

/// Per-object metadata from the survey header table.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHeader {
    pub snid: i64,
    /// Host redshift.
    pub z: f64,
    /// Simulated type code; `0` is a Type Ia supernova.
    pub sn_type: Option<i64>,
    /// Epoch of peak brightness (MJD).
    pub pkmjd: f64,
    /// Peak magnitude per band.
    pub pkmag: BTreeMap<char, f64>,
}

/// Observations of one object in one band.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandSeries {
    mjd: Vec<f64>,
    fluxcal: Vec<f64>,
    fluxcalerr: Vec<f64>,
}

impl BandSeries {
    pub fn new(mjd: Vec<f64>, fluxcal: Vec<f64>, fluxcalerr: Vec<f64>) -> Result<Self, AppError> {
        if mjd.len() != fluxcal.len() || mjd.len() != fluxcalerr.len() {
            return Err(AppError::new(
                3,
                format!(
                    "Band series length mismatch: mjd={}, fluxcal={}, fluxcalerr={}.",
                    mjd.len(),
                    fluxcal.len(),
                    fluxcalerr.len()
                ),
            ));
        }
        Ok(Self {
            mjd,
            fluxcal,
            fluxcalerr,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn mjd(&self) -> &[f64] {
        &self.mjd
    }

    pub fn fluxcal(&self) -> &[f64] {
        &self.fluxcal
    }

    pub fn fluxcalerr(&self) -> &[f64] {
        &self.fluxcalerr
    }

    pub fn len(&self) -> usize {
        self.mjd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mjd.is_empty()
    }
}

/// Header plus one series per band.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCurveRecord {
    header: ObjectHeader,
    bands: BTreeMap<char, BandSeries>,
}

impl LightCurveRecord {
    /// Build a record holding exactly the bands of `survey`.
    ///
    /// Bands missing from `bands` become empty series; bands outside the
    /// survey alphabet are dropped.
    pub fn new(header: ObjectHeader, mut bands: BTreeMap<char, BandSeries>, survey: Survey) -> Self {
        let normalized = survey
            .bands()
            .iter()
            .map(|&b| (b, bands.remove(&b).unwrap_or_default()))
            .collect();
        Self {
            header,
            bands: normalized,
        }
    }

    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    pub fn snid(&self) -> i64 {
        self.header.snid
    }

    pub fn band(&self, band: char) -> Option<&BandSeries> {
        self.bands.get(&band)
    }

    /// Bands held by this record, in character order.
    pub fn band_codes(&self) -> impl Iterator<Item = char> + '_ {
        self.bands.keys().copied()
    }

    /// Re-normalize the band set to `survey` (used after decoding, where the
    /// band set is inferred from the stored keys).
    pub fn with_survey(self, survey: Survey) -> Self {
        Self::new(self.header, self.bands, survey)
    }

    /// Separate the type code from the rest of the record.
    pub fn split_type(self) -> (Self, Option<i64>) {
        let Self { mut header, bands } = self;
        let sn_type = header.sn_type.take();
        (Self { header, bands }, sn_type)
    }

    /// Flatten into the stored key layout.
    pub fn flatten(&self) -> BTreeMap<String, FlatValue> {
        let mut out = BTreeMap::new();
        for (&band, series) in &self.bands {
            out.insert(format!("{band}_mjd"), FlatValue::Series(series.mjd.clone()));
            out.insert(format!("{band}_fluxcal"), FlatValue::Series(series.fluxcal.clone()));
            out.insert(
                format!("{band}_fluxcalerr"),
                FlatValue::Series(series.fluxcalerr.clone()),
            );
        }
        // Header keys go in last so they win on any collision.
        let h = &self.header;
        out.insert("snid".to_string(), FlatValue::Int(h.snid));
        out.insert("z".to_string(), FlatValue::Float(h.z));
        if let Some(t) = h.sn_type {
            out.insert("type".to_string(), FlatValue::Int(t));
        }
        out.insert("pkmjd".to_string(), FlatValue::Float(h.pkmjd));
        for (&band, &mag) in &h.pkmag {
            out.insert(format!("pkmag_{band}"), FlatValue::Float(mag));
        }
        out
    }

    /// Rebuild a record from the stored key layout.
    ///
    /// The band set is inferred from the `<b>_mjd` keys.
    pub fn from_flat(map: &BTreeMap<String, FlatValue>) -> Result<Self, AppError> {
        let snid = flat_i64(map, "snid")?
            .ok_or_else(|| AppError::new(3, "Record is missing `snid`."))?;
        let z = flat_f64(map, "z", snid)?.unwrap_or(f64::NAN);
        let pkmjd = flat_f64(map, "pkmjd", snid)?.unwrap_or(f64::NAN);
        let sn_type = flat_i64(map, "type")?;

        let mut pkmag = BTreeMap::new();
        let mut bands = BTreeMap::new();
        for key in map.keys() {
            if let Some(band) = key.strip_prefix("pkmag_").and_then(single_char) {
                if let Some(mag) = flat_f64(map, key, snid)? {
                    pkmag.insert(band, mag);
                }
            }
            if let Some(band) = key.strip_suffix("_mjd").and_then(single_char) {
                let series = BandSeries::new(
                    flat_series(map, &format!("{band}_mjd"), snid)?,
                    flat_series(map, &format!("{band}_fluxcal"), snid)?,
                    flat_series(map, &format!("{band}_fluxcalerr"), snid)?,
                )
                .map_err(|e| AppError::new(3, format!("Object {snid}, band {band}: {e}")))?;
                bands.insert(band, series);
            }
        }

        Ok(Self {
            header: ObjectHeader {
                snid,
                z,
                sn_type,
                pkmjd,
                pkmag,
            },
            bands,
        })
    }
}

impl Serialize for LightCurveRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.flatten().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LightCurveRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, FlatValue>::deserialize(deserializer)?;
        LightCurveRecord::from_flat(&map).map_err(D::Error::custom)
    }
}

/// One value of the flat record layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatValue {
    Int(i64),
    Float(f64),
    /// Non-finite entries are written as `null` and read back as NaN.
    Series(#[serde(deserialize_with = "nullable_series")] Vec<f64>),
    /// Non-finite scalars are written as `null` by JSON encoders.
    Null,
}

fn nullable_series<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    if chars.next().is_none() { Some(c) } else { None }
}

fn flat_i64(map: &BTreeMap<String, FlatValue>, key: &str) -> Result<Option<i64>, AppError> {
    match map.get(key) {
        None | Some(FlatValue::Null) => Ok(None),
        Some(FlatValue::Int(v)) => Ok(Some(*v)),
        Some(FlatValue::Float(v)) if v.fract() == 0.0 => Ok(Some(*v as i64)),
        Some(other) => Err(AppError::new(3, format!("Field `{key}` is not an integer: {other:?}"))),
    }
}

fn flat_f64(map: &BTreeMap<String, FlatValue>, key: &str, snid: i64) -> Result<Option<f64>, AppError> {
    match map.get(key) {
        None => Ok(None),
        Some(FlatValue::Null) => Ok(Some(f64::NAN)),
        Some(FlatValue::Int(v)) => Ok(Some(*v as f64)),
        Some(FlatValue::Float(v)) => Ok(Some(*v)),
        Some(FlatValue::Series(_)) => Err(AppError::new(
            3,
            format!("Object {snid}: field `{key}` is a series, expected a number."),
        )),
    }
}

fn flat_series(map: &BTreeMap<String, FlatValue>, key: &str, snid: i64) -> Result<Vec<f64>, AppError> {
    match map.get(key) {
        None => Err(AppError::new(3, format!("Object {snid}: missing field `{key}`."))),
        Some(FlatValue::Series(v)) => Ok(v.clone()),
        Some(other) => Err(AppError::new(
            3,
            format!("Object {snid}: field `{key}` is not a series: {other:?}"),
        )),
    }
}

/// Ordered rows of records, all normalized to one survey's band set.
///
/// This is the tabular view the extractor and the signal-quality filter work on.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCurveTable {
    survey: Survey,
    rows: Vec<LightCurveRecord>,
}

impl LightCurveTable {
    /// Rows come out in collection key order.
    pub fn from_collection(collection: RecordCollection, survey: Survey) -> Self {
        Self::from_records(collection.into_values().collect(), survey)
    }

    /// Keep the given row order.
    pub fn from_records(records: Vec<LightCurveRecord>, survey: Survey) -> Self {
        let rows = records.into_iter().map(|r| r.with_survey(survey)).collect();
        Self { survey, rows }
    }

    pub fn survey(&self) -> Survey {
        self.survey
    }

    pub fn rows(&self) -> &[LightCurveRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<LightCurveRecord> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.rows.iter().map(LightCurveRecord::snid).collect()
    }

    /// Column names shared by every row (sorted).
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = vec!["snid".into(), "z".into(), "pkmjd".into()];
        for &b in self.survey.bands() {
            names.push(format!("pkmag_{b}"));
            names.push(format!("{b}_mjd"));
            names.push(format!("{b}_fluxcal"));
            names.push(format!("{b}_fluxcalerr"));
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(snid: i64) -> ObjectHeader {
        ObjectHeader {
            snid,
            z: 0.31,
            sn_type: Some(0),
            pkmjd: 56_200.5,
            pkmag: [('g', 22.1), ('r', 21.7)].into_iter().collect(),
        }
    }

    #[test]
    fn band_series_rejects_unequal_lengths() {
        assert!(BandSeries::new(vec![1.0], vec![1.0, 2.0], vec![1.0]).is_err());
        assert!(BandSeries::new(vec![], vec![], vec![]).unwrap().is_empty());
    }

    #[test]
    fn new_record_has_every_survey_band() {
        let mut bands = BTreeMap::new();
        bands.insert('g', BandSeries::new(vec![1.0], vec![10.0], vec![1.0]).unwrap());
        bands.insert('u', BandSeries::new(vec![1.0], vec![10.0], vec![1.0]).unwrap());
        let rec = LightCurveRecord::new(header(1), bands, Survey::Des);

        let codes: Vec<char> = rec.band_codes().collect();
        assert_eq!(codes, vec!['g', 'i', 'r', 'z']);
        assert_eq!(rec.band('g').unwrap().len(), 1);
        assert!(rec.band('z').unwrap().is_empty());
        assert!(rec.band('u').is_none());
    }

    #[test]
    fn flatten_exposes_prefixed_keys() {
        let rec = LightCurveRecord::new(header(7), BTreeMap::new(), Survey::Des);
        let flat = rec.flatten();
        for key in ["snid", "z", "type", "pkmjd", "pkmag_g", "g_mjd", "z_fluxcalerr"] {
            assert!(flat.contains_key(key), "missing {key}");
        }
        // `z` the redshift and `z_*` the band never collide.
        assert_eq!(flat["z"], FlatValue::Float(0.31));
    }

    #[test]
    fn flat_round_trip_preserves_record() {
        let mut bands = BTreeMap::new();
        bands.insert(
            'r',
            BandSeries::new(vec![56_100.0, 56_101.5], vec![3.5, 7.25], vec![0.5, 0.75]).unwrap(),
        );
        let rec = LightCurveRecord::new(header(3), bands, Survey::Des);
        let back = LightCurveRecord::from_flat(&rec.flatten()).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn non_finite_series_values_decode_as_nan() {
        let mut bands = BTreeMap::new();
        bands.insert(
            'g',
            BandSeries::new(vec![1.0, 2.0], vec![f64::NAN, 3.0], vec![1.0, f64::INFINITY]).unwrap(),
        );
        let rec = LightCurveRecord::new(header(4), bands, Survey::Des);

        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"g_fluxcal\":[null,3.0]"), "{json}");

        let back: LightCurveRecord = serde_json::from_str(&json).unwrap();
        let g = back.band('g').unwrap();
        assert!(g.fluxcal()[0].is_nan());
        assert_eq!(g.fluxcal()[1], 3.0);
        assert!(g.fluxcalerr()[1].is_nan());
        assert_eq!(g.mjd(), &[1.0, 2.0]);
    }

    #[test]
    fn split_type_removes_code_only() {
        let rec = LightCurveRecord::new(header(9), BTreeMap::new(), Survey::Des);
        let (rest, t) = rec.clone().split_type();
        assert_eq!(t, Some(0));
        assert_eq!(rest.header().sn_type, None);
        assert_eq!(rest.header().pkmjd, rec.header().pkmjd);
        assert!(!rest.flatten().contains_key("type"));
    }

    #[test]
    fn table_from_collection_is_uniform() {
        let mut coll = RecordCollection::new();
        coll.insert(2, LightCurveRecord::new(header(2), BTreeMap::new(), Survey::Des));
        let mut bands = BTreeMap::new();
        bands.insert('g', BandSeries::new(vec![1.0], vec![2.0], vec![3.0]).unwrap());
        coll.insert(1, LightCurveRecord::new(header(1), bands, Survey::Des));

        let table = LightCurveTable::from_collection(coll, Survey::Des);
        assert_eq!(table.ids(), vec![1, 2]);
        for row in table.rows() {
            assert_eq!(row.band_codes().count(), 4);
        }
        assert!(table.column_names().contains(&"i_fluxcal".to_string()));
    }
}
