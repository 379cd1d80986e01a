//! Raw survey table parsing.
//!
//! A simulation batch ships as pairs of CSV tables:
//!
//! - `*HEAD*.csv`: one row per object (`SNID`, `SNTYPE`, `SIM_NON1a`,
//!   `SIM_REDSHIFT_HOST`, `SIM_PEAKMJD`, `SIM_PEAKMAG_<band>`, `PTROBS_MIN`,
//!   `PTROBS_MAX`)
//! - `*PHOT*.csv`: one row per observation (`MJD`, `FLT`, `FLUXCAL`, `FLUXCALERR`)
//!
//! Each header row points at a contiguous block of photometry rows through
//! `PTROBS_MIN` / `PTROBS_MAX`. Those pointers are one-indexed; we turn them into
//! the zero-indexed half-open range `PTROBS_MIN-1 .. PTROBS_MAX-1`.
//!
//! Column names are matched case-insensitively. Missing required columns or
//! unparseable values are input errors (exit code 2) that name the line.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{ObjectHeader, Survey};
use crate::error::AppError;

/// `SNTYPE` value marking an unlabeled (target) object.
const TARGET_SNTYPE: i64 = -9;

/// One parsed row of the header table.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRow {
    pub snid: i64,
    pub sntype: i64,
    pub sim_type: Option<i64>,
    pub redshift: f64,
    pub peak_mjd: f64,
    pub peak_mag: BTreeMap<char, f64>,
    pub ptrobs_min: i64,
    pub ptrobs_max: i64,
}

/// One parsed row of the photometry table.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotRow {
    pub mjd: f64,
    /// Band code, whitespace-trimmed.
    pub band: String,
    pub fluxcal: f64,
    pub fluxcalerr: f64,
}

/// Header fields plus where this object's photometry lives.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedObject {
    pub header: ObjectHeader,
    pub rows: Range<usize>,
    pub is_target: bool,
}

/// Read a header table for `survey` (peak magnitudes are read per band).
pub fn read_header_table<R: Read>(reader: R, survey: Survey) -> Result<Vec<HeaderRow>, AppError> {
    let mut reader = csv_reader(reader);
    let header_map = read_header_map(&mut reader)?;
    for name in [
        "snid",
        "sntype",
        "sim_redshift_host",
        "sim_peakmjd",
        "ptrobs_min",
        "ptrobs_max",
    ] {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Header table is missing column `{}`.", name.to_uppercase())));
        }
    }
    for &band in survey.bands() {
        if !header_map.contains_key(&peak_mag_column(band)) {
            return Err(AppError::new(
                2,
                format!("Header table is missing column `SIM_PEAKMAG_{band}`."),
            ));
        }
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("Header table line {line}: {e}")))?;
        let row = parse_header_record(&record, &header_map, survey)
            .map_err(|e| AppError::new(2, format!("Header table line {line}: {e}")))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read a photometry table.
pub fn read_phot_table<R: Read>(reader: R) -> Result<Vec<PhotRow>, AppError> {
    let mut reader = csv_reader(reader);
    let header_map = read_header_map(&mut reader)?;
    for name in ["mjd", "flt", "fluxcal", "fluxcalerr"] {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Photometry table is missing column `{}`.", name.to_uppercase())));
        }
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("Photometry table line {line}: {e}")))?;
        let row = (|| -> Result<PhotRow, String> {
            Ok(PhotRow {
                mjd: parse_f64(get_required(&record, &header_map, "mjd")?, "MJD")?,
                band: get_optional(&record, &header_map, "flt").unwrap_or("").to_string(),
                fluxcal: parse_f64(get_required(&record, &header_map, "fluxcal")?, "FLUXCAL")?,
                fluxcalerr: parse_f64(get_required(&record, &header_map, "fluxcalerr")?, "FLUXCALERR")?,
            })
        })()
        .map_err(|e| AppError::new(2, format!("Photometry table line {line}: {e}")))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_header_file(path: &Path, survey: Survey) -> Result<Vec<HeaderRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open header table '{}': {e}", path.display())))?;
    read_header_table(file, survey)
}

pub fn read_phot_file(path: &Path) -> Result<Vec<PhotRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open photometry table '{}': {e}", path.display())))?;
    read_phot_table(file)
}

/// Turn one header row into the object header, its photometry range and the
/// train/target flag.
pub fn parse_header_row(row: &HeaderRow, phot_len: usize) -> Result<ParsedObject, AppError> {
    let rows = photometry_range(row.ptrobs_min, row.ptrobs_max, phot_len)
        .map_err(|e| AppError::new(2, format!("Object {}: {e}", row.snid)))?;
    Ok(ParsedObject {
        header: ObjectHeader {
            snid: row.snid,
            z: row.redshift,
            sn_type: row.sim_type,
            pkmjd: row.peak_mjd,
            pkmag: row.peak_mag.clone(),
        },
        rows,
        is_target: row.sntype == TARGET_SNTYPE,
    })
}

/// One-indexed pointers → zero-indexed half-open range, clamped to the table.
pub fn photometry_range(ptrobs_min: i64, ptrobs_max: i64, phot_len: usize) -> Result<Range<usize>, String> {
    if ptrobs_min < 1 || ptrobs_max < ptrobs_min {
        return Err(format!("invalid photometry pointers PTROBS_MIN={ptrobs_min}, PTROBS_MAX={ptrobs_max}"));
    }
    let start = ((ptrobs_min - 1) as usize).min(phot_len);
    let end = ((ptrobs_max - 1) as usize).min(phot_len);
    Ok(start..end)
}

/// Header/photometry file pairs in `dir`, sorted by header file name.
///
/// The photometry file name is the header file name with `HEAD` replaced by
/// `PHOT`; headers without a matching photometry file are skipped.
pub fn find_table_pairs(dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>, AppError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::new(2, format!("Failed to read directory '{}': {e}", dir.display())))?;

    let mut pairs = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", dir.display())))?
            .path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.contains("HEAD") || !name.to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        let phot = path.with_file_name(name.replace("HEAD", "PHOT"));
        if phot.is_file() {
            pairs.push((path, phot));
        } else {
            log::warn!("No photometry table for '{}'; skipping.", path.display());
        }
    }
    pairs.sort();
    Ok(pairs)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn read_header_map<R: Read>(reader: &mut csv::Reader<R>) -> Result<HashMap<String, usize>, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?;
    Ok(headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect())
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM some exporters put in front of the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_header_record(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    survey: Survey,
) -> Result<HeaderRow, String> {
    let mut peak_mag = BTreeMap::new();
    for &band in survey.bands() {
        let column = peak_mag_column(band);
        let v = get_required(record, header_map, &column)?;
        peak_mag.insert(band, parse_f64(v, &format!("SIM_PEAKMAG_{band}"))?);
    }

    Ok(HeaderRow {
        snid: parse_i64(get_required(record, header_map, "snid")?, "SNID")?,
        sntype: parse_i64(get_required(record, header_map, "sntype")?, "SNTYPE")?,
        sim_type: get_optional(record, header_map, "sim_non1a")
            .map(|v| parse_i64(v, "SIM_NON1a"))
            .transpose()?,
        redshift: parse_f64(get_required(record, header_map, "sim_redshift_host")?, "SIM_REDSHIFT_HOST")?,
        peak_mjd: parse_f64(get_required(record, header_map, "sim_peakmjd")?, "SIM_PEAKMJD")?,
        peak_mag,
        ptrobs_min: parse_i64(get_required(record, header_map, "ptrobs_min")?, "PTROBS_MIN")?,
        ptrobs_max: parse_i64(get_required(record, header_map, "ptrobs_max")?, "PTROBS_MAX")?,
    })
}

/// Normalized (lowercase) name of the peak-magnitude column for `band`.
fn peak_mag_column(band: char) -> String {
    format!("sim_peakmag_{}", band.to_ascii_lowercase())
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{}`", name.to_uppercase()))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{}`", name.to_uppercase()))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, column: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .map_err(|_| format!("Invalid `{column}` value '{s}'."))
}

fn parse_i64(s: &str, column: &str) -> Result<i64, String> {
    // Integer columns are sometimes exported as floats (`12.0`).
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(format!("Invalid `{column}` value '{s}'.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: &str = "\
SNID,SNTYPE,SIM_NON1a,SIM_REDSHIFT_HOST,SIM_PEAKMJD,SIM_PEAKMAG_g,SIM_PEAKMAG_r,SIM_PEAKMAG_i,SIM_PEAKMAG_z,PTROBS_MIN,PTROBS_MAX
101,1,0,0.35,56210.5,22.1,21.8,21.9,22.3,1,5
102,-9,2,0.52,56230.0,23.0,22.6,22.4,22.5,5,9
";

    const PHOT: &str = "\
MJD,FLT,FLUXCAL,FLUXCALERR
56200.0,g ,10.0,1.0
56201.0,r,12.0,1.0
56202.0,i,13.0,1.0
56203.0,z,11.0,1.0
56204.0,g,20.0,2.0
56205.0,r,21.0,2.0
56206.0,Y,22.0,2.0
56207.0,i,23.0,2.0
56208.0,z,24.0,2.0
";

    #[test]
    fn pointer_conversion_is_one_indexed_half_open() {
        let range = photometry_range(5, 9, 100).unwrap();
        assert_eq!(range, 4..8);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn pointers_are_clamped_and_validated() {
        assert_eq!(photometry_range(5, 50, 6).unwrap(), 4..6);
        assert!(photometry_range(0, 3, 6).is_err());
        assert!(photometry_range(5, 3, 6).is_err());
    }

    #[test]
    fn header_rows_parse_with_target_flag() {
        let rows = read_header_table(HEAD.as_bytes(), Survey::Des).unwrap();
        assert_eq!(rows.len(), 2);

        let first = parse_header_row(&rows[0], 9).unwrap();
        assert_eq!(first.header.snid, 101);
        assert_eq!(first.header.sn_type, Some(0));
        assert_eq!(first.header.pkmag[&'r'], 21.8);
        assert_eq!(first.rows, 0..4);
        assert!(!first.is_target);

        let second = parse_header_row(&rows[1], 9).unwrap();
        assert_eq!(second.rows, 4..8);
        assert!(second.is_target);
    }

    #[test]
    fn every_survey_band_needs_a_peak_magnitude_column() {
        let head = "\
SNID,SNTYPE,SIM_REDSHIFT_HOST,SIM_PEAKMJD,SIM_PEAKMAG_g,SIM_PEAKMAG_r,SIM_PEAKMAG_i,PTROBS_MIN,PTROBS_MAX
101,1,0.35,56210.5,22.1,21.8,21.9,1,5
";
        let err = read_header_table(head.as_bytes(), Survey::Des).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("SIM_PEAKMAG_z"), "{}", err.message());

        let rows = read_header_table(HEAD.as_bytes(), Survey::Des).unwrap();
        assert!(rows.iter().all(|r| r.peak_mag.len() == 4));
    }

    #[test]
    fn phot_rows_trim_band_codes() {
        let rows = read_phot_table(PHOT.as_bytes()).unwrap();
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0].band, "g");
        assert_eq!(rows[6].band, "Y");
    }

    #[test]
    fn missing_column_is_an_input_error() {
        let err = read_phot_table("MJD,FLT,FLUXCAL\n1,g,2\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("FLUXCALERR"));
    }

    #[test]
    fn bad_value_names_the_line() {
        let err = read_phot_table("MJD,FLT,FLUXCAL,FLUXCALERR\n1,g,2,1\nx,g,2,1\n".as_bytes()).unwrap_err();
        assert!(err.message().contains("line 3"), "{}", err.message());
    }

    #[test]
    fn integer_columns_accept_float_notation() {
        assert_eq!(parse_i64("12.0", "SNID").unwrap(), 12);
        assert!(parse_i64("12.5", "SNID").is_err());
    }
}
