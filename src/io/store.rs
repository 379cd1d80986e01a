//! Serialized record collections.
//!
//! On disk a collection is one gzip-compressed JSON object mapping object id
//! to its flat record (see `domain::record`). The file is fully decoded and
//! closed before anything is fit.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::domain::{DatasetVariant, RecordCollection, Split, Survey};
use crate::error::AppError;

/// `<survey>_<split><suffix>.json.gz`
pub fn collection_file_name(survey: Survey, split: Split, variant: DatasetVariant) -> String {
    format!("{}_{}{}.json.gz", survey.name(), split.name(), variant.suffix())
}

/// Gzip + JSON encode `collection` into `writer`.
pub fn encode_collection<W: Write>(writer: W, collection: &RecordCollection) -> Result<(), AppError> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    serde_json::to_writer(&mut encoder, collection)
        .map_err(|e| AppError::new(2, format!("Failed to encode record collection: {e}")))?;
    encoder
        .finish()
        .map_err(|e| AppError::new(2, format!("Failed to finish gzip stream: {e}")))?;
    Ok(())
}

pub fn decode_collection<R: Read>(reader: R) -> Result<RecordCollection, AppError> {
    let decoder = GzDecoder::new(reader);
    serde_json::from_reader(BufReader::new(decoder))
        .map_err(|e| AppError::new(3, format!("Invalid record collection: {e}")))
}

pub fn write_collection(path: &Path, collection: &RecordCollection) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    encode_collection(&mut writer, collection)?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
    log::info!("wrote {} records to {}", collection.len(), path.display());
    Ok(())
}

/// Read a collection; a missing file is reported with the download hint.
pub fn read_collection(path: &Path) -> Result<RecordCollection, AppError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::missing_data(path)),
        Err(e) => return Err(AppError::new(2, format!("Failed to open '{}': {e}", path.display()))),
    };
    let collection = decode_collection(file)
        .map_err(|e| AppError::new(e.exit_code(), format!("'{}': {}", path.display(), e.message())))?;
    log::info!("read {} records from {}", collection.len(), path.display());
    Ok(collection)
}
