//! Fetch serialized record collections from the public data host.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;

use crate::domain::{DatasetVariant, Split, Survey};
use crate::error::AppError;
use crate::io::collection_file_name;

pub const DEFAULT_BASE_URL: &str = "https://storage.ramp.studio/supernovae/";

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Fetched { bytes: usize },
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub name: String,
    pub path: PathBuf,
    pub status: DownloadStatus,
}

/// Train and test file names for each requested variant.
pub fn dataset_files(survey: Survey, variants: &[DatasetVariant]) -> Vec<String> {
    let mut out = Vec::new();
    for &variant in variants {
        for split in [Split::Train, Split::Test] {
            out.push(collection_file_name(survey, split, variant));
        }
    }
    out
}

pub struct DataClient {
    client: Client,
    base_url: String,
}

impl DataClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { client, base_url })
    }

    pub fn url_for(&self, name: &str) -> String {
        format!("{}{name}", self.base_url)
    }

    /// Download every file in `names` into `data_dir`, skipping files that exist.
    pub fn fetch_all(&self, names: &[String], data_dir: &Path) -> Result<Vec<DownloadedFile>, AppError> {
        fs::create_dir_all(data_dir)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", data_dir.display())))?;

        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let path = data_dir.join(name);
            if path.exists() {
                log::info!("{} already present; skipping", path.display());
                out.push(DownloadedFile {
                    name: name.clone(),
                    path,
                    status: DownloadStatus::AlreadyPresent,
                });
                continue;
            }
            let bytes = self.fetch_to(name, &path)?;
            out.push(DownloadedFile {
                name: name.clone(),
                path,
                status: DownloadStatus::Fetched { bytes },
            });
        }
        Ok(out)
    }

    fn fetch_to(&self, name: &str, path: &Path) -> Result<usize, AppError> {
        let url = self.url_for(name);
        log::info!("downloading {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AppError::new(2, format!("Request for {url} failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::new(
                2,
                format!("Request for {url} failed with status {}.", resp.status()),
            ));
        }
        let body = resp
            .bytes()
            .map_err(|e| AppError::new(2, format!("Failed to read body of {url}: {e}")))?;

        // Partial downloads never carry the final name.
        let partial = path.with_extension("part");
        let mut file = fs::File::create(&partial)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", partial.display())))?;
        file.write_all(&body)
            .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", partial.display())))?;
        fs::rename(&partial, path)
            .map_err(|e| AppError::new(2, format!("Failed to move '{}' into place: {e}", path.display())))?;

        log::info!("saved {} ({} bytes)", path.display(), body.len());
        Ok(body.len())
    }
}
