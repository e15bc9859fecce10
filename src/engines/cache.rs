//! Model and training-data downloads for the local engines
//!
//! Files are fetched once into the user cache directory and reused on every
//! later start.

use crate::error::ScanError;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `<user cache>/docscan[/<sub>]`, created if missing
pub fn cache_dir(sub: Option<&str>) -> Result<PathBuf, ScanError> {
    let mut dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("docscan");
    if let Some(sub) = sub {
        dir = dir.join(sub);
    }

    fs::create_dir_all(&dir).map_err(|e| {
        ScanError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    Ok(dir)
}

/// Path of `dir/filename`, downloading it from `url` first if absent
pub fn ensure_downloaded(url: &str, dir: &Path, filename: &str) -> Result<PathBuf, ScanError> {
    let path = dir.join(filename);

    if path.exists() {
        tracing::info!("Using cached {} from {:?}", filename, path);
        return Ok(path);
    }

    tracing::info!("Downloading {} (this may take a moment)...", filename);
    download_file(url, &path)?;
    tracing::info!("Downloaded {} to {:?}", filename, path);

    Ok(path)
}

/// Download into a sibling `.part` file and rename on success, so an
/// interrupted download never leaves a truncated model behind
fn download_file(url: &str, path: &Path) -> Result<(), ScanError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| ScanError::InitializationError(format!("Failed to download {}: {}", url, e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        ScanError::InitializationError(format!("Failed to read download body: {}", e))
    })?;

    let partial = path.with_extension("part");
    let mut file = File::create(&partial).map_err(|e| {
        ScanError::InitializationError(format!("Failed to create {:?}: {}", partial, e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        ScanError::InitializationError(format!("Failed to write {:?}: {}", partial, e))
    })?;

    fs::rename(&partial, path).map_err(|e| {
        ScanError::InitializationError(format!("Failed to move {:?} into place: {}", path, e))
    })?;

    Ok(())
}
