//! Downloads and extracts the county boundary archive.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Error, Result};
use futures::StreamExt;
use indicatif::ProgressBar;

use crate::cli::show_bytes;

/// Downloads `url` to `file_path`, showing byte progress when the server
/// reports a content length.
pub async fn download_with_progress(url: &str, file_path: &Path, progress_bar: &ProgressBar) -> Result<(), Error> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::msg(format!("Failed to download {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(Error::msg(format!("Failed to download {}: {}", url, response.status())));
    }

    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        show_bytes(progress_bar, total_size);
    }

    let mut file = File::create(file_path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| Error::msg(format!("Error reading chunk: {}", e)))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }

    log::debug!("Downloaded {} bytes from {}", downloaded, url);

    Ok(())
}

/// Extracts the zip archive at `zip_path` into `working_dir` and returns the
/// extracted files.
pub fn extract_zip(zip_path: &Path, working_dir: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a zip archive", zip_path.display()))?;

    let mut extracted = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            log::warn!("Skipping unsafe archive entry {}", entry.name());
            continue;
        };
        let out_path = working_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        extracted.push(out_path);
    }

    Ok(extracted)
}

/// Returns the first of `files` with the extension `extension`.
pub fn find_file_with_extension(files: &[PathBuf], extension: &str) -> Result<PathBuf> {
    files
        .iter()
        .find(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .cloned()
        .ok_or_else(|| Error::msg(format!("No .{} file found in the archive", extension)))
}

// -- Tests -------------------------------------------------------------------
