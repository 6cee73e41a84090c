//! File-system helpers: input discovery, output naming and key loading.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use locafoto_format::keyfile::{self, KEY_FILE_EXTENSION};
use locafoto_format::Keyring;

use crate::config::CliConfig;

/// List the files in `dir` that have a configured image extension.
///
/// Not recursive. Results are sorted by path.
pub async fn discover_images(dir: &Path, config: &CliConfig) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && config.is_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Replace the extension of `path`.
pub fn with_extension(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

/// Append `.extension` unless `path` already ends with it.
pub fn ensure_extension(path: PathBuf, extension: &str) -> PathBuf {
    let has_it = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == extension)
        .unwrap_or(false);
    if has_it {
        path
    } else {
        let mut name = path.into_os_string();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }
}

/// Decode a single key file.
pub async fn read_key_file(path: &Path) -> Result<keyfile::KeyFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read key file {}", path.display()))?;
    keyfile::decode(&bytes).with_context(|| format!("Invalid key file {}", path.display()))
}

/// Build a keyring from explicit key files.
pub async fn load_key_files(paths: &[PathBuf]) -> Result<Keyring> {
    let mut keyring = Keyring::new();
    for path in paths {
        let file = read_key_file(path).await?;
        keyring
            .insert_key_file(file)
            .with_context(|| format!("Unusable key name in {}", path.display()))?;
    }
    Ok(keyring)
}

/// Build a keyring from every `.lfkey` file in `dir`.
///
/// Files that fail to decode are skipped so one bad file does not hide the
/// others. A missing directory yields an empty keyring.
pub async fn load_key_dir(dir: &Path) -> Result<Keyring> {
    let mut keyring = Keyring::new();
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(keyring);
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read key directory {}", dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(KEY_FILE_EXTENSION) {
            continue;
        }
        match read_key_file(&path).await {
            Ok(file) => {
                if let Err(e) = keyring.insert_key_file(file) {
                    debug!(path = %path.display(), error = %e, "Skipping key file");
                }
            }
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping key file"),
        }
    }
    Ok(keyring)
}
