//! CLI configuration.
//!
//! Everything has a default; a JSON file given with `--config` or
//! `LOCAFOTO_CONFIG` overrides individual fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "LOCAFOTO_CONFIG";

/// Settings for the `locafoto` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// File extensions picked up when encrypting a directory.
    pub image_extensions: Vec<String>,
    /// Directory searched for key files when none are given explicitly.
    pub key_dir: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            image_extensions: ["jpg", "jpeg", "png", "heic", "heif", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            key_dir: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from `path`, else from `LOCAFOTO_CONFIG`, else
    /// defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        };

        match path {
            Some(path) => {
                let json = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_json(&json)
                    .with_context(|| format!("Invalid config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether `path` has one of the configured image extensions.
    ///
    /// Comparison ignores case.
    pub fn is_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.image_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Directory to search for key files.
    pub fn key_dir(&self) -> Option<PathBuf> {
        self.key_dir.clone().or_else(default_key_dir)
    }
}

fn default_key_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("locafoto").join("keys"))
}
