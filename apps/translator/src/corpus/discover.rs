//! Input file discovery and reading

use crate::error::TranslatorError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which files of the input directory are translated
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Allowed extensions without the dot; empty means every file
    pub extensions: Vec<String>,
    pub include_hidden: bool,
    /// Strip leading and trailing whitespace from file contents
    pub trim: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["txt".to_string()],
            include_hidden: false,
            trim: true,
        }
    }
}

impl DiscoveryConfig {
    fn accepts(&self, name: &str, path: &Path) -> bool {
        if !self.include_hidden && name.starts_with('.') {
            return false;
        }
        if self.extensions.is_empty() {
            return true;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

/// List the regular files directly inside `dir`, sorted by file name
///
/// Every worker process must see the same list before partitioning, so the
/// order never depends on the directory iteration order.
pub async fn discover_inputs(
    dir: &Path,
    config: &DiscoveryConfig,
) -> Result<Vec<PathBuf>, TranslatorError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| TranslatorError::io(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TranslatorError::io(dir, e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| TranslatorError::io(&path, e))?;

        // Symlinks count when they point at a regular file
        let is_file = if file_type.is_symlink() {
            tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false)
        } else {
            file_type.is_file()
        };
        if !is_file {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            warn!(path = %path.display(), "Skipping input with a non UTF-8 file name");
            continue;
        };

        if config.accepts(name, &path) {
            files.push(path);
        } else {
            debug!(path = %path.display(), "Skipping file not matching discovery filters");
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Read a whole input file as UTF-8
pub async fn read_input(path: &Path, trim: bool) -> Result<String, TranslatorError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TranslatorError::io(path, e))?;

    if trim {
        Ok(content.trim().to_string())
    } else {
        Ok(content)
    }
}
