//! Output writing

use crate::error::TranslatorError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Where translated text goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One new file per input in the output directory
    #[default]
    Separate,
    /// Append to the input file itself
    Append,
}

/// Output settings
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Appended to the input file stem in `separate` mode
    pub suffix: String,
}

/// Writes generated text according to the output mode
#[derive(Debug, Clone)]
pub enum OutputSink {
    Separate { dir: PathBuf, suffix: String },
    Append,
}

impl OutputSink {
    pub fn from_config(config: &OutputConfig) -> Result<Self, TranslatorError> {
        match config.mode {
            OutputMode::Separate => {
                let dir = config.dir.clone().ok_or_else(|| {
                    TranslatorError::Config(
                        "output.dir must be set when output.mode is 'separate'".to_string(),
                    )
                })?;
                Ok(Self::Separate {
                    dir,
                    suffix: config.suffix.clone(),
                })
            }
            OutputMode::Append => Ok(Self::Append),
        }
    }

    /// Create the output directory if this sink needs one
    pub async fn prepare(&self) -> Result<(), TranslatorError> {
        if let Self::Separate { dir, .. } = self {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| TranslatorError::io(dir, e))?;
        }
        Ok(())
    }

    /// Fail when two sources would be written to the same path
    ///
    /// Run over the whole corpus, not one shard, so that workers never race
    /// on a shared output file.
    pub fn check_targets(&self, sources: &[PathBuf]) -> Result<(), TranslatorError> {
        let mut seen: HashMap<PathBuf, &Path> = HashMap::with_capacity(sources.len());
        for source in sources {
            let target = self.target_for(source);
            if let Some(first) = seen.insert(target.clone(), source) {
                return Err(TranslatorError::Config(format!(
                    "{} and {} would both be written to {}",
                    first.display(),
                    source.display(),
                    target.display()
                )));
            }
        }
        Ok(())
    }

    /// Path the translation of `source` is written to
    pub fn target_for(&self, source: &Path) -> PathBuf {
        match self {
            Self::Separate { dir, suffix } => {
                let stem = source
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                dir.join(format!("{stem}{suffix}.txt"))
            }
            Self::Append => source.to_path_buf(),
        }
    }

    /// Write `text` for `source` and return the path written
    pub async fn write(&self, source: &Path, text: &str) -> Result<PathBuf, TranslatorError> {
        let target = self.target_for(source);

        match self {
            Self::Separate { .. } => {
                tokio::fs::write(&target, text)
                    .await
                    .map_err(|e| TranslatorError::io(&target, e))?;
            }
            Self::Append => {
                let mut file = tokio::fs::OpenOptions::new()
                    .append(true)
                    .open(&target)
                    .await
                    .map_err(|e| TranslatorError::io(&target, e))?;
                file.write_all(format!("\n{text}").as_bytes())
                    .await
                    .map_err(|e| TranslatorError::io(&target, e))?;
                file.flush()
                    .await
                    .map_err(|e| TranslatorError::io(&target, e))?;
            }
        }

        Ok(target)
    }
}
