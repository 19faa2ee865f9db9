//! Translator configuration module
//!
//! Layers, lowest to highest precedence: built-in defaults, legacy
//! `GPU_COUNT` / `GPU_INDEX` variables, the TOML config file,
//! `TRANSLATOR_*` environment variables (`__` separates nested keys, e.g.
//! `TRANSLATOR_BACKEND__MODEL`), and finally command-line flags.

use crate::backend::BackendConfig;
use crate::corpus::{DiscoveryConfig, OutputConfig, OutputSink};
use crate::error::TranslatorError;
use crate::prompt::{resolve_profile, Profile, DEFAULT_PROFILE};
use crate::shard::{ShardAssignment, DEFAULT_BATCH_SIZE};

use clap::Parser;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Debug, Default, Parser)]
#[command(name = "corpus-translator", version)]
#[command(about = "Translate this worker's shard of a folder of Chinese text files", long_about = None)]
pub struct Cli {
    /// TOML config file (ignored when missing)
    #[arg(short, long, env = "TRANSLATOR_CONFIG", default_value = "translator.toml")]
    pub config: PathBuf,

    /// Folder containing the source text files
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Folder translations are written to (separate output mode)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of worker processes sharing the folder
    #[arg(long)]
    pub worker_count: Option<usize>,

    /// Index of this worker, 0-based
    #[arg(long)]
    pub worker_index: Option<usize>,

    /// Prompt/sampling profile name
    #[arg(short, long)]
    pub profile: Option<String>,

    /// List this worker's files and exit
    #[arg(long)]
    pub dry_run: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Translator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TranslatorConfig {
    /// Folder containing the source text files
    pub input_dir: PathBuf,

    /// Number of worker processes sharing the input folder
    pub worker_count: usize,

    /// Index of this worker (0-indexed)
    pub worker_index: usize,

    /// Requests in flight at once
    pub max_batch_size: usize,

    /// Selected profile name
    pub profile: String,

    /// Profiles declared in the config file
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    pub backend: BackendConfig,
    pub discovery: DiscoveryConfig,
    pub output: OutputConfig,

    /// Port for /health, /progress and /metrics; no server when unset
    #[serde(default)]
    pub http_port: Option<u16>,

    /// Where the JSON run report is written; no report when unset
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_format: LogFormat,
}

fn config_error(e: ConfigError) -> TranslatorError {
    TranslatorError::Config(e.to_string())
}

fn legacy_number(name: &str, value: Option<String>) -> Result<Option<u64>, TranslatorError> {
    value
        .map(|v| {
            v.trim().parse::<u64>().map_err(|e| {
                TranslatorError::Config(format!("{name} must be a valid number: {e}"))
            })
        })
        .transpose()
}

impl TranslatorConfig {
    /// Load configuration from `.env`, the process environment, the config
    /// file and the command line
    pub fn load(cli: &Cli) -> Result<Self, TranslatorError> {
        dotenvy::dotenv().ok();
        Self::from_sources(cli, None)
    }

    /// Load configuration with an explicit variable map standing in for the
    /// process environment (`None` reads the real environment)
    pub fn from_sources(
        cli: &Cli,
        vars: Option<HashMap<String, String>>,
    ) -> Result<Self, TranslatorError> {
        let lookup = |key: &str| match vars {
            Some(ref map) => map.get(key).cloned(),
            None => std::env::var(key).ok(),
        };

        // Per-GPU launch variables, kept as defaults for existing job scripts
        let worker_count = legacy_number("GPU_COUNT", lookup("GPU_COUNT"))?.unwrap_or(1);
        let worker_index = legacy_number("GPU_INDEX", lookup("GPU_INDEX"))?.unwrap_or(0);

        let builder = Config::builder()
            .set_default("worker_count", worker_count)
            .and_then(|b| b.set_default("worker_index", worker_index))
            .and_then(|b| b.set_default("max_batch_size", DEFAULT_BATCH_SIZE as u64))
            .and_then(|b| b.set_default("profile", DEFAULT_PROFILE))
            .and_then(|b| b.set_default("backend.endpoint", "http://localhost:8000/v1"))
            .and_then(|b| b.set_default("backend.model", "Qwen/Qwen2-7B-Instruct"))
            .and_then(|b| b.set_default("backend.timeout_secs", 180_u64))
            .and_then(|b| b.set_default("backend.mode", "chat"))
            .and_then(|b| b.set_default("discovery.extensions", vec!["txt"]))
            .and_then(|b| b.set_default("discovery.include_hidden", false))
            .and_then(|b| b.set_default("discovery.trim", true))
            .and_then(|b| b.set_default("output.mode", "separate"))
            .and_then(|b| b.set_default("output.suffix", "_English"))
            .and_then(|b| b.set_default("log_level", "info"))
            .and_then(|b| b.set_default("log_format", "text"))
            .map_err(config_error)?;

        let settings = builder
            .add_source(
                File::from(cli.config.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("TRANSLATOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars.clone()),
            )
            .set_override_option(
                "input_dir",
                cli.input_dir.as_ref().map(|p| p.to_string_lossy().into_owned()),
            )
            .and_then(|b| {
                b.set_override_option(
                    "output.dir",
                    cli.output_dir.as_ref().map(|p| p.to_string_lossy().into_owned()),
                )
            })
            .and_then(|b| b.set_override_option("worker_count", cli.worker_count.map(|n| n as u64)))
            .and_then(|b| b.set_override_option("worker_index", cli.worker_index.map(|n| n as u64)))
            .and_then(|b| b.set_override_option("profile", cli.profile.clone()))
            .map_err(config_error)?
            .build()
            .map_err(config_error)?;

        let config: Self = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints once, up front
    pub fn validate(&self) -> Result<(), TranslatorError> {
        self.assignment()?;
        self.resolved_profile()?;
        self.sink()?;

        if self.max_batch_size == 0 {
            return Err(TranslatorError::Config(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.backend.endpoint.trim().is_empty() {
            return Err(TranslatorError::Config(
                "backend.endpoint must not be empty".to_string(),
            ));
        }
        if self.backend.model.trim().is_empty() {
            return Err(TranslatorError::Config(
                "backend.model must not be empty".to_string(),
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(TranslatorError::Config(
                "backend.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// This process's shard assignment
    pub fn assignment(&self) -> Result<ShardAssignment, TranslatorError> {
        ShardAssignment::new(self.worker_count, self.worker_index)
    }

    /// The selected profile, config-declared profiles taking precedence
    pub fn resolved_profile(&self) -> Result<Profile, TranslatorError> {
        resolve_profile(&self.profile, &self.profiles)
    }

    pub fn sink(&self) -> Result<OutputSink, TranslatorError> {
        OutputSink::from_config(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GenerationMode;
    use crate::corpus::OutputMode;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn cli_without_file() -> Cli {
        Cli {
            config: PathBuf::from("/nonexistent/translator.toml"),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply_with_only_required_values() {
        let config = TranslatorConfig::from_sources(
            &cli_without_file(),
            vars(&[
                ("TRANSLATOR_INPUT_DIR", "/data/zh"),
                ("TRANSLATOR_OUTPUT__DIR", "/data/en"),
            ]),
        )
        .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("/data/zh"));
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.worker_index, 0);
        assert_eq!(config.max_batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.profile, "dialogue");
        assert_eq!(config.backend.endpoint, "http://localhost:8000/v1");
        assert_eq!(config.backend.timeout_secs, 180);
        assert_eq!(config.backend.mode, GenerationMode::Chat);
        assert_eq!(config.discovery.extensions, vec!["txt".to_string()]);
        assert!(config.discovery.trim);
        assert_eq!(config.output.mode, OutputMode::Separate);
        assert_eq!(config.output.suffix, "_English");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.http_port, None);
    }

    #[test]
    fn missing_input_dir_is_config_error() {
        let err = TranslatorConfig::from_sources(&cli_without_file(), vars(&[])).unwrap_err();
        assert!(matches!(err, TranslatorError::Config(ref msg) if msg.contains("input_dir")));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = TranslatorConfig::from_sources(
            &cli_without_file(),
            vars(&[
                ("TRANSLATOR_INPUT_DIR", "/in"),
                ("TRANSLATOR_WORKER_COUNT", "4"),
                ("TRANSLATOR_WORKER_INDEX", "3"),
                ("TRANSLATOR_BACKEND__MODEL", "llama3"),
                ("TRANSLATOR_BACKEND__MODE", "completion"),
                ("TRANSLATOR_OUTPUT__MODE", "append"),
                ("TRANSLATOR_HTTP_PORT", "9090"),
            ]),
        )
        .unwrap();

        assert_eq!(config.assignment().unwrap(), ShardAssignment::new(4, 3).unwrap());
        assert_eq!(config.backend.model, "llama3");
        assert_eq!(config.backend.mode, GenerationMode::Completion);
        assert_eq!(config.output.mode, OutputMode::Append);
        assert_eq!(config.http_port, Some(9090));
    }

    #[test]
    fn legacy_gpu_variables_are_fallbacks() {
        let config = TranslatorConfig::from_sources(
            &cli_without_file(),
            vars(&[
                ("TRANSLATOR_INPUT_DIR", "/in"),
                ("TRANSLATOR_OUTPUT__DIR", "/out"),
                ("GPU_COUNT", "8"),
                ("GPU_INDEX", "5"),
            ]),
        )
        .unwrap();
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.worker_index, 5);

        let config = TranslatorConfig::from_sources(
            &cli_without_file(),
            vars(&[
                ("TRANSLATOR_INPUT_DIR", "/in"),
                ("TRANSLATOR_OUTPUT__DIR", "/out"),
                ("TRANSLATOR_WORKER_COUNT", "2"),
                ("GPU_COUNT", "8"),
            ]),
        )
        .unwrap();
        assert_eq!(config.worker_count, 2);
    }

    #[test]
    fn cli_flags_win_over_environment() {
        let cli = Cli {
            input_dir: Some(PathBuf::from("/cli/in")),
            output_dir: Some(PathBuf::from("/cli/out")),
            worker_count: Some(3),
            worker_index: Some(2),
            profile: Some("adaptation".to_string()),
            ..cli_without_file()
        };
        let config = TranslatorConfig::from_sources(
            &cli,
            vars(&[
                ("TRANSLATOR_INPUT_DIR", "/env/in"),
                ("TRANSLATOR_WORKER_COUNT", "10"),
                ("TRANSLATOR_PROFILE", "dialogue"),
            ]),
        )
        .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("/cli/in"));
        assert_eq!(config.output.dir, Some(PathBuf::from("/cli/out")));
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.worker_index, 2);
        assert_eq!(config.resolved_profile().unwrap(), Profile::adaptation());
    }

    #[test]
    fn invalid_shard_is_rejected_at_load() {
        let cli = Cli {
            input_dir: Some(PathBuf::from("/in")),
            output_dir: Some(PathBuf::from("/out")),
            worker_count: Some(2),
            worker_index: Some(2),
            ..cli_without_file()
        };
        let err = TranslatorConfig::from_sources(&cli, vars(&[])).unwrap_err();
        assert!(matches!(
            err,
            TranslatorError::InvalidShard {
                worker_count: 2,
                worker_index: 2
            }
        ));

        let cli = Cli {
            worker_count: Some(0),
            worker_index: Some(0),
            ..cli
        };
        assert!(TranslatorConfig::from_sources(&cli, vars(&[])).is_err());
    }

    #[test]
    fn separate_mode_without_output_dir_is_rejected() {
        let err = TranslatorConfig::from_sources(
            &cli_without_file(),
            vars(&[("TRANSLATOR_INPUT_DIR", "/in")]),
        )
        .unwrap_err();
        assert!(matches!(err, TranslatorError::Config(ref msg) if msg.contains("output.dir")));
    }

    #[test]
    fn config_file_declares_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translator.toml");
        std::fs::write(
            &path,
            r#"
input_dir = "/corpus/zh"
profile = "subtitles"
max_batch_size = 32

[output]
mode = "append"

[discovery]
extensions = ["srt", "txt"]
trim = false

[profiles.subtitles]
system_prompt = "Translate subtitles into English."
instruction = ""

[profiles.subtitles.sampling]
temperature = 0.2
top_p = 0.95
max_tokens = 512
"#,
        )
        .unwrap();

        let cli = Cli {
            config: path,
            ..Default::default()
        };
        let config = TranslatorConfig::from_sources(&cli, vars(&[])).unwrap();

        assert_eq!(config.max_batch_size, 32);
        assert_eq!(config.discovery.extensions, vec!["srt", "txt"]);
        assert!(!config.discovery.trim);

        let profile = config.resolved_profile().unwrap();
        assert_eq!(profile.system_prompt, "Translate subtitles into English.");
        assert_eq!(profile.sampling.max_tokens, Some(512));
        assert_eq!(profile.sampling.repetition_penalty, None);
    }

    #[test]
    fn unknown_profile_fails_validation() {
        let cli = Cli {
            input_dir: Some(PathBuf::from("/in")),
            output_dir: Some(PathBuf::from("/out")),
            profile: Some("haiku".to_string()),
            ..cli_without_file()
        };
        let err = TranslatorConfig::from_sources(&cli, vars(&[])).unwrap_err();
        assert!(matches!(err, TranslatorError::UnknownProfile { .. }));
    }

    #[test]
    fn sample_config_file_loads() {
        let cli = Cli {
            config: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("translator.example.toml"),
            ..Default::default()
        };
        let config = TranslatorConfig::from_sources(&cli, vars(&[])).unwrap();

        assert_eq!(config.profile, "adaptation");
        assert!(config.profiles.contains_key("subtitles"));
        assert_eq!(config.output.dir, Some(PathBuf::from("data/english")));
        assert_eq!(config.resolved_profile().unwrap(), Profile::adaptation());
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "corpus-translator",
            "--input-dir",
            "/in",
            "--worker-count",
            "4",
            "--worker-index",
            "1",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.input_dir, Some(PathBuf::from("/in")));
        assert_eq!(cli.worker_count, Some(4));
        assert_eq!(cli.worker_index, Some(1));
        assert!(cli.dry_run);
    }
}
