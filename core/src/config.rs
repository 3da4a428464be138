//! Configuration loading
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`--config` path, `CINDER_CONFIG_PATH`, or `./cinder.toml`)
//! 3. `CINDER_`-prefixed environment variables (`CINDER_LIMITS__MAX_FRAMES`)
//! 4. Builder overrides

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "CINDER";
pub const CONFIG_PATH_VAR: &str = "CINDER_CONFIG_PATH";
const DEFAULT_FILE: &str = "cinder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum depth of the evaluator's frame stack
    pub max_frames: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_frames: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TraceConfig {
    /// Emit a trace event for every checkpoint
    pub checkpoints: bool,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    max_frames: Option<usize>,
    trace_checkpoints: Option<bool>,
}

impl ConfigBuilder {
    /// Explicit config file; a missing explicit file is an error
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn trace_checkpoints(mut self, enabled: Option<bool>) -> Self {
        self.trace_checkpoints = enabled;
        self
    }

    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();
        let mut builder = config::Config::builder()
            .set_default("limits.max_frames", defaults.limits.max_frames as i64)?
            .set_default("trace.checkpoints", defaults.trace.checkpoints)?;

        let path = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));
        builder = match &path {
            Some(path) => builder.add_source(File::from(path.as_path()).format(FileFormat::Toml)),
            None => builder.add_source(File::new(DEFAULT_FILE, FileFormat::Toml).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(max_frames) = self.max_frames {
            builder = builder.set_override("limits.max_frames", max_frames as i64)?;
        }
        if let Some(enabled) = self.trace_checkpoints {
            builder = builder.set_override("trace.checkpoints", enabled)?;
        }

        let settings = match &path {
            Some(path) => builder
                .build()
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => builder.build().context("failed to load configuration")?,
        };
        let config: Config = settings
            .try_deserialize()
            .context("invalid configuration")?;

        if config.limits.max_frames == 0 {
            anyhow::bail!("limits.max_frames must be at least 1");
        }
        Ok(config)
    }
}
