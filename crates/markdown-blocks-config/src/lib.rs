use markdown_blocks_engine::performance::{CacheOptions, StrategyThresholds};
use markdown_blocks_engine::{
    CalloutStyle, EditorOptions, EngineOptions, ParserExtensions, RecoveryOptions, SerializerSettings,
    ToggleReassembly,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

/// User settings, as stored in `config.toml`. Missing keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub callout_style: CalloutStyle,
    pub toggles: ToggleReassembly,
    pub parser: ParserConfig,
    pub performance: PerformanceConfig,
    pub recovery: RecoveryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub tables: bool,
    pub task_lists: bool,
    pub strikethrough: bool,
    pub autolinks: bool,
    pub front_matter: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let full = ParserExtensions::full();
        Self {
            tables: full.tables,
            task_lists: full.task_lists,
            strikethrough: full.strikethrough,
            autolinks: full.autolinks,
            front_matter: full.front_matter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    pub verify_cache_content: bool,
    pub monitor_capacity: usize,
    pub standard_max_score: usize,
    pub batched_max_score: usize,
    pub batched_min_bytes: usize,
    pub streaming_min_bytes: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        let cache = CacheOptions::default();
        let thresholds = StrategyThresholds::default();
        Self {
            cache_capacity: cache.capacity,
            cache_ttl_secs: cache.ttl.as_secs(),
            verify_cache_content: cache.verify_full_content,
            monitor_capacity: EngineOptions::default().monitor_capacity,
            standard_max_score: thresholds.standard_max_score,
            batched_max_score: thresholds.batched_max_score,
            batched_min_bytes: thresholds.batched_min_bytes,
            streaming_min_bytes: thresholds.streaming_min_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub chunk_large_documents: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        let recovery = RecoveryOptions::default();
        Self {
            enabled: recovery.enable_recovery,
            max_retries: recovery.max_retries,
            chunk_large_documents: recovery.chunk_large_documents,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// The settings file if there is one, defaults otherwise.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/markdown-blocks");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Expands `~` and environment variables in a user-supplied path.
    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let perf = &self.performance;
        if perf.standard_max_score > perf.batched_max_score {
            return Err(ConfigError::InvalidSetting {
                key: "performance.standard_max_score",
                reason: format!(
                    "{} is above batched_max_score ({})",
                    perf.standard_max_score, perf.batched_max_score
                ),
            });
        }
        if perf.cache_capacity > 0 && perf.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "performance.cache_ttl_secs",
                reason: "must be positive while the cache is enabled".to_string(),
            });
        }
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        let perf = &self.performance;
        EngineOptions {
            callout_style: self.callout_style,
            toggles: self.toggles,
            extensions: ParserExtensions {
                tables: self.parser.tables,
                task_lists: self.parser.task_lists,
                strikethrough: self.parser.strikethrough,
                autolinks: self.parser.autolinks,
                front_matter: self.parser.front_matter,
            },
            thresholds: StrategyThresholds {
                standard_max_score: perf.standard_max_score,
                batched_max_score: perf.batched_max_score,
                batched_min_bytes: perf.batched_min_bytes,
                streaming_min_bytes: perf.streaming_min_bytes,
            },
            cache: CacheOptions {
                capacity: perf.cache_capacity,
                ttl: Duration::from_secs(perf.cache_ttl_secs),
                verify_full_content: perf.verify_cache_content,
            },
            recovery: RecoveryOptions {
                enable_recovery: self.recovery.enabled,
                max_retries: self.recovery.max_retries,
                chunk_large_documents: self.recovery.chunk_large_documents,
            },
            monitor_capacity: perf.monitor_capacity,
        }
    }

    pub fn editor_options(&self) -> EditorOptions {
        EditorOptions {
            toggles: self.toggles,
            extensions: self.engine_options().extensions,
        }
    }
}

impl SerializerSettings for Config {
    fn callout_style(&self) -> CalloutStyle {
        self.callout_style
    }
}
