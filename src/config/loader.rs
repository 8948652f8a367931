//! Configuration file loading with precedence handling.

use crate::pipeline::card::CardOptions;
use crate::pipeline::settings::{
    EngineSettings, SizingConfig, DEFAULT_CARD_WIDTH, DEFAULT_COLUMNS_LIMIT,
};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "COLFEED_CONFIG";

/// Environment variable overriding `columns_limit`.
pub const COLUMNS_LIMIT_ENV_VAR: &str = "COLFEED_COLUMNS_LIMIT";

/// Narrowest column that still fits a card.
pub const MIN_COLUMN_WIDTH: u16 = 12;

/// Largest row count accepted for any `[sizing]` key.
pub const MAX_SIZING_ROWS: u32 = 1_000;

/// Cells taken by a column's left and right borders.
const COLUMN_BORDER_WIDTH: u16 = 2;

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax or unknown keys.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// A key holds a value outside its allowed range.
    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// Offending key.
        key: &'static str,
        /// Allowed range.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/colfeed/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Columns at or beyond this position are capped and overridden.
    #[serde(default)]
    pub columns_limit: Option<usize>,

    /// Collapse runs of similar items.
    #[serde(default)]
    pub merge_similar: Option<bool>,

    /// Column width in cells, borders included.
    #[serde(default)]
    pub column_width: Option<u16>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Interval between TUI ticks.
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,

    /// Fixed element sizes. Missing keys keep their defaults.
    #[serde(default)]
    pub sizing: Option<SizingConfig>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Number of leading columns that get a layout.
    pub columns_limit: usize,
    /// Collapse runs of similar items into one card.
    pub merge_similar: bool,
    /// Column width in cells, borders included.
    pub column_width: u16,
    /// Log file location.
    pub log_file_path: PathBuf,
    /// TUI poll interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Row sizes of the list chrome.
    pub sizing: SizingConfig,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            columns_limit: DEFAULT_COLUMNS_LIMIT,
            merge_similar: false,
            column_width: DEFAULT_CARD_WIDTH,
            log_file_path: default_log_path(),
            tick_interval_ms: 250,
            sizing: SizingConfig::default(),
        }
    }
}

impl ResolvedConfig {
    /// Pipeline settings for this configuration.
    ///
    /// Cards are laid out inside the column borders.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            columns_limit: self.columns_limit,
            merge_similar: self.merge_similar,
            card_width: self.column_width.saturating_sub(COLUMN_BORDER_WIDTH),
            card_options: CardOptions::default(),
            sizing: self.sizing,
        }
    }

    /// Reject values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero `columns_limit`, a
    /// `column_width` below [`MIN_COLUMN_WIDTH`], a zero `tick_interval_ms`
    /// or a `[sizing]` value above [`MAX_SIZING_ROWS`].
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.columns_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "columns_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.column_width < MIN_COLUMN_WIDTH {
            return Err(ConfigError::InvalidValue {
                key: "column_width",
                reason: format!("must be at least {MIN_COLUMN_WIDTH}"),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tick_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        let sizing = &self.sizing;
        for (key, rows) in [
            ("sizing.separator", sizing.separator),
            ("sizing.search_header", sizing.search_header),
            ("sizing.loading_indicator", sizing.loading_indicator),
            ("sizing.footer_load_more", sizing.footer_load_more),
            ("sizing.footer_empty", sizing.footer_empty),
            ("sizing.footer_cleared", sizing.footer_cleared),
        ] {
            if rows > MAX_SIZING_ROWS {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("must be at most {MAX_SIZING_ROWS}"),
                });
            }
        }
        Ok(self)
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/colfeed/colfeed.log` on Unix-like systems,
/// or appropriate platform path on other systems.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("colfeed").join("colfeed.log")
    } else {
        PathBuf::from("colfeed.log")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    // Missing file is not an error - use defaults
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/colfeed/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("colfeed").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `COLFEED_CONFIG` environment variable
/// 3. Default path `~/.config/colfeed/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        return load_config_file(PathBuf::from(env_path));
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        columns_limit: config.columns_limit.unwrap_or(defaults.columns_limit),
        merge_similar: config.merge_similar.unwrap_or(defaults.merge_similar),
        column_width: config.column_width.unwrap_or(defaults.column_width),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
        tick_interval_ms: config.tick_interval_ms.unwrap_or(defaults.tick_interval_ms),
        sizing: config.sizing.unwrap_or(defaults.sizing),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `COLFEED_COLUMNS_LIMIT`: Override `columns_limit`
///
/// Values that do not parse as a positive integer are ignored with a warning.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(raw) = std::env::var(COLUMNS_LIMIT_ENV_VAR) {
        match raw.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => config.columns_limit = limit,
            _ => warn!(
                value = %raw,
                "Ignoring {COLUMNS_LIMIT_ENV_VAR}: expected a positive integer"
            ),
        }
    }

    config
}

/// Overrides given on the command line. `None` keeps the resolved value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--columns-limit`.
    pub columns_limit: Option<usize>,
    /// `--merge-similar`.
    pub merge_similar: Option<bool>,
    /// `--column-width`.
    pub column_width: Option<u16>,
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
/// Only applies overrides for flags that were explicitly set by the user.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, overrides: CliOverrides) -> ResolvedConfig {
    if let Some(limit) = overrides.columns_limit {
        config.columns_limit = limit;
    }

    if let Some(merge) = overrides.merge_similar {
        config.merge_similar = merge;
    }

    if let Some(width) = overrides.column_width {
        config.column_width = width;
    }

    config
}

/// Run the whole precedence chain and validate the result.
///
/// # Errors
///
/// Returns error if a config file exists but cannot be read or parsed, or if
/// the resolved values are out of range.
pub fn resolve(
    config_path: Option<PathBuf>,
    overrides: CliOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let file = load_config_with_precedence(config_path)?;
    let config = apply_env_overrides(merge_config(file));
    apply_cli_overrides(config, overrides).validate()
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

#[cfg(test)]
mod log_path_tests {
    use super::*;

    #[test]
    fn default_log_path_ends_with_colfeed_log() {
        let path = default_log_path();
        assert!(
            path.to_string_lossy().ends_with("colfeed.log"),
            "Default log path should end with 'colfeed.log', got: {:?}",
            path
        );
    }

    #[test]
    fn resolved_config_default_includes_log_path() {
        let config = ResolvedConfig::default();
        assert!(
            !config.log_file_path.as_os_str().is_empty(),
            "Default config should have non-empty log_file_path"
        );
    }

    #[test]
    fn config_file_log_path_overrides_default() {
        let custom_path = PathBuf::from("/custom/path/to/app.log");
        let config_file = ConfigFile {
            log_file_path: Some(custom_path.clone()),
            ..Default::default()
        };

        let resolved = merge_config(Some(config_file));
        assert_eq!(
            resolved.log_file_path, custom_path,
            "Config file log_file_path should override default"
        );
    }
}
