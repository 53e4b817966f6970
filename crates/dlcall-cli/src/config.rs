//! Configuration system for dlcall
//!
//! Supports multiple configuration sources with proper precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. Configuration files (.dlcall, .dlcall.yaml, .dlcall.json, etc.)
//! 4. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Main dlcall configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DlcallConfig {
    /// Arguments for the native calls
    #[serde(default)]
    pub call: CallConfig,
    /// Library contract settings
    #[serde(default)]
    pub library: LibraryConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Arguments passed to `compute` and the size of the `transform` buffer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallConfig {
    /// First operand of `compute`
    #[serde(default = "default_first")]
    pub first: f64,
    /// Second operand of `compute`
    #[serde(default = "default_second")]
    pub second: f64,
    /// Opcode handed to `compute`
    #[serde(default = "default_op")]
    pub op: String,
    /// Number of values handed to `transform`
    #[serde(default = "default_len")]
    pub len: usize,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            first: default_first(),
            second: default_second(),
            op: default_op(),
            len: default_len(),
        }
    }
}

/// Library contract settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LibraryConfig {
    /// `.ffi` file the library's exports are checked against before calling
    pub signatures: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default)]
    pub level: LogLevel,
    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LoggingConfig {
    /// `debug` raises the level to at least Debug; it never lowers it.
    pub fn effective_filter(&self) -> log::LevelFilter {
        let filter = self.level.to_filter();
        if self.debug {
            filter.max(log::LevelFilter::Debug)
        } else {
            filter
        }
    }
}

impl LogLevel {
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_first() -> f64 {
    2.0
}

fn default_second() -> f64 {
    3.0
}

fn default_op() -> String {
    "div".to_string()
}

fn default_len() -> usize {
    10
}

/// Result of [`ConfigLoader::load`]
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DlcallConfig,
    /// File the configuration was read from, if any
    pub source: Option<PathBuf>,
}

/// Configuration loader with multiple source support
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper precedence.
    ///
    /// An explicit path must exist; otherwise the usual locations are searched.
    /// Runs before the logger exists; `source` names the file used, if any.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
        let source = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_files().into_iter().find(|p| p.is_file()),
        };
        let mut config = match &source {
            Some(path) => Self::load_from_file(path)?,
            None => DlcallConfig::default(),
        };
        Self::apply_environment_variables(&mut config)?;
        Ok(LoadedConfig { config, source })
    }

    /// Find potential configuration file paths
    fn find_config_files() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            for name in [
                ".dlcall",
                ".dlcall.toml",
                ".dlcall.yaml",
                ".dlcall.yml",
                ".dlcall.json",
            ] {
                paths.push(current_dir.join(name));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("dlcall/config.toml"));
            paths.push(config_dir.join("dlcall/config.yaml"));
            paths.push(config_dir.join("dlcall/config.json"));
        }

        paths
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<DlcallConfig> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            // `.dlcall` is TOML
            None if path.file_name().and_then(|n| n.to_str()) == Some(".dlcall") => {
                toml::from_str(&content).with_context(|| {
                    format!("Failed to parse .dlcall (TOML) config: {}", path.display())
                })?
            }
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            _ => {
                if let Ok(config) = toml::from_str(&content) {
                    config
                } else if let Ok(config) = serde_yaml::from_str(&content) {
                    config
                } else if let Ok(config) = serde_json::from_str(&content) {
                    config
                } else {
                    return Err(anyhow::anyhow!(
                        "Could not parse config file {} (tried TOML, YAML, JSON)",
                        path.display()
                    ));
                }
            }
        };

        Ok(Self::resolve_relative_paths(config, path))
    }

    /// Paths inside a config file are relative to the file, not the cwd.
    fn resolve_relative_paths(mut config: DlcallConfig, file: &Path) -> DlcallConfig {
        let base = file.parent().unwrap_or_else(|| Path::new(""));
        if let Some(signatures) = &config.library.signatures {
            if signatures.is_relative() {
                config.library.signatures = Some(base.join(signatures));
            }
        }
        config
    }

    /// Apply environment variable overrides
    fn apply_environment_variables(config: &mut DlcallConfig) -> Result<()> {
        if let Ok(first) = env::var("DLCALL_FIRST") {
            config.call.first = first
                .parse()
                .with_context(|| format!("Invalid DLCALL_FIRST value '{first}'"))?;
        }
        if let Ok(second) = env::var("DLCALL_SECOND") {
            config.call.second = second
                .parse()
                .with_context(|| format!("Invalid DLCALL_SECOND value '{second}'"))?;
        }
        if let Ok(op) = env::var("DLCALL_OP") {
            config.call.op = op;
        }
        if let Ok(len) = env::var("DLCALL_LEN") {
            config.call.len = len
                .parse()
                .with_context(|| format!("Invalid DLCALL_LEN value '{len}'"))?;
        }

        if let Ok(path) = env::var("DLCALL_SIGNATURES") {
            config.library.signatures = (!path.is_empty()).then(|| PathBuf::from(path));
        }

        if let Ok(level) = env::var("DLCALL_LOG_LEVEL") {
            config.logging.level = match level.to_lowercase().as_str() {
                "error" => LogLevel::Error,
                "warn" => LogLevel::Warn,
                "info" => LogLevel::Info,
                "debug" => LogLevel::Debug,
                "trace" => LogLevel::Trace,
                _ => config.logging.level,
            };
        }
        if let Some(flag) = env::var("DLCALL_DEBUG").ok().and_then(|v| parse_bool(&v)) {
            config.logging.debug = flag;
        }

        Ok(())
    }

    /// Save configuration to a file
    pub fn save_to_file(config: &DlcallConfig, path: &Path) -> Result<()> {
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(config)
                .context("Failed to serialize config to JSON")?,
            Some("toml") => {
                toml::to_string_pretty(config).context("Failed to serialize config to TOML")?
            }
            _ => serde_yaml::to_string(config).context("Failed to serialize config to YAML")?,
        };

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> String {
        let config = DlcallConfig::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| "# Failed to generate config".to_string())
    }
}

/// Parse a boolean value from string with various formats
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enable" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disable" | "disabled" => Some(false),
        "" => Some(false),
        _ => None,
    }
}
