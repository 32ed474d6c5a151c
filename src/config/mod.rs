//! Configuration module.
//!
//! Handles loading and parsing the .autocomprc configuration file.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use crate::logging::LogConfig;
use crate::pipeline::debounce::MAX_DEBOUNCE_MS;

/// Default .autocomprc file content with all settings documented.
const DEFAULT_AUTOCOMPRC: &str = r#"# Autocomp Configuration File
# ============================
# This file is read on startup.
# Lines starting with '#' are comments.
#
# Completion
# ----------
# while_typing = true        # Query as you type (manual invoke always works)
# debounce_delay = 300       # Quiet period in ms before a query is issued
# max_distance = 10          # Max chars the cursor may run ahead of a query
# max_results = 25           # Candidates shown before "show all"
# max_results_hard = 200     # Candidates shown after "show all"
# show_matches = true        # Keep candidates identical to the typed word
# auto_docblock = false      # Treat documentation blocks as presentable
# calltip_while_typing = false  # Calltips bypass the trigger blacklist

# Logging Configuration
# ---------------------
# Logs are stored in ~/.autocomp/logs/ with automatic cleanup.
#
# log_enabled = true         # Enable/disable file logging (true/false)
# log_level = info           # Log level: trace, debug, info, warn, error, off
# log_retention = 24         # Hours to keep log files (default: 24)
"#;

/// Completion-pipeline preferences.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Query while the user types; manual invocation ignores this.
    pub while_typing: bool,
    /// Scheduler quiet period.
    pub debounce: Duration,
    /// Maximum distance the cursor may advance past a query's anchor before
    /// its response is discarded.
    pub max_distance: usize,
    /// Soft cap: candidates shown before the "show all" affordance.
    pub max_results: usize,
    /// Hard cap: candidates shown after "show all", and the query limit.
    pub max_results_hard: usize,
    /// Whether candidates identical to the typed word stay visible.
    pub show_matches: bool,
    /// Whether a documentation block counts as presentable content.
    pub auto_docblock: bool,
    /// Whether calltips trigger while typing (bypasses the blacklist when a
    /// signature/doc block is active).
    pub calltip_while_typing: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            while_typing: true,
            debounce: Duration::from_millis(300),
            max_distance: 10,
            max_results: 25,
            max_results_hard: 200,
            show_matches: true,
            auto_docblock: false,
            calltip_while_typing: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Completion preferences.
    pub completion: CompletionConfig,
    /// Logging configuration.
    pub log_config: LogConfig,
    /// Path to config file.
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            log_config: LogConfig::default(),
            config_path: Self::default_config_path(),
        }
    }
}

impl Config {
    /// Returns the default config file path (~/.autocomprc).
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".autocomprc")
    }

    /// Loads configuration from the default path, creating it if it doesn't
    /// exist.
    ///
    /// # Errors
    /// Returns error if config cannot be read.
    pub fn load() -> io::Result<Self> {
        let path = Self::default_config_path();
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    ///
    /// # Errors
    /// Returns error if config cannot be read.
    pub fn load_from(path: &PathBuf) -> io::Result<Self> {
        if !path.exists() {
            Self::create_default_config(path)?;
        }

        let content = fs::read_to_string(path)?;
        let mut config = Self {
            config_path: path.clone(),
            ..Self::default()
        };
        config.parse(&content);
        Ok(config)
    }

    /// Creates the default config file.
    fn create_default_config(path: &PathBuf) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_AUTOCOMPRC.as_bytes())?;
        Ok(())
    }

    /// Parses the config file content.
    fn parse(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                // Remove inline comments
                let value = value.split('#').next().unwrap_or(value).trim();

                self.apply_setting(key, value);
            }
        }
    }

    fn parse_bool(value: &str) -> bool {
        matches!(value.to_lowercase().as_str(), "true" | "yes" | "1" | "on")
    }

    /// Applies a single setting.
    fn apply_setting(&mut self, key: &str, value: &str) {
        match key {
            "while_typing" => {
                self.completion.while_typing = Self::parse_bool(value);
            }
            "debounce_delay" | "debounce_delay_ms" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.completion.debounce = Duration::from_millis(ms.min(MAX_DEBOUNCE_MS));
                }
            }
            "max_distance" => {
                if let Ok(distance) = value.parse() {
                    self.completion.max_distance = distance;
                }
            }
            "max_results" => {
                if let Ok(count) = value.parse::<usize>() {
                    self.completion.max_results = count.max(1);
                }
            }
            "max_results_hard" => {
                if let Ok(count) = value.parse::<usize>() {
                    self.completion.max_results_hard = count.max(self.completion.max_results);
                }
            }
            "show_matches" => {
                self.completion.show_matches = Self::parse_bool(value);
            }
            "auto_docblock" => {
                self.completion.auto_docblock = Self::parse_bool(value);
            }
            "calltip_while_typing" => {
                self.completion.calltip_while_typing = Self::parse_bool(value);
            }
            "log_level" => {
                self.log_config.level = LogConfig::parse_level(value);
            }
            "log_retention" | "log_retention_hours" => {
                self.log_config.retention_hours = LogConfig::parse_retention(value);
            }
            "log_enabled" | "logging" => {
                self.log_config.enabled = Self::parse_bool(value);
            }
            _ => {}
        }
    }

    /// Reloads the configuration from disk.
    ///
    /// # Errors
    /// Returns error if config cannot be read.
    pub fn reload(&mut self) -> io::Result<()> {
        let path = self.config_path.clone();
        *self = Self::load_from(&path)?;
        Ok(())
    }
}
