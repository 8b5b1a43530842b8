//! CLI configuration management
//!
//! Handles loading and saving CLI-specific configuration: where the
//! liquidctl executable lives, the default output format, and verbosity.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Path to (or name of, resolved via PATH) the liquidctl executable
    pub exe: String,

    /// Default output format ("table" or "json")
    pub output_format: String,

    /// Enable verbose logging by default
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            exe: "liquidctl".to_string(),
            output_format: "table".to_string(),
            verbose: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read CLI config file")?;

            toml::from_str(&content).context("Failed to parse CLI config file")
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize CLI config")?;

        std::fs::write(&config_path, content).context("Failed to write CLI config file")?;

        Ok(())
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".config")
        } else {
            return Err(anyhow::anyhow!("Cannot determine config directory"));
        };

        Ok(config_dir.join("liquidbridge").join("cli.toml"))
    }

    /// Update configuration with environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(exe) = std::env::var("LIQUIDBRIDGE_EXE") {
            self.exe = exe;
        }

        if let Ok(format) = std::env::var("LIQUIDBRIDGE_FORMAT") {
            self.output_format = format;
        }

        if let Ok(verbose) = std::env::var("LIQUIDBRIDGE_VERBOSE") {
            self.verbose = verbose.to_lowercase() == "true" || verbose == "1";
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.exe, "liquidctl");
        assert_eq!(config.output_format, "table");
        assert!(!config.verbose);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CliConfig {
            exe: "/usr/local/bin/liquidctl".to_string(),
            output_format: "json".to_string(),
            verbose: true,
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_partial_config_fails() {
        // All fields are required; a truncated file should not silently
        // fall back to defaults
        let result = toml::from_str::<CliConfig>("exe = \"liquidctl\"");
        assert!(result.is_err());
    }
}
