//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.fanquery.toml` files, including the endpoint registry.

use crate::models::{default_logo_url, Endpoint};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".fanquery.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Fan-out settings.
    #[serde(default)]
    pub dispatch: DispatchSettings,

    /// Registered endpoints, in dispatch order.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Write rendered results here instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Per-endpoint request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of endpoints queried at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Path appended to each endpoint's base URL.
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// Show a progress bar while endpoints answer.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            concurrency: default_concurrency(),
            endpoint_path: default_endpoint_path(),
            show_progress: true,
        }
    }
}

fn default_timeout() -> u64 {
    5
}

fn default_concurrency() -> usize {
    8
}

fn default_endpoint_path() -> String {
    "/sparql-protected/".to_string()
}

fn default_true() -> bool {
    true
}

/// One `[[endpoints]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl From<&EndpointConfig> for Endpoint {
    fn from(config: &EndpointConfig) -> Self {
        Endpoint {
            name: config.name.clone(),
            base_url: config.url.clone(),
            logo_url: config
                .logo_url
                .clone()
                .unwrap_or_else(|| default_logo_url(&config.name)),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reject settings that would make every dispatch fail.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.timeout_seconds == 0 {
            bail!("dispatch.timeout_seconds must be at least 1");
        }
        if self.dispatch.concurrency == 0 {
            bail!("dispatch.concurrency must be at least 1");
        }
        if let Some(endpoint) = self.endpoints.iter().find(|e| e.name.trim().is_empty()) {
            bail!("endpoint {} has an empty name", endpoint.url);
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.fanquery.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(DEFAULT_CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings. Endpoints
    /// given on the command line are appended after the configured ones.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(timeout) = args.timeout {
            self.dispatch.timeout_seconds = timeout;
        }

        if let Some(concurrency) = args.concurrency {
            self.dispatch.concurrency = concurrency;
        }

        if args.quiet || args.no_progress {
            self.dispatch.show_progress = false;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        for (name, url) in args.parsed_endpoints() {
            self.endpoints.push(EndpointConfig {
                name,
                url,
                logo_url: None,
            });
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level: `quiet` wins, then `general.verbose` (set by the file or `--verbose`).
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The endpoint registry in dispatch order.
    pub fn registry(&self) -> Vec<Endpoint> {
        self.endpoints.iter().map(Endpoint::from).collect()
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let mut config = Config::default();
        config.endpoints.push(EndpointConfig {
            name: "Example node".to_string(),
            url: "https://node.example.org".to_string(),
            logo_url: None,
        });
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dispatch.timeout_seconds, 5);
        assert_eq!(config.dispatch.endpoint_path, "/sparql-protected/");
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[dispatch]
timeout_seconds = 3
concurrency = 2

[[endpoints]]
name = "Turin"
url = "https://turin.example.org/"

[[endpoints]]
name = "Lisbon"
url = "https://lisbon.example.org"
logo_url = "/media/endpoint_logos/lisbon.svg"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.dispatch.timeout_seconds, 3);
        assert_eq!(config.dispatch.concurrency, 2);
        assert!(config.dispatch.show_progress);

        let registry = config.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry[0].name, "Turin");
        assert_eq!(registry[0].logo_url, "/media/endpoint_logos/turin.png");
        assert_eq!(registry[1].logo_url, "/media/endpoint_logos/lisbon.svg");
    }

    #[test]
    fn test_load_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).unwrap().is_none());

        std::fs::write(
            temp_dir.path().join(DEFAULT_CONFIG_FILE),
            "[dispatch]\ntimeout_seconds = 9\n",
        )
        .unwrap();
        let config = Config::load_from_dir(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.dispatch.timeout_seconds, 9);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "[dispatch\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[dispatch]\ntimeout_seconds = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("timeout_seconds must be at least 1"));

        std::fs::write(&path, "[dispatch]\nconcurrency = 0\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_verbose_from_file_sets_log_level() {
        let config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);
        assert_eq!(Config::default().log_level(false), tracing::Level::INFO);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[dispatch]"));
        assert!(toml_str.contains("[[endpoints]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.endpoints.len(), 1);
    }
}
