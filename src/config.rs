//! Configuration management for BDC Fetcher
//!
//! This module provides unified configuration management with automatic
//! first-run initialization, multi-source loading, and zero-config defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, OutputLayout};
use crate::constants::{api, env as env_constants, limits};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP client settings
    #[serde(default)]
    pub client: ClientConfigToml,
    /// Output layout settings
    #[serde(default)]
    pub output: OutputConfigToml,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Map API base URL (overridden by the BDC_BASE_URL environment
    /// variable when set)
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Connection pool idle timeout in seconds
    pub pool_idle_timeout_secs: u64,
    /// Maximum connections per host
    pub pool_max_per_host: usize,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_secs: 300,
            connect_timeout_secs: 30,
            pool_idle_timeout_secs: 90,
            pool_max_per_host: 4,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// TOML-friendly output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfigToml {
    /// Root directory for downloads and converted layers (leave empty for
    /// ./data/output under the working directory)
    pub output_root: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to the runtime client
    /// configuration.
    ///
    /// The base URL resolves in precedence order: BDC_BASE_URL environment
    /// variable, then the config file, then the built-in default.
    pub fn to_client_config(&self) -> ClientConfig {
        let base_url = env::var(env_constants::BASE_URL)
            .ok()
            .or_else(|| self.client.base_url.clone())
            .unwrap_or_else(|| api::DEFAULT_BASE_URL.to_string());

        ClientConfig {
            base_url,
            request_timeout: Duration::from_secs(self.client.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.client.connect_timeout_secs),
            pool_idle_timeout: Some(Duration::from_secs(self.client.pool_idle_timeout_secs)),
            pool_max_per_host: self.client.pool_max_per_host,
            rate_limit_rps: self.client.rate_limit_rps,
        }
    }

    /// Resolve the output layout from configuration
    pub fn to_output_layout(&self) -> std::io::Result<OutputLayout> {
        match &self.output.output_root {
            Some(root) => Ok(OutputLayout::new(root.clone())),
            None => OutputLayout::default_local(),
        }
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = if let Some(ref path) = config_file_override {
            Some(path.clone())
        } else {
            Self::find_config_file()?
        };

        if let Some(path) = config_path {
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                config = Self::load_from_file(&path).await?;
            } else if config_file_override.is_some() {
                return Err(ConfigError::NotFound { path }.into());
            }
        }

        Ok(config)
    }

    /// Initialize configuration on first run
    ///
    /// Creates a default config file if none exists and notifies the user
    pub async fn initialize_first_run() -> Result<Option<PathBuf>> {
        Self::initialize_at(Self::get_default_config_path()?).await
    }

    async fn initialize_at(config_path: PathBuf) -> Result<Option<PathBuf>> {
        if config_path.exists() {
            return Ok(Some(config_path));
        }

        info!("Creating default configuration file...");

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ConfigError::Io)?;
        }

        let config_content = Self::generate_default_config_content();

        tokio::fs::write(&config_path, config_content)
            .await
            .map_err(ConfigError::Io)?;

        println!("Created default configuration file:");
        println!("   {}", config_path.display());
        println!("   You can customize settings by editing this file.");
        println!();

        Ok(Some(config_path))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Result<Option<PathBuf>> {
        let search_paths = vec![
            // Project-local config
            PathBuf::from("./bdc-fetcher.toml"),
            PathBuf::from("./config.toml"),
            // User config
            Self::get_default_config_path()?,
            // System config (Unix only)
            #[cfg(unix)]
            PathBuf::from("/etc/bdc-fetcher/config.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Ok(Some(path));
            }
        }

        debug!("No config file found in standard locations");
        Ok(None)
    }

    /// Get the default config file path for the current user
    fn get_default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir.join("bdc-fetcher").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::Io)?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        format!(
            r#"# BDC Fetcher Configuration
# This file was automatically generated on first run.
# You can customize any of these settings to suit your needs.

[client]
# Map API base URL. Usually left unset; BDC_BASE_URL overrides both this
# and the built-in default.
# base_url = "https://broadbandmap.fcc.gov"

request_timeout_secs = 300
connect_timeout_secs = 30
pool_idle_timeout_secs = 90
pool_max_per_host = 4

# The map API throttles aggressive clients; keep this low.
rate_limit_rps = {}

[output]
# Root for downloads and converted GIS layers
# (leave unset to use ./data/output)
# output_root = "/path/to/output"

[logging]
level = "info"
colored_output = true
"#,
            limits::DEFAULT_RATE_LIMIT_RPS
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.client.rate_limit_rps, config.client.rate_limit_rps);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn generated_default_content_parses() {
        let content = AppConfig::generate_default_config_content();
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(parsed.logging.level, "info");
    }

    #[tokio::test]
    async fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(
            &path,
            "[client]\nrate_limit_rps = 5\nrequest_timeout_secs = 60\nconnect_timeout_secs = 10\npool_idle_timeout_secs = 30\npool_max_per_host = 2\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load(Some(path)).await.unwrap();
        assert_eq!(config.client.rate_limit_rps, 5);
        // unspecified sections fall back to defaults
        assert_eq!(config.logging.level, "info");
    }

    #[tokio::test]
    async fn missing_explicit_file_is_not_found() {
        let err = AppConfig::load(Some(PathBuf::from("/nonexistent/config.toml")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::NotFound { ref path })
                if path == &PathBuf::from("/nonexistent/config.toml")
        ));
        assert_eq!(err.category(), "config");
    }

    #[tokio::test]
    async fn first_run_seeds_a_parseable_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bdc-fetcher").join("config.toml");

        let created = AppConfig::initialize_at(path.clone()).await.unwrap();
        assert_eq!(created, Some(path.clone()));
        let parsed: AppConfig =
            toml::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(parsed.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);

        // an existing file is left untouched on later runs
        tokio::fs::write(&path, "[client]\nrate_limit_rps = 9\n")
            .await
            .unwrap();
        let again = AppConfig::initialize_at(path.clone()).await.unwrap();
        assert_eq!(again, Some(path.clone()));
        let kept = AppConfig::load(Some(path)).await.unwrap();
        assert_eq!(kept.client.rate_limit_rps, 9);
    }

    #[tokio::test]
    async fn malformed_file_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[client\nrate_limit_rps = ").await.unwrap();

        let err = AppConfig::load(Some(path)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Config(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn client_config_conversion_uses_defaults() {
        let config = AppConfig::default();
        let client = config.to_client_config();
        assert_eq!(client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(client.request_timeout, Duration::from_secs(300));
    }
}
