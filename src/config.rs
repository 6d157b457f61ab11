//! Runtime configuration.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional YAML file, and command-line flags / environment variables.
//!
//! ```yaml
//! feed_endpoint: https://api.rss2json.com/v1/api.json
//! geocode_endpoint: https://nominatim.openstreetmap.org/search
//! user_agent: freight_atlas/0.1 (ops@example.com)
//! refresh_interval_secs: 21600
//! geocode_min_interval_ms: 1000
//! geocode_jitter_ms: 250
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::{feeds, geocode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument};

/// Six hours.
pub const DEFAULT_REFRESH_SECS: u64 = 6 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed_endpoint: String,
    pub geocode_endpoint: String,
    /// Sent with every request; Nominatim rejects anonymous clients.
    pub user_agent: String,
    pub refresh_interval_secs: u64,
    pub geocode_min_interval_ms: u64,
    pub geocode_jitter_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_endpoint: feeds::rss2json::DEFAULT_ENDPOINT.to_string(),
            geocode_endpoint: geocode::DEFAULT_ENDPOINT.to_string(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            geocode_min_interval_ms: 1000,
            geocode_jitter_ms: 0,
        }
    }
}

impl Config {
    /// Parse a YAML document; absent keys keep their defaults.
    pub fn from_yaml(path: &str, yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }

    /// Load the config file named on the command line, if any, and apply
    /// command-line overrides.
    #[instrument(level = "info", skip_all, fields(config = ?cli.config))]
    pub async fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => {
                let yaml = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                let config = Self::from_yaml(path, &yaml)?;
                info!(path = %path, "Loaded configuration");
                config
            }
            None => Self::default(),
        };
        config.apply_overrides(cli);
        Ok(config)
    }

    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(endpoint) = &cli.feed_endpoint {
            self.feed_endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &cli.geocode_endpoint {
            self.geocode_endpoint = endpoint.clone();
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn geocode_min_interval(&self) -> Duration {
        Duration::from_millis(self.geocode_min_interval_ms)
    }

    pub fn geocode_jitter(&self) -> Duration {
        Duration::from_millis(self.geocode_jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("inline", "refresh_interval_secs: 60\ngeocode_jitter_ms: 250\n").unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.geocode_jitter(), Duration::from_millis(250));
        assert_eq!(config.geocode_min_interval(), Duration::from_secs(1));
        assert_eq!(config.feed_endpoint, feeds::rss2json::DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_invalid_yaml_reports_path() {
        let err = Config::from_yaml("atlas.yaml", "refresh_interval_secs: soon").unwrap_err();
        assert!(err.to_string().contains("atlas.yaml"));
    }

    #[tokio::test]
    async fn test_cli_overrides_file() {
        let path = std::env::temp_dir().join(format!("freight_atlas_config_{}.yaml", std::process::id()));
        std::fs::write(&path, "feed_endpoint: https://feeds.internal/convert\ngeocode_endpoint: https://geo.internal/search\n").unwrap();
        let path_str = path.to_string_lossy().to_string();

        let cli = Cli::parse_from([
            "freight_atlas",
            "--config",
            path_str.as_str(),
            "--geocode-endpoint",
            "https://geo.override/search",
        ]);
        let config = Config::load(&cli).await.unwrap();
        assert_eq!(config.feed_endpoint, "https://feeds.internal/convert");
        assert_eq!(config.geocode_endpoint, "https://geo.override/search");
        assert_eq!(config.refresh_interval_secs, DEFAULT_REFRESH_SECS);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let cli = Cli::parse_from(["freight_atlas", "--config", "/nonexistent/atlas.yaml"]);
        assert!(matches!(Config::load(&cli).await, Err(ConfigError::Read { .. })));
    }
}
