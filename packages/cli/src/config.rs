//! CLI configuration.
//!
//! The embedded `config/default.toml` supplies every value. A user file
//! given with `--config` is merged over it table by table, so it only needs
//! the keys it changes. Command line flags are applied last.

use std::path::{Path, PathBuf};

use crash_dash_analytics::ServiceConfig;
use crash_dash_analytics_models::GridResolution;
use crash_dash_collision_models::YearRange;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has the wrong shape.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub window: WindowConfig,
    pub cache: CacheConfig,
    pub hotspots: HotspotConfig,
}

/// Paths to the two dataset exports (`.csv` or `.csv.gz`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    pub crashes: PathBuf,
    pub persons: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotspotConfig {
    pub grid_degrees: f64,
}

impl Config {
    /// The embedded defaults.
    ///
    /// # Panics
    ///
    /// If the embedded default config is invalid, which is a build defect.
    #[must_use]
    pub fn embedded() -> Self {
        toml::from_str(DEFAULT_CONFIG)
            .unwrap_or_else(|e| panic!("Invalid embedded config/default.toml: {e}"))
    }

    /// Loads the defaults, merging `path` over them when given.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Io`] if `path` cannot be read
    /// * [`ConfigError::Parse`] if the merged config does not deserialize
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::embedded());
        };

        log::debug!("Reading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_overrides(&contents)
    }

    /// The defaults with the tables in `contents` merged over them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `contents` is not valid TOML or
    /// the merged result does not deserialize.
    pub fn with_overrides(contents: &str) -> Result<Self, ConfigError> {
        let mut base: toml::Table = toml::from_str(DEFAULT_CONFIG)?;
        let overrides: toml::Table = toml::from_str(contents)?;
        merge(&mut base, overrides);
        Ok(toml::Value::Table(base).try_into()?)
    }

    /// The inclusive year window.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the window ends before it starts.
    pub fn year_window(&self) -> Result<YearRange, ConfigError> {
        let WindowConfig { start, end } = self.window;
        if start > end {
            return Err(ConfigError::Invalid {
                key: "window",
                message: format!("start {start} is after end {end}"),
            });
        }
        Ok(YearRange::new(start, end))
    }

    /// Settings for the dashboard service.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an inverted year window or a
    /// grid size that is not a positive number.
    pub fn service_config(&self) -> Result<ServiceConfig, ConfigError> {
        let grid_resolution = GridResolution::from_degrees(self.hotspots.grid_degrees)
            .ok_or_else(|| ConfigError::Invalid {
                key: "hotspots.grid_degrees",
                message: format!("{} is not a positive size", self.hotspots.grid_degrees),
            })?;

        Ok(ServiceConfig {
            window: self.year_window()?,
            cache_capacity: self.cache.capacity,
            grid_resolution,
        })
    }
}

fn merge(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(table) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge(existing, table),
                _ => {
                    base.insert(key, toml::Value::Table(table));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults() {
        let config = Config::embedded();
        assert_eq!(config.window, WindowConfig { start: 2015, end: 2025 });
        assert_eq!(config.cache.capacity, 64);

        let service = config.service_config().unwrap();
        assert_eq!(service, ServiceConfig::default());
    }

    #[test]
    fn overrides_only_replace_given_keys() {
        let config = Config::with_overrides(
            r#"
            [data]
            crashes = "/tmp/crashes.csv.gz"

            [cache]
            capacity = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.data.crashes, PathBuf::from("/tmp/crashes.csv.gz"));
        assert_eq!(config.data.persons, Config::embedded().data.persons);
        assert_eq!(config.cache.capacity, 0);
        assert_eq!(config.window, Config::embedded().window);
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = Config::with_overrides("[cache]\ncapacity = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn inverted_window_is_invalid() {
        let config = Config::with_overrides("[window]\nstart = 2024\nend = 2016").unwrap();
        assert!(matches!(
            config.service_config(),
            Err(ConfigError::Invalid { key: "window", .. })
        ));
    }

    #[test]
    fn non_positive_grid_is_invalid() {
        let config = Config::with_overrides("[hotspots]\ngrid_degrees = -0.5").unwrap();
        assert!(matches!(
            config.service_config(),
            Err(ConfigError::Invalid {
                key: "hotspots.grid_degrees",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = Config::load(Some(Path::new("/nonexistent/crash_dash.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/crash_dash.toml"));
    }
}
