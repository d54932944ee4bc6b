//! Configuration management for vahan-insights.
//!
//! Loaded with figment from (later overrides earlier):
//! 1. Default values
//! 2. TOML config file (`vahan.toml` in the working directory unless given)
//! 3. Environment variables prefixed with `VAHAN_`, nested with `__`
//!    (e.g. `VAHAN_GROWTH__YOY_LAG=12`)

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::growth::GrowthConfig;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "vahan.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset location and sample-data settings.
    pub data: DataConfig,
    /// Growth lags.
    pub growth: GrowthConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Dataset configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file read at startup; sample data is synthesized when it is missing.
    pub csv_path: PathBuf,
    /// Months of sample data to synthesize.
    pub sample_months: u32,
    /// RNG seed for sample data.
    pub sample_seed: u64,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind_addr: String,
    /// Maximum number of memoized growth tables.
    pub cache_capacity: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("vehicle_data.csv"),
            sample_months: 36,
            sample_seed: 2024,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            cache_capacity: 64,
        }
    }
}

impl Config {
    /// Load configuration from the default file plus environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let config_file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("VAHAN_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.growth.validate().map_err(|e| Error::ConfigValidation {
            message: e.to_string(),
        })?;

        if self.data.sample_months == 0 {
            return Err(Error::ConfigValidation {
                message: "data.sample_months must be greater than 0".to_string(),
            });
        }

        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::ConfigValidation {
                message: format!("server.bind_addr '{}' is not a socket address", self.server.bind_addr),
            });
        }

        Ok(())
    }
}
