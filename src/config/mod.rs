//! Configuration management for maildrain
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//! 4. Command-line overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use maildrain::config::{Config, Overrides};
//!
//! let config = Config::load(None, &Overrides::default()).expect("Failed to load configuration");
//! println!("Draining {}/{}", config.source.bucket, config.source.prefix);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `MAILDRAIN__<section>__<key>`
//!
//! Examples:
//! - `MAILDRAIN__SOURCE__BUCKET=inbound-mail`
//! - `MAILDRAIN__SOURCE__PAGE_SIZE=50`
//! - `MAILDRAIN__DELIVERY__MAILDIR=/var/mail/alice`
//!
//! S3 credentials come from `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY` or a
//! profile in the shared credentials file, never from the TOML file.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/maildrain.toml`.
//! This can be overridden using the `MAILDRAIN_CONFIG` environment variable
//! or the `--config` flag.

mod credentials;
mod models;
mod sources;
mod validation;

pub use credentials::{CredentialsError, ProfileCredentials, load_profile, shared_credentials_path};
pub use models::{Config, DeliveryConfig, Overrides, SourceConfig, StorageProvider};
pub use validation::{MAX_PAGE_SIZE, ValidationError};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Credential lookup failed: {0}")]
    CredentialsError(#[from] CredentialsError),
}

impl Config {
    /// Load configuration from all sources and resolve credentials
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. `overrides` (command line)
    /// 2. Environment variables (`MAILDRAIN__*`)
    /// 3. TOML file (`path`, else `MAILDRAIN_CONFIG`, else `config/maildrain.toml`)
    /// 4. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - A configured credentials profile cannot be read
    /// - Validation fails
    pub fn load(path: Option<PathBuf>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = sources::load(path)?;
        config.apply(overrides);
        sources::load_secrets(&mut config)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path without resolving credentials
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = sources::load_from_sources(path)?;
        config.apply(overrides);
        validation::validate(&config)?;
        Ok(config)
    }

    /// Effective configuration rendered as TOML; secrets are omitted
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
