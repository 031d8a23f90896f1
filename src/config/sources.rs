use super::credentials::{self, CredentialsError};
use super::models::{Config, StorageProvider};
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "MAILDRAIN_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/maildrain.toml";
const ENV_PREFIX: &str = "MAILDRAIN";
const ENV_SEPARATOR: &str = "__";

/// Resolve the configuration file path
///
/// An explicit path wins over `MAILDRAIN_CONFIG`, which wins over the default.
pub fn config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(explicit: Option<PathBuf>) -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    load_from_sources(config_path(explicit))
}

/// Load S3 credentials into config
///
/// Secrets are never stored in TOML files. Explicit environment keys win;
/// otherwise the selected profile (`source.profile`, then `AWS_PROFILE`) is
/// read from the shared credentials file. A profile named in configuration
/// must resolve, one taken from `AWS_PROFILE` may be absent.
pub fn load_secrets(config: &mut Config) -> Result<(), CredentialsError> {
    if config.source.provider != StorageProvider::S3 {
        return Ok(());
    }

    let source = &mut config.source;
    source.access_key = env::var("AWS_ACCESS_KEY_ID").ok();
    source.secret_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
    source.session_token = env::var("AWS_SESSION_TOKEN").ok();

    if source.access_key.is_some() && source.secret_key.is_some() {
        tracing::debug!("Using S3 credentials from environment");
        return Ok(());
    }

    let (profile, required) = match (&source.profile, env::var("AWS_PROFILE")) {
        (Some(profile), _) => (profile.clone(), true),
        (None, Ok(profile)) => (profile, false),
        (None, Err(_)) => return Ok(()),
    };

    let path = credentials::shared_credentials_path()?;
    match credentials::load_profile(&path, &profile) {
        Ok(creds) => {
            tracing::info!(profile = %profile, path = %path.display(), "Using S3 credentials from profile");
            source.access_key = Some(creds.access_key_id);
            source.secret_key = Some(creds.secret_access_key);
            source.session_token = creds.session_token;
            Ok(())
        }
        Err(e) if !required => {
            tracing::warn!(profile = %profile, error = %e, "AWS_PROFILE could not be resolved, falling back to default credential chain");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    // Start with defaults (handled by struct Default implementations)
    // Add TOML file if it exists (optional)
    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // MAILDRAIN__SOURCE__PAGE_SIZE -> source.page_size
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
