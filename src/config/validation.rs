use super::models::{Config, StorageProvider};
use crate::delivery::KEY_SEPARATOR;
use thiserror::Error;

/// Largest page a single S3 list request returns
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("page_size must be between 1 and {max}, got {value}")]
    InvalidPageSize { value: usize, max: usize },

    #[error("workers must be at least 1")]
    InvalidWorkers,

    #[error("Bucket name must not be empty")]
    EmptyBucket,

    #[error("Invalid prefix '{prefix}': {reason}")]
    InvalidPrefix { prefix: String, reason: &'static str },

    #[error("Storage provider is local but source.root is not set")]
    MissingLocalRoot,

    #[error("delivery.hostname must not be empty")]
    EmptyHostname,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_source(config)?;
    validate_delivery(config)?;
    Ok(())
}

fn validate_source(config: &Config) -> Result<(), ValidationError> {
    let source = &config.source;

    if source.page_size == 0 || source.page_size > MAX_PAGE_SIZE {
        return Err(ValidationError::InvalidPageSize {
            value: source.page_size,
            max: MAX_PAGE_SIZE,
        });
    }

    if source.bucket.trim().is_empty() {
        return Err(ValidationError::EmptyBucket);
    }

    validate_prefix(&source.prefix)?;

    if source.provider == StorageProvider::Local && source.root.is_none() {
        return Err(ValidationError::MissingLocalRoot);
    }

    Ok(())
}

/// The prefix is joined to message names with a single separator
fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    let invalid = |reason| ValidationError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason,
    };

    if prefix.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if prefix.starts_with(KEY_SEPARATOR) || prefix.ends_with(KEY_SEPARATOR) {
        return Err(invalid("must not start or end with '/'"));
    }
    if prefix.split(KEY_SEPARATOR).any(str::is_empty) {
        return Err(invalid("must not contain empty segments"));
    }

    Ok(())
}

fn validate_delivery(config: &Config) -> Result<(), ValidationError> {
    if config.delivery.workers == 0 {
        return Err(ValidationError::InvalidWorkers);
    }

    if let Some(hostname) = &config.delivery.hostname {
        if hostname.trim().is_empty() {
            return Err(ValidationError::EmptyHostname);
        }
    }

    Ok(())
}
