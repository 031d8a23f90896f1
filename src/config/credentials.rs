//! Named profiles from the shared AWS credentials file
//!
//! The file is INI; it is read through the `config` crate. Section and key
//! names are matched case-insensitively.

use config::{File, FileFormat, Source};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CREDENTIALS_FILE_ENV_VAR: &str = "AWS_SHARED_CREDENTIALS_FILE";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Cannot locate shared credentials file: HOME is not set")]
    NoHome,

    #[error("Shared credentials file not found at {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read shared credentials file: {0}")]
    Read(#[from] config::ConfigError),

    #[error("Profile '{profile}' not found in {location}", location = .path.display())]
    ProfileNotFound { profile: String, path: PathBuf },

    #[error("Profile '{profile}' is missing '{field}'")]
    MissingField {
        profile: String,
        field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// `$AWS_SHARED_CREDENTIALS_FILE`, else `~/.aws/credentials`
pub fn shared_credentials_path() -> Result<PathBuf, CredentialsError> {
    if let Some(path) = env::var_os(CREDENTIALS_FILE_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".aws").join("credentials"))
        .ok_or(CredentialsError::NoHome)
}

/// Read one profile's keys
pub fn load_profile(path: &Path, profile: &str) -> Result<ProfileCredentials, CredentialsError> {
    if !path.is_file() {
        return Err(CredentialsError::FileNotFound(path.to_path_buf()));
    }

    let ini = config::Config::builder()
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini))
        .build()?;

    let section = ini
        .collect()?
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(profile))
        .map(|(_, value)| value.into_table())
        .transpose()?
        .ok_or_else(|| CredentialsError::ProfileNotFound {
            profile: profile.to_string(),
            path: path.to_path_buf(),
        })?;

    let field = |name: &'static str| -> Result<Option<String>, CredentialsError> {
        section
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone().into_string())
            .transpose()
            .map_err(CredentialsError::from)
    };
    let required = |name: &'static str| -> Result<String, CredentialsError> {
        field(name)?.ok_or_else(|| CredentialsError::MissingField {
            profile: profile.to_string(),
            field: name,
        })
    };

    Ok(ProfileCredentials {
        access_key_id: required("aws_access_key_id")?,
        secret_access_key: required("aws_secret_access_key")?,
        session_token: field("aws_session_token")?,
    })
}
