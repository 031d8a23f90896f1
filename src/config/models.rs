use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Storage provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    S3,
    /// Directory on the local filesystem treated as a bucket
    Local,
}

/// Where messages are drained from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Key prefix, without the trailing separator
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Objects listed, and transferred, per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Delete each object once it is delivered
    #[serde(default = "default_delete")]
    pub delete: bool,
    /// Named profile in the shared AWS credentials file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bucket root directory for the local provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// S3 access key (loaded from environment or profile, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment or profile, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
    #[serde(skip)]
    pub session_token: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            bucket: default_bucket(),
            prefix: default_prefix(),
            page_size: default_page_size(),
            delete: default_delete(),
            profile: None,
            region: None,
            endpoint: None,
            root: None,
            access_key: None,
            secret_key: None,
            session_token: None,
        }
    }
}

fn default_bucket() -> String {
    "mail".to_string()
}

fn default_prefix() -> String {
    "new".to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_delete() -> bool {
    true
}

/// Where messages are delivered to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_maildir")]
    pub maildir: PathBuf,
    /// Upper bound on concurrent transfers within a page
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Compare the written byte count with the listed size before deleting
    #[serde(default = "default_verify_size")]
    pub verify_size: bool,
    /// Overrides the local hostname used in delivered filenames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            maildir: default_maildir(),
            workers: default_workers(),
            verify_size: default_verify_size(),
            hostname: None,
        }
    }
}

fn default_maildir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("Maildir"))
        .unwrap_or_else(|| PathBuf::from("Maildir"))
}

fn default_workers() -> usize {
    8
}

fn default_verify_size() -> bool {
    true
}

/// Values given on the command line; each one replaces the loaded value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub page_size: Option<usize>,
    pub delete: Option<bool>,
    pub profile: Option<String>,
    pub maildir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub hostname: Option<String>,
}

impl Config {
    pub fn apply(&mut self, overrides: &Overrides) {
        let Overrides {
            bucket,
            prefix,
            page_size,
            delete,
            profile,
            maildir,
            workers,
            hostname,
        } = overrides.clone();

        if let Some(bucket) = bucket {
            self.source.bucket = bucket;
        }
        if let Some(prefix) = prefix {
            self.source.prefix = prefix;
        }
        if let Some(page_size) = page_size {
            self.source.page_size = page_size;
        }
        if let Some(delete) = delete {
            self.source.delete = delete;
        }
        if profile.is_some() {
            self.source.profile = profile;
        }
        if let Some(maildir) = maildir {
            self.delivery.maildir = maildir;
        }
        if let Some(workers) = workers {
            self.delivery.workers = workers;
        }
        if hostname.is_some() {
            self.delivery.hostname = hostname;
        }
    }
}
