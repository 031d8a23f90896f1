//! Object storage access for the drained bucket
//! Uses Apache Arrow object_store crate

use crate::config::{SourceConfig, StorageProvider};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::{ObjectMeta, ObjectStore, path::Path as StoragePath};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Byte stream of one object's content
pub type ContentStream = BoxStream<'static, object_store::Result<Bytes>>;

/// One listed object
///
/// `get` and `delete` address the object by `location` exactly as listed; it
/// is never rebuilt from the key string, which would percent-encode `%`, `#`
/// and similar characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub location: StoragePath,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

impl ObjectDescriptor {
    /// The object key as listed
    pub fn key(&self) -> &str {
        self.location.as_ref()
    }
}

impl From<ObjectMeta> for ObjectDescriptor {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            location: meta.location,
            last_modified: meta.last_modified,
            size: meta.size,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub objects: Vec<ObjectDescriptor>,
    /// No page follows this one
    pub is_last: bool,
}

impl Page {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Bucket client wrapping object_store
#[derive(Clone)]
pub struct Bucket {
    store: Arc<dyn ObjectStore>,
    pub name: String,
}

impl Bucket {
    /// Create new bucket client with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// Build the backend described by the source configuration
    pub fn connect(source: &SourceConfig) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match source.provider {
            StorageProvider::S3 => {
                let mut builder = AmazonS3Builder::from_env().with_bucket_name(&source.bucket);

                if let Some(region) = &source.region {
                    builder = builder.with_region(region);
                }
                if let Some(endpoint) = &source.endpoint {
                    builder = builder
                        .with_endpoint(endpoint)
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                if let (Some(access_key), Some(secret_key)) =
                    (&source.access_key, &source.secret_key)
                {
                    builder = builder
                        .with_access_key_id(access_key)
                        .with_secret_access_key(secret_key);
                    if let Some(token) = &source.session_token {
                        builder = builder.with_token(token);
                    }
                }

                Arc::new(builder.build()?)
            }
            StorageProvider::Local => {
                let root = source.root.as_ref().ok_or_else(|| {
                    StorageError::Config("local provider requires source.root".to_string())
                })?;
                Arc::new(LocalFileSystem::new_with_prefix(root)?)
            }
        };

        tracing::info!(bucket = %source.bucket, provider = ?source.provider, "Connected to object storage");

        Ok(Self::new(store, source.bucket.clone()))
    }

    /// Page through every object under `prefix`, at most `page_size` per page
    pub fn pages(&self, prefix: &str, page_size: usize) -> PageLister {
        let prefix_path = StoragePath::from(prefix);
        PageLister {
            stream: self.store.list(Some(&prefix_path)),
            page_size: page_size.max(1),
            lookahead: None,
            finished: false,
        }
    }

    /// Open a read stream over an object's content
    pub async fn open(&self, location: &StoragePath) -> object_store::Result<ContentStream> {
        let result = self.store.get(location).await?;

        tracing::debug!(key = %location, size = result.meta.size, "Opened object stream");

        Ok(result.into_stream())
    }

    /// Delete an object
    pub async fn delete(&self, location: &StoragePath) -> object_store::Result<()> {
        self.store.delete(location).await?;

        tracing::info!(key = %location, bucket = %self.name, "Deleted object");

        Ok(())
    }

    /// Check if key exists
    pub async fn exists(&self, location: &StoragePath) -> object_store::Result<bool> {
        match self.store.head(location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Cursor over a prefix listing that yields fixed-size pages
///
/// The underlying listing stream is held across pages, so the backend's own
/// continuation handling applies. One object is read ahead to tell whether
/// the current page is the last one.
pub struct PageLister {
    stream: BoxStream<'static, object_store::Result<ObjectMeta>>,
    page_size: usize,
    lookahead: Option<ObjectMeta>,
    finished: bool,
}

impl PageLister {
    /// Fetch the next page, or `None` once the last page has been returned
    ///
    /// An empty prefix yields exactly one empty, final page.
    pub async fn next_page(&mut self) -> object_store::Result<Option<Page>> {
        if self.finished {
            return Ok(None);
        }

        let mut objects = Vec::with_capacity(self.page_size);
        if let Some(meta) = self.lookahead.take() {
            objects.push(ObjectDescriptor::from(meta));
        }

        while objects.len() < self.page_size {
            match self.stream.next().await {
                Some(meta) => objects.push(ObjectDescriptor::from(meta?)),
                None => break,
            }
        }

        if objects.len() == self.page_size {
            self.lookahead = self.stream.next().await.transpose()?;
        }

        let is_last = self.lookahead.is_none();
        self.finished = is_last;

        Ok(Some(Page { objects, is_last }))
    }
}

#[cfg(test)]
pub(crate) mod faults;
