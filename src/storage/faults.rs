//! In-memory store that fails one chosen operation

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use object_store::memory::InMemory;
use object_store::path::Path as StoragePath;
use object_store::{
    GetOptions, GetResult, GetResultPayload, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOptions, PutOptions, PutPayload, PutResult,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `delete` always fails
    Delete,
    /// `list` yields an error instead of objects
    List,
    /// `get` streams the first half of the body, then fails
    ReadMidway,
}

#[derive(Debug)]
pub struct FaultyStore {
    inner: InMemory,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: InMemory::new(),
            fault,
        }
    }
}

impl fmt::Display for FaultyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaultyStore({:?})", self.fault)
    }
}

fn injected(operation: &str) -> object_store::Error {
    object_store::Error::Generic {
        store: "FaultyStore",
        source: format!("injected {operation} failure").into(),
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn put_opts(
        &self,
        location: &StoragePath,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &StoragePath,
        opts: PutMultipartOptions,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &StoragePath,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        let head = options.head;
        let result = self.inner.get_opts(location, options).await?;
        if head || self.fault != Fault::ReadMidway {
            return Ok(result);
        }

        let meta = result.meta.clone();
        let range = result.range.clone();
        let attributes = result.attributes.clone();
        let body = result.bytes().await?;
        let first_half = body.slice(..body.len() / 2);

        let chunks = stream::iter(vec![Ok(first_half), Err(injected("read"))]).boxed();
        Ok(GetResult {
            payload: GetResultPayload::Stream(chunks),
            meta,
            range,
            attributes,
        })
    }

    async fn delete(&self, location: &StoragePath) -> object_store::Result<()> {
        match self.fault {
            Fault::Delete => Err(injected("delete")),
            _ => self.inner.delete(location).await,
        }
    }

    fn list(
        &self,
        prefix: Option<&StoragePath>,
    ) -> BoxStream<'static, object_store::Result<ObjectMeta>> {
        match self.fault {
            Fault::List => stream::iter(vec![Err(injected("list"))]).boxed(),
            _ => self.inner.list(prefix),
        }
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&StoragePath>,
    ) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &StoragePath, to: &StoragePath) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(
        &self,
        from: &StoragePath,
        to: &StoragePath,
    ) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}
