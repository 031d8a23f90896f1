//! End-to-end drain tests
//!
//! Each test seeds an in-memory (or local filesystem) bucket, drains it into
//! a temporary Maildir and checks what ended up on disk and what is left in
//! the bucket.

use bytes::Bytes;
use chrono::Utc;
use futures::TryStreamExt;
use maildrain::DeliveryError;
use maildrain::config::{Config, SourceConfig, StorageProvider};
use maildrain::delivery::{HostIdentity, Maildir, Transfer};
use maildrain::observability::DrainStats;
use maildrain::pipeline::{self, Continuation, PageCoordinator};
use maildrain::storage::{Bucket, ObjectDescriptor, Page};
use object_store::memory::InMemory;
use object_store::path::Path as StoragePath;
use object_store::ObjectStore;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const HOST: &str = "mx1.example.com";

/// Test context holding the bucket, the maildir and their backing storage
struct DrainContext {
    _temp_dir: TempDir,
    store: Arc<InMemory>,
    maildir: Maildir,
}

impl DrainContext {
    async fn setup() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let maildir = Maildir::create(temp_dir.path().join("Maildir"))
            .await
            .expect("Failed to create maildir");

        Self {
            _temp_dir: temp_dir,
            store: Arc::new(InMemory::new()),
            maildir,
        }
    }

    async fn seed(&self, key: &str, body: &str) {
        self.store
            .put(
                &StoragePath::parse(key).expect("valid key"),
                Bytes::from(body.to_string()).into(),
            )
            .await
            .expect("Failed to seed object");
    }

    fn bucket(&self) -> Bucket {
        Bucket::new(self.store.clone(), "test-bucket")
    }

    fn config(&self, page_size: usize, delete: bool) -> Config {
        let mut config = Config::default();
        config.source.prefix = "new".to_string();
        config.source.page_size = page_size;
        config.source.delete = delete;
        config.delivery.maildir = self.maildir.root().to_path_buf();
        config.delivery.workers = 4;
        config
    }

    async fn drain(&self, config: &Config) -> maildrain::Result<maildrain::observability::DrainSummary> {
        pipeline::drain(
            config,
            self.bucket(),
            self.maildir.clone(),
            HostIdentity::from_fqdn(HOST),
            CancellationToken::new(),
        )
        .await
    }

    async fn remaining(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .store
            .list(Some(&StoragePath::from(prefix)))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .unwrap();
        keys.sort();
        keys
    }

    fn delivered(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.maildir.new_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn staged(&self) -> usize {
        std::fs::read_dir(self.maildir.tmp_dir()).unwrap().count()
    }

    fn coordinator(&self, delete: bool, workers: usize, cancel: CancellationToken) -> PageCoordinator {
        let transfer = Transfer::new(
            self.bucket(),
            self.maildir.clone(),
            delete,
            true,
            Arc::new(DrainStats::new()),
        );
        PageCoordinator::new(
            Arc::new(transfer),
            "new",
            HostIdentity::from_fqdn(HOST),
            workers,
            cancel,
        )
    }
}

#[tokio::test]
async fn test_single_page_with_delete() {
    let ctx = DrainContext::setup().await;
    for i in 1..=3 {
        ctx.seed(&format!("new/msg-{i}"), &format!("message {i}")).await;
    }

    let summary = ctx.drain(&ctx.config(20, true)).await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.delivered, 3);
    assert_eq!(summary.deleted, 3);

    let delivered = ctx.delivered();
    assert_eq!(delivered.len(), 3);
    for i in 1..=3 {
        let name = delivered
            .iter()
            .find(|name| name.contains(&format!(".msg-{i}.")))
            .expect("message delivered");
        assert!(name.ends_with(".mx1"));
        let timestamp = name.split('.').next().unwrap();
        assert!(timestamp.parse::<i64>().is_ok(), "{name} starts with a timestamp");

        let body = std::fs::read_to_string(ctx.maildir.new_dir().join(name)).unwrap();
        assert_eq!(body, format!("message {i}"));
    }

    assert!(ctx.remaining("new").await.is_empty());
    assert_eq!(ctx.staged(), 0);
}

#[tokio::test]
async fn test_delete_disabled_keeps_objects() {
    let ctx = DrainContext::setup().await;
    ctx.seed("new/a", "alpha").await;
    ctx.seed("new/b", "beta").await;

    let summary = ctx.drain(&ctx.config(20, false)).await.unwrap();

    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.deleted, 0);
    assert_eq!(ctx.delivered().len(), 2);
    assert_eq!(ctx.remaining("new").await, vec!["new/a", "new/b"]);
}

#[tokio::test]
async fn test_empty_prefix() {
    let ctx = DrainContext::setup().await;
    ctx.seed("archive/old", "untouched").await;

    let summary = ctx.drain(&ctx.config(20, true)).await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.delivered, 0);
    assert!(ctx.delivered().is_empty());
    assert_eq!(ctx.remaining("archive").await, vec!["archive/old"]);
}

#[tokio::test]
async fn test_multiple_pages() {
    let ctx = DrainContext::setup().await;
    for i in 0..5 {
        ctx.seed(&format!("new/msg-{i}"), "x").await;
    }

    let summary = ctx.drain(&ctx.config(2, true)).await.unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.delivered, 5);
    assert_eq!(ctx.delivered().len(), 5);
    assert!(ctx.remaining("new").await.is_empty());
}

#[tokio::test]
async fn test_only_prefix_is_drained() {
    let ctx = DrainContext::setup().await;
    ctx.seed("new/a", "alpha").await;
    ctx.seed("newer/b", "beta").await;

    ctx.drain(&ctx.config(20, true)).await.unwrap();

    assert_eq!(ctx.delivered().len(), 1);
    assert_eq!(ctx.remaining("newer").await, vec!["newer/b"]);
}

#[tokio::test]
async fn test_page_filenames_are_distinct() {
    let ctx = DrainContext::setup().await;
    let keys: Vec<String> = (0..10).map(|i| format!("new/same-second-{i}")).collect();
    for key in &keys {
        ctx.seed(key, "body").await;
    }

    ctx.drain(&ctx.config(10, false)).await.unwrap();

    let delivered = ctx.delivered();
    let unique: HashSet<_> = delivered.iter().collect();
    assert_eq!(delivered.len(), 10);
    assert_eq!(unique.len(), 10);
}

#[tokio::test]
async fn test_keys_with_reserved_characters() {
    let ctx = DrainContext::setup().await;
    let keys = ["new/50%off", "new/a#b", "new/x/y", "new/x\\057y"];
    for key in keys {
        ctx.seed(key, key).await;
    }

    let summary = ctx.drain(&ctx.config(2, true)).await.unwrap();

    assert_eq!(summary.delivered, 4);
    assert_eq!(summary.deleted, 4);
    assert!(ctx.remaining("new").await.is_empty());

    let delivered = ctx.delivered();
    let unique: HashSet<_> = delivered.iter().collect();
    assert_eq!(unique.len(), 4);
    for key in keys {
        let found = delivered.iter().any(|name| {
            std::fs::read_to_string(ctx.maildir.new_dir().join(name)).unwrap() == key
        });
        assert!(found, "{key} delivered");
    }
    assert!(delivered.iter().any(|name| name.contains(".50%off.")));
    assert!(delivered.iter().any(|name| name.contains(".x\\134057y.")));
}

#[tokio::test]
async fn test_failed_fetch_aborts_page() {
    let ctx = DrainContext::setup().await;
    ctx.seed("new/msg-1", "one").await;
    ctx.seed("new/msg-3", "three").await;

    let missing = ObjectDescriptor {
        location: StoragePath::from("new/msg-2"),
        last_modified: Utc::now(),
        size: 3,
    };
    let mut objects = Vec::new();
    for key in ["new/msg-1", "new/msg-3"] {
        let meta = ctx.store.head(&StoragePath::from(key)).await.unwrap();
        objects.push(ObjectDescriptor::from(meta));
    }
    objects.insert(1, missing);

    let cancel = CancellationToken::new();
    let page = Page {
        objects,
        is_last: false,
    };
    let err = ctx
        .coordinator(true, 3, cancel.clone())
        .process(page)
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::Fetch { ref key, .. } if key == "new/msg-2"));
    assert!(cancel.is_cancelled());
    assert_eq!(ctx.staged(), 0);
}

#[tokio::test]
async fn test_foreign_key_fails_before_any_transfer() {
    let ctx = DrainContext::setup().await;
    ctx.seed("new/msg-1", "one").await;

    let mut objects = vec![ObjectDescriptor::from(
        ctx.store.head(&StoragePath::from("new/msg-1")).await.unwrap(),
    )];
    objects.push(ObjectDescriptor {
        location: StoragePath::from("elsewhere/msg"),
        last_modified: Utc::now(),
        size: 0,
    });

    let err = ctx
        .coordinator(true, 2, CancellationToken::new())
        .process(Page {
            objects,
            is_last: true,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DeliveryError::InvalidKey { .. }));
    assert!(ctx.delivered().is_empty());
    assert_eq!(ctx.remaining("new").await, vec!["new/msg-1"]);
}

#[tokio::test]
async fn test_single_worker_handles_whole_page() {
    let ctx = DrainContext::setup().await;
    for i in 0..4 {
        ctx.seed(&format!("new/msg-{i}"), "x").await;
    }
    let page = ctx.bucket().pages("new", 10).next_page().await.unwrap().unwrap();

    let outcome = ctx
        .coordinator(false, 1, CancellationToken::new())
        .process(page)
        .await
        .unwrap();

    assert_eq!(outcome, Continuation::Stop);
    assert_eq!(ctx.delivered().len(), 4);
}

#[tokio::test]
async fn test_cancelled_run_delivers_nothing() {
    let ctx = DrainContext::setup().await;
    ctx.seed("new/msg-1", "one").await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline::drain(
        &ctx.config(20, true),
        ctx.bucket(),
        ctx.maildir.clone(),
        HostIdentity::from_fqdn(HOST),
        cancel,
    )
    .await
    .unwrap_err();

    assert!(err.is_cancelled());
    assert!(ctx.delivered().is_empty());
    assert_eq!(ctx.remaining("new").await, vec!["new/msg-1"]);
}

#[tokio::test]
async fn test_local_filesystem_bucket() {
    let ctx = DrainContext::setup().await;
    let spool = TempDir::new().unwrap();

    let source = SourceConfig {
        provider: StorageProvider::Local,
        root: Some(spool.path().to_path_buf()),
        ..Default::default()
    };
    let bucket = Bucket::connect(&source).unwrap();

    let local = object_store::local::LocalFileSystem::new_with_prefix(spool.path()).unwrap();
    for i in 0..3 {
        local
            .put(
                &StoragePath::from(format!("new/msg-{i}").as_str()),
                Bytes::from(format!("local {i}")).into(),
            )
            .await
            .unwrap();
    }

    let mut config = ctx.config(2, true);
    config.source = SourceConfig {
        page_size: 2,
        ..source
    };

    let summary = pipeline::drain(
        &config,
        bucket.clone(),
        ctx.maildir.clone(),
        HostIdentity::from_fqdn(HOST),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.delivered, 3);
    assert_eq!(summary.deleted, 3);
    assert_eq!(ctx.delivered().len(), 3);
    for i in 0..3 {
        let location = StoragePath::from(format!("new/msg-{i}").as_str());
        assert!(!bucket.exists(&location).await.unwrap());
    }
}
