//! Listing and fan-out pipeline
//!
//! ```text
//! ListingDriver --page--> PageCoordinator --task--> worker pool --> Transfer
//! ```
//!
//! Pages are processed strictly one after another. Inside a page, objects are
//! transferred concurrently by at most `workers` tasks. Any failure cancels
//! the run: in-flight workers stop at their next safe point, the page returns
//! the error and no further page is requested.

pub mod coordinator;
pub mod driver;

pub use coordinator::PageCoordinator;
pub use driver::ListingDriver;

use crate::config::Config;
use crate::delivery::{HostIdentity, Maildir, Transfer};
use crate::error::Result;
use crate::observability::{DrainStats, DrainSummary};
use crate::storage::{Bucket, Page};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Whether the driver should request another page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Continue,
    Stop,
}

/// Consumer of listing pages
#[async_trait]
pub trait PageHandler: Send + Sync {
    /// Process one page to completion
    async fn handle(&self, page: Page) -> Result<Continuation>;
}

/// Drain the configured prefix of `bucket` into `maildir`
///
/// Returns the run summary, or the first error raised anywhere in the run.
pub async fn drain(
    config: &Config,
    bucket: Bucket,
    maildir: Maildir,
    host: HostIdentity,
    cancel: CancellationToken,
) -> Result<DrainSummary> {
    let source = &config.source;
    let delivery = &config.delivery;
    let stats = Arc::new(DrainStats::new());

    let transfer = Arc::new(Transfer::new(
        bucket.clone(),
        maildir,
        source.delete,
        delivery.verify_size,
        stats.clone(),
    ));
    let coordinator = PageCoordinator::new(
        transfer,
        source.prefix.clone(),
        host,
        delivery.workers,
        cancel.clone(),
    );
    let driver = ListingDriver::new(
        bucket,
        source.prefix.clone(),
        source.page_size,
        stats.clone(),
        cancel,
    );

    driver.run(&coordinator).await?;

    Ok(stats.snapshot())
}
