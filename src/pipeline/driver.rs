//! Walks a prefix page by page

use super::{Continuation, PageHandler};
use crate::error::{DeliveryError, Result};
use crate::observability::DrainStats;
use crate::storage::Bucket;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Listing driver
///
/// Requests one page, hands it to the page handler and only asks for the
/// next page once the handler has returned.
pub struct ListingDriver {
    bucket: Bucket,
    prefix: String,
    page_size: usize,
    stats: Arc<DrainStats>,
    cancel: CancellationToken,
}

impl ListingDriver {
    pub fn new(
        bucket: Bucket,
        prefix: impl Into<String>,
        page_size: usize,
        stats: Arc<DrainStats>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            bucket,
            prefix: prefix.into(),
            page_size,
            stats,
            cancel,
        }
    }

    /// Run until the last page is handled; returns the number of pages
    pub async fn run(&self, handler: &dyn PageHandler) -> Result<u64> {
        let mut lister = self.bucket.pages(&self.prefix, self.page_size);
        let mut pages = 0u64;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DeliveryError::Cancelled);
            }

            let page = lister
                .next_page()
                .await
                .map_err(|source| DeliveryError::Listing {
                    prefix: self.prefix.clone(),
                    source,
                })?;
            let Some(page) = page else { break };

            pages += 1;
            self.stats.page();
            debug!(page = pages, objects = page.len(), last = page.is_last, "Listed page");

            if handler.handle(page).await? == Continuation::Stop {
                break;
            }
        }

        Ok(pages)
    }
}
