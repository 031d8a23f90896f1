//! Run statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the listing driver and transfer workers
#[derive(Debug, Default)]
pub struct DrainStats {
    pages: AtomicU64,
    delivered: AtomicU64,
    deleted: AtomicU64,
    bytes: AtomicU64,
}

impl DrainStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "pages", "Metric incremented");
    }

    pub fn delivered(&self, bytes: u64) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        tracing::trace!(counter = "delivered", bytes, "Metric incremented");
    }

    pub fn deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "deleted", "Metric incremented");
    }

    pub fn snapshot(&self) -> DrainSummary {
        DrainSummary {
            pages: self.pages.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainSummary {
    pub pages: u64,
    pub delivered: u64,
    pub deleted: u64,
    pub bytes: u64,
}
