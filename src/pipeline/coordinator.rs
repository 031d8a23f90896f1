//! Runs one listing page through a bounded pool of transfer workers

use super::{Continuation, PageHandler};
use crate::delivery::{HostIdentity, Transfer, TransferTask};
use crate::error::{DeliveryError, Result};
use crate::storage::Page;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

type TaskQueue = Arc<Mutex<mpsc::Receiver<TransferTask>>>;

/// Page coordinator
///
/// Flow per page:
/// 1. Resolve every descriptor to a `TransferTask` (naming errors fail the
///    page before anything is fetched)
/// 2. Queue all tasks on a channel
/// 3. Spawn `min(workers, page length)` workers that drain the channel
/// 4. Join every worker; the first failure cancels the rest
pub struct PageCoordinator {
    transfer: Arc<Transfer>,
    prefix: String,
    host: HostIdentity,
    workers: usize,
    cancel: CancellationToken,
}

impl PageCoordinator {
    pub fn new(
        transfer: Arc<Transfer>,
        prefix: impl Into<String>,
        host: HostIdentity,
        workers: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transfer,
            prefix: prefix.into(),
            host,
            workers: workers.max(1),
            cancel,
        }
    }

    /// Deliver every object of the page, waiting for all workers to stop
    pub async fn process(&self, page: Page) -> Result<Continuation> {
        let is_last = page.is_last;
        info!(count = page.len(), "Fetching messages");

        let tasks = page
            .objects
            .into_iter()
            .map(|object| TransferTask::resolve(object, &self.prefix, &self.host))
            .collect::<Result<Vec<_>>>()?;

        if !tasks.is_empty() {
            self.run_workers(tasks).await?;
        }

        Ok(if is_last {
            Continuation::Stop
        } else {
            Continuation::Continue
        })
    }

    async fn run_workers(&self, tasks: Vec<TransferTask>) -> Result<()> {
        let pool_size = self.workers.min(tasks.len());
        let (tx, rx) = mpsc::channel(tasks.len());
        for task in tasks {
            // capacity matches the task count, so this never waits
            if tx.send(task).await.is_err() {
                break;
            }
        }
        drop(tx);

        let queue: TaskQueue = Arc::new(Mutex::new(rx));
        let mut workers = JoinSet::new();
        for worker_id in 0..pool_size {
            workers.spawn(run_worker(
                worker_id,
                queue.clone(),
                self.transfer.clone(),
                self.cancel.clone(),
            ));
        }

        let mut first_error: Option<DeliveryError> = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = joined.map_err(DeliveryError::from).and_then(|result| result);
            if let Err(err) = outcome {
                self.cancel.cancel();
                // a real failure outranks the cancellations it caused
                let replace = match &first_error {
                    None => true,
                    Some(existing) => existing.is_cancelled() && !err.is_cancelled(),
                };
                if replace {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PageHandler for PageCoordinator {
    async fn handle(&self, page: Page) -> Result<Continuation> {
        self.process(page).await
    }
}

/// Take tasks off the shared queue until it is empty or the run is cancelled
async fn run_worker(
    worker_id: usize,
    queue: TaskQueue,
    transfer: Arc<Transfer>,
    cancel: CancellationToken,
) -> Result<usize> {
    let mut completed = 0;

    loop {
        if cancel.is_cancelled() {
            debug!(worker_id, completed, "Worker stopping on cancellation");
            return Err(DeliveryError::Cancelled);
        }

        let next = queue.lock().await.recv().await;
        let Some(task) = next else { break };

        if let Err(err) = transfer.run(&task, &cancel).await {
            if !err.is_cancelled() {
                error!(
                    worker_id,
                    key = task.key(),
                    operation = err.operation(),
                    error = %err,
                    "Transfer failed"
                );
                cancel.cancel();
            }
            return Err(err);
        }
        completed += 1;
    }

    debug!(worker_id, completed, "Worker drained queue");
    Ok(completed)
}
