//! Claim loops and the lease sweep.
//!
//! Each worker unit repeatedly claims one pending submission and runs
//! it through the pipeline to a terminal state; distinct submissions
//! proceed in parallel, one submission's stages never do. Claim
//! exclusivity comes entirely from the store's atomic transition, so
//! multiple worker processes can run this dispatcher side by side.

use std::sync::Arc;
use std::time::Duration;

use lemma_core::store::{ProblemCatalog, SubmissionStore};
use lemma_pipeline::SubmissionPipeline;
use tokio_util::sync::CancellationToken;

/// Worker pool driver.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn SubmissionStore>,
    catalog: Arc<dyn ProblemCatalog>,
    pipeline: Arc<SubmissionPipeline>,
    concurrency: usize,
    poll_interval: Duration,
    claim_lease: Duration,
    sweep_interval: Duration,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        catalog: Arc<dyn ProblemCatalog>,
        pipeline: Arc<SubmissionPipeline>,
        concurrency: usize,
        poll_interval: Duration,
        claim_lease: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            store,
            catalog,
            pipeline,
            concurrency,
            poll_interval,
            claim_lease,
            sweep_interval,
        }
    }

    /// Run claim loops and the lease sweep until cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            concurrency = self.concurrency,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            lease_secs = self.claim_lease.as_secs(),
            "Dispatcher starting",
        );

        let mut handles = Vec::with_capacity(self.concurrency + 1);

        for index in 0..self.concurrency {
            let dispatcher = self.clone();
            let cancel = cancel.clone();
            let worker_id = format!("worker-{index}");
            handles.push(tokio::spawn(async move {
                dispatcher.worker_loop(worker_id, cancel).await;
            }));
        }

        {
            let dispatcher = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.sweep_loop(cancel).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("Dispatcher stopped");
    }

    /// One claim loop: claim, process, repeat until the queue drains,
    /// then idle for a poll interval.
    async fn worker_loop(&self, worker_id: String, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker_id, "Worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.drain_queue(&worker_id, &cancel).await;
                }
            }
        }
    }

    /// Claim and process submissions until none are pending.
    async fn drain_queue(&self, worker_id: &str, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            let claimed = match self.store.claim_next(worker_id, self.claim_lease).await {
                Ok(claimed) => claimed,
                Err(err) => {
                    tracing::error!(worker_id, error = %err, "Claim attempt failed");
                    return;
                }
            };

            let Some(submission) = claimed else {
                return;
            };

            tracing::info!(
                worker_id,
                submission_id = %submission.id,
                "Submission claimed",
            );

            if let Err(err) = self
                .pipeline
                .process(self.store.as_ref(), self.catalog.as_ref(), &submission)
                .await
            {
                // The submission keeps its claim until the lease expires
                // and the sweep redelivers it.
                tracing::error!(
                    worker_id,
                    submission_id = %submission.id,
                    error = %err,
                    "Pipeline run aborted on store error",
                );
            }
        }
    }

    /// Periodically return expired claims to the queue.
    async fn sweep_loop(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Lease sweep shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.store.release_expired().await {
                        Ok(0) => {}
                        Ok(released) => {
                            tracing::warn!(released, "Redelivered expired claims");
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "Lease sweep failed");
                        }
                    }
                }
            }
        }
    }
}
