//! Delivery Worker
//!
//! Background worker that claims due deliveries and executes them.
//! Handles concurrency limiting and graceful shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::interval;
use tracing::{debug, error, info, instrument};

use hookline_db::store::WebhookStore;

use crate::services::delivery::DeliveryService;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of deliveries executed concurrently.
    pub concurrency: usize,

    /// How often to poll for due deliveries (in milliseconds).
    pub poll_interval_ms: u64,

    /// Maximum deliveries claimed per poll.
    pub batch_size: i64,

    /// Claim lease duration (in seconds). A delivery claimed by a
    /// worker that died becomes claimable again after this long.
    pub lease_secs: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            poll_interval_ms: 1000,
            batch_size: 20,
            lease_secs: 120,
        }
    }
}

/// Delivery worker polling the store for due deliveries.
pub struct DeliveryWorker {
    store: Arc<dyn WebhookStore>,
    service: Arc<DeliveryService>,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl DeliveryWorker {
    /// Create a new worker.
    #[must_use]
    pub fn new(
        store: Arc<dyn WebhookStore>,
        service: Arc<DeliveryService>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            service,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the worker.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(
            concurrency = self.config.concurrency,
            poll_interval_ms = self.config.poll_interval_ms,
            batch_size = self.config.batch_size,
            "Starting delivery worker"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms));

        loop {
            poll_interval.tick().await;
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Worker shutdown requested, stopping poll loop");
                break;
            }
            self.poll_and_deliver(&semaphore).await;
        }

        // Wait for in-flight deliveries to complete
        info!("Waiting for in-flight deliveries to complete...");
        let _ = semaphore.acquire_many(self.config.concurrency as u32).await;
        info!("Worker stopped");
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Claim one batch of due deliveries and execute them inline.
    ///
    /// Deterministic alternative to [`run`](Self::run) for embedded use
    /// and tests; returns the number of deliveries executed.
    pub async fn poll_once(&self) -> usize {
        let deliveries = match self
            .store
            .claim_due_deliveries(
                self.config.batch_size,
                chrono::Duration::seconds(self.config.lease_secs),
            )
            .await
        {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "Failed to claim due deliveries");
                return 0;
            }
        };

        let count = deliveries.len();
        for delivery in deliveries {
            if let Err(e) = self.service.execute_delivery(&delivery).await {
                error!(
                    delivery_id = %delivery.id,
                    error = %e,
                    "Delivery execution failed"
                );
            }
        }
        count
    }

    /// Claim a batch and spawn each delivery under the concurrency cap.
    async fn poll_and_deliver(&self, semaphore: &Arc<Semaphore>) {
        let deliveries = match self
            .store
            .claim_due_deliveries(
                self.config.batch_size,
                chrono::Duration::seconds(self.config.lease_secs),
            )
            .await
        {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "Failed to claim due deliveries");
                return;
            }
        };

        if deliveries.is_empty() {
            return;
        }

        debug!(count = deliveries.len(), "Claimed due deliveries");

        for delivery in deliveries {
            // Try to acquire a permit; claimed-but-unexecuted rows come
            // back once their lease expires.
            let permit = if let Ok(p) = semaphore.clone().try_acquire_owned() {
                p
            } else {
                debug!("All worker slots busy, skipping remaining deliveries");
                return;
            };

            let service = self.service.clone();
            tokio::spawn(async move {
                let _permit = permit; // Hold permit until task completes
                if let Err(e) = service.execute_delivery(&delivery).await {
                    error!(
                        delivery_id = %delivery.id,
                        error = %e,
                        "Delivery execution failed"
                    );
                }
            });
        }
    }
}
