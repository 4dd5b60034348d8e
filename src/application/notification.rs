use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::domain::errors::{DomainError, NotificationError};
use crate::domain::notification::OutboundMessage;
use crate::domain::ports::{Messenger, NotificationRepository, OrderNotifier};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans one order out to its sellers' chats.
pub struct NotificationDispatcher {
    repo: Arc<dyn NotificationRepository>,
    messenger: Arc<dyn Messenger>,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        messenger: Arc<dyn Messenger>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            messenger,
            send_timeout,
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn NotificationRepository) -> Result<T, DomainError> + Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_blocking(move || f(repo.as_ref()))
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?
    }

    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotificationError> {
        match tokio::time::timeout(self.send_timeout, self.messenger.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout(self.send_timeout)),
        }
    }

    /// Best effort: one seller's failure never affects another, and nothing
    /// here is reported back to the buyer. The outbox entry is claimed before
    /// anything is sent, so an order reaching the worker twice is sent once.
    pub async fn notify(&self, order_id: i64) -> DispatchReport {
        match self.blocking(move |repo| repo.claim_dispatch(order_id)).await {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("order {} already dispatched, skipping", order_id);
                return DispatchReport::default();
            }
            Err(e) => {
                log::error!("order {}: could not claim outbox entry: {}", order_id, e);
                return DispatchReport::default();
            }
        }

        let notice = match self.blocking(move |repo| repo.load_notice(order_id)).await {
            Ok(Some(notice)) => notice,
            Ok(None) => {
                log::warn!("order {} vanished before its notification was sent", order_id);
                return DispatchReport::default();
            }
            Err(e) => {
                log::error!("could not load order {} for notification: {}", order_id, e);
                return DispatchReport::default();
            }
        };

        let messages = notice.seller_messages();
        let results = join_all(messages.iter().map(|m| self.deliver(m))).await;

        let mut report = DispatchReport::default();
        for (message, result) in messages.iter().zip(results) {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    log::warn!(
                        "order {}: seller chat {} not notified: {}",
                        order_id,
                        message.chat_id,
                        e
                    );
                }
            }
        }

        log::debug!(
            "order {} notified: {} delivered, {} failed",
            order_id,
            report.delivered,
            report.failed
        );
        report
    }

    pub async fn pending(&self) -> Vec<i64> {
        match self.blocking(|repo| repo.pending_dispatches()).await {
            Ok(ids) => ids,
            Err(e) => {
                log::error!("could not read pending notifications: {}", e);
                vec![]
            }
        }
    }
}

/// Post-commit hand-off into the notification worker.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<i64>,
}

impl OrderNotifier for DispatchHandle {
    fn order_placed(&self, order_id: i64) {
        if let Err(e) = self.tx.try_send(order_id) {
            // the outbox row stays pending and is replayed on next start
            log::warn!("notification for order {} not queued: {}", order_id, e);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub queue_capacity: usize,
    pub concurrency: usize,
}

/// Starts the worker on the current tokio runtime. Outbox entries left
/// pending by an earlier run are replayed before queued orders.
pub fn spawn_worker(
    dispatcher: Arc<NotificationDispatcher>,
    options: WorkerOptions,
) -> (DispatchHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<i64>(options.queue_capacity.max(1));
    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));

    let worker = tokio::spawn(async move {
        let backlog = dispatcher.pending().await;
        if !backlog.is_empty() {
            log::info!("replaying {} pending order notifications", backlog.len());
        }
        for order_id in backlog {
            dispatcher.notify(order_id).await;
        }

        while let Some(order_id) = rx.recv().await {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher.notify(order_id).await;
                drop(permit);
            });
        }
        log::info!("notification worker stopped");
    });

    (DispatchHandle { tx }, worker)
}
