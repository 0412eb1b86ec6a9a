//! Status Poller
//!
//! Periodically asks providers about open orders, feeds what they report into
//! the lifecycle tracker and expires orders nobody paid for in time.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use super::api_manager::PaymentApiManager;
use super::lifecycle::LifecycleTracker;
use crate::domain::{LifecycleEvent, Order, OrderStatus};
use crate::ports::payment::PaymentState;
use crate::ports::store::StoreError;

/// Cancellation reason recorded on expired orders
pub const TIMEOUT_REASON: &str = "payment timeout exceeded";

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Counters for one pass over the open orders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub checked: usize,
    pub paid: usize,
    pub cancelled: usize,
    pub expired: usize,
    pub errors: usize,
}

pub struct StatusPoller {
    manager: Arc<PaymentApiManager>,
    tracker: Arc<LifecycleTracker>,
    poll_interval: Duration,
    payment_timeout: chrono::Duration,
    is_running: Arc<RwLock<bool>>,
}

impl StatusPoller {
    pub fn new(manager: Arc<PaymentApiManager>, tracker: Arc<LifecycleTracker>) -> Self {
        Self {
            manager,
            tracker,
            poll_interval: Duration::from_secs(60),
            payment_timeout: chrono::Duration::minutes(30),
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_payment_timeout(mut self, timeout: chrono::Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    /// Poll until [`stop`](Self::stop) is called
    pub async fn run(&self) -> Result<(), PollerError> {
        *self.is_running.write().await = true;

        tracing::info!(
            "Starting status poller - interval: {:?}, payment timeout: {} min",
            self.poll_interval,
            self.payment_timeout.num_minutes()
        );

        while *self.is_running.read().await {
            match self.tick().await {
                Ok(summary) if summary.checked > 0 => tracing::info!(
                    "Poll: {} checked, {} paid, {} cancelled, {} expired, {} errors",
                    summary.checked,
                    summary.paid,
                    summary.cancelled,
                    summary.expired,
                    summary.errors
                ),
                Ok(_) => tracing::debug!("Poll: no open orders"),
                Err(e) => tracing::error!("Poll error: {}", e),
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::info!("Status poller stopped");
        Ok(())
    }

    /// One pass over every open order
    pub async fn tick(&self) -> Result<PollSummary, PollerError> {
        let orders = self
            .tracker
            .store()
            .list_by_status(&[OrderStatus::Pending, OrderStatus::PaidByClient, OrderStatus::Problem])
            .await?;

        let mut summary = PollSummary::default();
        for order in orders {
            summary.checked += 1;
            self.check_order(&order, &mut summary).await;
        }
        Ok(summary)
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        tracing::info!("Stop signal sent to status poller");
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    async fn check_order(&self, order: &Order, summary: &mut PollSummary) {
        if let Some(provider) = order.provider_name.as_deref() {
            let response = self.manager.get_status(order.provider_ref(), provider).await;
            match response.data.filter(|_| response.success) {
                Some(data) => {
                    let state = self.manager.payment_state(provider, &data.status);
                    if let Some(event) = Self::event_for(order.status, state) {
                        let is_paid = matches!(event, LifecycleEvent::PaymentFinished { .. });
                        match self.tracker.apply_event(order.id, event).await {
                            Ok(_) if is_paid => {
                                summary.paid += 1;
                                return;
                            }
                            Ok(_) => {
                                summary.cancelled += 1;
                                return;
                            }
                            Err(e) => {
                                summary.errors += 1;
                                tracing::warn!("Order {}: {}", order.personal_id, e);
                            }
                        }
                    }
                }
                None => {
                    summary.errors += 1;
                    tracing::warn!(
                        "Status check for order {} via {} failed: {}",
                        order.personal_id,
                        provider,
                        response.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }

        if self.is_expired(order) {
            self.expire(order, summary).await;
        }
    }

    /// Provider state to tracker event; None means nothing to do
    fn event_for(status: OrderStatus, state: PaymentState) -> Option<LifecycleEvent> {
        match (status, state) {
            (OrderStatus::Pending | OrderStatus::Problem, PaymentState::Paid) => {
                Some(LifecycleEvent::PaymentFinished { received_sum: None })
            }
            (
                OrderStatus::Pending | OrderStatus::PaidByClient | OrderStatus::Problem,
                PaymentState::Cancelled,
            ) => {
                Some(LifecycleEvent::ProviderCancelled)
            }
            _ => None,
        }
    }

    fn is_expired(&self, order: &Order) -> bool {
        order.status == OrderStatus::Pending && Utc::now() - order.created_at > self.payment_timeout
    }

    async fn expire(&self, order: &Order, summary: &mut PollSummary) {
        tracing::info!("Order {} exceeded the payment window", order.personal_id);

        if let Some(provider) = order.provider_name.as_deref() {
            let response = self.manager.cancel(order.provider_ref(), provider).await;
            if !response.success {
                tracing::warn!(
                    "Provider cancel for expired order {} failed: {}",
                    order.personal_id,
                    response.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        let event = LifecycleEvent::Cancel {
            reason: TIMEOUT_REASON.to_string(),
        };
        match self.tracker.apply_event(order.id, event).await {
            Ok(_) => summary.expired += 1,
            Err(e) => {
                summary.errors += 1;
                tracing::warn!("Could not expire order {}: {}", order.personal_id, e);
            }
        }
    }
}
