//! Order Lifecycle Tracker
//!
//! Turns provider webhooks, poll results and operator actions into order state
//! changes, persists them and fans the resulting notifications out.
//!
//! Writes go through the store's version check. On a conflict the order is
//! re-read and the event re-applied, so a webhook racing an operator click is
//! validated against whatever landed first.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{Actor, LifecycleEvent, OperatorRoster, Order, OrderError, Transition};
use crate::ports::notifier::{Notification, Notifier};
use crate::ports::store::{update_with_retry, OrderStore, RosterStore, StoreError};

/// Re-read attempts after a version conflict
pub const DEFAULT_MAX_RETRIES: usize = 3;

const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error("Webhook payload has no personal_id")]
    MissingPersonalId,

    #[error("Order {0} not found")]
    OrderNotFound(String),

    #[error("Unsupported webhook status: {0}")]
    UnsupportedStatus(String),

    #[error("User {0} is not allowed to handle orders here")]
    Unauthorized(i64),

    #[error("Only the administrator can manage operators (user {0})")]
    AdminOnly(i64),

    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] OrderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Provider callback body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub personal_id: Option<String>,
    /// Provider-side order id
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub received_sum: Option<Decimal>,
}

impl WebhookPayload {
    fn event(&self) -> Result<LifecycleEvent, LifecycleError> {
        match self.status.trim().to_ascii_lowercase().as_str() {
            "finished" => Ok(LifecycleEvent::PaymentFinished {
                received_sum: self.received_sum,
            }),
            "cancelled" | "canceled" => Ok(LifecycleEvent::ProviderCancelled),
            other => Err(LifecycleError::UnsupportedStatus(other.to_string())),
        }
    }
}

/// What an operator can do from the operator chat
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorAction {
    Sent,
    Cancel { reason: String },
    MarkProblem { escalate: bool },
    AddNote { text: String },
    Details,
}

impl OperatorAction {
    pub fn name(&self) -> &'static str {
        match self {
            OperatorAction::Sent => "sent",
            OperatorAction::Cancel { .. } => "cancel",
            OperatorAction::MarkProblem { .. } => "problem",
            OperatorAction::AddNote { .. } => "note",
            OperatorAction::Details => "details",
        }
    }
}

/// Result of a tracked change
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub order: Order,
    /// None for actions that do not touch the status
    pub transition: Option<Transition>,
}

pub struct LifecycleTracker {
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    roster: RwLock<OperatorRoster>,
    roster_store: Option<Arc<dyn RosterStore>>,
    max_retries: usize,
}

impl LifecycleTracker {
    pub fn new(
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
        roster: OperatorRoster,
    ) -> Self {
        Self {
            store,
            notifier,
            roster: RwLock::new(roster),
            roster_store: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Persist admin roster changes
    pub fn with_roster_store(mut self, roster_store: Arc<dyn RosterStore>) -> Self {
        self.roster_store = Some(roster_store);
        self
    }

    /// Replace the configured operators with the saved list, if there is one.
    /// Returns whether a saved list was found.
    pub async fn restore_roster(&self) -> Result<bool, LifecycleError> {
        let Some(roster_store) = &self.roster_store else {
            return Ok(false);
        };
        let Some(saved) = roster_store.load_operators().await? else {
            return Ok(false);
        };
        let mut roster = self.roster.write().await;
        roster.replace_operators(saved);
        tracing::info!("Operator roster restored: {:?}", roster.list());
        Ok(true)
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    /// Apply a provider callback to the order it names
    pub async fn handle_webhook(&self, payload: &WebhookPayload) -> Result<Outcome, LifecycleError> {
        let Some(personal_id) = payload.personal_id.as_deref().filter(|p| !p.is_empty()) else {
            tracing::error!("Webhook without personal_id (provider id {:?})", payload.id);
            return Err(LifecycleError::MissingPersonalId);
        };

        let event = payload.event().inspect_err(|e| {
            tracing::error!("Webhook for {}: {}", personal_id, e);
        })?;

        let Some(order) = self.store.find_by_personal_id(personal_id).await? else {
            tracing::error!("Webhook for unknown order {}", personal_id);
            return Err(LifecycleError::OrderNotFound(personal_id.to_string()));
        };

        tracing::info!(
            "Webhook {} for order {} (provider id {:?})",
            payload.status,
            personal_id,
            payload.id
        );
        self.apply_event(order.id, event).await
    }

    /// Drive an order with an event from the system side (webhook, poller, timeout)
    pub async fn apply_event(
        &self,
        order_id: u64,
        event: LifecycleEvent,
    ) -> Result<Outcome, LifecycleError> {
        let (order, transition) = self
            .mutate(order_id, |order| order.apply(&event))
            .await
            .inspect_err(|e| {
                tracing::warn!("Order {} rejected {}: {}", order_id, event.name(), e);
            })?;

        tracing::info!(
            "Order {} {} -> {} ({})",
            order.personal_id,
            transition.from,
            transition.to,
            event.name()
        );
        self.announce(&order, &event, SYSTEM_ACTOR).await;

        Ok(Outcome {
            order,
            transition: Some(transition),
        })
    }

    /// Run an operator action after checking the actor may handle orders
    pub async fn apply_operator_action(
        &self,
        actor: &Actor,
        order_id: u64,
        action: OperatorAction,
    ) -> Result<Outcome, LifecycleError> {
        if !self.roster.read().await.can_handle_orders(actor) {
            tracing::warn!(
                "User {} tried operator action {} on order {} from chat {}",
                actor.user_id,
                action.name(),
                order_id,
                actor.chat_id
            );
            return Err(LifecycleError::Unauthorized(actor.user_id));
        }

        let operator = actor.display_name();
        let event = match action {
            OperatorAction::Details => {
                let order = self.load(order_id).await?;
                return Ok(Outcome {
                    order,
                    transition: None,
                });
            }
            OperatorAction::AddNote { text } => {
                let (order, ()) = self
                    .mutate(order_id, |order| {
                        order.add_note(operator.clone(), text.clone());
                        Ok(())
                    })
                    .await?;
                tracing::info!("{} added a note to order {}", operator, order.personal_id);
                self.send(Notification::NoteAdded {
                    order: order.clone(),
                    operator,
                    text,
                })
                .await;
                return Ok(Outcome {
                    order,
                    transition: None,
                });
            }
            OperatorAction::Sent => LifecycleEvent::BitcoinSent,
            OperatorAction::Cancel { reason } => LifecycleEvent::Cancel { reason },
            OperatorAction::MarkProblem { escalate } => LifecycleEvent::MarkProblem { escalate },
        };

        let (order, transition) = self
            .mutate(order_id, |order| order.apply(&event))
            .await
            .inspect_err(|e| {
                tracing::warn!("{} could not {} order {}: {}", operator, event.name(), order_id, e);
            })?;

        tracing::info!(
            "{} moved order {} {} -> {}",
            operator,
            order.personal_id,
            transition.from,
            transition.to
        );
        self.announce(&order, &event, &operator).await;

        Ok(Outcome {
            order,
            transition: Some(transition),
        })
    }

    pub async fn add_operator(&self, actor: &Actor, user_id: i64) -> Result<bool, LifecycleError> {
        let mut roster = self.roster.write().await;
        if !roster.is_admin(actor.user_id) {
            return Err(LifecycleError::AdminOnly(actor.user_id));
        }
        if !roster.add(user_id) {
            return Ok(false);
        }
        if let Err(e) = self.save_roster(&roster).await {
            roster.remove(user_id);
            return Err(e);
        }
        tracing::info!("Operator {} added by {}", user_id, actor.display_name());
        Ok(true)
    }

    pub async fn remove_operator(&self, actor: &Actor, user_id: i64) -> Result<bool, LifecycleError> {
        let mut roster = self.roster.write().await;
        if !roster.is_admin(actor.user_id) {
            return Err(LifecycleError::AdminOnly(actor.user_id));
        }
        if !roster.remove(user_id) {
            return Ok(false);
        }
        if let Err(e) = self.save_roster(&roster).await {
            roster.add(user_id);
            return Err(e);
        }
        tracing::info!("Operator {} removed by {}", user_id, actor.display_name());
        Ok(true)
    }

    pub async fn list_operators(&self, actor: &Actor) -> Result<Vec<i64>, LifecycleError> {
        let roster = self.roster.read().await;
        if !roster.is_admin(actor.user_id) {
            return Err(LifecycleError::AdminOnly(actor.user_id));
        }
        Ok(roster.list())
    }

    async fn save_roster(&self, roster: &OperatorRoster) -> Result<(), LifecycleError> {
        if let Some(roster_store) = &self.roster_store {
            roster_store.save_operators(&roster.list()).await?;
        }
        Ok(())
    }

    async fn load(&self, order_id: u64) -> Result<Order, LifecycleError> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| LifecycleError::OrderNotFound(order_id.to_string()))
    }

    /// Read, change and write back an order, retrying on version conflicts
    async fn mutate<T, F>(&self, order_id: u64, mut change: F) -> Result<(Order, T), LifecycleError>
    where
        F: FnMut(&mut Order) -> Result<T, OrderError> + Send,
        T: Send,
    {
        update_with_retry(self.store.as_ref(), order_id, self.max_retries, |order| {
            change(order).map_err(LifecycleError::from)
        })
        .await
        .map_err(|e| match e {
            LifecycleError::Store(StoreError::NotFound(id)) => {
                LifecycleError::OrderNotFound(id.to_string())
            }
            other => other,
        })
    }

    async fn announce(&self, order: &Order, event: &LifecycleEvent, operator: &str) {
        match event {
            LifecycleEvent::PaymentFinished { received_sum } => {
                self.send(Notification::PaymentReceived {
                    order: order.clone(),
                    received_sum: *received_sum,
                })
                .await;
                self.send(Notification::PaymentConfirmed {
                    order: order.clone(),
                })
                .await;
            }
            LifecycleEvent::BitcoinSent => {
                self.send(Notification::OrderCompleted {
                    order: order.clone(),
                })
                .await;
            }
            LifecycleEvent::ProviderCancelled | LifecycleEvent::Cancel { .. } => {
                let reason = order
                    .cancel_reason
                    .clone()
                    .unwrap_or_else(|| "cancelled".to_string());
                self.send(Notification::OrderCancelled {
                    order: order.clone(),
                    reason,
                })
                .await;
            }
            LifecycleEvent::MarkProblem { .. } => {
                self.send(Notification::ProblemReported {
                    order: order.clone(),
                    operator: operator.to_string(),
                })
                .await;
            }
        }
    }

    /// Delivery failures never undo a transition
    async fn send(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            tracing::error!(
                "Failed to notify {:?} about order {}: {}",
                notification.target(),
                notification.order().personal_id,
                e
            );
        }
    }
}
