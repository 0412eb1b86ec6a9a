//! Order Intake
//!
//! Validates an exchange request, persists the order and places it with the
//! first payment provider that accepts it.

use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

use super::api_manager::PaymentApiManager;
use super::lifecycle::DEFAULT_MAX_RETRIES;
use crate::domain::{LifecycleEvent, Order, OrderError};
use crate::ports::notifier::{Notification, Notifier};
use crate::ports::payment::OrderSide;
use crate::ports::store::{update_with_retry, OrderStore, StoreError};

#[derive(Debug, Error, PartialEq)]
pub enum IntakeError {
    #[error("Amount {amount} is outside the allowed range {min}..={max}")]
    AmountOutOfRange { amount: i64, min: i64, max: i64 },

    #[error("Payment type is required")]
    MissingPaymentType,

    #[error("Bitcoin address is required")]
    MissingBtcAddress,

    #[error("No payment provider could take order {personal_id}: {error}")]
    ProvidersUnavailable { personal_id: String, error: String },

    #[error("Invalid order: {0}")]
    Order(#[from] OrderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Fiat amount bounds in RUB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountLimits {
    pub min_amount: i64,
    pub max_amount: i64,
}

impl Default for AmountLimits {
    fn default() -> Self {
        Self {
            min_amount: 1_000,
            max_amount: 500_000,
        }
    }
}

/// What the client asked for
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRequest {
    pub user_id: i64,
    pub amount: i64,
    pub payment_type: String,
    pub btc_address: String,
    pub amount_btc: Decimal,
    pub side: OrderSide,
}

impl ExchangeRequest {
    fn validate(&self, limits: &AmountLimits) -> Result<(), IntakeError> {
        if self.amount < limits.min_amount || self.amount > limits.max_amount {
            return Err(IntakeError::AmountOutOfRange {
                amount: self.amount,
                min: limits.min_amount,
                max: limits.max_amount,
            });
        }
        if self.payment_type.trim().is_empty() {
            return Err(IntakeError::MissingPaymentType);
        }
        if self.btc_address.trim().is_empty() {
            return Err(IntakeError::MissingBtcAddress);
        }
        Ok(())
    }
}

pub struct OrderIntake {
    manager: Arc<PaymentApiManager>,
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn Notifier>,
    limits: AmountLimits,
}

impl OrderIntake {
    pub fn new(
        manager: Arc<PaymentApiManager>,
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn Notifier>,
        limits: AmountLimits,
    ) -> Self {
        Self {
            manager,
            store,
            notifier,
            limits,
        }
    }

    pub async fn create_exchange_order(&self, request: ExchangeRequest) -> Result<Order, IntakeError> {
        request.validate(&self.limits)?;

        let id = self.store.next_id().await?;
        let order = Order::new(
            id,
            request.user_id,
            request.amount,
            request.payment_type.trim().to_string(),
            request.btc_address.trim().to_string(),
            request.amount_btc,
        )?
        .with_side(request.side);
        let order = self.store.insert(order).await?;

        tracing::info!(
            "Order {} created: {} RUB via {} for user {}",
            order.personal_id,
            order.amount,
            order.payment_type,
            order.user_id
        );

        let response = self
            .manager
            .create_order(
                order.amount,
                &order.payment_type,
                &order.personal_id,
                order.side.is_sell(),
            )
            .await;

        match (response.data, response.provider_name) {
            (Some(data), Some(provider_name)) if response.success => {
                let requisites = data.requisites_line();
                // webhooks may already be landing for this order
                let (order, ()) = update_with_retry(
                    self.store.as_ref(),
                    order.id,
                    DEFAULT_MAX_RETRIES,
                    |order| {
                        order.requisites = requisites.clone();
                        order.provider_order_id = Some(data.id.clone());
                        order.provider_name = Some(provider_name.clone());
                        Ok::<_, IntakeError>(())
                    },
                )
                .await?;
                tracing::info!("Order {} placed with {}", order.personal_id, provider_name);
                Ok(order)
            }
            _ => {
                let error = response
                    .error
                    .unwrap_or_else(|| "all providers failed".to_string());
                tracing::error!("Order {} could not be placed: {}", order.personal_id, error);

                let (order, _) = update_with_retry(
                    self.store.as_ref(),
                    order.id,
                    DEFAULT_MAX_RETRIES,
                    |order| {
                        order
                            .apply(&LifecycleEvent::MarkProblem { escalate: false })
                            .map_err(IntakeError::from)
                    },
                )
                .await?;

                let notification = Notification::OrderFailed {
                    order: order.clone(),
                    error: error.clone(),
                };
                if let Err(e) = self.notifier.notify(&notification).await {
                    tracing::error!("Failed to alert operators about order {}: {}", order.personal_id, e);
                }

                Err(IntakeError::ProvidersUnavailable {
                    personal_id: order.personal_id,
                    error,
                })
            }
        }
    }
}
