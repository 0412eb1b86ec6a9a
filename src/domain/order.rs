use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::ports::payment::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaidByClient,
    Completed,
    Cancelled,
    Problem,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaidByClient => "paid_by_client",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Problem => "problem",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can move an order
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Provider reports the client paid
    PaymentFinished { received_sum: Option<Decimal> },
    /// Provider cancelled the payment on its side
    ProviderCancelled,
    /// Operator confirmed the Bitcoin went out
    BitcoinSent,
    /// Operator or timeout cancellation
    Cancel { reason: String },
    /// Raise the problem marker; `escalate` also moves the status
    MarkProblem { escalate: bool },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::PaymentFinished { .. } => "payment_finished",
            LifecycleEvent::ProviderCancelled => "provider_cancelled",
            LifecycleEvent::BitcoinSent => "bitcoin_sent",
            LifecycleEvent::Cancel { .. } => "cancel",
            LifecycleEvent::MarkProblem { .. } => "mark_problem",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    #[error("Order is {0} and can no longer change")]
    Terminal(OrderStatus),
    #[error("Cannot apply {event} to an order in status {from}")]
    InvalidTransition { from: OrderStatus, event: &'static str },
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),
}

/// Status change produced by [`Order::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Free-text note an operator attached to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorNote {
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    /// Reference echoed back by providers
    pub personal_id: String,
    /// Client chat id
    pub user_id: i64,
    /// Fiat amount in RUB
    pub amount: i64,
    pub payment_type: String,
    #[serde(default)]
    pub side: OrderSide,
    pub status: OrderStatus,
    #[serde(default)]
    pub problem: bool,
    pub provider_name: Option<String>,
    pub provider_order_id: Option<String>,
    pub requisites: Option<String>,
    pub btc_address: String,
    pub amount_btc: Decimal,
    pub received_sum: Option<Decimal>,
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub operator_notes: Vec<OperatorNote>,
    /// Bumped by the store on every write
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: u64,
        user_id: i64,
        amount: i64,
        payment_type: String,
        btc_address: String,
        amount_btc: Decimal,
    ) -> Result<Self, OrderError> {
        if amount <= 0 {
            return Err(OrderError::InvalidAmount(amount));
        }
        let now = Utc::now();

        Ok(Self {
            id,
            personal_id: Self::personal_id_for(id, now),
            user_id,
            amount,
            payment_type,
            side: OrderSide::Buy,
            status: OrderStatus::Pending,
            problem: false,
            provider_name: None,
            provider_order_id: None,
            requisites: None,
            btc_address,
            amount_btc,
            received_sum: None,
            cancel_reason: None,
            operator_notes: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_side(mut self, side: OrderSide) -> Self {
        self.side = side;
        self
    }

    /// `YYMMDD` + zero-padded id, e.g. `2610190042`
    pub fn personal_id_for(id: u64, at: DateTime<Utc>) -> String {
        format!("{}{:04}", at.format("%y%m%d"), id)
    }

    /// Order reference to use when talking to the provider
    pub fn provider_ref(&self) -> &str {
        self.provider_order_id.as_deref().unwrap_or(&self.personal_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Drive the state machine. Terminal orders reject every event.
    pub fn apply(&mut self, event: &LifecycleEvent) -> Result<Transition, OrderError> {
        let from = self.status;
        if from.is_terminal() {
            return Err(OrderError::Terminal(from));
        }

        let to = match (from, event) {
            // provider facts still land on escalated orders; the problem flag stays set
            (
                OrderStatus::Pending | OrderStatus::Problem,
                LifecycleEvent::PaymentFinished { received_sum },
            ) => {
                self.received_sum = *received_sum;
                OrderStatus::PaidByClient
            }
            (OrderStatus::PaidByClient, LifecycleEvent::BitcoinSent) => OrderStatus::Completed,
            (
                OrderStatus::Pending | OrderStatus::PaidByClient | OrderStatus::Problem,
                LifecycleEvent::ProviderCancelled,
            ) => {
                self.cancel_reason = Some("cancelled by payment provider".to_string());
                OrderStatus::Cancelled
            }
            (
                OrderStatus::Pending | OrderStatus::PaidByClient | OrderStatus::Problem,
                LifecycleEvent::Cancel { reason },
            ) => {
                self.cancel_reason = Some(reason.clone());
                OrderStatus::Cancelled
            }
            (_, LifecycleEvent::MarkProblem { escalate }) => {
                self.problem = true;
                if *escalate {
                    OrderStatus::Problem
                } else {
                    from
                }
            }
            (from, event) => {
                return Err(OrderError::InvalidTransition {
                    from,
                    event: event.name(),
                })
            }
        };

        self.status = to;
        self.updated_at = Utc::now();
        Ok(Transition { from, to })
    }

    pub fn add_note(&mut self, author: impl Into<String>, text: impl Into<String>) {
        self.operator_notes.push(OperatorNote {
            author: author.into(),
            text: text.into(),
            created_at: Utc::now(),
        });
        self.updated_at = Utc::now();
    }
}
