//! Notifier Port
//!
//! Outbound messages to the client, the operator chat and the admin chat.
//! Delivery failures are reported to the caller, who logs and moves on.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::Order;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
    #[error("Channel not configured: {0}")]
    NotConfigured(String),
}

/// Where a notification goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTarget {
    Operators,
    Admin,
    Client(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Operators: payment landed, Bitcoin must be sent
    PaymentReceived { order: Order, received_sum: Option<Decimal> },
    /// Client: payment confirmed
    PaymentConfirmed { order: Order },
    /// Client: Bitcoin sent
    OrderCompleted { order: Order },
    /// Client: order cancelled
    OrderCancelled { order: Order, reason: String },
    /// Admin: operator flagged a problem
    ProblemReported { order: Order, operator: String },
    /// Admin: operator note
    NoteAdded { order: Order, operator: String, text: String },
    /// Operators: order could not be placed with any provider
    OrderFailed { order: Order, error: String },
}

impl Notification {
    pub fn target(&self) -> NotifyTarget {
        match self {
            Notification::PaymentReceived { .. } | Notification::OrderFailed { .. } => {
                NotifyTarget::Operators
            }
            Notification::ProblemReported { .. } | Notification::NoteAdded { .. } => {
                NotifyTarget::Admin
            }
            Notification::PaymentConfirmed { order }
            | Notification::OrderCompleted { order }
            | Notification::OrderCancelled { order, .. } => NotifyTarget::Client(order.user_id),
        }
    }

    pub fn order(&self) -> &Order {
        match self {
            Notification::PaymentReceived { order, .. }
            | Notification::PaymentConfirmed { order }
            | Notification::OrderCompleted { order }
            | Notification::OrderCancelled { order, .. }
            | Notification::ProblemReported { order, .. }
            | Notification::NoteAdded { order, .. }
            | Notification::OrderFailed { order, .. } => order,
        }
    }

    /// Plain-text body
    pub fn render(&self) -> String {
        let order = self.order();
        let id = &order.personal_id;
        match self {
            Notification::PaymentReceived { received_sum, .. } => {
                let received = received_sum
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| order.amount.to_string());
                format!(
                    "ORDER PAID\n\nOrder: #{}\nClient ID: {}\nReceived: {} RUB\nOrder amount: {} RUB\nTo send: {} BTC\nAddress: {}\nPayment type: {}\n\nBitcoin must be sent!",
                    id, order.user_id, received, order.amount, order.amount_btc, order.btc_address, order.payment_type
                )
            }
            Notification::PaymentConfirmed { .. } => format!(
                "Payment received!\n\nOrder: #{}\nAmount: {} RUB\nYou receive: {} BTC\n\nBitcoin will be sent to your address within 1 hour.",
                id, order.amount, order.amount_btc
            ),
            Notification::OrderCompleted { .. } => format!(
                "Order completed!\n\nOrder: #{}\nSent: {} BTC\nTo address: {}\n\nBitcoin sent successfully, check your wallet.",
                id, order.amount_btc, order.btc_address
            ),
            Notification::OrderCancelled { reason, .. } => format!(
                "Order cancelled\n\nOrder: #{}\nAmount: {} RUB\n\nReason: {}\n\nCreate a new order to exchange.",
                id, order.amount, reason
            ),
            Notification::ProblemReported { operator, .. } => format!(
                "PROBLEM ORDER\n\nOrder: #{}\nOperator: {}\nStatus: {}\n\nAdministrator attention required",
                id, operator, order.status
            ),
            Notification::NoteAdded { operator, text, .. } => format!(
                "ORDER NOTE\n\nOrder: #{}\nOperator: {}\nNote: {}",
                id, operator, text
            ),
            Notification::OrderFailed { error, .. } => format!(
                "ORDER ERROR\n\nOrder: #{}\nClient ID: {}\nAmount: {} RUB\nError: {}\n\nIntervention required!",
                id, order.user_id, order.amount, error
            ),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order::new(3, 555, 5000, "sbp".into(), "bc1qaddr".into(), dec!(0.0005)).unwrap()
    }

    #[test]
    fn test_targets() {
        let o = order();
        assert_eq!(
            Notification::PaymentReceived { order: o.clone(), received_sum: None }.target(),
            NotifyTarget::Operators
        );
        assert_eq!(
            Notification::PaymentConfirmed { order: o.clone() }.target(),
            NotifyTarget::Client(555)
        );
        assert_eq!(
            Notification::ProblemReported { order: o, operator: "@op".into() }.target(),
            NotifyTarget::Admin
        );
    }

    #[test]
    fn test_render_mentions_order() {
        let o = order();
        let text = Notification::OrderCancelled {
            order: o.clone(),
            reason: "payment timeout exceeded".into(),
        }
        .render();
        assert!(text.contains(&o.personal_id));
        assert!(text.contains("payment timeout exceeded"));
    }

    #[test]
    fn test_render_received_sum_falls_back_to_amount() {
        let text = Notification::PaymentReceived { order: order(), received_sum: None }.render();
        assert!(text.contains("Received: 5000 RUB"));
    }
}
