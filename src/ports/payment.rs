//! Payment Provider Port
//!
//! The canonical contract every payment processor adapter implements, plus the
//! normalized response shape handed back to the bot layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a provider call can end in
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Connection could not be established
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered with a body we could not decode
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Provider understood the request and refused it
    #[error("{message}")]
    Rejected {
        status: Option<u16>,
        message: String,
    },

    /// Unknown provider or order
    #[error("{0} not found")]
    NotFound(String),

    /// Operation the provider does not offer
    #[error("{0}")]
    Unsupported(String),
}

/// Coarse classification carried on [`ProviderResponse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Transport,
    Parse,
    Rejected,
    NotFound,
    Unsupported,
    Exhausted,
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::Http(_) | ProviderError::Timeout | ProviderError::Network(_) => {
                ProviderErrorKind::Transport
            }
            ProviderError::Parse(_) => ProviderErrorKind::Parse,
            ProviderError::Rejected { .. } => ProviderErrorKind::Rejected,
            ProviderError::NotFound(_) => ProviderErrorKind::NotFound,
            ProviderError::Unsupported(_) => ProviderErrorKind::Unsupported,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ProviderError::Rejected {
            status: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Network(err.to_string())
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

/// Which way the money moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Client pays fiat, receives BTC
    #[default]
    Buy,
    /// Client sends BTC, receives fiat
    Sell,
}

impl OrderSide {
    pub fn is_sell(&self) -> bool {
        matches!(self, OrderSide::Sell)
    }
}

/// Canonical order-creation request, already remapped to the provider's payment type
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderRequest {
    /// Amount in whole currency units (RUB)
    pub amount: i64,
    pub payment_type: String,
    /// Our own order reference, echoed back in webhooks
    pub correlation_id: String,
    pub side: OrderSide,
}

/// Normalized order payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderData {
    pub id: String,
    #[serde(default)]
    pub requisite: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub bank: String,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub status: String,
}

impl OrderData {
    /// Payload carrying only an id and a status
    pub fn with_status(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            ..Default::default()
        }
    }

    /// Human-readable payment details for the client
    pub fn requisites_line(&self) -> Option<String> {
        if let Some(url) = &self.payment_url {
            if !url.is_empty() {
                return Some(url.clone());
            }
        }
        if self.requisite.is_empty() {
            return None;
        }
        Some(format!("{} ({}, {})", self.requisite, self.bank, self.owner))
    }
}

/// Payment status as reported by a provider.
///
/// `success` is not a payment state here; providers that send it read it in
/// [`PaymentProvider::payment_state`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    Pending,
    Paid,
    Cancelled,
    Unknown(String),
}

impl PaymentState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "finished" | "paid" | "completed" => PaymentState::Paid,
            "cancelled" | "canceled" | "expired" | "failed" => PaymentState::Cancelled,
            "" | "pending" | "new" | "created" | "waiting" | "processing" => PaymentState::Pending,
            other => PaymentState::Unknown(other.to_string()),
        }
    }
}

/// Result every adapter method returns
pub type ProviderResult = Result<OrderData, ProviderError>;

/// Normalized response shape returned by the API manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub success: bool,
    pub data: Option<OrderData>,
    pub error: Option<String>,
    pub error_kind: Option<ProviderErrorKind>,
    pub provider_name: Option<String>,
}

impl ProviderResponse {
    pub fn ok(data: OrderData, provider_name: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            provider_name: Some(provider_name.into()),
        }
    }

    pub fn failure(error: &ProviderError, provider_name: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            provider_name,
        }
    }

    /// Terminal response once the whole fallback chain is spent
    pub fn exhausted() -> Self {
        Self {
            success: false,
            data: None,
            error: Some("all providers failed".to_string()),
            error_kind: Some(ProviderErrorKind::Exhausted),
            provider_name: None,
        }
    }

    pub fn from_result(result: ProviderResult, provider_name: &str) -> Self {
        match result {
            Ok(data) => Self::ok(data, provider_name),
            Err(e) => Self::failure(&e, Some(provider_name.to_string())),
        }
    }
}

/// A third-party payment processor
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a payment order for the client to pay
    async fn create_order(&self, request: &CreateOrderRequest) -> ProviderResult;

    /// Fetch the current state of an order
    async fn get_status(&self, order_ref: &str) -> ProviderResult;

    /// Cancel an order
    async fn cancel(&self, order_ref: &str) -> ProviderResult;

    /// Probe provider availability
    async fn health_check(&self) -> ProviderResult;

    /// Read a status string this provider returned
    fn payment_state(&self, status: &str) -> PaymentState {
        PaymentState::parse(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_state_parse() {
        assert_eq!(PaymentState::parse("finished"), PaymentState::Paid);
        assert_eq!(PaymentState::parse("PAID"), PaymentState::Paid);
        assert_eq!(
            PaymentState::parse("success"),
            PaymentState::Unknown("success".to_string())
        );
        assert_eq!(PaymentState::parse("canceled"), PaymentState::Cancelled);
        assert_eq!(PaymentState::parse(""), PaymentState::Pending);
        assert_eq!(
            PaymentState::parse("on_review"),
            PaymentState::Unknown("on_review".to_string())
        );
    }

    #[test]
    fn test_not_found_display() {
        let err = ProviderError::NotFound("Greengo".to_string());
        assert_eq!(err.to_string(), "Greengo not found");
        assert_eq!(err.kind(), ProviderErrorKind::NotFound);
    }

    #[test]
    fn test_failure_response_shape() {
        let err = ProviderError::Timeout;
        let resp = ProviderResponse::failure(&err, Some("PSPWare".to_string()));
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.error.as_deref(), Some("Request timed out"));
        assert_eq!(resp.error_kind, Some(ProviderErrorKind::Transport));
    }

    #[test]
    fn test_exhausted_response() {
        let resp = ProviderResponse::exhausted();
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("all providers failed"));
        assert!(resp.provider_name.is_none());
    }

    #[test]
    fn test_requisites_line_prefers_payment_url() {
        let data = OrderData {
            id: "1".to_string(),
            requisite: "2200 0000 0000 0000".to_string(),
            payment_url: Some("https://pay.example/1".to_string()),
            ..Default::default()
        };
        assert_eq!(data.requisites_line().as_deref(), Some("https://pay.example/1"));

        let data = OrderData {
            payment_url: None,
            owner: "Ivan".to_string(),
            bank: "Sber".to_string(),
            ..data
        };
        assert_eq!(
            data.requisites_line().as_deref(),
            Some("2200 0000 0000 0000 (Sber, Ivan)")
        );
    }
}
