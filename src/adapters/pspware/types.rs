//! PSPWare wire types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::payment::{OrderData, OrderSide};

pub const ORDER_TYPE_PAY_IN: &str = "PAY-IN";
pub const ORDER_TYPE_PAY_OUT: &str = "PAY-OUT";

/// Status PSPWare puts on an order it accepted; says nothing about payment
pub const STATUS_ACCEPTED: &str = "success";

/// Body of `POST /orders`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateOrderBody {
    pub sum: i64,
    pub currency: String,
    pub order_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geos: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    pub merchant_id: String,
    pub order_id: String,
    pub description: String,
}

impl CreateOrderBody {
    /// Pay-outs carry a bank instead of pay types and geos
    pub fn new(
        side: OrderSide,
        sum: i64,
        pay_type: &str,
        merchant_id: &str,
        order_id: &str,
    ) -> Self {
        let (order_type, pay_types, geos, bank) = match side {
            OrderSide::Buy => (
                ORDER_TYPE_PAY_IN,
                Some(vec![pay_type.to_string()]),
                Some(vec!["RU".to_string()]),
                None,
            ),
            OrderSide::Sell => (ORDER_TYPE_PAY_OUT, None, None, Some("any-bank".to_string())),
        };

        Self {
            sum,
            currency: "RUB".to_string(),
            order_type: order_type.to_string(),
            pay_types,
            geos,
            bank,
            merchant_id: merchant_id.to_string(),
            order_id: order_id.to_string(),
            description: format!("Exchange order {}", order_id),
        }
    }
}

/// Order as returned by `POST /orders` and `GET /orders/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspOrder {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub sum: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default, rename = "pay_type")]
    pub pay_type: Option<String>,
    #[serde(default, rename = "payment_url")]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub bik: Option<String>,
    #[serde(default)]
    pub geo: Option<String>,
    /// Validation errors: a list of `{loc, msg}` or a plain string
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PspOrder {
    pub fn is_success_status(&self) -> bool {
        self.status.as_deref() == Some(STATUS_ACCEPTED)
    }

    /// Ids come back as numbers or strings
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }

    pub fn into_order_data(self, fallback_id: &str) -> OrderData {
        OrderData {
            id: self.id_string().unwrap_or_else(|| fallback_id.to_string()),
            requisite: self.card.unwrap_or_default(),
            owner: self.recipient.unwrap_or_default(),
            bank: self.bank_name.unwrap_or_default(),
            payment_url: self.payment_url,
            status: self.status.unwrap_or_default(),
        }
    }

    /// Best description of why the request failed
    pub fn error_message(&self) -> String {
        match &self.detail {
            Some(Value::Array(items)) => {
                let errors: Vec<String> = items
                    .iter()
                    .map(|item| {
                        let field = item
                            .get("loc")
                            .and_then(Value::as_array)
                            .map(|loc| {
                                loc.iter()
                                    .map(|part| match part {
                                        Value::String(s) => s.clone(),
                                        other => other.to_string(),
                                    })
                                    .collect::<Vec<_>>()
                                    .join(".")
                            })
                            .unwrap_or_default();
                        let msg = item
                            .get("msg")
                            .and_then(Value::as_str)
                            .unwrap_or("Invalid value");
                        format!("{}: {}", field, msg)
                    })
                    .collect();
                errors.join("; ")
            }
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => self
                .message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string()),
            Some(other) => other.to_string(),
        }
    }
}

/// `GET /health`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthBody {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /merchant/me`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchantInfo {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub hold_balance: Option<Decimal>,
    #[serde(default)]
    pub percents: Vec<Value>,
}

/// Body of `POST /withdrawal`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WithdrawalBody {
    pub address: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub sum: Decimal,
}

/// Withdrawal request as PSPWare recorded it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub sum: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Error body of the merchant endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageBody {
    pub fn error_message(self) -> String {
        self.message.unwrap_or_else(|| "Unknown error".to_string())
    }
}
