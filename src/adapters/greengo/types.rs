//! Greengo wire types

use serde::{Deserialize, Serialize};

use crate::ports::payment::{OrderData, ProviderError, ProviderResult};

/// Placeholder for owner/bank fields Greengo leaves out
pub const UNKNOWN: &str = "Unknown";

/// Body of `/order/create`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateOrderBody {
    pub payment_method: String,
    /// Payout wallet, empty for fiat pay-ins
    pub wallet: String,
    /// Amount as a decimal string
    pub from_amount: String,
}

/// Body of `/order/check` and `/order/cancel`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderIdsBody {
    pub order_id: Vec<String>,
}

/// Shared response envelope for every Greengo order endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GreengoResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub requisite: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GreengoResponse {
    pub fn into_result(self, fallback_id: &str, http_status: Option<u16>) -> ProviderResult {
        if !self.success {
            let message = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "no description".to_string());
            return Err(ProviderError::Rejected {
                status: http_status,
                message,
            });
        }

        Ok(OrderData {
            id: self.order_id.unwrap_or_else(|| fallback_id.to_string()),
            requisite: self.requisite.unwrap_or_default(),
            owner: self.owner.unwrap_or_else(|| UNKNOWN.to_string()),
            bank: self.bank.unwrap_or_else(|| UNKNOWN.to_string()),
            payment_url: None,
            status: self.status.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_response_normalized() {
        let resp: GreengoResponse = serde_json::from_str(
            r#"{"success":true,"order_id":"gg-1","requisite":"2200123412341234","owner":"Ivan I.","bank":"Tinkoff"}"#,
        )
        .unwrap();
        let data = resp.into_result("p1", Some(200)).unwrap();
        assert_eq!(data.id, "gg-1");
        assert_eq!(data.requisite, "2200123412341234");
        assert_eq!(data.owner, "Ivan I.");
        assert_eq!(data.bank, "Tinkoff");
    }

    #[test]
    fn test_missing_fields_default() {
        let resp: GreengoResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        let data = resp.into_result("p1", None).unwrap();
        assert_eq!(data.id, "p1");
        assert_eq!(data.owner, UNKNOWN);
        assert_eq!(data.bank, UNKNOWN);
    }

    #[test]
    fn test_failure_message() {
        let resp: GreengoResponse =
            serde_json::from_str(r#"{"success":false,"message":"direction disabled"}"#).unwrap();
        let err = resp.into_result("p1", Some(422)).unwrap_err();
        assert_eq!(err.to_string(), "direction disabled");
    }

    #[test]
    fn test_order_ids_body() {
        let body = OrderIdsBody { order_id: vec!["a".into()] };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"order_id":["a"]}"#);
    }
}
