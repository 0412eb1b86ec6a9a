//! NicePay wire types

use serde::{Deserialize, Serialize};

use crate::ports::payment::{OrderData, ProviderError, ProviderResult};

/// Result code NicePay uses for an accepted request
pub const RESULT_CODE_OK: &str = "0000";

/// Body of `/payment/request`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub merchant_key: String,
    pub merchant_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub payment_method: String,
    /// Unix milliseconds
    pub timestamp: i64,
    pub description: String,
    pub merchant_token: String,
}

/// Body of `/payment/status` and `/payment/cancel`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLookup {
    pub merchant_key: String,
    pub merchant_order_id: String,
    pub timestamp: i64,
    pub merchant_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicePayData {
    #[serde(default)]
    pub merchant_order_id: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// NicePay puts fields either at the top level or under `data`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicePayResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub result_code: Option<String>,
    #[serde(default)]
    pub result_desc: Option<String>,
    #[serde(default)]
    pub merchant_order_id: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<NicePayData>,
}

impl NicePayResponse {
    pub fn is_success(&self) -> bool {
        self.success == Some(true) || self.result_code.as_deref() == Some(RESULT_CODE_OK)
    }

    /// Normalize into the canonical payload. `fallback_id` is the merchant order id we sent.
    pub fn into_result(self, fallback_id: &str, http_status: Option<u16>) -> ProviderResult {
        if !self.is_success() {
            let message = self
                .error
                .or(self.result_desc)
                .or_else(|| self.result_code.map(|c| format!("result code {}", c)))
                .unwrap_or_else(|| "no description".to_string());
            return Err(ProviderError::Rejected {
                status: http_status,
                message,
            });
        }

        let data = self.data.unwrap_or_default();
        let id = self
            .merchant_order_id
            .or(data.merchant_order_id)
            .unwrap_or_else(|| fallback_id.to_string());
        let payment_url = self.payment_url.or(data.payment_url);
        let status = self
            .status
            .or(data.status)
            .or(self.result_code)
            .unwrap_or_default();

        Ok(OrderData {
            id,
            payment_url,
            status,
            ..Default::default()
        })
    }
}
