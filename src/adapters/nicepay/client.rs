//! NicePay API Client
//!
//! Merchant API v2. Every request body is signed with a merchant token.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::adapters::http::{build_client, decode_json, DEFAULT_TIMEOUT};
use crate::ports::payment::{
    CreateOrderRequest, PaymentProvider, ProviderError, ProviderResult,
};
use super::signature::merchant_token;
use super::types::{NicePayResponse, PaymentLookup, PaymentRequest};

/// NicePay client configuration
#[derive(Debug, Clone)]
pub struct NicePayConfig {
    /// Base URL for the merchant API
    pub api_base_url: String,
    pub merchant_key: String,
    /// Secret mixed into the merchant token
    pub merchant_token_key: String,
    pub currency: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for NicePayConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.nicepay.io/v2/merchant".to_string(),
            merchant_key: String::new(),
            merchant_token_key: String::new(),
            currency: "IDR".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NicePayClient {
    config: NicePayConfig,
    http: Client,
}

impl NicePayClient {
    pub fn with_config(config: NicePayConfig) -> Result<Self, ProviderError> {
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    fn timestamp() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Signed body for `/payment/request`
    pub fn payment_request(&self, request: &CreateOrderRequest, timestamp: i64) -> PaymentRequest {
        PaymentRequest {
            merchant_key: self.config.merchant_key.clone(),
            merchant_order_id: request.correlation_id.clone(),
            amount: request.amount,
            currency: self.config.currency.clone(),
            payment_method: request.payment_type.clone(),
            timestamp,
            description: String::new(),
            merchant_token: merchant_token(
                &self.config.merchant_key,
                &request.correlation_id,
                Some(request.amount),
                &self.config.merchant_token_key,
            ),
        }
    }

    /// Signed body for status and cancel lookups
    pub fn lookup(&self, merchant_order_id: &str, timestamp: i64) -> PaymentLookup {
        PaymentLookup {
            merchant_key: self.config.merchant_key.clone(),
            merchant_order_id: merchant_order_id.to_string(),
            timestamp,
            merchant_token: merchant_token(
                &self.config.merchant_key,
                merchant_order_id,
                None,
                &self.config.merchant_token_key,
            ),
        }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        fallback_id: &str,
    ) -> ProviderResult {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let (status, parsed): (_, NicePayResponse) = decode_json(response).await?;
        tracing::debug!("NicePay {} -> HTTP {}", path, status);

        parsed.into_result(fallback_id, Some(status.as_u16()))
    }

    /// Get the configured API base URL
    pub fn api_base_url(&self) -> &str {
        &self.config.api_base_url
    }
}

#[async_trait]
impl PaymentProvider for NicePayClient {
    async fn create_order(&self, request: &CreateOrderRequest) -> ProviderResult {
        let body = self.payment_request(request, Self::timestamp());
        self.post("/payment/request", &body, &request.correlation_id).await
    }

    async fn get_status(&self, order_ref: &str) -> ProviderResult {
        let body = self.lookup(order_ref, Self::timestamp());
        self.post("/payment/status", &body, order_ref).await
    }

    async fn cancel(&self, order_ref: &str) -> ProviderResult {
        let body = self.lookup(order_ref, Self::timestamp());
        self.post("/payment/cancel", &body, order_ref).await
    }

    async fn health_check(&self) -> ProviderResult {
        Err(ProviderError::Unsupported(
            "NicePay has no health endpoint".to_string(),
        ))
    }
}
