//! Greengo API Client
//!
//! Exchange API v2, authenticated with a static `Api-Secret` header.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::adapters::http::{build_client, decode_json, DEFAULT_TIMEOUT};
use crate::ports::payment::{
    CreateOrderRequest, OrderData, PaymentProvider, ProviderError, ProviderResult,
};
use super::types::{CreateOrderBody, GreengoResponse, OrderIdsBody};

/// Greengo client configuration
#[derive(Debug, Clone)]
pub struct GreengoConfig {
    pub api_base_url: String,
    pub api_secret: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for GreengoConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.greengo.cc/api/v2".to_string(),
            api_secret: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GreengoClient {
    config: GreengoConfig,
    http: Client,
}

impl GreengoClient {
    pub fn with_config(config: GreengoConfig) -> Result<Self, ProviderError> {
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    pub fn create_body(request: &CreateOrderRequest) -> CreateOrderBody {
        CreateOrderBody {
            payment_method: request.payment_type.clone(),
            wallet: String::new(),
            from_amount: request.amount.to_string(),
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
            .header("Api-Secret", &self.config.api_secret)
            .json(body)
            .send()
            .await?;

        let (status, parsed): (_, GreengoResponse) = decode_json(response).await?;
        tracing::debug!("Greengo {} -> HTTP {}", path, status);

        parsed.into_result(fallback_id, Some(status.as_u16()))
    }
}

#[async_trait]
impl PaymentProvider for GreengoClient {
    async fn create_order(&self, request: &CreateOrderRequest) -> ProviderResult {
        let body = Self::create_body(request);
        self.post("/order/create", &body, &request.correlation_id).await
    }

    async fn get_status(&self, order_ref: &str) -> ProviderResult {
        let body = OrderIdsBody { order_id: vec![order_ref.to_string()] };
        self.post("/order/check", &body, order_ref).await
    }

    async fn cancel(&self, order_ref: &str) -> ProviderResult {
        let body = OrderIdsBody { order_id: vec![order_ref.to_string()] };
        self.post("/order/cancel", &body, order_ref).await
    }

    /// The directions listing doubles as a liveness probe
    async fn health_check(&self) -> ProviderResult {
        let url = format!("{}/directions", self.config.api_base_url);

        let response = self
            .http
            .get(&url)
            .header("Api-Secret", &self.config.api_secret)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: Some(status.as_u16()),
                message: format!("directions endpoint returned {}", status),
            });
        }

        let (_, _directions): (_, serde_json::Value) = decode_json(response).await?;
        Ok(OrderData::with_status("", "ok"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::payment::OrderSide;

    #[test]
    fn test_greengo_config_default() {
        let config = GreengoConfig::default();
        assert_eq!(config.api_base_url, "https://api.greengo.cc/api/v2");
        assert!(config.api_secret.is_empty());
    }

    #[test]
    fn test_create_body() {
        let req = CreateOrderRequest {
            amount: 5000,
            payment_type: "card_rub".to_string(),
            correlation_id: "p1".to_string(),
            side: OrderSide::Buy,
        };
        let body = GreengoClient::create_body(&req);
        assert_eq!(body.payment_method, "card_rub");
        assert_eq!(body.from_amount, "5000");
        assert!(body.wallet.is_empty());
    }

    #[test]
    fn test_client_creation() {
        assert!(GreengoClient::with_config(GreengoConfig::default()).is_ok());
    }
}
