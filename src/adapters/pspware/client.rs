//! PSPWare API Client
//!
//! Merchant API v2, authenticated with an `X-API-KEY` header.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;

use crate::adapters::http::{build_client, decode_json, DEFAULT_TIMEOUT};
use crate::ports::payment::{
    CreateOrderRequest, OrderData, PaymentProvider, PaymentState, ProviderError, ProviderResult,
};
use super::types::{
    CreateOrderBody, HealthBody, MerchantInfo, MessageBody, PspOrder, Withdrawal, WithdrawalBody,
    STATUS_ACCEPTED,
};

/// PSPWare client configuration
#[derive(Debug, Clone)]
pub struct PspWareConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub merchant_id: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for PspWareConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.pspware.space/merchant/v2".to_string(),
            api_key: String::new(),
            merchant_id: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PspWareClient {
    config: PspWareConfig,
    http: Client,
}

impl PspWareClient {
    pub fn with_config(config: PspWareConfig) -> Result<Self, ProviderError> {
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    pub fn create_body(&self, request: &CreateOrderRequest) -> CreateOrderBody {
        CreateOrderBody::new(
            request.side,
            request.amount,
            &request.payment_type,
            &self.config.merchant_id,
            &request.correlation_id,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn rejected(status: StatusCode, order: &PspOrder) -> ProviderError {
        ProviderError::Rejected {
            status: Some(status.as_u16()),
            message: order.error_message(),
        }
    }

    /// Merchant balance and fee schedule
    pub async fn merchant_info(&self) -> Result<MerchantInfo, ProviderError> {
        let response = self
            .http
            .get(self.url("/merchant/me"))
            .header("X-API-KEY", &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let (_, body): (_, PspOrder) = decode_json(response).await?;
            return Err(Self::rejected(status, &body));
        }

        let (_, info) = decode_json(response).await?;
        Ok(info)
    }

    /// Request a payout of merchant balance (RUB) to `address`
    pub async fn withdrawal(&self, address: &str, sum: Decimal) -> Result<Withdrawal, ProviderError> {
        if address.trim().is_empty() {
            return Err(ProviderError::Rejected {
                status: None,
                message: "Withdrawal address is empty".to_string(),
            });
        }
        if sum <= Decimal::ZERO {
            return Err(ProviderError::Rejected {
                status: None,
                message: format!("Withdrawal sum must be positive, got {}", sum),
            });
        }

        let body = WithdrawalBody {
            address: address.trim().to_string(),
            sum,
        };
        tracing::info!("PSPWare withdrawal: {} RUB to {}", body.sum, body.address);

        let response = self
            .http
            .post(self.url("/withdrawal"))
            .header("X-API-KEY", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let (_, body): (_, MessageBody) = decode_json(response).await?;
            tracing::error!("PSPWare withdrawal failed: HTTP {}", status);
            return Err(ProviderError::Rejected {
                status: Some(status.as_u16()),
                message: body.error_message(),
            });
        }

        let (_, withdrawal) = decode_json(response).await?;
        Ok(withdrawal)
    }
}

#[async_trait]
impl PaymentProvider for PspWareClient {
    async fn create_order(&self, request: &CreateOrderRequest) -> ProviderResult {
        let body = self.create_body(request);
        tracing::info!(
            "PSPWare create_order: {} {} {} ({})",
            body.order_type,
            body.sum,
            body.currency,
            body.order_id
        );

        let response = self
            .http
            .post(self.url("/orders"))
            .header("X-API-KEY", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let (status, order): (_, PspOrder) = decode_json(response).await?;

        if status == StatusCode::OK && order.is_success_status() {
            return Ok(order.into_order_data(&request.correlation_id));
        }

        tracing::error!("PSPWare failed to create order {}: HTTP {}", request.correlation_id, status);
        Err(Self::rejected(status, &order))
    }

    async fn get_status(&self, order_ref: &str) -> ProviderResult {
        let response = self
            .http
            .get(self.url(&format!("/orders/{}", order_ref)))
            .header("X-API-KEY", &self.config.api_key)
            .send()
            .await?;

        let (status, order): (_, PspOrder) = decode_json(response).await?;

        if status == StatusCode::OK {
            return Ok(order.into_order_data(order_ref));
        }

        Err(Self::rejected(status, &order))
    }

    async fn cancel(&self, order_ref: &str) -> ProviderResult {
        let response = self
            .http
            .post(self.url(&format!("/orders/{}/cancel", order_ref)))
            .header("X-API-KEY", &self.config.api_key)
            .send()
            .await?;

        let (status, order): (_, PspOrder) = decode_json(response).await?;

        if status == StatusCode::OK && order.is_success_status() {
            return Ok(OrderData::with_status(order_ref, "canceled"));
        }

        Err(Self::rejected(status, &order))
    }

    async fn health_check(&self) -> ProviderResult {
        let response = self
            .http
            .get(self.url("/health"))
            .header("X-API-KEY", &self.config.api_key)
            .send()
            .await?;

        let (status, body): (_, HealthBody) = decode_json(response).await?;

        if status == StatusCode::OK && body.status.as_deref() == Some("ok") {
            return Ok(OrderData::with_status("", "ok"));
        }

        Err(ProviderError::Rejected {
            status: Some(status.as_u16()),
            message: body.message.unwrap_or_else(|| "Service unhealthy".to_string()),
        })
    }

    /// Create and lookup return the same order object, so an accepted order
    /// still reads `success` until the client pays
    fn payment_state(&self, status: &str) -> PaymentState {
        if status.trim().eq_ignore_ascii_case(STATUS_ACCEPTED) {
            return PaymentState::Pending;
        }
        PaymentState::parse(status)
    }
}
