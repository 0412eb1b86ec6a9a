//! Payment API Manager
//!
//! Ordered provider registry with first-success-wins fallback for order
//! creation and direct routing for status, cancel and health checks.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::ports::payment::{
    CreateOrderRequest, OrderSide, PaymentProvider, PaymentState, ProviderError,
    ProviderResponse,
};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Provider {0} is already registered")]
    DuplicateProvider(String),
    #[error("Provider name cannot be empty")]
    EmptyName,
}

/// A provider together with its routing settings
#[derive(Clone)]
pub struct ProviderRegistration {
    pub name: String,
    pub client: Arc<dyn PaymentProvider>,
    /// Canonical payment type -> provider payment type
    pub pay_type_mapping: HashMap<String, String>,
    /// Whether the provider handles sell-side (pay-out) orders
    pub sell_capable: bool,
    /// Cleared for sell-only providers
    pub buy_capable: bool,
}

impl ProviderRegistration {
    pub fn new(name: impl Into<String>, client: Arc<dyn PaymentProvider>) -> Self {
        Self {
            name: name.into(),
            client,
            pay_type_mapping: HashMap::new(),
            sell_capable: false,
            buy_capable: true,
        }
    }

    pub fn with_mapping(mut self, canonical: &str, provider_specific: &str) -> Self {
        self.pay_type_mapping
            .insert(canonical.to_string(), provider_specific.to_string());
        self
    }

    pub fn with_pay_type_mapping(mut self, mapping: HashMap<String, String>) -> Self {
        self.pay_type_mapping = mapping;
        self
    }

    pub fn sell_capable(mut self, sell_capable: bool) -> Self {
        self.sell_capable = sell_capable;
        self
    }

    pub fn buy_capable(mut self, buy_capable: bool) -> Self {
        self.buy_capable = buy_capable;
        self
    }

    fn accepts(&self, side: OrderSide) -> bool {
        match side {
            OrderSide::Buy => self.buy_capable,
            OrderSide::Sell => self.sell_capable,
        }
    }

    /// Identity when the payment type has no mapping
    pub fn map_pay_type<'a>(&'a self, payment_type: &'a str) -> &'a str {
        self.pay_type_mapping
            .get(payment_type)
            .map(String::as_str)
            .unwrap_or(payment_type)
    }
}

impl std::fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("name", &self.name)
            .field("pay_type_mapping", &self.pay_type_mapping)
            .field("sell_capable", &self.sell_capable)
            .field("buy_capable", &self.buy_capable)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct PaymentApiManager {
    providers: Vec<ProviderRegistration>,
}

impl PaymentApiManager {
    pub fn new(providers: Vec<ProviderRegistration>) -> Result<Self, RegistryError> {
        let mut manager = Self::default();
        for provider in providers {
            manager.register(provider)?;
        }
        Ok(manager)
    }

    /// Append a provider at the end of the fallback chain
    pub fn register(&mut self, provider: ProviderRegistration) -> Result<(), RegistryError> {
        if provider.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.providers.iter().any(|p| p.name == provider.name) {
            return Err(RegistryError::DuplicateProvider(provider.name));
        }
        tracing::info!(
            "Registered payment provider {} (sell: {}, mappings: {})",
            provider.name,
            provider.sell_capable,
            provider.pay_type_mapping.len()
        );
        self.providers.push(provider);
        Ok(())
    }

    /// Provider names in fallback order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ProviderRegistration> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Walk the chain until a provider accepts the order
    pub async fn create_order(
        &self,
        amount: i64,
        payment_type: &str,
        correlation_id: &str,
        is_sell_order: bool,
    ) -> ProviderResponse {
        let side = if is_sell_order { OrderSide::Sell } else { OrderSide::Buy };

        for provider in &self.providers {
            if !provider.accepts(side) {
                tracing::debug!(
                    "Skipping {} for {:?} order {}",
                    provider.name,
                    side,
                    correlation_id
                );
                continue;
            }

            let request = CreateOrderRequest {
                amount,
                payment_type: provider.map_pay_type(payment_type).to_string(),
                correlation_id: correlation_id.to_string(),
                side,
            };

            match provider.client.create_order(&request).await {
                Ok(data) => {
                    tracing::info!(
                        "Order {} placed with {} (provider id {})",
                        correlation_id,
                        provider.name,
                        data.id
                    );
                    return ProviderResponse::ok(data, provider.name.clone());
                }
                Err(e) => {
                    tracing::warn!(
                        "{} could not create order {}: {}",
                        provider.name,
                        correlation_id,
                        e
                    );
                }
            }
        }

        tracing::error!("All payment providers failed for order {}", correlation_id);
        ProviderResponse::exhausted()
    }

    pub async fn get_status(&self, order_ref: &str, provider_name: &str) -> ProviderResponse {
        let Some(provider) = self.get(provider_name) else {
            return Self::unknown_provider(provider_name);
        };

        let result = provider.client.get_status(order_ref).await;
        if let Err(e) = &result {
            tracing::error!("Status check for {} via {} failed: {}", order_ref, provider_name, e);
        }
        ProviderResponse::from_result(result, provider_name)
    }

    pub async fn cancel(&self, order_ref: &str, provider_name: &str) -> ProviderResponse {
        let Some(provider) = self.get(provider_name) else {
            return Self::unknown_provider(provider_name);
        };

        let result = provider.client.cancel(order_ref).await;
        if let Err(e) = &result {
            tracing::error!("Cancel of {} via {} failed: {}", order_ref, provider_name, e);
        }
        ProviderResponse::from_result(result, provider_name)
    }

    /// One entry per registered provider, whatever each check returns
    pub async fn health_check(&self) -> HashMap<String, ProviderResponse> {
        let mut results = HashMap::with_capacity(self.providers.len());
        for provider in &self.providers {
            let result = provider.client.health_check().await;
            if let Err(e) = &result {
                tracing::warn!("Health check for {} failed: {}", provider.name, e);
            }
            results.insert(
                provider.name.clone(),
                ProviderResponse::from_result(result, &provider.name),
            );
        }
        results
    }

    /// Read a status with the vocabulary of the provider that returned it
    pub fn payment_state(&self, provider_name: &str, status: &str) -> PaymentState {
        match self.get(provider_name) {
            Some(provider) => provider.client.payment_state(status),
            None => PaymentState::parse(status),
        }
    }

    fn unknown_provider(name: &str) -> ProviderResponse {
        tracing::error!("Unknown payment provider requested: {}", name);
        ProviderResponse::failure(&ProviderError::NotFound(name.to_string()), None)
    }
}
