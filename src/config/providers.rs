//! Provider wiring
//!
//! Turns `[[providers]]` sections into adapter clients and the fallback registry.

use std::sync::Arc;
use std::time::Duration;

use super::loader::{Config, ConfigError, ProviderKind, ProviderSection};
use crate::adapters::greengo::{GreengoClient, GreengoConfig};
use crate::adapters::nicepay::{NicePayClient, NicePayConfig};
use crate::adapters::pspware::{PspWareClient, PspWareConfig};
use crate::application::{PaymentApiManager, ProviderRegistration};
use crate::ports::payment::PaymentProvider;

fn required(section: &ProviderSection, value: Option<String>, name: &str) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingSecret {
        provider: section.name.clone(),
        name: name.to_string(),
    })
}

pub fn nicepay_config(section: &ProviderSection, timeout: Duration) -> Result<NicePayConfig, ConfigError> {
    let defaults = NicePayConfig::default();
    Ok(NicePayConfig {
        api_base_url: section.base_url.clone().unwrap_or(defaults.api_base_url),
        merchant_key: required(section, section.get_merchant_key(), "NICEPAY_MERCHANT_KEY")?,
        merchant_token_key: required(
            section,
            section.get_merchant_token_key(),
            "NICEPAY_MERCHANT_TOKEN_KEY",
        )?,
        currency: section.currency.clone().unwrap_or(defaults.currency),
        timeout,
    })
}

pub fn greengo_config(section: &ProviderSection, timeout: Duration) -> Result<GreengoConfig, ConfigError> {
    let defaults = GreengoConfig::default();
    Ok(GreengoConfig {
        api_base_url: section.base_url.clone().unwrap_or(defaults.api_base_url),
        api_secret: required(section, section.get_api_secret(), "GREENGO_API_SECRET")?,
        timeout,
    })
}

pub fn pspware_config(section: &ProviderSection, timeout: Duration) -> Result<PspWareConfig, ConfigError> {
    let defaults = PspWareConfig::default();
    Ok(PspWareConfig {
        api_base_url: section.base_url.clone().unwrap_or(defaults.api_base_url),
        api_key: required(section, section.get_api_key(), "PSPWARE_API_KEY")?,
        merchant_id: required(section, section.get_merchant_id(), "PSPWARE_MERCHANT_ID")?,
        timeout,
    })
}

/// Build the adapter for one provider section
pub fn build_provider(
    section: &ProviderSection,
    timeout: Duration,
) -> Result<Arc<dyn PaymentProvider>, ConfigError> {
    let client_error = |e: crate::ports::ProviderError| {
        ConfigError::ValidationError(format!("{}: {}", section.name, e))
    };

    let provider: Arc<dyn PaymentProvider> = match section.kind {
        ProviderKind::NicePay => Arc::new(
            NicePayClient::with_config(nicepay_config(section, timeout)?).map_err(client_error)?,
        ),
        ProviderKind::Greengo => Arc::new(
            GreengoClient::with_config(greengo_config(section, timeout)?).map_err(client_error)?,
        ),
        ProviderKind::PspWare => Arc::new(
            PspWareClient::with_config(pspware_config(section, timeout)?).map_err(client_error)?,
        ),
    };
    Ok(provider)
}

/// Registry of every enabled provider in configured order
pub fn build_api_manager(config: &Config) -> Result<PaymentApiManager, ConfigError> {
    let timeout = config.http.timeout();
    let mut registrations = Vec::new();

    for section in config.enabled_providers() {
        let client = build_provider(section, timeout)?;
        registrations.push(
            ProviderRegistration::new(section.name.clone(), client)
                .with_pay_type_mapping(section.pay_type_mapping.clone())
                .sell_capable(section.sell_capable)
                .buy_capable(section.buy_capable),
        );
    }

    PaymentApiManager::new(registrations).map_err(|e| ConfigError::ValidationError(e.to_string()))
}

/// First enabled PSPWare section, for merchant account queries
pub fn find_pspware(config: &Config) -> Result<PspWareClient, ConfigError> {
    let section = config
        .enabled_providers()
        .find(|p| p.kind == ProviderKind::PspWare)
        .ok_or_else(|| ConfigError::ValidationError("no pspware provider configured".to_string()))?;

    PspWareClient::with_config(pspware_config(section, config.http.timeout())?)
        .map_err(|e| ConfigError::ValidationError(format!("{}: {}", section.name, e)))
}
