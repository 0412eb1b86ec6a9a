//! Configuration Module
//!
//! Loads and validates configuration from TOML files, then wires providers.

pub mod loader;
pub mod providers;

pub use loader::{
    Config, ConfigError, ProviderKind, ProviderSection, load_config,
};
pub use providers::{build_api_manager, build_provider, find_pspware};
