//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Payment processors (order create/status/cancel/health)
//! - Order persistence
//! - Client, operator and admin notifications

pub mod payment;
pub mod store;
pub mod notifier;
pub mod mocks;

pub use payment::{
    CreateOrderRequest, OrderData, OrderSide, PaymentProvider, PaymentState, ProviderError,
    ProviderErrorKind, ProviderResponse, ProviderResult,
};
pub use store::{OrderStore, RosterStore, StoreError};
pub use notifier::{Notification, Notifier, NotifyError, NotifyTarget};
