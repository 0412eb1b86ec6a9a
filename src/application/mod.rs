//! Application Layer - Use cases wiring ports together
//!
//! - `api_manager`: ordered provider registry with fallback
//! - `lifecycle`: order state machine driver, webhook and operator entry points
//! - `intake`: validates and places new exchange orders
//! - `poller`: periodic status polling and payment timeouts

pub mod api_manager;
pub mod lifecycle;
pub mod intake;
pub mod poller;

pub use api_manager::{PaymentApiManager, ProviderRegistration, RegistryError};
pub use lifecycle::{LifecycleError, LifecycleTracker, OperatorAction, Outcome, WebhookPayload};
pub use intake::{AmountLimits, ExchangeRequest, IntakeError, OrderIntake};
pub use poller::{PollSummary, PollerError, StatusPoller, TIMEOUT_REASON};
