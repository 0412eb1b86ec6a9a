//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - NicePay, Greengo, PSPWare: payment processor API clients
//! - Storage: in-memory and JSON file order stores
//! - Notify: Telegram Bot API and log-only notifiers
//! - CLI: Command-line interface handlers

pub mod http;
pub mod nicepay;
pub mod greengo;
pub mod pspware;
pub mod storage;
pub mod notify;
pub mod cli;

pub use nicepay::NicePayClient;
pub use greengo::GreengoClient;
pub use pspware::PspWareClient;
pub use storage::{JsonOrderStore, MemoryOrderStore};
pub use notify::{LogNotifier, TelegramNotifier};
pub use cli::CliApp;
