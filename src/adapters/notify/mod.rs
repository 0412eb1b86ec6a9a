//! Notifier adapters

mod log_only;
mod telegram;

pub use log_only::LogNotifier;
pub use telegram::{TelegramConfig, TelegramNotifier};
