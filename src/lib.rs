//! oswbit - Fiat-to-Bitcoin Exchange Library
//!
//! Multi-provider payment fallback and an operator-driven order lifecycle.
//!
//! # Modules
//!
//! - `domain`: Core business logic (Order state machine, OperatorRoster)
//! - `ports`: Trait abstractions (PaymentProvider, OrderStore, Notifier)
//! - `adapters`: External implementations (NicePay, Greengo, PSPWare, Telegram, storage, CLI)
//! - `config`: Configuration loading, validation and provider wiring
//! - `application`: API manager, lifecycle tracker, intake and status poller

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
