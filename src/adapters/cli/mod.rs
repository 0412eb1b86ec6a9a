//! CLI Adapter
//!
//! Command-line interface for the oswbit exchange back end.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    execute, init_logging, CliApp, Command, CreateOrderCmd, MerchantActionCmd, MerchantCmd,
    OperatorActionCmd, OperatorCmd, OperatorsActionCmd, OperatorsCmd, PollCmd, StatusCmd,
    WebhookCmd,
};
