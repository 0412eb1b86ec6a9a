//! oswbit - Fiat-to-Bitcoin exchange back end
//!
//! Places client payments with a chain of payment providers and drives the
//! resulting orders until an operator confirms the Bitcoin payout.

use anyhow::Result;
use clap::Parser;

use oswbit::adapters::cli::{self, CliApp};
use oswbit::config::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    // Commands report a broken config themselves; here it only picks the log level
    let configured_level = load_config(&app.config).ok().map(|c| c.logging.level);
    cli::init_logging(app.verbose, app.debug, configured_level.as_deref())?;

    cli::execute(app).await
}
