//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the oswbit exchange back end.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::notify::{LogNotifier, TelegramNotifier};
use crate::adapters::storage::JsonOrderStore;
use crate::application::{
    ExchangeRequest, LifecycleTracker, OperatorAction, OrderIntake, PaymentApiManager,
    StatusPoller, WebhookPayload,
};
use crate::config::{build_api_manager, find_pspware, load_config, Config};
use crate::domain::{Actor, Order, OperatorRoster};
use crate::ports::notifier::Notifier;
use crate::ports::payment::{OrderSide, ProviderResponse};
use crate::ports::store::OrderStore;

/// oswbit - Fiat-to-Bitcoin exchange back end
#[derive(Parser, Debug)]
#[command(
    name = "oswbit",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Fiat-to-Bitcoin exchange back end",
    long_about = "oswbit places client payments with the first available payment provider, \
                  tracks them through webhooks and polling, and lets operators confirm \
                  the Bitcoin payout."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/oswbit.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe every configured payment provider
    Health,

    /// Create an exchange order and place it with a provider
    CreateOrder(CreateOrderCmd),

    /// Ask the provider about an order
    Status(StatusCmd),

    /// Apply a provider webhook payload from a JSON file
    Webhook(WebhookCmd),

    /// Run an operator action on an order
    Operator(OperatorCmd),

    /// Poll providers for open orders and expire stale ones
    Poll(PollCmd),

    /// PSPWare merchant account
    Merchant(MerchantCmd),

    /// Manage the operator roster (administrator only)
    Operators(OperatorsCmd),
}

#[derive(Parser, Debug)]
pub struct CreateOrderCmd {
    /// Client Telegram user id
    #[arg(long, value_name = "ID")]
    pub user_id: i64,

    /// Amount in RUB
    #[arg(long, value_name = "RUB")]
    pub amount: i64,

    /// Canonical payment type (sbp, card, ...)
    #[arg(long, value_name = "TYPE", default_value = "sbp")]
    pub payment_type: String,

    /// Destination Bitcoin address
    #[arg(long, value_name = "ADDRESS")]
    pub btc_address: String,

    /// BTC amount the client receives
    #[arg(long, value_name = "BTC")]
    pub amount_btc: Decimal,

    /// Client sells BTC for fiat (pay-out)
    #[arg(long)]
    pub sell: bool,
}

#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Order id or personal id
    #[arg(value_name = "ORDER")]
    pub order: String,
}

#[derive(Parser, Debug)]
pub struct WebhookCmd {
    /// JSON payload file
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct OperatorCmd {
    /// Operator Telegram user id
    #[arg(long, value_name = "ID")]
    pub user_id: i64,

    /// Chat the action comes from (defaults to the operator chat)
    #[arg(long, value_name = "ID")]
    pub chat_id: Option<i64>,

    /// Operator username, shown in notifications
    #[arg(long, value_name = "NAME")]
    pub username: Option<String>,

    /// Order id or personal id
    #[arg(long, value_name = "ORDER")]
    pub order: String,

    #[command(subcommand)]
    pub action: OperatorActionCmd,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum OperatorActionCmd {
    /// Bitcoin has been sent
    Sent,
    /// Cancel the order
    Cancel {
        #[arg(long, default_value = "cancelled by operator")]
        reason: String,
    },
    /// Flag the order for the administrator
    Problem {
        /// Also move the order to the problem status
        #[arg(long)]
        escalate: bool,
    },
    /// Attach a note
    Note {
        text: String,
    },
    /// Show order details
    Details,
}

impl From<OperatorActionCmd> for OperatorAction {
    fn from(cmd: OperatorActionCmd) -> Self {
        match cmd {
            OperatorActionCmd::Sent => OperatorAction::Sent,
            OperatorActionCmd::Cancel { reason } => OperatorAction::Cancel { reason },
            OperatorActionCmd::Problem { escalate } => OperatorAction::MarkProblem { escalate },
            OperatorActionCmd::Note { text } => OperatorAction::AddNote { text },
            OperatorActionCmd::Details => OperatorAction::Details,
        }
    }
}

#[derive(Parser, Debug)]
pub struct PollCmd {
    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Parser, Debug)]
pub struct MerchantCmd {
    #[command(subcommand)]
    pub action: MerchantActionCmd,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum MerchantActionCmd {
    /// Show balance and hold
    Info,
    /// Withdraw merchant balance to an address
    Withdraw {
        /// Destination address
        #[arg(long, value_name = "ADDRESS")]
        address: String,

        /// Amount in RUB
        #[arg(long, value_name = "RUB")]
        sum: Decimal,
    },
}

#[derive(Parser, Debug)]
pub struct OperatorsCmd {
    /// Administrator Telegram user id
    #[arg(long, value_name = "ID")]
    pub user_id: i64,

    #[command(subcommand)]
    pub action: OperatorsActionCmd,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum OperatorsActionCmd {
    /// Allow a user to handle orders
    Add { id: i64 },
    /// Revoke a user's access
    Remove { id: i64 },
    /// Show the current roster
    List,
}

/// Shared services built from config
struct Services {
    config: Config,
    manager: Arc<PaymentApiManager>,
    store: Arc<JsonOrderStore>,
    notifier: Arc<dyn Notifier>,
}

impl Services {
    fn load(path: &Path) -> Result<Self> {
        let config = load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        let manager = Arc::new(build_api_manager(&config).context("Failed to build providers")?);
        let store = Arc::new(
            JsonOrderStore::open(config.store.expanded_path()).context("Failed to open order store")?,
        );

        let notifier: Arc<dyn Notifier> = match config.telegram_config() {
            Some(telegram) => Arc::new(
                TelegramNotifier::new(telegram).context("Failed to create Telegram notifier")?,
            ),
            None => {
                tracing::warn!("No bot token configured - notifications are only logged");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self {
            config,
            manager,
            store,
            notifier,
        })
    }

    /// Tracker with the saved operator roster, falling back to the configured one
    async fn tracker(&self) -> Result<LifecycleTracker> {
        let tracker = LifecycleTracker::new(
            self.store.clone(),
            self.notifier.clone(),
            OperatorRoster::from(&self.config),
        )
        .with_roster_store(self.store.clone());
        tracker
            .restore_roster()
            .await
            .context("Failed to load operator roster")?;
        Ok(tracker)
    }

    /// Accepts a numeric order id or a personal id
    async fn find_order(&self, reference: &str) -> Result<Order> {
        if let Some(order) = self.store.find_by_personal_id(reference).await? {
            return Ok(order);
        }
        if let Ok(id) = reference.parse::<u64>() {
            if let Some(order) = self.store.get(id).await? {
                return Ok(order);
            }
        }
        anyhow::bail!("Order {} not found", reference)
    }
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    match app.command {
        Command::Health => health_command(&app.config).await,
        Command::CreateOrder(cmd) => create_order_command(&app.config, cmd).await,
        Command::Status(cmd) => status_command(&app.config, cmd).await,
        Command::Webhook(cmd) => webhook_command(&app.config, cmd).await,
        Command::Operator(cmd) => operator_command(&app.config, cmd).await,
        Command::Poll(cmd) => poll_command(&app.config, cmd).await,
        Command::Merchant(cmd) => merchant_command(&app.config, cmd).await,
        Command::Operators(cmd) => operators_command(&app.config, cmd).await,
    }
}

/// Default filter directive: `--debug`, then `--verbose`, then `[logging] level`
pub fn log_level(verbose: bool, debug: bool, configured: Option<&str>) -> String {
    if debug {
        "debug".to_string()
    } else if verbose {
        "info".to_string()
    } else {
        configured.unwrap_or("warn").to_string()
    }
}

/// Initialize logging system. `RUST_LOG` overrides everything.
pub fn init_logging(verbose: bool, debug: bool, configured: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(verbose, debug, configured)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

async fn health_command(config: &Path) -> Result<()> {
    let services = Services::load(config)?;
    let results = services.manager.health_check().await;

    println!("Provider health ({})", services.config.exchange.name);
    for name in services.manager.provider_names() {
        match results.get(name) {
            Some(resp) if resp.success => println!("  {:<12} OK", name),
            Some(resp) => println!(
                "  {:<12} FAIL  {}",
                name,
                resp.error.as_deref().unwrap_or("unknown error")
            ),
            None => println!("  {:<12} -", name),
        }
    }
    Ok(())
}

async fn create_order_command(config: &Path, cmd: CreateOrderCmd) -> Result<()> {
    let services = Services::load(config)?;
    let intake = OrderIntake::new(
        services.manager.clone(),
        services.store.clone(),
        services.notifier.clone(),
        (&services.config).into(),
    );

    let request = ExchangeRequest {
        user_id: cmd.user_id,
        amount: cmd.amount,
        payment_type: cmd.payment_type,
        btc_address: cmd.btc_address,
        amount_btc: cmd.amount_btc,
        side: if cmd.sell { OrderSide::Sell } else { OrderSide::Buy },
    };

    let order = intake.create_exchange_order(request).await?;
    print_order(&order);
    Ok(())
}

async fn status_command(config: &Path, cmd: StatusCmd) -> Result<()> {
    let services = Services::load(config)?;
    let order = services.find_order(&cmd.order).await?;
    print_order(&order);

    let Some(provider) = order.provider_name.as_deref() else {
        println!("\nOrder was never placed with a provider");
        return Ok(());
    };

    let response = services.manager.get_status(order.provider_ref(), provider).await;
    print_response(&response);
    Ok(())
}

async fn webhook_command(config: &Path, cmd: WebhookCmd) -> Result<()> {
    let services = Services::load(config)?;
    let content = std::fs::read_to_string(&cmd.file)
        .with_context(|| format!("Failed to read {}", cmd.file.display()))?;
    let payload: WebhookPayload =
        serde_json::from_str(&content).context("Failed to parse webhook payload")?;

    let outcome = services.tracker().await?.handle_webhook(&payload).await?;
    if let Some(t) = outcome.transition {
        println!("Order {}: {} -> {}", outcome.order.personal_id, t.from, t.to);
    }
    Ok(())
}

async fn operator_command(config: &Path, cmd: OperatorCmd) -> Result<()> {
    let services = Services::load(config)?;
    let order = services.find_order(&cmd.order).await?;

    let chat_id = cmd
        .chat_id
        .unwrap_or(services.config.operators.operator_chat_id);
    let mut actor = Actor::new(cmd.user_id, chat_id);
    if let Some(username) = cmd.username {
        actor = actor.with_username(username);
    }

    let outcome = services
        .tracker()
        .await?
        .apply_operator_action(&actor, order.id, cmd.action.into())
        .await?;

    print_order(&outcome.order);
    if let Some(t) = outcome.transition {
        println!("\nStatus: {} -> {}", t.from, t.to);
    }
    Ok(())
}

async fn poll_command(config: &Path, cmd: PollCmd) -> Result<()> {
    let services = Services::load(config)?;
    let tracker = Arc::new(services.tracker().await?);
    let poller = Arc::new(
        StatusPoller::new(services.manager.clone(), tracker)
            .with_poll_interval(services.config.poll_interval())
            .with_payment_timeout(services.config.payment_timeout()),
    );

    if cmd.once {
        let summary = poller.tick().await?;
        println!(
            "Checked {} | paid {} | cancelled {} | expired {} | errors {}",
            summary.checked, summary.paid, summary.cancelled, summary.expired, summary.errors
        );
        return Ok(());
    }

    // Setup Ctrl+C handler
    let stopper = poller.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        stopper.stop().await;
    });

    poller.run().await?;
    Ok(())
}

async fn merchant_command(config: &Path, cmd: MerchantCmd) -> Result<()> {
    let config = load_config(config).context("Failed to load configuration")?;
    let client = find_pspware(&config)?;

    match cmd.action {
        MerchantActionCmd::Info => {
            let info = client.merchant_info().await.context("Failed to fetch merchant info")?;
            println!("Merchant: {}", info.name.as_deref().unwrap_or("-"));
            if let Some(balance) = info.balance {
                println!("Balance: {} RUB", balance);
            }
            if let Some(hold) = info.hold_balance {
                println!("On hold: {} RUB", hold);
            }
        }
        MerchantActionCmd::Withdraw { address, sum } => {
            let withdrawal = client
                .withdrawal(&address, sum)
                .await
                .context("Withdrawal failed")?;
            let id = withdrawal.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
            println!("Withdrawal {}", id);
            println!("  Address: {}", withdrawal.address.as_deref().unwrap_or(&address));
            println!("  Sum:     {} RUB", withdrawal.sum.unwrap_or(sum));
            println!("  Status:  {}", withdrawal.status.as_deref().unwrap_or("-"));
            if let Some(created) = withdrawal.created_at {
                println!("  Created: {}", created);
            }
        }
    }
    Ok(())
}

async fn operators_command(config: &Path, cmd: OperatorsCmd) -> Result<()> {
    let services = Services::load(config)?;
    let tracker = services.tracker().await?;
    let admin = Actor::new(cmd.user_id, cmd.user_id);

    match cmd.action {
        OperatorsActionCmd::Add { id } => {
            if tracker.add_operator(&admin, id).await? {
                println!("Operator {} added", id);
            } else {
                println!("User {} is already an operator", id);
            }
        }
        OperatorsActionCmd::Remove { id } => {
            if tracker.remove_operator(&admin, id).await? {
                println!("Operator {} removed", id);
            } else {
                println!("User {} is not a removable operator", id);
            }
        }
        OperatorsActionCmd::List => {
            let admin_id = services.config.operators.admin_id;
            for id in tracker.list_operators(&admin).await? {
                let role = if id == admin_id { " (admin)" } else { "" };
                println!("  {}{}", id, role);
            }
        }
    }
    Ok(())
}

fn print_order(order: &Order) {
    println!("Order #{} (id {})", order.personal_id, order.id);
    println!("  Status:   {}{}", order.status, if order.problem { " [problem]" } else { "" });
    println!("  Amount:   {} RUB -> {} BTC", order.amount, order.amount_btc);
    println!("  Payment:  {}", order.payment_type);
    println!("  Address:  {}", order.btc_address);
    if let Some(provider) = &order.provider_name {
        println!("  Provider: {} ({})", provider, order.provider_ref());
    }
    if let Some(requisites) = &order.requisites {
        println!("  Pay to:   {}", requisites);
    }
    if let Some(reason) = &order.cancel_reason {
        println!("  Reason:   {}", reason);
    }
    for note in &order.operator_notes {
        println!("  Note ({}): {}", note.author, note.text);
    }
}

fn print_response(response: &ProviderResponse) {
    let provider = response.provider_name.as_deref().unwrap_or("-");
    match &response.data {
        Some(data) if response.success => {
            println!("\n{} reports: {}", provider, data.status);
        }
        _ => println!(
            "\n{} error: {}",
            provider,
            response.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_precedence() {
        assert_eq!(log_level(false, false, None), "warn");
        assert_eq!(log_level(false, false, Some("info")), "info");
        assert_eq!(log_level(true, false, Some("error")), "info");
        assert_eq!(log_level(true, true, Some("error")), "debug");
    }

    #[test]
    fn test_cli_app_parse_health() {
        let app = CliApp::try_parse_from(["oswbit", "health"]).unwrap();
        assert!(matches!(app.command, Command::Health));
        assert_eq!(app.config, PathBuf::from("config/oswbit.toml"));
        assert!(!app.verbose);
    }

    #[test]
    fn test_cli_app_parse_create_order() {
        let app = CliApp::try_parse_from([
            "oswbit",
            "create-order",
            "--user-id",
            "555",
            "--amount",
            "5000",
            "--btc-address",
            "bc1qaddr",
            "--amount-btc",
            "0.0005",
            "-c",
            "custom.toml",
        ])
        .unwrap();

        assert_eq!(app.config, PathBuf::from("custom.toml"));
        match app.command {
            Command::CreateOrder(cmd) => {
                assert_eq!(cmd.amount, 5000);
                assert_eq!(cmd.payment_type, "sbp");
                assert_eq!(cmd.amount_btc, Decimal::new(5, 4));
                assert!(!cmd.sell);
            }
            _ => panic!("Expected CreateOrder command"),
        }
    }

    #[test]
    fn test_cli_app_parse_create_order_missing_amount() {
        let result = CliApp::try_parse_from([
            "oswbit",
            "create-order",
            "--user-id",
            "555",
            "--btc-address",
            "bc1q",
            "--amount-btc",
            "0.1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_app_parse_webhook() {
        let app = CliApp::try_parse_from(["oswbit", "webhook", "--file", "hook.json"]).unwrap();
        match app.command {
            Command::Webhook(cmd) => assert_eq!(cmd.file, PathBuf::from("hook.json")),
            _ => panic!("Expected Webhook command"),
        }
    }

    #[test]
    fn test_cli_app_parse_operator_actions() {
        let app = CliApp::try_parse_from([
            "oswbit", "operator", "--user-id", "2", "--order", "2610190001", "cancel", "--reason",
            "client left",
        ])
        .unwrap();
        match app.command {
            Command::Operator(cmd) => {
                assert_eq!(cmd.order, "2610190001");
                assert!(cmd.chat_id.is_none());
                assert_eq!(
                    OperatorAction::from(cmd.action),
                    OperatorAction::Cancel { reason: "client left".to_string() }
                );
            }
            _ => panic!("Expected Operator command"),
        }

        let app = CliApp::try_parse_from([
            "oswbit", "operator", "--user-id", "2", "--order", "7", "problem", "--escalate",
        ])
        .unwrap();
        match app.command {
            Command::Operator(cmd) => assert_eq!(
                OperatorAction::from(cmd.action),
                OperatorAction::MarkProblem { escalate: true }
            ),
            _ => panic!("Expected Operator command"),
        }
    }

    #[test]
    fn test_cli_app_parse_operator_note() {
        let app = CliApp::try_parse_from([
            "oswbit", "operator", "--user-id", "2", "--order", "7", "note", "called client",
        ])
        .unwrap();
        match app.command {
            Command::Operator(cmd) => assert_eq!(
                cmd.action,
                OperatorActionCmd::Note { text: "called client".to_string() }
            ),
            _ => panic!("Expected Operator command"),
        }
    }

    #[test]
    fn test_cli_app_parse_poll_with_flags() {
        let app = CliApp::try_parse_from(["oswbit", "--debug", "poll", "--once"]).unwrap();
        assert!(app.debug);
        match app.command {
            Command::Poll(cmd) => assert!(cmd.once),
            _ => panic!("Expected Poll command"),
        }
    }

    #[test]
    fn test_cli_app_parse_merchant_withdraw() {
        let app = CliApp::try_parse_from([
            "oswbit", "merchant", "withdraw", "--address", "TXYZ", "--sum", "1500.50",
        ])
        .unwrap();
        match app.command {
            Command::Merchant(cmd) => assert_eq!(
                cmd.action,
                MerchantActionCmd::Withdraw {
                    address: "TXYZ".to_string(),
                    sum: Decimal::new(150050, 2),
                }
            ),
            _ => panic!("Expected Merchant command"),
        }

        let app = CliApp::try_parse_from(["oswbit", "merchant", "info"]).unwrap();
        assert!(matches!(
            app.command,
            Command::Merchant(MerchantCmd { action: MerchantActionCmd::Info })
        ));

        assert!(CliApp::try_parse_from(["oswbit", "merchant", "withdraw", "--address", "TXYZ"]).is_err());
    }

    #[test]
    fn test_cli_app_parse_operators() {
        let app =
            CliApp::try_parse_from(["oswbit", "operators", "--user-id", "1", "add", "42"]).unwrap();
        match app.command {
            Command::Operators(cmd) => {
                assert_eq!(cmd.user_id, 1);
                assert_eq!(cmd.action, OperatorsActionCmd::Add { id: 42 });
            }
            _ => panic!("Expected Operators command"),
        }

        let app =
            CliApp::try_parse_from(["oswbit", "operators", "--user-id", "1", "list"]).unwrap();
        assert!(matches!(
            app.command,
            Command::Operators(OperatorsCmd { action: OperatorsActionCmd::List, .. })
        ));

        // acting user is required
        assert!(CliApp::try_parse_from(["oswbit", "operators", "remove", "42"]).is_err());
    }

    #[test]
    fn test_cli_app_unknown_command() {
        assert!(CliApp::try_parse_from(["oswbit", "swap"]).is_err());
    }
}
