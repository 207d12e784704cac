use clap::{Parser, Subcommand};
use spotbot::api::{BinanceClient, LogNotifier, Notifier, TelegramNotifier};
use spotbot::config::{Config, TelegramConfig, TelegramSetup};
use spotbot::engine::Engine;
use spotbot::persistence::{Ledger, MemoryLedger, SheetsLedger, TradeLedger};
use spotbot::strategy::MomentumStrategy;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Spot screening and trading bot")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP trigger routes (default)
    Serve,
    /// Run one screening cycle and exit
    Screen,
    /// Refresh the status of every open order and exit
    CheckOrderStatus,
    /// Run one stop-loss sweep and exit
    CheckStopLoss,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let config = Config::load()?;
    tracing::info!("🚀 spotbot starting");

    let exchange = Arc::new(BinanceClient::new(&config.binance)?);
    if !exchange.is_authenticated() {
        tracing::warn!("No Binance credentials configured, order placement will fail");
    }

    let ledger = TradeLedger::new(connect_ledger(&config)?);
    let notifier = connect_notifier(&config.telegram);
    let strategy = Arc::new(MomentumStrategy::new(
        config.indicators.clone(),
        config.signals.clone(),
    ));

    let server_config = config.server.clone();
    let engine = Arc::new(Engine::new(exchange, ledger, notifier, strategy, config));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => spotbot::server::serve(engine, &server_config).await?,
        Command::Screen => {
            engine.run_screening().await;
        }
        Command::CheckOrderStatus => {
            engine.run_status_refresh().await;
        }
        Command::CheckStopLoss => {
            engine.run_stop_loss().await;
        }
    }

    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spotbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn connect_ledger(config: &Config) -> anyhow::Result<Arc<dyn Ledger>> {
    match SheetsLedger::from_config(&config.sheets) {
        Some(ledger) => {
            tracing::info!("✓ Using Google Sheets ledger");
            Ok(Arc::new(ledger?))
        }
        None => {
            tracing::warn!("Sheets credentials missing, using in-memory ledger (state is lost on exit)");
            Ok(Arc::new(MemoryLedger::new()))
        }
    }
}

fn connect_notifier(config: &TelegramConfig) -> Arc<dyn Notifier> {
    match config.setup() {
        TelegramSetup::Active { bot_token, chat_id } => {
            tracing::info!("✓ Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(bot_token.to_string(), chat_id.to_string()))
        }
        TelegramSetup::Incomplete => {
            tracing::warn!("Telegram enabled but bot token or chat id missing, logging alerts instead");
            Arc::new(LogNotifier)
        }
        TelegramSetup::CredentialsIgnored => {
            tracing::warn!(
                "Telegram credentials found but notifications are disabled; set SPOTBOT_TELEGRAM__ENABLED=true to send alerts"
            );
            Arc::new(LogNotifier)
        }
        TelegramSetup::Disabled => Arc::new(LogNotifier),
    }
}
