//! giveaway-daemon - Telegram giveaway bot.
//!
//! Loads `giveaway.toml`, resolves the bot token from the environment, and
//! long-polls the Bot API until SIGTERM or SIGINT.
//!
//! The binary uses a synchronous `fn main()` that parses arguments first and
//! THEN constructs the Tokio runtime via `block_on()`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use giveaway_core::{ContestService, GiveawayConfig};
use giveaway_daemon::state::DaemonStateHandle;
use giveaway_daemon::telegram::{self, TelegramClient};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// giveaway daemon - Telegram contest coordinator
#[derive(Parser, Debug)]
#[command(name = "giveaway-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "giveaway.toml")]
    config: PathBuf,

    /// Operator user id (overrides `bot.operator_id`)
    #[arg(long)]
    operator_id: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Loads the configuration named by `args` and applies CLI overrides.
///
/// A missing file yields the defaults, which only validate once an operator
/// id is supplied on the command line.
fn load_config(args: &Args) -> Result<GiveawayConfig> {
    let mut config = if args.config.exists() {
        GiveawayConfig::from_file(&args.config).context("failed to load configuration")?
    } else {
        GiveawayConfig::default()
    };

    if let Some(operator_id) = args.operator_id {
        config.bot.operator_id = operator_id;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = load_config(&args)?;

    // Must precede any TLS configuration.
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok(); // Ignore error if already installed

    let token = config
        .bot
        .resolve_token()
        .context("failed to resolve bot token")?;
    let client = Arc::new(TelegramClient::new(&config.bot.api_base_url, token));

    let me = client
        .get_me()
        .await
        .context("failed to reach the Bot API")?;
    info!(
        bot_id = me.id,
        username = ?me.username,
        operator_id = config.bot.operator_id,
        "giveaway daemon starting"
    );

    let service = ContestService::new(client.clone(), config.bot.operator());
    let state = Arc::new(DaemonStateHandle::new(service, config, me.username));

    let polling_state = state.clone();
    let polling_client = client.clone();
    let polling_task = tokio::spawn(async move {
        telegram::run_polling(
            polling_client.as_ref(),
            polling_client.as_ref(),
            polling_state,
        )
        .await;
    });

    // Handle Unix signals
    let signal_state = state.clone();
    let signal_task = tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        signal_state.request_shutdown();
    });

    // Wait for shutdown
    tokio::select! {
        result = polling_task => {
            if let Err(e) = result {
                error!("Polling task failed: {}", e);
            }
            info!("Update polling exited");
        }
        _ = signal_task => {
            info!("Signal handler triggered shutdown");
        }
    }

    // Pending finalize timers are dropped with the runtime.
    let snapshot = state.service().debug_snapshot().await;
    info!(
        active_contests = snapshot.active,
        pending_timers = snapshot.pending_timers,
        uptime_secs = state.uptime_secs(),
        "giveaway daemon stopped"
    );
    Ok(())
}
