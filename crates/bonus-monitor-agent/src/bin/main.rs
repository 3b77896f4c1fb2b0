//! Bonus Monitor entry point
//!
//! Polls the EV bonus page, alerts on Telegram when the funding status
//! changes and serves a liveness route.

use anyhow::Context;
use bonus_monitor_agent::{create_router, PageObserver, TelegramNotifier};
use bonus_monitor_core::config::*;
use bonus_monitor_core::{
    JsonFileStore, MonitorConfig, Notifier, Observer, PollScheduler, StateStore, TelegramConfig,
    TransitionEngine,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bonus-monitor")]
#[command(about = "Bonus Monitor - Telegram alerts when EV bonus funds open or run out")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    monitor: MonitorArgs,

    /// Port the liveness server listens on
    #[arg(short, long, default_value = "5000", env = "PORT", global = true)]
    port: u16,

    /// Host the liveness server binds to
    #[arg(long, default_value = "0.0.0.0", env = "HOST", global = true)]
    host: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "json", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the poll loop and the liveness server (default)
    Run,

    /// Fetch and classify the page once, without touching the state file
    Check,

    /// Print the persisted status record
    Status,

    /// Send a test message through the configured notifier
    NotifyTest {
        /// Message text
        #[arg(short, long, default_value = "Bonus monitor test message")]
        message: String,
    },
}

#[derive(Args)]
struct MonitorArgs {
    /// Page to watch
    #[arg(long, env = "MONITOR_URL", default_value = DEFAULT_URL, global = true)]
    url: String,

    /// Phrase shown once funds are exhausted
    #[arg(long, env = "EXHAUSTED_PHRASE", default_value = DEFAULT_EXHAUSTED_PHRASE, global = true)]
    exhausted_phrase: String,

    /// Seconds between poll cycles
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS, global = true)]
    interval: u64,

    /// Page request timeout in seconds
    #[arg(long, env = "OBSERVE_TIMEOUT_SECS", default_value_t = DEFAULT_OBSERVE_TIMEOUT_SECS, global = true)]
    observe_timeout: u64,

    /// Notification timeout in seconds
    #[arg(long, env = "NOTIFY_TIMEOUT_SECS", default_value_t = DEFAULT_NOTIFY_TIMEOUT_SECS, global = true)]
    notify_timeout: u64,

    /// Location of the persisted status record
    #[arg(long, env = "STATE_FILE", default_value = DEFAULT_STATE_FILE, global = true)]
    state_file: PathBuf,

    /// Consecutive failed polls between two warnings
    #[arg(long, env = "FAILURE_WARN_THRESHOLD", default_value_t = DEFAULT_FAILURE_WARN_THRESHOLD, global = true)]
    failure_warn_threshold: u32,

    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", default_value = PLACEHOLDER_BOT_TOKEN, hide_env_values = true, hide_default_value = true, global = true)]
    bot_token: String,

    /// Telegram chat receiving the alerts
    #[arg(long, env = "CHAT_ID", default_value = PLACEHOLDER_CHAT_ID, global = true)]
    chat_id: String,

    /// Telegram Bot API base URL
    #[arg(long, env = "TELEGRAM_API_BASE", default_value = DEFAULT_TELEGRAM_API_BASE, global = true)]
    telegram_api_base: String,
}

impl MonitorArgs {
    fn into_config(self) -> MonitorConfig {
        MonitorConfig {
            url: self.url,
            exhausted_phrase: self.exhausted_phrase,
            poll_interval: Duration::from_secs(self.interval),
            observe_timeout: Duration::from_secs(self.observe_timeout),
            notify_timeout: Duration::from_secs(self.notify_timeout),
            state_path: self.state_file,
            failure_warn_threshold: self.failure_warn_threshold,
            telegram: TelegramConfig {
                api_base: self.telegram_api_base,
                bot_token: self.bot_token,
                chat_id: self.chat_id,
            },
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    ));

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.monitor.into_config();
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config, &cli.host, cli.port).await?,

        Commands::Check => {
            let observer = PageObserver::new(&config)?;
            match observer.observe().await {
                Ok(status) => println!(
                    "{}",
                    serde_json::json!({
                        "url": observer.url(),
                        "status": status,
                    })
                ),
                Err(e) => {
                    eprintln!("Check failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Status => {
            let store = JsonFileStore::new(&config.state_path);
            println!("{}", serde_json::to_string_pretty(&store.load())?);
        }

        Commands::NotifyTest { message } => {
            let notifier = TelegramNotifier::new(&config.telegram, config.notify_timeout);
            notifier.send(&message).await?;
            println!("Message delivered");
        }
    }

    Ok(())
}

async fn run(config: MonitorConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", host, port))?;

    if config.telegram.is_placeholder() {
        tracing::warn!("Telegram credentials not set (BOT_TOKEN / CHAT_ID), notifications will fail");
    }

    let store = Arc::new(JsonFileStore::new(&config.state_path));
    let observer = Arc::new(PageObserver::new(&config)?);
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram, config.notify_timeout));
    let engine = TransitionEngine::new(store, notifier, &config);
    let mut scheduler = PollScheduler::new(observer, engine, &config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = signal_tx.send(true);
        }
    });

    tracing::info!(
        url = %config.url,
        state_file = %config.state_path.display(),
        interval_secs = config.poll_interval.as_secs(),
        "Starting Bonus Monitor on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let mut server_rx = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, create_router())
            .with_graceful_shutdown(async move {
                let _ = server_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    let poll_result = tokio::spawn(async move { scheduler.run(shutdown_rx).await }).await?;

    // Stop the server as well when the poll loop ends on its own.
    let _ = shutdown_tx.send(true);
    server.await??;

    poll_result?;
    Ok(())
}
