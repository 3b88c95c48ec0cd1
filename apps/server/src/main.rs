//! Coinwatch - Headless alert server
//!
//! Polls CoinMarketCap for market snapshots, evaluates per-user alert
//! thresholds with hysteresis, and notifies users through a Telegram bot.

mod config;

use clap::Parser;
use config::{AppConfig, Secrets};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use coinwatch_alerts::{Notifier, Store, TelegramBot};
use coinwatch_feeds::{CmcClient, MarketCache};

/// Coinwatch CLI
#[derive(Parser, Debug)]
#[command(name = "coinwatch")]
#[command(about = "Crypto price-alert bot with threshold hysteresis", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Seconds between poll cycles (overrides config file)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Periodic fetch-and-evaluate loop. A failed fetch skips the tick; a slow
/// fetch delays the next one.
async fn run_poll_loop(
    fetcher: CmcClient,
    cache: Arc<MarketCache>,
    notifier: Notifier,
    interval: Duration,
    top_listings: u32,
) {
    info!(interval_secs = interval.as_secs(), "Starting poll loop");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let snapshots = match fetcher.fetch_listings(top_listings).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                // Observation skipped: no alerting state changes this cycle
                warn!(error = %e, transient = e.is_transient(), "Fetch failed, skipping cycle");
                continue;
            }
        };

        cache.replace_all(snapshots.iter().cloned());

        match notifier.process_cycle(&snapshots).await {
            Ok(sent) if sent > 0 => info!(sent = sent, "Poll cycle complete"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "Poll cycle failed"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level);

    let mut app_config = AppConfig::load(&args.config)?;
    if let Some(interval) = args.interval {
        app_config.poll.interval_secs = interval;
    }
    let secrets = Secrets::from_env()?;

    info!(
        database_url = %app_config.database_url,
        interval_secs = app_config.poll.interval_secs,
        top_listings = app_config.poll.top_listings,
        "Starting coinwatch"
    );

    let store = Store::connect(&app_config.database_url).await?;
    let cache = Arc::new(MarketCache::new());
    let bot = Arc::new(TelegramBot::new(
        &secrets.telegram_bot_token,
        store.clone(),
        cache.clone(),
        secrets.etherscan_api_key.clone(),
    ));
    let notifier = Notifier::new(store, bot.clone());
    let fetcher = CmcClient::new(&secrets.cmc_api_key);

    // Command handling and polling share only the store; SQLite serializes
    // their writes.
    let bot_task = tokio::spawn(bot.run());
    let poll_task = tokio::spawn(run_poll_loop(
        fetcher,
        cache,
        notifier,
        Duration::from_secs(app_config.poll.interval_secs),
        app_config.poll.top_listings,
    ));

    tokio::select! {
        _ = bot_task => info!("Bot dispatcher stopped"),
        _ = poll_task => info!("Poll loop stopped"),
    }

    Ok(())
}
