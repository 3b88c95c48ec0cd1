//! Telegram bot handlers.

use crate::store::{Store, StoreError};
use coinwatch_core::{AlertThreshold, ChangeWindow, CoinSnapshot, ThresholdKey};
use coinwatch_feeds::{fetch_eth_gas, fetch_fear_and_greed, MarketCache};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

/// Bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Add an alert. Usage: /addalert BTC 24h 5")]
    AddAlert(String),
    #[command(description = "Remove an alert. Usage: /removealert BTC 24h")]
    RemoveAlert(String),
    #[command(description = "List your alerts")]
    Alerts,
    #[command(description = "Latest price and changes. Usage: /price BTC")]
    Price(String),
    #[command(description = "Pause an alert. Usage: /pause BTC 24h")]
    Pause(String),
    #[command(description = "Resume an alert. Usage: /resume BTC 24h")]
    Resume(String),
    #[command(description = "Current Fear & Greed index")]
    FearGreed,
    #[command(description = "Current ETH gas prices")]
    Gas,
    #[command(description = "Show help")]
    Help,
}

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    store: Store,
    market: Arc<MarketCache>,
    http: reqwest::Client,
    etherscan_api_key: Option<String>,
}

impl TelegramBot {
    /// Create a new bot with the given token.
    pub fn new(
        token: &str,
        store: Store,
        market: Arc<MarketCache>,
        etherscan_api_key: Option<String>,
    ) -> Self {
        Self {
            bot: Bot::new(token),
            store,
            market,
            http: reqwest::Client::new(),
            etherscan_api_key,
        }
    }

    /// Send an alert message to a chat.
    pub async fn send_alert(&self, chat_id: i64, message: &str) -> Result<(), TelegramError> {
        self.bot
            .send_message(ChatId(chat_id), message)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    /// Run the bot command handler.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(bot, msg, cmd).await }
            },
        );

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        let user_id = msg.chat.id.0;

        match cmd {
            Command::Start => {
                bot.send_message(
                    msg.chat.id,
                    "Welcome to the coinwatch alert bot!\n\n\
                     Get notified when a coin moves past your threshold over \
                     1h, 24h, 7d or 30d.\n\n\
                     Example: /addalert BTC 24h 5 fires when BTC gains 5% in a day;\n\
                     /addalert BTC 24h -5 fires when it loses 5%.\n\n\
                     Use /help to see all commands.",
                )
                .await?;
            }

            Command::AddAlert(args) => match parse_add_args(&args) {
                Ok((symbol, window, percent)) => {
                    let threshold = AlertThreshold::new(user_id, &symbol, window, percent);
                    match self.store.add(&threshold).await {
                        Ok(()) => {
                            bot.send_message(
                                msg.chat.id,
                                format!(
                                    "Alert added: {} {} {}{}%",
                                    symbol,
                                    window,
                                    if percent > 0.0 { "+" } else { "" },
                                    percent
                                ),
                            )
                            .await?;
                        }
                        Err(e @ StoreError::DuplicateThreshold { .. }) => {
                            bot.send_message(msg.chat.id, e.to_string()).await?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(usage) => {
                    bot.send_message(msg.chat.id, usage).await?;
                }
            },

            Command::RemoveAlert(args) => match parse_key_args(&args) {
                Ok((symbol, window)) => {
                    let key = ThresholdKey::new(user_id, &symbol, window);
                    match self.store.remove(&key).await {
                        Ok(()) => {
                            bot.send_message(
                                msg.chat.id,
                                format!("Alert removed: {symbol} {window}"),
                            )
                            .await?;
                        }
                        Err(e @ StoreError::ThresholdNotFound { .. }) => {
                            bot.send_message(msg.chat.id, e.to_string()).await?;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(usage) => {
                    bot.send_message(msg.chat.id, usage).await?;
                }
            },

            Command::Alerts => {
                let thresholds = self.store.list(user_id).await?;
                if thresholds.is_empty() {
                    bot.send_message(msg.chat.id, "No alerts yet. Add one with /addalert.")
                        .await?;
                } else {
                    let mut text = String::from("<b>Your alerts</b>\n");
                    for t in thresholds {
                        let fired = self.store.is_fired(&t.key()).await?;
                        let state = if !t.enabled {
                            "paused"
                        } else if fired {
                            "fired"
                        } else {
                            "armed"
                        };
                        text.push_str(&format!(
                            "\n{} {} {}{}% [{}]",
                            t.coin_symbol,
                            t.window,
                            if t.percent_trigger > 0.0 { "+" } else { "" },
                            t.percent_trigger,
                            state
                        ));
                    }
                    bot.send_message(msg.chat.id, text)
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
            }

            Command::Price(args) => {
                let symbol = args.trim().to_uppercase();
                if symbol.is_empty() {
                    bot.send_message(msg.chat.id, "Usage: /price <SYMBOL>\nExample: /price BTC")
                        .await?;
                } else {
                    match self.market.get(&symbol) {
                        Some(snapshot) => {
                            bot.send_message(msg.chat.id, format_price_message(&snapshot))
                                .parse_mode(ParseMode::Html)
                                .await?;
                        }
                        None => {
                            bot.send_message(
                                msg.chat.id,
                                format!("No data for {symbol} yet. It may be outside the tracked listings."),
                            )
                            .await?;
                        }
                    }
                }
            }

            Command::Pause(args) => {
                self.toggle(&bot, &msg, &args, false, "paused").await?;
            }

            Command::Resume(args) => {
                self.toggle(&bot, &msg, &args, true, "resumed").await?;
            }

            Command::FearGreed => match fetch_fear_and_greed(&self.http).await {
                Ok(index) => {
                    bot.send_message(msg.chat.id, index.to_message())
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Err(e) => {
                    warn!(error = %e, "Fear & Greed fetch failed");
                    bot.send_message(msg.chat.id, "Could not fetch the Fear & Greed index, try again later.")
                        .await?;
                }
            },

            Command::Gas => match &self.etherscan_api_key {
                Some(key) => match fetch_eth_gas(&self.http, key).await {
                    Ok(oracle) => {
                        bot.send_message(msg.chat.id, oracle.to_message())
                            .parse_mode(ParseMode::Html)
                            .await?;
                    }
                    Err(e) => {
                        warn!(error = %e, "Gas oracle fetch failed");
                        bot.send_message(msg.chat.id, "Could not fetch gas prices, try again later.")
                            .await?;
                    }
                },
                None => {
                    bot.send_message(msg.chat.id, "Gas prices are not configured on this bot.")
                        .await?;
                }
            },

            Command::Help => {
                bot.send_message(msg.chat.id, Command::descriptions().to_string())
                    .await?;
            }
        }

        Ok(())
    }

    async fn toggle(
        &self,
        bot: &Bot,
        msg: &Message,
        args: &str,
        enabled: bool,
        verb: &str,
    ) -> Result<(), TelegramError> {
        match parse_key_args(args) {
            Ok((symbol, window)) => {
                let key = ThresholdKey::new(msg.chat.id.0, &symbol, window);
                match self.store.set_enabled(&key, enabled).await {
                    Ok(()) => {
                        bot.send_message(msg.chat.id, format!("Alert {verb}: {symbol} {window}"))
                            .await?;
                    }
                    Err(e @ StoreError::ThresholdNotFound { .. }) => {
                        bot.send_message(msg.chat.id, e.to_string()).await?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(usage) => {
                bot.send_message(msg.chat.id, usage).await?;
            }
        }
        Ok(())
    }
}

/// Parse "/addalert BTC 24h 5" arguments.
fn parse_add_args(args: &str) -> Result<(String, ChangeWindow, f64), String> {
    const USAGE: &str = "Usage: /addalert <SYMBOL> <1h|24h|7d|30d> <percent>\n\
                         Example: /addalert BTC 24h 5 (or -5 for drops)";

    let mut parts = args.split_whitespace();
    let (Some(symbol), Some(window), Some(percent), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(USAGE.to_string());
    };

    let window = window.parse::<ChangeWindow>().map_err(|e| e.to_string())?;
    let percent = percent
        .parse::<f64>()
        .map_err(|_| USAGE.to_string())?;

    if !percent.is_finite() || percent == 0.0 {
        return Err("Percent must be a non-zero number: positive for pumps, negative for dumps."
            .to_string());
    }

    Ok((symbol.to_uppercase(), window, percent))
}

/// Parse "/removealert BTC 24h" style arguments.
fn parse_key_args(args: &str) -> Result<(String, ChangeWindow), String> {
    const USAGE: &str = "Usage: <SYMBOL> <1h|24h|7d|30d>\nExample: BTC 24h";

    let mut parts = args.split_whitespace();
    let (Some(symbol), Some(window), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(USAGE.to_string());
    };

    let window = window.parse::<ChangeWindow>().map_err(|e| e.to_string())?;
    Ok((symbol.to_uppercase(), window))
}

/// Render a percentage change with the direction marker the bots use.
fn format_change(change: f64) -> String {
    if change < 0.0 {
        format!("🔴 {change:.2}%")
    } else {
        format!("🟢 +{change:.2}%")
    }
}

/// Format a price with precision matching its magnitude.
fn format_price(price: f64) -> String {
    let abs_price = price.abs();
    if abs_price >= 1000.0 {
        format!("${price:.2}")
    } else if abs_price >= 1.0 {
        format!("${price:.4}")
    } else if abs_price >= 0.01 {
        format!("${price:.6}")
    } else {
        format!("${price:.8}")
    }
}

/// Format a cached snapshot as a value-check reply.
fn format_price_message(snapshot: &CoinSnapshot) -> String {
    let mut msg = format!(
        "<b>{}</b> {}\n",
        snapshot.symbol,
        format_price(snapshot.price)
    );

    for window in ChangeWindow::ALL {
        let rendered = match snapshot.change(window) {
            Some(change) => format_change(change),
            None => "N/A".to_string(),
        };
        msg.push_str(&format!("\n{window}: {rendered}"));
    }

    msg.push_str(&format!(
        "\n\n🕒 As of {}",
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    msg
}

/// Render a trigger with at least one decimal place ("5" reads as "5.0%").
fn format_trigger(trigger: f64) -> String {
    if trigger == trigger.trunc() {
        format!("{trigger:.1}")
    } else {
        format!("{trigger}")
    }
}

/// Format a firing threshold as an alert message.
pub fn format_alert_message(
    symbol: &str,
    window: ChangeWindow,
    observed: f64,
    trigger: f64,
) -> String {
    let mut msg = format!(
        "🚨 <b>Crypto Alert!</b>\n\n\
         <b>{}</b> moved {} over {}, threshold {}%",
        symbol,
        format_change(observed),
        window,
        format_trigger(trigger)
    );

    let now = chrono::Utc::now();
    msg.push_str(&format!("\n\n⏰ {}", now.format("%Y-%m-%d %H:%M:%S UTC")));

    msg
}
