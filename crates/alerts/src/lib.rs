//! Telegram alert system for coin price movements.
//!
//! This crate provides:
//! - SQLite-based threshold storage with per-threshold fired-state
//! - Hysteresis evaluator deciding which thresholds fire for a snapshot
//! - Telegram bot integration for commands and notifications

pub mod evaluator;
pub mod notifier;
pub mod store;
pub mod telegram;

pub use evaluator::{evaluate, Evaluation};
pub use notifier::{AlertSender, Notifier, NotifierError};
pub use store::{Store, StoreError};
pub use telegram::{TelegramBot, TelegramError};
