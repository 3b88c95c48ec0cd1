//! Point-in-time market reads.

use crate::ChangeWindow;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A single read of a coin's price and percentage changes.
///
/// Ephemeral: replaced each poll cycle, only the most recent value per coin is
/// kept. Change fields are `None` when the upstream API omits them (young
/// listings, partial responses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    /// Coin symbol (e.g., "BTC", "ETH")
    pub symbol: CompactString,
    /// Spot price in USD
    pub price: f64,
    /// Percentage change over the last hour
    pub pct_change_1h: Option<f64>,
    /// Percentage change over the last 24 hours
    pub pct_change_24h: Option<f64>,
    /// Percentage change over the last 7 days
    pub pct_change_7d: Option<f64>,
    /// Percentage change over the last 30 days
    pub pct_change_30d: Option<f64>,
    /// When this snapshot was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CoinSnapshot {
    /// Create a snapshot with no change data.
    pub fn new(symbol: &str, price: f64) -> Self {
        Self {
            symbol: CompactString::new(symbol),
            price,
            pct_change_1h: None,
            pct_change_24h: None,
            pct_change_7d: None,
            pct_change_30d: None,
            fetched_at: Utc::now(),
        }
    }

    /// The percentage change observed over `window`, if the upstream
    /// reported one.
    #[inline]
    pub fn change(&self, window: ChangeWindow) -> Option<f64> {
        match window {
            ChangeWindow::Hour1 => self.pct_change_1h,
            ChangeWindow::Hour24 => self.pct_change_24h,
            ChangeWindow::Day7 => self.pct_change_7d,
            ChangeWindow::Day30 => self.pct_change_30d,
        }
    }

    pub fn with_change(mut self, window: ChangeWindow, pct: f64) -> Self {
        match window {
            ChangeWindow::Hour1 => self.pct_change_1h = Some(pct),
            ChangeWindow::Hour24 => self.pct_change_24h = Some(pct),
            ChangeWindow::Day7 => self.pct_change_7d = Some(pct),
            ChangeWindow::Day30 => self.pct_change_30d = Some(pct),
        }
        self
    }
}
