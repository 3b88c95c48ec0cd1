//! Per-user alert threshold records.

use crate::ChangeWindow;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// A user's alert threshold for one coin over one window.
///
/// Unique per `(user_id, coin_symbol, window)`. Created and removed only by
/// user command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    /// Telegram chat id of the owner
    pub user_id: i64,
    /// Coin symbol (e.g., "BTC")
    pub coin_symbol: CompactString,
    /// Lookback window the trigger applies to
    pub window: ChangeWindow,
    /// Signed trigger: positive fires on pumps, negative on dumps
    pub percent_trigger: f64,
    /// Disabled thresholds are skipped during evaluation
    pub enabled: bool,
}

impl AlertThreshold {
    pub fn new(user_id: i64, coin_symbol: &str, window: ChangeWindow, percent_trigger: f64) -> Self {
        Self {
            user_id,
            coin_symbol: CompactString::new(coin_symbol),
            window,
            percent_trigger,
            enabled: true,
        }
    }

    /// The identity of this threshold in the store.
    pub fn key(&self) -> ThresholdKey {
        ThresholdKey {
            user_id: self.user_id,
            coin_symbol: self.coin_symbol.clone(),
            window: self.window,
        }
    }
}

/// Store key for a threshold and its fired-state row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThresholdKey {
    pub user_id: i64,
    pub coin_symbol: CompactString,
    pub window: ChangeWindow,
}

impl ThresholdKey {
    pub fn new(user_id: i64, coin_symbol: &str, window: ChangeWindow) -> Self {
        Self {
            user_id,
            coin_symbol: CompactString::new(coin_symbol),
            window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_identifies_threshold() {
        let t = AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0);
        assert_eq!(t.key(), ThresholdKey::new(42, "BTC", ChangeWindow::Hour24));
        assert!(t.enabled);
    }
}
