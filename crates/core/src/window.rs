//! Lookback windows for percentage price changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fixed lookback period over which percentage change is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ChangeWindow {
    #[serde(rename = "1h")]
    Hour1 = 1,
    #[serde(rename = "24h")]
    Hour24 = 2,
    #[serde(rename = "7d")]
    Day7 = 3,
    #[serde(rename = "30d")]
    Day30 = 4,
}

impl ChangeWindow {
    /// All windows, in ascending lookback order.
    pub const ALL: [ChangeWindow; 4] = [
        ChangeWindow::Hour1,
        ChangeWindow::Hour24,
        ChangeWindow::Day7,
        ChangeWindow::Day30,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(ChangeWindow::Hour1),
            2 => Some(ChangeWindow::Hour24),
            3 => Some(ChangeWindow::Day7),
            4 => Some(ChangeWindow::Day30),
            _ => None,
        }
    }

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Token used in commands and messages ("1h", "24h", "7d", "30d").
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeWindow::Hour1 => "1h",
            ChangeWindow::Hour24 => "24h",
            ChangeWindow::Day7 => "7d",
            ChangeWindow::Day30 => "30d",
        }
    }
}

impl fmt::Display for ChangeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown window '{0}', expected one of: 1h, 24h, 7d, 30d")]
pub struct ParseWindowError(pub String);

impl FromStr for ChangeWindow {
    type Err = ParseWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1h" => Ok(ChangeWindow::Hour1),
            "24h" => Ok(ChangeWindow::Hour24),
            "7d" => Ok(ChangeWindow::Day7),
            "30d" => Ok(ChangeWindow::Day30),
            other => Err(ParseWindowError(other.to_string())),
        }
    }
}
