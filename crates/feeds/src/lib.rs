//! Market data feeds for the coinwatch alert engine.
//!
//! This crate provides:
//! - CoinMarketCap listings fetcher (prices + window percentage changes)
//! - Fear & Greed index and Etherscan gas oracle fetchers
//! - In-memory latest-snapshot cache

pub mod cache;
pub mod coinmarketcap;
pub mod error;
pub mod gas;
pub mod sentiment;

pub use cache::MarketCache;
pub use coinmarketcap::CmcClient;
pub use error::FeedError;
pub use gas::{fetch_eth_gas, GasOracle};
pub use sentiment::{fetch_fear_and_greed, FearGreedIndex};
