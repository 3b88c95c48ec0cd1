//! Latest-snapshot cache.

use coinwatch_core::CoinSnapshot;
use compact_str::CompactString;
use dashmap::DashMap;

/// Most recent snapshot per coin, replaced wholesale each poll cycle.
#[derive(Debug, Default)]
pub struct MarketCache {
    snapshots: DashMap<CompactString, CoinSnapshot>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot for a coin.
    pub fn update(&self, snapshot: CoinSnapshot) {
        self.snapshots.insert(snapshot.symbol.clone(), snapshot);
    }

    /// Replace the whole cache contents with a fresh poll result.
    pub fn replace_all(&self, snapshots: impl IntoIterator<Item = CoinSnapshot>) {
        self.snapshots.clear();
        for snapshot in snapshots {
            self.update(snapshot);
        }
    }

    /// Latest snapshot for a coin, if one has been fetched.
    pub fn get(&self, symbol: &str) -> Option<CoinSnapshot> {
        self.snapshots.get(symbol).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn update_replaces_previous_snapshot() {
        let cache = MarketCache::new();
        cache.update(CoinSnapshot::new("BTC", 64000.0));
        cache.update(CoinSnapshot::new("BTC", 65000.0));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("BTC").unwrap().price, 65000.0);
        assert!(cache.get("ETH").is_none());
    }

    #[test]
    fn replace_all_drops_stale_coins() {
        let cache = MarketCache::new();
        cache.update(CoinSnapshot::new("DOGE", 0.1));
        cache.replace_all([CoinSnapshot::new("BTC", 65000.0)]);

        assert!(cache.get("DOGE").is_none());
        assert_eq!(cache.len(), 1);
    }
}
