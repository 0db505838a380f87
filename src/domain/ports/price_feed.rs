//! Price feed port for the paper trader.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::Rng;

/// Source of current prices for paper trading.
pub trait PriceFeed: Send + Sync {
    /// Current price, or `None` when the symbol is unavailable.
    fn price(&self, symbol: &str) -> Option<f64>;
}

/// Deterministic-enough stand-in feed: each symbol starts at a seed
/// price and takes a small random step per query. Good for demos and
/// tests; not a market.
pub struct RandomWalkFeed {
    last: Mutex<HashMap<String, f64>>,
    start_price: f64,
}

impl RandomWalkFeed {
    pub fn new(start_price: f64) -> Self {
        Self {
            last: Mutex::new(HashMap::new()),
            start_price,
        }
    }
}

impl Default for RandomWalkFeed {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl PriceFeed for RandomWalkFeed {
    fn price(&self, symbol: &str) -> Option<f64> {
        let mut last = self.last.lock().ok()?;
        let current = *last.entry(symbol.to_string()).or_insert(self.start_price);
        let step = rand::thread_rng().gen_range(-0.005..0.005);
        let next = (current * (1.0 + step)).max(0.01);
        last.insert(symbol.to_string(), next);
        Some(next)
    }
}

/// Fixed-price feed for tests.
pub struct StaticFeed {
    prices: HashMap<String, f64>,
}

impl StaticFeed {
    pub fn new(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(s, p)| (s.to_string(), *p))
                .collect(),
        }
    }
}

impl PriceFeed for StaticFeed {
    fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_walk_stays_positive() {
        let feed = RandomWalkFeed::new(1.0);
        for _ in 0..100 {
            let p = feed.price("EURUSD").unwrap();
            assert!(p > 0.0);
        }
    }

    #[test]
    fn test_static_feed_lookup() {
        let feed = StaticFeed::new(&[("EURUSD", 1.085)]);
        assert_eq!(feed.price("EURUSD"), Some(1.085));
        assert_eq!(feed.price("GBPUSD"), None);
    }
}
