use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An immutable historical OHLCV bar for one coin at one timestamp.
///
/// Candles for a given coin are assumed sorted ascending by `timestamp` by whoever
/// constructs a run's input series (a CSV/object-storage reader, out of scope here).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Candle {
    pub coin_id: u32,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// The price view fed to algorithms: a sliding-window summary of a coin's recent candles.
///
/// `avg` is fixed equal to `close` by this spec (the source system blurred the two; see
/// `DESIGN.md` for the resolved Open Question).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PriceSummary {
    pub coin_id: u32,
    pub date: DateTime<Utc>,
    pub avg: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl From<&Candle> for PriceSummary {
    fn from(candle: &Candle) -> Self {
        Self {
            coin_id: candle.coin_id,
            date: candle.timestamp,
            avg: candle.close,
            high: candle.high,
            low: candle.low,
            close: candle.close,
        }
    }
}

/// Snapshot of tradable prices for a single bar, keyed by coin, as handed to the trade
/// executor and to the algorithm contract.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    pub prices: std::collections::HashMap<u32, Decimal>,
}

impl MarketData {
    pub fn price_of(&self, coin_id: u32) -> Option<Decimal> {
        self.prices.get(&coin_id).copied()
    }
}
