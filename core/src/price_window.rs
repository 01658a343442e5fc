use backtest_execution::market::{Candle, PriceSummary};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const MAX_WINDOW: usize = 500;

struct CoinSeries {
    timestamps: Vec<DateTime<Utc>>,
    summaries: Vec<PriceSummary>,
    cursor: usize,
    window: Vec<PriceSummary>,
}

impl CoinSeries {
    fn new(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        let timestamps: Vec<DateTime<Utc>> = candles.iter().map(|c| c.timestamp).collect();
        let summaries: Vec<PriceSummary> = candles.iter().map(PriceSummary::from).collect();
        let window = summaries.first().cloned().into_iter().collect();
        Self {
            timestamps,
            summaries,
            cursor: 0,
            window,
        }
    }

    fn advance(&mut self, t: DateTime<Utc>) {
        while self.cursor + 1 < self.timestamps.len() && self.timestamps[self.cursor + 1] <= t {
            self.cursor += 1;
            self.window.push(self.summaries[self.cursor]);
        }
        if self.window.len() > MAX_WINDOW {
            let excess = self.window.len() - MAX_WINDOW;
            self.window.drain(0..excess);
        }
    }
}

/// Owns, per coin, a sorted candle series, a timestamp cursor, and a bounded (≤500) sliding
/// summary window. `advance(t)` walks the cursor forward to `t` and returns the up-to-date
/// read-only windows for every coin, exactly as the algorithm contract expects.
pub struct PriceWindowTracker {
    series: HashMap<u32, CoinSeries>,
}

impl PriceWindowTracker {
    pub fn new(candles_by_coin: HashMap<u32, Vec<Candle>>) -> Self {
        Self {
            series: candles_by_coin
                .into_iter()
                .map(|(coin_id, candles)| (coin_id, CoinSeries::new(candles)))
                .collect(),
        }
    }

    pub fn advance(&mut self, t: DateTime<Utc>) -> HashMap<u32, &[PriceSummary]> {
        for series in self.series.values_mut() {
            series.advance(t);
        }
        self.series.iter().map(|(coin, series)| (*coin, series.window.as_slice())).collect()
    }
}
