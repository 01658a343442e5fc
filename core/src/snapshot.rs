use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Holding {
    pub quantity: Decimal,
    pub value: Decimal,
    pub price: Decimal,
}

/// An append-only, never-mutated point-in-time portfolio record, emitted every
/// `snapshot_interval_bars` bars and on the run's final bar.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: Decimal,
    pub cash_balance: Decimal,
    pub holdings: HashMap<u32, Holding>,
    pub cumulative_return: Decimal,
    pub drawdown: Decimal,
}
