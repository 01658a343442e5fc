use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single coin holding, weighted-average-cost accounted.
///
/// Destroyed (removed from [`Portfolio`](crate::portfolio::Portfolio)) iff `quantity`
/// becomes exactly zero. The invariant `average_price * quantity` reflects cumulative cost
/// basis holds for as long as the position exists.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Position {
    pub coin_id: u32,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub total_value: Decimal,
    pub entry_date: DateTime<Utc>,
}

impl Position {
    /// Applies a BUY of `added_quantity` at `added_price`, folding it into the existing
    /// weighted-average cost basis. `entry_date` is preserved if the position already
    /// existed; otherwise it is set to `bar_timestamp`.
    pub fn apply_buy(&mut self, added_quantity: Decimal, added_price: Decimal, bar_timestamp: DateTime<Utc>) {
        let existing_quantity = self.quantity;
        let new_quantity = existing_quantity + added_quantity;

        self.average_price = if existing_quantity.is_zero() {
            added_price
        } else {
            (self.average_price * existing_quantity + added_price * added_quantity) / new_quantity
        };
        self.quantity = new_quantity;

        if existing_quantity.is_zero() {
            self.entry_date = bar_timestamp;
        }
    }

    /// Constructs the position created by a coin's very first BUY.
    pub fn opened_by_buy(coin_id: u32, quantity: Decimal, price: Decimal, bar_timestamp: DateTime<Utc>) -> Self {
        Self {
            coin_id,
            quantity,
            average_price: price,
            total_value: quantity * price,
            entry_date: bar_timestamp,
        }
    }

    /// Realized P&L (gross, pre-fee) of selling `sold_quantity` at `execution_price`.
    /// `costBasis` is the position's `average_price` at the moment of sale; fee is never
    /// subtracted here — it is deducted from cash separately by the executor.
    pub fn realized_pnl(&self, sold_quantity: Decimal, execution_price: Decimal) -> Decimal {
        (execution_price - self.average_price) * sold_quantity
    }

    /// Applies a SELL of `sold_quantity`, reducing (but never zeroing out via this method;
    /// the caller removes the position from the map when `quantity` reaches zero).
    pub fn apply_sell(&mut self, sold_quantity: Decimal) {
        self.quantity -= sold_quantity;
    }

    pub fn is_closed(&self) -> bool {
        self.quantity.is_zero()
    }
}
