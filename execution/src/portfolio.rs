use crate::position::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cash plus a map of open positions. `total_value` is maintained by
/// [`Portfolio::mark_to_market`] and must equal `cash_balance + Σ position.quantity × mark`
/// after every committed bar.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Portfolio {
    pub cash_balance: Decimal,
    pub positions: HashMap<u32, Position>,
    pub total_value: Decimal,
}

impl Portfolio {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            cash_balance: initial_capital,
            positions: HashMap::new(),
            total_value: initial_capital,
        }
    }

    /// Marks every open position to the supplied coin->price map and recomputes
    /// `total_value = cash + Σ position.quantity × mark`. Positions without a mark in
    /// `marks` keep their last `total_value` (the executor never leaves a coin unmarked for
    /// long, but a gap must not silently zero the position out).
    pub fn mark_to_market(&mut self, marks: &HashMap<u32, Decimal>) {
        for position in self.positions.values_mut() {
            if let Some(mark) = marks.get(&position.coin_id) {
                position.total_value = position.quantity * mark;
            }
        }
        self.total_value = self.cash_balance + self.positions_value();
    }

    pub fn positions_value(&self) -> Decimal {
        self.positions.values().map(|p| p.total_value).sum()
    }

    /// `|totalValue - (cash + Σ qty×mark)| <= tolerance * totalValue` — the portfolio
    /// identity invariant from the testable-properties section.
    pub fn is_consistent(&self, tolerance: Decimal) -> bool {
        let reconstructed = self.cash_balance + self.positions_value();
        let diff = (self.total_value - reconstructed).abs();
        if self.total_value.is_zero() {
            diff.is_zero()
        } else {
            diff <= tolerance * self.total_value.abs()
        }
    }

    pub fn position(&self, coin_id: u32) -> Option<&Position> {
        self.positions.get(&coin_id)
    }
}

/// Plain-record serialization shape: `positions` as an array, not a map, and
/// `entry_date` rebuilt from an ISO-8601 string on deserialize — matching the checkpoint
/// wire format from spec.md's Portfolio serialization contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedPortfolio {
    pub cash_balance: Decimal,
    pub total_value: Decimal,
    pub positions: Vec<SerializedPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedPosition {
    pub coin_id: u32,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub entry_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Portfolio> for SerializedPortfolio {
    fn from(portfolio: &Portfolio) -> Self {
        Self {
            cash_balance: portfolio.cash_balance,
            total_value: portfolio.total_value,
            positions: portfolio
                .positions
                .values()
                .map(|p| SerializedPosition {
                    coin_id: p.coin_id,
                    quantity: p.quantity,
                    average_price: p.average_price,
                    entry_date: Some(p.entry_date),
                })
                .collect(),
        }
    }
}

impl From<SerializedPortfolio> for Portfolio {
    fn from(serialized: SerializedPortfolio) -> Self {
        let positions = serialized
            .positions
            .into_iter()
            .map(|p| {
                (
                    p.coin_id,
                    Position {
                        coin_id: p.coin_id,
                        quantity: p.quantity,
                        average_price: p.average_price,
                        total_value: p.quantity * p.average_price,
                        entry_date: p.entry_date.unwrap_or_default(),
                    },
                )
            })
            .collect();

        Self {
            cash_balance: serialized.cash_balance,
            positions,
            total_value: serialized.total_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mark_to_market_recomputes_total_value() {
        let mut portfolio = Portfolio::new(dec!(100));
        portfolio.positions.insert(
            1,
            Position::opened_by_buy(1, dec!(2), dec!(10), chrono::DateTime::<chrono::Utc>::MIN_UTC),
        );
        portfolio.cash_balance = dec!(80);

        let mut marks = HashMap::new();
        marks.insert(1, dec!(15));
        portfolio.mark_to_market(&marks);

        assert_eq!(portfolio.total_value, dec!(110));
        assert!(portfolio.is_consistent(dec!(0.000001)));
    }

    #[test]
    fn round_trips_through_serialized_form() {
        let mut portfolio = Portfolio::new(dec!(1000));
        portfolio.positions.insert(
            7,
            Position::opened_by_buy(7, dec!(3), dec!(20), chrono::DateTime::<chrono::Utc>::MIN_UTC),
        );

        let serialized = SerializedPortfolio::from(&portfolio);
        let restored: Portfolio = serialized.into();

        assert_eq!(restored.cash_balance, portfolio.cash_balance);
        assert_eq!(restored.positions.get(&7).unwrap().quantity, dec!(3));
        assert_eq!(restored.positions.get(&7).unwrap().average_price, dec!(20));
    }
}
