use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Flat-rate or maker/taker tiered fee schedule. Fees are always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum FeeSchedule {
    Flat { rate: Decimal },
    Tiered { maker_rate: Decimal, taker_rate: Decimal },
}

impl FeeSchedule {
    /// Computes the absolute fee owed on a trade of the given notional value.
    pub fn calculate(&self, trade_value: Decimal, is_maker: bool) -> Decimal {
        let rate = match self {
            FeeSchedule::Flat { rate } => *rate,
            FeeSchedule::Tiered { maker_rate, taker_rate } => {
                if is_maker {
                    *maker_rate
                } else {
                    *taker_rate
                }
            }
        };

        (trade_value.abs() * rate).max(Decimal::ZERO)
    }
}
