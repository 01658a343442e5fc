use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Win rate between 0 and 1, calculated as `wins / total`.
///
/// Returns `0` (not `None`) when there have been no SELL trades yet, so a fresh
/// [`MetricsAccumulator`](crate::accumulator::MetricsAccumulator) always has a well-defined
/// `WinRate` to report.
///
/// Reference: <https://www.investopedia.com/terms/w/win-loss-ratio.asp>
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct WinRate {
    pub value: Decimal,
}

impl WinRate {
    /// Calculates the [`WinRate`] from the number of winning sells and total sells.
    pub fn calculate(winning_sells: Decimal, total_sells: Decimal) -> Self {
        if total_sells.is_zero() {
            Self { value: Decimal::ZERO }
        } else {
            Self {
                value: winning_sells.abs() / total_sells.abs(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn no_trades_is_zero() {
        assert_eq!(WinRate::calculate(Decimal::ZERO, Decimal::ZERO).value, Decimal::ZERO);
    }

    #[test]
    fn all_winning_trades() {
        assert_eq!(WinRate::calculate(Decimal::TEN, Decimal::TEN).value, Decimal::ONE);
    }

    #[test]
    fn no_winning_trades() {
        assert_eq!(WinRate::calculate(Decimal::ZERO, Decimal::TEN).value, Decimal::ZERO);
    }

    #[test]
    fn mixed_winning_and_losing_trades() {
        assert_eq!(WinRate::calculate(dec!(6), Decimal::TEN).value, dec!(0.6));
    }
}
