use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Ratio of gross profit to gross loss, capped at `10` to keep degenerate runs (near-zero
/// losses) from producing an unbounded number.
///
/// Special cases:
/// - both gross profit and gross loss are zero -> `1` (neutral, no trades to judge)
/// - gross loss is zero but gross profit is positive -> `10` (capped "perfect" case)
/// - otherwise -> `min(grossProfit / grossLoss, 10)`
///
/// Reference: <https://www.investopedia.com/articles/fundamental-analysis/10/strategy-performance-reports.asp#toc-profit-factor>
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct ProfitFactor {
    pub value: Decimal,
}

const CAP: Decimal = dec!(10);

impl ProfitFactor {
    /// Calculates the [`ProfitFactor`] from absolute gross profit and gross loss.
    pub fn calculate(gross_profit_abs: Decimal, gross_loss_abs: Decimal) -> Self {
        let gross_profit_abs = gross_profit_abs.abs();
        let gross_loss_abs = gross_loss_abs.abs();

        let value = if gross_loss_abs.is_zero() {
            if gross_profit_abs.is_zero() {
                Decimal::ONE
            } else {
                CAP
            }
        } else {
            (gross_profit_abs / gross_loss_abs).min(CAP)
        };

        Self { value }
    }
}
