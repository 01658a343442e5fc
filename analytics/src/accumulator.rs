//! Incremental metrics accumulator (component C12).
//!
//! Accumulates trade counts, gross P&L and the portfolio-value snapshot series
//! across the whole run — surviving checkpoint/resume because its fields are
//! exactly the `persistedCounts` of a checkpoint (see `backtest-core::checkpoint`) — and
//! assembles the final performance report on demand.

use crate::{
    metric::{drawdown::DrawdownTracker, profit_factor::ProfitFactor, sharpe::SharpeRatio, win_rate::WinRate},
    time::{Annual252, TimeInterval},
};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

/// The subset of a committed trade that the accumulator needs: whether it was a SELL, and
/// its realized P&L if so. Kept intentionally minimal so this crate has no dependency on
/// `backtest-core`'s richer `Trade` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeOutcome {
    pub is_sell: bool,
    pub realized_pnl: Option<Decimal>,
}

/// Cumulative counts persisted in a checkpoint (`persistedCounts` in spec terms).
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct PersistedCounts {
    pub trades: u64,
    pub signals: u64,
    pub fills: u64,
    pub snapshots: u64,
    pub sells: u64,
    pub winning_sells: u64,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsAccumulator {
    counts: PersistedCounts,
    snapshot_values: Vec<Decimal>,
    drawdown: DrawdownTracker,
}

impl MetricsAccumulator {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            counts: PersistedCounts::default(),
            snapshot_values: Vec::new(),
            drawdown: DrawdownTracker::new(initial_capital),
        }
    }

    /// Restores an accumulator from a resumed checkpoint's persisted counts and drawdown
    /// state. `snapshot_values` is intentionally not part of the checkpoint (it would grow
    /// unbounded in the persisted record) and is rebuilt from the harvested snapshots of
    /// the resumed portion of the run.
    pub fn from_checkpoint(counts: PersistedCounts, peak_value: Decimal, max_drawdown: Decimal) -> Self {
        Self {
            counts,
            snapshot_values: Vec::new(),
            drawdown: DrawdownTracker::from_checkpoint(peak_value, max_drawdown),
        }
    }

    pub fn counts(&self) -> PersistedCounts {
        self.counts
    }

    pub fn peak_value(&self) -> Decimal {
        self.drawdown.peak_value()
    }

    pub fn max_drawdown(&self) -> Decimal {
        self.drawdown.max_drawdown()
    }

    /// Must be called every bar with the mark-to-market portfolio value, independent of
    /// checkpoint cadence, so drawdown stays accurate even across a long checkpoint interval.
    pub fn observe_value(&mut self, portfolio_value: Decimal) {
        self.drawdown.update(portfolio_value);
    }

    /// Called every checkpoint, before the orchestrator clears its in-memory trade and
    /// snapshot arrays: increments counts, splits SELLs by sign of `realizedPnL`, and
    /// appends each snapshot's portfolio value to the running series.
    pub fn harvest(&mut self, trades: &[TradeOutcome], snapshot_values: &[Decimal]) {
        for trade in trades {
            self.counts.trades += 1;
            if trade.is_sell {
                self.counts.sells += 1;
                if let Some(pnl) = trade.realized_pnl {
                    if pnl.is_sign_positive() && !pnl.is_zero() {
                        self.counts.winning_sells += 1;
                        self.counts.gross_profit += pnl;
                    } else if pnl.is_sign_negative() {
                        self.counts.gross_loss += pnl.abs();
                    }
                }
            }
        }

        self.counts.snapshots += snapshot_values.len() as u64;
        self.snapshot_values.extend_from_slice(snapshot_values);
    }

    pub fn record_signal(&mut self) {
        self.counts.signals += 1;
    }

    pub fn record_fill(&mut self) {
        self.counts.fills += 1;
    }

    /// Per-period returns derived from the snapshot series: `(v[i] - v[i-1]) / v[i-1]`, `0`
    /// if the previous value was `0`.
    fn returns(&self) -> Vec<Decimal> {
        self.snapshot_values
            .windows(2)
            .map(|pair| {
                let (prev, curr) = (pair[0], pair[1]);
                if prev.is_zero() {
                    Decimal::ZERO
                } else {
                    (curr - prev) / prev
                }
            })
            .collect()
    }

    /// Assembles the final performance report.
    ///
    /// `period_interval` is the [`TimeInterval`] each snapshot represents (e.g. a day, if
    /// snapshots are daily); it both fixes the Sharpe ratio's native period and, via its
    /// ratio against [`Annual252`], the annualization factor used for `volatility`.
    pub fn finalize<Interval: TimeInterval>(
        &self,
        initial_capital: Decimal,
        final_value: Decimal,
        duration_days: Decimal,
        risk_free_return: Decimal,
        period_interval: Interval,
    ) -> FinalMetrics<Interval> {
        let total_return = if initial_capital.is_zero() {
            Decimal::ZERO
        } else {
            (final_value - initial_capital) / initial_capital
        };

        let annualized_return = if duration_days.is_sign_positive() && !duration_days.is_zero() {
            let base = Decimal::ONE + total_return;
            let exponent = Decimal::from(365) / duration_days;
            base.checked_powd(exponent).unwrap_or(total_return)
        } else {
            total_return
        };

        let returns = self.returns();
        let mean_return = mean(&returns);
        let std_dev_returns = std_dev(&returns, mean_return);

        let sharpe = SharpeRatio::calculate(risk_free_return, mean_return, std_dev_returns, period_interval);

        let annual_factor = (Annual252.interval().num_seconds() as f64
            / period_interval.interval().num_seconds().max(1) as f64)
            .sqrt();
        let volatility = std_dev_returns * Decimal::try_from(annual_factor).unwrap_or(Decimal::ONE);

        let profit_factor = ProfitFactor::calculate(self.counts.gross_profit, self.counts.gross_loss);
        let win_rate = WinRate::calculate(
            Decimal::from(self.counts.winning_sells),
            Decimal::from(self.counts.sells),
        );

        FinalMetrics {
            total_trade_count: self.counts.trades,
            total_sell_count: self.counts.sells,
            total_winning_sell_count: self.counts.winning_sells,
            total_return,
            annualized_return,
            sharpe,
            volatility,
            profit_factor,
            win_rate,
            max_drawdown: self.drawdown.max_drawdown(),
        }
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        Decimal::ZERO
    } else {
        values.iter().sum::<Decimal>() / Decimal::from(values.len())
    }
}

/// Sample standard deviation (n-1 denominator); `0` for fewer than two observations.
fn std_dev(values: &[Decimal], mean_value: Decimal) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }

    let variance = values
        .iter()
        .map(|v| (*v - mean_value) * (*v - mean_value))
        .sum::<Decimal>()
        / Decimal::from(values.len() - 1);

    variance.sqrt().unwrap_or(Decimal::ZERO)
}

/// Final, point-in-time performance report for a completed (or paused) backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalMetrics<Interval> {
    pub total_trade_count: u64,
    pub total_sell_count: u64,
    pub total_winning_sell_count: u64,
    pub total_return: Decimal,
    pub annualized_return: Decimal,
    pub sharpe: SharpeRatio<Interval>,
    pub volatility: Decimal,
    pub profit_factor: ProfitFactor,
    pub win_rate: WinRate,
    pub max_drawdown: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Daily;
    use rust_decimal_macros::dec;

    fn outcome(is_sell: bool, pnl: Option<Decimal>) -> TradeOutcome {
        TradeOutcome { is_sell, realized_pnl: pnl }
    }

    #[test]
    fn harvest_splits_sells_by_pnl_sign() {
        let mut acc = MetricsAccumulator::new(dec!(1000));
        acc.harvest(
            &[
                outcome(false, None),
                outcome(true, Some(dec!(50))),
                outcome(true, Some(dec!(-20))),
            ],
            &[dec!(1030)],
        );

        let counts = acc.counts();
        assert_eq!(counts.trades, 3);
        assert_eq!(counts.sells, 2);
        assert_eq!(counts.winning_sells, 1);
        assert_eq!(counts.gross_profit, dec!(50));
        assert_eq!(counts.gross_loss, dec!(20));
    }

    #[test]
    fn finalize_on_empty_run_is_well_defined() {
        let acc = MetricsAccumulator::new(dec!(1000));
        let metrics = acc.finalize(dec!(1000), dec!(1000), Decimal::ZERO, dec!(0.0), Daily);
        assert_eq!(metrics.total_return, Decimal::ZERO);
        assert_eq!(metrics.win_rate.value, Decimal::ZERO);
        assert_eq!(metrics.profit_factor.value, Decimal::ONE);
    }

    #[test]
    fn observe_value_tracks_drawdown_independent_of_harvest() {
        let mut acc = MetricsAccumulator::new(dec!(1000));
        acc.observe_value(dec!(1200));
        acc.observe_value(dec!(900));
        assert_eq!(acc.max_drawdown(), dec!(0.25));
    }
}
