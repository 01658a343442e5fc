//! # Performance metrics
//!
//! Metric primitives assembled by [`MetricsAccumulator::finalize`](crate::accumulator::MetricsAccumulator::finalize)
//! into a final [`FinalMetrics`](crate::accumulator::FinalMetrics) report.
//!
//! ```rust
//! use backtest_analytics::metric::sharpe::SharpeRatio;
//! use backtest_analytics::time::Daily;
//! use rust_decimal_macros::dec;
//!
//! let risk_free = dec!(0.0015); // 0.15%
//! let mean_ret  = dec!(0.0025); // 0.25%
//! let std_dev   = dec!(0.0200); // 2.00%
//!
//! let sharpe = SharpeRatio::calculate(risk_free, mean_ret, std_dev, Daily);
//! assert_eq!(sharpe.value, dec!(0.05));
//! ```

/// Running peak-to-trough drawdown tracking.
pub mod drawdown;

/// Gross profit / gross loss ratio.
pub mod profit_factor;

/// Risk-adjusted return: excess return over standard deviation of returns.
pub mod sharpe;

/// Fraction of SELL trades closed at a profit.
pub mod win_rate;
