#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Analytics — incremental metrics accumulator and performance metrics
//!
//! Consumes trade outcomes and portfolio-value snapshots harvested by the orchestrator
//! (`backtest-core`) every checkpoint and assembles a [`FinalMetrics`](accumulator::FinalMetrics)
//! report: total/annualized return, Sharpe ratio, volatility, profit factor, win rate and
//! max drawdown.
//!
//! ```rust
//! use backtest_analytics::accumulator::{MetricsAccumulator, TradeOutcome};
//! use backtest_analytics::time::Daily;
//! use rust_decimal_macros::dec;
//!
//! let mut acc = MetricsAccumulator::new(dec!(1000));
//! acc.observe_value(dec!(1050));
//! acc.harvest(&[TradeOutcome { is_sell: true, realized_pnl: Some(dec!(50)) }], &[dec!(1050)]);
//!
//! let metrics = acc.finalize(dec!(1000), dec!(1050), dec!(30), dec!(0), Daily);
//! assert_eq!(metrics.total_return, dec!(0.05));
//! ```

/// The incremental metrics accumulator (component C12) and its final report type.
pub mod accumulator;

/// Financial metrics: Sharpe ratio, profit factor, win rate, drawdown.
pub mod metric;

/// Time interval definitions used to annualize and scale metrics.
pub mod time;
