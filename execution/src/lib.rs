#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments)]

//! # Execution - trade execution primitives
//!
//! The leaf crate of the workspace: candles, prices, fees, slippage, positions, the
//! portfolio, and the trade executor choke-point that mutates it. Nothing here depends on
//! a risk policy or an orchestrator — those are built on top, in the `risk` and `core`
//! crates respectively.
//!
//! ## Main components
//!
//! * [`market`] — [`market::Candle`] and the [`market::PriceSummary`] window fed to algorithms.
//! * [`slippage`] — pluggable [`slippage::SlippageModel`]s (none, fixed, volume-based, historical).
//! * [`fee`] — flat and maker/taker [`fee::FeeSchedule`]s.
//! * [`position`] — weighted-average-cost [`position::Position`] accounting.
//! * [`portfolio`] — [`portfolio::Portfolio`], the cash + positions ledger.
//! * [`signal`] — [`signal::TradingSignal`], the algorithm's output unit.
//! * [`trade`] — [`trade::Trade`], the immutable record of an executed order.
//! * [`executor`] — [`executor::execute_trade`], the single choke-point every trade passes through.
//!
//! ## Example
//!
//! ```
//! use backtest_execution::executor::{execute_trade, SizingRng, TradeExecutionInput};
//! use backtest_execution::fee::FeeSchedule;
//! use backtest_execution::market::MarketData;
//! use backtest_execution::portfolio::Portfolio;
//! use backtest_execution::position::Position;
//! use backtest_execution::signal::{SignalAction, SignalOrigin, TradingSignal};
//! use backtest_execution::slippage::SlippageModel;
//! use chrono::{DateTime, Utc};
//! use rust_decimal::Decimal;
//! use rust_decimal_macros::dec;
//! use std::collections::HashMap;
//!
//! struct AlwaysHalf;
//! impl SizingRng for AlwaysHalf {
//!     fn next_unit(&mut self) -> Decimal {
//!         dec!(0.5)
//!     }
//! }
//!
//! let mut portfolio = Portfolio::new(Decimal::ZERO);
//! portfolio
//!     .positions
//!     .insert(1, Position::opened_by_buy(1, dec!(10), dec!(10), DateTime::<Utc>::MIN_UTC));
//! portfolio.total_value = dec!(100);
//!
//! let signal = TradingSignal {
//!     action: SignalAction::Sell,
//!     coin_id: 1,
//!     quantity: Some(dec!(4)),
//!     percentage: None,
//!     confidence: None,
//!     reason: "example".into(),
//!     metadata: HashMap::new(),
//!     origin: SignalOrigin::Algorithm,
//! };
//! let mut prices = HashMap::new();
//! prices.insert(1u32, dec!(15));
//! let market = MarketData { prices };
//! let fee_schedule = FeeSchedule::Flat { rate: Decimal::ZERO };
//! let slippage = SlippageModel::None;
//! let mut rng = AlwaysHalf;
//!
//! let executed = execute_trade(
//!     &mut portfolio,
//!     TradeExecutionInput {
//!         signal: &signal,
//!         market_data: &market,
//!         fee_schedule: &fee_schedule,
//!         slippage_model: &slippage,
//!         rng: &mut rng,
//!         daily_volume: None,
//!         min_hold: chrono::TimeDelta::zero(),
//!         max_allocation: dec!(0.12),
//!         min_allocation: dec!(0.03),
//!         now: DateTime::<Utc>::MIN_UTC + chrono::TimeDelta::days(1),
//!     },
//! )
//! .unwrap();
//!
//! assert_eq!(executed.trade.realized_pnl, Some(dec!(20)));
//! ```

pub mod error;
pub mod executor;
pub mod fee;
pub mod market;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod slippage;
pub mod trade;
