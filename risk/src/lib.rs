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

//! # Risk - signal filtering and defensive selling
//!
//! Everything that stands between an algorithm's [`TradingSignal`](backtest_execution::signal::TradingSignal)
//! and the trade executor:
//!
//! * [`throttle`] — per-coin cooldown, daily trade cap, minimum sell fraction.
//! * [`regime`] — BTC trend/volatility composite gate that can block BUYs.
//! * [`stop_loss`] — wick-aware hard stop-loss signal generator, evaluated before the algorithm runs.
//! * [`opportunity`] — liquidates weak positions to cover a BUY that failed on cash, then lets
//!   the orchestrator retry that BUY exactly once.
//!
//! None of these components execute trades themselves; they only decide whether and what to
//! hand to [`backtest_execution::executor::execute_trade`].

pub mod error;
pub mod opportunity;
pub mod regime;
pub mod stop_loss;
pub mod throttle;
