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
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]
//! # Core — the backtest orchestration engine
//!
//! Owns the bar-by-bar state machine that drives a deterministic trading-strategy backtest:
//! a deterministic seeded RNG, the algorithm contract, run configuration, the sliding
//! price-window tracker, live-replay pacing, checkpoint/resume with checksum validation,
//! point-in-time snapshots, and the 14-step bar loop itself.
//!
//! ```
//! use backtest_core::config::{BacktestConfig, RunMode};
//! use backtest_core::rng::Rng;
//! use rust_decimal_macros::dec;
//!
//! let config = BacktestConfig::new(dec!(10_000), RunMode::Historical, "demo-seed");
//! let mut rng = Rng::from_seed(&config.deterministic_seed);
//! let draw = rng.next_unit();
//! assert!(draw >= rust_decimal::Decimal::ZERO);
//! ```

/// Deterministic, restorable 32-bit PRNG used for RNG-fallback order sizing.
pub mod rng;

/// The algorithm contract: context handed to a strategy each bar, and its signal output.
pub mod algorithm;

/// Every recognized, defaulted configuration key for one backtest run.
pub mod config;

/// Per-coin sliding price-summary windows, advanced bar by bar.
pub mod price_window;

/// Live-replay pacing: converts a replay speed into a per-bar delay.
pub mod pacing;

/// Checkpoint state, checksum computation, and resume validation.
pub mod checkpoint;

/// Point-in-time portfolio snapshots.
pub mod snapshot;

/// Orchestrator-level error types.
pub mod error;

/// `tracing` setup for the backtest engine.
pub mod logging;

/// Async callback traits the orchestrator drives: checkpointing, pausing, heartbeats.
pub mod callbacks;

/// The bar loop orchestrator (component C14).
pub mod orchestrator;
