//! # Logging configuration
//!
//! Standardized `tracing` setup for the backtest engine: human-readable or JSON output,
//! `RUST_LOG`-driven level filtering, and a noise filter that drops the high-frequency
//! per-bar mark-to-market span the orchestrator emits at TRACE level.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use backtest_core::logging::init_logging;
//!
//! fn main() {
//!     init_logging();
//!     tracing::info!("backtest run started");
//! }
//! ```
//!
//! ### JSON logging (aggregators / observability)
//! ```rust,ignore
//! use backtest_core::logging::init_json_logging;
//!
//! fn main() {
//!     init_json_logging();
//! }
//! ```
//!
//! ### Environment configuration
//! ```bash
//! export RUST_LOG=debug
//! export RUST_LOG=backtest_core=info,backtest_execution=debug
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The per-bar mark-to-market span name filtered out by [`BarNoiseFilter`].
pub const MARK_TO_MARKET_SPAN_NAME: &str = "mark_to_market";

pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(BarNoiseFilter)
        .init()
}

pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .with(BarNoiseFilter)
        .init()
}

/// Drops events emitted from inside the [`MARK_TO_MARKET_SPAN_NAME`] span — every bar hits
/// it, so at TRACE level it would drown out the signal/trade events that actually matter.
struct BarNoiseFilter;

impl<S> tracing_subscriber::layer::Layer<S> for BarNoiseFilter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn event_enabled(&self, _: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) -> bool {
        if let Some(span) = ctx.lookup_current() {
            span.name() != MARK_TO_MARKET_SPAN_NAME
        } else {
            true
        }
    }
}
