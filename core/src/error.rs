//! # Core error types
//!
//! Aggregates the failures that can propagate out of a [`crate::orchestrator`] run. Trade
//! rejections (missing price, insufficient cash, hold period) are data, not errors — see
//! [`backtest_execution::error::ExecutionError`] — and never appear here; only the handful
//! of conditions the error-handling design calls fatal or propagate-worthy do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BacktestError {
    /// No algorithm was registered for the requested id; fatal, re-thrown without retry.
    #[error("algorithm not registered: {0}")]
    AlgorithmNotRegistered(String),

    /// The algorithm exceeded its per-bar timeout or returned `success: false` more than
    /// `max_consecutive_errors` times in a row.
    #[error("algorithm execution failed after {consecutive} consecutive errors: {message}")]
    AlgorithmExecutionFailed { consecutive: u32, message: String },

    /// `onCheckpoint` did not resolve successfully; the orchestrator never swallows this,
    /// since swallowing it would clear in-memory arrays without a durable copy existing.
    #[error("checkpoint callback failed: {0}")]
    CheckpointCallbackFailed(String),

    /// A resumed checkpoint failed `validate` — caller must start fresh or pick another one.
    #[error("checkpoint validation failed: {0}")]
    CheckpointValidation(&'static str),

    /// The candle/object-store read layer failed or exceeded its timeout; fatal.
    #[error("storage read failed: {0}")]
    StorageRead(String),

    #[error("channel receiver dropped")]
    RxDropped,

    #[error("task join failed: {0}")]
    JoinError(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BacktestError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::RxDropped
    }
}

impl From<tokio::task::JoinError> for BacktestError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(format!("{value:?}"))
    }
}
