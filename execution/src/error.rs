use thiserror::Error;

/// Reasons a candidate trade never reaches the portfolio. These are rejections, not panics:
/// the orchestrator treats every variant as "no trade happened, continue the bar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("no price available for the signal's coin")]
    MissingPrice,
    #[error("insufficient cash to cover trade value plus fee")]
    InsufficientCash,
    #[error("minimum hold period has not elapsed")]
    HoldPeriodNotMet,
    #[error("no open position to sell")]
    NoPosition,
    #[error("signal carried neither quantity, percentage nor confidence to size from")]
    Unsizable,
}
