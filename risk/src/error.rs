use thiserror::Error;

/// Why a signal never reached the executor. Not a `std::error::Error` failure mode for the
/// run — these are expected, logged-at-debug outcomes of the throttle and regime gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RiskRejection {
    #[error("sell fraction below the configured minimum")]
    BelowMinSellFraction,
    #[error("coin/action is within its cooldown window")]
    Cooldown,
    #[error("coin has reached its daily trade cap")]
    DailyCapReached,
    #[error("BUY blocked by risk-off market regime")]
    RiskOffRegime,
}
