use backtest_analytics::accumulator::PersistedCounts;
use backtest_execution::portfolio::SerializedPortfolio;
use backtest_risk::throttle::ThrottleState;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A self-contained, checksummed snapshot of everything needed to resume a run exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub last_processed_index: usize,
    pub last_processed_timestamp: DateTime<Utc>,
    pub portfolio: SerializedPortfolio,
    pub peak_value: Decimal,
    pub max_drawdown: Decimal,
    pub rng_state: u32,
    pub persisted_counts: PersistedCounts,
    pub throttle_state: Option<ThrottleState>,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointValidation {
    pub valid: bool,
    pub reason: Option<&'static str>,
}

impl CheckpointValidation {
    fn ok() -> Self {
        Self { valid: true, reason: None }
    }

    fn rejected(reason: &'static str) -> Self {
        Self { valid: false, reason: Some(reason) }
    }
}

/// Fields hashed into the checksum, in the fixed order the canonical-JSON contract requires.
/// Built once here and reused by both [`build`] and [`validate`] so there is exactly one
/// place that can drift.
#[derive(Serialize)]
struct ChecksumFields<'a> {
    last_processed_index: usize,
    last_processed_timestamp: DateTime<Utc>,
    cash_balance: Decimal,
    position_count: usize,
    peak_value: Decimal,
    max_drawdown: Decimal,
    rng_state: u32,
    throttle_state: Option<&'a str>,
}

fn checksum(
    last_processed_index: usize,
    last_processed_timestamp: DateTime<Utc>,
    cash_balance: Decimal,
    position_count: usize,
    peak_value: Decimal,
    max_drawdown: Decimal,
    rng_state: u32,
    throttle_state_json: Option<&str>,
) -> String {
    let fields = ChecksumFields {
        last_processed_index,
        last_processed_timestamp,
        cash_balance,
        position_count,
        peak_value,
        max_drawdown,
        rng_state,
        throttle_state: throttle_state_json,
    };
    let canonical = serde_json::to_string(&fields).expect("checksum fields always serialize");
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)[..16].to_string()
}

#[allow(clippy::too_many_arguments)]
pub fn build(
    last_processed_index: usize,
    last_processed_timestamp: DateTime<Utc>,
    portfolio: SerializedPortfolio,
    peak_value: Decimal,
    max_drawdown: Decimal,
    rng_state: u32,
    persisted_counts: PersistedCounts,
    throttle_state: Option<ThrottleState>,
) -> CheckpointState {
    let throttle_json = throttle_state.as_ref().map(|s| serde_json::to_string(s).expect("throttle state serializes"));

    let checksum = checksum(
        last_processed_index,
        last_processed_timestamp,
        portfolio.cash_balance,
        portfolio.positions.len(),
        peak_value,
        max_drawdown,
        rng_state,
        throttle_json.as_deref(),
    );

    CheckpointState {
        last_processed_index,
        last_processed_timestamp,
        portfolio,
        peak_value,
        max_drawdown,
        rng_state,
        persisted_counts,
        throttle_state,
        checksum,
    }
}

pub fn validate(state: &CheckpointState, all_timestamps: &[DateTime<Utc>]) -> CheckpointValidation {
    let Some(expected_timestamp) = all_timestamps.get(state.last_processed_index) else {
        return CheckpointValidation::rejected("out-of-bounds");
    };
    if *expected_timestamp != state.last_processed_timestamp {
        return CheckpointValidation::rejected("timestamp-mismatch");
    }

    let throttle_json = state
        .throttle_state
        .as_ref()
        .map(|s| serde_json::to_string(s).expect("throttle state serializes"));

    let recomputed = checksum(
        state.last_processed_index,
        state.last_processed_timestamp,
        state.portfolio.cash_balance,
        state.portfolio.positions.len(),
        state.peak_value,
        state.max_drawdown,
        state.rng_state,
        throttle_json.as_deref(),
    );

    if recomputed != state.checksum {
        return CheckpointValidation::rejected("checksum-failed");
    }

    CheckpointValidation::ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use rust_decimal_macros::dec;

    fn sample_state(timestamps: &[DateTime<Utc>]) -> CheckpointState {
        let portfolio = SerializedPortfolio {
            cash_balance: dec!(1000),
            total_value: dec!(1000),
            positions: vec![],
        };
        build(
            0,
            timestamps[0],
            portfolio,
            dec!(1000),
            Decimal::ZERO,
            42,
            PersistedCounts::default(),
            None,
        )
    }

    #[test]
    fn round_trips_as_valid() {
        let timestamps = vec![DateTime::<Utc>::MIN_UTC];
        let state = sample_state(&timestamps);
        assert_eq!(validate(&state, &timestamps), CheckpointValidation::ok());
    }

    #[test]
    fn mutating_cash_balance_invalidates_checksum() {
        let timestamps = vec![DateTime::<Utc>::MIN_UTC];
        let mut state = sample_state(&timestamps);
        state.portfolio.cash_balance += dec!(10);
        let result = validate(&state, &timestamps);
        assert!(!result.valid);
        assert_eq!(result.reason, Some("checksum-failed"));
    }

    #[test]
    fn out_of_bounds_index_is_rejected() {
        let timestamps = vec![DateTime::<Utc>::MIN_UTC];
        let mut state = sample_state(&timestamps);
        state.last_processed_index = 5;
        let result = validate(&state, &timestamps);
        assert_eq!(result.reason, Some("out-of-bounds"));
    }

    #[test]
    fn timestamp_mismatch_is_rejected() {
        let timestamps = vec![DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MIN_UTC + TimeDelta::days(1)];
        let mut state = sample_state(&timestamps);
        state.last_processed_timestamp = timestamps[1];
        let result = validate(&state, &timestamps);
        assert_eq!(result.reason, Some("timestamp-mismatch"));
    }
}
