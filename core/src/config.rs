use backtest_execution::fee::FeeSchedule;
use backtest_execution::slippage::SlippageModel;
use backtest_risk::opportunity::OpportunitySellConfig;
use backtest_risk::regime::RegimeGate;
use backtest_risk::stop_loss::HardStopLossConfig;
use backtest_risk::throttle::ThrottleConfig;
use chrono::TimeDelta;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Replay pacing multiplier. `MaxSpeed` disables the pacing sleep entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ReplaySpeed {
    #[serde(rename = "1x")]
    X1,
    #[serde(rename = "5x")]
    X5,
    #[serde(rename = "10x")]
    X10,
    #[serde(rename = "50x")]
    X50,
    MaxSpeed,
}

impl ReplaySpeed {
    pub fn multiplier(self) -> Option<u32> {
        match self {
            ReplaySpeed::X1 => Some(1),
            ReplaySpeed::X5 => Some(5),
            ReplaySpeed::X10 => Some(10),
            ReplaySpeed::X50 => Some(50),
            ReplaySpeed::MaxSpeed => None,
        }
    }
}

/// Which of the three loop variants an orchestrator run uses. Historical and optimization
/// are identical to live-replay minus pacing and the pause check (and optimization further
/// skips per-signal recording and samples snapshots less often).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RunMode {
    Historical,
    LiveReplay,
    Optimization,
}

impl RunMode {
    pub fn default_checkpoint_interval(self) -> u64 {
        match self {
            RunMode::Historical | RunMode::Optimization => 500,
            RunMode::LiveReplay => 100,
        }
    }
}

/// Every recognized, defaulted configuration key for one backtest run.
///
/// Not itself part of the checkpoint wire format (only run state is persisted, per the
/// checkpoint codec contract), so this struct carries no serde derive.
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_capital: Decimal,
    pub mode: RunMode,
    pub trading_start_index: usize,

    pub min_hold: TimeDelta,
    pub max_allocation: Decimal,
    pub min_allocation: Decimal,

    pub hard_stop_loss: HardStopLossConfig,
    pub regime_gate: RegimeGate,
    pub throttle: ThrottleConfig,
    pub opportunity: OpportunitySellConfig,

    pub checkpoint_interval: u64,
    pub replay_speed: ReplaySpeed,
    pub base_interval_ms: u64,

    pub fee_schedule: FeeSchedule,
    pub slippage_model: SlippageModel,

    pub algorithm_timeout: TimeDelta,
    pub max_consecutive_errors: u32,
    pub max_consecutive_pause_failures: u32,
    pub heartbeat_interval: TimeDelta,
    pub snapshot_interval_bars: i64,

    pub deterministic_seed: String,
}

impl BacktestConfig {
    pub fn new(initial_capital: Decimal, mode: RunMode, deterministic_seed: impl Into<String>) -> Self {
        Self {
            initial_capital,
            mode,
            trading_start_index: 0,
            min_hold: TimeDelta::hours(24),
            max_allocation: dec!(0.12),
            min_allocation: dec!(0.03),
            hard_stop_loss: HardStopLossConfig::default(),
            regime_gate: RegimeGate::default(),
            throttle: ThrottleConfig::default(),
            opportunity: OpportunitySellConfig::default(),
            checkpoint_interval: mode.default_checkpoint_interval(),
            replay_speed: ReplaySpeed::X1,
            base_interval_ms: 1000,
            fee_schedule: FeeSchedule::Flat { rate: Decimal::ZERO },
            slippage_model: SlippageModel::None,
            algorithm_timeout: TimeDelta::seconds(60),
            max_consecutive_errors: 10,
            max_consecutive_pause_failures: 3,
            heartbeat_interval: TimeDelta::seconds(30),
            snapshot_interval_bars: 24,
            deterministic_seed: deterministic_seed.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_interval_defaults_by_mode() {
        assert_eq!(RunMode::Historical.default_checkpoint_interval(), 500);
        assert_eq!(RunMode::LiveReplay.default_checkpoint_interval(), 100);
        assert_eq!(RunMode::Optimization.default_checkpoint_interval(), 500);
    }

    #[test]
    fn new_applies_spec_defaults() {
        let config = BacktestConfig::new(dec!(10_000), RunMode::Historical, "seed");
        assert_eq!(config.max_allocation, dec!(0.12));
        assert_eq!(config.min_allocation, dec!(0.03));
        assert_eq!(config.checkpoint_interval, 500);
        assert_eq!(config.max_consecutive_errors, 10);
    }
}
