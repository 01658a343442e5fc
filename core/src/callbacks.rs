use crate::checkpoint::CheckpointState;
use crate::error::BacktestError;
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use backtest_execution::trade::Trade;

/// Everything accumulated since the previous checkpoint (or run start), handed to
/// [`CheckpointSink::on_checkpoint`] alongside the full [`CheckpointState`].
#[derive(Debug, Clone, Default)]
pub struct IncrementalResults {
    pub trades: Vec<Trade>,
    pub snapshots: Vec<Snapshot>,
}

/// Must durably persist both `state` and `incremental` before resolving — the orchestrator
/// clears its in-memory trade/snapshot arrays immediately after this returns `Ok`, so a
/// failure here must propagate rather than be swallowed.
#[async_trait]
pub trait CheckpointSink: Send {
    async fn on_checkpoint(
        &mut self,
        state: &CheckpointState,
        incremental: &IncrementalResults,
        total_timestamps: usize,
    ) -> Result<(), BacktestError>;
}

/// Live-replay-only: checked before the next bar is processed. Errors are retried in-band;
/// after three consecutive failures the orchestrator forces a precautionary pause.
#[async_trait]
pub trait PauseController: Send {
    async fn should_pause(&mut self) -> Result<bool, BacktestError>;

    /// Called exactly once per paused run, before the orchestrator returns.
    async fn on_paused(&mut self, state: &CheckpointState) -> Result<(), BacktestError>;
}

/// Fire-and-forget liveness signal; not expected to persist anything.
#[async_trait]
pub trait HeartbeatSink: Send {
    async fn on_heartbeat(&mut self, processed_index: usize, total_trading_timestamps: usize);
}
