use crate::config::ReplaySpeed;

/// Converts a replay speed into the live-replay per-bar delay. Holds no other state; the
/// orchestrator calls [`PacingController::sleep`] at most once per bar, skipping the first
/// trading bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacingController;

impl PacingController {
    pub fn delay_ms(base_interval_ms: u64, speed: ReplaySpeed) -> u64 {
        match speed.multiplier() {
            None => 0,
            Some(multiplier) => (base_interval_ms + u64::from(multiplier) / 2) / u64::from(multiplier),
        }
    }

    pub async fn sleep(base_interval_ms: u64, speed: ReplaySpeed) {
        let delay = Self::delay_ms(base_interval_ms, speed);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
    }
}
