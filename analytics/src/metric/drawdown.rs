use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tracks the running peak portfolio value and the maximum peak-to-trough drawdown seen so
/// far, as a fraction of the peak (`0` = no drawdown, `1` = total loss).
///
/// `maxDrawdown` is tracked live, bar by bar, as `max((peakValue - totalValue) / peakValue)`
/// rather than recomputed from the full value history at the end of the run, so it survives
/// checkpoint/resume without needing the whole snapshot series in memory.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DrawdownTracker {
    peak_value: Decimal,
    max_drawdown: Decimal,
}

impl DrawdownTracker {
    pub fn new(initial_value: Decimal) -> Self {
        Self {
            peak_value: initial_value,
            max_drawdown: Decimal::ZERO,
        }
    }

    /// Restores a tracker from persisted checkpoint fields.
    pub fn from_checkpoint(peak_value: Decimal, max_drawdown: Decimal) -> Self {
        Self {
            peak_value,
            max_drawdown,
        }
    }

    /// Feeds a new portfolio value observation, updating the peak and max drawdown.
    pub fn update(&mut self, portfolio_value: Decimal) {
        if portfolio_value > self.peak_value {
            self.peak_value = portfolio_value;
        }

        if self.peak_value.is_zero() {
            return;
        }

        let drawdown = (self.peak_value - portfolio_value) / self.peak_value;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    pub fn peak_value(&self) -> Decimal {
        self.peak_value
    }

    pub fn max_drawdown(&self) -> Decimal {
        self.max_drawdown
    }

    /// The current drawdown fraction relative to the peak (not the running max).
    pub fn current_drawdown(&self, portfolio_value: Decimal) -> Decimal {
        if self.peak_value.is_zero() {
            Decimal::ZERO
        } else {
            (self.peak_value - portfolio_value) / self.peak_value
        }
    }
}
