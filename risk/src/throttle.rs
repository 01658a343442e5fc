use backtest_execution::signal::{SignalAction, TradingSignal};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThrottleConfig {
    pub cooldown: TimeDelta,
    pub max_trades_per_day: u32,
    pub min_sell_fraction: Decimal,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            cooldown: TimeDelta::milliseconds(86_400_000),
            max_trades_per_day: 6,
            min_sell_fraction: Decimal::new(5, 1),
        }
    }
}

/// Rolling per-`(coin, action)` cooldown timer plus a per-coin 24h trade count, restorable
/// from a checkpoint's `throttleState`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThrottleState {
    last_signal_at: HashMap<(u32, ActionKey), DateTime<Utc>>,
    trades_in_window: HashMap<u32, Vec<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
enum ActionKey {
    Buy,
    Sell,
}

impl From<SignalAction> for ActionKey {
    fn from(action: SignalAction) -> Self {
        match action {
            SignalAction::Buy => ActionKey::Buy,
            SignalAction::Sell | SignalAction::Hold => ActionKey::Sell,
        }
    }
}

impl ThrottleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the four-step throttle algorithm. `sell_fraction` is the caller-resolved
    /// fraction-of-position the signal represents (only consulted for SELL); `now` is the
    /// bar timestamp. Risk-forced signals bypass steps 1-3 but still update bookkeeping.
    pub fn admit(
        &mut self,
        signal: &TradingSignal,
        sell_fraction: Option<Decimal>,
        now: DateTime<Utc>,
        config: &ThrottleConfig,
    ) -> bool {
        if signal.action == SignalAction::Hold {
            return false;
        }

        if !signal.is_risk_forced() {
            // 1. Drop SELLs below the minimum sell fraction.
            if signal.action == SignalAction::Sell {
                if let Some(fraction) = sell_fraction {
                    if fraction < config.min_sell_fraction {
                        return false;
                    }
                }
            }

            // 2. Cooldown.
            let key = (signal.coin_id, ActionKey::from(signal.action));
            if let Some(last) = self.last_signal_at.get(&key) {
                if now - *last < config.cooldown {
                    return false;
                }
            }

            // 3. Daily cap.
            self.evict_stale(signal.coin_id, now);
            let count = self.trades_in_window.get(&signal.coin_id).map(Vec::len).unwrap_or(0);
            if count as u32 >= config.max_trades_per_day {
                return false;
            }
        }

        // 4. Accept: update bookkeeping.
        let key = (signal.coin_id, ActionKey::from(signal.action));
        self.last_signal_at.insert(key, now);
        self.evict_stale(signal.coin_id, now);
        self.trades_in_window.entry(signal.coin_id).or_default().push(now);

        true
    }

    fn evict_stale(&mut self, coin_id: u32, now: DateTime<Utc>) {
        if let Some(window) = self.trades_in_window.get_mut(&coin_id) {
            let cutoff = now - TimeDelta::hours(24);
            window.retain(|t| *t >= cutoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn signal(coin_id: u32, action: SignalAction) -> TradingSignal {
        TradingSignal {
            action,
            coin_id,
            quantity: None,
            percentage: None,
            confidence: None,
            reason: "test".into(),
            metadata: Map::new(),
            origin: backtest_execution::signal::SignalOrigin::Algorithm,
        }
    }

    #[test]
    fn cooldown_blocks_immediate_repeat() {
        let mut state = ThrottleState::new();
        let config = ThrottleConfig::default();
        let t0 = DateTime::<Utc>::MIN_UTC;
        let s = signal(1, SignalAction::Buy);

        assert!(state.admit(&s, None, t0, &config));
        assert!(!state.admit(&s, None, t0 + TimeDelta::seconds(1), &config));
        assert!(state.admit(&s, None, t0 + TimeDelta::hours(25), &config));
    }

    #[test]
    fn daily_cap_enforced_within_rolling_window() {
        let mut state = ThrottleState::new();
        let config = ThrottleConfig {
            cooldown: TimeDelta::zero(),
            max_trades_per_day: 2,
            min_sell_fraction: Decimal::ZERO,
        };
        let t0 = DateTime::<Utc>::MIN_UTC;
        let s = signal(1, SignalAction::Buy);

        assert!(state.admit(&s, None, t0, &config));
        assert!(state.admit(&s, None, t0 + TimeDelta::hours(1), &config));
        assert!(!state.admit(&s, None, t0 + TimeDelta::hours(2), &config));
    }

    #[test]
    fn small_sell_fraction_is_dropped() {
        let mut state = ThrottleState::new();
        let config = ThrottleConfig::default();
        let s = signal(1, SignalAction::Sell);

        assert!(!state.admit(&s, Some(Decimal::new(1, 1)), DateTime::<Utc>::MIN_UTC, &config));
    }

    #[test]
    fn risk_forced_signal_bypasses_cooldown_and_cap() {
        let mut state = ThrottleState::new();
        let config = ThrottleConfig {
            cooldown: TimeDelta::hours(24),
            max_trades_per_day: 1,
            min_sell_fraction: Decimal::new(9, 1),
        };
        let t0 = DateTime::<Utc>::MIN_UTC;
        let mut forced = signal(1, SignalAction::Sell);
        forced.origin = backtest_execution::signal::SignalOrigin::StopLoss;

        assert!(state.admit(&forced, Some(Decimal::ZERO), t0, &config));
        assert!(state.admit(&forced, Some(Decimal::ZERO), t0 + TimeDelta::seconds(1), &config));
    }
}
