use backtest_execution::market::PriceSummary;
use backtest_execution::signal::SignalAction;
use rust_decimal::Decimal;

const SMA_WINDOW: usize = 200;
const BTC_COIN_ID: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityRegime {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRegime {
    RiskOn,
    RiskOff,
    Neutral,
}

/// BTC-trend-and-volatility composite gate. Disabled for the whole run at start if BTC is
/// absent from the universe, per the configuration contract; the gate itself stays inert
/// (always `RiskOn`-equivalent passthrough) until 200 BTC samples have accumulated.
#[derive(Debug, Clone, Copy)]
pub struct RegimeGate {
    pub enabled: bool,
    pub btc_coin_id: u32,
    pub low_volatility_threshold: Decimal,
    pub high_volatility_threshold: Decimal,
}

impl Default for RegimeGate {
    fn default() -> Self {
        Self {
            enabled: true,
            btc_coin_id: BTC_COIN_ID,
            low_volatility_threshold: Decimal::new(15, 3),
            high_volatility_threshold: Decimal::new(40, 3),
        }
    }
}

impl RegimeGate {
    /// `btc_window` is the BTC coin's price-summary window, oldest first. Returns `None`
    /// (inert) when disabled or the window has not yet reached [`SMA_WINDOW`] samples.
    pub fn classify(&self, btc_window: &[PriceSummary]) -> Option<MarketRegime> {
        if !self.enabled || btc_window.len() < SMA_WINDOW {
            return None;
        }

        let tail = &btc_window[btc_window.len() - SMA_WINDOW..];
        let sma200: Decimal = tail.iter().map(|p| p.close).sum::<Decimal>() / Decimal::from(SMA_WINDOW);
        let latest = tail.last().expect("non-empty by construction").close;
        let trend_up = latest > sma200;

        let volatility = self.volatility_regime(tail);

        Some(match (volatility, trend_up) {
            (VolatilityRegime::High, false) => MarketRegime::RiskOff,
            (VolatilityRegime::High, true) => MarketRegime::Neutral,
            (_, true) => MarketRegime::RiskOn,
            (_, false) => MarketRegime::Neutral,
        })
    }

    fn volatility_regime(&self, window: &[PriceSummary]) -> VolatilityRegime {
        let returns: Vec<Decimal> = window
            .windows(2)
            .filter(|pair| !pair[0].close.is_zero())
            .map(|pair| (pair[1].close - pair[0].close) / pair[0].close)
            .collect();

        if returns.is_empty() {
            return VolatilityRegime::Normal;
        }

        let mean = returns.iter().sum::<Decimal>() / Decimal::from(returns.len());
        let variance =
            returns.iter().map(|r| (*r - mean) * (*r - mean)).sum::<Decimal>() / Decimal::from(returns.len());
        let stdev = variance.sqrt().unwrap_or(Decimal::ZERO);

        if stdev <= self.low_volatility_threshold {
            VolatilityRegime::Low
        } else if stdev >= self.high_volatility_threshold {
            VolatilityRegime::High
        } else {
            VolatilityRegime::Normal
        }
    }

    /// Whether `action` is allowed under `regime`. SELL always passes; BUY is dropped only
    /// in `RiskOff`.
    pub fn permits(regime: Option<MarketRegime>, action: SignalAction) -> bool {
        match (regime, action) {
            (Some(MarketRegime::RiskOff), SignalAction::Buy) => false,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, Utc};
    use rust_decimal_macros::dec;

    fn window_with(closes: &[Decimal]) -> Vec<PriceSummary> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| PriceSummary {
                coin_id: BTC_COIN_ID,
                date: DateTime::<Utc>::MIN_UTC + TimeDelta::days(i as i64),
                avg: *close,
                high: *close,
                low: *close,
                close: *close,
            })
            .collect()
    }

    #[test]
    fn inert_below_sma_window() {
        let gate = RegimeGate::default();
        let window = window_with(&vec![dec!(100); 199]);
        assert_eq!(gate.classify(&window), None);
    }

    #[test]
    fn uptrend_low_volatility_is_risk_on() {
        let gate = RegimeGate::default();
        let mut closes: Vec<Decimal> = (0..200).map(|i| dec!(100) + Decimal::from(i)).collect();
        closes.push(dec!(350));
        let window = window_with(&closes);
        assert_eq!(gate.classify(&window), Some(MarketRegime::RiskOn));
    }

    #[test]
    fn risk_off_blocks_buy_but_not_sell() {
        assert!(!RegimeGate::permits(Some(MarketRegime::RiskOff), SignalAction::Buy));
        assert!(RegimeGate::permits(Some(MarketRegime::RiskOff), SignalAction::Sell));
        assert!(RegimeGate::permits(None, SignalAction::Buy));
    }
}
