use backtest_execution::market::Candle;
use backtest_execution::position::Position;
use backtest_execution::signal::TradingSignal;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HardStopLossConfig {
    pub enabled: bool,
    pub threshold: Decimal,
}

impl Default for HardStopLossConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: Decimal::new(5, 2),
        }
    }
}

/// Evaluates one position against the bar's candle and, if it has breached the stop
/// threshold, emits the synthetic full-exit SELL. Wick-aware: uses `candle.low` as the
/// detection price so an intrabar spike triggers the stop even if the close recovered.
pub fn generate(position: &Position, candle: &Candle, config: &HardStopLossConfig) -> Option<TradingSignal> {
    if !config.enabled || position.average_price.is_zero() {
        return None;
    }

    let detection_price = candle.low;
    let unrealized_pct = (detection_price - position.average_price) / position.average_price;

    if unrealized_pct > -config.threshold {
        return None;
    }

    let stop_execution_price = position.average_price * (Decimal::ONE - config.threshold);

    let mut metadata = std::collections::HashMap::new();
    metadata.insert("hardStopLoss".into(), "true".into());
    metadata.insert("stopExecutionPrice".into(), stop_execution_price.to_string().into());

    Some(TradingSignal {
        action: backtest_execution::signal::SignalAction::Sell,
        coin_id: position.coin_id,
        quantity: Some(position.quantity),
        percentage: None,
        confidence: None,
        reason: "hard stop-loss".into(),
        metadata,
        origin: backtest_execution::signal::SignalOrigin::StopLoss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn candle(low: Decimal, close: Decimal) -> Candle {
        Candle {
            coin_id: 1,
            timestamp: DateTime::<Utc>::MIN_UTC,
            open: close,
            high: close,
            low,
            close,
            volume: Decimal::ZERO,
        }
    }

    #[test]
    fn wick_triggers_stop_even_if_close_recovers() {
        let position = Position::opened_by_buy(1, dec!(1), dec!(100), DateTime::<Utc>::MIN_UTC);
        let config = HardStopLossConfig {
            enabled: true,
            threshold: dec!(0.05),
        };
        let bar = candle(dec!(94), dec!(98));

        let signal = generate(&position, &bar, &config).expect("should trigger");
        let stop_price: Decimal = signal
            .metadata
            .get("stopExecutionPrice")
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(stop_price, dec!(95));
        assert_eq!(signal.quantity, Some(dec!(1)));
    }

    #[test]
    fn no_trigger_when_within_threshold() {
        let position = Position::opened_by_buy(1, dec!(1), dec!(100), DateTime::<Utc>::MIN_UTC);
        let config = HardStopLossConfig::default();
        let bar = candle(dec!(97), dec!(98));

        assert!(generate(&position, &bar, &config).is_none());
    }

    #[test]
    fn disabled_never_triggers() {
        let position = Position::opened_by_buy(1, dec!(1), dec!(100), DateTime::<Utc>::MIN_UTC);
        let config = HardStopLossConfig {
            enabled: false,
            threshold: dec!(0.05),
        };
        let bar = candle(dec!(50), dec!(50));

        assert!(generate(&position, &bar, &config).is_none());
    }
}
