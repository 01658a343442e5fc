use async_trait::async_trait;
use backtest_execution::market::PriceSummary;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CoinDescriptor {
    pub id: u32,
    pub symbol: SmolStr,
    pub name: SmolStr,
}

/// Run-level metadata forwarded to the algorithm so it can distinguish a live replay from a
/// plain historical run, or an optimization sweep from either.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunMetadata {
    pub backtest_id: Option<SmolStr>,
    pub dataset_id: Option<SmolStr>,
    pub deterministic_seed: Option<SmolStr>,
    pub is_optimization: bool,
    pub is_live_replay: bool,
    pub replay_speed: Option<SmolStr>,
}

/// Everything the algorithm sees on one bar. `price_data` windows are read-only borrowed
/// views into the orchestrator's price-window tracker; the algorithm must not mutate them.
#[derive(Debug, Clone)]
pub struct AlgorithmContext<'a> {
    pub coins: &'a [CoinDescriptor],
    pub price_data: &'a HashMap<u32, Vec<PriceSummary>>,
    pub timestamp: DateTime<Utc>,
    pub config: &'a HashMap<SmolStr, SmolStr>,
    pub positions: &'a HashMap<u32, Decimal>,
    pub available_balance: Decimal,
    pub metadata: &'a RunMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawSignalType {
    Buy,
    Sell,
    StopLoss,
    TakeProfit,
    Hold,
}

/// The wire shape an algorithm returns a signal in, before the orchestrator collapses
/// `StopLoss`/`TakeProfit` into a SELL action with `original_type` preserved.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSignal {
    pub signal_type: RawSignalType,
    pub coin_id: u32,
    pub quantity: Option<Decimal>,
    pub strength: Option<Decimal>,
    pub reason: SmolStr,
    pub confidence: Option<Decimal>,
    #[serde(default)]
    pub metadata: HashMap<SmolStr, SmolStr>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlgorithmResult {
    pub success: bool,
    pub signals: Vec<RawSignal>,
    pub error: Option<SmolStr>,
}

/// The capability an algorithm implements: `execute` on each bar. Modeled as a flat trait
/// rather than an inheritance hierarchy — the orchestrator holds a registry of boxed
/// algorithms and never needs to know a concrete implementing type.
#[async_trait]
pub trait Algorithm: Send + Sync {
    fn id(&self) -> SmolStr;

    async fn execute(&mut self, ctx: AlgorithmContext<'_>) -> AlgorithmResult;

    /// Whether the algorithm is able to run given the coins/config currently available.
    /// Defaults to always-yes; override to gate on required config keys or coin coverage.
    fn can_execute(&self, _ctx: &AlgorithmContext<'_>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysHold;

    #[async_trait]
    impl Algorithm for AlwaysHold {
        fn id(&self) -> SmolStr {
            "always-hold".into()
        }

        async fn execute(&mut self, ctx: AlgorithmContext<'_>) -> AlgorithmResult {
            AlgorithmResult {
                success: true,
                signals: ctx
                    .coins
                    .iter()
                    .map(|c| RawSignal {
                        signal_type: RawSignalType::Hold,
                        coin_id: c.id,
                        quantity: None,
                        strength: None,
                        reason: "no edge".into(),
                        confidence: None,
                        metadata: HashMap::new(),
                    })
                    .collect(),
                error: None,
            }
        }
    }

    #[tokio::test]
    async fn algorithm_trait_object_executes() {
        let coins = vec![CoinDescriptor {
            id: 1,
            symbol: "BTC".into(),
            name: "Bitcoin".into(),
        }];
        let price_data = HashMap::new();
        let config = HashMap::new();
        let positions = HashMap::new();
        let metadata = RunMetadata::default();

        let mut algorithm: Box<dyn Algorithm> = Box::new(AlwaysHold);
        let result = algorithm
            .execute(AlgorithmContext {
                coins: &coins,
                price_data: &price_data,
                timestamp: DateTime::<Utc>::MIN_UTC,
                config: &config,
                positions: &positions,
                available_balance: Decimal::ZERO,
                metadata: &metadata,
            })
            .await;

        assert!(result.success);
        assert_eq!(result.signals.len(), 1);
    }
}
