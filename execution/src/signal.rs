use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;

/// The three actions an algorithm (or a risk layer override) can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

/// Distinguishes an algorithm-originated signal from one synthesized by the risk layer
/// (hard stop-loss, opportunity-seller liquidation). Carried through to the trade record so
/// a report can separate discretionary activity from risk-forced activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalOrigin {
    Algorithm,
    StopLoss,
    TakeProfit,
    OpportunitySell,
}

/// One algorithm (or risk-layer) instruction for a single coin on a single bar.
///
/// Exactly one of `quantity` / `percentage` is expected to be set for BUY/SELL; a signal
/// with neither set is treated by the executor as a no-op for sizing purposes. `confidence`
/// is advisory only; no component in this workspace currently reads it back.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradingSignal {
    pub action: SignalAction,
    pub coin_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Decimal>,
    pub reason: SmolStr,
    #[serde(default)]
    pub metadata: HashMap<SmolStr, SmolStr>,
    pub origin: SignalOrigin,
}

impl TradingSignal {
    pub fn hold(coin_id: u32, reason: impl Into<SmolStr>) -> Self {
        Self {
            action: SignalAction::Hold,
            coin_id,
            quantity: None,
            percentage: None,
            confidence: None,
            reason: reason.into(),
            metadata: HashMap::new(),
            origin: SignalOrigin::Algorithm,
        }
    }

    pub fn stop_loss(coin_id: u32, quantity: Decimal, reason: impl Into<SmolStr>) -> Self {
        Self {
            action: SignalAction::Sell,
            coin_id,
            quantity: Some(quantity),
            percentage: None,
            confidence: None,
            reason: reason.into(),
            metadata: HashMap::new(),
            origin: SignalOrigin::StopLoss,
        }
    }

    pub fn opportunity_sell(coin_id: u32, quantity: Decimal, reason: impl Into<SmolStr>) -> Self {
        Self {
            action: SignalAction::Sell,
            coin_id,
            quantity: Some(quantity),
            percentage: None,
            confidence: None,
            reason: reason.into(),
            metadata: HashMap::new(),
            origin: SignalOrigin::OpportunitySell,
        }
    }

    /// Risk-forced signals (stop-loss, opportunity liquidation) bypass the algorithm-facing
    /// throttle and hold gate; only `SignalOrigin::Algorithm` signals are subject to them.
    pub fn is_risk_forced(&self) -> bool {
        !matches!(self.origin, SignalOrigin::Algorithm)
    }
}
