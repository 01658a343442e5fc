use crate::signal::SignalOrigin;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Buy,
    Sell,
}

/// The immutable record of one trade executed by [`crate::executor`].
///
/// `realized_pnl`, `realized_pnl_percent` and `cost_basis` are only ever populated for
/// `TradeType::Sell`; `fee` is deducted from cash but never folded into `realized_pnl`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    pub trade_type: TradeType,
    pub coin_id: u32,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
    pub fee: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl_percent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_basis: Option<Decimal>,
    pub executed_at: DateTime<Utc>,
    pub metadata: TradeMetadata,
}

/// Side-channel diagnostics carried on every trade; `hold_time_ms` and `hard_stop_loss` are
/// only meaningful on SELLs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TradeMetadata {
    pub base_price: Decimal,
    pub slippage_bps: Decimal,
    pub reason: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_time_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hard_stop_loss: bool,
    pub origin: SignalOrigin,
}

impl Trade {
    pub fn is_sell(&self) -> bool {
        matches!(self.trade_type, TradeType::Sell)
    }
}
