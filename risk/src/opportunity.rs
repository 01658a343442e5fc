use backtest_execution::portfolio::Portfolio;
use backtest_execution::position::Position;
use backtest_execution::signal::TradingSignal;
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpportunitySellConfig {
    pub enabled: bool,
    pub min_confidence: Decimal,
    pub protected_coins: HashSet<u32>,
    pub max_liquidation_fraction: Decimal,
    pub min_hold: TimeDelta,
}

impl Default for OpportunitySellConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_confidence: Decimal::new(7, 1),
            protected_coins: HashSet::new(),
            max_liquidation_fraction: Decimal::new(25, 2),
            min_hold: TimeDelta::hours(24),
        }
    }
}

/// One position queued for liquidation to cover a BUY shortfall, in sell order (weakest
/// first).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidationCandidate {
    pub coin_id: u32,
    pub quantity: Decimal,
    pub score: Decimal,
}

/// Ranks eligible positions (excluding `target_coin` and any protected coin, and requiring
/// the minimum hold period) by a weakness score — lower sorts first, i.e. sold first — then
/// greedily selects just enough, capped at `max_liquidation_fraction * portfolio.total_value`,
/// to cover `shortfall`. Returns `None` if the gate or eligibility rules block the whole
/// attempt, or if even full liquidation of all eligible positions can't cover the shortfall.
pub fn plan_liquidation(
    portfolio: &Portfolio,
    target_coin: u32,
    buy_confidence: Option<Decimal>,
    shortfall: Decimal,
    now: DateTime<Utc>,
    marks: &std::collections::HashMap<u32, Decimal>,
    config: &OpportunitySellConfig,
) -> Option<Vec<LiquidationCandidate>> {
    if !config.enabled || shortfall <= Decimal::ZERO {
        return None;
    }
    let confidence = buy_confidence?;
    if confidence < config.min_confidence {
        return None;
    }

    let mut scored: Vec<(Decimal, &Position)> = portfolio
        .positions
        .values()
        .filter(|p| p.coin_id != target_coin)
        .filter(|p| !config.protected_coins.contains(&p.coin_id))
        .filter(|p| now - p.entry_date >= config.min_hold)
        .map(|p| (score(p, now, marks), p))
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0));

    let liquidation_cap = config.max_liquidation_fraction * portfolio.total_value;
    let mut covered = Decimal::ZERO;
    let mut liquidated_value = Decimal::ZERO;
    let mut plan = Vec::new();

    for (score_value, position) in scored {
        if covered >= shortfall {
            break;
        }
        let mark = marks.get(&position.coin_id).copied().unwrap_or(position.average_price);
        let position_value = position.quantity * mark;
        if liquidated_value + position_value > liquidation_cap {
            continue;
        }

        plan.push(LiquidationCandidate {
            coin_id: position.coin_id,
            quantity: position.quantity,
            score: score_value,
        });
        covered += position_value;
        liquidated_value += position_value;
    }

    if covered < shortfall {
        return None;
    }

    Some(plan)
}

/// Lower is worse: unrealized loss, staleness, or underperformance relative to the
/// candidate BUY's expected edge all push a position toward the front of the sell queue.
fn score(position: &Position, now: DateTime<Utc>, marks: &std::collections::HashMap<u32, Decimal>) -> Decimal {
    let mark = marks.get(&position.coin_id).copied().unwrap_or(position.average_price);
    let unrealized_pct = if position.average_price.is_zero() {
        Decimal::ZERO
    } else {
        (mark - position.average_price) / position.average_price
    };
    let age_days = Decimal::from((now - position.entry_date).num_days().max(0));
    unrealized_pct - age_days / Decimal::from(365)
}

pub fn liquidation_signals(plan: &[LiquidationCandidate]) -> Vec<TradingSignal> {
    plan.iter()
        .map(|candidate| TradingSignal::opportunity_sell(candidate.coin_id, candidate.quantity, "opportunity sell"))
        .collect()
}
