use crate::error::ExecutionError;
use crate::fee::FeeSchedule;
use crate::market::MarketData;
use crate::portfolio::Portfolio;
use crate::signal::{SignalAction, TradingSignal};
use crate::slippage::{SlippageInput, SlippageModel};
use crate::trade::{Trade, TradeMetadata, TradeType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Source of uniformity for RNG-fallback position sizing. Implemented by the deterministic
/// seeded generator that lives in the orchestrating crate; kept as a trait here so this crate
/// never has to depend upward on it.
pub trait SizingRng {
    /// A fresh draw in `[0, 1)`.
    fn next_unit(&mut self) -> Decimal;
}

const DEFAULT_SLIPPAGE_SIZE_RATIO: Decimal = dec!(0.1);
const SELL_SLIPPAGE_SIZE_RATIO: Decimal = dec!(0.5);
const SELL_BASE_FRACTION: Decimal = dec!(0.25);
const SELL_CONFIDENCE_WEIGHT: Decimal = dec!(0.75);

/// Everything the executor needs for one candidate trade. Bundled rather than passed
/// positionally because step order in the algorithm below reads each field more than once.
pub struct TradeExecutionInput<'a, R: SizingRng> {
    pub signal: &'a TradingSignal,
    pub market_data: &'a MarketData,
    pub fee_schedule: &'a FeeSchedule,
    pub slippage_model: &'a SlippageModel,
    pub rng: &'a mut R,
    pub daily_volume: Option<Decimal>,
    pub min_hold: chrono::TimeDelta,
    pub max_allocation: Decimal,
    pub min_allocation: Decimal,
    pub now: DateTime<Utc>,
}

pub struct ExecutedTrade {
    pub trade: Trade,
    pub slippage_bps: Decimal,
}

/// The single choke-point through which every BUY/SELL reaches the portfolio. HOLD signals
/// are never passed in by callers; this function assumes `signal.action != Hold`.
pub fn execute_trade<R: SizingRng>(
    portfolio: &mut Portfolio,
    input: TradeExecutionInput<'_, R>,
) -> Result<ExecutedTrade, ExecutionError> {
    let TradeExecutionInput {
        signal,
        market_data,
        fee_schedule,
        slippage_model,
        rng,
        daily_volume,
        min_hold,
        max_allocation,
        min_allocation,
        now,
    } = input;

    let is_risk_forced = signal.is_risk_forced();
    let is_buy = matches!(signal.action, SignalAction::Buy);

    // 1. Resolve base price.
    let base_price = if is_risk_forced {
        signal
            .metadata
            .get("stopExecutionPrice")
            .and_then(|v| v.parse::<Decimal>().ok())
    } else {
        market_data.price_of(signal.coin_id)
    }
    .ok_or(ExecutionError::MissingPrice)?;

    let existing_position = portfolio.position(signal.coin_id).copied();

    // 2. Estimate order size for the slippage quote.
    let slippage_quantity_estimate = if is_buy {
        DEFAULT_SLIPPAGE_SIZE_RATIO * portfolio.total_value / base_price
    } else {
        let qty = existing_position.map(|p| p.quantity).unwrap_or(Decimal::ZERO);
        SELL_SLIPPAGE_SIZE_RATIO * qty
    };

    // 3. Quote slippage.
    let quote = slippage_model.quote(SlippageInput {
        coin_id: signal.coin_id,
        price: base_price,
        quantity: slippage_quantity_estimate,
        is_buy,
        daily_volume,
        timestamp: now,
    });
    let execution_price = quote.execution_price;

    // 4. Size the real order.
    let quantity = if is_buy {
        let alloc = if let Some(explicit) = signal.quantity {
            return finish_buy(
                portfolio,
                signal,
                explicit,
                execution_price,
                base_price,
                quote.slippage_bps,
                fee_schedule,
                now,
            );
        } else if let Some(percentage) = signal.percentage {
            percentage.clamp(min_allocation, max_allocation)
        } else if let Some(confidence) = signal.confidence {
            min_allocation + confidence * (max_allocation - min_allocation)
        } else {
            rng.next_unit().max(min_allocation).min(max_allocation)
        };
        (portfolio.total_value * alloc) / execution_price
    } else {
        let existing_quantity = existing_position.map(|p| p.quantity).ok_or(ExecutionError::NoPosition)?;
        let fraction = if let Some(explicit) = signal.quantity {
            return finish_sell(
                portfolio,
                signal,
                explicit.min(existing_quantity),
                execution_price,
                base_price,
                quote.slippage_bps,
                fee_schedule,
                is_risk_forced,
                min_hold,
                now,
            );
        } else if let Some(percentage) = signal.percentage {
            percentage
        } else if let Some(confidence) = signal.confidence {
            SELL_BASE_FRACTION + SELL_CONFIDENCE_WEIGHT * confidence
        } else {
            rng.next_unit().clamp(SELL_BASE_FRACTION, Decimal::ONE)
        };
        (fraction.clamp(Decimal::ZERO, Decimal::ONE) * existing_quantity).min(existing_quantity)
    };

    if is_buy {
        finish_buy(
            portfolio,
            signal,
            quantity,
            execution_price,
            base_price,
            quote.slippage_bps,
            fee_schedule,
            now,
        )
    } else {
        finish_sell(
            portfolio,
            signal,
            quantity,
            execution_price,
            base_price,
            quote.slippage_bps,
            fee_schedule,
            is_risk_forced,
            min_hold,
            now,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn finish_buy(
    portfolio: &mut Portfolio,
    signal: &TradingSignal,
    quantity: Decimal,
    execution_price: Decimal,
    base_price: Decimal,
    slippage_bps: Decimal,
    fee_schedule: &FeeSchedule,
    now: DateTime<Utc>,
) -> Result<ExecutedTrade, ExecutionError> {
    let total_value = quantity * execution_price;
    let fee = fee_schedule.calculate(total_value, false);

    // 6. Cash check, fee included (the historical bug this spec fixes).
    if portfolio.cash_balance < total_value + fee {
        return Err(ExecutionError::InsufficientCash);
    }

    // 7. Mutate portfolio.
    portfolio.cash_balance -= total_value;
    portfolio
        .positions
        .entry(signal.coin_id)
        .and_modify(|p| p.apply_buy(quantity, execution_price, now))
        .or_insert_with(|| crate::position::Position::opened_by_buy(signal.coin_id, quantity, execution_price, now));

    // 8. Deduct fee from cash.
    portfolio.cash_balance -= fee;

    // 9. Mark the traded position to market.
    remark_position(portfolio, signal.coin_id, execution_price);

    let trade = Trade {
        trade_type: TradeType::Buy,
        coin_id: signal.coin_id,
        quantity,
        price: execution_price,
        total_value,
        fee,
        realized_pnl: None,
        realized_pnl_percent: None,
        cost_basis: None,
        executed_at: now,
        metadata: TradeMetadata {
            base_price,
            slippage_bps,
            reason: signal.reason.clone(),
            confidence: signal.confidence,
            hold_time_ms: None,
            hard_stop_loss: false,
            origin: signal.origin,
        },
    };

    Ok(ExecutedTrade { trade, slippage_bps })
}

#[allow(clippy::too_many_arguments)]
fn finish_sell(
    portfolio: &mut Portfolio,
    signal: &TradingSignal,
    quantity: Decimal,
    execution_price: Decimal,
    base_price: Decimal,
    slippage_bps: Decimal,
    fee_schedule: &FeeSchedule,
    is_risk_forced: bool,
    min_hold: chrono::TimeDelta,
    now: DateTime<Utc>,
) -> Result<ExecutedTrade, ExecutionError> {
    let position = portfolio.position(signal.coin_id).copied().ok_or(ExecutionError::NoPosition)?;

    // 5. Hold-period gate (SELL only, risk-control bypasses).
    if !is_risk_forced && min_hold > chrono::TimeDelta::zero() && (now - position.entry_date) < min_hold {
        return Err(ExecutionError::HoldPeriodNotMet);
    }

    let cost_basis = position.average_price;
    let total_value = quantity * execution_price;
    let fee = fee_schedule.calculate(total_value, false);
    let realized_pnl = position.realized_pnl(quantity, execution_price);
    let realized_pnl_percent = if cost_basis.is_zero() {
        Decimal::ZERO
    } else {
        realized_pnl / (cost_basis * quantity)
    };

    // 7. Mutate portfolio.
    portfolio.cash_balance += total_value;
    let closed = {
        let p = portfolio.positions.get_mut(&signal.coin_id).expect("checked above");
        p.apply_sell(quantity);
        p.is_closed()
    };
    if closed {
        portfolio.positions.remove(&signal.coin_id);
    }

    // 8. Deduct fee from cash.
    portfolio.cash_balance -= fee;

    // 9. Mark-to-market.
    remark_position(portfolio, signal.coin_id, execution_price);

    let hold_time_ms = (now - position.entry_date).num_milliseconds();

    let trade = Trade {
        trade_type: TradeType::Sell,
        coin_id: signal.coin_id,
        quantity,
        price: execution_price,
        total_value,
        fee,
        realized_pnl: Some(realized_pnl),
        realized_pnl_percent: Some(realized_pnl_percent),
        cost_basis: Some(cost_basis),
        executed_at: now,
        metadata: TradeMetadata {
            base_price,
            slippage_bps,
            reason: signal.reason.clone(),
            confidence: signal.confidence,
            hold_time_ms: Some(hold_time_ms),
            hard_stop_loss: matches!(signal.origin, crate::signal::SignalOrigin::StopLoss),
            origin: signal.origin,
        },
    };

    Ok(ExecutedTrade { trade, slippage_bps })
}

fn remark_position(portfolio: &mut Portfolio, coin_id: u32, execution_price: Decimal) {
    if let Some(position) = portfolio.positions.get_mut(&coin_id) {
        position.total_value = position.quantity * execution_price;
    }
    portfolio.total_value = portfolio.cash_balance + portfolio.positions_value();
}
