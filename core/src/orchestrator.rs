//! Component C14: the bar loop orchestrator.
//!
//! A single sequential state machine over sorted timestamps. Historical and optimization
//! runs are identical to live-replay minus the pacing sleep and the pause check; the config's
//! [`RunMode`] simply toggles those two steps.
//!
//! Business logic below is deliberately written as free functions taking explicit borrows
//! rather than `&self`/`&mut self` methods, so the orchestrator's own fields (portfolio, rng,
//! accumulator, ...) can be borrowed independently of each other within [`BarLoopOrchestrator::run`].

use crate::algorithm::{Algorithm, AlgorithmContext, CoinDescriptor, RawSignal, RawSignalType, RunMetadata};
use crate::callbacks::{CheckpointSink, HeartbeatSink, IncrementalResults, PauseController};
use crate::checkpoint::{self, CheckpointState};
use crate::config::{BacktestConfig, RunMode};
use crate::error::BacktestError;
use crate::pacing::PacingController;
use crate::price_window::PriceWindowTracker;
use crate::rng::Rng;
use crate::snapshot::{Holding, Snapshot};
use backtest_analytics::accumulator::{MetricsAccumulator, TradeOutcome};
use backtest_execution::executor::{execute_trade, TradeExecutionInput};
use backtest_execution::market::{Candle, MarketData};
use backtest_execution::portfolio::{Portfolio, SerializedPortfolio};
use backtest_execution::position::Position;
use backtest_execution::signal::{SignalAction, SignalOrigin, TradingSignal};
use backtest_execution::trade::Trade;
use backtest_risk::opportunity::{self, OpportunitySellConfig};
use backtest_risk::regime::RegimeGate;
use backtest_risk::stop_loss::{self, HardStopLossConfig};
use backtest_risk::throttle::ThrottleState;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
pub enum RunOutcome {
    Completed { portfolio: Portfolio, accumulator: Box<MetricsAccumulator> },
    Paused { checkpoint: Box<CheckpointState> },
}

/// Owns every per-run mutable resource: portfolio, RNG, price windows, throttle state and the
/// metrics accumulator. Never shared across runs — a caller scheduling many concurrent runs
/// gives each its own instance.
pub struct BarLoopOrchestrator<A: Algorithm> {
    config: BacktestConfig,
    algorithm: A,
    coins: Vec<CoinDescriptor>,
    algorithm_config: HashMap<SmolStr, SmolStr>,
    run_metadata: RunMetadata,
    timestamps: Vec<DateTime<Utc>>,
    candles_by_bar: Vec<HashMap<u32, Candle>>,

    portfolio: Portfolio,
    rng: Rng,
    price_windows: PriceWindowTracker,
    throttle: ThrottleState,
    accumulator: MetricsAccumulator,

    trades_since_checkpoint: Vec<Trade>,
    snapshots_since_checkpoint: Vec<Snapshot>,
    last_checkpoint_index: usize,
    consecutive_errors: u32,
    consecutive_pause_failures: u32,
    last_heartbeat_at: Option<std::time::Instant>,
}

impl<A: Algorithm> BarLoopOrchestrator<A> {
    pub fn new(
        config: BacktestConfig,
        algorithm: A,
        coins: Vec<CoinDescriptor>,
        algorithm_config: HashMap<SmolStr, SmolStr>,
        candles: Vec<Candle>,
    ) -> Self {
        let mut timestamps: Vec<DateTime<Utc>> = candles.iter().map(|c| c.timestamp).collect();
        timestamps.sort();
        timestamps.dedup();
        let index_of: HashMap<DateTime<Utc>, usize> =
            timestamps.iter().enumerate().map(|(i, t)| (*t, i)).collect();

        let mut by_coin: HashMap<u32, Vec<Candle>> = HashMap::new();
        for candle in candles {
            by_coin.entry(candle.coin_id).or_default().push(candle);
        }

        let mut candles_by_bar: Vec<HashMap<u32, Candle>> = vec![HashMap::new(); timestamps.len()];
        for coin_candles in by_coin.values() {
            for candle in coin_candles {
                if let Some(&idx) = index_of.get(&candle.timestamp) {
                    candles_by_bar[idx].insert(candle.coin_id, *candle);
                }
            }
        }

        let run_metadata = RunMetadata {
            backtest_id: None,
            dataset_id: None,
            deterministic_seed: Some(SmolStr::from(config.deterministic_seed.as_str())),
            is_optimization: config.mode == RunMode::Optimization,
            is_live_replay: config.mode == RunMode::LiveReplay,
            replay_speed: Some(SmolStr::from(format!("{:?}", config.replay_speed))),
        };

        let rng = Rng::from_seed(&config.deterministic_seed);
        let initial_capital = config.initial_capital;
        let portfolio = Portfolio::new(initial_capital);
        let accumulator = MetricsAccumulator::new(initial_capital);
        let price_windows = PriceWindowTracker::new(by_coin);

        Self {
            config,
            algorithm,
            coins,
            algorithm_config,
            run_metadata,
            timestamps,
            candles_by_bar,
            portfolio,
            rng,
            price_windows,
            throttle: ThrottleState::new(),
            accumulator,
            trades_since_checkpoint: Vec::new(),
            snapshots_since_checkpoint: Vec::new(),
            last_checkpoint_index: 0,
            consecutive_errors: 0,
            consecutive_pause_failures: 0,
            last_heartbeat_at: None,
        }
    }

    /// Validates `state` against this run's timestamps before restoring from it. Rejects with
    /// [`BacktestError::CheckpointValidation`] on an out-of-bounds index, a timestamp mismatch,
    /// or a failed checksum — the caller must start a fresh run or choose another checkpoint.
    pub fn resume_from(&mut self, state: CheckpointState) -> Result<(), BacktestError> {
        let validation = checkpoint::validate(&state, &self.timestamps);
        if !validation.valid {
            return Err(BacktestError::CheckpointValidation(validation.reason.unwrap_or("invalid")));
        }

        self.portfolio = Portfolio::from(state.portfolio);
        self.rng = Rng::from_state(state.rng_state);
        self.accumulator = MetricsAccumulator::from_checkpoint(state.persisted_counts, state.peak_value, state.max_drawdown);
        if let Some(throttle) = state.throttle_state {
            self.throttle = throttle;
        }
        self.last_checkpoint_index = state.last_processed_index;
        Ok(())
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    #[instrument(skip_all)]
    pub async fn run(
        &mut self,
        mut checkpoint_sink: Option<&mut dyn CheckpointSink>,
        mut pause_controller: Option<&mut dyn PauseController>,
        mut heartbeat_sink: Option<&mut dyn HeartbeatSink>,
    ) -> Result<RunOutcome, BacktestError> {
        let last_index = self.timestamps.len().saturating_sub(1);

        for i in self.last_checkpoint_index..self.timestamps.len() {
            let t = self.timestamps[i];
            let candles_for_bar = self.candles_by_bar[i].clone();

            // 1-2. mark-to-market.
            let prices: HashMap<u32, Decimal> = candles_for_bar.iter().map(|(coin, c)| (*coin, c.close)).collect();
            let market_data = MarketData { prices };
            mark_to_market(&mut self.portfolio, &market_data);

            // 3. advance price windows; compute the regime *before* dropping the borrow.
            let windows = self.price_windows.advance(t);
            let btc_window = windows
                .get(&self.config.regime_gate.btc_coin_id)
                .copied()
                .unwrap_or(&[]);
            let regime = self.config.regime_gate.classify(btc_window);
            let price_data: HashMap<u32, Vec<_>> = windows.iter().map(|(coin, w)| (*coin, w.to_vec())).collect();
            drop(windows);

            let positions: HashMap<u32, Decimal> =
                self.portfolio.positions.values().map(|p| (p.coin_id, p.quantity)).collect();

            // 4. warmup: prime algorithm state only, no trading.
            if i < self.config.trading_start_index {
                let ctx = AlgorithmContext {
                    coins: &self.coins,
                    price_data: &price_data,
                    timestamp: t,
                    config: &self.algorithm_config,
                    positions: &positions,
                    available_balance: self.portfolio.cash_balance,
                    metadata: &self.run_metadata,
                };
                let _ = self.algorithm.execute(ctx).await;
                continue;
            }

            // 5. hard stop-loss, evaluated before the algorithm runs.
            if self.config.hard_stop_loss.enabled {
                let stop_signals = collect_stop_loss_signals(&self.portfolio.positions, &candles_for_bar, &self.config.hard_stop_loss);
                for signal in &stop_signals {
                    self.accumulator.record_signal();
                    execute_signal(
                        &mut self.portfolio,
                        &mut self.rng,
                        &mut self.accumulator,
                        &mut self.trades_since_checkpoint,
                        signal,
                        &market_data,
                        daily_volume_of(&candles_for_bar, signal.coin_id),
                        self.config.min_hold,
                        self.config.max_allocation,
                        self.config.min_allocation,
                        t,
                        &self.config.fee_schedule,
                        &self.config.slippage_model,
                    );
                }
            }

            // 6. pacing (live-replay only; skipped on the first trading bar).
            if self.config.mode == RunMode::LiveReplay && i > self.config.trading_start_index {
                PacingController::sleep(self.config.base_interval_ms, self.config.replay_speed).await;
            }

            // 7. algorithm execution with a per-bar timeout.
            let ctx = AlgorithmContext {
                coins: &self.coins,
                price_data: &price_data,
                timestamp: t,
                config: &self.algorithm_config,
                positions: &positions,
                available_balance: self.portfolio.cash_balance,
                metadata: &self.run_metadata,
            };
            let timeout = std::time::Duration::from_millis(self.config.algorithm_timeout.num_milliseconds().max(0) as u64);
            let outcome = tokio::time::timeout(timeout, self.algorithm.execute(ctx)).await;

            let signals: Vec<RawSignal> = match outcome {
                Ok(result) if result.success => {
                    self.consecutive_errors = 0;
                    result.signals
                }
                Ok(result) => {
                    self.consecutive_errors += 1;
                    warn!(error = ?result.error, consecutive = self.consecutive_errors, "algorithm reported failure");
                    if self.consecutive_errors >= self.config.max_consecutive_errors {
                        return Err(BacktestError::AlgorithmExecutionFailed {
                            consecutive: self.consecutive_errors,
                            message: result.error.map(|e| e.to_string()).unwrap_or_default(),
                        });
                    }
                    Vec::new()
                }
                Err(_) => {
                    self.consecutive_errors += 1;
                    warn!(consecutive = self.consecutive_errors, "algorithm execution timed out");
                    if self.consecutive_errors >= self.config.max_consecutive_errors {
                        return Err(BacktestError::AlgorithmExecutionFailed {
                            consecutive: self.consecutive_errors,
                            message: "timeout".to_string(),
                        });
                    }
                    Vec::new()
                }
            };

            // 8-9. convert, throttle, regime-gate, then execute each admitted signal.
            for raw in signals {
                let signal = to_trading_signal(raw);
                if signal.action == SignalAction::Hold {
                    continue;
                }

                let sell_fraction = resolve_sell_fraction(&self.portfolio, &signal);
                if !self.throttle.admit(&signal, sell_fraction, t, &self.config.throttle) {
                    debug!(coin = signal.coin_id, "signal throttled");
                    continue;
                }
                if !RegimeGate::permits(regime, signal.action) {
                    debug!(coin = signal.coin_id, "signal blocked by regime gate");
                    continue;
                }

                self.accumulator.record_signal();

                let is_buy = signal.action == SignalAction::Buy;
                let executed = execute_signal(
                    &mut self.portfolio,
                    &mut self.rng,
                    &mut self.accumulator,
                    &mut self.trades_since_checkpoint,
                    &signal,
                    &market_data,
                    daily_volume_of(&candles_for_bar, signal.coin_id),
                    self.config.min_hold,
                    self.config.max_allocation,
                    self.config.min_allocation,
                    t,
                    &self.config.fee_schedule,
                    &self.config.slippage_model,
                );

                if !executed && is_buy && self.config.opportunity.enabled {
                    try_opportunity_retry(
                        &mut self.portfolio,
                        &mut self.rng,
                        &mut self.accumulator,
                        &mut self.trades_since_checkpoint,
                        &signal,
                        &market_data,
                        &candles_for_bar,
                        t,
                        &self.config.fee_schedule,
                        &self.config.slippage_model,
                        self.config.min_hold,
                        self.config.max_allocation,
                        self.config.min_allocation,
                        &self.config.opportunity,
                    );
                }
            }

            // 10. update peak/drawdown unconditionally, every bar.
            self.accumulator.observe_value(self.portfolio.total_value);

            // 11. snapshot every `snapshot_interval_bars` bars and on the final bar.
            let since_start = (i - self.config.trading_start_index) as i64;
            let snapshot_due = (self.config.snapshot_interval_bars > 0 && since_start % self.config.snapshot_interval_bars == 0) || i == last_index;
            if snapshot_due {
                self.snapshots_since_checkpoint.push(build_snapshot(
                    &self.portfolio,
                    self.accumulator.peak_value(),
                    self.config.initial_capital,
                    t,
                ));
            }

            // 12. heartbeat.
            if let Some(sink) = heartbeat_sink.as_deref_mut() {
                let due = self
                    .last_heartbeat_at
                    .map(|last| {
                        last.elapsed()
                            >= std::time::Duration::from_millis(self.config.heartbeat_interval.num_milliseconds().max(0) as u64)
                    })
                    .unwrap_or(true);
                if due {
                    sink.on_heartbeat(i, self.timestamps.len()).await;
                    self.last_heartbeat_at = Some(std::time::Instant::now());
                }
            }

            // 13. live-replay pause check, before the next bar's step 1.
            if self.config.mode == RunMode::LiveReplay {
                if let Some(controller) = pause_controller.as_deref_mut() {
                    match controller.should_pause().await {
                        Ok(false) => self.consecutive_pause_failures = 0,
                        Ok(true) => {
                            let state = self.checkpoint_state(i, t);
                            controller.on_paused(&state).await?;
                            return Ok(RunOutcome::Paused { checkpoint: Box::new(state) });
                        }
                        Err(error) => {
                            self.consecutive_pause_failures += 1;
                            warn!(%error, consecutive = self.consecutive_pause_failures, "pause check failed");
                            if self.consecutive_pause_failures >= self.config.max_consecutive_pause_failures {
                                let state = self.checkpoint_state(i, t);
                                controller.on_paused(&state).await?;
                                return Ok(RunOutcome::Paused { checkpoint: Box::new(state) });
                            }
                        }
                    }
                }
            }

            // 14. checkpoint.
            if i - self.last_checkpoint_index >= self.config.checkpoint_interval as usize || i == last_index {
                let state = self.checkpoint_state(i, t);
                if let Some(sink) = checkpoint_sink.as_deref_mut() {
                    let incremental = IncrementalResults {
                        trades: self.trades_since_checkpoint.clone(),
                        snapshots: self.snapshots_since_checkpoint.clone(),
                    };
                    sink.on_checkpoint(&state, &incremental, self.timestamps.len())
                        .await
                        .map_err(|e| BacktestError::CheckpointCallbackFailed(e.to_string()))?;
                }

                let outcomes: Vec<TradeOutcome> = self
                    .trades_since_checkpoint
                    .iter()
                    .map(|trade| TradeOutcome { is_sell: trade.is_sell(), realized_pnl: trade.realized_pnl })
                    .collect();
                let snapshot_values: Vec<Decimal> =
                    self.snapshots_since_checkpoint.iter().map(|s| s.portfolio_value).collect();
                self.accumulator.harvest(&outcomes, &snapshot_values);

                self.trades_since_checkpoint.clear();
                self.snapshots_since_checkpoint.clear();
                self.last_checkpoint_index = i;

                info!(index = i, "checkpoint committed");
            }
        }

        Ok(RunOutcome::Completed {
            portfolio: self.portfolio.clone(),
            accumulator: Box::new(self.accumulator.clone()),
        })
    }

    fn checkpoint_state(&self, index: usize, timestamp: DateTime<Utc>) -> CheckpointState {
        checkpoint::build(
            index,
            timestamp,
            SerializedPortfolio::from(&self.portfolio),
            self.accumulator.peak_value(),
            self.accumulator.max_drawdown(),
            self.rng.state(),
            self.accumulator.counts(),
            Some(self.throttle.clone()),
        )
    }
}

#[instrument(name = "mark_to_market", skip_all)]
fn mark_to_market(portfolio: &mut Portfolio, market_data: &MarketData) {
    portfolio.mark_to_market(&market_data.prices);
}

fn daily_volume_of(candles: &HashMap<u32, Candle>, coin_id: u32) -> Option<Decimal> {
    candles.get(&coin_id).map(|c| c.volume)
}

fn collect_stop_loss_signals(
    positions: &HashMap<u32, Position>,
    candles_for_bar: &HashMap<u32, Candle>,
    config: &HardStopLossConfig,
) -> Vec<TradingSignal> {
    positions
        .values()
        .filter_map(|position| {
            let candle = candles_for_bar.get(&position.coin_id)?;
            stop_loss::generate(position, candle, config)
        })
        .collect()
}

fn resolve_sell_fraction(portfolio: &Portfolio, signal: &TradingSignal) -> Option<Decimal> {
    if signal.action != SignalAction::Sell {
        return None;
    }
    let existing = portfolio.position(signal.coin_id)?.quantity;
    if existing.is_zero() {
        return Some(Decimal::ZERO);
    }
    if let Some(q) = signal.quantity {
        return Some(q / existing);
    }
    signal.percentage.or(signal.confidence)
}

#[allow(clippy::too_many_arguments)]
fn execute_signal(
    portfolio: &mut Portfolio,
    rng: &mut Rng,
    accumulator: &mut MetricsAccumulator,
    trades_buf: &mut Vec<Trade>,
    signal: &TradingSignal,
    market_data: &MarketData,
    daily_volume: Option<Decimal>,
    min_hold: chrono::TimeDelta,
    max_allocation: Decimal,
    min_allocation: Decimal,
    now: DateTime<Utc>,
    fee_schedule: &backtest_execution::fee::FeeSchedule,
    slippage_model: &backtest_execution::slippage::SlippageModel,
) -> bool {
    let input = TradeExecutionInput {
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
    };

    match execute_trade(portfolio, input) {
        Ok(executed) => {
            accumulator.record_fill();
            trades_buf.push(executed.trade);
            true
        }
        Err(error) => {
            debug!(coin = signal.coin_id, %error, "trade rejected");
            false
        }
    }
}

/// Retries a BUY exactly once after liquidating just enough of the weakest eligible
/// positions to cover its shortfall. No-op if no feasible liquidation plan exists.
#[allow(clippy::too_many_arguments)]
fn try_opportunity_retry(
    portfolio: &mut Portfolio,
    rng: &mut Rng,
    accumulator: &mut MetricsAccumulator,
    trades_buf: &mut Vec<Trade>,
    buy_signal: &TradingSignal,
    market_data: &MarketData,
    candles_for_bar: &HashMap<u32, Candle>,
    now: DateTime<Utc>,
    fee_schedule: &backtest_execution::fee::FeeSchedule,
    slippage_model: &backtest_execution::slippage::SlippageModel,
    min_hold: chrono::TimeDelta,
    max_allocation: Decimal,
    min_allocation: Decimal,
    opportunity_config: &OpportunitySellConfig,
) {
    let required = portfolio.total_value * min_allocation;
    let shortfall = required - portfolio.cash_balance;

    let plan = opportunity::plan_liquidation(
        portfolio,
        buy_signal.coin_id,
        buy_signal.confidence,
        shortfall,
        now,
        &market_data.prices,
        opportunity_config,
    );

    let Some(plan) = plan else { return };

    for liquidation_signal in opportunity::liquidation_signals(&plan) {
        execute_signal(
            portfolio,
            rng,
            accumulator,
            trades_buf,
            &liquidation_signal,
            market_data,
            daily_volume_of(candles_for_bar, liquidation_signal.coin_id),
            min_hold,
            max_allocation,
            min_allocation,
            now,
            fee_schedule,
            slippage_model,
        );
    }

    execute_signal(
        portfolio,
        rng,
        accumulator,
        trades_buf,
        buy_signal,
        market_data,
        daily_volume_of(candles_for_bar, buy_signal.coin_id),
        min_hold,
        max_allocation,
        min_allocation,
        now,
        fee_schedule,
        slippage_model,
    );
}

fn build_snapshot(portfolio: &Portfolio, peak_value: Decimal, initial_capital: Decimal, t: DateTime<Utc>) -> Snapshot {
    let holdings: HashMap<u32, Holding> = portfolio
        .positions
        .values()
        .map(|p| {
            let price = if p.quantity.is_zero() { Decimal::ZERO } else { p.total_value / p.quantity };
            (p.coin_id, Holding { quantity: p.quantity, value: p.total_value, price })
        })
        .collect();

    let drawdown = if peak_value.is_zero() {
        Decimal::ZERO
    } else {
        (peak_value - portfolio.total_value) / peak_value
    };
    let cumulative_return = if initial_capital.is_zero() {
        Decimal::ZERO
    } else {
        (portfolio.total_value - initial_capital) / initial_capital
    };

    Snapshot {
        timestamp: t,
        portfolio_value: portfolio.total_value,
        cash_balance: portfolio.cash_balance,
        holdings,
        cumulative_return,
        drawdown,
    }
}

fn to_trading_signal(raw: RawSignal) -> TradingSignal {
    let origin = match raw.signal_type {
        RawSignalType::StopLoss => SignalOrigin::StopLoss,
        RawSignalType::TakeProfit => SignalOrigin::TakeProfit,
        _ => SignalOrigin::Algorithm,
    };
    let action = match raw.signal_type {
        RawSignalType::Buy => SignalAction::Buy,
        RawSignalType::Sell | RawSignalType::StopLoss | RawSignalType::TakeProfit => SignalAction::Sell,
        RawSignalType::Hold => SignalAction::Hold,
    };

    TradingSignal {
        action,
        coin_id: raw.coin_id,
        quantity: raw.quantity,
        percentage: raw.strength,
        confidence: raw.confidence,
        reason: raw.reason,
        metadata: raw.metadata,
        origin,
    }
}
