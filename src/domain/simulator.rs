//! Replay kernel: wires the price store, clock, signal engine, ledger and
//! decision policy into a single-threaded step loop.
//!
//! One step is:
//!
//! 1. the clock advances (or, on the first step, stays on `start`)
//! 2. the store resolves ask/bid at the new time
//! 3. the ledger marks every open position and force-closes on TP/SL
//! 4. the signal engine fuses indicator values for the new time
//!
//! after which [`Simulator::decide`] and [`Simulator::apply_action`] run the
//! policy and hand its action to the ledger.

use chrono::NaiveDateTime;

use super::clock::{Clock, ClockState};
use super::config::{AppConfig, ReplayConfig, TradingConfig};
use super::error::{Rejection, ReplayError};
use super::ledger::{AccountParams, Ledger};
use super::metrics::Metrics;
use super::policy::{Action, DecisionPolicy};
use super::price_store::{BarWindow, PriceStore};
use super::signal::Signal;
use super::signal_engine::{SignalEngine, SignalParams};
use super::snapshot::KernelSnapshot;
use super::tick::{PriceSide, Tick};
use super::timeframe::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced(NaiveDateTime),
    Exhausted,
}

impl StepOutcome {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, StepOutcome::Exhausted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Applied,
    Held,
    Rejected(Rejection),
}

/// Totals for a completed replay.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReplaySummary {
    pub steps: usize,
    pub trades: usize,
    pub forced_closes: usize,
    pub rejections: usize,
    pub balance: f64,
    pub equity: f64,
    pub realized_pl: f64,
    pub metrics: Metrics,
}

#[derive(Debug)]
pub struct Simulator {
    store: PriceStore,
    clock: Clock,
    ledger: Ledger,
    engine: SignalEngine,
    policy: DecisionPolicy,
    signal_params: SignalParams,
    pending_start: bool,
    now: Option<NaiveDateTime>,
    steps: usize,
    forced_closes: usize,
    rejections: usize,
}

impl Simulator {
    /// A kernel with nothing loaded. The broker starts switched on.
    pub fn new(trading: TradingConfig, account: AccountParams, signal: SignalParams) -> Self {
        let mut ledger = Ledger::new(account);
        ledger.set_on(true);
        Simulator {
            store: PriceStore::new(),
            clock: Clock::new(),
            ledger,
            engine: SignalEngine::new(&trading.symbol),
            policy: DecisionPolicy::new(trading),
            signal_params: signal,
            pending_start: false,
            now: None,
            steps: 0,
            forced_closes: 0,
            rejections: 0,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mut sim = Simulator::new(
            config.trading.clone(),
            config.account,
            config.signal.clone(),
        );
        sim.ledger.set_live(config.live);
        sim
    }

    pub fn symbol(&self) -> &str {
        &self.policy.config().symbol
    }

    pub fn load_series(&mut self, rows: Vec<Tick>, symbol: &str) {
        self.store.load(rows, symbol);
    }

    /// Parse and apply a replay range. See [`Simulator::configure`].
    pub fn configure_replay(&mut self, start: &str, end: &str, frequency: &str) -> Result<(), ReplayError> {
        self.ensure_loaded()?;
        self.clock.reset(start, end, frequency)?;
        self.prepare_run()
    }

    /// Start a fresh replay over `config`: the ledger is reset to its account
    /// parameters and the signal pipelines are rebuilt. The broker's on/off
    /// switch is left as it was.
    pub fn configure(&mut self, config: &ReplayConfig) -> Result<(), ReplayError> {
        self.ensure_loaded()?;
        self.clock
            .configure(config.start, config.end, config.frequency)?;
        self.prepare_run()
    }

    fn ensure_loaded(&self) -> Result<(), ReplayError> {
        if self.store.is_loaded(self.symbol()) {
            Ok(())
        } else {
            Err(ReplayError::NotLoaded {
                symbol: self.symbol().to_string(),
            })
        }
    }

    fn prepare_run(&mut self) -> Result<(), ReplayError> {
        self.engine
            .setup(self.signal_params.clone(), &mut self.store)?;
        self.ledger.prepare_account(self.ledger.params());
        self.pending_start = true;
        self.now = None;
        self.steps = 0;
        self.forced_closes = 0;
        self.rejections = 0;
        Ok(())
    }

    /// Replace the indicator parameters and rebuild the pipelines. The last
    /// signal goes back to neutral until the next step evaluates.
    pub fn setup_signal(&mut self, params: SignalParams) -> Result<(), ReplayError> {
        self.engine.setup(params.clone(), &mut self.store)?;
        self.signal_params = params;
        Ok(())
    }

    /// Move the replay one step and bring the ledger and signal up to date.
    ///
    /// Returns [`StepOutcome::Exhausted`] once the clock has left the range,
    /// or when no range is configured.
    pub fn advance_one_step(&mut self) -> Result<StepOutcome, ReplayError> {
        let next = if self.pending_start {
            self.pending_start = false;
            self.clock.time()
        } else {
            let next_event = match (self.clock.frequency(), self.clock.time()) {
                (Some(Timeframe::Tick), Some(current)) => {
                    self.store.next_timestamp(self.symbol(), current)?
                }
                _ => None,
            };
            self.clock.advance_with(next_event)
        };

        let Some(now) = next else {
            self.now = None;
            return Ok(StepOutcome::Exhausted);
        };
        self.now = Some(now);

        let symbol = self.policy.config().symbol.clone();
        let fresh = self.store.quote(&symbol, now)?;
        let quote = self.ledger.record_quote(&symbol, fresh);

        let store = &self.store;
        let closed = self
            .ledger
            .mark_to_market(now, |s| store.quote(s, now))?;
        for position in &closed {
            tracing::info!(
                symbol = %position.symbol,
                pnl = position.realized_pnl.unwrap_or_default(),
                at = %now,
                "take-profit/stop-loss triggered"
            );
        }
        self.forced_closes += closed.len();

        self.engine.evaluate(Some(now), quote.map(|q| q.bid));
        self.ledger.record_equity(now);
        self.steps += 1;
        Ok(StepOutcome::Advanced(now))
    }

    /// Run the policy against the current signal, position and quote.
    pub fn decide(&self) -> Action {
        let symbol = self.symbol();
        self.policy.decide(
            self.engine.last_signal(),
            self.ledger.position(symbol),
            self.ledger.last_quote(symbol),
        )
    }

    /// Apply `action` to the ledger. Refusals come back as
    /// [`ActionOutcome::Rejected`]; a broken equity identity afterwards is fatal.
    pub fn apply_action(&mut self, action: Action) -> Result<ActionOutcome, ReplayError> {
        let kind = action.kind();
        let result = match action {
            Action::Open(order) => self.ledger.open(order, self.now).map(|_| ActionOutcome::Applied),
            Action::Close { symbol, comment } => self
                .ledger
                .close(&symbol, &comment, self.now)
                .map(|_| ActionOutcome::Applied),
            Action::Hold => {
                self.ledger.hold();
                Ok(ActionOutcome::Held)
            }
        };

        let outcome = match result {
            Ok(ActionOutcome::Applied) => {
                if let Some(now) = self.now {
                    self.ledger.record_equity(now);
                }
                ActionOutcome::Applied
            }
            Ok(outcome) => outcome,
            Err(rejection) => {
                tracing::warn!(action = kind, %rejection, "action rejected");
                self.rejections += 1;
                ActionOutcome::Rejected(rejection)
            }
        };
        self.ledger.check_equity_identity()?;
        Ok(outcome)
    }

    /// One full cycle: advance, decide, apply.
    pub fn step(&mut self) -> Result<StepOutcome, ReplayError> {
        let outcome = self.advance_one_step()?;
        if !outcome.is_exhausted() {
            let action = self.decide();
            self.apply_action(action)?;
        }
        Ok(outcome)
    }

    /// Step until the replay is exhausted, stopping at the first fatal error.
    pub fn run(&mut self) -> Result<ReplaySummary, ReplayError> {
        if self.clock.is_live() {
            return Err(ReplayError::Invariant {
                reason: "a live clock cannot be replayed to completion".to_string(),
            });
        }
        if self.clock.state() == ClockState::Idle {
            return Err(ReplayError::Invariant {
                reason: "replay range not configured".to_string(),
            });
        }

        while !self.step()?.is_exhausted() {}

        let summary = self.summary();
        tracing::info!(
            steps = summary.steps,
            trades = summary.trades,
            forced_closes = summary.forced_closes,
            balance = summary.balance,
            equity = summary.equity,
            "replay finished"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            steps: self.steps,
            trades: self.ledger.total_trade_count(),
            forced_closes: self.forced_closes,
            rejections: self.rejections,
            balance: self.ledger.balance(),
            equity: self.ledger.equity(),
            realized_pl: self.ledger.realized_pl(),
            metrics: Metrics::compute(
                self.ledger.params().balance,
                self.ledger.trades(),
                self.ledger.equity_curve(),
            ),
        }
    }

    /// As-of price; `at` defaults to the current clock time.
    pub fn price(
        &self,
        symbol: &str,
        side: PriceSide,
        at: Option<NaiveDateTime>,
    ) -> Result<Option<f64>, ReplayError> {
        match at.or_else(|| self.clock.time()) {
            Some(at) => self.store.price(symbol, side, at),
            None => Ok(None),
        }
    }

    /// Bars for `symbol`; `at` defaults to the current clock time.
    pub fn bars(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        at: Option<NaiveDateTime>,
        max_count: Option<usize>,
    ) -> Result<BarWindow, ReplayError> {
        let at = at.or_else(|| self.clock.time());
        self.store.bars(symbol, timeframe, at, max_count)
    }

    pub fn now(&self) -> Option<NaiveDateTime> {
        self.now
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn forced_closes(&self) -> usize {
        self.forced_closes
    }

    pub fn rejections(&self) -> usize {
        self.rejections
    }

    pub fn signal(&self) -> &Signal {
        self.engine.last_signal()
    }

    pub fn store(&self) -> &PriceStore {
        &self.store
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> KernelSnapshot {
        KernelSnapshot {
            clock: self.clock.snapshot(),
            ledger: self.ledger.snapshot(),
            signal: self.engine.snapshot(),
        }
    }
}
