//! Polling trading bot: an explicit Idle → Running → Stopped state machine.
//!
//! Each cycle fetches recent ticks, normalizes them into a daily series,
//! computes the moving averages, classifies the latest crossover and, on Buy or
//! Sell, fills one order at the last close. The wait between cycles blocks on a
//! control channel, so [`BotHandle::stop`] ends it immediately.

use chrono::NaiveDate;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::error::CryptosimError;
use crate::domain::indicator::{self, IndicatorSnapshot};
use crate::domain::ledger::{self, Fill, LedgerState};
use crate::domain::price_series::PriceSeries;
use crate::domain::signal::{self, Signal};
use crate::domain::tick::TradingPair;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub pair: TradingPair,
    pub poll_interval: Duration,
    pub initial_balance: f64,
    pub short_window: usize,
    pub long_window: usize,
    pub order_quantity: f64,
    /// Days of closes behind the latest snapshot. Each cycle requests one
    /// more day so the previous snapshot is defined too.
    pub history_limit: usize,
    /// Stop after this many cycles; `None` runs until stopped.
    pub max_cycles: Option<usize>,
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), CryptosimError> {
        if self.poll_interval.is_zero() {
            return Err(CryptosimError::invalid_parameter(
                "poll_interval",
                "must be positive",
            ));
        }
        if !(self.initial_balance.is_finite() && self.initial_balance > 0.0) {
            return Err(CryptosimError::invalid_parameter(
                "initial_balance",
                format!("must be positive, got {}", self.initial_balance),
            ));
        }
        if !(self.order_quantity.is_finite() && self.order_quantity > 0.0) {
            return Err(CryptosimError::invalid_parameter(
                "order_quantity",
                format!("must be positive, got {}", self.order_quantity),
            ));
        }
        if self.history_limit == 0 {
            return Err(CryptosimError::invalid_parameter(
                "history_limit",
                "must be at least 1",
            ));
        }
        indicator::validate_windows(self.short_window, self.long_window)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Idle,
    Running,
    Stopped,
}

impl BotState {
    pub fn name(self) -> &'static str {
        match self {
            BotState::Idle => "idle",
            BotState::Running => "running",
            BotState::Stopped => "stopped",
        }
    }
}

/// Outcome of one fetch → signal → execute cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub date: NaiveDate,
    pub last_close: f64,
    pub snapshot: IndicatorSnapshot,
    pub signal: Signal,
    pub fill: Option<Fill>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub cycles: usize,
    pub failed_cycles: usize,
    pub fills: usize,
    pub ledger: LedgerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Stop,
}

/// Sending side of the control channel. Cloneable; any clone can stop the bot.
#[derive(Debug, Clone)]
pub struct BotHandle {
    tx: Sender<BotCommand>,
}

impl BotHandle {
    /// Request a stop. Returns false if the bot's control side is gone.
    pub fn stop(&self) -> bool {
        self.tx.send(BotCommand::Stop).is_ok()
    }
}

#[derive(Debug)]
pub struct BotControl {
    rx: Receiver<BotCommand>,
}

impl BotControl {
    fn stop_requested(&self) -> bool {
        matches!(self.rx.try_recv(), Ok(BotCommand::Stop))
    }

    /// Block for up to `timeout`; true if a stop arrived meanwhile.
    fn wait(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(BotCommand::Stop) => true,
            Err(RecvTimeoutError::Timeout) => false,
            // Nobody can send a stop any more; keep the cadence.
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                false
            }
        }
    }

    #[cfg(test)]
    fn is_drained(&self) -> bool {
        matches!(self.rx.try_recv(), Err(mpsc::TryRecvError::Empty))
    }
}

pub fn control_channel() -> (BotHandle, BotControl) {
    let (tx, rx) = mpsc::channel();
    (BotHandle { tx }, BotControl { rx })
}

#[derive(Debug)]
pub struct Bot {
    config: BotConfig,
    state: BotState,
    ledger: LedgerState,
    fills: Vec<Fill>,
    /// Last series date an order was filled on.
    last_traded: Option<NaiveDate>,
}

impl Bot {
    pub fn new(config: BotConfig) -> Result<Self, CryptosimError> {
        config.validate()?;
        let ledger = LedgerState::new(config.initial_balance);
        Ok(Bot {
            config,
            state: BotState::Idle,
            ledger,
            fills: Vec::new(),
            last_traded: None,
        })
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn ledger(&self) -> LedgerState {
        self.ledger
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Idle or Stopped → Running with a fresh ledger.
    pub fn start(&mut self) -> Result<(), CryptosimError> {
        match self.state {
            BotState::Idle | BotState::Stopped => {
                self.ledger = LedgerState::new(self.config.initial_balance);
                self.fills.clear();
                self.last_traded = None;
                self.transition(BotState::Running);
                Ok(())
            }
            BotState::Running => Err(self.invalid(BotState::Running)),
        }
    }

    /// Stopped → Running, keeping the ledger and fill history.
    pub fn resume(&mut self) -> Result<(), CryptosimError> {
        match self.state {
            BotState::Stopped => {
                self.transition(BotState::Running);
                Ok(())
            }
            _ => Err(self.invalid(BotState::Running)),
        }
    }

    pub fn stop(&mut self) -> Result<(), CryptosimError> {
        match self.state {
            BotState::Running => {
                self.transition(BotState::Stopped);
                Ok(())
            }
            _ => Err(self.invalid(BotState::Stopped)),
        }
    }

    fn transition(&mut self, to: BotState) {
        debug!(from = self.state.name(), to = to.name(), "bot state change");
        self.state = to;
    }

    fn invalid(&self, to: BotState) -> CryptosimError {
        CryptosimError::InvalidTransition {
            from: self.state.name(),
            to: to.name(),
        }
    }

    /// One fetch → normalize → compute → classify → execute pass.
    ///
    /// A Buy or Sell fills at most once per series date, so polling faster
    /// than the data updates does not repeat the order.
    pub fn run_cycle(&mut self, port: &dyn DataPort) -> Result<CycleReport, CryptosimError> {
        if self.state != BotState::Running {
            return Err(self.invalid(BotState::Running));
        }

        let days = self.config.history_limit.saturating_add(1);
        let ticks = port.fetch_daily_ticks(&self.config.pair, days)?;
        let series = PriceSeries::normalize(&ticks)?;
        let snapshots =
            indicator::compute(&series, self.config.short_window, self.config.long_window)?;
        let signal = signal::latest_signal(&snapshots);
        let snapshot = snapshots
            .last()
            .copied()
            .ok_or_else(|| CryptosimError::InsufficientData {
                reason: "no indicator snapshots".into(),
            })?;

        let date = series.last_date();
        let last_close = series.last_close();

        let fill = match signal.order_type() {
            Some(_) if self.last_traded == Some(date) => {
                debug!(%date, %signal, "already traded on this date");
                None
            }
            Some(order_type) => {
                self.ledger = ledger::execute_order(
                    self.ledger,
                    order_type,
                    last_close,
                    self.config.order_quantity,
                )?;
                let fill = Fill {
                    date,
                    order_type,
                    price: last_close,
                    quantity: self.config.order_quantity,
                    state: self.ledger,
                };
                info!(
                    pair = %self.config.pair,
                    price = last_close,
                    quantity = self.config.order_quantity,
                    cash = self.ledger.cash_balance,
                    position = self.ledger.position_quantity,
                    "{order_type} executed"
                );
                self.last_traded = Some(date);
                self.fills.push(fill.clone());
                Some(fill)
            }
            None => None,
        };

        Ok(CycleReport {
            date,
            last_close,
            snapshot,
            signal,
            fill,
        })
    }

    /// Run cycles until stopped, `max_cycles` is reached or a ledger error occurs.
    ///
    /// An Idle bot is started first. Data and indicator failures abort only the
    /// cycle they happen in.
    pub fn run(
        &mut self,
        port: &dyn DataPort,
        control: &BotControl,
    ) -> Result<RunSummary, CryptosimError> {
        if self.state == BotState::Idle {
            self.start()?;
        }
        if self.state != BotState::Running {
            return Err(self.invalid(BotState::Running));
        }

        info!(
            pair = %self.config.pair,
            short = self.config.short_window,
            long = self.config.long_window,
            interval_secs = self.config.poll_interval.as_secs_f64(),
            "bot running"
        );

        let mut cycles = 0;
        let mut failed = 0;

        loop {
            if control.stop_requested() {
                break;
            }

            match self.run_cycle(port) {
                Ok(report) => info!(
                    cycle = cycles + 1,
                    date = %report.date,
                    close = report.last_close,
                    signal = %report.signal,
                    "cycle complete"
                ),
                Err(e) if e.is_cycle_local() => {
                    failed += 1;
                    warn!(cycle = cycles + 1, error = %e, "cycle aborted");
                }
                Err(e) => {
                    self.transition(BotState::Stopped);
                    return Err(e);
                }
            }
            cycles += 1;

            if self.config.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }
            if control.wait(self.config.poll_interval) {
                break;
            }
        }

        self.stop()?;
        info!(
            cycles,
            failed,
            fills = self.fills.len(),
            cash = self.ledger.cash_balance,
            position = self.ledger.position_quantity,
            "bot stopped"
        );

        Ok(RunSummary {
            cycles,
            failed_cycles: failed,
            fills: self.fills.len(),
            ledger: self.ledger,
        })
    }
}
