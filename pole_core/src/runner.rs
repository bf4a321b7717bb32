//! Tick scheduler.
//!
//! Moves a [`Pole`] onto one worker thread that ticks it at a fixed period.
//! Operator actions travel over a channel and are applied between ticks, so a
//! command never interleaves with a half-finished tick.
//!
//! A [`Script`] can pin operator actions to tick numbers and stop the session
//! after a fixed number of ticks, which keeps headless runs reproducible.
//!
//! The worker is shut down and joined when the [`PoleRunner`] is dropped.

use crossbeam_channel as xch;
use pole_traits::{Clock, Publisher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{PoleError, Result};
use crate::pole::Pole;
use crate::session::SessionInput;
use crate::status::{CommandOutcome, PoleState, StatusView};

type Reply<T> = xch::Sender<T>;

/// Operator action that can be scripted against a tick number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedAction {
    Movement,
    EmergencyCall,
}

/// Actions applied by the worker itself, between ticks.
///
/// An action at `n` runs after the `n`-th tick of the session and before the
/// next one; `0` means before the first tick.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub actions: Vec<(u64, ScriptedAction)>,
    /// Stop the session once this many ticks have run.
    pub stop_after: Option<u64>,
}

impl Script {
    pub fn at(mut self, tick: u64, action: ScriptedAction) -> Self {
        self.actions.push((tick, action));
        self
    }

    pub fn stop_after(mut self, ticks: u64) -> Self {
        self.stop_after = Some(ticks);
        self
    }

    fn sorted(mut self) -> Self {
        self.actions.sort_by_key(|(t, _)| *t);
        self
    }
}

enum Command {
    Connect(Reply<CommandOutcome>),
    StartSession(SessionInput, DateTime<Utc>, Reply<CommandOutcome>),
    StopSession(Reply<CommandOutcome>),
    Movement(Reply<CommandOutcome>),
    Emergency(Reply<CommandOutcome>),
    Status(Reply<StatusView>),
    Shutdown,
}

/// Handle to a pole running on its own thread.
pub struct PoleRunner<P: Publisher + Send + 'static> {
    tx: xch::Sender<Command>,
    ticks: Arc<AtomicU64>,
    join_handle: Option<JoinHandle<Pole<P>>>,
}

impl<P: Publisher + Send + 'static> PoleRunner<P> {
    /// Start ticking `pole` every `period` on a new thread.
    pub fn spawn<C: Clock + Send + 'static>(pole: Pole<P>, period: Duration, clock: C) -> Self {
        Self::spawn_scripted(pole, period, clock, Script::default())
    }

    /// Like [`PoleRunner::spawn`], with scripted actions and an optional tick limit.
    pub fn spawn_scripted<C: Clock + Send + 'static>(
        pole: Pole<P>,
        period: Duration,
        clock: C,
        script: Script,
    ) -> Self {
        let (tx, rx) = xch::unbounded::<Command>();
        let ticks = Arc::new(AtomicU64::new(0));
        let ticks_clone = ticks.clone();
        let period = period.max(Duration::from_millis(1));

        let join_handle = std::thread::spawn(move || {
            let mut pole = pole;
            let script = script.sorted();
            let mut pending = script.actions.iter().peekable();
            let mut session_ticks: u64 = 0;
            let mut next_tick = clock.now() + period;
            loop {
                match rx.recv_timeout(clock.until(next_tick)) {
                    Ok(Command::Shutdown) => break,
                    Ok(cmd) => apply(&mut pole, cmd),
                    Err(xch::RecvTimeoutError::Timeout) => {
                        clock.sleep(clock.until(next_tick));
                        next_tick += period;
                        if pole.state() != PoleState::Active {
                            session_ticks = 0;
                            continue;
                        }
                        while let Some((_, action)) =
                            pending.next_if(|(at, _)| *at <= session_ticks)
                        {
                            let outcome = match action {
                                ScriptedAction::Movement => pole.inject_movement(),
                                ScriptedAction::EmergencyCall => pole.emergency_call(),
                            };
                            tracing::debug!(
                                ?action,
                                tick = session_ticks,
                                outcome = outcome.describe(),
                                "scripted action"
                            );
                        }
                        if let Some(report) = pole.tick().report() {
                            session_ticks = report.tick;
                            ticks_clone.fetch_add(1, Ordering::Relaxed);
                        }
                        if script.stop_after.is_some_and(|n| session_ticks >= n) {
                            let _ = pole.stop_session();
                        }
                    }
                    Err(xch::RecvTimeoutError::Disconnected) => {
                        tracing::debug!("runner handle dropped, exiting");
                        break;
                    }
                }
            }
            tracing::trace!("runner thread exiting cleanly");
            pole
        });

        Self {
            tx,
            ticks,
            join_handle: Some(join_handle),
        }
    }

    /// Ticks that ran against an active session since spawn.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn connect(&self) -> Result<CommandOutcome> {
        self.request(Command::Connect)
    }

    pub fn start_session(&self, input: SessionInput, at: DateTime<Utc>) -> Result<CommandOutcome> {
        self.request(|reply| Command::StartSession(input, at, reply))
    }

    pub fn stop_session(&self) -> Result<CommandOutcome> {
        self.request(Command::StopSession)
    }

    pub fn inject_movement(&self) -> Result<CommandOutcome> {
        self.request(Command::Movement)
    }

    pub fn emergency_call(&self) -> Result<CommandOutcome> {
        self.request(Command::Emergency)
    }

    pub fn status(&self) -> Result<StatusView> {
        self.request(Command::Status)
    }

    /// Stop the worker and hand the pole back.
    pub fn shutdown(mut self) -> Option<Pole<P>> {
        self.join()
    }

    fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = xch::bounded(1);
        self.tx
            .send(make(reply_tx))
            .map_err(|_| PoleError::State("runner thread is gone".into()))?;
        let v = reply_rx
            .recv()
            .map_err(|_| PoleError::State("runner thread dropped the reply".into()))?;
        Ok(v)
    }

    fn join(&mut self) -> Option<Pole<P>> {
        let handle = self.join_handle.take()?;
        let _ = self.tx.send(Command::Shutdown);
        match handle.join() {
            Ok(pole) => Some(pole),
            Err(e) => {
                tracing::warn!(?e, "runner thread panicked during shutdown");
                None
            }
        }
    }
}

impl<P: Publisher + Send + 'static> Drop for PoleRunner<P> {
    fn drop(&mut self) {
        let _ = self.join();
    }
}

fn apply<P: Publisher>(pole: &mut Pole<P>, cmd: Command) {
    // A send error means the caller stopped waiting; the command still applied.
    match cmd {
        Command::Connect(reply) => {
            let _ = reply.send(pole.connect());
        }
        Command::StartSession(input, at, reply) => {
            let _ = reply.send(pole.start_session(&input, at));
        }
        Command::StopSession(reply) => {
            let _ = reply.send(pole.stop_session());
        }
        Command::Movement(reply) => {
            let _ = reply.send(pole.inject_movement());
        }
        Command::Emergency(reply) => {
            let _ = reply.send(pole.emergency_call());
        }
        Command::Status(reply) => {
            let _ = reply.send(pole.status_view());
        }
        Command::Shutdown => {}
    }
}
