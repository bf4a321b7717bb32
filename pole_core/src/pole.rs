//! The session state machine (`Pole`).
//!
//! Sequences the pipeline for one simulated device across
//! `Idle -> Connected -> Active -> Stopped`. Each call to [`Pole::tick`] is one
//! simulated second and runs simulate -> classify -> compose -> alert as a
//! single step; operator actions are plain `&mut self` calls, so they can only
//! ever land between two ticks.

use chrono::{DateTime, TimeDelta, Utc};
use pole_traits::Publisher;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::alerts::{Alert, AlertPolicy, Severity};
use crate::config::{BatteryCfg, DeviceIdentity, PoleCfg};
use crate::error::PoleError;
use crate::message::{self, AlertData, Message, StatusReport};
use crate::session::{Session, SessionInput};
use crate::simulator::WeightSimulator;
use crate::stability::StabilityDetector;
use crate::status::{
    CommandOutcome, PoleState, SessionStatus, StatusView, TickOutcome, TickReport,
};
use crate::telemetry::{self, StabilityReading};

/// Signal strength reported in status messages is drawn from this range (dBm).
const SIGNAL_DBM: std::ops::Range<i32> = -65..-45;

/// Per-session device state. Dropped when the session stops.
#[derive(Debug)]
struct ActiveSession {
    session: Session,
    sim: WeightSimulator,
    stability: StabilityDetector,
    alerts: AlertPolicy,
    ticks: u64,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Connected,
    Active(Box<ActiveSession>),
    Stopped,
}

/// Battery level; persists across sessions, only ever drains.
#[derive(Debug, Clone)]
struct Battery {
    cfg: BatteryCfg,
    pct: f64,
}

impl Battery {
    fn new(cfg: BatteryCfg) -> Self {
        let pct = cfg.initial_pct.clamp(cfg.floor_pct, 100.0);
        Self { cfg, pct }
    }

    fn drain(&mut self) {
        self.pct = (self.pct - self.cfg.drain_per_status_pct).max(self.cfg.floor_pct);
    }
}

/// Publishing side of the pole. Failures are logged and counted, never propagated.
struct Outlet<P> {
    publisher: P,
    identity: DeviceIdentity,
    alert_seq: u64,
    published: u64,
    failures: u64,
}

impl<P: Publisher> Outlet<P> {
    fn emit(&mut self, msg: Result<Message, PoleError>) {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "dropping message");
                return;
            }
        };
        match self.publisher.publish(&msg.topic, msg.qos, &msg.payload) {
            Ok(()) => {
                self.published += 1;
                tracing::trace!(topic = %msg.topic, qos = msg.qos.level(), "published");
            }
            Err(e) => {
                self.failures += 1;
                let err = PoleError::Publish(e.to_string());
                tracing::warn!(topic = %msg.topic, error = %err, "publish failed; continuing");
            }
        }
    }

    fn raise(&mut self, alert: &Alert, at: DateTime<Utc>, data: &AlertData) {
        self.alert_seq += 1;
        let alert_id = format!("ALERT-{}-{}", at.timestamp_millis(), self.alert_seq);
        match alert.severity {
            Severity::Warning => {
                tracing::warn!(
                    kind = ?alert.kind,
                    %alert_id,
                    text = %alert.message,
                    "alert"
                )
            }
            Severity::Critical => {
                tracing::error!(
                    kind = ?alert.kind,
                    %alert_id,
                    text = %alert.message,
                    "alert"
                )
            }
        }
        self.emit(message::alert(
            &self.identity.pole_id,
            &alert_id,
            at,
            alert,
            data,
        ));
    }

    fn alert_data(
        &self,
        session: Option<&Session>,
        remaining_pct: Option<f64>,
        battery_pct: f64,
    ) -> AlertData {
        AlertData {
            bed: self.identity.bed.clone(),
            session_id: session.map(|s| s.session_id.clone()),
            patient_id: session.map(|s| s.patient_id.clone()),
            remaining: remaining_pct,
            flow_rate: session.map(Session::flow_rate_ml_per_min),
            battery: battery_pct,
        }
    }
}

/// Publish a status report, drain the battery, then check BATTERY_LOW.
fn report_status<P: Publisher, R: Rng + ?Sized>(
    out: &mut Outlet<P>,
    battery: &mut Battery,
    rng: &mut R,
    alerts: &mut AlertPolicy,
    session: &Session,
    remaining_pct: f64,
    at: DateTime<Utc>,
) {
    let report = StatusReport::new(battery.pct, rng.gen_range(SIGNAL_DBM));
    out.emit(message::status(&out.identity.pole_id, at, &report));
    battery.drain();
    tracing::info!(battery_pct = battery.pct, "status report");

    if let Some(alert) = alerts.check_battery(battery.pct) {
        let data = out.alert_data(Some(session), Some(remaining_pct), battery.pct);
        out.raise(&alert, at, &data);
    }
}

/// One simulated infusion pole.
pub struct Pole<P: Publisher> {
    cfg: PoleCfg,
    out: Outlet<P>,
    rng: ChaCha8Rng,
    span: tracing::Span,
    phase: Phase,
    battery: Battery,
    sim_now: DateTime<Utc>,
}

impl<P: Publisher> core::fmt::Debug for Pole<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pole")
            .field("pole_id", &self.cfg.identity.pole_id)
            .field("state", &self.state())
            .field("battery_pct", &self.battery.pct)
            .field("sim_now", &self.sim_now)
            .finish()
    }
}

impl<P: Publisher> Pole<P> {
    /// Create an idle pole. `epoch` seeds the simulated clock until a session starts.
    pub fn new(cfg: PoleCfg, publisher: P, epoch: DateTime<Utc>) -> Self {
        let span = tracing::info_span!(
            "pole",
            pole_id = %cfg.identity.pole_id,
            bed = %cfg.identity.bed
        );
        Self::with_span(cfg, publisher, epoch, span)
    }

    /// Like [`Pole::new`] but logging under a caller-provided span.
    pub fn with_span(
        cfg: PoleCfg,
        publisher: P,
        epoch: DateTime<Utc>,
        span: tracing::Span,
    ) -> Self {
        let rng = match cfg.simulation.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let battery = Battery::new(cfg.battery.clone());
        let out = Outlet {
            publisher,
            identity: cfg.identity.clone(),
            alert_seq: 0,
            published: 0,
            failures: 0,
        };
        Self {
            cfg,
            out,
            rng,
            span,
            phase: Phase::Idle,
            battery,
            sim_now: epoch,
        }
    }

    pub fn state(&self) -> PoleState {
        match self.phase {
            Phase::Idle => PoleState::Idle,
            Phase::Connected => PoleState::Connected,
            Phase::Active(_) => PoleState::Active,
            Phase::Stopped => PoleState::Stopped,
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.cfg.identity
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Active(a) => Some(&a.session),
            _ => None,
        }
    }

    pub fn simulator(&self) -> Option<&WeightSimulator> {
        match &self.phase {
            Phase::Active(a) => Some(&a.sim),
            _ => None,
        }
    }

    pub fn is_stable(&self) -> bool {
        match &self.phase {
            Phase::Active(a) => a.stability.is_stable(),
            _ => false,
        }
    }

    pub fn battery_pct(&self) -> f64 {
        self.battery.pct
    }

    /// Current simulated time (advances one second per tick).
    pub fn sim_now(&self) -> DateTime<Utc> {
        self.sim_now
    }

    /// Messages handed to the publisher successfully / unsuccessfully.
    pub fn publish_counts(&self) -> (u64, u64) {
        (self.out.published, self.out.failures)
    }

    pub fn publisher(&self) -> &P {
        &self.out.publisher
    }

    /// Transport reported a successful connection.
    pub fn connect(&mut self) -> CommandOutcome {
        let span = self.span.clone();
        let _enter = span.enter();
        if matches!(self.phase, Phase::Idle) {
            self.phase = Phase::Connected;
            tracing::info!("transport connected");
        }
        CommandOutcome::Done
    }

    /// Build the session from operator input and reset device state.
    ///
    /// Allowed from `Connected` and `Stopped`.
    pub fn start_session(&mut self, input: &SessionInput, at: DateTime<Utc>) -> CommandOutcome {
        let span = self.span.clone();
        let _enter = span.enter();
        match self.phase {
            Phase::Idle => {
                tracing::warn!("start_session ignored: not connected");
                return CommandOutcome::NotConnected;
            }
            Phase::Active(_) => {
                tracing::warn!("start_session ignored: session already active");
                return CommandOutcome::AlreadyActive;
            }
            Phase::Connected | Phase::Stopped => {}
        }

        let session = Session::create(
            input,
            &self.cfg.defaults,
            &self.cfg.identity.nurse_id,
            at,
        );
        tracing::info!(
            session_id = %session.session_id,
            patient_id = %session.patient_id,
            drug = %session.drug_type,
            volume_ml = session.initial_volume_ml,
            duration_min = session.prescribed_duration_min,
            drip_rate_gtt = session.prescribed_drip_rate_gtt,
            "session started"
        );

        let mut active = Box::new(ActiveSession {
            sim: WeightSimulator::new(session.initial_weight_g),
            stability: StabilityDetector::new(self.cfg.stability.clone()),
            alerts: AlertPolicy::new(self.cfg.alerts.clone()),
            ticks: 0,
            session,
        });
        self.sim_now = at;

        let remaining = telemetry::remaining_pct(
            active.sim.current_weight_g(),
            self.cfg.simulation.empty_container_g,
            active.session.initial_volume_ml,
        );
        report_status(
            &mut self.out,
            &mut self.battery,
            &mut self.rng,
            &mut active.alerts,
            &active.session,
            remaining,
            self.sim_now,
        );

        self.phase = Phase::Active(active);
        CommandOutcome::Done
    }

    /// Halt the session. Device state is discarded; no further tick has any effect.
    pub fn stop_session(&mut self) -> CommandOutcome {
        let span = self.span.clone();
        let _enter = span.enter();
        let Phase::Active(active) = &self.phase else {
            tracing::debug!("stop_session ignored: no active session");
            return CommandOutcome::NoActiveSession;
        };
        tracing::info!(
            session_id = %active.session.session_id,
            ticks = active.ticks,
            "session stopped"
        );
        self.phase = Phase::Stopped;
        CommandOutcome::Done
    }

    /// Operator bumped the pole: start a disturbance and reset the stability window.
    pub fn inject_movement(&mut self) -> CommandOutcome {
        let span = self.span.clone();
        let _enter = span.enter();
        let Phase::Active(active) = &mut self.phase else {
            tracing::debug!("inject_movement ignored: no active session");
            return CommandOutcome::NoActiveSession;
        };
        let noise = active.sim.inject_movement(&self.cfg.simulation, &mut self.rng);
        active.stability.disturb();
        tracing::warn!(noise_g = noise, "movement detected");
        CommandOutcome::Done
    }

    /// Nurse-call button: publish the call and a CRITICAL alert, once per invocation.
    pub fn emergency_call(&mut self) -> CommandOutcome {
        let span = self.span.clone();
        let _enter = span.enter();
        if matches!(self.phase, Phase::Idle) {
            tracing::warn!("emergency_call ignored: not connected");
            return CommandOutcome::NotConnected;
        }
        let at = self.sim_now;
        self.out.emit(message::nurse_call(
            &self.cfg.identity.pole_id,
            &self.cfg.identity.bed,
            at,
        ));

        let (session, remaining) = match &self.phase {
            Phase::Active(a) => (
                Some(&a.session),
                Some(telemetry::remaining_pct(
                    a.sim.current_weight_g(),
                    self.cfg.simulation.empty_container_g,
                    a.session.initial_volume_ml,
                )),
            ),
            _ => (None, None),
        };
        let data = self.out.alert_data(session, remaining, self.battery.pct);
        self.out.raise(&AlertPolicy::emergency_call(), at, &data);
        CommandOutcome::Done
    }

    /// Run one simulated second.
    pub fn tick(&mut self) -> TickOutcome {
        let span = self.span.clone();
        let _enter = span.enter();
        let Phase::Active(active) = &mut self.phase else {
            tracing::trace!("tick skipped: no active session");
            return TickOutcome::NoActiveSession;
        };
        let sim_cfg = &self.cfg.simulation;

        // Simulate
        let flow_g_per_sec = active.session.flow_rate_g_per_sec();
        let drained = active.sim.advance(flow_g_per_sec, sim_cfg, &mut self.rng);

        // Classify
        let observed = active.sim.observed_weight_g();
        let is_stable = active
            .stability
            .observe(observed, active.sim.movement_noise_g());
        let score = active.stability.score(&mut self.rng);
        active.sim.decay_movement(sim_cfg);
        // The published reading carries the noise left after this tick's decay.
        let observed = active.sim.observed_weight_g();

        // Compose
        self.sim_now += TimeDelta::seconds(1);
        let snapshot = telemetry::compose(
            &active.session,
            &mut active.sim,
            StabilityReading {
                observed_weight_g: observed,
                is_stable,
                score,
            },
            sim_cfg.empty_container_g,
            self.sim_now,
        );
        active.ticks += 1;
        self.out.emit(message::telemetry(
            &self.cfg.identity.pole_id,
            self.sim_now,
            &snapshot,
            &active.session,
        ));
        if is_stable {
            tracing::debug!(
                weight_g = snapshot.current_weight_g,
                remaining_pct = snapshot.remaining_pct,
                "telemetry (stable)"
            );
        } else {
            tracing::debug!(weight_g = snapshot.current_weight_g, "telemetry (movement)");
        }

        // Alert
        let mut alerts = active.alerts.check_fluid(snapshot.remaining_pct);
        alerts.extend(
            active
                .alerts
                .roll_flow_abnormal(&mut self.rng, snapshot.flow_rate_ml_per_min),
        );
        let data = self.out.alert_data(
            Some(&active.session),
            Some(snapshot.remaining_pct),
            self.battery.pct,
        );
        for alert in &alerts {
            self.out.raise(alert, self.sim_now, &data);
        }

        // Status cadence
        let every = u64::from(sim_cfg.status_every_ticks.max(1));
        let status_published = active.ticks % every == 0;
        if status_published {
            report_status(
                &mut self.out,
                &mut self.battery,
                &mut self.rng,
                &mut active.alerts,
                &active.session,
                snapshot.remaining_pct,
                self.sim_now,
            );
        }

        TickOutcome::Ticked(Box::new(TickReport {
            tick: active.ticks,
            snapshot,
            drained,
            alerts_raised: alerts.len(),
            status_published,
        }))
    }

    /// Snapshot for an operator "show status" request.
    pub fn status_view(&self) -> StatusView {
        let session = match &self.phase {
            Phase::Active(a) => Some(SessionStatus {
                session_id: a.session.session_id.clone(),
                patient_id: a.session.patient_id.clone(),
                drug_type: a.session.drug_type.clone(),
                current_weight_g: a.sim.current_weight_g(),
                remaining_pct: telemetry::remaining_pct(
                    a.sim.current_weight_g(),
                    self.cfg.simulation.empty_container_g,
                    a.session.initial_volume_ml,
                ),
                is_stable: a.stability.is_stable(),
                movement_noise_g: a.sim.movement_noise_g(),
                ticks: a.ticks,
            }),
            _ => None,
        };
        StatusView {
            state: self.state(),
            pole_id: self.cfg.identity.pole_id.clone(),
            battery_pct: self.battery.pct,
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::RecordingPublisher;

    fn seeded() -> PoleCfg {
        let mut cfg = PoleCfg::default();
        cfg.simulation.seed = Some(5);
        cfg
    }

    #[test]
    fn starting_resets_device_state() {
        let mut pole = Pole::new(seeded(), RecordingPublisher::new(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(pole.connect(), CommandOutcome::Done);
        let input = SessionInput::new().volume_ml("300");
        assert!(pole.start_session(&input, DateTime::<Utc>::UNIX_EPOCH).is_done());
        let sim = pole.simulator().unwrap();
        assert_eq!(sim.current_weight_g(), 300.0);
        assert_eq!(sim.previous_weight_g(), 300.0);
        assert_eq!(sim.movement_noise_g(), 0.0);
        assert!(!pole.is_stable());
    }

    #[test]
    fn sim_clock_advances_one_second_per_tick() {
        let t0 = DateTime::<Utc>::UNIX_EPOCH;
        let mut pole = Pole::new(seeded(), RecordingPublisher::new(), t0);
        let _ = pole.connect();
        let _ = pole.start_session(&SessionInput::new(), t0);
        for _ in 0..10 {
            let _ = pole.tick();
        }
        assert_eq!((pole.sim_now() - t0).num_seconds(), 10);
    }

    #[test]
    fn debug_is_compact() {
        let pole = Pole::new(seeded(), RecordingPublisher::new(), DateTime::<Utc>::UNIX_EPOCH);
        let s = format!("{pole:?}");
        assert!(s.contains("POLE-301A-1"));
        assert!(s.contains("Idle"));
    }
}
