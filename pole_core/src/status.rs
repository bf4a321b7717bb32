//! Results reported back to callers of the session state machine.

use crate::telemetry::TelemetrySnapshot;

/// Lifecycle of one pole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoleState {
    Idle,
    Connected,
    Active,
    Stopped,
}

/// Outcome of an operator action. Misuse is reported here, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum CommandOutcome {
    /// The action was applied.
    Done,
    /// The action needs an active session and there is none; nothing changed.
    NoActiveSession,
    /// The action needs a transport connection and the pole is idle; nothing changed.
    NotConnected,
    /// A session is already running; stop it first.
    AlreadyActive,
}

impl CommandOutcome {
    pub fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Done => "ok",
            Self::NoActiveSession => "no active session",
            Self::NotConnected => "not connected",
            Self::AlreadyActive => "session already active",
        }
    }
}

/// What one telemetry tick produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// 1-based tick index within the session.
    pub tick: u64,
    pub snapshot: TelemetrySnapshot,
    /// Whether the weight was decremented this tick.
    pub drained: bool,
    pub alerts_raised: usize,
    pub status_published: bool,
}

/// Result of driving one tick.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Ticked(Box<TickReport>),
    NoActiveSession,
}

impl TickOutcome {
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            Self::Ticked(r) => Some(r),
            Self::NoActiveSession => None,
        }
    }
}

/// Point-in-time view for an operator "show status" request.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub state: PoleState,
    pub pole_id: String,
    pub battery_pct: f64,
    pub session: Option<SessionStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub session_id: String,
    pub patient_id: String,
    pub drug_type: String,
    pub current_weight_g: f64,
    pub remaining_pct: f64,
    pub is_stable: bool,
    pub movement_noise_g: f64,
    pub ticks: u64,
}
