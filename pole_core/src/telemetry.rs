//! Telemetry composer: turns simulator and detector state into one snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::Session;
use crate::simulator::WeightSimulator;
use crate::util::{SECS_PER_MIN, add_minutes};

/// Result of the stability stage for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityReading {
    pub observed_weight_g: f64,
    pub is_stable: bool,
    /// Cosmetic; never used for control.
    pub score: f64,
}

/// Per-tick derived telemetry. Field names match the wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Observed load-cell reading including any disturbance.
    #[serde(rename = "weight")]
    pub weight_g: f64,
    #[serde(rename = "previousWeight")]
    pub previous_weight_g: f64,
    /// Positive while draining (g/min).
    #[serde(rename = "weightChangeRate")]
    pub weight_change_rate_g_per_min: f64,
    pub is_stable: bool,
    #[serde(rename = "stability")]
    pub stability_score: f64,
    #[serde(rename = "flowRate")]
    pub flow_rate_ml_per_min: f64,
    /// Remaining fluid as a percentage of the initial volume, clamped at 0.
    #[serde(rename = "remaining")]
    pub remaining_pct: f64,
    #[serde(rename = "dripRate")]
    pub drip_rate_gtt: u32,
    /// `None` once the bag is empty or nothing is flowing.
    pub calculated_end_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub current_weight_g: f64,
    #[serde(skip)]
    pub remaining_volume_ml: f64,
    #[serde(skip)]
    pub minutes_remaining: Option<f64>,
}

/// Remaining fluid as a percentage of the initial volume, never below 0.
pub fn remaining_pct(current_weight_g: f64, empty_container_g: f64, initial_volume_ml: f64) -> f64 {
    ((current_weight_g - empty_container_g) / initial_volume_ml * 100.0).max(0.0)
}

/// Compose the snapshot for `now`, then advance the simulator's previous
/// reading to the current one.
pub fn compose(
    session: &Session,
    sim: &mut WeightSimulator,
    reading: StabilityReading,
    empty_container_g: f64,
    now: DateTime<Utc>,
) -> TelemetrySnapshot {
    let current = sim.current_weight_g();
    let previous = sim.previous_weight_g();

    let remaining_volume_ml = current - empty_container_g;
    let remaining_pct = remaining_pct(current, empty_container_g, session.initial_volume_ml);
    let flow = session.flow_rate_ml_per_min();

    let minutes_remaining =
        (remaining_volume_ml > 0.0 && flow > 0.0).then(|| remaining_volume_ml / flow);
    let calculated_end_time = minutes_remaining.and_then(|m| add_minutes(now, m));

    let snapshot = TelemetrySnapshot {
        weight_g: reading.observed_weight_g,
        previous_weight_g: previous,
        weight_change_rate_g_per_min: (previous - current) * SECS_PER_MIN,
        is_stable: reading.is_stable,
        stability_score: reading.score,
        flow_rate_ml_per_min: flow,
        remaining_pct,
        drip_rate_gtt: session.prescribed_drip_rate_gtt,
        calculated_end_time,
        current_weight_g: current,
        remaining_volume_ml,
        minutes_remaining,
    };

    sim.commit();
    snapshot
}
