//! Prescription session: the nurse-entered record and its derived constants.
//!
//! A `Session` is built once at session start and never changes until the
//! session stops. Malformed or missing input is replaced field by field with
//! the configured default; creation cannot fail.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::config::SessionDefaults;
use crate::util::{SECS_PER_MIN, parse_positive, parse_whole_minutes};

/// Raw operator input, exactly as typed. `None` or blank means "use the default".
#[derive(Debug, Clone, Default)]
pub struct SessionInput {
    pub patient_id: Option<String>,
    pub drug_type: Option<String>,
    pub volume_ml: Option<String>,
    pub duration_min: Option<String>,
}

impl SessionInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patient_id(mut self, v: impl Into<String>) -> Self {
        self.patient_id = Some(v.into());
        self
    }

    pub fn drug_type(mut self, v: impl Into<String>) -> Self {
        self.drug_type = Some(v.into());
        self
    }

    pub fn volume_ml(mut self, v: impl Into<String>) -> Self {
        self.volume_ml = Some(v.into());
        self
    }

    pub fn duration_min(mut self, v: impl Into<String>) -> Self {
        self.duration_min = Some(v.into());
        self
    }
}

fn text_or(raw: Option<&str>, default: &str) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => default.to_string(),
    }
}

/// The active prescription. Serialized verbatim into every telemetry message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub patient_id: String,
    pub drug_type: String,
    pub nurse_id: String,
    pub initial_volume_ml: f64,
    /// 1 mL of fluid weighs 1 g by convention.
    pub initial_weight_g: f64,
    pub gtt_factor: u32,
    pub prescribed_duration_min: u32,
    /// round(volume * gtt_factor / duration), fixed at creation.
    pub prescribed_drip_rate_gtt: u32,
    pub start_time: DateTime<Utc>,
    pub prescribed_end_time: DateTime<Utc>,
}

impl Session {
    /// Build a session from operator input, substituting defaults for any
    /// absent, non-numeric or non-positive value.
    pub fn create(
        input: &SessionInput,
        defaults: &SessionDefaults,
        nurse_id: &str,
        started_at: DateTime<Utc>,
    ) -> Self {
        let volume = parse_positive(input.volume_ml.as_deref()).unwrap_or(defaults.volume_ml);
        let duration =
            parse_whole_minutes(input.duration_min.as_deref()).unwrap_or(defaults.duration_min);
        let gtt_factor = defaults.gtt_factor.max(1);
        let duration = duration.max(1);

        let drip = (volume * f64::from(gtt_factor) / f64::from(duration)).round();
        let prescribed_drip_rate_gtt = if drip.is_finite() && drip > 0.0 {
            drip.min(f64::from(u32::MAX)) as u32
        } else {
            0
        };

        // u32 minutes always fits in a TimeDelta.
        let span = TimeDelta::minutes(i64::from(duration));
        let prescribed_end_time = started_at
            .checked_add_signed(span)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            session_id: format!("SES-{}", started_at.timestamp_millis()),
            patient_id: text_or(input.patient_id.as_deref(), &defaults.patient_id),
            drug_type: text_or(input.drug_type.as_deref(), &defaults.drug_type),
            nurse_id: nurse_id.to_string(),
            initial_volume_ml: volume,
            initial_weight_g: volume,
            gtt_factor,
            prescribed_duration_min: duration,
            prescribed_drip_rate_gtt,
            start_time: started_at,
            prescribed_end_time,
        }
    }

    /// Prescribed flow in mL/min, derived from the rounded drip rate.
    #[inline]
    pub fn flow_rate_ml_per_min(&self) -> f64 {
        f64::from(self.prescribed_drip_rate_gtt) / f64::from(self.gtt_factor)
    }

    /// Prescribed flow in g/s (1 mL = 1 g).
    #[inline]
    pub fn flow_rate_g_per_sec(&self) -> f64 {
        self.flow_rate_ml_per_min() / SECS_PER_MIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn derives_drip_rate_from_volume_and_duration() {
        let input = SessionInput::new().volume_ml("500").duration_min("240");
        let s = Session::create(&input, &SessionDefaults::default(), "N-1", t0());
        assert_eq!(s.prescribed_drip_rate_gtt, 42);
        assert!((s.flow_rate_ml_per_min() - 2.1).abs() < 1e-12);
        assert!((s.flow_rate_g_per_sec() - 0.035).abs() < 1e-12);
        assert_eq!(
            (s.prescribed_end_time - s.start_time).num_minutes(),
            240
        );
        assert_eq!(s.session_id, "SES-0");
    }

    #[test]
    fn blank_identifiers_fall_back() {
        let input = SessionInput::new().patient_id("  ").drug_type("");
        let s = Session::create(&input, &SessionDefaults::default(), "N-1", t0());
        assert_eq!(s.patient_id, "PAT-12345");
        assert_eq!(s.drug_type, "Normal Saline 500mL");
    }
}
