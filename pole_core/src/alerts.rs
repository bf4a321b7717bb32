//! Threshold alert policy.
//!
//! LOW_FLUID (two thresholds) and BATTERY_LOW are evaluated against a tracked
//! value; EMERGENCY_CALL fires on request; FLOW_ABNORMAL fires at random.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::Serialize;

use crate::config::{AlertCfg, AlertMode};

/// Width of the low-fluid firing band below each threshold in band mode (pct points).
const FLUID_BAND_PCT: f64 = 0.2;
/// Width of the battery firing band below its threshold in band mode (pct points).
const BATTERY_BAND_PCT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    /// Lowercase form used in alert topics.
    pub fn topic_segment(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    LowFluid,
    FlowAbnormal,
    BatteryLow,
    EmergencyCall,
}

/// An alert decided by the policy, before it is wrapped into a wire message.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub severity: Severity,
    pub kind: AlertKind,
    pub message: String,
}

/// Tracked thresholds; LOW_FLUID has two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Threshold {
    LowFluidWarning,
    LowFluidCritical,
    BatteryLow,
}

/// Alert decisions for one session. `reset` on session (re)start.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    cfg: AlertCfg,
    last: HashMap<Threshold, f64>,
    fired: HashSet<Threshold>,
}

impl AlertPolicy {
    pub fn new(cfg: AlertCfg) -> Self {
        Self {
            cfg,
            last: HashMap::new(),
            fired: HashSet::new(),
        }
    }

    /// Clear remembered values and fired flags.
    pub fn reset(&mut self) {
        self.last.clear();
        self.fired.clear();
    }

    /// Evaluate both LOW_FLUID thresholds against the remaining percentage.
    pub fn check_fluid(&mut self, remaining_pct: f64) -> Vec<Alert> {
        let mut out = Vec::new();
        let warn = self.cfg.low_fluid_warning_pct;
        let crit = self.cfg.low_fluid_critical_pct;
        if self.crossed(Threshold::LowFluidWarning, remaining_pct, warn, FLUID_BAND_PCT) {
            out.push(Alert {
                severity: Severity::Warning,
                kind: AlertKind::LowFluid,
                message: format!("remaining {remaining_pct:.1}%"),
            });
        }
        if self.crossed(Threshold::LowFluidCritical, remaining_pct, crit, FLUID_BAND_PCT) {
            out.push(Alert {
                severity: Severity::Critical,
                kind: AlertKind::LowFluid,
                message: format!("critical - remaining {remaining_pct:.1}%"),
            });
        }
        out
    }

    /// Evaluate BATTERY_LOW.
    pub fn check_battery(&mut self, battery_pct: f64) -> Option<Alert> {
        let thr = self.cfg.battery_low_pct;
        self.crossed(Threshold::BatteryLow, battery_pct, thr, BATTERY_BAND_PCT)
            .then(|| Alert {
                severity: Severity::Warning,
                kind: AlertKind::BatteryLow,
                message: format!("battery low: {}%", battery_pct.floor()),
            })
    }

    /// Sporadic FLOW_ABNORMAL, independent of thresholds.
    pub fn roll_flow_abnormal<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        flow_ml_per_min: f64,
    ) -> Option<Alert> {
        let p = self.cfg.flow_abnormal_probability;
        if p.is_nan() || p <= 0.0 || !rng.gen_bool(p.min(1.0)) {
            return None;
        }
        let abnormal = flow_ml_per_min * rng.gen_range(0.5..1.5);
        Some(Alert {
            severity: Severity::Warning,
            kind: AlertKind::FlowAbnormal,
            message: format!("flow abnormality: {abnormal:.1} mL/min"),
        })
    }

    /// Nurse-call alert. Always fires, always critical.
    pub fn emergency_call() -> Alert {
        Alert {
            severity: Severity::Critical,
            kind: AlertKind::EmergencyCall,
            message: "patient call button pressed".to_string(),
        }
    }

    fn crossed(&mut self, key: Threshold, value: f64, threshold: f64, band: f64) -> bool {
        let prev = self.last.insert(key, value);
        match self.cfg.mode {
            AlertMode::Band => {
                let upper_inclusive = key != Threshold::BatteryLow;
                let below_top = if upper_inclusive {
                    value <= threshold
                } else {
                    value < threshold
                };
                below_top && value > threshold - band
            }
            AlertMode::Edge => {
                let crossing = prev.is_some_and(|p| p >= threshold) && value < threshold;
                crossing && self.fired.insert(key)
            }
        }
    }
}
