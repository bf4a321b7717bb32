#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the simulated infusion pole.
//!
//! Every section is optional; a missing section or field takes the default
//! documented on its struct. `Config::validate` enforces the ranges the core
//! relies on.
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Device {
    /// Identity used in every topic (`hospital/pole/{pole_id}/...`).
    pub pole_id: String,
    pub bed: String,
    pub nurse_id: String,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            pole_id: "POLE-301A-1".to_string(),
            bed: "301A-1".to_string(),
            nurse_id: "NURSE-001".to_string(),
        }
    }
}

/// Per-field fallbacks applied when the nurse-entered value is absent or unparsable.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionDefaults {
    pub patient_id: String,
    pub drug_type: String,
    pub volume_ml: f64,
    pub duration_min: u32,
    /// Drops per mL of the administration set; fixed per device.
    pub gtt_factor: u32,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            patient_id: "PAT-12345".to_string(),
            drug_type: "Normal Saline 500mL".to_string(),
            volume_ml: 500.0,
            duration_min: 240,
            gtt_factor: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Simulation {
    /// Seed for every random draw in the simulator; entropy when absent.
    pub seed: Option<u64>,
    /// Wall-clock period of one simulated second.
    pub tick_ms: u64,
    /// Status/battery report cadence, in ticks.
    pub status_every_ticks: u32,
    pub empty_container_g: f64,
    /// Half-width of the symmetric jitter added to each decrement.
    pub jitter_g: f64,
    /// Weight decrement is suppressed while movement noise is at or above this.
    pub movement_suppress_g: f64,
    pub movement_min_g: f64,
    pub movement_max_g: f64,
    /// Per-tick multiplicative decay of movement noise.
    pub movement_decay: f64,
    /// Noise below this snaps to zero.
    pub movement_floor_g: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            tick_ms: 1000,
            status_every_ticks: 30,
            empty_container_g: 50.0,
            jitter_g: 0.05,
            movement_suppress_g: 5.0,
            movement_min_g: 10.0,
            movement_max_g: 20.0,
            movement_decay: 0.9,
            movement_floor_g: 0.1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Stability {
    pub window: usize,
    /// Fewer samples than this leaves the previous classification untouched.
    pub min_samples: usize,
    pub max_spread_g: f64,
    pub max_noise_g: f64,
}

impl Default for Stability {
    fn default() -> Self {
        Self {
            window: 5,
            min_samples: 3,
            max_spread_g: 2.0,
            max_noise_g: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertMode {
    /// Fire once when the value moves from at/above the threshold to below it.
    #[default]
    Edge,
    /// Fire whenever the value sits inside a narrow band just under the threshold.
    Band,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Alerts {
    pub mode: AlertMode,
    pub low_fluid_warning_pct: f64,
    pub low_fluid_critical_pct: f64,
    pub battery_low_pct: f64,
    /// Per-tick chance of a sporadic FLOW_ABNORMAL warning (0 disables).
    pub flow_abnormal_probability: f64,
}

impl Default for Alerts {
    fn default() -> Self {
        Self {
            mode: AlertMode::Edge,
            low_fluid_warning_pct: 10.0,
            low_fluid_critical_pct: 5.0,
            battery_low_pct: 20.0,
            flow_abnormal_probability: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Battery {
    pub initial_pct: f64,
    pub drain_per_status_pct: f64,
    pub floor_pct: f64,
}

impl Default for Battery {
    fn default() -> Self {
        Self {
            initial_pct: 95.0,
            drain_per_status_pct: 0.1,
            floor_pct: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub device: Device,
    pub session: SessionDefaults,
    pub simulation: Simulation,
    pub stability: Stability,
    pub alerts: Alerts,
    pub battery: Battery,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn in_unit(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

fn is_pct(p: f64) -> bool {
    (0.0..=100.0).contains(&p)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Device
        if self.device.pole_id.trim().is_empty() {
            eyre::bail!("device.pole_id must not be empty");
        }
        if self.device.pole_id.contains(['/', '+', '#']) {
            eyre::bail!("device.pole_id must not contain topic separators or wildcards");
        }

        // Session defaults
        if !(self.session.volume_ml.is_finite() && self.session.volume_ml > 0.0) {
            eyre::bail!("session.volume_ml must be > 0");
        }
        if self.session.duration_min == 0 {
            eyre::bail!("session.duration_min must be >= 1");
        }
        if self.session.gtt_factor == 0 {
            eyre::bail!("session.gtt_factor must be >= 1");
        }

        // Every float must be a real number before any range check.
        let sim = &self.simulation;
        let floats = [
            ("session.volume_ml", self.session.volume_ml),
            ("simulation.empty_container_g", sim.empty_container_g),
            ("simulation.jitter_g", sim.jitter_g),
            ("simulation.movement_suppress_g", sim.movement_suppress_g),
            ("simulation.movement_min_g", sim.movement_min_g),
            ("simulation.movement_max_g", sim.movement_max_g),
            ("simulation.movement_decay", sim.movement_decay),
            ("simulation.movement_floor_g", sim.movement_floor_g),
            ("stability.max_spread_g", self.stability.max_spread_g),
            ("stability.max_noise_g", self.stability.max_noise_g),
            ("alerts.low_fluid_warning_pct", self.alerts.low_fluid_warning_pct),
            ("alerts.low_fluid_critical_pct", self.alerts.low_fluid_critical_pct),
            ("alerts.battery_low_pct", self.alerts.battery_low_pct),
            ("alerts.flow_abnormal_probability", self.alerts.flow_abnormal_probability),
            ("battery.initial_pct", self.battery.initial_pct),
            ("battery.drain_per_status_pct", self.battery.drain_per_status_pct),
            ("battery.floor_pct", self.battery.floor_pct),
        ];
        if let Some((name, _)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            eyre::bail!("{name} must be a finite number");
        }

        // Simulation
        if sim.tick_ms == 0 {
            eyre::bail!("simulation.tick_ms must be >= 1");
        }
        if sim.status_every_ticks == 0 {
            eyre::bail!("simulation.status_every_ticks must be >= 1");
        }
        if sim.empty_container_g.is_sign_negative() {
            eyre::bail!("simulation.empty_container_g must be >= 0");
        }
        if !(sim.jitter_g.is_finite() && sim.jitter_g >= 0.0) {
            eyre::bail!("simulation.jitter_g must be >= 0");
        }
        if sim.movement_suppress_g.is_sign_negative() {
            eyre::bail!("simulation.movement_suppress_g must be >= 0");
        }
        if sim.movement_min_g < 0.0 || sim.movement_min_g >= sim.movement_max_g {
            eyre::bail!("simulation.movement_min_g must be in [0, movement_max_g)");
        }
        if !(sim.movement_decay > 0.0 && sim.movement_decay < 1.0) {
            eyre::bail!("simulation.movement_decay must be in (0.0, 1.0)");
        }
        if sim.movement_floor_g <= 0.0 {
            eyre::bail!("simulation.movement_floor_g must be > 0");
        }

        // Stability
        if self.stability.window == 0 {
            eyre::bail!("stability.window must be >= 1");
        }
        if self.stability.min_samples == 0 || self.stability.min_samples > self.stability.window {
            eyre::bail!("stability.min_samples must be in [1, window]");
        }
        if self.stability.max_spread_g <= 0.0 || self.stability.max_noise_g <= 0.0 {
            eyre::bail!("stability.max_spread_g and stability.max_noise_g must be > 0");
        }

        // Alerts
        let a = &self.alerts;
        if !is_pct(a.low_fluid_warning_pct) || !is_pct(a.low_fluid_critical_pct) {
            eyre::bail!("alerts.low_fluid_*_pct must be in [0, 100]");
        }
        if a.low_fluid_critical_pct >= a.low_fluid_warning_pct {
            eyre::bail!("alerts.low_fluid_critical_pct must be below low_fluid_warning_pct");
        }
        if !is_pct(a.battery_low_pct) {
            eyre::bail!("alerts.battery_low_pct must be in [0, 100]");
        }
        if !in_unit(a.flow_abnormal_probability) {
            eyre::bail!("alerts.flow_abnormal_probability must be in [0.0, 1.0]");
        }

        // Battery
        let b = &self.battery;
        if !is_pct(b.initial_pct) || !is_pct(b.floor_pct) {
            eyre::bail!("battery.initial_pct and battery.floor_pct must be in [0, 100]");
        }
        if b.floor_pct > b.initial_pct {
            eyre::bail!("battery.floor_pct must not exceed battery.initial_pct");
        }
        if b.drain_per_status_pct.is_sign_negative() {
            eyre::bail!("battery.drain_per_status_pct must be >= 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
