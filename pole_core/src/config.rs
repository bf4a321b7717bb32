//! Runtime configuration for the simulation core.
//!
//! These are the structs `Pole` consumes. They are separate from the
//! TOML-deserialized config in `pole_config`; see `conversions`.

/// Who this pole is. Injected at construction and never mutated by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub pole_id: String,
    pub bed: String,
    pub nurse_id: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            pole_id: "POLE-301A-1".to_string(),
            bed: "301A-1".to_string(),
            nurse_id: "NURSE-001".to_string(),
        }
    }
}

/// Fallback values for each nurse-entered session field.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub patient_id: String,
    pub drug_type: String,
    pub volume_ml: f64,
    pub duration_min: u32,
    /// Drops per mL; a property of the administration set, not operator input.
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

/// Weight/flow simulator parameters.
#[derive(Debug, Clone)]
pub struct SimulationCfg {
    /// Seed for the single RNG behind every random draw. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Telemetry ticks between status/battery reports.
    pub status_every_ticks: u32,
    /// Bag and tubing mass when fluid-empty (g).
    pub empty_container_g: f64,
    /// Jitter is drawn uniformly from `[-jitter_g, +jitter_g]`.
    pub jitter_g: f64,
    /// Decrement is suppressed while movement noise is at or above this (g).
    pub movement_suppress_g: f64,
    /// Injected movement noise is drawn from `[movement_min_g, movement_max_g)`.
    pub movement_min_g: f64,
    pub movement_max_g: f64,
    pub movement_decay: f64,
    pub movement_floor_g: f64,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            seed: None,
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

/// Stability detector parameters.
#[derive(Debug, Clone)]
pub struct StabilityCfg {
    /// Samples kept in the sliding window (oldest evicted first).
    pub window: usize,
    /// Below this many samples the previous classification is kept.
    pub min_samples: usize,
    pub max_spread_g: f64,
    pub max_noise_g: f64,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self {
            window: 5,
            min_samples: 3,
            max_spread_g: 2.0,
            max_noise_g: 2.0,
        }
    }
}

/// How threshold alerts decide to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertMode {
    /// Fire once per session when the value crosses from >= threshold to < threshold.
    #[default]
    Edge,
    /// Fire whenever the value lies in a narrow band under the threshold.
    /// Can re-fire on noisy re-entry and can miss a band skipped in one tick.
    Band,
}

#[derive(Debug, Clone)]
pub struct AlertCfg {
    pub mode: AlertMode,
    pub low_fluid_warning_pct: f64,
    pub low_fluid_critical_pct: f64,
    pub battery_low_pct: f64,
    pub flow_abnormal_probability: f64,
}

impl Default for AlertCfg {
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

#[derive(Debug, Clone)]
pub struct BatteryCfg {
    pub initial_pct: f64,
    pub drain_per_status_pct: f64,
    pub floor_pct: f64,
}

impl Default for BatteryCfg {
    fn default() -> Self {
        Self {
            initial_pct: 95.0,
            drain_per_status_pct: 0.1,
            floor_pct: 10.0,
        }
    }
}

/// Everything a `Pole` needs besides its publisher.
#[derive(Debug, Clone, Default)]
pub struct PoleCfg {
    pub identity: DeviceIdentity,
    pub defaults: SessionDefaults,
    pub simulation: SimulationCfg,
    pub stability: StabilityCfg,
    pub alerts: AlertCfg,
    pub battery: BatteryCfg,
}
