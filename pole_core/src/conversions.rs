//! `From` implementations bridging `pole_config` types to `pole_core` types.

use crate::config::{
    AlertCfg, AlertMode, BatteryCfg, DeviceIdentity, PoleCfg, SessionDefaults, SimulationCfg,
    StabilityCfg,
};

// ── Device ───────────────────────────────────────────────────────────────────

impl From<&pole_config::Device> for DeviceIdentity {
    fn from(c: &pole_config::Device) -> Self {
        Self {
            pole_id: c.pole_id.clone(),
            bed: c.bed.clone(),
            nurse_id: c.nurse_id.clone(),
        }
    }
}

// ── Session defaults ─────────────────────────────────────────────────────────

impl From<&pole_config::SessionDefaults> for SessionDefaults {
    fn from(c: &pole_config::SessionDefaults) -> Self {
        Self {
            patient_id: c.patient_id.clone(),
            drug_type: c.drug_type.clone(),
            volume_ml: c.volume_ml,
            duration_min: c.duration_min,
            gtt_factor: c.gtt_factor,
        }
    }
}

// ── Simulation ───────────────────────────────────────────────────────────────

impl From<&pole_config::Simulation> for SimulationCfg {
    fn from(c: &pole_config::Simulation) -> Self {
        Self {
            seed: c.seed,
            status_every_ticks: c.status_every_ticks,
            empty_container_g: c.empty_container_g,
            jitter_g: c.jitter_g,
            movement_suppress_g: c.movement_suppress_g,
            movement_min_g: c.movement_min_g,
            movement_max_g: c.movement_max_g,
            movement_decay: c.movement_decay,
            movement_floor_g: c.movement_floor_g,
        }
    }
}

// ── Stability ────────────────────────────────────────────────────────────────

impl From<&pole_config::Stability> for StabilityCfg {
    fn from(c: &pole_config::Stability) -> Self {
        Self {
            window: c.window,
            min_samples: c.min_samples,
            max_spread_g: c.max_spread_g,
            max_noise_g: c.max_noise_g,
        }
    }
}

// ── Alerts ───────────────────────────────────────────────────────────────────

impl From<pole_config::AlertMode> for AlertMode {
    fn from(m: pole_config::AlertMode) -> Self {
        match m {
            pole_config::AlertMode::Edge => Self::Edge,
            pole_config::AlertMode::Band => Self::Band,
        }
    }
}

impl From<&pole_config::Alerts> for AlertCfg {
    fn from(c: &pole_config::Alerts) -> Self {
        Self {
            mode: c.mode.into(),
            low_fluid_warning_pct: c.low_fluid_warning_pct,
            low_fluid_critical_pct: c.low_fluid_critical_pct,
            battery_low_pct: c.battery_low_pct,
            flow_abnormal_probability: c.flow_abnormal_probability,
        }
    }
}

// ── Battery ──────────────────────────────────────────────────────────────────

impl From<&pole_config::Battery> for BatteryCfg {
    fn from(c: &pole_config::Battery) -> Self {
        Self {
            initial_pct: c.initial_pct,
            drain_per_status_pct: c.drain_per_status_pct,
            floor_pct: c.floor_pct,
        }
    }
}

// ── Whole document ───────────────────────────────────────────────────────────

impl From<&pole_config::Config> for PoleCfg {
    fn from(c: &pole_config::Config) -> Self {
        Self {
            identity: (&c.device).into(),
            defaults: (&c.session).into(),
            simulation: (&c.simulation).into(),
            stability: (&c.stability).into(),
            alerts: (&c.alerts).into(),
            battery: (&c.battery).into(),
        }
    }
}
