//! Simulated load cell: bag weight over time plus movement disturbance.

use rand::Rng;

use crate::config::SimulationCfg;

/// Weight state for one session. Values are in grams.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSimulator {
    pub(crate) current_weight_g: f64,
    pub(crate) previous_weight_g: f64,
    pub(crate) movement_noise_g: f64,
}

impl WeightSimulator {
    /// Fresh state for a new session: both readings at the initial weight, no disturbance.
    pub fn new(initial_weight_g: f64) -> Self {
        Self {
            current_weight_g: initial_weight_g,
            previous_weight_g: initial_weight_g,
            movement_noise_g: 0.0,
        }
    }

    pub fn current_weight_g(&self) -> f64 {
        self.current_weight_g
    }

    pub fn previous_weight_g(&self) -> f64 {
        self.previous_weight_g
    }

    pub fn movement_noise_g(&self) -> f64 {
        self.movement_noise_g
    }

    /// What the load cell reports: fluid mass plus any active disturbance.
    pub fn observed_weight_g(&self) -> f64 {
        self.current_weight_g + self.movement_noise_g
    }

    /// Whether the next `advance` would decrement the weight.
    pub fn is_draining(&self, cfg: &SimulationCfg) -> bool {
        self.current_weight_g > cfg.empty_container_g
            && self.movement_noise_g < cfg.movement_suppress_g
    }

    /// Drain one second of flow, with jitter. Skipped when the bag is empty
    /// or a large disturbance makes the reading untrustworthy.
    ///
    /// Returns `true` when the weight was decremented.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        flow_g_per_sec: f64,
        cfg: &SimulationCfg,
        rng: &mut R,
    ) -> bool {
        if !self.is_draining(cfg) {
            return false;
        }
        self.current_weight_g -= flow_g_per_sec;
        if cfg.jitter_g > 0.0 {
            self.current_weight_g += rng.gen_range(-cfg.jitter_g..=cfg.jitter_g);
        }
        true
    }

    /// Start a disturbance with magnitude in `[movement_min_g, movement_max_g)`.
    pub fn inject_movement<R: Rng + ?Sized>(&mut self, cfg: &SimulationCfg, rng: &mut R) -> f64 {
        let noise = if cfg.movement_max_g > cfg.movement_min_g {
            rng.gen_range(cfg.movement_min_g..cfg.movement_max_g)
        } else {
            cfg.movement_min_g
        };
        self.movement_noise_g = noise;
        noise
    }

    /// Geometric decay of the disturbance, snapping to exactly zero under the floor.
    pub fn decay_movement(&mut self, cfg: &SimulationCfg) {
        if self.movement_noise_g <= 0.0 {
            return;
        }
        self.movement_noise_g *= cfg.movement_decay;
        if self.movement_noise_g < cfg.movement_floor_g {
            self.movement_noise_g = 0.0;
        }
    }

    /// Advance the "previous" reading. Called once per tick by the composer.
    pub(crate) fn commit(&mut self) {
        self.previous_weight_g = self.current_weight_g;
    }
}
