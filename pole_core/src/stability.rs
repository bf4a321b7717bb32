//! Sliding-window stability classification of load-cell readings.

use std::collections::VecDeque;

use rand::Rng;

use crate::config::StabilityCfg;

/// Classifies the reading as stable when recent samples agree and no
/// disturbance is active.
#[derive(Debug, Clone)]
pub struct StabilityDetector {
    cfg: StabilityCfg,
    window: VecDeque<f64>,
    is_stable: bool,
}

impl StabilityDetector {
    pub fn new(cfg: StabilityCfg) -> Self {
        let cap = cfg.window.max(1);
        Self {
            cfg,
            window: VecDeque::with_capacity(cap),
            is_stable: false,
        }
    }

    pub fn is_stable(&self) -> bool {
        self.is_stable
    }

    pub fn samples(&self) -> usize {
        self.window.len()
    }

    /// Max minus min of the current window, `None` when empty.
    pub fn spread_g(&self) -> Option<f64> {
        let first = *self.window.front()?;
        let (lo, hi) = self
            .window
            .iter()
            .fold((first, first), |(lo, hi), &w| (lo.min(w), hi.max(w)));
        Some(hi - lo)
    }

    /// Feed one observed weight and reclassify.
    ///
    /// With fewer than `min_samples` in the window the previous
    /// classification is kept as is.
    pub fn observe(&mut self, observed_weight_g: f64, movement_noise_g: f64) -> bool {
        self.window.push_back(observed_weight_g);
        while self.window.len() > self.cfg.window.max(1) {
            self.window.pop_front();
        }
        if self.window.len() < self.cfg.min_samples {
            return self.is_stable;
        }
        let spread = self.spread_g().unwrap_or(0.0);
        self.is_stable = spread < self.cfg.max_spread_g && movement_noise_g < self.cfg.max_noise_g;
        self.is_stable
    }

    /// Forget all samples and mark the reading disturbed (movement just happened).
    pub fn disturb(&mut self) {
        self.window.clear();
        self.is_stable = false;
    }

    /// Presentation-only confidence score: `[90, 100)` when stable, `[0, 50)` otherwise.
    pub fn score<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.is_stable {
            rng.gen_range(90.0..100.0)
        } else {
            rng.gen_range(0.0..50.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn needs_min_samples_before_flipping() {
        let mut det = StabilityDetector::new(StabilityCfg::default());
        assert!(!det.observe(500.0, 0.0));
        assert!(!det.observe(500.0, 0.0));
        assert!(det.observe(500.0, 0.0));
    }

    #[test]
    fn keeps_previous_state_while_refilling_window() {
        let mut det = StabilityDetector::new(StabilityCfg::default());
        for _ in 0..3 {
            det.observe(500.0, 0.0);
        }
        assert!(det.is_stable());
        det.window.clear();
        // Two samples far apart: not enough to reclassify.
        assert!(det.observe(100.0, 0.0));
        assert!(det.observe(900.0, 0.0));
        assert!(!det.observe(500.0, 0.0));
    }

    #[test]
    fn window_is_bounded_and_evicts_oldest() {
        let mut det = StabilityDetector::new(StabilityCfg::default());
        det.observe(0.0, 0.0);
        for _ in 0..5 {
            det.observe(10.0, 0.0);
        }
        assert_eq!(det.samples(), 5);
        assert_eq!(det.spread_g(), Some(0.0));
        assert!(det.is_stable());
    }

    #[test]
    fn residual_noise_blocks_stability() {
        let mut det = StabilityDetector::new(StabilityCfg::default());
        for _ in 0..5 {
            det.observe(500.0, 2.5);
        }
        assert!(!det.is_stable());
    }

    #[test]
    fn score_ranges_follow_classification() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut det = StabilityDetector::new(StabilityCfg::default());
        for _ in 0..50 {
            let s = det.score(&mut rng);
            assert!((0.0..50.0).contains(&s));
        }
        for _ in 0..3 {
            det.observe(1.0, 0.0);
        }
        for _ in 0..50 {
            let s = det.score(&mut rng);
            assert!((90.0..100.0).contains(&s));
        }
    }
}
