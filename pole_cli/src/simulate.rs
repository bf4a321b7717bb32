//! Headless session run: config mapping, runner wiring, and the wait loop.

use crate::publisher::JsonLinesPublisher;
use chrono::Utc;
use pole_core::error::{PoleError, Result as CoreResult};
use pole_core::{Pole, PoleCfg, PoleRunner, Script, ScriptedAction, SessionInput};
use pole_traits::MonotonicClock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Upper bound on how long the wait loop sleeps between progress checks.
const POLL_MS: u64 = 10;

#[derive(Debug, Clone, Default)]
pub struct SimulateArgs {
    pub seconds: u64,
    pub tick_ms: Option<u64>,
    pub seed: Option<u64>,
    pub volume: Option<String>,
    pub duration: Option<String>,
    pub patient: Option<String>,
    pub drug: Option<String>,
    pub movement_at: Vec<u64>,
    pub emergency_at: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub published: u64,
    pub failed: u64,
    pub battery_pct: f64,
    pub interrupted: bool,
}

impl RunSummary {
    /// Summary block printed to stderr once the run ends.
    pub fn render(&self, json: bool) -> String {
        if json {
            return serde_json::json!({
                "ticks": self.ticks,
                "published": self.published,
                "failed": self.failed,
                "battery_pct": self.battery_pct,
                "interrupted": self.interrupted,
            })
            .to_string();
        }
        format!(
            "\n--- Simulation Summary ---\nTicks: {}\nPublished: {} ({} failed)\nBattery: {:.1}%\nInterrupted: {}\n--------------------------\n",
            self.ticks, self.published, self.failed, self.battery_pct, self.interrupted
        )
    }
}

fn script_for(args: &SimulateArgs) -> Script {
    let mut script = Script::default().stop_after(args.seconds);
    for &sec in &args.movement_at {
        script = script.at(sec, ScriptedAction::Movement);
    }
    for &sec in &args.emergency_at {
        script = script.at(sec, ScriptedAction::EmergencyCall);
    }
    script
}

pub fn run_simulation(
    cfg: &pole_config::Config,
    args: &SimulateArgs,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    // Config mapping via pole_core::conversions
    let mut pole_cfg = PoleCfg::from(cfg);
    if args.seed.is_some() {
        pole_cfg.simulation.seed = args.seed;
    }
    let tick_ms = args.tick_ms.unwrap_or(cfg.simulation.tick_ms).max(1);
    let period = Duration::from_millis(tick_ms);

    let input = SessionInput {
        patient_id: args.patient.clone(),
        drug_type: args.drug.clone(),
        volume_ml: args.volume.clone(),
        duration_min: args.duration.clone(),
    };

    let started_at = Utc::now();
    let pole = Pole::new(pole_cfg, JsonLinesPublisher::stdout(), started_at);
    let runner =
        PoleRunner::spawn_scripted(pole, period, MonotonicClock::new(), script_for(args));

    let _ = runner.connect()?;
    if args.seconds == 0 {
        tracing::info!("zero-length run requested; not starting a session");
    } else {
        let outcome = runner.start_session(input, started_at)?;
        if !outcome.is_done() {
            let msg = format!("session did not start: {}", outcome.describe());
            return Err(PoleError::State(msg).into());
        }
        tracing::info!(seconds = args.seconds, tick_ms, "simulation started");
    }

    let mut interrupted = false;
    let poll = Duration::from_millis(tick_ms.min(POLL_MS));
    while runner.ticks() < args.seconds {
        if shutdown.load(Ordering::Relaxed) {
            tracing::warn!(ticks = runner.ticks(), "interrupted; stopping session");
            let _ = runner.stop_session()?;
            interrupted = true;
            break;
        }
        std::thread::sleep(poll);
    }

    let ticks = runner.ticks();
    let pole = runner
        .shutdown()
        .ok_or_else(|| PoleError::State("runner thread panicked".into()))?;
    let (published, failed) = pole.publish_counts();
    let summary = RunSummary {
        ticks,
        published,
        failed,
        battery_pct: pole.battery_pct(),
        interrupted,
    };
    tracing::info!(
        ticks,
        published,
        failed,
        battery_pct = summary.battery_pct,
        interrupted,
        "simulation finished"
    );
    Ok(summary)
}
