#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Simulated IV infusion-pole sensor node (transport-agnostic).
//!
//! All outbound traffic goes through `pole_traits::Publisher`; all pacing
//! through `pole_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Session**: infusion parameters and derived drip rate (`session`)
//! - **Simulator**: bag weight, flow decrement, movement disturbance (`simulator`)
//! - **Stability**: windowed spread classification (`stability`)
//! - **Telemetry**: per-tick snapshot composition (`telemetry`)
//! - **Alerts**: LOW_FLUID / BATTERY_LOW / FLOW_ABNORMAL / EMERGENCY_CALL (`alerts`)
//! - **State machine**: `Pole`, one atomic tick per simulated second (`pole`)
//! - **Scheduler**: worker thread with between-tick commands (`runner`)
//!
//! ## Units
//!
//! Weight in grams, volume in mL, 1 mL = 1 g. Flow in mL/min on the wire,
//! g/s inside the simulator.

pub mod alerts;
pub mod config;
pub mod conversions;
pub mod error;
pub mod message;
pub mod mocks;
pub mod pole;
pub mod runner;
pub mod session;
pub mod simulator;
pub mod stability;
pub mod status;
pub mod telemetry;
pub mod util;

pub use alerts::{Alert, AlertKind, AlertPolicy, Severity};
pub use config::{
    AlertCfg, AlertMode, BatteryCfg, DeviceIdentity, PoleCfg, SessionDefaults, SimulationCfg,
    StabilityCfg,
};
pub use error::{PoleError, Result};
pub use message::Message;
pub use pole::Pole;
pub use runner::{PoleRunner, Script, ScriptedAction};
pub use session::{Session, SessionInput};
pub use simulator::WeightSimulator;
pub use stability::StabilityDetector;
pub use status::{
    CommandOutcome, PoleState, SessionStatus, StatusView, TickOutcome, TickReport,
};
pub use telemetry::{StabilityReading, TelemetrySnapshot};
