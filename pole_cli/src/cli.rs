//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pole", version, about = "Simulated IV infusion pole")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report errors as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one infusion session headless, printing every published message as a JSON line
    Simulate {
        /// Simulated seconds (ticks) to run before stopping the session
        #[arg(long, value_name = "N")]
        seconds: u64,
        /// Wall-clock period of one tick in ms (overrides simulation.tick_ms)
        #[arg(long, value_name = "MS")]
        tick_ms: Option<u64>,
        /// RNG seed (overrides simulation.seed)
        #[arg(long)]
        seed: Option<u64>,
        /// Bag volume in mL, as the operator would type it
        #[arg(long, value_name = "ML")]
        volume: Option<String>,
        /// Prescribed duration in minutes, as the operator would type it
        #[arg(long, value_name = "MIN")]
        duration: Option<String>,
        /// Patient identifier
        #[arg(long, value_name = "ID")]
        patient: Option<String>,
        /// Drug / fluid description
        #[arg(long, value_name = "NAME")]
        drug: Option<String>,
        /// Bump the pole after this many seconds (repeatable)
        #[arg(long = "movement-at", value_name = "SEC")]
        movement_at: Vec<u64>,
        /// Press the nurse-call button after this many seconds (repeatable)
        #[arg(long = "emergency-at", value_name = "SEC")]
        emergency_at: Vec<u64>,
    },
    /// Load and validate the configuration
    SelfCheck,
}
