mod cli;
mod error_fmt;
mod publisher;
mod simulate;

use clap::Parser;
use cli::{Cli, Commands};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::Result;
use pole_core::error::PoleError;
use simulate::{SimulateArgs, run_simulation};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref());
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let guard = init_tracing(cli.json, &cli.log_level, &logging);

    let result = loaded.and_then(|cfg| run(&cli, &cfg));
    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            if cli.json {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("error: {e}\n{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };

    // Flush the file appender before exiting.
    drop(guard);
    std::process::exit(code);
}

fn run(cli: &Cli, cfg: &pole_config::Config) -> Result<()> {
    match &cli.cmd {
        Commands::SelfCheck => {
            tracing::info!(pole_id = %cfg.device.pole_id, "configuration ok");
            println!("ok");
            Ok(())
        }
        Commands::Simulate {
            seconds,
            tick_ms,
            seed,
            volume,
            duration,
            patient,
            drug,
            movement_at,
            emergency_at,
        } => {
            let args = SimulateArgs {
                seconds: *seconds,
                tick_ms: *tick_ms,
                seed: *seed,
                volume: volume.clone(),
                duration: duration.clone(),
                patient: patient.clone(),
                drug: drug.clone(),
                movement_at: movement_at.clone(),
                emergency_at: emergency_at.clone(),
            };

            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            }

            let summary = run_simulation(cfg, &args, shutdown)?;
            eprintln!("{}", summary.render(cli.json));
            Ok(())
        }
    }
}

/// Read, parse and validate the TOML config. Every failure is a `PoleError::Config`.
fn load_config(path: Option<&Path>) -> Result<pole_config::Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| PoleError::Config(format!("cannot read {}: {e}", p.display())))?;
            pole_config::load_toml(&text)
                .map_err(|e| PoleError::Config(format!("cannot parse {}: {e}", p.display())))?
        }
        None => pole_config::Config::default(),
    };
    cfg.validate()
        .map_err(|e| PoleError::Config(e.to_string()))?;
    Ok(cfg)
}

/// Console logs go to stderr; stdout is reserved for published messages.
fn init_tracing(
    json: bool,
    level: &str,
    logging: &pole_config::Logging,
) -> Option<WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console: BoxedLayer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };
    let mut layers = vec![console];

    let mut guard = None;
    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path.file_name().unwrap_or(OsStr::new("pole.log"));
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, g) = tracing_appender::non_blocking(appender);
        guard = Some(g);
        let file_level = logging.level.as_deref().unwrap_or("info");
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(file_level))
                .boxed(),
        );
    }

    let _ = tracing_subscriber::registry().with(layers).try_init();
    guard
}
