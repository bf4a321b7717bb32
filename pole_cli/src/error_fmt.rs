//! Human-readable error descriptions and structured JSON error formatting.

use pole_core::error::PoleError;

/// Exit code for configuration problems.
pub const EXIT_CONFIG: i32 = 1;
/// Exit code for anything that goes wrong once the simulation is running.
pub const EXIT_RUNTIME: i32 = 2;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(pe) = err.downcast_ref::<PoleError>() {
        return match pe {
            PoleError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Edit the config file, then rerun `pole self-check`."
            ),
            PoleError::State(msg) => format!(
                "What happened: The simulation could not continue ({msg}).\nLikely causes: The scheduler thread stopped unexpectedly.\nHow to fix: Re-run with --log-level=debug and check the logs."
            ),
            PoleError::Publish(msg) => format!(
                "What happened: A message could not be published ({msg}).\nLikely causes: The output stream was closed.\nHow to fix: Make sure stdout is readable (e.g. not a closed pipe)."
            ),
            PoleError::Encode(msg) => format!(
                "What happened: A message payload could not be encoded ({msg}).\nLikely causes: Non-finite numbers in the simulated state.\nHow to fix: Check the [simulation] and [session] values in the config."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Config errors exit with 1, everything else with 2.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<PoleError>() {
        Some(PoleError::Config(_)) => EXIT_CONFIG,
        _ => EXIT_RUNTIME,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<PoleError>() {
        Some(PoleError::Config(_)) => "Config",
        Some(PoleError::State(_)) => "State",
        Some(PoleError::Publish(_)) => "Publish",
        Some(PoleError::Encode(_)) => "Encode",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
