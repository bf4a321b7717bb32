use thiserror::Error;

/// Failures surfaced by the simulation core and its scheduler.
///
/// Misuse of the state machine (e.g. stopping without a session) is not an
/// error; see `CommandOutcome`.
#[derive(Debug, Error, Clone)]
pub enum PoleError {
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("payload encoding failed: {0}")]
    Encode(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
