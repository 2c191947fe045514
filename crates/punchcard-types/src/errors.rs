use thiserror::Error;

pub type Result<T, E = PunchcardError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum PunchcardError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("device unavailable: {0}")]
    Device(String),
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
