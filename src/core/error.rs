use thiserror::Error;

/// Top-level error type for every engine subsystem.
///
/// Network/model/verification errors are recoverable: callers catch them at
/// the pipeline boundary and substitute a safe default rather than letting
/// them propagate. `State` and `Config` are not — they abort the current
/// conversation's research or stop process startup respectively.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("verification error: {0}")]
    Verification(String),

    #[error("state error: {0}")]
    State(String),

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::State(_) | EngineError::Config(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
