/// Domain-specific error types for the simulator.
/// Every failure is fatal to the run that raised it; nothing is retried.
/// - Validation: malformed or out-of-domain inputs, raised at construction/call time
/// - Configuration: inconsistent hedge or simulation setup
/// - NumericDegeneracy: a state the closed-form math cannot evaluate
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<chrono::ParseError> for EngineError {
    fn from(e: chrono::ParseError) -> Self {
        EngineError::Validation(format!("unparsable date: {e}"))
    }
}

impl From<rand_distr::NormalError> for EngineError {
    fn from(e: rand_distr::NormalError) -> Self {
        EngineError::Validation(format!("normal distribution: {e}"))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Shorthand for the common "reject this input" path.
#[inline]
pub(crate) fn invalid<T>(msg: impl Into<String>) -> EngineResult<T> {
    Err(EngineError::Validation(msg.into()))
}
