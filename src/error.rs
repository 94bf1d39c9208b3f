use crate::crypto::CkksError;
use crate::expr::ParseError;
use thiserror::Error;

/// Failure of one calculator request.
#[derive(Error, Debug, Clone)]
pub enum CalcError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Unsupported operation '{operator}'")]
    UnsupportedOperation { operator: String },

    #[error("Division by zero (divisor decrypted to {divisor:e})")]
    DivisionByZero { divisor: f64 },

    #[error("Expression needs more multiplications than the {available} the context supports")]
    DepthExceeded { available: usize },

    #[error("Context creation failed: {0}")]
    ContextCreation(CkksError),

    #[error("Homomorphic operation failed: {0}")]
    Scheme(CkksError),
}

impl From<CkksError> for CalcError {
    fn from(err: CkksError) -> Self {
        match err {
            CkksError::LevelExhausted { depth } => CalcError::DepthExceeded { available: depth },
            other => CalcError::Scheme(other),
        }
    }
}

/// User-facing category of a [`CalcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Parse,
    UnsupportedOperation,
    DivisionByZero,
    DepthExceeded,
    ContextCreation,
    Scheme,
}

impl CalcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcError::Parse(_) => ErrorKind::Parse,
            CalcError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            CalcError::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            CalcError::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            CalcError::ContextCreation(_) => ErrorKind::ContextCreation,
            CalcError::Scheme(_) => ErrorKind::Scheme,
        }
    }
}

pub type CalcResult<T> = Result<T, CalcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_exhaustion_maps_to_depth_exceeded() {
        let err: CalcError = CkksError::LevelExhausted { depth: 2 }.into();
        assert!(matches!(err, CalcError::DepthExceeded { available: 2 }));
        assert_eq!(err.kind(), ErrorKind::DepthExceeded);
        let err: CalcError = CkksError::MissingGaloisKey { element: 3 }.into();
        assert!(matches!(err, CalcError::Scheme(_)));
        assert_eq!(err.kind(), ErrorKind::Scheme);
    }
}
