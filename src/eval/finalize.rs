use crate::crypto::{CkksError, EncryptedValue, EncryptionContext};
use crate::error::{CalcError, CalcResult, ErrorKind};
use std::fmt;

/// Outcome of one request as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Success { value: f64 },
    Failure { kind: ErrorKind, message: String },
}

impl EvaluationResult {
    pub fn from_error(err: &CalcError) -> Self {
        EvaluationResult::Failure {
            kind: err.kind(),
            message: user_message(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EvaluationResult::Success { .. })
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            EvaluationResult::Success { value } => Some(*value),
            EvaluationResult::Failure { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EvaluationResult::Success { .. } => None,
            EvaluationResult::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationResult::Success { value } => {
                // avoid printing "-0.0000" for tiny negative noise
                let shown = if value.abs() < 5e-5 { 0.0 } else { *value };
                write!(f, "{shown:.4}")
            }
            EvaluationResult::Failure { message, .. } => f.write_str(message),
        }
    }
}

/// Decrypts a successful evaluation, or turns the failure into its message.
pub fn finalize(
    context: &EncryptionContext,
    outcome: CalcResult<EncryptedValue>,
) -> EvaluationResult {
    let decrypted = outcome.and_then(|value| context.decrypt(&value).map_err(CalcError::from));
    match decrypted {
        Ok(value) => EvaluationResult::Success { value },
        Err(err) => EvaluationResult::from_error(&err),
    }
}

/// Message for `err` that names the problem without exposing key material or
/// context internals.
pub fn user_message(err: &CalcError) -> String {
    match err {
        CalcError::Parse(parse) => format!("Invalid expression: {parse}"),
        CalcError::UnsupportedOperation { operator } => {
            format!("Unsupported operation '{operator}'")
        }
        CalcError::DivisionByZero { .. } => "Division by zero".to_string(),
        CalcError::DepthExceeded { available } => format!(
            "Expression too deep: at most {available} chained multiplications or divisions are supported"
        ),
        CalcError::ContextCreation(_) => "Encryption context could not be created".to_string(),
        CalcError::Scheme(CkksError::ValueOutOfRange { value }) => {
            format!("Value {value} is outside the supported range")
        }
        CalcError::Scheme(_) => "Encrypted evaluation failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ParseError;

    #[test]
    fn success_renders_four_decimals() {
        assert_eq!(EvaluationResult::Success { value: 14.0 }.to_string(), "14.0000");
        assert_eq!(
            EvaluationResult::Success { value: 1.0 / 3.0 }.to_string(),
            "0.3333"
        );
        assert_eq!(EvaluationResult::Success { value: -1e-9 }.to_string(), "0.0000");
    }

    #[test]
    fn each_category_has_its_own_message() {
        let errors = [
            CalcError::Parse(ParseError::Empty),
            CalcError::UnsupportedOperation {
                operator: "^".into(),
            },
            CalcError::DivisionByZero { divisor: 0.0 },
            CalcError::DepthExceeded { available: 2 },
            CalcError::ContextCreation(CkksError::PrimeSearch {
                bits: 20,
                degree: 32_768,
            }),
            CalcError::Scheme(CkksError::MissingGaloisKey { element: 3 }),
        ];
        let messages: Vec<String> = errors.iter().map(user_message).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(!messages[4].contains("32768"));
        assert!(!messages[5].contains('3'));

        let result = EvaluationResult::from_error(&errors[2]);
        assert_eq!(result.kind(), Some(ErrorKind::DivisionByZero));
        assert_eq!(result.to_string(), "Division by zero");
        assert_eq!(result.value(), None);
    }
}
