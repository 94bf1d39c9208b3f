use crate::keys::KeyError;
use crate::rings::RingError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CkksError {
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error(
        "Insecure parameters: {total_bits} modulus bits exceed the 128-bit bound of {max_bits} for degree {degree}"
    )]
    InsecureParameters {
        degree: usize,
        total_bits: u32,
        max_bits: u32,
    },

    #[error("Not enough NTT-friendly {bits}-bit primes for degree {degree}")]
    PrimeSearch { bits: u32, degree: usize },

    #[error("Ring setup failed: {0}")]
    Ring(#[from] RingError),

    #[error("Key generation failed: {0}")]
    Key(#[from] KeyError),

    #[error("No modulus left to rescale; the chain supports {depth} multiplications")]
    LevelExhausted { depth: usize },

    #[error("Scale mismatch: expected {expected:.2}, got {actual:.2}")]
    ScaleMismatch { expected: f64, actual: f64 },

    #[error("Ciphertext belongs to context {actual}, expected {expected}")]
    ContextMismatch { expected: u64, actual: u64 },

    #[error("Value {value} cannot be represented at the current scale")]
    ValueOutOfRange { value: f64 },

    #[error("No Galois key for element {element}")]
    MissingGaloisKey { element: usize },

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

pub type CkksResult<T> = Result<T, CkksError>;
