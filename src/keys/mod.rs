//! Key material: ternary secret, RLWE public key and key-switching keys.

pub mod public_key;
pub mod secret_key;
pub mod switching_key;

pub use public_key::{PublicKey, PublicKeyParams};
pub use secret_key::{SecretKey, SecretKeyParams};
pub use switching_key::{GaloisKeys, KeySwitchKey, RelinearizationKey};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyError {
    #[error("Hamming weight {weight} exceeds ring dimension {degree}")]
    InvalidHammingWeight { weight: usize, degree: usize },

    #[error("Invalid error standard deviation: {0} (must be positive)")]
    InvalidErrorStd(f64),
}
