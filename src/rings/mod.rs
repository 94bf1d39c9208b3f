//! RNS polynomial arithmetic for the CKKS layer.

pub mod basis;
pub mod ntt;
pub mod poly;

pub use basis::RnsBasis;
pub use ntt::NttTable;
pub use poly::RnsPoly;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("Ring degree {degree} must be a power of two")]
    InvalidDegree { degree: usize },

    #[error("Prime {prime} is not NTT-friendly for degree {degree}")]
    NotNttFriendly { prime: u64, degree: usize },

    #[error("RNS basis needs at least {needed} primes, got {got}")]
    TooFewPrimes { needed: usize, got: usize },
}

pub type RingResult<T> = Result<T, RingError>;
