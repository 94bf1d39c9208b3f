//! Leveled CKKS over an RNS modulus chain, specialised to single scalars.

pub mod builder;
pub mod ciphertext;
pub mod context;
pub mod encoding;
pub mod errors;
pub mod params;

pub use builder::ContextBuilder;
pub use ciphertext::EncryptedValue;
pub use context::EncryptionContext;
pub use errors::{CkksError, CkksResult};
pub use params::{ContextParams, SecurityLevel};
