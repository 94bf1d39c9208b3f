use super::{CkksError, CkksResult};
use crate::rings::RnsPoly;
use serde::{Deserialize, Serialize};

/// Ciphertext of a single scalar: `c0 + c1 * s ~ round(value * scale)`.
///
/// Both components are in NTT form over `q_0..q_level`. The value remembers
/// the context that produced it and cannot be combined with values from any
/// other context.
#[derive(Clone, Debug)]
pub struct EncryptedValue {
    pub(crate) c0: RnsPoly,
    pub(crate) c1: RnsPoly,
    pub(crate) scale: f64,
    pub(crate) context_id: u64,
}

/// Byte layout of a serialized ciphertext.
#[derive(Serialize, Deserialize)]
pub(crate) struct WireValue {
    pub context_id: u64,
    pub scale: f64,
    pub primes: Vec<u64>,
    pub c0: Vec<Vec<u64>>,
    pub c1: Vec<Vec<u64>>,
}

impl EncryptedValue {
    /// Remaining rescales before the chain runs out.
    pub fn level(&self) -> usize {
        self.c0.channel_count() - 1
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    pub fn to_bytes(&self) -> CkksResult<Vec<u8>> {
        let wire = WireValue {
            context_id: self.context_id,
            scale: self.scale,
            primes: self.c0.primes(),
            c0: self.c0.residues().to_vec(),
            c1: self.c1.residues().to_vec(),
        };
        bincode::serde::encode_to_vec(&wire, bincode::config::standard())
            .map_err(|e| CkksError::Serialization(e.to_string()))
    }

    /// Size of the serialized form in bytes.
    pub fn serialized_len(&self) -> CkksResult<usize> {
        self.to_bytes().map(|bytes| bytes.len())
    }
}

impl WireValue {
    pub(crate) fn from_bytes(bytes: &[u8]) -> CkksResult<Self> {
        let (wire, read) =
            bincode::serde::decode_from_slice::<Self, _>(bytes, bincode::config::standard())
                .map_err(|e| CkksError::Serialization(e.to_string()))?;
        if read != bytes.len() {
            return Err(CkksError::Serialization(format!(
                "{} trailing bytes after ciphertext",
                bytes.len() - read
            )));
        }
        Ok(wire)
    }
}
