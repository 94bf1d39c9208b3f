use super::{CkksError, CkksResult};
use serde::{Deserialize, Serialize};

pub const MIN_DEGREE: usize = 8;
pub const MAX_DEGREE: usize = 32_768;
pub const MIN_PRIME_BITS: u32 = 20;
pub const MAX_PRIME_BITS: u32 = 60;
/// Largest modulus the constant-coefficient decoder reconstructs exactly.
pub const MAX_TOTAL_BITS: u32 = 1_000;

/// Maximum total coefficient-modulus bits for 128-bit classical security
/// with a ternary secret, by ring degree.
const SECURITY_BOUND_128: [(usize, u32); 6] = [
    (1_024, 27),
    (2_048, 54),
    (4_096, 109),
    (8_192, 218),
    (16_384, 438),
    (32_768, 881),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Enforce the 128-bit modulus bound.
    Tc128,
    /// No bound; toy parameters for tests.
    None,
}

pub fn max_modulus_bits(degree: usize) -> u32 {
    SECURITY_BOUND_128
        .iter()
        .find(|(d, _)| *d == degree)
        .map_or(0, |(_, bits)| *bits)
}

/// Parameters of an encryption context.
///
/// The coefficient modulus is given as prime bit sizes: data primes first,
/// then the special key-switching prime. `[60, 40, 40, 60]` therefore has
/// three data primes and a multiplicative depth of two. Every data prime
/// after the first must be exactly `scale_bits` wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextParams {
    pub poly_modulus_degree: usize,
    pub coeff_mod_bit_sizes: Vec<u32>,
    pub scale_bits: u32,
    pub security: SecurityLevel,
    /// Non-zero secret coefficients; `degree / 2` when unset.
    pub hamming_weight: Option<usize>,
    pub error_std: f64,
    pub galois_keys: bool,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self {
            poly_modulus_degree: 8_192,
            coeff_mod_bit_sizes: vec![60, 40, 40, 60],
            scale_bits: 40,
            security: SecurityLevel::Tc128,
            hamming_weight: None,
            error_std: 3.2,
            galois_keys: true,
        }
    }
}

impl ContextParams {
    pub fn hamming_weight(&self) -> usize {
        self.hamming_weight.unwrap_or(self.poly_modulus_degree / 2)
    }

    pub fn total_bits(&self) -> u32 {
        self.coeff_mod_bit_sizes.iter().sum()
    }

    /// Multiplications the chain supports: one per data prime beyond the first.
    pub fn multiplicative_depth(&self) -> usize {
        self.coeff_mod_bit_sizes.len().saturating_sub(2)
    }

    pub fn validate(&self) -> CkksResult<()> {
        let degree = self.poly_modulus_degree;
        if !degree.is_power_of_two() || !(MIN_DEGREE..=MAX_DEGREE).contains(&degree) {
            return Err(invalid(format!(
                "polynomial modulus degree {degree} must be a power of two in [{MIN_DEGREE}, {MAX_DEGREE}]"
            )));
        }

        let bits = &self.coeff_mod_bit_sizes;
        if bits.len() < 2 {
            return Err(invalid(format!(
                "coefficient modulus needs at least two primes, got {}",
                bits.len()
            )));
        }
        if let Some(&b) = bits
            .iter()
            .find(|&&b| !(MIN_PRIME_BITS..=MAX_PRIME_BITS).contains(&b))
        {
            return Err(invalid(format!(
                "prime bit size {b} outside [{MIN_PRIME_BITS}, {MAX_PRIME_BITS}]"
            )));
        }

        let (special, data) = (bits[bits.len() - 1], &bits[..bits.len() - 1]);
        if self.scale_bits == 0 || self.scale_bits >= data[0] {
            return Err(invalid(format!(
                "scale of {} bits must be positive and below the first prime ({} bits)",
                self.scale_bits, data[0]
            )));
        }
        // a product at scale s^2 returns to s only if the dropped prime is ~s
        if let Some(&b) = data[1..].iter().find(|&&b| b != self.scale_bits) {
            return Err(invalid(format!(
                "rescaling prime of {b} bits does not match the {}-bit scale",
                self.scale_bits
            )));
        }
        let widest_data = data.iter().copied().max().unwrap_or(0);
        if special < widest_data {
            return Err(invalid(format!(
                "special prime ({special} bits) must be at least as wide as every data prime ({widest_data} bits)"
            )));
        }

        let total_bits = self.total_bits();
        if total_bits > MAX_TOTAL_BITS {
            return Err(invalid(format!(
                "total modulus of {total_bits} bits exceeds the supported {MAX_TOTAL_BITS}"
            )));
        }
        if self.security == SecurityLevel::Tc128 {
            let max_bits = max_modulus_bits(degree);
            if total_bits > max_bits {
                return Err(CkksError::InsecureParameters {
                    degree,
                    total_bits,
                    max_bits,
                });
            }
        }

        let weight = self.hamming_weight();
        if weight == 0 || weight > degree {
            return Err(invalid(format!(
                "hamming weight {weight} must be in [1, {degree}]"
            )));
        }
        if !(self.error_std.is_finite() && self.error_std > 0.0) {
            return Err(invalid(format!(
                "error standard deviation {} must be positive",
                self.error_std
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> CkksError {
    CkksError::InvalidParameter { message }
}
