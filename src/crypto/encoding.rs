//! Scalar encoding into the constant coefficient.
//!
//! A constant polynomial evaluates to itself at every root of `X^N + 1`, so
//! `round(v * scale)` in coefficient 0 places `v` in every slot. Decoding
//! reconstructs coefficient 0 from its residues with Garner's mixed-radix
//! algorithm and centers it around zero.

use super::{CkksError, CkksResult};
use crate::math::{inv_mod_prime, mul_mod};
use crate::rings::{NttTable, RnsPoly};
use crypto_bigint::{U1024, Word};
use std::sync::Arc;
use tracing::debug;

/// Encodes `value` at `scale` as a constant polynomial in NTT form.
///
/// `lowest_prime` bounds the representable magnitude: the scaled value must
/// survive every rescale down to the last remaining prime.
pub fn encode_scalar(
    value: f64,
    scale: f64,
    moduli: &[Arc<NttTable>],
    lowest_prime: u64,
) -> CkksResult<RnsPoly> {
    let scaled = value * scale;
    if !scaled.is_finite() || scaled.abs() >= (lowest_prime / 2) as f64 {
        return Err(CkksError::ValueOutOfRange { value });
    }
    Ok(RnsPoly::constant(scaled.round() as i128, moduli))
}

/// Integer represented by `residues` modulo the product of `primes`, centered
/// into `(-Q/2, Q/2]` and converted to `f64`.
pub fn crt_centered(residues: &[u64], primes: &[u64]) -> f64 {
    assert_eq!(residues.len(), primes.len(), "one residue per prime");

    // mixed-radix digits: x = v0 + v1*q0 + v2*q0*q1 + ...
    let mut digits: Vec<u64> = Vec::with_capacity(primes.len());
    for (i, (&x, &q)) in residues.iter().zip(primes).enumerate() {
        let mut t = x % q;
        for (&v, &qj) in digits.iter().zip(&primes[..i]) {
            let diff = (t + q - v % q) % q;
            t = mul_mod(diff, inv_mod_prime(qj % q, q), q);
        }
        digits.push(t);
    }

    let value = horner(&digits, primes);
    let modulus = primes
        .iter()
        .fold(U1024::ONE, |acc, &q| acc.wrapping_mul(&U1024::from_u64(q)));

    let doubled = value.wrapping_add(&value);
    if doubled > modulus {
        -to_f64(&modulus.wrapping_sub(&value))
    } else {
        to_f64(&value)
    }
}

fn horner(digits: &[u64], primes: &[u64]) -> U1024 {
    let mut value = U1024::ZERO;
    for i in (0..digits.len()).rev() {
        value = value
            .wrapping_mul(&U1024::from_u64(primes[i]))
            .wrapping_add(&U1024::from_u64(digits[i]));
    }
    value
}

fn to_f64(value: &U1024) -> f64 {
    value
        .as_words()
        .iter()
        .enumerate()
        .map(|(i, &w)| (w as f64) * 2f64.powi((i as u32 * Word::BITS) as i32))
        .sum()
}

/// Reads the scalar back from a decrypted polynomial.
pub fn decode_scalar(plain: &RnsPoly, scale: f64) -> f64 {
    let mut plain = plain.clone();
    plain.to_coeff();
    let residues = plain.coefficient_residues(0);
    let coefficient = crt_centered(&residues, &plain.primes());
    debug!(coefficient, scale, "decoded constant coefficient");
    coefficient / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::chain_primes;
    use crate::rings::RnsBasis;
    use approx::assert_relative_eq;

    #[test]
    fn crt_reconstructs_small_signed_values() {
        let primes = [97u64, 193, 257];
        for x in [-1_000_000i64, -1, 0, 1, 42, 2_000_000] {
            let residues: Vec<u64> = primes
                .iter()
                .map(|&p| x.rem_euclid(p as i64) as u64)
                .collect();
            assert_eq!(crt_centered(&residues, &primes), x as f64);
        }
    }

    #[test]
    fn crt_handles_wide_moduli() {
        let primes = chain_primes(&[60, 60, 60, 60], 1_024).unwrap();
        // -(2^100 + 12345)
        let magnitude: u128 = (1u128 << 100) + 12_345;
        let residues: Vec<u64> = primes
            .iter()
            .map(|&p| {
                let r = (magnitude % p as u128) as u64;
                if r == 0 { 0 } else { p - r }
            })
            .collect();
        assert_relative_eq!(
            crt_centered(&residues, &primes),
            -(magnitude as f64),
            max_relative = 1e-15
        );
    }

    #[test]
    fn encoded_scalar_decodes_without_encryption() {
        let primes = chain_primes(&[60, 40, 60], 64).unwrap();
        let basis = RnsBasis::new(&primes, 64).unwrap();
        let scale = 2f64.powi(40);
        let moduli = basis.data_moduli(1);
        let plain = encode_scalar(-3.25, scale, moduli, primes[0]).unwrap();
        assert_relative_eq!(decode_scalar(&plain, scale), -3.25, max_relative = 1e-12);
    }

    #[test]
    fn rejects_values_beyond_lowest_prime() {
        let primes = chain_primes(&[60, 40, 60], 64).unwrap();
        let basis = RnsBasis::new(&primes, 64).unwrap();
        let scale = 2f64.powi(40);
        let moduli = basis.data_moduli(1);
        for value in [1e7, f64::INFINITY, f64::NAN] {
            assert!(matches!(
                encode_scalar(value, scale, moduli, primes[0]),
                Err(CkksError::ValueOutOfRange { .. })
            ));
        }
    }
}
