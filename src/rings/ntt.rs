//! Negacyclic number-theoretic transform over `Z_p[X]/(X^N + 1)`.
//!
//! Twiddles are stored in bit-reversed order so the forward transform is an
//! in-place Cooley-Tukey pass and the inverse a Gentleman-Sande pass, with no
//! separate bit-reversal permutation.

use super::{RingError, RingResult};
use crate::math::{inv_mod_prime, is_ntt_friendly_prime, mul_mod, pow_mod};

#[derive(Debug)]
pub struct NttTable {
    prime: u64,
    degree: usize,
    /// psi^bitrev(i) for a primitive 2N-th root psi
    psi_rev: Vec<u64>,
    /// psi^-bitrev(i)
    psi_inv_rev: Vec<u64>,
    degree_inv: u64,
}

impl NttTable {
    pub fn new(prime: u64, degree: usize) -> RingResult<Self> {
        if degree < 2 || !degree.is_power_of_two() {
            return Err(RingError::InvalidDegree { degree });
        }
        if !is_ntt_friendly_prime(prime, degree as u64) {
            return Err(RingError::NotNttFriendly { prime, degree });
        }

        let psi = primitive_root_2n(prime, degree)
            .ok_or(RingError::NotNttFriendly { prime, degree })?;
        let psi_inv = inv_mod_prime(psi, prime);
        let log_n = degree.trailing_zeros();

        let mut psi_rev = vec![0u64; degree];
        let mut psi_inv_rev = vec![0u64; degree];
        let mut power = 1u64;
        let mut power_inv = 1u64;
        for i in 0..degree {
            let idx = bit_reverse(i, log_n);
            psi_rev[idx] = power;
            psi_inv_rev[idx] = power_inv;
            power = mul_mod(power, psi, prime);
            power_inv = mul_mod(power_inv, psi_inv, prime);
        }

        Ok(Self {
            prime,
            degree,
            psi_rev,
            psi_inv_rev,
            degree_inv: inv_mod_prime(degree as u64, prime),
        })
    }

    #[inline]
    pub fn prime(&self) -> u64 {
        self.prime
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn forward(&self, coeffs: &mut [u64]) {
        debug_assert_eq!(coeffs.len(), self.degree);
        let p = self.prime;
        let n = self.degree;
        let mut t = n >> 1;
        let mut m = 1;
        while m < n {
            for i in 0..m {
                let j1 = 2 * i * t;
                let twiddle = self.psi_rev[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = mul_mod(coeffs[j + t], twiddle, p);
                    coeffs[j] = add_mod(u, v, p);
                    coeffs[j + t] = sub_mod(u, v, p);
                }
            }
            m <<= 1;
            t >>= 1;
        }
    }

    pub fn inverse(&self, coeffs: &mut [u64]) {
        debug_assert_eq!(coeffs.len(), self.degree);
        let p = self.prime;
        let mut t = 1;
        let mut h = self.degree >> 1;
        while h > 0 {
            let mut j1 = 0;
            for i in 0..h {
                let twiddle = self.psi_inv_rev[h + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = coeffs[j + t];
                    coeffs[j] = add_mod(u, v, p);
                    coeffs[j + t] = mul_mod(sub_mod(u, v, p), twiddle, p);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            h >>= 1;
        }
        for value in coeffs.iter_mut() {
            *value = mul_mod(*value, self.degree_inv, p);
        }
    }
}

#[inline]
pub(crate) fn add_mod(a: u64, b: u64, p: u64) -> u64 {
    let sum = a + b;
    if sum >= p { sum - p } else { sum }
}

#[inline]
pub(crate) fn sub_mod(a: u64, b: u64, p: u64) -> u64 {
    if a >= b { a - b } else { p - (b - a) }
}

fn bit_reverse(value: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    value.reverse_bits() >> (usize::BITS - bits)
}

/// Finds psi with psi^N = -1, i.e. a primitive 2N-th root of unity.
fn primitive_root_2n(prime: u64, degree: usize) -> Option<u64> {
    let order = 2 * degree as u64;
    let exponent = (prime - 1) / order;
    (2..prime.min(1 << 20))
        .map(|g| pow_mod(g, exponent, prime))
        .find(|&psi| pow_mod(psi, degree as u64, prime) == prime - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::chain_primes;

    fn schoolbook_negacyclic(a: &[u64], b: &[u64], p: u64) -> Vec<u64> {
        let n = a.len();
        let mut out = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let prod = mul_mod(a[i], b[j], p);
                let k = i + j;
                if k < n {
                    out[k] = add_mod(out[k], prod, p);
                } else {
                    out[k - n] = sub_mod(out[k - n], prod, p);
                }
            }
        }
        out
    }

    #[test]
    fn rejects_unfriendly_prime() {
        assert!(matches!(
            NttTable::new(65_537, 1 << 16),
            Err(RingError::NotNttFriendly { .. })
        ));
        assert!(matches!(
            NttTable::new(12_289, 12),
            Err(RingError::InvalidDegree { degree: 12 })
        ));
    }

    #[test]
    fn roundtrip_restores_coefficients() {
        let table = NttTable::new(12_289, 16).unwrap();
        let original: Vec<u64> = (0..16).map(|i| (i * 7 + 3) % 12_289).collect();
        let mut coeffs = original.clone();
        table.forward(&mut coeffs);
        assert_ne!(coeffs, original);
        table.inverse(&mut coeffs);
        assert_eq!(coeffs, original);
    }

    #[test]
    fn pointwise_product_matches_schoolbook() {
        let degree = 32;
        let p = chain_primes(&[50], degree as u64).unwrap()[0];
        let table = NttTable::new(p, degree).unwrap();
        let a: Vec<u64> = (0..degree as u64).map(|i| (i * i + 1) % p).collect();
        let b: Vec<u64> = (0..degree as u64).map(|i| p - 1 - i).collect();
        let expected = schoolbook_negacyclic(&a, &b, p);

        let mut fa = a.clone();
        let mut fb = b.clone();
        table.forward(&mut fa);
        table.forward(&mut fb);
        let mut product: Vec<u64> =
            fa.iter().zip(&fb).map(|(&x, &y)| mul_mod(x, y, p)).collect();
        table.inverse(&mut product);
        assert_eq!(product, expected);
    }
}
