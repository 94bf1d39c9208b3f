//! NTT-friendly prime search for the coefficient-modulus chain.
//!
//! Every modulus in the chain must satisfy `p = 1 (mod 2N)` so that `Z_p`
//! holds a primitive `2N`-th root of unity for the negacyclic NTT. Primality
//! is checked with Miller-Rabin over a fixed witness set, which is exact for
//! every `u64`.

use std::collections::HashMap;

// Deterministic for all n < 3.3 * 10^24, which covers u64.
const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// `(a * b) mod modulus` through a `u128` intermediate.
#[inline]
pub fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 * b as u128) % modulus as u128) as u64
}

/// `base^exp mod modulus` by square-and-multiply.
pub fn pow_mod(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    assert!(modulus > 0, "pow_mod: modulus must be positive");
    if modulus == 1 {
        return 0;
    }
    let mut acc = 1u64;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exp >>= 1;
    }
    acc
}

/// Inverse of `a` modulo the prime `p` (Fermat).
///
/// # Panics
///
/// Panics if `a` is divisible by `p`.
pub fn inv_mod_prime(a: u64, p: u64) -> u64 {
    let reduced = a % p;
    assert!(reduced != 0, "inv_mod_prime: {a} has no inverse modulo {p}");
    pow_mod(reduced, p - 2, p)
}

/// Splits `n` into `(odd, r)` with `n = odd * 2^r`.
fn split_twos(n: u64) -> (u64, u32) {
    assert!(n > 0, "split_twos: n must be positive");
    let r = n.trailing_zeros();
    (n >> r, r)
}

/// Deterministic Miller-Rabin for `u64`.
pub fn is_prime(n: u64) -> bool {
    match n {
        0 | 1 => return false,
        2 | 3 => return true,
        _ if n & 1 == 0 => return false,
        _ => {}
    }

    let (d, r) = split_twos(n - 1);
    'witness: for &a in WITNESSES.iter() {
        if a % n == 0 {
            continue;
        }
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// `true` when `p` is prime and `p = 1 (mod 2 * degree)`.
#[inline]
pub fn is_ntt_friendly_prime(p: u64, degree: u64) -> bool {
    let order = degree
        .checked_mul(2)
        .expect("is_ntt_friendly_prime: 2 * degree must fit in u64");
    p % order == 1 && is_prime(p)
}

/// Largest `x <= value` with `x % step == 1`, or `None` on underflow.
fn align_down(value: u64, step: u64) -> Option<u64> {
    let delta = (value % step + step - 1) % step;
    value.checked_sub(delta)
}

/// Largest NTT-friendly prime strictly below `bound`.
pub fn prime_below(bound: u64, degree: u64) -> Option<u64> {
    if bound <= 2 {
        return None;
    }
    let step = degree.checked_mul(2)?;
    let mut candidate = align_down(bound - 1, step)?;
    loop {
        if candidate <= 2 {
            return None;
        }
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_sub(step)?;
    }
}

/// Picks one distinct NTT-friendly prime per requested bit size.
///
/// Requests with the same bit size receive consecutive primes walking down
/// from `2^bits`, so a `[60, 40, 40, 60]` chain gets two different 60-bit
/// primes and two different 40-bit primes. Output order matches the input.
///
/// Returns the first bit size that ran out of candidates on failure.
pub fn chain_primes(bit_sizes: &[u32], degree: u64) -> Result<Vec<u64>, u32> {
    let mut cursors: HashMap<u32, u64> = HashMap::new();
    let mut primes = Vec::with_capacity(bit_sizes.len());

    for &bits in bit_sizes {
        let floor = 1u64 << (bits - 1);
        let bound = *cursors.get(&bits).unwrap_or(&(1u64 << bits));
        let prime = prime_below(bound, degree)
            .filter(|&p| p >= floor)
            .ok_or(bits)?;
        cursors.insert(bits, prime);
        primes.push(prime);
    }

    Ok(primes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_division(n: u64) -> bool {
        if n < 2 {
            return false;
        }
        let mut i = 2u64;
        while i * i <= n {
            if n % i == 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    #[test]
    fn small_numbers_match_trial_division() {
        for n in 0..2_000u64 {
            assert_eq!(is_prime(n), trial_division(n), "mismatch at {n}");
        }
    }

    #[test]
    fn carmichael_numbers_are_composite() {
        for n in [561u64, 1_105, 1_729, 3_215_031_751] {
            assert!(!is_prime(n), "expected composite: {n}");
        }
    }

    #[test]
    fn large_known_primes() {
        assert!(is_prime(18_446_744_073_709_551_557));
        assert!(is_prime(1_073_750_017));
        assert!(!is_prime(u64::MAX));
    }

    #[test]
    fn inverse_round_trips() {
        let p = 1_073_750_017u64;
        for a in [1u64, 2, 12345, p - 1] {
            assert_eq!(mul_mod(a, inv_mod_prime(a, p), p), 1);
        }
    }

    #[test]
    #[should_panic(expected = "has no inverse")]
    fn inverse_of_zero_panics() {
        let _ = inv_mod_prime(17, 17);
    }

    #[test]
    fn prime_below_is_ntt_friendly() {
        let degree = 1024;
        let p = prime_below(1 << 40, degree).unwrap();
        assert!(p < 1 << 40);
        assert!(p >= 1 << 39);
        assert!(is_ntt_friendly_prime(p, degree));
        assert_eq!(prime_below(2, degree), None);
    }

    #[test]
    fn chain_primes_are_distinct_per_bit_size() {
        let degree = 8192;
        let primes = chain_primes(&[60, 40, 40, 60], degree).unwrap();
        assert_eq!(primes.len(), 4);
        assert_ne!(primes[0], primes[3]);
        assert_ne!(primes[1], primes[2]);
        assert!(primes[0] > primes[3]);
        assert!(primes[1] > primes[2]);
        for (&p, bits) in primes.iter().zip([60u32, 40, 40, 60]) {
            assert_eq!(64 - p.leading_zeros(), bits);
            assert!(is_ntt_friendly_prime(p, degree));
        }
    }

    #[test]
    fn chain_primes_reports_exhausted_bit_size() {
        // Only a handful of 20-bit primes are 1 mod 2^16.
        let request = vec![20u32; 64];
        assert_eq!(chain_primes(&request, 32_768), Err(20));
    }
}
