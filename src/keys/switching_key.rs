//! Key switching with RNS digit decomposition and one special prime `P`.
//!
//! A key for target `t` holds one RLWE sample per data prime `q_j`:
//! `b_j + a_j * s = e_j + P * t` modulo `q_j`, and `b_j + a_j * s = e_j`
//! modulo every other prime. Switching `d` multiplies the centered residues of
//! `d` mod `q_j` into the samples, sums, and divides by `P`, which leaves
//! `d * t` plus a small error under `s`.

use super::{KeyError, PublicKeyParams, SecretKey};
use crate::math::gaussian_coefficients;
use crate::rings::{RnsBasis, RnsPoly};
use rand::Rng;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct KeySwitchKey {
    /// `(b_j, a_j)` per data prime, NTT form over the whole chain
    digits: Vec<(RnsPoly, RnsPoly)>,
}

impl KeySwitchKey {
    pub(crate) fn generate<R: Rng + ?Sized>(
        basis: &RnsBasis,
        secret_key: &SecretKey,
        target: &RnsPoly,
        error_std: f64,
        rng: &mut R,
    ) -> Result<Self, KeyError> {
        PublicKeyParams { error_std }.validate()?;
        let moduli = basis.all_moduli();
        let special = basis.special_prime();

        let digits = (0..=basis.max_level())
            .map(|j| {
                let a = RnsPoly::uniform(moduli, rng);
                let mut e = RnsPoly::from_signed(
                    &gaussian_coefficients(basis.degree(), error_std, rng),
                    moduli,
                );
                e.to_ntt();

                let mut a_times_s = a.clone();
                a_times_s *= secret_key.poly();
                let mut b = -a_times_s;
                b += &e;
                b.add_scaled_channel(j, target, special % moduli[j].prime());
                (b, a)
            })
            .collect();

        Ok(Self { digits })
    }

    /// Number of digits, one per data prime.
    pub fn digit_count(&self) -> usize {
        self.digits.len()
    }

    /// Returns `(k0, k1)` at the level of `input` with `k0 + k1 * s ~ input * t`.
    ///
    /// The output is in NTT form over `q_0..q_level`.
    pub(crate) fn switch(&self, basis: &RnsBasis, input: &RnsPoly) -> (RnsPoly, RnsPoly) {
        let level = input.channel_count() - 1;
        let key_moduli = basis.key_moduli(level);
        let channels = basis.key_channels(level);

        let mut coeff = input.clone();
        coeff.to_coeff();

        let mut acc0 = RnsPoly::zero(&key_moduli, true);
        let mut acc1 = RnsPoly::zero(&key_moduli, true);
        for (j, (b, a)) in self.digits.iter().enumerate().take(level + 1) {
            let q = coeff.moduli()[j].prime();
            let centered: Vec<i64> = coeff
                .channel(j)
                .iter()
                .map(|&r| if r > q / 2 { r as i64 - q as i64 } else { r as i64 })
                .collect();
            let mut digit = RnsPoly::from_signed(&centered, &key_moduli);
            digit.to_ntt();

            let mut term0 = b.select(&channels);
            term0 *= &digit;
            acc0 += &term0;
            let mut term1 = a.select(&channels);
            term1 *= &digit;
            acc1 += &term1;
        }

        acc0.divide_round_by_last();
        acc1.divide_round_by_last();
        (acc0, acc1)
    }
}

/// Switches `s^2` back to `s` after a ciphertext product.
#[derive(Clone, Debug)]
pub struct RelinearizationKey(pub(crate) KeySwitchKey);

impl RelinearizationKey {
    pub fn generate<R: Rng + ?Sized>(
        basis: &RnsBasis,
        secret_key: &SecretKey,
        error_std: f64,
        rng: &mut R,
    ) -> Result<Self, KeyError> {
        let target = secret_key.squared();
        KeySwitchKey::generate(basis, secret_key, &target, error_std, rng).map(Self)
    }
}

/// Keys for the automorphisms `X -> X^k`, indexed by Galois element `k`.
#[derive(Clone, Debug, Default)]
pub struct GaloisKeys {
    keys: HashMap<usize, KeySwitchKey>,
}

impl GaloisKeys {
    /// Keys for every power-of-two slot rotation plus complex conjugation.
    pub fn generate<R: Rng + ?Sized>(
        basis: &RnsBasis,
        secret_key: &SecretKey,
        error_std: f64,
        rng: &mut R,
    ) -> Result<Self, KeyError> {
        let degree = basis.degree();
        let slots = degree / 2;
        let mut elements: Vec<usize> = std::iter::successors(Some(1usize), |s| Some(s * 2))
            .take_while(|&step| step < slots)
            .map(|step| rotation_element(step, degree))
            .collect();
        elements.push(conjugation_element(degree));

        let mut keys = HashMap::with_capacity(elements.len());
        for element in elements {
            let target = secret_key.poly().automorphism(element);
            let key = KeySwitchKey::generate(basis, secret_key, &target, error_std, rng)?;
            keys.insert(element, key);
        }
        Ok(Self { keys })
    }

    pub fn get(&self, element: usize) -> Option<&KeySwitchKey> {
        self.keys.get(&element)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Galois elements with a key, ascending.
    pub fn elements(&self) -> Vec<usize> {
        let mut elements: Vec<usize> = self.keys.keys().copied().collect();
        elements.sort_unstable();
        elements
    }
}

/// `5^step mod 2N`, the element rotating slots left by `step`.
pub fn rotation_element(step: usize, degree: usize) -> usize {
    let two_n = 2 * degree;
    (0..step).fold(1usize, |acc, _| acc * 5 % two_n)
}

/// `2N - 1`, the element mapping every slot to its complex conjugate.
pub fn conjugation_element(degree: usize) -> usize {
    2 * degree - 1
}
