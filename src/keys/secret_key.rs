//! Secret key: a sparse ternary polynomial `s(X)` with coefficients in `{-1, 0, 1}`.
use super::KeyError;
use crate::math::ternary_coefficients;
use crate::rings::{RnsBasis, RnsPoly};
use rand::Rng;

/// Parameters for generating a secret key.
pub struct SecretKeyParams {
    pub hamming_weight: usize,
}

impl SecretKeyParams {
    fn validate(&self, degree: usize) -> Result<(), KeyError> {
        if self.hamming_weight == 0 || self.hamming_weight > degree {
            Err(KeyError::InvalidHammingWeight {
                weight: self.hamming_weight,
                degree,
            })
        } else {
            Ok(())
        }
    }
}

/// Secret key held in NTT form over every modulus of the chain, the special
/// prime included, so it can be narrowed to any level or key basis.
pub struct SecretKey {
    s: RnsPoly,
}

impl SecretKey {
    pub fn generate<R: Rng + ?Sized>(
        basis: &RnsBasis,
        params: &SecretKeyParams,
        rng: &mut R,
    ) -> Result<Self, KeyError> {
        params.validate(basis.degree())?;
        let coeffs = ternary_coefficients(basis.degree(), params.hamming_weight, rng);
        let mut s = RnsPoly::from_signed(&coeffs, basis.all_moduli());
        s.to_ntt();
        Ok(Self { s })
    }

    pub(crate) fn poly(&self) -> &RnsPoly {
        &self.s
    }

    /// `s` restricted to the first `count` moduli.
    pub(crate) fn prefix(&self, count: usize) -> RnsPoly {
        self.s.prefix(count)
    }

    /// `s^2` over the full chain.
    pub(crate) fn squared(&self) -> RnsPoly {
        let mut sq = self.s.clone();
        sq *= &self.s;
        sq
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}
