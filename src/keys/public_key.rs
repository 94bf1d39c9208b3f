use super::{KeyError, SecretKey};
use crate::math::gaussian_coefficients;
use crate::rings::{RnsBasis, RnsPoly};
use rand::Rng;

/// Parameters for generating a public key.
pub struct PublicKeyParams {
    /// Standard deviation for the error distribution
    pub error_std: f64,
}

impl PublicKeyParams {
    pub(crate) fn validate(&self) -> Result<(), KeyError> {
        if self.error_std.is_finite() && self.error_std > 0.0 {
            Ok(())
        } else {
            Err(KeyError::InvalidErrorStd(self.error_std))
        }
    }
}

/// RLWE public key over the data moduli at the top level.
#[derive(Clone, Debug)]
pub struct PublicKey {
    /// b = -(a * s) + e
    pub(crate) b: RnsPoly,
    /// uniformly random
    pub(crate) a: RnsPoly,
}

impl PublicKey {
    pub fn generate<R: Rng + ?Sized>(
        basis: &RnsBasis,
        secret_key: &SecretKey,
        params: &PublicKeyParams,
        rng: &mut R,
    ) -> Result<Self, KeyError> {
        params.validate()?;
        let moduli = basis.data_moduli(basis.max_level());

        let a = RnsPoly::uniform(moduli, rng);
        let mut e = RnsPoly::from_signed(
            &gaussian_coefficients(basis.degree(), params.error_std, rng),
            moduli,
        );
        e.to_ntt();

        let mut a_times_s = a.clone();
        a_times_s *= &secret_key.prefix(moduli.len());
        let mut b = -a_times_s;
        b += &e;

        Ok(Self { b, a })
    }
}
