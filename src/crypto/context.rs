use super::ciphertext::WireValue;
use super::encoding::{decode_scalar, encode_scalar};
use super::{CkksError, CkksResult, ContextParams, EncryptedValue};
use crate::keys::switching_key::conjugation_element;
use crate::keys::{
    GaloisKeys, PublicKey, PublicKeyParams, RelinearizationKey, SecretKey, SecretKeyParams,
};
use crate::math::{chain_primes, gaussian_coefficients, ternary_coefficients};
use crate::rings::{RnsBasis, RnsPoly};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument};

/// Relative difference tolerated between operand scales in an addition.
const SCALE_TOLERANCE: f64 = 1e-3;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Encryption context: modulus chain, scale and all key material.
///
/// Immutable once built. Every operation that needs randomness takes the
/// caller's RNG, so a context can be shared by reference across threads.
pub struct EncryptionContext {
    id: u64,
    params: ContextParams,
    basis: RnsBasis,
    scale: f64,
    secret_key: SecretKey,
    public_key: PublicKey,
    relin_key: RelinearizationKey,
    galois_keys: Option<GaloisKeys>,
}

impl EncryptionContext {
    /// Builds a context with keys drawn from OS entropy.
    pub fn new(params: ContextParams) -> CkksResult<Self> {
        Self::generate(params, &mut ChaCha20Rng::from_os_rng())
    }

    /// Deterministic construction for reproducible tests.
    pub fn from_seed(params: ContextParams, seed: u64) -> CkksResult<Self> {
        Self::generate(params, &mut ChaCha20Rng::seed_from_u64(seed))
    }

    #[instrument(skip_all, fields(degree = params.poly_modulus_degree, bits = ?params.coeff_mod_bit_sizes))]
    pub fn generate<R: Rng + ?Sized>(params: ContextParams, rng: &mut R) -> CkksResult<Self> {
        params.validate()?;
        let degree = params.poly_modulus_degree;

        let primes = chain_primes(&params.coeff_mod_bit_sizes, degree as u64)
            .map_err(|bits| CkksError::PrimeSearch { bits, degree })?;
        debug!(?primes, "selected modulus chain");
        let basis = RnsBasis::new(&primes, degree)?;

        let secret_key = SecretKey::generate(
            &basis,
            &SecretKeyParams {
                hamming_weight: params.hamming_weight(),
            },
            rng,
        )?;
        let public_key = PublicKey::generate(
            &basis,
            &secret_key,
            &PublicKeyParams {
                error_std: params.error_std,
            },
            rng,
        )?;
        let relin_key = RelinearizationKey::generate(&basis, &secret_key, params.error_std, rng)?;
        let galois_keys = if params.galois_keys {
            Some(GaloisKeys::generate(
                &basis,
                &secret_key,
                params.error_std,
                rng,
            )?)
        } else {
            None
        };

        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            id,
            depth = params.multiplicative_depth(),
            galois = galois_keys.as_ref().map_or(0, GaloisKeys::len),
            "encryption context ready"
        );

        Ok(Self {
            id,
            scale: 2f64.powi(params.scale_bits as i32),
            params,
            basis,
            secret_key,
            public_key,
            relin_key,
            galois_keys,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn params(&self) -> &ContextParams {
        &self.params
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn primes(&self) -> Vec<u64> {
        self.basis.primes()
    }

    pub fn max_level(&self) -> usize {
        self.basis.max_level()
    }

    pub fn multiplicative_depth(&self) -> usize {
        self.basis.max_level()
    }

    pub fn galois_keys(&self) -> Option<&GaloisKeys> {
        self.galois_keys.as_ref()
    }

    /// Encrypts `value` at the top level under the public key.
    pub fn encrypt<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> CkksResult<EncryptedValue> {
        let level = self.basis.max_level();
        let moduli = self.basis.data_moduli(level);
        let plain = encode_scalar(value, self.scale, moduli, moduli[0].prime())?;

        let degree = self.basis.degree();
        let mut u = RnsPoly::from_signed(
            &ternary_coefficients(degree, self.params.hamming_weight(), rng),
            moduli,
        );
        u.to_ntt();
        let mut e0 = RnsPoly::from_signed(
            &gaussian_coefficients(degree, self.params.error_std, rng),
            moduli,
        );
        e0.to_ntt();
        let mut e1 = RnsPoly::from_signed(
            &gaussian_coefficients(degree, self.params.error_std, rng),
            moduli,
        );
        e1.to_ntt();

        // c0 = b * u + e0 + m
        let mut c0 = self.public_key.b.clone();
        c0 *= &u;
        c0 += &e0;
        c0 += &plain;

        // c1 = a * u + e1
        let mut c1 = self.public_key.a.clone();
        c1 *= &u;
        c1 += &e1;

        Ok(EncryptedValue {
            c0,
            c1,
            scale: self.scale,
            context_id: self.id,
        })
    }

    pub fn decrypt(&self, value: &EncryptedValue) -> CkksResult<f64> {
        self.check_owner(value)?;
        // m = c0 + c1 * s
        let mut plain = value.c1.clone();
        plain *= &self.secret_key.prefix(value.c1.channel_count());
        plain += &value.c0;
        Ok(decode_scalar(&plain, value.scale))
    }

    pub fn add(&self, lhs: &EncryptedValue, rhs: &EncryptedValue) -> CkksResult<EncryptedValue> {
        let (mut out, rhs) = self.aligned(lhs, rhs)?;
        out.c0 += &rhs.c0;
        out.c1 += &rhs.c1;
        Ok(out)
    }

    pub fn sub(&self, lhs: &EncryptedValue, rhs: &EncryptedValue) -> CkksResult<EncryptedValue> {
        let (mut out, rhs) = self.aligned(lhs, rhs)?;
        out.c0 -= &rhs.c0;
        out.c1 -= &rhs.c1;
        Ok(out)
    }

    /// Ciphertext product with relinearization and one rescale.
    pub fn multiply(
        &self,
        lhs: &EncryptedValue,
        rhs: &EncryptedValue,
    ) -> CkksResult<EncryptedValue> {
        self.check_owner(lhs)?;
        self.check_owner(rhs)?;
        let level = lhs.level().min(rhs.level());
        self.ensure_rescalable(level)?;
        let lhs = truncated(lhs, level);
        let rhs = truncated(rhs, level);

        // (c0 + c1 s)(c0' + c1' s) = d0 + d1 s + d2 s^2
        let mut d0 = lhs.c0.clone();
        d0 *= &rhs.c0;
        let mut d1 = lhs.c0.clone();
        d1 *= &rhs.c1;
        let mut cross = lhs.c1.clone();
        cross *= &rhs.c0;
        d1 += &cross;
        let mut d2 = lhs.c1.clone();
        d2 *= &rhs.c1;

        let (k0, k1) = self.relin_key.0.switch(&self.basis, &d2);
        d0 += &k0;
        d1 += &k1;

        let dropped = self.basis.primes()[level] as f64;
        let mut out = EncryptedValue {
            c0: d0,
            c1: d1,
            scale: lhs.scale * rhs.scale / dropped,
            context_id: self.id,
        };
        rescale(&mut out);
        debug!(level = out.level(), scale = out.scale, "multiplied");
        Ok(out)
    }

    /// Multiplies by a plaintext real `factor` and rescales.
    ///
    /// The factor is applied as the integer `round(factor * q_l)`, and the
    /// rescale by `q_l` brings the scale back to where it was.
    pub fn multiply_plain(&self, value: &EncryptedValue, factor: f64) -> CkksResult<EncryptedValue> {
        self.check_owner(value)?;
        let level = value.level();
        self.ensure_rescalable(level)?;

        let dropped = self.basis.primes()[level] as f64;
        let integer = (factor * dropped).round();
        if !integer.is_finite() || integer.abs() >= 2f64.powi(120) {
            return Err(CkksError::ValueOutOfRange { value: factor });
        }
        let integer = integer as i128;

        let mut out = value.clone();
        out.c0.mul_scalar_assign(integer);
        out.c1.mul_scalar_assign(integer);
        if integer != 0 {
            // decode(m * k / q_l) at scale s * k / (q_l * factor) yields value * factor
            out.scale = value.scale * (integer as f64) / (dropped * factor);
        }
        rescale(&mut out);
        Ok(out)
    }

    /// Applies the automorphism `X -> X^element` with its Galois key.
    pub fn apply_galois(
        &self,
        value: &EncryptedValue,
        element: usize,
    ) -> CkksResult<EncryptedValue> {
        self.check_owner(value)?;
        let key = self
            .galois_keys
            .as_ref()
            .and_then(|keys| keys.get(element))
            .ok_or(CkksError::MissingGaloisKey { element })?;

        let mut c0 = value.c0.automorphism(element);
        let c1 = value.c1.automorphism(element);
        let (k0, k1) = key.switch(&self.basis, &c1);
        c0 += &k0;
        Ok(EncryptedValue {
            c0,
            c1: k1,
            scale: value.scale,
            context_id: self.id,
        })
    }

    /// Complex conjugation of every slot; a real scalar is left unchanged.
    pub fn conjugate(&self, value: &EncryptedValue) -> CkksResult<EncryptedValue> {
        self.apply_galois(value, conjugation_element(self.basis.degree()))
    }

    /// Restores a ciphertext serialized by [`EncryptedValue::to_bytes`].
    pub fn load(&self, bytes: &[u8]) -> CkksResult<EncryptedValue> {
        let wire = WireValue::from_bytes(bytes)?;
        if wire.context_id != self.id {
            return Err(CkksError::ContextMismatch {
                expected: self.id,
                actual: wire.context_id,
            });
        }
        let channels = wire.primes.len();
        if channels == 0 || channels > self.basis.max_level() + 1 {
            return Err(CkksError::Serialization(format!(
                "ciphertext has {channels} channels"
            )));
        }
        let moduli = self.basis.data_moduli(channels - 1);
        if moduli.iter().map(|t| t.prime()).ne(wire.primes.iter().copied()) {
            return Err(CkksError::Serialization(
                "ciphertext primes do not match the context".into(),
            ));
        }
        if !(wire.scale.is_finite() && wire.scale > 0.0) {
            return Err(CkksError::Serialization(format!(
                "invalid scale {}",
                wire.scale
            )));
        }
        let malformed = || CkksError::Serialization("malformed residues".into());
        let c0 = RnsPoly::from_residues(wire.c0, moduli, true).ok_or_else(malformed)?;
        let c1 = RnsPoly::from_residues(wire.c1, moduli, true).ok_or_else(malformed)?;
        Ok(EncryptedValue {
            c0,
            c1,
            scale: wire.scale,
            context_id: self.id,
        })
    }

    fn check_owner(&self, value: &EncryptedValue) -> CkksResult<()> {
        if value.context_id == self.id {
            Ok(())
        } else {
            Err(CkksError::ContextMismatch {
                expected: self.id,
                actual: value.context_id,
            })
        }
    }

    fn ensure_rescalable(&self, level: usize) -> CkksResult<()> {
        if level == 0 {
            Err(CkksError::LevelExhausted {
                depth: self.multiplicative_depth(),
            })
        } else {
            Ok(())
        }
    }

    /// Brings both operands to the lower level and checks their scales agree.
    fn aligned(
        &self,
        lhs: &EncryptedValue,
        rhs: &EncryptedValue,
    ) -> CkksResult<(EncryptedValue, EncryptedValue)> {
        self.check_owner(lhs)?;
        self.check_owner(rhs)?;
        let relative = (lhs.scale - rhs.scale).abs() / lhs.scale.max(rhs.scale);
        if relative > SCALE_TOLERANCE {
            return Err(CkksError::ScaleMismatch {
                expected: lhs.scale,
                actual: rhs.scale,
            });
        }
        let level = lhs.level().min(rhs.level());
        Ok((truncated(lhs, level), truncated(rhs, level)))
    }
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("id", &self.id)
            .field("degree", &self.params.poly_modulus_degree)
            .field("coeff_mod_bit_sizes", &self.params.coeff_mod_bit_sizes)
            .field("scale_bits", &self.params.scale_bits)
            .finish_non_exhaustive()
    }
}

fn truncated(value: &EncryptedValue, level: usize) -> EncryptedValue {
    if value.level() == level {
        return value.clone();
    }
    EncryptedValue {
        c0: value.c0.prefix(level + 1),
        c1: value.c1.prefix(level + 1),
        scale: value.scale,
        context_id: value.context_id,
    }
}

fn rescale(value: &mut EncryptedValue) {
    value.c0.divide_round_by_last();
    value.c1.divide_round_by_last();
}
