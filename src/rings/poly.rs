//! RNS polynomial with runtime degree and per-channel NTT tables.

use super::NttTable;
use super::ntt::{add_mod, sub_mod};
use crate::math::{inv_mod_prime, mul_mod, uniform_residues};
use rand::Rng;
use std::{
    fmt,
    ops::{AddAssign, MulAssign, Neg, SubAssign},
    sync::Arc,
};

/// Polynomial in `Z_Q[X]/(X^N + 1)` stored as one residue vector per prime.
///
/// Additive operations work in either representation as long as both
/// operands agree; multiplication requires the NTT (evaluation) form.
#[derive(Clone, Debug)]
pub struct RnsPoly {
    residues: Vec<Vec<u64>>,
    moduli: Vec<Arc<NttTable>>,
    ntt_form: bool,
}

impl RnsPoly {
    pub fn zero(moduli: &[Arc<NttTable>], ntt_form: bool) -> Self {
        let degree = moduli[0].degree();
        Self {
            residues: vec![vec![0u64; degree]; moduli.len()],
            moduli: moduli.to_vec(),
            ntt_form,
        }
    }

    /// Coefficient-form polynomial from signed integer coefficients.
    pub fn from_signed(coeffs: &[i64], moduli: &[Arc<NttTable>]) -> Self {
        assert_eq!(
            coeffs.len(),
            moduli[0].degree(),
            "coefficient count must match ring degree"
        );
        let residues = moduli
            .iter()
            .map(|table| {
                let q = table.prime() as i64;
                coeffs.iter().map(|&c| c.rem_euclid(q) as u64).collect()
            })
            .collect();
        Self {
            residues,
            moduli: moduli.to_vec(),
            ntt_form: false,
        }
    }

    /// The constant polynomial `value`, in NTT form.
    ///
    /// A constant evaluates to itself at every root, so every NTT slot of a
    /// channel holds `value mod q`.
    pub fn constant(value: i128, moduli: &[Arc<NttTable>]) -> Self {
        let degree = moduli[0].degree();
        let residues = moduli
            .iter()
            .map(|table| {
                let residue = value.rem_euclid(table.prime() as i128) as u64;
                vec![residue; degree]
            })
            .collect();
        Self {
            residues,
            moduli: moduli.to_vec(),
            ntt_form: true,
        }
    }

    /// Uniformly random polynomial, sampled directly in NTT form.
    pub fn uniform<R: Rng + ?Sized>(moduli: &[Arc<NttTable>], rng: &mut R) -> Self {
        let degree = moduli[0].degree();
        let residues = moduli
            .iter()
            .map(|table| uniform_residues(degree, table.prime(), rng))
            .collect();
        Self {
            residues,
            moduli: moduli.to_vec(),
            ntt_form: true,
        }
    }

    /// Rebuilds a polynomial from raw residues, e.g. after deserialization.
    pub(crate) fn from_residues(
        residues: Vec<Vec<u64>>,
        moduli: &[Arc<NttTable>],
        ntt_form: bool,
    ) -> Option<Self> {
        let degree = moduli[0].degree();
        let well_formed = residues.len() == moduli.len()
            && residues.iter().zip(moduli).all(|(channel, table)| {
                channel.len() == degree && channel.iter().all(|&r| r < table.prime())
            });
        well_formed.then(|| Self {
            residues,
            moduli: moduli.to_vec(),
            ntt_form,
        })
    }

    pub fn degree(&self) -> usize {
        self.residues[0].len()
    }

    pub fn channel_count(&self) -> usize {
        self.residues.len()
    }

    pub fn primes(&self) -> Vec<u64> {
        self.moduli.iter().map(|t| t.prime()).collect()
    }

    pub fn moduli(&self) -> &[Arc<NttTable>] {
        &self.moduli
    }

    pub fn channel(&self, idx: usize) -> &[u64] {
        &self.residues[idx]
    }

    pub(crate) fn residues(&self) -> &[Vec<u64>] {
        &self.residues
    }

    pub fn is_ntt_form(&self) -> bool {
        self.ntt_form
    }

    pub fn to_ntt(&mut self) {
        if self.ntt_form {
            return;
        }
        for (channel, table) in self.residues.iter_mut().zip(&self.moduli) {
            table.forward(channel);
        }
        self.ntt_form = true;
    }

    pub fn to_coeff(&mut self) {
        if !self.ntt_form {
            return;
        }
        for (channel, table) in self.residues.iter_mut().zip(&self.moduli) {
            table.inverse(channel);
        }
        self.ntt_form = false;
    }

    /// Residues of coefficient `idx` across all channels.
    pub fn coefficient_residues(&self, idx: usize) -> Vec<u64> {
        assert!(
            !self.ntt_form,
            "coefficient access requires coefficient form"
        );
        self.residues.iter().map(|channel| channel[idx]).collect()
    }

    /// Keeps only the first `count` channels (modulus drop, noise free).
    pub fn truncate(&mut self, count: usize) {
        assert!(
            count >= 1 && count <= self.channel_count(),
            "cannot keep {count} of {} channels",
            self.channel_count()
        );
        self.residues.truncate(count);
        self.moduli.truncate(count);
    }

    /// Copy of the first `count` channels.
    pub fn prefix(&self, count: usize) -> Self {
        Self {
            residues: self.residues[..count].to_vec(),
            moduli: self.moduli[..count].to_vec(),
            ntt_form: self.ntt_form,
        }
    }

    /// Copy of the listed channels, in the listed order.
    pub fn select(&self, channels: &[usize]) -> Self {
        Self {
            residues: channels.iter().map(|&c| self.residues[c].clone()).collect(),
            moduli: channels.iter().map(|&c| self.moduli[c].clone()).collect(),
            ntt_form: self.ntt_form,
        }
    }

    /// Multiplies every coefficient by the integer `scalar`.
    pub fn mul_scalar_assign(&mut self, scalar: i128) {
        for (channel, table) in self.residues.iter_mut().zip(&self.moduli) {
            let p = table.prime();
            let factor = scalar.rem_euclid(p as i128) as u64;
            for value in channel.iter_mut() {
                *value = mul_mod(*value, factor, p);
            }
        }
    }

    /// Adds `scalar * other[channel]` into channel `channel` only.
    ///
    /// Used to place a gadget term that is non-zero modulo a single prime.
    pub(crate) fn add_scaled_channel(&mut self, channel: usize, other: &RnsPoly, scalar: u64) {
        assert_eq!(self.ntt_form, other.ntt_form, "representation mismatch");
        let p = self.moduli[channel].prime();
        assert_eq!(p, other.moduli[channel].prime(), "channel prime mismatch");
        let factor = scalar % p;
        for (dst, &src) in self.residues[channel].iter_mut().zip(&other.residues[channel]) {
            *dst = add_mod(*dst, mul_mod(src, factor, p), p);
        }
    }

    /// Divides by the last prime with rounding and drops that channel.
    ///
    /// For `x` with residues `x_i`, each remaining channel becomes
    /// `(x_i - [x]_last) * last^-1 mod q_i` where `[x]_last` is the centered
    /// residue, i.e. `round(x / last)`. Keeps the input representation.
    pub fn divide_round_by_last(&mut self) {
        assert!(self.channel_count() >= 2, "no channel left to divide by");
        let was_ntt = self.ntt_form;
        self.to_coeff();

        let (Some(last), Some(last_table)) = (self.residues.pop(), self.moduli.pop()) else {
            unreachable!("channel count checked above");
        };
        let q_last = last_table.prime();
        let half = q_last / 2;

        for (channel, table) in self.residues.iter_mut().zip(&self.moduli) {
            let q = table.prime();
            let inv = inv_mod_prime(q_last % q, q);
            let q_last_mod = q_last % q;
            for (value, &r) in channel.iter_mut().zip(&last) {
                let centered = if r > half {
                    sub_mod(r % q, q_last_mod, q)
                } else {
                    r % q
                };
                *value = mul_mod(sub_mod(*value, centered, q), inv, q);
            }
        }

        if was_ntt {
            self.to_ntt();
        }
    }

    /// Applies `X -> X^galois_element`, keeping the input representation.
    pub fn automorphism(&self, galois_element: usize) -> Self {
        let degree = self.degree();
        let two_n = 2 * degree;
        assert!(
            galois_element % 2 == 1 && galois_element < two_n,
            "galois element must be odd and below 2N"
        );

        let mut source = self.clone();
        source.to_coeff();
        let mut residues = vec![vec![0u64; degree]; self.channel_count()];
        for (out, (channel, table)) in residues
            .iter_mut()
            .zip(source.residues.iter().zip(&source.moduli))
        {
            let p = table.prime();
            for (i, &value) in channel.iter().enumerate() {
                let target = (i * galois_element) % two_n;
                if target < degree {
                    out[target] = value;
                } else {
                    out[target - degree] = sub_mod(0, value, p);
                }
            }
        }

        let mut result = Self {
            residues,
            moduli: source.moduli,
            ntt_form: false,
        };
        if self.ntt_form {
            result.to_ntt();
        }
        result
    }

    fn assert_compatible(&self, rhs: &RnsPoly) {
        assert_eq!(
            self.channel_count(),
            rhs.channel_count(),
            "channel count mismatch"
        );
        assert_eq!(self.ntt_form, rhs.ntt_form, "representation mismatch");
        for (lhs, rhs) in self.moduli.iter().zip(&rhs.moduli) {
            assert_eq!(lhs.prime(), rhs.prime(), "RNS basis mismatch");
        }
    }
}

impl AddAssign<&RnsPoly> for RnsPoly {
    fn add_assign(&mut self, rhs: &RnsPoly) {
        self.assert_compatible(rhs);
        for ((channel, other), table) in
            self.residues.iter_mut().zip(&rhs.residues).zip(&self.moduli)
        {
            let p = table.prime();
            for (lhs, &rhs) in channel.iter_mut().zip(other) {
                *lhs = add_mod(*lhs, rhs, p);
            }
        }
    }
}

impl SubAssign<&RnsPoly> for RnsPoly {
    fn sub_assign(&mut self, rhs: &RnsPoly) {
        self.assert_compatible(rhs);
        for ((channel, other), table) in
            self.residues.iter_mut().zip(&rhs.residues).zip(&self.moduli)
        {
            let p = table.prime();
            for (lhs, &rhs) in channel.iter_mut().zip(other) {
                *lhs = sub_mod(*lhs, rhs, p);
            }
        }
    }
}

impl MulAssign<&RnsPoly> for RnsPoly {
    fn mul_assign(&mut self, rhs: &RnsPoly) {
        self.assert_compatible(rhs);
        assert!(self.ntt_form, "multiplication requires NTT form");
        for ((channel, other), table) in
            self.residues.iter_mut().zip(&rhs.residues).zip(&self.moduli)
        {
            let p = table.prime();
            for (lhs, &rhs) in channel.iter_mut().zip(other) {
                *lhs = mul_mod(*lhs, rhs, p);
            }
        }
    }
}

impl Neg for RnsPoly {
    type Output = Self;

    fn neg(mut self) -> Self::Output {
        for (channel, table) in self.residues.iter_mut().zip(&self.moduli) {
            let p = table.prime();
            for value in channel.iter_mut() {
                *value = sub_mod(0, *value, p);
            }
        }
        self
    }
}

impl fmt::Display for RnsPoly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let form = if self.ntt_form { "NTT" } else { "COEFF" };
        write!(
            f,
            "RnsPoly<{}>[{form}; {} channels](",
            self.degree(),
            self.channel_count()
        )?;
        let preview = self.degree().min(3);
        for idx in 0..preview {
            if idx > 0 {
                write!(f, ", ")?;
            }
            let column: Vec<u64> = self.residues.iter().map(|c| c[idx]).collect();
            write!(f, "{column:?}")?;
        }
        if self.degree() > preview {
            write!(f, ", …")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::chain_primes;
    use crate::rings::RnsBasis;
    use rand::SeedableRng;

    const DEGREE: usize = 16;

    fn basis() -> RnsBasis {
        let primes = chain_primes(&[40, 30, 30], DEGREE as u64).unwrap();
        RnsBasis::new(&primes, DEGREE).unwrap()
    }

    fn signed(poly: &RnsPoly) -> Vec<i64> {
        // Single-channel view is enough for the small values used here.
        let mut copy = poly.clone();
        copy.to_coeff();
        let p = copy.moduli[0].prime();
        copy.residues[0]
            .iter()
            .map(|&r| if r > p / 2 { r as i64 - p as i64 } else { r as i64 })
            .collect()
    }

    #[test]
    fn constant_matches_coefficient_encoding() {
        let basis = basis();
        let moduli = basis.all_moduli();
        let mut coeffs = vec![0i64; DEGREE];
        coeffs[0] = -42;
        let mut expected = RnsPoly::from_signed(&coeffs, moduli);
        expected.to_ntt();
        let constant = RnsPoly::constant(-42, moduli);
        assert_eq!(constant.residues, expected.residues);
    }

    #[test]
    fn ntt_product_is_negacyclic() {
        let basis = basis();
        let moduli = basis.all_moduli();
        // X^(N-1) * X = X^N = -1
        let mut a = vec![0i64; DEGREE];
        a[DEGREE - 1] = 1;
        let mut b = vec![0i64; DEGREE];
        b[1] = 3;
        let mut pa = RnsPoly::from_signed(&a, moduli);
        let mut pb = RnsPoly::from_signed(&b, moduli);
        pa.to_ntt();
        pb.to_ntt();
        pa *= &pb;
        let coeffs = signed(&pa);
        assert_eq!(coeffs[0], -3);
        assert!(coeffs[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn add_sub_neg_are_consistent() {
        let basis = basis();
        let moduli = basis.all_moduli();
        let a: Vec<i64> = (0..DEGREE as i64).map(|i| i - 5).collect();
        let b: Vec<i64> = (0..DEGREE as i64).map(|i| 2 * i).collect();
        let pa = RnsPoly::from_signed(&a, moduli);
        let pb = RnsPoly::from_signed(&b, moduli);

        let mut diff = pa.clone();
        diff -= &pb;
        let mut back = diff.clone();
        back += &pb;
        assert_eq!(signed(&back), a);

        let negated = -diff;
        let expected: Vec<i64> = a.iter().zip(&b).map(|(x, y)| y - x).collect();
        assert_eq!(signed(&negated), expected);
    }

    #[test]
    fn divide_round_by_last_rounds_to_nearest() {
        let basis = basis();
        let moduli = basis.data_moduli(1);
        let q_last = moduli[1].prime() as i64;
        let mut coeffs = vec![0i64; DEGREE];
        coeffs[0] = 7 * q_last + q_last / 3; // rounds down to 7
        coeffs[1] = -5 * q_last - (2 * q_last) / 3; // rounds to -6
        coeffs[2] = 9;
        let mut poly = RnsPoly::from_signed(&coeffs, moduli);
        poly.to_ntt();
        poly.divide_round_by_last();
        assert!(poly.is_ntt_form());
        assert_eq!(poly.channel_count(), 1);
        let out = signed(&poly);
        assert_eq!(&out[..3], &[7, -6, 0]);
    }

    #[test]
    fn automorphism_of_constant_is_identity() {
        let basis = basis();
        let constant = RnsPoly::constant(1234, basis.all_moduli());
        let image = constant.automorphism(2 * DEGREE - 1);
        assert_eq!(image.residues, constant.residues);
    }

    #[test]
    fn automorphism_maps_monomials_with_sign() {
        let basis = basis();
        let mut coeffs = vec![0i64; DEGREE];
        coeffs[3] = 1;
        let poly = RnsPoly::from_signed(&coeffs, basis.all_moduli());
        // X^3 -> X^15 under k = 5
        let image = poly.automorphism(5);
        let out = signed(&image);
        assert_eq!(out[15], 1);
        // X^3 -> X^21 = -X^5 under k = 7
        let image = poly.automorphism(7);
        let out = signed(&image);
        assert_eq!(out[5], -1);
    }

    #[test]
    fn truncate_and_select_keep_residues() {
        let basis = basis();
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(5);
        let poly = RnsPoly::uniform(basis.all_moduli(), &mut rng);
        let picked = poly.select(&[0, 2]);
        assert_eq!(picked.channel(1), poly.channel(2));
        let mut short = poly.clone();
        short.truncate(2);
        assert_eq!(short.primes(), poly.primes()[..2].to_vec());
        assert_eq!(poly.prefix(2).residues, short.residues);
    }
}
