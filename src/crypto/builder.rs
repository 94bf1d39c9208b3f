use super::{CkksResult, ContextParams, EncryptionContext, SecurityLevel};

/// Fluent construction of an [`EncryptionContext`]; unset fields keep the
/// defaults of [`ContextParams`].
#[derive(Debug, Default)]
pub struct ContextBuilder {
    poly_modulus_degree: Option<usize>,
    coeff_mod_bit_sizes: Option<Vec<u32>>,
    scale_bits: Option<u32>,
    security: Option<SecurityLevel>,
    hamming_weight: Option<usize>,
    error_std: Option<f64>,
    galois_keys: Option<bool>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poly_modulus_degree(mut self, degree: usize) -> Self {
        self.poly_modulus_degree = Some(degree);
        self
    }

    pub fn coeff_mod_bit_sizes(mut self, bits: &[u32]) -> Self {
        self.coeff_mod_bit_sizes = Some(bits.to_vec());
        self
    }

    pub fn scale_bits(mut self, scale_bits: u32) -> Self {
        self.scale_bits = Some(scale_bits);
        self
    }

    pub fn security(mut self, level: SecurityLevel) -> Self {
        self.security = Some(level);
        self
    }

    pub fn hamming_weight(mut self, weight: usize) -> Self {
        self.hamming_weight = Some(weight);
        self
    }

    pub fn error_std(mut self, std_dev: f64) -> Self {
        self.error_std = Some(std_dev);
        self
    }

    pub fn galois_keys(mut self, enabled: bool) -> Self {
        self.galois_keys = Some(enabled);
        self
    }

    pub fn params(self) -> ContextParams {
        let defaults = ContextParams::default();
        ContextParams {
            poly_modulus_degree: self
                .poly_modulus_degree
                .unwrap_or(defaults.poly_modulus_degree),
            coeff_mod_bit_sizes: self
                .coeff_mod_bit_sizes
                .unwrap_or(defaults.coeff_mod_bit_sizes),
            scale_bits: self.scale_bits.unwrap_or(defaults.scale_bits),
            security: self.security.unwrap_or(defaults.security),
            hamming_weight: self.hamming_weight.or(defaults.hamming_weight),
            error_std: self.error_std.unwrap_or(defaults.error_std),
            galois_keys: self.galois_keys.unwrap_or(defaults.galois_keys),
        }
    }

    pub fn build(self) -> CkksResult<EncryptionContext> {
        EncryptionContext::new(self.params())
    }

    pub fn build_with_seed(self, seed: u64) -> CkksResult<EncryptionContext> {
        EncryptionContext::from_seed(self.params(), seed)
    }
}
