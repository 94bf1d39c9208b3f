#![allow(dead_code)]

use he_calc::{CalculatorConfig, ContextParams, EncryptionContext, SecurityLevel};
use std::sync::OnceLock;

/// Reference chain `[60, 40, 40, 60]` at scale 2^40 on a small ring.
pub fn toy_params() -> ContextParams {
    ContextParams {
        poly_modulus_degree: 1_024,
        coeff_mod_bit_sizes: vec![60, 40, 40, 60],
        scale_bits: 40,
        security: SecurityLevel::None,
        galois_keys: false,
        ..ContextParams::default()
    }
}

pub fn toy_config() -> CalculatorConfig {
    CalculatorConfig {
        context: toy_params(),
        ..CalculatorConfig::default()
    }
}

/// One context per test binary; key generation is the slow part.
pub fn shared_context() -> &'static EncryptionContext {
    static CONTEXT: OnceLock<EncryptionContext> = OnceLock::new();
    CONTEXT.get_or_init(|| EncryptionContext::from_seed(toy_params(), 2024).unwrap())
}

pub fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= 1e-3 * expected.abs().max(1.0)
}
