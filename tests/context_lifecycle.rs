mod common;

use approx::assert_relative_eq;
use common::{shared_context, toy_params};
use he_calc::{
    CalcError, CkksError, ContextBuilder, ContextProvisioner, ContextParams, ErrorKind,
    Evaluator, SecurityLevel, parse,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;

#[test]
fn provisioner_reuses_one_context_until_teardown() {
    let provisioner = ContextProvisioner::with_seed(toy_params(), 3);
    let first = provisioner.acquire().unwrap();
    let again = provisioner.acquire().unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(provisioner.creations(), 1);

    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let stale = first.encrypt(4.0, &mut rng).unwrap();

    assert!(provisioner.teardown());
    assert!(!provisioner.is_active());
    let fresh = provisioner.acquire().unwrap();
    assert_ne!(first.id(), fresh.id());

    // a handle taken before teardown still works for its own ciphertexts
    assert_relative_eq!(first.decrypt(&stale).unwrap(), 4.0, epsilon = 1e-6);
    assert!(matches!(
        fresh.decrypt(&stale),
        Err(CkksError::ContextMismatch { .. })
    ));
}

#[test]
fn ciphertexts_survive_serialization() {
    let ctx = shared_context();
    let mut evaluator = Evaluator::with_rng(ctx, ChaCha20Rng::seed_from_u64(11));
    let product = evaluator.evaluate(&parse("1.25 * 8").unwrap()).unwrap();
    assert_eq!(product.level(), ctx.max_level() - 1);

    let bytes = product.to_bytes().unwrap();
    assert_eq!(bytes.len(), product.serialized_len().unwrap());
    let restored = ctx.load(&bytes).unwrap();
    assert_eq!(restored.level(), product.level());
    assert_relative_eq!(ctx.decrypt(&restored).unwrap(), 10.0, epsilon = 1e-4);

    assert!(matches!(
        ctx.load(&bytes[..bytes.len() / 2]),
        Err(CkksError::Serialization(_))
    ));

    let other = ContextBuilder::new()
        .poly_modulus_degree(1_024)
        .security(SecurityLevel::None)
        .galois_keys(false)
        .build_with_seed(99)
        .unwrap();
    assert!(matches!(
        other.load(&bytes),
        Err(CkksError::ContextMismatch { .. })
    ));
}

#[test]
fn galois_automorphisms_fix_a_scalar() {
    let ctx = ContextBuilder::new()
        .poly_modulus_degree(256)
        .coeff_mod_bit_sizes(&[50, 30, 50])
        .scale_bits(30)
        .security(SecurityLevel::None)
        .galois_keys(true)
        .build_with_seed(8)
        .unwrap();
    let keys = ctx.galois_keys().unwrap();
    // steps 1, 2, 4, ..., 64 plus conjugation
    assert_eq!(keys.len(), 8);

    let mut rng = ChaCha20Rng::seed_from_u64(21);
    let value = ctx.encrypt(-3.5, &mut rng).unwrap();
    let conjugated = ctx.conjugate(&value).unwrap();
    assert_relative_eq!(ctx.decrypt(&conjugated).unwrap(), -3.5, epsilon = 1e-3);

    for element in keys.elements() {
        let rotated = ctx.apply_galois(&value, element).unwrap();
        assert_relative_eq!(ctx.decrypt(&rotated).unwrap(), -3.5, epsilon = 1e-3);
    }
    assert!(matches!(
        ctx.apply_galois(&value, 3),
        Err(CkksError::MissingGaloisKey { element: 3 })
    ));

    let missing = shared_context().encrypt(1.0, &mut rng).unwrap();
    assert!(matches!(
        shared_context().conjugate(&missing),
        Err(CkksError::MissingGaloisKey { .. })
    ));
}

#[test]
fn invalid_parameters_are_rejected_before_key_generation() {
    let cases = [
        ContextParams {
            poly_modulus_degree: 1_000,
            ..toy_params()
        },
        ContextParams {
            coeff_mod_bit_sizes: vec![60],
            ..toy_params()
        },
        ContextParams {
            scale_bits: 60,
            ..toy_params()
        },
        ContextParams {
            coeff_mod_bit_sizes: vec![60, 40, 40, 30],
            ..toy_params()
        },
        ContextParams {
            hamming_weight: Some(0),
            ..toy_params()
        },
    ];
    for params in cases {
        assert!(
            matches!(params.validate(), Err(CkksError::InvalidParameter { .. })),
            "{params:?}"
        );
    }

    let insecure = ContextParams {
        security: SecurityLevel::Tc128,
        ..toy_params()
    };
    assert!(matches!(
        insecure.validate(),
        Err(CkksError::InsecureParameters { max_bits: 27, .. })
    ));

    let provisioner = ContextProvisioner::new(insecure);
    let err = provisioner.acquire().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContextCreation);
    assert!(matches!(err, CalcError::ContextCreation(_)));
}

#[test]
fn exhausted_chain_reports_depth() {
    let ctx = shared_context();
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    let two = ctx.encrypt(2.0, &mut rng).unwrap();
    let four = ctx.multiply(&two, &two).unwrap();
    let eight = ctx.multiply(&four, &two).unwrap();
    assert_eq!(eight.level(), 0);
    assert_relative_eq!(ctx.decrypt(&eight).unwrap(), 8.0, epsilon = 1e-3);

    let err: CalcError = ctx.multiply(&eight, &two).unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::DepthExceeded);
}
