//! Post-order homomorphic evaluation of an expression tree.
//!
//! Literals are encrypted at the top level; `+`, `-` and `*` run on
//! ciphertexts only. Ciphertext-by-ciphertext division is not available in
//! CKKS, so `/` decrypts its divisor and multiplies the dividend by the
//! plaintext reciprocal. The divisor's value is therefore visible to whoever
//! holds the secret key during evaluation; the dividend never is.
//!
//! Every literal is plaintext to the evaluating party, so before anything is
//! encrypted the evaluator replays the tree in the clear and rejects any node
//! whose scaled value would wrap the modulus left at its level.

use crate::crypto::{CkksError, EncryptedValue, EncryptionContext};
use crate::error::{CalcError, CalcResult};
use crate::expr::{ExpressionNode, Operator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, instrument, warn};

/// Divisors with magnitude at or below this are treated as zero.
pub const DEFAULT_ZERO_TOLERANCE: f64 = 1e-6;

pub struct Evaluator<'ctx, R = ChaCha20Rng> {
    context: &'ctx EncryptionContext,
    rng: R,
    zero_tolerance: f64,
}

enum Frame<'a> {
    Visit(&'a ExpressionNode),
    Apply(Operator),
}

impl<'ctx> Evaluator<'ctx, ChaCha20Rng> {
    /// Evaluator with encryption randomness from OS entropy.
    pub fn new(context: &'ctx EncryptionContext) -> Self {
        Self::with_rng(context, ChaCha20Rng::from_os_rng())
    }
}

impl<'ctx, R: Rng> Evaluator<'ctx, R> {
    pub fn with_rng(context: &'ctx EncryptionContext, rng: R) -> Self {
        Self {
            context,
            rng,
            zero_tolerance: DEFAULT_ZERO_TOLERANCE,
        }
    }

    pub fn zero_tolerance(mut self, tolerance: f64) -> Self {
        self.zero_tolerance = tolerance.abs();
        self
    }

    pub fn context(&self) -> &'ctx EncryptionContext {
        self.context
    }

    /// Evaluates `node` bottom-up, left operand before right.
    ///
    /// Trees needing more rescales than the chain holds are rejected before
    /// any encryption happens.
    #[instrument(skip_all, fields(nodes = node.node_count()))]
    pub fn evaluate(&mut self, node: &ExpressionNode) -> CalcResult<EncryptedValue> {
        let required = node.multiplicative_depth();
        let available = self.context.multiplicative_depth();
        if required > available {
            debug!(required, available, "expression exceeds the modulus chain");
            return Err(CalcError::DepthExceeded { available });
        }
        self.check_magnitudes(node)?;

        let mut frames = vec![Frame::Visit(node)];
        let mut values: Vec<EncryptedValue> = Vec::new();
        while let Some(frame) = frames.pop() {
            match frame {
                Frame::Visit(ExpressionNode::Literal(value)) => {
                    values.push(self.encrypt(*value)?);
                }
                Frame::Visit(ExpressionNode::BinaryOp {
                    operator,
                    left,
                    right,
                }) => {
                    frames.push(Frame::Apply(*operator));
                    frames.push(Frame::Visit(right));
                    frames.push(Frame::Visit(left));
                }
                Frame::Apply(operator) => {
                    let (Some(right), Some(left)) = (values.pop(), values.pop()) else {
                        unreachable!("every operator follows its two operands");
                    };
                    values.push(self.apply(operator, &left, &right)?);
                }
            }
        }
        let Some(result) = values.pop() else {
            unreachable!("a tree evaluates to exactly one value");
        };
        Ok(result)
    }

    /// Tracks each node's plaintext value and ciphertext level, and fails with
    /// `ValueOutOfRange` where `|value| * scale` reaches half the remaining
    /// modulus `q_0 * ... * q_level`.
    ///
    /// Expects the depth check to have passed, so no level underflows.
    fn check_magnitudes(&self, node: &ExpressionNode) -> CalcResult<()> {
        let primes = self.context.primes();
        let scale = self.context.scale();
        let tolerance = self.zero_tolerance;
        let check = |value: f64, level: usize| -> CalcResult<(f64, usize)> {
            let modulus: f64 = primes[..=level].iter().map(|&q| q as f64).product();
            let half_modulus = modulus / 2.0;
            if value.is_finite() && value.abs() * scale >= half_modulus {
                debug!(value, level, "intermediate value exceeds the modulus");
                return Err(CkksError::ValueOutOfRange { value }.into());
            }
            Ok((value, level))
        };

        let top = self.context.max_level();
        node.try_fold(
            |value| Ok((value, top)),
            |operator, (l, l_level), (r, r_level)| match operator {
                Operator::Add => check(l + r, l_level.min(r_level)),
                Operator::Sub => check(l - r, l_level.min(r_level)),
                Operator::Mul => check(l * r, l_level.min(r_level).saturating_sub(1)),
                // a zero divisor is reported by the encrypted pass
                Operator::Div if r.abs() <= tolerance => {
                    Ok((f64::NAN, l_level.saturating_sub(1)))
                }
                Operator::Div => check(l / r, l_level.saturating_sub(1)),
            },
        )
        .map(|_| ())
    }

    pub fn encrypt(&mut self, value: f64) -> CalcResult<EncryptedValue> {
        Ok(self.context.encrypt(value, &mut self.rng)?)
    }

    /// Applies one operator to two encrypted operands.
    pub fn apply(
        &mut self,
        operator: Operator,
        left: &EncryptedValue,
        right: &EncryptedValue,
    ) -> CalcResult<EncryptedValue> {
        let ctx = self.context;
        let out = match operator {
            Operator::Add => ctx.add(left, right)?,
            Operator::Sub => ctx.sub(left, right)?,
            Operator::Mul => ctx.multiply(left, right)?,
            Operator::Div => self.divide(left, right)?,
        };
        debug!(%operator, level = out.level(), "applied");
        Ok(out)
    }

    fn divide(&self, left: &EncryptedValue, right: &EncryptedValue) -> CalcResult<EncryptedValue> {
        warn!(
            level = right.level(),
            "decrypting divisor: ciphertext division is unsupported"
        );
        let divisor = self.context.decrypt(right)?;
        if !divisor.is_finite() || divisor.abs() <= self.zero_tolerance {
            return Err(CalcError::DivisionByZero { divisor });
        }
        Ok(self.context.multiply_plain(left, divisor.recip())?)
    }
}

/// Evaluates `node` against `context` with a fresh evaluator.
pub fn evaluate(node: &ExpressionNode, context: &EncryptionContext) -> CalcResult<EncryptedValue> {
    Evaluator::new(context).evaluate(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{ContextBuilder, SecurityLevel};
    use crate::expr::parse;
    use approx::assert_relative_eq;

    fn toy_context() -> EncryptionContext {
        ContextBuilder::new()
            .poly_modulus_degree(64)
            .coeff_mod_bit_sizes(&[50, 30, 30, 50])
            .scale_bits(30)
            .security(SecurityLevel::None)
            .hamming_weight(16)
            .galois_keys(false)
            .build_with_seed(42)
            .unwrap()
    }

    fn run(ctx: &EncryptionContext, text: &str) -> CalcResult<f64> {
        let tree = parse(text).unwrap();
        let mut evaluator = Evaluator::with_rng(ctx, ChaCha20Rng::seed_from_u64(1));
        let value = evaluator.evaluate(&tree)?;
        Ok(ctx.decrypt(&value)?)
    }

    #[test]
    fn follows_operator_precedence() {
        let ctx = toy_context();
        assert_relative_eq!(run(&ctx, "2+3*4").unwrap(), 14.0, epsilon = 1e-3);
        assert_relative_eq!(run(&ctx, "(2+3)*4").unwrap(), 20.0, epsilon = 1e-3);
        assert_relative_eq!(run(&ctx, "10 - 4 - 3").unwrap(), 3.0, epsilon = 1e-3);
    }

    #[test]
    fn division_uses_decrypted_divisor() {
        let ctx = toy_context();
        assert_relative_eq!(run(&ctx, "7 / 2").unwrap(), 3.5, epsilon = 1e-3);
        assert_relative_eq!(run(&ctx, "1 / (1 + 2)").unwrap(), 1.0 / 3.0, epsilon = 1e-3);
        assert_relative_eq!(run(&ctx, "-9 / -4").unwrap(), 2.25, epsilon = 1e-3);
    }

    #[test]
    fn zero_divisor_is_rejected() {
        let ctx = toy_context();
        match run(&ctx, "5/(2-2)") {
            Err(CalcError::DivisionByZero { divisor }) => assert!(divisor.abs() <= 1e-6),
            other => panic!("expected DivisionByZero, got {other:?}"),
        }
    }

    #[test]
    fn custom_tolerance_widens_zero() {
        let ctx = toy_context();
        let tree = parse("1 / 0.01").unwrap();
        let mut evaluator =
            Evaluator::with_rng(&ctx, ChaCha20Rng::seed_from_u64(3)).zero_tolerance(0.1);
        assert!(matches!(
            evaluator.evaluate(&tree),
            Err(CalcError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn depth_is_checked_before_encryption() {
        let ctx = toy_context();
        assert!(matches!(
            run(&ctx, "2*3*4*5"),
            Err(CalcError::DepthExceeded { available: 2 })
        ));
        assert_relative_eq!(run(&ctx, "(2*3)*(4*5)").unwrap(), 120.0, epsilon = 1e-2);
    }

    #[test]
    fn apply_works_on_programmatic_operands() {
        let ctx = toy_context();
        let mut evaluator = Evaluator::with_rng(&ctx, ChaCha20Rng::seed_from_u64(5));
        let a = evaluator.encrypt(6.0).unwrap();
        let b = evaluator.encrypt(1.5).unwrap();
        let op = Operator::from_symbol('-').unwrap();
        let diff = evaluator.apply(op, &a, &b).unwrap();
        assert_relative_eq!(ctx.decrypt(&diff).unwrap(), 4.5, epsilon = 1e-3);
    }

    #[test]
    fn products_that_would_wrap_are_rejected() {
        let ctx = toy_context();
        // q_0 / 2 ~ 2^49 at scale 2^30 leaves about 5.2e5 at level 0
        assert_relative_eq!(run(&ctx, "1000 * 1000").unwrap(), 1e6, max_relative = 1e-3);
        for text in ["1000 * 1000 * 1", "800 * 800 / 1", "1000 * 1000 + 1 * 1 * 1"] {
            match run(&ctx, text) {
                Err(CalcError::Scheme(CkksError::ValueOutOfRange { value })) => {
                    assert!(value.abs() > 5e5, "{text}: {value}")
                }
                other => panic!("{text}: expected ValueOutOfRange, got {other:?}"),
            }
        }
        assert_relative_eq!(run(&ctx, "700 * 700 * 1").unwrap(), 490_000.0, max_relative = 1e-3);
    }

    #[test]
    fn near_zero_divisor_still_reports_division_by_zero() {
        let ctx = toy_context();
        assert!(matches!(
            run(&ctx, "(1000 * 1000) / 0.0000001"),
            Err(CalcError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn deep_programmatic_tree_is_rejected_without_recursion() {
        let ctx = toy_context();
        let mut tree = ExpressionNode::literal(1.0);
        for _ in 0..100_000 {
            tree = ExpressionNode::binary(Operator::Mul, tree, ExpressionNode::literal(1.0));
        }
        let mut evaluator = Evaluator::with_rng(&ctx, ChaCha20Rng::seed_from_u64(9));
        assert!(matches!(
            evaluator.evaluate(&tree),
            Err(CalcError::DepthExceeded { available: 2 })
        ));
    }
}
