//! Request-level facade: text in, formatted result out.

use crate::crypto::{ContextParams, EncryptionContext};
use crate::error::{CalcError, CalcResult};
use crate::eval::{
    ContextProvisioner, DEFAULT_ZERO_TOLERANCE, EvaluationResult, Evaluator, finalize,
};
use crate::expr::{ExpressionNode, Operator, ParseLimits, parse_with_limits};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub context: ContextParams,
    pub zero_tolerance: f64,
    pub limits: ParseLimits,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            context: ContextParams::default(),
            zero_tolerance: DEFAULT_ZERO_TOLERANCE,
            limits: ParseLimits::default(),
        }
    }
}

impl CalculatorConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// Outcome of the two-number addition mode.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditionReport {
    /// Serialized ciphertext sizes of both operands, when encryption succeeded.
    pub operand_bytes: Option<(usize, usize)>,
    pub result: EvaluationResult,
}

pub struct Calculator {
    config: CalculatorConfig,
    provisioner: ContextProvisioner,
    seed: Option<u64>,
    requests: AtomicU64,
}

impl Calculator {
    pub fn new(config: CalculatorConfig) -> Self {
        Self {
            provisioner: ContextProvisioner::new(config.context.clone()),
            config,
            seed: None,
            requests: AtomicU64::new(0),
        }
    }

    /// Deterministic keys and encryption randomness, for tests.
    pub fn with_seed(config: CalculatorConfig, seed: u64) -> Self {
        Self {
            provisioner: ContextProvisioner::with_seed(config.context.clone(), seed),
            config,
            seed: Some(seed),
            requests: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// Shared context, built on first use.
    pub fn context(&self) -> CalcResult<Arc<EncryptionContext>> {
        self.provisioner.acquire()
    }

    pub fn provisioner(&self) -> &ContextProvisioner {
        &self.provisioner
    }

    /// Parses and evaluates `text`. Parse errors never touch the context.
    #[instrument(skip_all, fields(len = text.len()))]
    pub fn evaluate(&self, text: &str) -> EvaluationResult {
        match parse_with_limits(text, self.config.limits) {
            Ok(tree) => self.evaluate_tree(&tree),
            Err(err) => EvaluationResult::from_error(&CalcError::Parse(err)),
        }
    }

    pub fn evaluate_tree(&self, tree: &ExpressionNode) -> EvaluationResult {
        let context = match self.context() {
            Ok(context) => context,
            Err(err) => return EvaluationResult::from_error(&err),
        };
        let outcome = self.evaluator(&context).evaluate(tree);
        let result = finalize(&context, outcome);
        debug!(success = result.is_success(), "request finished");
        result
    }

    /// Encrypts `a` and `b`, reports their ciphertext sizes and adds them.
    pub fn add(&self, a: f64, b: f64) -> AdditionReport {
        let context = match self.context() {
            Ok(context) => context,
            Err(err) => {
                return AdditionReport {
                    operand_bytes: None,
                    result: EvaluationResult::from_error(&err),
                };
            }
        };
        let mut evaluator = self.evaluator(&context);

        let operands = evaluator.encrypt(a).and_then(|left| {
            let right = evaluator.encrypt(b)?;
            let sizes = (left.serialized_len()?, right.serialized_len()?);
            Ok((left, right, sizes))
        });
        let (left, right, sizes) = match operands {
            Ok(operands) => operands,
            Err(err) => {
                return AdditionReport {
                    operand_bytes: None,
                    result: EvaluationResult::from_error(&err),
                };
            }
        };

        let outcome = evaluator.apply(Operator::Add, &left, &right);
        AdditionReport {
            operand_bytes: Some(sizes),
            result: finalize(&context, outcome),
        }
    }

    /// Releases the shared context; the next request rebuilds it.
    pub fn teardown(&self) -> bool {
        self.provisioner.teardown()
    }

    fn evaluator<'ctx>(&self, context: &'ctx EncryptionContext) -> Evaluator<'ctx> {
        let request = self.requests.fetch_add(1, Ordering::Relaxed);
        let rng = match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed ^ request.rotate_left(32)),
            None => ChaCha20Rng::from_os_rng(),
        };
        Evaluator::with_rng(context, rng).zero_tolerance(self.config.zero_tolerance)
    }
}
