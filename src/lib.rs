//! Arithmetic on encrypted real numbers with a leveled CKKS scheme.
//!
//! An expression such as `(2 + 3) * 4 / 5` is parsed into a tree, every
//! literal is encrypted, and the tree is evaluated on ciphertexts before the
//! root is decrypted and formatted.
//!
//! ```no_run
//! use he_calc::{Calculator, CalculatorConfig};
//!
//! let calculator = Calculator::new(CalculatorConfig::default());
//! println!("{}", calculator.evaluate("2 + 3 * 4"));
//! ```

pub mod calculator;
pub mod crypto;
pub mod error;
pub mod eval;
pub mod expr;
pub mod keys;
pub mod math;
pub mod rings;

pub use calculator::{AdditionReport, Calculator, CalculatorConfig, ConfigError};
pub use crypto::{
    CkksError, CkksResult, ContextBuilder, ContextParams, EncryptedValue, EncryptionContext,
    SecurityLevel,
};
pub use error::{CalcError, CalcResult, ErrorKind};
pub use eval::{
    ContextProvisioner, EvaluationResult, Evaluator, create_context, evaluate, finalize,
};
pub use expr::{ExpressionNode, Operator, ParseError, ParseLimits, parse, parse_with_limits};
