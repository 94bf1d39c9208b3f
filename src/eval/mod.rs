//! Request pipeline after parsing: context provisioning, homomorphic
//! evaluation and result finalization.

pub mod evaluator;
pub mod finalize;
pub mod provisioner;

pub use evaluator::{DEFAULT_ZERO_TOLERANCE, Evaluator, evaluate};
pub use finalize::{EvaluationResult, finalize, user_message};
pub use provisioner::{ContextProvisioner, create_context};
