//! Context creation and the reusable-context lifecycle.

use crate::crypto::{CkksResult, ContextParams, EncryptionContext};
use crate::error::{CalcError, CalcResult};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};
use tracing::info;

/// Validates `params`, searches the prime chain and generates all keys.
pub fn create_context(params: ContextParams) -> CkksResult<EncryptionContext> {
    EncryptionContext::new(params)
}

/// Holds at most one live context and hands out shared handles to it.
///
/// Key generation dominates the cost of a request, so the context is built
/// on the first [`acquire`](Self::acquire) and reused until
/// [`teardown`](Self::teardown). Creation runs under the lock: concurrent
/// first callers wait for one build instead of racing.
pub struct ContextProvisioner {
    params: ContextParams,
    seed: Option<u64>,
    slot: Mutex<Option<Arc<EncryptionContext>>>,
    creations: AtomicUsize,
}

impl ContextProvisioner {
    pub fn new(params: ContextParams) -> Self {
        Self {
            params,
            seed: None,
            slot: Mutex::new(None),
            creations: AtomicUsize::new(0),
        }
    }

    /// Builds every context from `seed`; for reproducible tests.
    pub fn with_seed(params: ContextParams, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new(params)
        }
    }

    pub fn params(&self) -> &ContextParams {
        &self.params
    }

    pub fn acquire(&self) -> CalcResult<Arc<EncryptionContext>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(context) = slot.as_ref() {
            return Ok(Arc::clone(context));
        }

        let built = match self.seed {
            Some(seed) => EncryptionContext::from_seed(self.params.clone(), seed),
            None => create_context(self.params.clone()),
        }
        .map_err(CalcError::ContextCreation)?;
        let context = Arc::new(built);
        let count = self.creations.fetch_add(1, Ordering::Relaxed) + 1;
        info!(id = context.id(), creations = count, "context provisioned");
        *slot = Some(Arc::clone(&context));
        Ok(context)
    }

    /// Drops the held context; returns whether one was live.
    ///
    /// Handles already given out stay valid until their holders drop them.
    pub fn teardown(&self) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let released = slot.take();
        if let Some(context) = &released {
            info!(id = context.id(), "context released");
        }
        released.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of contexts built so far.
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::Relaxed)
    }
}
