//! Thread-safe handle to a [`Chain`].

use std::sync::Arc;

use parking_lot::Mutex;

use depot_core::Address;

use crate::call::{Call, Receipt};
use crate::chain::Chain;
use crate::error::CustodyError;
use crate::snapshot::Snapshot;

/// Cloneable handle that serializes access to one chain.
///
/// Each call holds the lock for its whole duration, so calls from
/// different threads never interleave.
#[derive(Clone)]
pub struct SharedChain {
    inner: Arc<Mutex<Chain>>,
}

impl SharedChain {
    pub fn new(chain: Chain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    /// Run `f` with exclusive access to the chain.
    pub fn with<R>(&self, f: impl FnOnce(&mut Chain) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn execute(&self, caller: &Address, call: &Call) -> Result<Receipt, CustodyError> {
        self.inner.lock().execute(caller, call)
    }

    pub fn balance(&self, account: &Address) -> u64 {
        self.inner.lock().balance(account)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().snapshot()
    }
}

impl From<Chain> for SharedChain {
    fn from(chain: Chain) -> Self {
        Self::new(chain)
    }
}
