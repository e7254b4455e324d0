//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use colbridge::{Buffer, SharedBuffer};
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber driven by `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts live allocations and frees across every buffer built from one ledger.
#[derive(Default, Clone)]
pub struct Ledger {
    allocated: Arc<AtomicUsize>,
    freed: Arc<AtomicUsize>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn freed(&self) -> usize {
        self.freed.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.allocated() - self.freed()
    }

    /// An `i64` buffer whose storage reports its own drop to the ledger.
    pub fn i64_buffer(&self, values: &[i64]) -> Buffer<i64> {
        self.allocated.fetch_add(1, Ordering::SeqCst);
        let owner = Tracked {
            values: values.to_vec(),
            freed: Arc::clone(&self.freed),
        };
        Buffer::from_shared(SharedBuffer::from_owner(owner)).expect("Vec<i64> storage is aligned")
    }
}

/// Instrumented owner, counting its own drop.
struct Tracked {
    values: Vec<i64>,
    freed: Arc<AtomicUsize>,
}

impl AsRef<[u8]> for Tracked {
    fn as_ref(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(
                self.values.as_ptr() as *const u8,
                self.values.len() * size_of::<i64>(),
            )
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.freed.fetch_add(1, Ordering::SeqCst);
    }
}
