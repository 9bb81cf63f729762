use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide monotonic nonce allocator.
///
/// Seeded from the wall clock in microseconds so nonces stay unique across
/// restarts without persistence.
#[derive(Debug)]
pub struct NonceAllocator {
    next: AtomicU64,
}

impl NonceAllocator {
    pub fn new() -> Self {
        let seed = chrono::Utc::now().timestamp_micros().max(1) as u64;
        Self::starting_at(seed)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for NonceAllocator {
    fn default() -> Self {
        Self::new()
    }
}
