use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one request. Zero means "unset" and is never a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(NonZeroU64);

impl RequestId {
    /// Returns `None` for zero.
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Parse a wire `id` attribute. Rejects zero, signs and surrounding space.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse::<u64>().ok().and_then(Self::new)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues request ids for one channel: 1, 2, 3, ...
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Start issuing from `first` (which must be non-zero).
    pub fn starting_at(first: RequestId) -> Self {
        Self {
            next: AtomicU64::new(first.get()),
        }
    }

    /// Next unused id.
    ///
    /// # Panics
    ///
    /// Panics once the id space is exhausted.
    pub fn next_id(&self) -> RequestId {
        let value = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(1)
            })
            .unwrap_or_else(|_| panic!("request id space exhausted"));
        RequestId::new(value).unwrap_or_else(|| panic!("request id counter wrapped to zero"))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
