//! Memory accounting for engine handles.

use crate::error::EngineError;

/// Grow-only memory accountant of one engine handle.
///
/// Reservations are never returned individually; the whole arena is released
/// when the owning handle is dropped. A long-lived handle therefore fills up
/// over time, and only a fresh handle starts empty again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaBudget {
    limit: usize,
    used: usize,
}

impl ArenaBudget {
    /// Creates an empty arena limited to `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    /// Reserves `bytes` for the lifetime of the arena.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MemoryExhausted`] when the reservation does not
    /// fit; nothing is reserved in that case.
    pub fn reserve(&mut self, bytes: usize) -> Result<(), EngineError> {
        let required = self.used.saturating_add(bytes);
        if required > self.limit {
            return Err(EngineError::MemoryExhausted {
                budget: self.limit,
                required,
            });
        }
        self.used = required;
        Ok(())
    }
}
