//! Tracks not-yet-broadcast local GenCounts and hands out local-id mints (C3, C7).

use crate::error::{Error, Result};
use crate::types::{IdRange, MAX_SAFE_INTEGER};

/// Owns the two counters that define a session's local GenCount axis: how far
/// minting has progressed, and how much of that has already been taken for
/// broadcast.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeBuffer {
    next_local_gen_count: u64,
    last_taken_gen_count: u64,
}

impl RangeBuffer {
    /// Creates a fresh buffer with no ids minted yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a buffer from deserialized counters.
    pub fn from_parts(next_local_gen_count: u64, last_taken_gen_count: u64) -> Self {
        Self {
            next_local_gen_count,
            last_taken_gen_count,
        }
    }

    /// The highest GenCount minted so far (0 if none have been minted).
    pub fn next_local_gen_count(&self) -> u64 {
        self.next_local_gen_count
    }

    /// The highest GenCount already handed to `take_next_range`.
    pub fn last_taken_gen_count(&self) -> u64 {
        self.last_taken_gen_count
    }

    /// Mints the next GenCount, advancing the local generation counter.
    pub fn mint(&mut self) -> Result<u64> {
        let next = self
            .next_local_gen_count
            .checked_add(1)
            .filter(|g| *g <= MAX_SAFE_INTEGER)
            .ok_or_else(|| Error::overflow("local gen count exhausted"))?;
        self.next_local_gen_count = next;
        Ok(next)
    }

    /// Drains the pending `[last_taken_gen_count+1, next_local_gen_count]`
    /// interval, or returns `None` if there is nothing new.
    pub fn take_next_range(&mut self) -> Option<IdRange> {
        if self.last_taken_gen_count >= self.next_local_gen_count {
            return None;
        }
        let range = IdRange {
            first_gen_count: self.last_taken_gen_count + 1,
            last_gen_count: self.next_local_gen_count,
        };
        self.last_taken_gen_count = self.next_local_gen_count;
        Some(range)
    }
}
