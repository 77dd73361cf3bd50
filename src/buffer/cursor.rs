//! Cursor arithmetic with wraparound.
//!
//! Pure functions of `head`, `tail` and `capacity`. One slot is always kept
//! free, so `head == tail` means empty and the largest occupancy is
//! `capacity - 1`.

use crate::constants::RESERVED_SLOTS;

/// Bytes between `head` and `tail`
#[inline(always)]
pub(crate) const fn occupied(head: usize, tail: usize, capacity: usize) -> usize {
    (tail + capacity - head) % capacity
}

/// Bytes a producer may add without overwriting unread data
#[inline(always)]
pub(crate) const fn vacant(head: usize, tail: usize, capacity: usize) -> usize {
    capacity - RESERVED_SLOTS - occupied(head, tail, capacity)
}

/// Advance a cursor by `n`, wrapping around
#[inline(always)]
pub(crate) const fn advance(cursor: usize, n: usize, capacity: usize) -> usize {
    (cursor + n) % capacity
}

/// Contiguous run of bytes inside the storage region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    /// Offset from the start of storage
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

/// A run of `len` bytes starting at a cursor, split at the end of storage.
///
/// `first` is `[start, min(start + len, capacity))`, `second` is the
/// remainder starting at offset 0 and is empty when no wrap happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WrapSpans {
    first: Span,
    second: Span,
}

impl WrapSpans {
    /// Split `len` bytes from `start`. `len` must not exceed `capacity`.
    pub(crate) const fn new(start: usize, len: usize, capacity: usize) -> Self {
        let until_end = capacity - start;
        if len <= until_end {
            Self {
                first: Span { offset: start, len },
                second: Span { offset: 0, len: 0 },
            }
        } else {
            Self {
                first: Span {
                    offset: start,
                    len: until_end,
                },
                second: Span {
                    offset: 0,
                    len: len - until_end,
                },
            }
        }
    }

    /// Whether the run crosses the end of storage
    pub(crate) const fn wraps(&self) -> bool {
        self.second.len != 0
    }

    /// Non-empty spans in copy order
    pub(crate) fn iter(&self) -> impl Iterator<Item = Span> {
        [self.first, self.second]
            .into_iter()
            .filter(|span| span.len != 0)
    }
}

// =============================================================================
// Tests
// =============================================================================
