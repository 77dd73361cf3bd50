//! Centralized Constants
//!
//! Single source of truth for the sizing and polling numbers used by the
//! ring buffer.

// =============================================================================
// Capacity
// =============================================================================

/// Slots kept free so that `head == tail` always means "empty"
pub const RESERVED_SLOTS: usize = 1;

/// Smallest capacity that can hold at least one byte
pub const MIN_CAPACITY: usize = RESERVED_SLOTS + 1;

// =============================================================================
// Latest-Length Probing
// =============================================================================

/// Extra length probes `get()` performs when a DMA completion races the read
pub const DEFAULT_LATEST_LEN_PROBES: u8 = 1;

/// Upper bound for [`DEFAULT_LATEST_LEN_PROBES`] overrides
pub const MAX_LATEST_LEN_PROBES: u8 = 8;

/// Attempts a lock-free reader makes to sample a running DMA transfer before
/// falling back to the last published write cursor
pub const DMA_SAMPLE_ATTEMPTS: usize = 2;

// =============================================================================
// Polling Helpers
// =============================================================================

/// Interval between polls in the `DelayNs` based wait helpers
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;
