//! Configuration types for the ring buffer

use crate::constants::{DEFAULT_LATEST_LEN_PROBES, MAX_LATEST_LEN_PROBES};

/// Transport mode of a ring buffer
///
/// Any mode may switch to any other; operations check the current mode and
/// reject calls that do not match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// No storage bound
    #[default]
    Uninitialized,
    /// Producer copies bytes in with `put`
    CpuCopy,
    /// A DMA engine writes bytes in; `put` is rejected
    DmaFed,
}

/// Runtime options for a [`RingBuffer`](crate::RingBuffer).
///
/// # Example
///
/// ```
/// use ph_ringbuf::RingBufferConfig;
///
/// let config = RingBufferConfig::new()
///     .with_overflow_tracking(false)
///     .with_latest_len_probes(2);
/// assert!(!config.overflow_tracking);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingBufferConfig {
    /// Count overruns detected at DMA stop/complete boundaries
    pub overflow_tracking: bool,
    /// Extra length probes `get()` makes in DMA mode when a completion
    /// lands during the length read
    pub latest_len_probes: u8,
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RingBufferConfig {
    /// Create a configuration with default values
    #[must_use]
    pub const fn new() -> Self {
        Self {
            overflow_tracking: true,
            latest_len_probes: DEFAULT_LATEST_LEN_PROBES,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Enable or disable overflow accounting
    #[must_use]
    pub const fn with_overflow_tracking(mut self, enabled: bool) -> Self {
        self.overflow_tracking = enabled;
        self
    }

    /// Set the number of extra latest-length probes (clamped to
    /// [`MAX_LATEST_LEN_PROBES`])
    #[must_use]
    pub const fn with_latest_len_probes(mut self, probes: u8) -> Self {
        self.latest_len_probes = if probes > MAX_LATEST_LEN_PROBES {
            MAX_LATEST_LEN_PROBES
        } else {
            probes
        };
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
