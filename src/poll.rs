//! Blocking wait helpers
//!
//! The buffer never blocks. These helpers are the polling strategy for
//! callers that do want to wait: they sample the length every
//! [`DEFAULT_POLL_INTERVAL_US`] using an `embedded-hal` delay and give up
//! after a fixed number of polls.
//!
//! In DMA mode each length sample also refreshes the write cursor from the
//! driver, so a running transfer becomes visible while waiting.

use embedded_hal::delay::DelayNs;

use crate::buffer::RingBuffer;
use crate::cache::CacheMaintenance;
use crate::constants::DEFAULT_POLL_INTERVAL_US;
use crate::dma::DmaDevice;
use crate::error::{Error, Result};

/// Wait until at least `min_len` bytes are readable.
///
/// Returns the readable length once the threshold is met, or
/// [`Error::Timeout`] after `max_polls` delays. A `min_len` of zero is
/// treated as one.
///
/// # Example
///
/// ```ignore
/// let len = poll::wait_for_data(&rb, &mut delay, 64, 1000)?;
/// let n = rb.get(&mut frame[..len])?;
/// ```
pub fn wait_for_data<D, C, T>(
    rb: &RingBuffer<'_, D, C>,
    delay: &mut T,
    min_len: usize,
    max_polls: u32,
) -> Result<usize>
where
    D: DmaDevice,
    C: CacheMaintenance,
    T: DelayNs,
{
    wait_until(delay, max_polls, min_len.max(1), || rb.available_to_read())
}

/// Wait until at least `min_len` bytes can be written.
///
/// Fails immediately with [`Error::InvalidArgument`] if `min_len` can never
/// fit (larger than `capacity - 1`).
pub fn wait_for_space<D, C, T>(
    rb: &RingBuffer<'_, D, C>,
    delay: &mut T,
    min_len: usize,
    max_polls: u32,
) -> Result<usize>
where
    D: DmaDevice,
    C: CacheMaintenance,
    T: DelayNs,
{
    if min_len > rb.capacity().saturating_sub(crate::constants::RESERVED_SLOTS) {
        return Err(Error::InvalidArgument);
    }
    wait_until(delay, max_polls, min_len.max(1), || rb.available_to_write())
}

fn wait_until<T: DelayNs>(
    delay: &mut T,
    max_polls: u32,
    threshold: usize,
    mut sample: impl FnMut() -> usize,
) -> Result<usize> {
    for _ in 0..max_polls {
        let len = sample();
        if len >= threshold {
            return Ok(len);
        }
        delay.delay_us(DEFAULT_POLL_INTERVAL_US);
    }

    // One last look after the final delay.
    let len = sample();
    if len >= threshold {
        Ok(len)
    } else {
        Err(Error::Timeout)
    }
}

// =============================================================================
// Tests
// =============================================================================
