//! ISR-safe ring buffer wrapper using critical sections.
//!
//! Provides [`SharedRingBuffer`] for placing a buffer in a `static` and
//! running administrative calls (init, mode switch, device registration)
//! from any context.

use super::primitives::CriticalSectionCell;
use crate::buffer::RingBuffer;
use crate::cache::{CacheMaintenance, NoCache};
use crate::dma::{DmaDevice, NoDevice};

/// ISR-safe ring buffer wrapper using critical sections.
///
/// All access goes through `critical_section::with()`, disabling interrupts
/// for the duration of the closure. Hot-path producer/consumer calls take
/// `&self` on [`RingBuffer`] and can run inside the same closure.
///
/// # Example
///
/// ```ignore
/// static mut STORAGE: [u8; 256] = [0; 256];
/// static RB: SharedRingBuffer<'static> = SharedRingBuffer::new();
///
/// RB.with(|rb| rb.init(unsafe { &mut *core::ptr::addr_of_mut!(STORAGE) }))?;
///
/// #[interrupt]
/// fn UART_RX() {
///     RB.with(|rb| rb.put(&[read_byte()]).ok());
/// }
/// ```
pub struct SharedRingBuffer<'a, D: DmaDevice = NoDevice, C: CacheMaintenance = NoCache> {
    inner: CriticalSectionCell<RingBuffer<'a, D, C>>,
}

impl<'a, D: DmaDevice, C: CacheMaintenance> SharedRingBuffer<'a, D, C> {
    /// Create an uninitialized shared buffer (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(RingBuffer::new()),
        }
    }

    /// Wrap an existing buffer.
    pub const fn from_buffer(rb: RingBuffer<'a, D, C>) -> Self {
        Self {
            inner: CriticalSectionCell::new(rb),
        }
    }

    /// Execute a closure with exclusive access to the buffer.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut RingBuffer<'a, D, C>) -> R,
    {
        self.inner.with(f)
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut RingBuffer<'a, D, C>) -> R,
    {
        self.inner.try_with(f)
    }

    /// Readable length, sampled inside a critical section
    pub fn available_to_read(&self) -> usize {
        self.inner.with_ref(RingBuffer::available_to_read)
    }

    /// Writable length, sampled inside a critical section
    pub fn available_to_write(&self) -> usize {
        self.inner.with_ref(RingBuffer::available_to_write)
    }
}

impl<D: DmaDevice, C: CacheMaintenance> Default for SharedRingBuffer<'_, D, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    #[test]
    fn static_shared_buffer_starts_uninitialized() {
        static SHARED: SharedRingBuffer<'static> = SharedRingBuffer::new();

        assert_eq!(SHARED.with(|rb| rb.mode()), Mode::Uninitialized);
        assert_eq!(SHARED.available_to_read(), 0);
    }

    #[test]
    fn with_allows_admin_calls() {
        let mut storage = [0u8; 16];
        let shared: SharedRingBuffer<'_> = SharedRingBuffer::new();

        shared.with(|rb| rb.init(&mut storage)).unwrap();
        assert_eq!(shared.with(|rb| rb.put(&[1, 2, 3])), Ok(3));
        assert_eq!(shared.available_to_read(), 3);
        assert_eq!(shared.available_to_write(), 12);
    }

    #[test]
    fn try_with_fails_when_nested() {
        let shared: SharedRingBuffer<'_> = SharedRingBuffer::default();
        let nested = shared.with(|_| shared.try_with(|rb| rb.capacity()));
        assert_eq!(nested, None);
        assert_eq!(shared.try_with(|rb| rb.capacity()), Some(0));
    }

    #[test]
    fn from_buffer_keeps_contents() {
        let mut storage = [0u8; 8];
        let rb: RingBuffer<'_> = RingBuffer::bind(&mut storage).unwrap();
        rb.put(&[5, 6]).unwrap();

        let shared = SharedRingBuffer::from_buffer(rb);
        let mut out = [0u8; 4];
        assert_eq!(shared.with(|rb| rb.get(&mut out)), Ok(2));
        assert_eq!(&out[..2], &[5, 6]);
        assert_eq!(
            shared.with(|rb| rb.get(&mut out)),
            Ok(0),
            "drained buffer reads nothing"
        );
    }
}
