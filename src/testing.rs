//! Testing utilities and mock implementations
//!
//! Mock collaborators for exercising the ring buffer on the host without a
//! DMA engine or cache hardware.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, RefCell};
use std::boxed::Box;
use std::vec::Vec;

use crate::cache::CacheMaintenance;
use crate::dma::DmaDevice;
use crate::error::{DeviceError, DeviceResult};

// =============================================================================
// Mock DMA Device
// =============================================================================

/// Mock DMA driver with a scriptable received length.
///
/// Optionally bound to the ring storage with [`attach_ring`](Self::attach_ring)
/// so [`land`](Self::land) can play the engine and write bytes at the
/// configured destination, wrapping at the end of storage.
///
/// [`interrupt_on_next_read`](Self::interrupt_on_next_read) runs a closure
/// the next time the buffer samples the received length, standing in for an
/// interrupt that fires in the middle of a read.
///
/// # Example
///
/// ```ignore
/// let device = MockDmaDevice::new();
/// rb.register_dma_device(&device, None)?;
/// rb.dma_configure(0x4000_0000, 8)?;
/// rb.dma_start()?;
/// device.set_received(8);
/// rb.dma_complete()?;
/// ```
#[derive(Debug, Default)]
pub struct MockDmaDevice {
    /// Storage (base address, length), if bound
    ring: Cell<Option<(usize, usize)>>,
    /// Absolute destination of the current transfer
    dest: Cell<usize>,
    /// Reported received length
    received: Cell<usize>,
    /// Record of configure calls: (source, dest, size)
    configured: RefCell<Vec<(usize, usize, usize)>>,
    starts: Cell<usize>,
    stops: Cell<usize>,
    /// One-shot failure statuses
    fail_configure: Cell<Option<i32>>,
    fail_start: Cell<Option<i32>>,
    fail_stop: Cell<Option<i32>>,
    /// Number of `received_len` calls
    reads: Cell<usize>,
    on_read: ReadHook,
}

/// One-shot closure run inside `received_len`
#[derive(Default)]
struct ReadHook(RefCell<Option<Box<dyn FnOnce()>>>);

impl core::fmt::Debug for ReadHook {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("ReadHook")
            .field(&self.0.borrow().is_some())
            .finish()
    }
}

impl MockDmaDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let [`land`](Self::land) write into the storage at `base` of `len`
    /// bytes. Take `base` from the ring (e.g. `dma_transfer().dest_address`
    /// right after registration) so writes go through the ring's pointer.
    pub fn attach_ring(&self, base: usize, len: usize) {
        self.ring.set(Some((base, len)));
    }

    /// Run `hook` at the start of the next `received_len` call.
    pub fn interrupt_on_next_read(&self, hook: impl FnOnce() + 'static) {
        *self.on_read.0.borrow_mut() = Some(Box::new(hook));
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn set_received(&self, len: usize) {
        self.received.set(len);
    }

    /// Write `bytes` after the data already landed in this transfer.
    pub fn land(&self, bytes: &[u8]) {
        let Some((base, len)) = self.ring.get() else {
            panic!("MockDmaDevice::land needs attach_ring");
        };

        let start = self.dest.get() - base;
        for (i, &byte) in bytes.iter().enumerate() {
            let offset = (start + self.received.get() + i) % len;
            // SAFETY: `base..base + len` is the storage the buffer handed us
            // through `configure`, and offsets stay below `len`.
            unsafe { core::ptr::write((base + offset) as *mut u8, byte) };
        }
        self.received.set(self.received.get() + bytes.len());
    }

    pub fn configured(&self) -> Vec<(usize, usize, usize)> {
        self.configured.borrow().clone()
    }

    pub fn starts(&self) -> usize {
        self.starts.get()
    }

    pub fn stops(&self) -> usize {
        self.stops.get()
    }

    pub fn fail_configure(&self, status: i32) {
        self.fail_configure.set(Some(status));
    }

    pub fn fail_start(&self, status: i32) {
        self.fail_start.set(Some(status));
    }

    pub fn fail_stop(&self, status: i32) {
        self.fail_stop.set(Some(status));
    }
}

impl DmaDevice for MockDmaDevice {
    fn configure(&self, source: usize, dest: usize, size: usize) -> DeviceResult<()> {
        if let Some(status) = self.fail_configure.take() {
            return Err(DeviceError::new(status));
        }
        self.configured.borrow_mut().push((source, dest, size));
        self.dest.set(dest);
        self.received.set(0);
        Ok(())
    }

    fn start(&self) -> DeviceResult<()> {
        if let Some(status) = self.fail_start.take() {
            return Err(DeviceError::new(status));
        }
        self.starts.set(self.starts.get() + 1);
        Ok(())
    }

    fn stop(&self) -> DeviceResult<()> {
        if let Some(status) = self.fail_stop.take() {
            return Err(DeviceError::new(status));
        }
        self.stops.set(self.stops.get() + 1);
        Ok(())
    }

    fn received_len(&self) -> usize {
        self.reads.set(self.reads.get() + 1);
        let hook = self.on_read.0.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
        self.received.get()
    }
}

// =============================================================================
// Mock Cache
// =============================================================================

/// Cache maintenance op recorded by [`MockCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Clean,
    Invalidate,
}

/// Records every maintenance call as (op, address, len).
#[derive(Debug, Default)]
pub struct MockCache {
    log: RefCell<Vec<(CacheOp, usize, usize)>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Vec<(CacheOp, usize, usize)> {
        self.log.borrow().clone()
    }

    /// Spans passed to `clean`, in call order
    pub fn cleaned(&self) -> Vec<(usize, usize)> {
        self.spans(CacheOp::Clean)
    }

    /// Spans passed to `invalidate`, in call order
    pub fn invalidated(&self) -> Vec<(usize, usize)> {
        self.spans(CacheOp::Invalidate)
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn spans(&self, op: CacheOp) -> Vec<(usize, usize)> {
        self.log
            .borrow()
            .iter()
            .filter(|(o, _, _)| *o == op)
            .map(|&(_, address, len)| (address, len))
            .collect()
    }
}

impl CacheMaintenance for MockCache {
    fn clean(&self, address: usize, len: usize) {
        self.log.borrow_mut().push((CacheOp::Clean, address, len));
    }

    fn invalidate(&self, address: usize, len: usize) {
        self.log
            .borrow_mut()
            .push((CacheOp::Invalidate, address, len));
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay for testing without actual timing
///
/// Records delays for verification without actually waiting.
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: Cell<u64>,
    calls: Cell<usize>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        self.total_ns.get()
    }

    /// Number of delay calls
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.set(self.total_ns.get() + u64::from(ns));
        self.calls.set(self.calls.get() + 1);
    }
}

// =============================================================================
// Wake Counter
// =============================================================================

/// Waker that counts how often it was woken.
#[cfg(feature = "async")]
#[derive(Debug, Default)]
pub struct WakeCounter {
    count: std::sync::atomic::AtomicUsize,
}

#[cfg(feature = "async")]
impl WakeCounter {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.count.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn waker(self: &std::sync::Arc<Self>) -> core::task::Waker {
        core::task::Waker::from(self.clone())
    }
}

#[cfg(feature = "async")]
impl std::task::Wake for WakeCounter {
    fn wake(self: std::sync::Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &std::sync::Arc<Self>) {
        self.count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_device_failures_are_one_shot() {
        let device = MockDmaDevice::new();
        device.fail_start(7);

        assert_eq!(device.start(), Err(DeviceError::new(7)));
        assert_eq!(device.start(), Ok(()));
        assert_eq!(device.starts(), 1);
    }

    #[test]
    fn configure_resets_received() {
        let device = MockDmaDevice::new();
        device.set_received(12);
        device.configure(0x10, 0x20, 16).unwrap();

        assert_eq!(device.received_len(), 0);
        assert_eq!(device.configured(), [(0x10, 0x20, 16)]);
    }

    #[test]
    fn land_wraps_inside_ring() {
        let mut storage = [0u8; 4];
        let device = MockDmaDevice::new();
        {
            let region = &mut storage[..];
            let base = region.as_mut_ptr() as usize;
            device.attach_ring(base, region.len());

            device.configure(0x10, base + 3, 3).unwrap();
            device.land(&[7, 8, 9]);
        }

        assert_eq!(device.received_len(), 3);
        assert_eq!(storage, [8, 9, 0, 7]);
    }

    #[test]
    fn read_hook_runs_once() {
        let device = MockDmaDevice::new();
        let fired = std::rc::Rc::new(Cell::new(0));
        let counter = std::rc::Rc::clone(&fired);
        device.interrupt_on_next_read(move || counter.set(counter.get() + 1));

        device.received_len();
        device.received_len();

        assert_eq!(fired.get(), 1);
        assert_eq!(device.reads(), 2);
    }

    #[test]
    fn mock_cache_splits_by_op() {
        let cache = MockCache::new();
        cache.clean(0x100, 4);
        cache.invalidate(0x200, 8);

        assert_eq!(cache.cleaned(), [(0x100, 4)]);
        assert_eq!(cache.invalidated(), [(0x200, 8)]);
        assert_eq!(cache.log().len(), 2);
    }
}
