//! Fixed-capacity SPSC byte ring buffer.
//!
//! # Ownership split
//!
//! | state | written by | guard |
//! |-------|-----------|-------|
//! | `tail`, produced total, DMA transfer | producer (CPU `put` or DMA events) | producer [`SideLock`] |
//! | `head`, consumed total | consumer (`get`/`peek`/`skip`) | consumer [`SideLock`] |
//! | storage binding, mode, device registration | administrative context | `&mut self` |
//!
//! Each side only *reads* the other side's cursor, so a producer in an
//! interrupt handler and a consumer in a thread need no shared mutex. In DMA
//! mode the consumer reads the running transfer the same way: it derives
//! the write position from the driver's received length without storing it.
//!
//! # Occupancy
//!
//! Occupancy is derived from the two cursors and one slot is always kept
//! free: [`available_to_read`](RingBuffer::available_to_read) +
//! [`available_to_write`](RingBuffer::available_to_write) is always
//! `capacity - 1`.

mod cursor;
mod lock;
mod storage;

pub use lock::{SideGuard, SideLock};

pub(crate) use cursor::{Span, WrapSpans, advance, occupied, vacant};
pub(crate) use storage::Storage;

use core::cmp::min;

use portable_atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::cache::{CacheMaintenance, NoCache};
use crate::config::{Mode, RingBufferConfig};
use crate::constants::RESERVED_SLOTS;
use crate::dma::{DmaChannel, DmaDevice, DmaState, DmaTransfer, NoDevice};
use crate::error::{Error, Result};
#[cfg(feature = "async")]
use crate::sync::AtomicWaker;

/// Byte ring buffer with CPU-copy and DMA-fed producer modes.
///
/// # Type Parameters
/// * `D` - DMA driver collaborator ([`NoDevice`] for CPU-only buffers)
/// * `C` - Cache maintenance collaborator ([`NoCache`] on coherent parts)
///
/// # Example
///
/// ```
/// use ph_ringbuf::RingBuffer;
///
/// let mut storage = [0u8; 16];
/// let rb: RingBuffer = RingBuffer::bind(&mut storage).unwrap();
///
/// assert_eq!(rb.put(&[1, 2, 3]).unwrap(), 3);
///
/// let mut out = [0u8; 8];
/// let n = rb.get(&mut out).unwrap();
/// assert_eq!(&out[..n], &[1, 2, 3]);
/// ```
pub struct RingBuffer<'a, D: DmaDevice = NoDevice, C: CacheMaintenance = NoCache> {
    pub(crate) storage: Option<Storage<'a>>,
    /// Read cursor (consumer-owned)
    pub(crate) head: AtomicUsize,
    /// Write cursor (producer-owned)
    pub(crate) tail: AtomicUsize,
    pub(crate) mode: Mode,
    pub(crate) config: RingBufferConfig,
    producer: SideLock,
    consumer: SideLock,
    pub(crate) total_produced: AtomicU64,
    total_consumed: AtomicU64,
    pub(crate) overflow_count: AtomicU64,
    pub(crate) dma: DmaChannel<D>,
    pub(crate) cache: Option<C>,
    #[cfg(feature = "async")]
    pub(crate) data_waker: AtomicWaker,
    #[cfg(feature = "async")]
    pub(crate) space_waker: AtomicWaker,
}

impl<'a, D: DmaDevice, C: CacheMaintenance> RingBuffer<'a, D, C> {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create an uninitialized buffer (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self::with_config(RingBufferConfig::new())
    }

    /// Create an uninitialized buffer with custom options.
    pub const fn with_config(config: RingBufferConfig) -> Self {
        Self {
            storage: None,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            mode: Mode::Uninitialized,
            config,
            producer: SideLock::new(),
            consumer: SideLock::new(),
            total_produced: AtomicU64::new(0),
            total_consumed: AtomicU64::new(0),
            overflow_count: AtomicU64::new(0),
            dma: DmaChannel::new(),
            cache: None,
            #[cfg(feature = "async")]
            data_waker: AtomicWaker::new(),
            #[cfg(feature = "async")]
            space_waker: AtomicWaker::new(),
        }
    }

    /// Create a buffer bound to caller-supplied storage.
    pub fn bind(storage: &'a mut [u8]) -> Result<Self> {
        let mut rb = Self::new();
        rb.init(storage)?;
        Ok(rb)
    }

    /// Bind caller-supplied storage; the capacity is `storage.len()`.
    ///
    /// Resets cursors and counters and enters [`Mode::CpuCopy`]. Fails with
    /// [`Error::InvalidArgument`] for regions shorter than
    /// [`MIN_CAPACITY`](crate::constants::MIN_CAPACITY) and with
    /// [`Error::InvalidState`] if storage is already bound.
    pub fn init(&mut self, storage: &'a mut [u8]) -> Result<()> {
        if self.storage.is_some() {
            return Err(Error::InvalidState);
        }
        self.attach_storage(Storage::borrowed(storage)?);
        Ok(())
    }

    /// Allocate `capacity` bytes of storage from the heap and bind it.
    #[cfg(feature = "alloc")]
    #[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
    pub fn create(&mut self, capacity: usize) -> Result<()> {
        if self.storage.is_some() {
            return Err(Error::InvalidState);
        }
        self.attach_storage(Storage::allocate(capacity)?);
        Ok(())
    }

    fn attach_storage(&mut self, storage: Storage<'a>) {
        self.storage = Some(storage);
        self.reset_counters();
        self.switch_mode(Mode::CpuCopy);

        #[cfg(feature = "defmt")]
        defmt::debug!("ring buffer bound, capacity {}", self.capacity());
    }

    /// Tear the buffer down.
    ///
    /// Unregisters any DMA device (stopping a running transfer), releases
    /// heap storage and resets every field. Also clears guards left held by
    /// misbehaving callers. The buffer must be re-initialized before use.
    pub fn deinit(&mut self) {
        let _ = self.unregister_dma_device();
        self.storage = None;
        self.cache = None;
        self.reset_counters();
        self.mode = Mode::Uninitialized;
    }

    fn reset_counters(&mut self) {
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
        *self.total_produced.get_mut() = 0;
        *self.total_consumed.get_mut() = 0;
        *self.overflow_count.get_mut() = 0;
        self.producer.reset();
        self.consumer.reset();
    }

    /// Switch transport mode. Switching to the current mode is a no-op.
    ///
    /// No transition is forbidden; operations check the mode they run in.
    pub fn switch_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("mode {} -> {}", self.mode, mode);

        self.mode = mode;
    }

    /// Install (or remove) the cache maintenance collaborator.
    pub fn set_cache_maintenance(&mut self, cache: Option<C>) {
        self.cache = cache;
    }

    /// Drop every unread byte. Returns the number of bytes dropped.
    ///
    /// The dropped bytes are counted as consumed.
    pub fn clear(&mut self) -> usize {
        let dropped = self.available_to_read();
        let capacity = self.capacity();
        if dropped == 0 {
            return 0;
        }

        let head = *self.head.get_mut();
        *self.total_consumed.get_mut() += dropped as u64;
        *self.head.get_mut() = advance(head, dropped, capacity);

        #[cfg(feature = "async")]
        self.space_waker.wake();

        dropped
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Size of the storage region (0 when uninitialized)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.as_ref().map_or(0, Storage::len)
    }

    /// Current transport mode
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Options this buffer was created with
    #[inline]
    pub fn config(&self) -> &RingBufferConfig {
        &self.config
    }

    /// Lifecycle state of the DMA transfer
    #[inline]
    pub fn dma_state(&self) -> DmaState {
        self.dma.state()
    }

    /// Parameters of the configured (or last configured) DMA transfer
    pub fn dma_transfer(&self) -> DmaTransfer {
        let base = self.storage.as_ref().map_or(0, |s| s.addr_of(0));
        self.dma.transfer(base)
    }

    /// Bytes ever accepted by the producer side.
    ///
    /// In DMA mode this includes what a running transfer has landed so far.
    pub fn total_produced(&self) -> u64 {
        if self.mode == Mode::DmaFed
            && let Some((_, produced)) = self.live_progress()
        {
            return produced;
        }
        self.total_produced.load(Ordering::Acquire)
    }

    /// Bytes ever handed to the consumer side
    #[inline]
    pub fn total_consumed(&self) -> u64 {
        self.total_consumed.load(Ordering::Acquire)
    }

    /// Times production was seen to outrun consumption by more than the capacity
    #[inline]
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Bytes a consumer may retrieve right now.
    ///
    /// In DMA mode a running transfer counts up to the driver's received
    /// length. The producer lock is never taken, so calling this from the
    /// consumer cannot hold off a completion interrupt.
    pub fn available_to_read(&self) -> usize {
        let Some(storage) = self.storage.as_ref() else {
            return 0;
        };

        let head = self.head.load(Ordering::Acquire);
        if self.mode == Mode::DmaFed {
            return self.dma_readable(head, storage.len());
        }

        occupied(head, self.tail.load(Ordering::Acquire), storage.len())
    }

    /// Alias of [`available_to_read`](Self::available_to_read)
    #[inline]
    pub fn len(&self) -> usize {
        self.available_to_read()
    }

    /// Bytes a producer may insert without overwriting unread data
    pub fn available_to_write(&self) -> usize {
        match self.storage.as_ref() {
            Some(storage) => storage.len() - RESERVED_SLOTS - self.available_to_read(),
            None => 0,
        }
    }

    /// Nothing to read
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available_to_read() == 0
    }

    /// No room to write
    #[inline]
    pub fn is_full(&self) -> bool {
        self.storage.is_some() && self.available_to_write() == 0
    }

    /// Readable length, re-probed when a DMA completion lands mid-read.
    ///
    /// Clears the completion flag, reads the length, and if a completion was
    /// processed meanwhile reads again, at most
    /// [`latest_len_probes`](RingBufferConfig::latest_len_probes) extra times.
    pub fn latest_len(&self) -> usize {
        self.dma.completed.store(false, Ordering::SeqCst);
        let mut len = self.available_to_read();
        for _ in 0..self.config.latest_len_probes {
            if !self.dma.completed.swap(false, Ordering::SeqCst) {
                break;
            }
            len = self.available_to_read();
        }
        len
    }

    /// Producer-side guard, for callers batching several producer calls
    #[inline]
    pub fn producer_lock(&self) -> &SideLock {
        &self.producer
    }

    /// Consumer-side guard, for callers batching several consumer calls
    #[inline]
    pub fn consumer_lock(&self) -> &SideLock {
        &self.consumer
    }

    // =========================================================================
    // Producer Side
    // =========================================================================

    /// Copy as much of `data` as fits. Returns the number of bytes written.
    ///
    /// A full buffer returns `Ok(0)`; callers loop until satisfied. Fails
    /// with [`Error::InvalidState`] outside [`Mode::CpuCopy`] (the write
    /// cursor belongs to the DMA engine in DMA mode).
    pub fn put(&self, data: &[u8]) -> Result<usize> {
        let storage = self.storage.as_ref().ok_or(Error::InvalidState)?;
        if self.mode != Mode::CpuCopy {
            return Err(Error::InvalidState);
        }
        if data.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let written = self.with_producer(|_| {
            let capacity = storage.len();
            let tail = self.tail.load(Ordering::Relaxed);
            let head = self.head.load(Ordering::Acquire);

            let len = min(data.len(), vacant(head, tail, capacity));
            if len == 0 {
                return 0;
            }

            let mut copied = 0;
            for span in WrapSpans::new(tail, len, capacity).iter() {
                // SAFETY: the span is inside storage and inside the vacant
                // region, which the consumer never reads.
                unsafe { storage.write(span.offset, &data[copied..copied + span.len]) };
                self.clean_span(storage, span);
                copied += span.len;
            }

            self.total_produced.fetch_add(len as u64, Ordering::Release);
            self.tail.store(advance(tail, len, capacity), Ordering::Release);
            len
        })?;

        #[cfg(feature = "async")]
        if written > 0 {
            self.data_waker.wake();
        }

        Ok(written)
    }

    /// Run `f` holding the producer lock, then run any completion that was
    /// deferred while the lock was held.
    pub(crate) fn with_producer<R>(&self, f: impl FnOnce(&SideGuard<'_>) -> R) -> Result<R> {
        let guard = self.producer.try_acquire()?;
        let out = f(&guard);
        drop(guard);
        self.drain_deferred_completion();
        Ok(out)
    }

    fn clean_span(&self, storage: &Storage<'a>, span: Span) {
        if let Some(cache) = self.cache.as_ref() {
            cache.clean(storage.addr_of(span.offset), span.len);
        }
    }

    // =========================================================================
    // Consumer Side
    // =========================================================================

    /// Copy up to `out.len()` bytes out. Returns the number of bytes read.
    ///
    /// An empty buffer returns `Ok(0)`. Allowed in both CPU and DMA mode.
    pub fn get(&self, out: &mut [u8]) -> Result<usize> {
        let storage = self.readable_storage()?;
        if out.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let _guard = self.consumer.try_acquire()?;
        let len = min(out.len(), self.readable_len());
        if len == 0 {
            return Ok(0);
        }

        let head = self.head.load(Ordering::Relaxed);
        self.copy_out(storage, head, &mut out[..len]);
        self.consume(head, len, storage.len());
        Ok(len)
    }

    /// Copy up to `out.len()` bytes out without consuming them.
    pub fn peek(&self, out: &mut [u8]) -> Result<usize> {
        let storage = self.readable_storage()?;
        if out.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let _guard = self.consumer.try_acquire()?;
        let len = min(out.len(), self.readable_len());
        if len > 0 {
            self.copy_out(storage, self.head.load(Ordering::Relaxed), &mut out[..len]);
        }
        Ok(len)
    }

    /// Discard up to `len` unread bytes. Returns the number discarded.
    pub fn skip(&self, len: usize) -> Result<usize> {
        let storage = self.readable_storage()?;
        if len == 0 {
            return Err(Error::InvalidArgument);
        }

        let _guard = self.consumer.try_acquire()?;
        let len = min(len, self.readable_len());
        if len > 0 {
            self.consume(self.head.load(Ordering::Relaxed), len, storage.len());
        }
        Ok(len)
    }

    fn readable_storage(&self) -> Result<&Storage<'a>> {
        match (self.storage.as_ref(), self.mode) {
            (Some(storage), Mode::CpuCopy | Mode::DmaFed) => Ok(storage),
            _ => Err(Error::InvalidState),
        }
    }

    fn readable_len(&self) -> usize {
        if self.mode == Mode::DmaFed {
            self.latest_len()
        } else {
            self.available_to_read()
        }
    }

    fn copy_out(&self, storage: &Storage<'a>, head: usize, out: &mut [u8]) {
        let mut copied = 0;
        for span in WrapSpans::new(head, out.len(), storage.len()).iter() {
            if let Some(cache) = self.cache.as_ref() {
                cache.invalidate(storage.addr_of(span.offset), span.len);
            }
            // SAFETY: the span is inside storage and inside the occupied
            // region published by the producer's release store of `tail`.
            unsafe { storage.read(span.offset, &mut out[copied..copied + span.len]) };
            copied += span.len;
        }
    }

    fn consume(&self, head: usize, len: usize, capacity: usize) {
        self.total_consumed.fetch_add(len as u64, Ordering::Release);
        self.head.store(advance(head, len, capacity), Ordering::Release);

        #[cfg(feature = "async")]
        self.space_waker.wake();
    }
}

impl<D: DmaDevice, C: CacheMaintenance> Default for RingBuffer<'_, D, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: DmaDevice, C: CacheMaintenance> Drop for RingBuffer<'_, D, C> {
    fn drop(&mut self) {
        // Never leave an engine writing into storage that is about to go away.
        if self.dma.state() == DmaState::Busy
            && let Some(device) = self.dma.device.as_ref()
        {
            let _ = device.stop();
        }
    }
}

impl<D: DmaDevice, C: CacheMaintenance> core::fmt::Debug for RingBuffer<'_, D, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("mode", &self.mode)
            .field("dma_state", &self.dma.state())
            .field("total_produced", &self.total_produced())
            .field("total_consumed", &self.total_consumed())
            .field("overflow_count", &self.overflow_count())
            .finish()
    }
}

// SAFETY: producer-side state is only mutated under the producer lock and
// consumer-side state under the consumer lock; the byte ranges each side
// touches (vacant vs occupied) are disjoint. Everything else is mutated
// through `&mut self`. Device and cache hooks are called from both sides,
// hence the `Sync` bounds.
unsafe impl<D: DmaDevice + Sync, C: CacheMaintenance + Sync> Sync for RingBuffer<'_, D, C> {}

// SAFETY: storage is either a `&mut [u8]` or a heap allocation owned by the
// buffer; both may move between threads.
unsafe impl<D: DmaDevice + Send, C: CacheMaintenance + Send> Send for RingBuffer<'_, D, C> {}

// =============================================================================
// Unit Tests
// =============================================================================
