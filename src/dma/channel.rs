//! Per-buffer DMA bookkeeping.

use portable_atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering, fence};

use super::{DmaState, DmaTransfer};
use crate::constants::DMA_SAMPLE_ATTEMPTS;

/// Device handle plus the parameters of the current transfer.
///
/// Fields are written by the producer side only, under the producer lock,
/// inside [`update`](Self::update). Consumers read them lock-free through
/// [`sample`](Self::sample), which retries when an update overlaps the read.
pub(crate) struct DmaChannel<D> {
    pub(crate) device: Option<D>,
    state: AtomicU8,
    source: AtomicUsize,
    dest_offset: AtomicUsize,
    block_size: AtomicUsize,
    /// Bytes of the current block already added to the produced total
    credited: AtomicUsize,
    /// A completion arrived while the producer lock was held elsewhere
    pub(crate) completion_pending: AtomicBool,
    /// Set on every processed completion; cleared by latest-length probing
    pub(crate) completed: AtomicBool,
    /// Odd while an update is in progress
    seq: AtomicUsize,
}

impl<D> DmaChannel<D> {
    pub(crate) const fn new() -> Self {
        Self {
            device: None,
            state: AtomicU8::new(DmaState::Error as u8),
            source: AtomicUsize::new(0),
            dest_offset: AtomicUsize::new(0),
            block_size: AtomicUsize::new(0),
            credited: AtomicUsize::new(0),
            completion_pending: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            seq: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> DmaState {
        DmaState::from_raw(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_state(&self, state: DmaState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Attach a device with the write position at `dest_offset`.
    pub(crate) fn attach(&mut self, device: D, dest_offset: usize) {
        self.reset();
        self.device = Some(device);
        *self.dest_offset.get_mut() = dest_offset;
        *self.state.get_mut() = DmaState::Idle as u8;
    }

    /// Detach the device and clear all transfer parameters.
    pub(crate) fn detach(&mut self) -> Option<D> {
        let device = self.device.take();
        self.reset();
        device
    }

    fn reset(&mut self) {
        *self.state.get_mut() = DmaState::Error as u8;
        *self.source.get_mut() = 0;
        *self.dest_offset.get_mut() = 0;
        *self.block_size.get_mut() = 0;
        *self.credited.get_mut() = 0;
        *self.completion_pending.get_mut() = false;
        *self.completed.get_mut() = false;
    }

    /// Run a producer-side rewrite of the transfer bookkeeping.
    ///
    /// Caller holds the producer lock, so updates never nest.
    pub(crate) fn update<R>(&self, f: impl FnOnce() -> R) -> R {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        let out = f();

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
        out
    }

    /// Run `read` against bookkeeping no update touched meanwhile.
    ///
    /// Returns `None` if every attempt overlapped an update.
    pub(crate) fn sample<R>(&self, mut read: impl FnMut() -> R) -> Option<R> {
        for _ in 0..DMA_SAMPLE_ATTEMPTS {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                continue;
            }

            let value = read();
            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return Some(value);
            }
        }
        None
    }

    pub(crate) fn program(&self, source: usize, dest_offset: usize, block_size: usize) {
        self.source.store(source, Ordering::Relaxed);
        self.dest_offset.store(dest_offset, Ordering::Relaxed);
        self.block_size.store(block_size, Ordering::Relaxed);
        self.credited.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn dest_offset(&self) -> usize {
        self.dest_offset.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_dest_offset(&self, offset: usize) {
        self.dest_offset.store(offset, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn block_size(&self) -> usize {
        self.block_size.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn credited(&self) -> usize {
        self.credited.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_credited(&self, credited: usize) {
        self.credited.store(credited, Ordering::Relaxed);
    }

    pub(crate) fn transfer(&self, base_address: usize) -> DmaTransfer {
        let dest_offset = self.dest_offset();
        DmaTransfer {
            source: self.source.load(Ordering::Relaxed),
            dest_offset,
            dest_address: base_address + dest_offset,
            block_size: self.block_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_channel_is_in_error_state() {
        let channel: DmaChannel<()> = DmaChannel::new();
        assert_eq!(channel.state(), DmaState::Error);
        assert!(channel.device.is_none());
    }

    #[test]
    fn attach_moves_to_idle() {
        let mut channel = DmaChannel::new();
        channel.attach((), 5);
        assert_eq!(channel.state(), DmaState::Idle);
        assert_eq!(channel.dest_offset(), 5);
    }

    #[test]
    fn detach_clears_parameters() {
        let mut channel = DmaChannel::new();
        channel.attach(7u32, 0);
        channel.program(0x4000, 3, 64);
        channel.set_credited(10);

        assert_eq!(channel.detach(), Some(7));
        assert_eq!(channel.state(), DmaState::Error);
        assert_eq!(channel.transfer(0), DmaTransfer::default());
        assert_eq!(channel.credited(), 0);
    }

    #[test]
    fn sample_sees_stable_bookkeeping() {
        let channel: DmaChannel<()> = DmaChannel::new();
        channel.update(|| channel.program(0x1000, 4, 32));

        assert_eq!(channel.sample(|| channel.dest_offset()), Some(4));
    }

    #[test]
    fn sample_retries_after_overlapping_update() {
        let channel: DmaChannel<()> = DmaChannel::new();
        let mut reads = 0;

        let sampled = channel.sample(|| {
            reads += 1;
            if reads == 1 {
                channel.update(|| channel.set_dest_offset(9));
            }
            channel.dest_offset()
        });

        assert_eq!(sampled, Some(9));
        assert_eq!(reads, 2);
    }

    #[test]
    fn sample_gives_up_when_every_attempt_overlaps() {
        let channel: DmaChannel<()> = DmaChannel::new();
        let sampled = channel.sample(|| channel.update(|| channel.dest_offset()));
        assert_eq!(sampled, None);
    }

    #[test]
    fn program_resets_credit() {
        let channel: DmaChannel<()> = DmaChannel::new();
        channel.set_credited(12);
        channel.program(0x1000, 4, 32);

        assert_eq!(channel.credited(), 0);
        let transfer = channel.transfer(0x2000_0000);
        assert_eq!(transfer.dest_address, 0x2000_0004);
        assert_eq!(transfer.block_size, 32);
    }
}
