//! DMA transfer operations.
//!
//! Every producer-side transition runs under the producer lock. A completion
//! interrupt that finds the lock held (it preempted a producer call made
//! from thread context) cannot wait for it, so it is recorded as pending and
//! run by whoever releases the lock.
//!
//! The consumer side never takes the producer lock. It samples the running
//! transfer lock-free and derives the readable length from
//! `dest + received` without storing it, so a completion interrupt that
//! preempts a read can always complete and restart the transfer.

use core::cmp::min;

use portable_atomic::{Ordering, fence};

use super::{DmaDevice, DmaState};
use crate::buffer::{RingBuffer, SideGuard, advance, occupied};
use crate::cache::CacheMaintenance;
use crate::config::Mode;
use crate::constants::RESERVED_SLOTS;
use crate::error::{Error, LockError, Result};

impl<D: DmaDevice, C: CacheMaintenance> RingBuffer<'_, D, C> {
    // =========================================================================
    // Registration
    // =========================================================================

    /// Register the DMA driver and switch to [`Mode::DmaFed`].
    ///
    /// The next transfer will target the current write cursor. A cache
    /// collaborator passed here replaces any installed one; `None` keeps it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if no storage is bound or a device is already
    /// registered.
    pub fn register_dma_device(&mut self, device: D, cache: Option<C>) -> Result<()> {
        if self.storage.is_none() || self.dma.device.is_some() {
            return Err(Error::InvalidState);
        }

        let tail = *self.tail.get_mut();
        self.dma.attach(device, tail);
        if cache.is_some() {
            self.cache = cache;
        }
        self.switch_mode(Mode::DmaFed);

        #[cfg(feature = "defmt")]
        defmt::debug!("dma device registered, dest offset {}", tail);

        Ok(())
    }

    /// Detach the DMA driver and fall back to [`Mode::CpuCopy`].
    ///
    /// A running transfer is stopped first (best effort, bytes already
    /// received are kept). Cache hooks are removed and the DMA state becomes
    /// [`DmaState::Error`]. Returns the detached device.
    pub fn unregister_dma_device(&mut self) -> Option<D> {
        if self.dma.state() == DmaState::Busy {
            let _ = self.dma_stop();
        }

        let device = self.dma.detach();
        self.cache = None;
        if self.mode == Mode::DmaFed {
            self.switch_mode(Mode::CpuCopy);
        }

        #[cfg(feature = "defmt")]
        if device.is_some() {
            defmt::debug!("dma device unregistered");
        }

        device
    }

    // =========================================================================
    // Transfer Lifecycle
    // =========================================================================

    /// Program a transfer of `size` bytes from `source` into the ring.
    ///
    /// The destination is always the current write cursor. Legal from
    /// [`DmaState::Idle`] and [`DmaState::Ready`]; on success the state is
    /// `Ready`. A driver failure leaves the previous parameters and state
    /// untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a zero source, a zero size, or a size
    ///   larger than the capacity
    /// - [`Error::InvalidState`] outside DMA mode or from the wrong state
    /// - [`Error::Lock`] if the producer side is busy
    /// - [`Error::Device`] from the driver, unmodified
    pub fn dma_configure(&self, source: usize, size: usize) -> Result<()> {
        let storage = self.storage.as_ref().ok_or(Error::InvalidState)?;
        if source == 0 || size == 0 || size > storage.len() {
            return Err(Error::InvalidArgument);
        }
        if self.mode != Mode::DmaFed {
            return Err(Error::InvalidState);
        }

        self.with_producer(|_| {
            let device = self.dma.device.as_ref().ok_or(Error::InvalidState)?;
            if !matches!(self.dma.state(), DmaState::Idle | DmaState::Ready) {
                return Err(Error::InvalidState);
            }

            let dest = self.tail.load(Ordering::Relaxed);
            device
                .configure(source, storage.addr_of(dest), size)
                .inspect_err(|_e| {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("dma configure failed: {}", _e);
                })?;

            self.dma.update(|| {
                self.dma.program(source, dest, size);
                self.set_dma_state(DmaState::Ready);
            });
            Ok(())
        })?
    }

    /// Start the configured transfer. Legal only from [`DmaState::Ready`].
    pub fn dma_start(&self) -> Result<()> {
        self.with_producer(|_| {
            if self.dma.state() != DmaState::Ready {
                return Err(Error::InvalidState);
            }
            let device = self.dma.device.as_ref().ok_or(Error::InvalidState)?;
            device.start().inspect_err(|_e| {
                #[cfg(feature = "defmt")]
                defmt::warn!("dma start failed: {}", _e);
            })?;

            self.dma.update(|| self.set_dma_state(DmaState::Busy));
            Ok(())
        })?
    }

    /// Abort the running transfer. Legal only from [`DmaState::Busy`].
    ///
    /// Bytes the driver reports as received are kept: the write cursor and
    /// produced total are brought up to date, the next transfer is aimed at
    /// the new cursor and the state returns to `Ready`.
    pub fn dma_stop(&self) -> Result<()> {
        self.with_producer(|guard| {
            if self.dma.state() != DmaState::Busy {
                return Err(Error::InvalidState);
            }
            let device = self.dma.device.as_ref().ok_or(Error::InvalidState)?;
            device.stop().inspect_err(|_e| {
                #[cfg(feature = "defmt")]
                defmt::warn!("dma stop failed: {}", _e);
            })?;

            self.dma.update(|| {
                let _ = self.recompute_tail(guard);
                self.finish_transfer();
            });

            #[cfg(feature = "async")]
            self.data_waker.wake();

            Ok(())
        })?
    }

    /// Account for a finished transfer. Call from the completion interrupt.
    ///
    /// The full block is added to the produced total, the write cursor moves
    /// to the end of the received data and the state returns to `Ready`.
    ///
    /// If the producer side is busy (the interrupt preempted a producer
    /// call) the completion is deferred to the lock holder and `Ok(())` is
    /// returned. A deferred completion that finds
    /// the transfer no longer `Busy` is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] outside DMA mode or when no transfer is
    /// running.
    pub fn dma_complete(&self) -> Result<()> {
        if self.storage.is_none() || self.mode != Mode::DmaFed {
            return Err(Error::InvalidState);
        }

        match self.producer_lock().try_acquire() {
            Ok(guard) => {
                let result = self.complete_locked(&guard);
                drop(guard);
                self.drain_deferred_completion();
                result
            }
            Err(LockError::AlreadyLocked) => {
                if self.dma.state() != DmaState::Busy {
                    return Err(Error::InvalidState);
                }
                self.dma.completion_pending.store(true, Ordering::SeqCst);
                // The holder may have released between our attempt and the store.
                self.drain_deferred_completion();
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Producer-side Helpers
    // =========================================================================

    /// Run completions deferred while the producer lock was held.
    pub(crate) fn drain_deferred_completion(&self) {
        fence(Ordering::SeqCst);
        while self.dma.completion_pending.load(Ordering::SeqCst) {
            // Still held: the current holder drains on release.
            let Ok(guard) = self.producer_lock().try_acquire() else {
                return;
            };
            if self.dma.completion_pending.swap(false, Ordering::SeqCst)
                && self.complete_locked(&guard).is_err()
            {
                #[cfg(feature = "defmt")]
                defmt::warn!("deferred dma completion dropped, state {}", self.dma.state());
            }
            drop(guard);
            fence(Ordering::SeqCst);
        }
    }

    // =========================================================================
    // Consumer-side View
    // =========================================================================

    /// Write cursor and produced total including what the running transfer
    /// has landed so far.
    ///
    /// Returns `None` when no transfer is running, the driver report has not
    /// settled, or every sample overlapped a producer-side update.
    pub(crate) fn live_progress(&self) -> Option<(usize, u64)> {
        let device = self.dma.device.as_ref()?;
        let capacity = self.capacity();

        self.dma
            .sample(|| {
                if self.dma.state() != DmaState::Busy {
                    return None;
                }
                let dest = self.dma.dest_offset();
                let credited = self.dma.credited();
                let produced = self.total_produced.load(Ordering::Acquire);
                let received = device.received_len();
                if received > self.dma.block_size() {
                    return None;
                }

                let landed = received.saturating_sub(credited) as u64;
                Some((advance(dest, received, capacity), produced + landed))
            })
            .flatten()
    }

    /// Readable bytes in DMA mode, without touching the producer lock.
    pub(crate) fn dma_readable(&self, head: usize, capacity: usize) -> usize {
        if let Some((tail, _)) = self.live_progress() {
            return occupied(head, tail, capacity);
        }

        // Published cursor. The consumer may already be past it when it read
        // bytes of a transfer whose completion is still being recorded; the
        // produced backlog bounds the result in that window.
        let tail = self.tail.load(Ordering::Acquire);
        let backlog = self
            .total_produced
            .load(Ordering::Acquire)
            .saturating_sub(self.total_consumed());
        min(occupied(head, tail, capacity) as u64, backlog) as usize
    }

    /// Move the write cursor to `dest + received` while a transfer runs.
    ///
    /// Returns the received length, or `None` when nothing was updated
    /// (not busy, no device, or a report larger than the block that has
    /// not settled yet).
    pub(crate) fn recompute_tail(&self, _guard: &SideGuard<'_>) -> Option<usize> {
        if self.dma.state() != DmaState::Busy {
            return None;
        }
        let capacity = self.capacity();
        let device = self.dma.device.as_ref()?;

        let received = device.received_len();
        if received > self.dma.block_size() {
            #[cfg(feature = "defmt")]
            defmt::trace!("received length {} not settled, skipping", received);
            return None;
        }

        self.credit(received);
        self.tail.store(
            advance(self.dma.dest_offset(), received, capacity),
            Ordering::Release,
        );
        Some(received)
    }

    fn complete_locked(&self, guard: &SideGuard<'_>) -> Result<()> {
        if self.dma.state() != DmaState::Busy {
            return Err(Error::InvalidState);
        }

        let block = self.dma.block_size();
        self.dma.update(|| {
            if self.recompute_tail(guard).is_some() {
                self.credit(block);
            } else {
                // Unsettled report: the engine finished the whole block.
                self.credit(block);
                self.tail.store(
                    advance(self.dma.dest_offset(), block, self.capacity()),
                    Ordering::Release,
                );
            }
            self.finish_transfer();
        });
        self.dma.completed.store(true, Ordering::SeqCst);

        #[cfg(feature = "async")]
        self.data_waker.wake();

        Ok(())
    }

    /// Add the part of `received` not yet counted to the produced total.
    ///
    /// Runs before the matching tail store so the consumer never sees more
    /// bytes than have been produced.
    fn credit(&self, received: usize) {
        let credited = self.dma.credited();
        if received > credited {
            self.total_produced
                .fetch_add((received - credited) as u64, Ordering::Release);
            self.dma.set_credited(received);
        }
    }

    fn finish_transfer(&self) {
        self.dma.set_dest_offset(self.tail.load(Ordering::Relaxed));
        self.check_overflow();
        self.set_dma_state(DmaState::Ready);
    }

    fn check_overflow(&self) {
        if !self.config.overflow_tracking {
            return;
        }

        // One slot stays free, so a backlog that fills it has already lost
        // the whole ring: the write cursor caught up with the read cursor.
        let limit = self.capacity().saturating_sub(RESERVED_SLOTS) as u64;
        let in_flight = self
            .total_produced
            .load(Ordering::Acquire)
            .saturating_sub(self.total_consumed());
        if in_flight > limit {
            let _ = self
                .overflow_count
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1));

            #[cfg(feature = "defmt")]
            defmt::warn!("ring overflow: {} bytes unread", in_flight);
        }
    }

    fn set_dma_state(&self, state: DmaState) {
        #[cfg(feature = "defmt")]
        defmt::debug!("dma {} -> {}", self.dma.state(), state);

        self.dma.set_state(state);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
