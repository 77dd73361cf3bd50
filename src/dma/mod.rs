//! DMA-fed mode.
//!
//! In DMA mode the producer is a hardware engine writing straight into the
//! ring storage. The buffer never copies on the producer side; it tracks one
//! transfer at a time and moves the write cursor from the byte count the
//! driver reports.
//!
//! # Transfer lifecycle
//!
//! ```text
//!            register            configure            start
//!   Error ───────────▶ Idle ───────────────▶ Ready ───────────▶ Busy
//!     ▲                                      ▲  ▲                │
//!     │ unregister                configure  │  └── stop/complete ┘
//!     └──────────────────── (any) ───────────┘
//! ```
//!
//! - [`DmaDevice`]: the driver collaborator (configure/start/stop/received
//!   length)
//! - [`DmaState`]: where the current transfer is in its lifecycle
//! - [`DmaTransfer`]: snapshot of the programmed transfer parameters
//!
//! The operations themselves are methods on [`RingBuffer`](crate::RingBuffer)
//! (`dma_configure`, `dma_start`, `dma_stop`, `dma_complete`).

mod channel;
mod ops;

pub(crate) use channel::DmaChannel;

use crate::error::DeviceResult;

/// DMA driver collaborator.
///
/// Methods take `&self`: drivers are expected to be register handles, and the
/// consumer side may query [`received_len`](Self::received_len) while the
/// producer side owns the transfer.
///
/// `configure` and `received_len` are mandatory; `start` and `stop` default
/// to success for engines that run as soon as they are configured.
pub trait DmaDevice {
    /// Program a transfer of `size` bytes from `source` to `dest`.
    ///
    /// `dest` is the absolute address of the current write cursor. The
    /// engine is expected to wrap at the end of the ring storage (circular
    /// mode); `size` never exceeds the ring capacity.
    fn configure(&self, source: usize, dest: usize, size: usize) -> DeviceResult<()>;

    /// Start the configured transfer
    fn start(&self) -> DeviceResult<()> {
        Ok(())
    }

    /// Abort the running transfer
    fn stop(&self) -> DeviceResult<()> {
        Ok(())
    }

    /// Bytes written by the engine since the transfer started
    fn received_len(&self) -> usize;
}

impl<T: DmaDevice + ?Sized> DmaDevice for &T {
    #[inline]
    fn configure(&self, source: usize, dest: usize, size: usize) -> DeviceResult<()> {
        (**self).configure(source, dest, size)
    }

    #[inline]
    fn start(&self) -> DeviceResult<()> {
        (**self).start()
    }

    #[inline]
    fn stop(&self) -> DeviceResult<()> {
        (**self).stop()
    }

    #[inline]
    fn received_len(&self) -> usize {
        (**self).received_len()
    }
}

/// Placeholder device for buffers that only ever run in CPU-copy mode.
///
/// Uninhabited: a `RingBuffer<NoDevice>` can never register a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDevice {}

impl DmaDevice for NoDevice {
    fn configure(&self, _source: usize, _dest: usize, _size: usize) -> DeviceResult<()> {
        match *self {}
    }

    fn received_len(&self) -> usize {
        match *self {}
    }
}

/// DMA transfer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DmaState {
    /// No device registered (or unregistered); terminal until re-registration
    #[default]
    Error = 0,
    /// Device registered, no transfer configured
    Idle = 1,
    /// Transfer configured, not running
    Ready = 2,
    /// Transfer running
    Busy = 3,
}

impl DmaState {
    pub(crate) const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => DmaState::Idle,
            2 => DmaState::Ready,
            3 => DmaState::Busy,
            _ => DmaState::Error,
        }
    }

    /// Returns a human-readable name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaState::Error => "error",
            DmaState::Idle => "idle",
            DmaState::Ready => "ready",
            DmaState::Busy => "busy",
        }
    }
}

/// Parameters of the configured (or most recently configured) transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaTransfer {
    /// Source address handed to the driver
    pub source: usize,
    /// Write position inside storage
    pub dest_offset: usize,
    /// Absolute destination address (`storage base + dest_offset`)
    pub dest_address: usize,
    /// Configured block size in bytes
    pub block_size: usize,
}
