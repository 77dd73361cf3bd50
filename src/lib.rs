//! Fixed-capacity SPSC byte ring buffer
//!
//! A `no_std` ring buffer for streaming bytes from one producer to one
//! consumer, where the producer is either CPU code copying bytes in or a DMA
//! engine writing straight into the ring storage.
//!
//! # Architecture
//!
//! 1. **Buffer** ([`RingBuffer`]): storage binding, cursors, CPU-copy
//!    `put`/`get`, occupancy queries
//! 2. **DMA** ([`dma`]): driver trait and the transfer state machine
//!    (`dma_configure`/`dma_start`/`dma_stop`/`dma_complete`)
//! 3. **Cache** ([`cache`]): clean/invalidate hooks for non-coherent parts
//!
//! Producer calls and consumer calls take `&self` and are guarded by two
//! independent non-blocking [`SideLock`]s, so an interrupt handler and a
//! thread can share one buffer without a global mutex. Administrative
//! calls (init, deinit, mode switch, device registration) take `&mut self`.
//!
//! One slot is always kept free: `available_to_read() + available_to_write()`
//! equals `capacity() - 1`.
//!
//! # Features
//!
//! - `alloc`: Enable `RingBuffer::create` (heap-backed storage)
//! - `defmt`: Enable defmt formatting for public types and log lines
//! - `critical-section`: Enable ISR-safe `SharedRingBuffer` wrapper
//! - `async`: Enable async/await support with wakers
//!
//! # Example
//!
//! ```
//! use ph_ringbuf::{Error, RingBuffer};
//!
//! let mut storage = [0u8; 16];
//! let rb: RingBuffer = RingBuffer::bind(&mut storage)?;
//!
//! let written = rb.put(b"hello world")?;
//! assert_eq!(written, 11);
//!
//! let mut out = [0u8; 5];
//! assert_eq!(rb.get(&mut out)?, 5);
//! assert_eq!(&out, b"hello");
//! assert_eq!(rb.available_to_read(), 6);
//! # Ok::<(), Error>(())
//! ```
//!
//! # DMA Example
//!
//! ```ignore
//! let mut rb: RingBuffer<'_, &UartRxDma> = RingBuffer::bind(&mut storage)?;
//! rb.register_dma_device(&uart_dma, None)?;
//!
//! rb.dma_configure(UART_DR_ADDR, 64)?;
//! rb.dma_start()?;
//!
//! // In the transfer-complete interrupt:
//! rb.dma_complete()?;
//! rb.dma_configure(UART_DR_ADDR, 64)?;
//! rb.dma_start()?;
//!
//! // In the consumer:
//! let n = rb.get(&mut line)?;
//! ```

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

#[cfg(feature = "alloc")]
extern crate alloc;

// =============================================================================
// Modules
// =============================================================================

mod buffer;
pub mod cache;
pub mod config;
pub mod constants;
pub mod dma;
pub mod error;
pub mod poll;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use buffer::{RingBuffer, SideGuard, SideLock};
pub use cache::{CacheHooks, CacheMaintenance, NoCache};
pub use config::{Mode, RingBufferConfig};
pub use dma::{DmaDevice, DmaState, DmaTransfer, NoDevice};
pub use error::{DeviceError, DeviceResult, Error, LockError, LockResult, Result};

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::SharedRingBuffer;

// Re-export async types when async feature is enabled
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use sync::asynch::{ReadFuture, WriteFuture};
