//! Synchronization and Concurrency Support
//!
//! The ring buffer itself needs no mutex: producer and consumer run
//! lock-free against each other. This module covers the rest:
//!
//! - **Primitives** (`primitives`): Low-level synchronization types
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!   - [`AtomicWaker`] - Async waker storage for interrupts
//!
//! - **Shared Wrapper** (`shared`): [`SharedRingBuffer`], a buffer that can
//!   live in a `static` and be administered from any context
//!
//! - **Async Support** (`asynch`): [`ReadFuture`], [`WriteFuture`] and the
//!   `read_async`/`write_async` methods
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables `primitives` and `shared` modules
//! - `async`: Enables `asynch` module (also requires `critical-section`)
//!
//! # Example
//!
//! ```ignore
//! use ph_ringbuf::sync::SharedRingBuffer;
//!
//! static RX: SharedRingBuffer<'static, UartDma> = SharedRingBuffer::new();
//!
//! #[interrupt]
//! fn DMA1_CH5() {
//!     RX.with(|rb| rb.dma_complete().ok());
//! }
//! ```

mod primitives;

#[cfg(feature = "async")]
pub use primitives::AtomicWaker;
pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::SharedRingBuffer;

#[cfg(feature = "async")]
pub mod asynch;

#[cfg(feature = "async")]
pub use asynch::{ReadFuture, WriteFuture};
