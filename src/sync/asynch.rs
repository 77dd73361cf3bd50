//! Async/await support for ring buffer I/O.
//!
//! Each buffer carries two wakers: a data waker, woken when bytes become
//! readable (`put`, `dma_complete`, `dma_stop`), and a space waker, woken
//! when bytes are consumed (`get`, `skip`, `clear`).
//!
//! # Example
//!
//! ```ignore
//! async fn pump(rb: &RingBuffer<'_>) -> ph_ringbuf::Result<()> {
//!     let mut chunk = [0u8; 64];
//!     loop {
//!         let n = rb.read_async(&mut chunk).await?;
//!         handle(&chunk[..n]);
//!     }
//! }
//! ```

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use crate::buffer::RingBuffer;
use crate::cache::CacheMaintenance;
use crate::dma::DmaDevice;
use crate::error::Result;

/// Future for async reads. Resolves once at least one byte was read.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ReadFuture<'r, 'a, 'b, D: DmaDevice, C: CacheMaintenance> {
    rb: &'r RingBuffer<'a, D, C>,
    buffer: &'b mut [u8],
}

impl<D: DmaDevice, C: CacheMaintenance> Future for ReadFuture<'_, '_, '_, D, C> {
    type Output = Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match this.rb.get(this.buffer) {
            Ok(0) => {}
            other => return Poll::Ready(other),
        }

        // Register first, then look again so a put between the two is not lost.
        this.rb.data_waker.register(cx.waker());
        match this.rb.get(this.buffer) {
            Ok(0) => Poll::Pending,
            other => Poll::Ready(other),
        }
    }
}

/// Future for async writes. Resolves once at least one byte was written.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct WriteFuture<'r, 'a, 'b, D: DmaDevice, C: CacheMaintenance> {
    rb: &'r RingBuffer<'a, D, C>,
    data: &'b [u8],
}

impl<D: DmaDevice, C: CacheMaintenance> Future for WriteFuture<'_, '_, '_, D, C> {
    type Output = Result<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match this.rb.put(this.data) {
            Ok(0) => {}
            other => return Poll::Ready(other),
        }

        this.rb.space_waker.register(cx.waker());
        match this.rb.put(this.data) {
            Ok(0) => Poll::Pending,
            other => Poll::Ready(other),
        }
    }
}

impl<'a, D: DmaDevice, C: CacheMaintenance> RingBuffer<'a, D, C> {
    /// Read asynchronously, waiting for data if the buffer is empty.
    ///
    /// Errors (wrong mode, held consumer lock, empty `buffer`) resolve
    /// immediately.
    pub fn read_async<'r, 'b>(&'r self, buffer: &'b mut [u8]) -> ReadFuture<'r, 'a, 'b, D, C> {
        ReadFuture { rb: self, buffer }
    }

    /// Write asynchronously, waiting for space if the buffer is full.
    pub fn write_async<'r, 'b>(&'r self, data: &'b [u8]) -> WriteFuture<'r, 'a, 'b, D, C> {
        WriteFuture { rb: self, data }
    }

    /// Wake both pending futures, e.g. before tearing the buffer down.
    pub fn wake_all(&self) {
        self.data_waker.wake();
        self.space_waker.wake();
    }
}
