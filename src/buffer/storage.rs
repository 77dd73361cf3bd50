//! Backing byte region.
//!
//! Storage is either borrowed from the caller for `'a` or, with the `alloc`
//! feature, allocated from the global heap and freed on drop. Both are held
//! as a raw base pointer so producer and consumer can touch disjoint byte
//! ranges through a shared reference.

use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::constants::MIN_CAPACITY;
use crate::error::{Error, Result};

pub(crate) struct Storage<'a> {
    base: NonNull<u8>,
    len: usize,
    #[cfg(feature = "alloc")]
    owned: bool,
    _region: PhantomData<&'a mut [u8]>,
}

impl<'a> Storage<'a> {
    /// Borrow a caller-supplied region.
    pub(crate) fn borrowed(region: &'a mut [u8]) -> Result<Self> {
        if region.len() < MIN_CAPACITY {
            return Err(Error::InvalidArgument);
        }

        Ok(Self {
            base: NonNull::from(&mut *region).cast::<u8>(),
            len: region.len(),
            #[cfg(feature = "alloc")]
            owned: false,
            _region: PhantomData,
        })
    }

    /// Allocate a zeroed region of `capacity` bytes from the heap.
    #[cfg(feature = "alloc")]
    pub(crate) fn allocate(capacity: usize) -> Result<Self> {
        use alloc::boxed::Box;
        use alloc::vec::Vec;

        if capacity < MIN_CAPACITY {
            return Err(Error::InvalidArgument);
        }

        let mut bytes: Vec<u8> = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| Error::AllocationFailure)?;
        bytes.resize(capacity, 0);

        let raw = Box::into_raw(bytes.into_boxed_slice());
        let base = NonNull::new(raw.cast::<u8>()).ok_or(Error::AllocationFailure)?;

        Ok(Self {
            base,
            len: capacity,
            owned: true,
            _region: PhantomData,
        })
    }

    #[inline(always)]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Absolute address of `offset`, as handed to DMA and cache collaborators
    #[inline(always)]
    pub(crate) fn addr_of(&self, offset: usize) -> usize {
        self.base.as_ptr() as usize + offset
    }

    /// Copy `src` into storage at `offset`.
    ///
    /// # Safety
    ///
    /// `offset + src.len()` must not exceed `len()`, and the caller must own
    /// the producer side of the range (no concurrent reader of those bytes).
    #[inline]
    pub(crate) unsafe fn write(&self, offset: usize, src: &[u8]) {
        debug_assert!(offset + src.len() <= self.len);
        // SAFETY: bounds checked by the caller; `src` cannot alias storage
        // because storage is only reachable through this raw pointer.
        unsafe {
            core::ptr::copy_nonoverlapping(src.as_ptr(), self.base.as_ptr().add(offset), src.len());
        }
    }

    /// Copy bytes at `offset` out into `dst`.
    ///
    /// # Safety
    ///
    /// `offset + dst.len()` must not exceed `len()`, and the range must hold
    /// bytes already published by the producer.
    #[inline]
    pub(crate) unsafe fn read(&self, offset: usize, dst: &mut [u8]) {
        debug_assert!(offset + dst.len() <= self.len);
        // SAFETY: bounds checked by the caller; `dst` is a distinct buffer.
        unsafe {
            core::ptr::copy_nonoverlapping(
                self.base.as_ptr().add(offset),
                dst.as_mut_ptr(),
                dst.len(),
            );
        }
    }
}

impl Drop for Storage<'_> {
    fn drop(&mut self) {
        #[cfg(feature = "alloc")]
        if self.owned {
            let slice = core::ptr::slice_from_raw_parts_mut(self.base.as_ptr(), self.len);
            // SAFETY: `base`/`len` came from `Box::into_raw` in `allocate`
            // and are reconstructed exactly once.
            drop(unsafe { alloc::boxed::Box::from_raw(slice) });
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
