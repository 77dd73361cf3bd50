//! Cache maintenance hooks.
//!
//! On parts where the DMA engine and the CPU sit in different cache domains
//! the buffer calls [`CacheMaintenance::clean`] after the CPU writes a span
//! (`put`) and [`CacheMaintenance::invalidate`] before the CPU reads a span
//! (`get`/`peek`). Spans are split at the end of storage exactly like the
//! copy itself, so a hook never sees a range that crosses the region end.
//!
//! Both hooks default to no-ops. Platforms with a coherent interconnect use
//! [`NoCache`].

/// Cache maintenance collaborator.
pub trait CacheMaintenance {
    /// Write back CPU-cached bytes in `[address, address + len)` to memory.
    fn clean(&self, address: usize, len: usize) {
        let _ = (address, len);
    }

    /// Discard CPU cache lines covering `[address, address + len)`.
    fn invalidate(&self, address: usize, len: usize) {
        let _ = (address, len);
    }
}

impl<T: CacheMaintenance + ?Sized> CacheMaintenance for &T {
    #[inline]
    fn clean(&self, address: usize, len: usize) {
        (**self).clean(address, len);
    }

    #[inline]
    fn invalidate(&self, address: usize, len: usize) {
        (**self).invalidate(address, len);
    }
}

/// Coherent memory: no maintenance required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoCache;

impl CacheMaintenance for NoCache {}

/// Function-pointer hooks, for firmware that exposes cache maintenance as
/// plain `fn(address, len)` routines.
///
/// ```
/// use ph_ringbuf::CacheHooks;
///
/// fn clean_dcache(_addr: usize, _len: usize) {}
///
/// let hooks = CacheHooks::new().with_clean(clean_dcache);
/// assert!(hooks.clean.is_some());
/// assert!(hooks.invalidate.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheHooks {
    /// Called after the CPU writes a span
    pub clean: Option<fn(usize, usize)>,
    /// Called before the CPU reads a span
    pub invalidate: Option<fn(usize, usize)>,
}

impl CacheHooks {
    /// No hooks registered
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clean: None,
            invalidate: None,
        }
    }

    /// Set the clean hook
    #[must_use]
    pub const fn with_clean(mut self, hook: fn(usize, usize)) -> Self {
        self.clean = Some(hook);
        self
    }

    /// Set the invalidate hook
    #[must_use]
    pub const fn with_invalidate(mut self, hook: fn(usize, usize)) -> Self {
        self.invalidate = Some(hook);
        self
    }
}

impl CacheMaintenance for CacheHooks {
    fn clean(&self, address: usize, len: usize) {
        if let Some(hook) = self.clean {
            hook(address, len);
        }
    }

    fn invalidate(&self, address: usize, len: usize) {
        if let Some(hook) = self.invalidate {
            hook(address, len);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use portable_atomic::{AtomicUsize, Ordering};

    use super::*;

    static CLEANED: AtomicUsize = AtomicUsize::new(0);

    fn count_clean(_address: usize, len: usize) {
        CLEANED.fetch_add(len, Ordering::Relaxed);
    }

    #[test]
    fn hooks_skip_unregistered() {
        let hooks = CacheHooks::new();
        hooks.clean(0x1000, 16);
        hooks.invalidate(0x1000, 16);
    }

    #[test]
    fn default_hooks_are_empty() {
        let hooks = CacheHooks::default();
        let copy = hooks;
        assert!(copy.clean.is_none());
        assert!(copy.invalidate.is_none());
        assert!(hooks.with_invalidate(count_clean).invalidate.is_some());
    }

    #[test]
    fn hooks_call_registered_clean() {
        let hooks = CacheHooks::new().with_clean(count_clean);
        let before = CLEANED.load(Ordering::Relaxed);
        hooks.clean(0x2000, 12);
        assert_eq!(CLEANED.load(Ordering::Relaxed) - before, 12);
    }

    #[test]
    fn reference_forwards_to_inner() {
        let hooks = CacheHooks::new().with_clean(count_clean);
        let by_ref = &hooks;
        let before = CLEANED.load(Ordering::Relaxed);
        CacheMaintenance::clean(&by_ref, 0x3000, 5);
        assert_eq!(CLEANED.load(Ordering::Relaxed) - before, 5);
    }
}
