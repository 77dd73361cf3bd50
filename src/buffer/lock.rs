//! Non-blocking producer/consumer guards.
//!
//! Each side of the buffer owns one [`SideLock`]. Acquisition never waits:
//! a held lock fails immediately with [`LockError::AlreadyLocked`] and the
//! caller decides whether to retry, yield or give up.

use portable_atomic::{AtomicU8, Ordering};

use crate::error::{LockError, LockResult};

const UNLOCKED: u8 = 0;
const LOCKED: u8 = 1;

/// Single-owner, non-reentrant, non-blocking lock.
#[derive(Debug)]
pub struct SideLock {
    state: AtomicU8,
}

impl SideLock {
    /// Create an unlocked guard (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNLOCKED),
        }
    }

    /// Take the lock without a scope guard.
    ///
    /// Must be paired with [`release`](Self::release). Prefer
    /// [`try_acquire`](Self::try_acquire).
    pub fn acquire(&self) -> LockResult<()> {
        match self
            .state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
        {
            Ok(_) => Ok(()),
            Err(LOCKED) => Err(LockError::AlreadyLocked),
            Err(_) => Err(LockError::Corrupted),
        }
    }

    /// Give the lock back.
    pub fn release(&self) -> LockResult<()> {
        match self
            .state
            .compare_exchange(LOCKED, UNLOCKED, Ordering::Release, Ordering::Relaxed)
        {
            Ok(_) => Ok(()),
            Err(UNLOCKED) => Err(LockError::NotLocked),
            Err(_) => Err(LockError::Corrupted),
        }
    }

    /// Take the lock, returning a guard that releases it on drop.
    pub fn try_acquire(&self) -> LockResult<SideGuard<'_>> {
        self.acquire()?;
        Ok(SideGuard { lock: self })
    }

    /// Whether the lock is currently held
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) == LOCKED
    }

    /// Force the lock back to unlocked. Administrative reset only.
    pub(crate) fn reset(&mut self) {
        *self.state.get_mut() = UNLOCKED;
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&self) {
        self.state.store(0xA5, Ordering::Relaxed);
    }
}

impl Default for SideLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped ownership of a [`SideLock`].
#[must_use = "dropping the guard releases the lock immediately"]
#[derive(Debug)]
pub struct SideGuard<'l> {
    lock: &'l SideLock,
}

impl Drop for SideGuard<'_> {
    fn drop(&mut self) {
        // Only fails if someone called the raw `release` behind our back.
        let _ = self.lock.release();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
