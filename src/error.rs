//! Error types for the ring buffer
//!
//! Errors are organized by domain for better diagnostics:
//! - [`LockError`]: Producer/consumer guard misuse
//! - [`DeviceError`]: Non-zero status reported by a DMA collaborator
//!
//! The unified [`Error`] enum wraps the domain errors together with the
//! argument/state failures and is returned by every fallible operation.
//!
//! Running out of room on `put` or out of data on `get` is *not* an error;
//! those report a short (possibly zero) transfer length instead.

// =============================================================================
// Lock Errors
// =============================================================================

/// Producer/consumer guard errors
///
/// Raised when the single-producer/single-consumer contract is violated at
/// runtime, e.g. a second producer racing the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LockError {
    /// Guard is already held by another caller on the same side
    AlreadyLocked,
    /// Release attempted on a guard that is not held
    NotLocked,
    /// Guard word holds a value that is neither locked nor unlocked
    Corrupted,
}

impl core::fmt::Display for LockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LockError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LockError::AlreadyLocked => "already locked",
            LockError::NotLocked => "not locked",
            LockError::Corrupted => "corrupted lock state",
        }
    }
}

// =============================================================================
// Device Errors
// =============================================================================

/// Failure status returned by a DMA collaborator.
///
/// The status code is carried unmodified so firmware can map it back to its
/// own driver error space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceError {
    status: i32,
}

impl DeviceError {
    /// Wrap a raw driver status code
    #[must_use]
    pub const fn new(status: i32) -> Self {
        Self { status }
    }

    /// The raw status code reported by the driver
    #[must_use]
    pub const fn status(&self) -> i32 {
        self.status
    }

    /// Convert a C-style status (`0` = success) into a result
    pub const fn check(status: i32) -> core::result::Result<(), DeviceError> {
        if status == 0 {
            Ok(())
        } else {
            Err(DeviceError::new(status))
        }
    }
}

impl core::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "device status {}", self.status)
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all error conditions for unified error handling.
///
/// ```ignore
/// match rb.dma_start() {
///     Err(Error::InvalidState) => { /* not configured yet */ }
///     Err(Error::Device(e)) => { /* driver refused, e.status() */ }
///     Err(Error::Lock(LockError::AlreadyLocked)) => { /* retry later */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Empty storage, capacity too small or zero-length request
    InvalidArgument,
    /// Backing storage could not be allocated
    AllocationFailure,
    /// Guard misuse
    Lock(LockError),
    /// Operation not legal in the current mode or DMA state
    InvalidState,
    /// DMA collaborator reported a failure
    Device(DeviceError),
    /// Polling helper gave up before the condition was met
    Timeout,
}

impl Error {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Error::InvalidArgument => "invalid argument",
            Error::AllocationFailure => "allocation failure",
            Error::Lock(e) => e.as_str(),
            Error::InvalidState => "invalid state for operation",
            Error::Device(_) => "device error",
            Error::Timeout => "operation timed out",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Lock(e) => write!(f, "lock: {}", e.as_str()),
            Error::Device(e) => write!(f, "device: {e}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl From<LockError> for Error {
    fn from(e: LockError) -> Self {
        Error::Lock(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::Device(e)
    }
}

/// Result type alias for ring buffer operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for lock operations
pub type LockResult<T> = core::result::Result<T, LockError>;

/// Result type alias for DMA collaborator calls
pub type DeviceResult<T> = core::result::Result<T, DeviceError>;

// =============================================================================
// Unit Tests
// =============================================================================
