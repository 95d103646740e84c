// CLASSIFICATION: COMMUNITY
// Filename: status.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! EFI status words, the error taxonomy used across the crate and the
//! 32-bit wire encoding handed to IPC callers.
//!
//! Internal operations return [`EfiResult`]. Anything leaving the process
//! (D-Bus replies) goes through [`EfiStatus::to_wire`] first.

use std::fmt;
use std::io;

use thiserror::Error;

/// Native-width status bit marking an error.
const MAX_BIT: usize = 1 << (usize::BITS - 1);

const WIRE_ERROR_BIT: u32 = 0x8000_0000;
const WIRE_OEM_BIT: u32 = 0x4000_0000;
const WIRE_PI_BIT: u32 = 0x2000_0000;
const WIRE_MANTISSA: u32 = 0x1FFF_FFFF;

/// Raw EFI status word, native width like `UINTN`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct EfiStatus(pub usize);

impl EfiStatus {
    /// `EFI_SUCCESS`.
    pub const SUCCESS: Self = Self(0);
    /// `EFI_LOAD_ERROR`.
    pub const LOAD_ERROR: Self = Self::error(1);
    /// `EFI_INVALID_PARAMETER`.
    pub const INVALID_PARAMETER: Self = Self::error(2);
    /// `EFI_UNSUPPORTED`.
    pub const UNSUPPORTED: Self = Self::error(3);
    /// `EFI_BAD_BUFFER_SIZE`.
    pub const BAD_BUFFER_SIZE: Self = Self::error(4);
    /// `EFI_BUFFER_TOO_SMALL`.
    pub const BUFFER_TOO_SMALL: Self = Self::error(5);
    /// `EFI_NOT_READY`.
    pub const NOT_READY: Self = Self::error(6);
    /// `EFI_DEVICE_ERROR`.
    pub const DEVICE_ERROR: Self = Self::error(7);
    /// `EFI_OUT_OF_RESOURCES`.
    pub const OUT_OF_RESOURCES: Self = Self::error(9);
    /// `EFI_NOT_FOUND`.
    pub const NOT_FOUND: Self = Self::error(14);
    /// `EFI_TIMEOUT`.
    pub const TIMEOUT: Self = Self::error(18);
    /// `EFI_ALREADY_STARTED`.
    pub const ALREADY_STARTED: Self = Self::error(20);
    /// `EFI_ABORTED`.
    pub const ABORTED: Self = Self::error(21);

    /// Build an error status from its mantissa.
    pub const fn error(code: usize) -> Self {
        Self(MAX_BIT | code)
    }

    /// True when the error bit is set.
    pub const fn is_error(self) -> bool {
        self.0 & MAX_BIT != 0
    }

    /// Encode into the 32-bit status reported to IPC callers.
    ///
    /// Bit 31 carries the error flag, bit 30 the OEM namespace, bit 29 the
    /// PI namespace and bits 28..0 the mantissa.
    pub fn to_wire(self) -> u32 {
        let mut wire = 0u32;
        if self.0 & MAX_BIT != 0 {
            wire |= WIRE_ERROR_BIT;
        }
        if self.0 & (MAX_BIT >> 1) != 0 {
            wire |= WIRE_OEM_BIT;
        }
        if self.0 & (MAX_BIT >> 2) != 0 {
            wire |= WIRE_PI_BIT;
        }
        wire | (self.0 as u32 & WIRE_MANTISSA)
    }

    /// Expand a wire status back to native width.
    pub fn from_wire(wire: u32) -> Self {
        let mut raw = (wire & WIRE_MANTISSA) as usize;
        if wire & WIRE_ERROR_BIT != 0 {
            raw |= MAX_BIT;
        }
        if wire & WIRE_OEM_BIT != 0 {
            raw |= MAX_BIT >> 1;
        }
        if wire & WIRE_PI_BIT != 0 {
            raw |= MAX_BIT >> 2;
        }
        Self(raw)
    }

    /// Convert into a `Result`, keeping unknown error codes intact.
    pub fn to_result(self) -> EfiResult<()> {
        if self.is_error() {
            Err(EfiError::from_status(self))
        } else {
            Ok(())
        }
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::SUCCESS => "EFI_SUCCESS",
            Self::LOAD_ERROR => "EFI_LOAD_ERROR",
            Self::INVALID_PARAMETER => "EFI_INVALID_PARAMETER",
            Self::UNSUPPORTED => "EFI_UNSUPPORTED",
            Self::BAD_BUFFER_SIZE => "EFI_BAD_BUFFER_SIZE",
            Self::BUFFER_TOO_SMALL => "EFI_BUFFER_TOO_SMALL",
            Self::NOT_READY => "EFI_NOT_READY",
            Self::DEVICE_ERROR => "EFI_DEVICE_ERROR",
            Self::OUT_OF_RESOURCES => "EFI_OUT_OF_RESOURCES",
            Self::NOT_FOUND => "EFI_NOT_FOUND",
            Self::TIMEOUT => "EFI_TIMEOUT",
            Self::ALREADY_STARTED => "EFI_ALREADY_STARTED",
            Self::ABORTED => "EFI_ABORTED",
            _ => return None,
        })
    }
}

impl fmt::Debug for EfiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "EfiStatus({:#x})", self.0),
        }
    }
}

impl fmt::Display for EfiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Failure classes surfaced by the signal bridge and the PRM dispatch mailbox.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EfiError {
    /// Malformed input, unknown signal or GUID, empty buffer.
    #[error("invalid parameter")]
    InvalidParameter,
    /// Catch-all for unimplemented methods and untranslated OS errors.
    #[error("unsupported")]
    Unsupported,
    /// A payload does not fit in the mailbox.
    #[error("bad buffer size")]
    BadBufferSize,
    /// Nothing on the other side answered.
    #[error("not ready")]
    NotReady,
    /// An OS primitive failed.
    #[error("device error")]
    DeviceError,
    /// Allocation or thread creation failed.
    #[error("out of resources")]
    OutOfResources,
    /// No such handler, instance or protocol.
    #[error("not found")]
    NotFound,
    /// A lock or wait primitive timed out.
    #[error("timeout")]
    Timeout,
    /// The lock was already held.
    #[error("already started")]
    AlreadyStarted,
    /// Deadlock, recursive lock or poisoned lock.
    #[error("aborted")]
    Aborted,
    /// Any other error status, carried verbatim.
    #[error("{0}")]
    Other(EfiStatus),
}

/// Result alias used throughout the crate.
pub type EfiResult<T> = Result<T, EfiError>;

/// OS errno to status translation. First match wins; anything missing is
/// `Unsupported`.
const ERRNO_TABLE: &[(i32, EfiError)] = &[
    (libc::EINVAL, EfiError::InvalidParameter),
    (libc::ETIMEDOUT, EfiError::Timeout),
    // mutex already locked
    (libc::EBUSY, EfiError::AlreadyStarted),
    (libc::EOPNOTSUPP, EfiError::InvalidParameter),
    (libc::EPERM, EfiError::InvalidParameter),
    (libc::EBADMSG, EfiError::InvalidParameter),
    (libc::ENXIO, EfiError::InvalidParameter),
    // recursive lock limit
    (libc::EAGAIN, EfiError::Aborted),
    (libc::EDEADLK, EfiError::Aborted),
    (libc::ENOMEM, EfiError::OutOfResources),
];

impl EfiError {
    /// Translate an OS error number through the errno table.
    pub fn from_errno(errno: i32) -> Self {
        ERRNO_TABLE
            .iter()
            .find(|(code, _)| *code == errno)
            .map(|(_, err)| *err)
            .unwrap_or(EfiError::Unsupported)
    }

    /// Classify an error status word.
    pub fn from_status(status: EfiStatus) -> Self {
        match status {
            EfiStatus::INVALID_PARAMETER => Self::InvalidParameter,
            EfiStatus::UNSUPPORTED => Self::Unsupported,
            EfiStatus::BAD_BUFFER_SIZE => Self::BadBufferSize,
            EfiStatus::NOT_READY => Self::NotReady,
            EfiStatus::DEVICE_ERROR => Self::DeviceError,
            EfiStatus::OUT_OF_RESOURCES => Self::OutOfResources,
            EfiStatus::NOT_FOUND => Self::NotFound,
            EfiStatus::TIMEOUT => Self::Timeout,
            EfiStatus::ALREADY_STARTED => Self::AlreadyStarted,
            EfiStatus::ABORTED => Self::Aborted,
            other => Self::Other(other),
        }
    }

    /// Status word for this error.
    pub fn status(self) -> EfiStatus {
        match self {
            Self::InvalidParameter => EfiStatus::INVALID_PARAMETER,
            Self::Unsupported => EfiStatus::UNSUPPORTED,
            Self::BadBufferSize => EfiStatus::BAD_BUFFER_SIZE,
            Self::NotReady => EfiStatus::NOT_READY,
            Self::DeviceError => EfiStatus::DEVICE_ERROR,
            Self::OutOfResources => EfiStatus::OUT_OF_RESOURCES,
            Self::NotFound => EfiStatus::NOT_FOUND,
            Self::Timeout => EfiStatus::TIMEOUT,
            Self::AlreadyStarted => EfiStatus::ALREADY_STARTED,
            Self::Aborted => EfiStatus::ABORTED,
            Self::Other(status) => status,
        }
    }
}

impl From<EfiError> for EfiStatus {
    fn from(err: EfiError) -> Self {
        err.status()
    }
}

impl From<io::Error> for EfiError {
    fn from(err: io::Error) -> Self {
        if let Some(errno) = err.raw_os_error() {
            return Self::from_errno(errno);
        }
        match err.kind() {
            io::ErrorKind::TimedOut => Self::Timeout,
            io::ErrorKind::OutOfMemory => Self::OutOfResources,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Self::InvalidParameter,
            io::ErrorKind::WouldBlock => Self::AlreadyStarted,
            _ => Self::Unsupported,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for EfiError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Aborted
    }
}
