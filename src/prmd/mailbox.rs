// CLASSIFICATION: COMMUNITY
// Filename: mailbox.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! The single shared PRM dispatch mailbox.
//!
//! One fixed-size region: a [`PrmdHeader`] followed by the payload bytes.
//! All access goes through [`Mailbox::acquire`].

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::efi::{EfiError, EfiResult, EfiStatus};

/// Default mailbox size, header included.
pub const PRMD_MAILBOX_SIZE: usize = 4096;
/// Smallest mailbox accepted by [`Mailbox::new`].
pub const PRMD_MAILBOX_MIN_SIZE: usize = 64;
/// Bytes taken by the header.
pub const PRMD_HEADER_SIZE: usize = mem::size_of::<PrmdHeader>();

/// Mailbox header, native endian.
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct PrmdHeader {
    /// Function code, 1..=5.
    pub function: u64,
    /// Dispatch status written by the consumer.
    pub status: u64,
    /// Stamped by the producer on every request.
    pub request_sequence: u64,
    /// Copied from `request_sequence` by the consumer when it answers.
    pub answered_sequence: u64,
}

#[derive(Debug)]
struct Region {
    header: PrmdHeader,
    payload: Box<[u8]>,
}

#[derive(Debug)]
pub struct Mailbox {
    region: Mutex<Region>,
    size: usize,
    acquisitions: AtomicU64,
}

impl Mailbox {
    pub fn new(size: usize) -> EfiResult<Self> {
        if size < PRMD_MAILBOX_MIN_SIZE {
            return Err(EfiError::InvalidParameter);
        }
        Ok(Self {
            region: Mutex::new(Region {
                header: PrmdHeader::new_zeroed(),
                payload: vec![0u8; size - PRMD_HEADER_SIZE].into_boxed_slice(),
            }),
            size,
            acquisitions: AtomicU64::new(0),
        })
    }

    /// `AcquireMailbox`.
    pub fn acquire(&self) -> EfiResult<MailboxGuard<'_>> {
        let guard = self.region.lock()?;
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Ok(MailboxGuard { region: guard })
    }

    /// Non-blocking acquire; a held mailbox reports `AlreadyStarted`.
    pub fn try_acquire(&self) -> EfiResult<MailboxGuard<'_>> {
        let guard = match self.region.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(EfiError::AlreadyStarted),
            Err(TryLockError::Poisoned(err)) => return Err(err.into()),
        };
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        Ok(MailboxGuard { region: guard })
    }

    /// Number of successful acquisitions so far.
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    /// Region size, header included.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn payload_capacity(&self) -> usize {
        self.size - PRMD_HEADER_SIZE
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self {
            region: Mutex::new(Region {
                header: PrmdHeader::new_zeroed(),
                payload: vec![0u8; PRMD_MAILBOX_SIZE - PRMD_HEADER_SIZE].into_boxed_slice(),
            }),
            size: PRMD_MAILBOX_SIZE,
            acquisitions: AtomicU64::new(0),
        }
    }
}

/// Exclusive view of the mailbox; dropping it is `ReleaseMailbox`.
pub struct MailboxGuard<'a> {
    region: MutexGuard<'a, Region>,
}

impl MailboxGuard<'_> {
    /// Zero-fill header and payload.
    pub fn clear(&mut self) {
        self.region.header = PrmdHeader::new_zeroed();
        self.region.payload.fill(0);
    }

    pub fn header(&self) -> &PrmdHeader {
        &self.region.header
    }

    pub fn function(&self) -> usize {
        self.region.header.function as usize
    }

    pub fn set_function(&mut self, function: usize) {
        self.region.header.function = function as u64;
    }

    pub fn status(&self) -> EfiStatus {
        EfiStatus(self.region.header.status as usize)
    }

    pub fn set_status(&mut self, status: EfiStatus) {
        self.region.header.status = status.0 as u64;
    }

    pub fn request_sequence(&self) -> u64 {
        self.region.header.request_sequence
    }

    pub fn set_request_sequence(&mut self, sequence: u64) {
        self.region.header.request_sequence = sequence;
    }

    pub fn answered_sequence(&self) -> u64 {
        self.region.header.answered_sequence
    }

    /// Stamp the current request as answered.
    pub fn mark_answered(&mut self) {
        self.region.header.answered_sequence = self.region.header.request_sequence;
    }

    pub fn payload(&self) -> &[u8] {
        &self.region.payload
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.region.payload
    }

    /// `ReleaseMailbox`.
    pub fn release(self) -> EfiResult<()> {
        drop(self);
        Ok(())
    }
}
