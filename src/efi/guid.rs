// CLASSIFICATION: COMMUNITY
// Filename: guid.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! EFI GUIDs in canonical `8-4-4-4-12` text form and their 16-byte
//! in-memory layout.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use uuid::Uuid;

use super::status::EfiError;

/// Byte length of a GUID in EFI memory layout.
pub const GUID_SIZE: usize = 16;

const TEXT_LEN: usize = 36;

/// `EFI_GUID`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Guid(Uuid);

/// Why a GUID string was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuidParseError {
    #[error("guid must be 36 characters, got {0}")]
    Length(usize),
    #[error("malformed guid: {0}")]
    Malformed(#[from] uuid::Error),
}

impl From<GuidParseError> for EfiError {
    fn from(_: GuidParseError) -> Self {
        EfiError::InvalidParameter
    }
}

impl Guid {
    /// Build a GUID from its fields.
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self(Uuid::from_fields(data1, data2, data3, &data4))
    }

    /// `(data1, data2, data3, data4)`.
    pub fn as_fields(&self) -> (u32, u16, u16, [u8; 8]) {
        let (data1, data2, data3, data4) = self.0.as_fields();
        (data1, data2, data3, *data4)
    }

    /// Serialise to the EFI in-memory layout (little-endian integer fields).
    pub fn to_bytes(&self) -> [u8; GUID_SIZE] {
        self.0.to_bytes_le()
    }

    /// Inverse of [`Guid::to_bytes`].
    pub fn from_bytes(bytes: &[u8; GUID_SIZE]) -> Self {
        Self(Uuid::from_bytes_le(*bytes))
    }
}

impl From<Uuid> for Guid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for Guid {
    type Err = GuidParseError;

    /// Only the hyphenated `8-4-4-4-12` form is accepted; braced, URN and
    /// simple forms are rejected.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.len() != TEXT_LEN {
            return Err(GuidParseError::Length(text.len()));
        }
        Ok(Self(Uuid::try_parse(text)?))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}
