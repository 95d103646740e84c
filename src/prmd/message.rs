// CLASSIFICATION: COMMUNITY
// Filename: message.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Function codes and the inline payload formats carried by the mailbox.
//!
//! Payload fields are native-endian like the header. Variable-length data is
//! copied into the mailbox behind a `u32` length, never referenced by pointer.
//!
//! | function | request payload | response payload |
//! |---|---|---|
//! | InstallPackage | `len, bytes` | none |
//! | EnumerateHandlers | none | none |
//! | InvokeHandler | `guid, 0u64, len, params` | `guid, handler_status, len, params` |
//! | UninstallModule | `guid` | none |
//! | GetHandlerDebugInfo | `guid` | `guid, acpi_len, name_len, acpi, name` |

use std::mem;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::mailbox::MailboxGuard;
use crate::efi::{EfiError, EfiResult, EfiStatus, Guid, GUID_SIZE};

/// `InstallPackage` request prefix.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
struct PackageHeader {
    len: u32,
}

/// `UninstallModule` and `GetHandlerDebugInfo` request.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
struct GuidHeader {
    guid: [u8; GUID_SIZE],
}

/// `InvokeHandler` request and response prefix; the parameters follow.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
struct InvokeHeader {
    guid: [u8; GUID_SIZE],
    handler_status: u64,
    len: u32,
}

/// `GetHandlerDebugInfo` response prefix; ACPI bytes then the name follow.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
struct DebugInfoHeader {
    guid: [u8; GUID_SIZE],
    acpi_len: u32,
    name_len: u32,
}

/// Payload bytes taken by the `InvokeHandler` prefix.
pub const INVOKE_HEADER_SIZE: usize = mem::size_of::<InvokeHeader>();

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PrmdFunction {
    InstallPackage = 1,
    EnumerateHandlers = 2,
    InvokeHandler = 3,
    UninstallModule = 4,
    GetHandlerDebugInfo = 5,
}

impl PrmdFunction {
    pub const fn code(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for PrmdFunction {
    type Error = EfiError;

    fn try_from(code: usize) -> EfiResult<Self> {
        Ok(match code {
            1 => Self::InstallPackage,
            2 => Self::EnumerateHandlers,
            3 => Self::InvokeHandler,
            4 => Self::UninstallModule,
            5 => Self::GetHandlerDebugInfo,
            _ => return Err(EfiError::InvalidParameter),
        })
    }
}

/// Request posted by the producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrmdRequest {
    InstallPackage { package: Vec<u8> },
    EnumerateHandlers,
    InvokeHandler { guid: Guid, parameters: Vec<u8> },
    UninstallModule { guid: Guid },
    GetHandlerDebugInfo { guid: Guid },
}

impl PrmdRequest {
    pub fn function(&self) -> PrmdFunction {
        match self {
            Self::InstallPackage { .. } => PrmdFunction::InstallPackage,
            Self::EnumerateHandlers => PrmdFunction::EnumerateHandlers,
            Self::InvokeHandler { .. } => PrmdFunction::InvokeHandler,
            Self::UninstallModule { .. } => PrmdFunction::UninstallModule,
            Self::GetHandlerDebugInfo { .. } => PrmdFunction::GetHandlerDebugInfo,
        }
    }

    /// Payload bytes this request occupies.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::InstallPackage { package } => mem::size_of::<PackageHeader>() + package.len(),
            Self::EnumerateHandlers => 0,
            Self::InvokeHandler { parameters, .. } => INVOKE_HEADER_SIZE + parameters.len(),
            Self::UninstallModule { .. } | Self::GetHandlerDebugInfo { .. } => mem::size_of::<GuidHeader>(),
        }
    }

    /// Write function code and payload into a zero-filled mailbox.
    pub fn encode(&self, mailbox: &mut MailboxGuard<'_>) -> EfiResult<()> {
        if self.encoded_len() > mailbox.payload().len() {
            return Err(EfiError::BadBufferSize);
        }
        mailbox.set_function(self.function().code());
        let payload = mailbox.payload_mut();
        match self {
            Self::InstallPackage { package } => {
                let (header, tail) = prefix_mut::<PackageHeader>(payload)?;
                header.len = wire_len(package.len())?;
                put_tail(tail, package)?;
            }
            Self::EnumerateHandlers => {}
            Self::InvokeHandler { guid, parameters } => {
                let (header, tail) = prefix_mut::<InvokeHeader>(payload)?;
                *header = InvokeHeader {
                    guid: guid.to_bytes(),
                    handler_status: 0,
                    len: wire_len(parameters.len())?,
                };
                put_tail(tail, parameters)?;
            }
            Self::UninstallModule { guid } | Self::GetHandlerDebugInfo { guid } => {
                let (header, _) = prefix_mut::<GuidHeader>(payload)?;
                header.guid = guid.to_bytes();
            }
        }
        Ok(())
    }

    /// Read the request currently in the mailbox.
    pub fn decode(mailbox: &MailboxGuard<'_>) -> EfiResult<Self> {
        let payload = mailbox.payload();
        Ok(match PrmdFunction::try_from(mailbox.function())? {
            PrmdFunction::InstallPackage => {
                let (header, tail) = prefix::<PackageHeader>(payload)?;
                Self::InstallPackage {
                    package: take(tail, header.len)?.to_vec(),
                }
            }
            PrmdFunction::EnumerateHandlers => Self::EnumerateHandlers,
            PrmdFunction::InvokeHandler => {
                let (header, tail) = prefix::<InvokeHeader>(payload)?;
                Self::InvokeHandler {
                    guid: Guid::from_bytes(&header.guid),
                    parameters: take(tail, header.len)?.to_vec(),
                }
            }
            PrmdFunction::UninstallModule => Self::UninstallModule {
                guid: Guid::from_bytes(&prefix::<GuidHeader>(payload)?.0.guid),
            },
            PrmdFunction::GetHandlerDebugInfo => Self::GetHandlerDebugInfo {
                guid: Guid::from_bytes(&prefix::<GuidHeader>(payload)?.0.guid),
            },
        })
    }
}

/// Handler debug information copied out by the consumer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandlerDebugInfo {
    pub acpi_parameter_buffer: Vec<u8>,
    pub handler_name: String,
}

/// Payload half of a response; the dispatch status lives in the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrmdResponse {
    Empty,
    Invoke {
        handler_status: EfiStatus,
        parameters: Vec<u8>,
    },
    DebugInfo(HandlerDebugInfo),
}

impl PrmdResponse {
    /// Write the response payload, keeping the request GUID in place.
    pub fn encode(&self, mailbox: &mut MailboxGuard<'_>) -> EfiResult<()> {
        let payload = mailbox.payload_mut();
        match self {
            Self::Empty => {}
            Self::Invoke {
                handler_status,
                parameters,
            } => {
                let (header, tail) = prefix_mut::<InvokeHeader>(payload)?;
                if parameters.len() > tail.len() {
                    return Err(EfiError::BadBufferSize);
                }
                header.handler_status = handler_status.0 as u64;
                header.len = wire_len(parameters.len())?;
                put_tail(tail, parameters)?;
            }
            Self::DebugInfo(info) => {
                let name = info.handler_name.as_bytes();
                let acpi = &info.acpi_parameter_buffer;
                let (header, tail) = prefix_mut::<DebugInfoHeader>(payload)?;
                if acpi.len() + name.len() > tail.len() {
                    return Err(EfiError::BadBufferSize);
                }
                header.acpi_len = wire_len(acpi.len())?;
                header.name_len = wire_len(name.len())?;
                let (acpi_out, name_out) = tail.split_at_mut(acpi.len());
                acpi_out.copy_from_slice(acpi);
                put_tail(name_out, name)?;
            }
        }
        Ok(())
    }

    /// Read the response payload expected for `function`.
    pub fn decode(function: PrmdFunction, mailbox: &MailboxGuard<'_>) -> EfiResult<Self> {
        let payload = mailbox.payload();
        Ok(match function {
            PrmdFunction::InvokeHandler => {
                let (header, tail) = prefix::<InvokeHeader>(payload)?;
                Self::Invoke {
                    handler_status: EfiStatus(header.handler_status as usize),
                    parameters: take(tail, header.len)?.to_vec(),
                }
            }
            PrmdFunction::GetHandlerDebugInfo => {
                let (header, tail) = prefix::<DebugInfoHeader>(payload)?;
                let acpi = take(tail, header.acpi_len)?;
                let name = take(&tail[acpi.len()..], header.name_len)?;
                Self::DebugInfo(HandlerDebugInfo {
                    acpi_parameter_buffer: acpi.to_vec(),
                    handler_name: String::from_utf8_lossy(name).into_owned(),
                })
            }
            _ => Self::Empty,
        })
    }
}

fn prefix<H>(payload: &[u8]) -> EfiResult<(&H, &[u8])>
where
    H: FromBytes + KnownLayout + Immutable,
{
    H::ref_from_prefix(payload).map_err(|_| EfiError::BadBufferSize)
}

fn prefix_mut<H>(payload: &mut [u8]) -> EfiResult<(&mut H, &mut [u8])>
where
    H: FromBytes + IntoBytes + KnownLayout,
{
    H::mut_from_prefix(payload).map_err(|_| EfiError::BadBufferSize)
}

fn wire_len(len: usize) -> EfiResult<u32> {
    u32::try_from(len).map_err(|_| EfiError::BadBufferSize)
}

fn take(tail: &[u8], len: u32) -> EfiResult<&[u8]> {
    tail.get(..len as usize).ok_or(EfiError::BadBufferSize)
}

fn put_tail(tail: &mut [u8], bytes: &[u8]) -> EfiResult<()> {
    tail.get_mut(..bytes.len())
        .ok_or(EfiError::BadBufferSize)?
        .copy_from_slice(bytes);
    Ok(())
}
