// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! EFI value types shared by the signal bridge and the PRM dispatch service.

pub mod guid;
pub mod status;

pub use guid::{Guid, GuidParseError, GUID_SIZE};
pub use status::{EfiError, EfiResult, EfiStatus};

/// Only instance 0 of a host thunk exists.
pub(crate) fn check_single_instance(instance: usize) -> EfiResult<()> {
    if instance != 0 {
        return Err(EfiError::NotFound);
    }
    Ok(())
}
