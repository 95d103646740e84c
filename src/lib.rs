// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v1.1
// Date Modified: 2026-10-19
// Author: Lukas Bower

//! Host side of the emulator: fault signals re-dispatched into firmware
//! callbacks, and the PRM Dispatch mailbox with its IPC front end.

/// EFI status codes, error taxonomy and GUIDs
pub mod efi;

/// Fault-signal bridge, machine contexts and the shutdown flag
pub mod signal;

/// PRM dispatch mailbox, handshake and bus service
pub mod prmd;

/// Daemon configuration
pub mod config;

/// CLI interface for the `emu-prmd` daemon
pub mod cli;

pub use efi::{EfiError, EfiResult, EfiStatus, Guid};
