// CLASSIFICATION: COMMUNITY
// Filename: abi.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Abstract signal numbers and reason codes seen by firmware callbacks, and
//! the translation to and from the host's native numbering.
//!
//! The abstract values are part of the callback ABI and never change with
//! the host OS.

use libc::c_int;

use crate::efi::{EfiError, EfiResult};

/// Illegal instruction.
pub const EMU_SIGILL: usize = 4;
/// Incorrect memory access.
pub const EMU_SIGBUS: usize = 7;
/// Invalid memory reference.
pub const EMU_SIGSEGV: usize = 11;
/// Terminate process.
pub const EMU_SIGTERM: usize = 15;

/// Illegal opcode.
pub const EMU_ILL_ILLOPC: usize = 1;
/// Invalid address alignment.
pub const EMU_BUS_ADRALN: usize = 1;
/// Invalid permissions for mapped object.
pub const EMU_SEGV_ACCERR: usize = 2;

// POSIX si_code values, identical on Linux and Darwin.
const NATIVE_ILL_ILLOPC: c_int = 1;
const NATIVE_BUS_ADRALN: c_int = 1;
const NATIVE_SEGV_ACCERR: c_int = 2;

/// Abstract signal kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum SignalNumber {
    IllegalInstruction = EMU_SIGILL,
    BusError = EMU_SIGBUS,
    SegmentationViolation = EMU_SIGSEGV,
    Terminate = EMU_SIGTERM,
}

impl SignalNumber {
    /// Decode an abstract signal number.
    pub fn from_raw(raw: usize) -> Option<Self> {
        match raw {
            EMU_SIGILL => Some(Self::IllegalInstruction),
            EMU_SIGBUS => Some(Self::BusError),
            EMU_SIGSEGV => Some(Self::SegmentationViolation),
            EMU_SIGTERM => Some(Self::Terminate),
            _ => None,
        }
    }

    /// Abstract wire value.
    pub const fn raw(self) -> usize {
        self as usize
    }
}

/// Handler slot owned by one of the three fault signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultSlot {
    Ill,
    Bus,
    Segv,
}

impl FaultSlot {
    /// All slots in table order.
    pub const ALL: [FaultSlot; 3] = [FaultSlot::Ill, FaultSlot::Bus, FaultSlot::Segv];

    /// Position in per-slot arrays.
    pub const fn index(self) -> usize {
        match self {
            FaultSlot::Ill => 0,
            FaultSlot::Bus => 1,
            FaultSlot::Segv => 2,
        }
    }

    /// Native signal number served by this slot.
    pub fn native(self) -> c_int {
        FAULT_TABLE[self.index()].native
    }

    /// Abstract signal served by this slot.
    pub fn signal(self) -> SignalNumber {
        FAULT_TABLE[self.index()].signal
    }
}

struct FaultMapping {
    signal: SignalNumber,
    native: c_int,
    native_code: c_int,
    code: usize,
    slot: FaultSlot,
}

const FAULT_TABLE: [FaultMapping; 3] = [
    FaultMapping {
        signal: SignalNumber::IllegalInstruction,
        native: libc::SIGILL,
        native_code: NATIVE_ILL_ILLOPC,
        code: EMU_ILL_ILLOPC,
        slot: FaultSlot::Ill,
    },
    FaultMapping {
        signal: SignalNumber::BusError,
        native: libc::SIGBUS,
        native_code: NATIVE_BUS_ADRALN,
        code: EMU_BUS_ADRALN,
        slot: FaultSlot::Bus,
    },
    FaultMapping {
        signal: SignalNumber::SegmentationViolation,
        native: libc::SIGSEGV,
        native_code: NATIVE_SEGV_ACCERR,
        code: EMU_SEGV_ACCERR,
        slot: FaultSlot::Segv,
    },
];

/// Result of translating a native signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AbstractSignal {
    pub signal: SignalNumber,
    /// Abstract reason code; 0 when the native code has no abstract equivalent.
    pub code: usize,
    pub slot: FaultSlot,
}

/// Map an abstract fault signal to the native signal and its handler slot.
///
/// Only the three fault kinds are accepted; anything else is
/// `InvalidParameter`.
pub fn abstract_to_native(signal: usize) -> EfiResult<(c_int, FaultSlot)> {
    FAULT_TABLE
        .iter()
        .find(|m| m.signal.raw() == signal)
        .map(|m| (m.native, m.slot))
        .ok_or(EfiError::InvalidParameter)
}

/// Map a native signal and `si_code` to the abstract model.
///
/// Unknown signals are `InvalidParameter`. Unknown reason codes degrade to 0.
pub fn native_to_abstract(signum: c_int, si_code: c_int) -> EfiResult<AbstractSignal> {
    let mapping = FAULT_TABLE
        .iter()
        .find(|m| m.native == signum)
        .ok_or(EfiError::InvalidParameter)?;
    let code = if si_code == mapping.native_code { mapping.code } else { 0 };
    Ok(AbstractSignal {
        signal: mapping.signal,
        code,
        slot: mapping.slot,
    })
}
