// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Per-architecture processor snapshots handed to signal callbacks.
//!
//! Each architecture mirrors the host's native signal frame layout and
//! provides a lossless capture/commit pair: capturing a frame and committing
//! the unmodified snapshot leaves the frame byte-identical.

pub mod arm;
pub mod ia32;
pub mod x64;

pub use arm::{ArmContext, ArmNativeContext};
pub use ia32::{Ia32Context, Ia32NativeContext};
pub use x64::{X64Context, X64NativeContext};

use crate::efi::{EfiError, EfiResult};

/// Capture and commit between a native frame and its abstract snapshot.
pub trait MachineContext: Sized + Default {
    type Native;

    fn capture(native: &Self::Native) -> Self;
    fn commit(&self, native: &mut Self::Native);

    fn program_counter(&self) -> u64;
    fn set_program_counter(&mut self, pc: u64);
    fn stack_pointer(&self) -> u64;
    /// Write the architectural return-value register.
    fn set_return_value(&mut self, value: u64);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    Arm,
    Ia32,
    X64,
}

impl Arch {
    /// Architecture of the running host, if supported.
    pub const fn host() -> Option<Arch> {
        if cfg!(target_arch = "x86_64") {
            Some(Arch::X64)
        } else if cfg!(target_arch = "x86") {
            Some(Arch::Ia32)
        } else if cfg!(target_arch = "arm") {
            Some(Arch::Arm)
        } else {
            None
        }
    }
}

/// Architecture-tagged snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemContext {
    Arm(ArmContext),
    Ia32(Ia32Context),
    X64(X64Context),
}

macro_rules! each_arch {
    ($ctx:expr, $c:ident => $body:expr) => {
        match $ctx {
            SystemContext::Arm($c) => $body,
            SystemContext::Ia32($c) => $body,
            SystemContext::X64($c) => $body,
        }
    };
}

impl SystemContext {
    pub fn arch(&self) -> Arch {
        match self {
            SystemContext::Arm(_) => Arch::Arm,
            SystemContext::Ia32(_) => Arch::Ia32,
            SystemContext::X64(_) => Arch::X64,
        }
    }

    pub fn program_counter(&self) -> u64 {
        each_arch!(self, c => c.program_counter())
    }

    pub fn set_program_counter(&mut self, pc: u64) {
        each_arch!(self, c => c.set_program_counter(pc))
    }

    pub fn stack_pointer(&self) -> u64 {
        each_arch!(self, c => c.stack_pointer())
    }

    pub fn set_return_value(&mut self, value: u64) {
        each_arch!(self, c => c.set_return_value(value))
    }
}

/// Borrowed native frame of a known architecture.
#[derive(Debug)]
pub enum NativeContext<'a> {
    Arm(&'a mut ArmNativeContext),
    Ia32(&'a mut Ia32NativeContext),
    X64(&'a mut X64NativeContext),
}

impl NativeContext<'_> {
    pub fn arch(&self) -> Arch {
        match self {
            NativeContext::Arm(_) => Arch::Arm,
            NativeContext::Ia32(_) => Arch::Ia32,
            NativeContext::X64(_) => Arch::X64,
        }
    }
}

/// Snapshot a native frame.
pub fn capture_context(native: &NativeContext<'_>) -> SystemContext {
    match native {
        NativeContext::Arm(n) => SystemContext::Arm(ArmContext::capture(n)),
        NativeContext::Ia32(n) => SystemContext::Ia32(Ia32Context::capture(n)),
        NativeContext::X64(n) => SystemContext::X64(X64Context::capture(n)),
    }
}

/// Write a snapshot back into a native frame of the same architecture.
pub fn commit_context(ctx: &SystemContext, native: &mut NativeContext<'_>) -> EfiResult<()> {
    match (ctx, native) {
        (SystemContext::Arm(c), NativeContext::Arm(n)) => c.commit(n),
        (SystemContext::Ia32(c), NativeContext::Ia32(n)) => c.commit(n),
        (SystemContext::X64(c), NativeContext::X64(n)) => c.commit(n),
        _ => return Err(EfiError::InvalidParameter),
    }
    Ok(())
}
