// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Host fault signals re-dispatched into firmware callbacks.

pub mod abi;
pub mod bridge;
pub mod context;
pub mod sigterm;
pub mod trampoline;

pub use abi::{
    abstract_to_native, native_to_abstract, AbstractSignal, FaultSlot, SignalNumber, EMU_BUS_ADRALN,
    EMU_ILL_ILLOPC, EMU_SEGV_ACCERR, EMU_SIGBUS, EMU_SIGILL, EMU_SIGSEGV, EMU_SIGTERM,
};
pub use bridge::{SignalBridge, SignalHandler, SignalInfo, SignalInstaller};
pub use context::{capture_context, commit_context, Arch, MachineContext, NativeContext, SystemContext};
pub use sigterm::{SigTermFlag, SigTermHook};
pub use trampoline::LibcInstaller;
