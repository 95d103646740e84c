// CLASSIFICATION: COMMUNITY
// Filename: trampoline.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Process-level fault trampoline and its `sigaction` installer.
//!
//! Everything reachable from [`fault_trampoline`] runs in async-signal
//! context: no logging, no allocation, no locks.

use std::io;
use std::ptr;

use libc::{c_int, c_void};

use super::bridge::{dispatch_active, SignalInstaller};
use super::context::NativeContext;
use crate::efi::{EfiError, EfiResult};

/// Installs [`fault_trampoline`] through `sigaction(2)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LibcInstaller;

impl SignalInstaller for LibcInstaller {
    fn install(&self, signum: c_int) -> EfiResult<()> {
        // SAFETY: the action is fully initialised before being handed to the
        // kernel and the trampoline has the SA_SIGINFO signature.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = fault_trampoline as usize;
            action.sa_flags = libc::SA_SIGINFO;
            libc::sigemptyset(&mut action.sa_mask);
            // keep the periodic timer tick out while a fault is being marshalled
            libc::sigaddset(&mut action.sa_mask, libc::SIGALRM);
            if libc::sigaction(signum, &action, ptr::null_mut()) != 0 {
                return Err(EfiError::from(io::Error::last_os_error()));
            }
        }
        Ok(())
    }

    fn restore_default(&self, signum: c_int) -> EfiResult<()> {
        // SAFETY: SIG_DFL is always a valid disposition.
        let previous = unsafe { libc::signal(signum, libc::SIG_DFL) };
        if previous == libc::SIG_ERR {
            return Err(EfiError::from(io::Error::last_os_error()));
        }
        Ok(())
    }
}

extern "C" fn fault_trampoline(signum: c_int, info: *mut libc::siginfo_t, ucontext: *mut c_void) {
    if info.is_null() || ucontext.is_null() {
        return;
    }
    // SAFETY: the kernel hands SA_SIGINFO handlers a valid siginfo and
    // ucontext for the duration of the call.
    unsafe {
        let Some(mut native) = native_frame(ucontext) else {
            return;
        };
        let si_code = (*info).si_code;
        let address = fault_address(info);
        dispatch_active(signum, si_code, address, &mut native);
    }
}

#[cfg(target_os = "linux")]
unsafe fn fault_address(info: *mut libc::siginfo_t) -> usize {
    (*info).si_addr() as usize
}

#[cfg(not(target_os = "linux"))]
unsafe fn fault_address(info: *mut libc::siginfo_t) -> usize {
    (*info).si_addr as usize
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
unsafe fn native_frame<'a>(ucontext: *mut c_void) -> Option<NativeContext<'a>> {
    use super::context::X64NativeContext;
    let uc = ucontext.cast::<libc::ucontext_t>();
    let mc = ptr::addr_of_mut!((*uc).uc_mcontext).cast::<X64NativeContext>();
    Some(NativeContext::X64(&mut *mc))
}

#[cfg(all(target_os = "linux", target_arch = "x86"))]
unsafe fn native_frame<'a>(ucontext: *mut c_void) -> Option<NativeContext<'a>> {
    use super::context::Ia32NativeContext;
    let uc = ucontext.cast::<libc::ucontext_t>();
    let mc = ptr::addr_of_mut!((*uc).uc_mcontext).cast::<Ia32NativeContext>();
    Some(NativeContext::Ia32(&mut *mc))
}

#[cfg(all(target_os = "linux", target_arch = "arm"))]
unsafe fn native_frame<'a>(ucontext: *mut c_void) -> Option<NativeContext<'a>> {
    use super::context::ArmNativeContext;
    let uc = ucontext.cast::<libc::ucontext_t>();
    let mc = ptr::addr_of_mut!((*uc).uc_mcontext).cast::<ArmNativeContext>();
    Some(NativeContext::Arm(&mut *mc))
}

// Frame layouts are only mirrored for Linux; elsewhere faults fall through.
#[cfg(not(all(
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "x86", target_arch = "arm")
)))]
unsafe fn native_frame<'a>(_ucontext: *mut c_void) -> Option<NativeContext<'a>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restoring_default_on_invalid_signal_fails() {
        let installer = LibcInstaller;
        assert!(installer.restore_default(-1).is_err());
        assert!(installer.install(libc::SIGKILL).is_err());
    }
}
