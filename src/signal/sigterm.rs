// CLASSIFICATION: COMMUNITY
// Filename: sigterm.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Cooperative shutdown flag polled by long-running loops.

use std::io;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use libc::c_int;
use log::info;

use crate::efi::{EfiError, EfiResult};

/// `IsSigTermSignaled`: shared, clonable shutdown request.
#[derive(Clone, Debug, Default)]
pub struct SigTermFlag(Arc<AtomicBool>);

impl SigTermFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_signaled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, signaled: bool) {
        self.0.store(signaled, Ordering::Release);
    }
}

static HOOKED_FLAG: AtomicPtr<AtomicBool> = AtomicPtr::new(ptr::null_mut());

extern "C" fn on_sigterm(_signum: c_int) {
    let flag = HOOKED_FLAG.load(Ordering::Acquire);
    if !flag.is_null() {
        // SAFETY: the pointer holds a strong count until the hook is dropped.
        unsafe { (*flag).store(true, Ordering::Release) };
    }
}

/// Routes the process SIGTERM to a [`SigTermFlag`] while alive.
#[derive(Debug)]
pub struct SigTermHook {
    flag: *const AtomicBool,
}

// The raw pointer is an owned Arc strong count.
unsafe impl Send for SigTermHook {}
unsafe impl Sync for SigTermHook {}

impl SigTermHook {
    /// Install the hook. Only one hook can be live per process.
    pub fn install(flag: &SigTermFlag) -> EfiResult<Self> {
        let raw = Arc::into_raw(Arc::clone(&flag.0));
        if HOOKED_FLAG
            .compare_exchange(ptr::null_mut(), raw as *mut AtomicBool, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // SAFETY: `raw` came from Arc::into_raw just above.
            drop(unsafe { Arc::from_raw(raw) });
            return Err(EfiError::AlreadyStarted);
        }
        let hook = Self { flag: raw };
        // SAFETY: the action is zero-initialised and points at a plain handler.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_sigterm as usize;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(libc::SIGTERM, &action, ptr::null_mut()) != 0 {
                return Err(EfiError::from(io::Error::last_os_error()));
            }
        }
        info!("SIGTERM hooked to shutdown flag");
        Ok(hook)
    }
}

impl Drop for SigTermHook {
    fn drop(&mut self) {
        // SAFETY: restoring the default disposition is always valid.
        unsafe { libc::signal(libc::SIGTERM, libc::SIG_DFL) };
        let _ = HOOKED_FLAG.compare_exchange(
            self.flag as *mut AtomicBool,
            ptr::null_mut(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        // SAFETY: `flag` is the strong count taken in `install`.
        drop(unsafe { Arc::from_raw(self.flag) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = SigTermFlag::new();
        let seen = flag.clone();
        assert!(!seen.is_signaled());
        flag.set(true);
        assert!(seen.is_signaled());
        seen.set(false);
        assert!(!flag.is_signaled());
    }
}
