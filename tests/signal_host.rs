// CLASSIFICATION: COMMUNITY
// Filename: signal_host.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Exercises the real process dispositions. Serialised: signal handlers are
//! process-wide.

#![cfg(all(target_os = "linux", target_arch = "x86_64"))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use emu_host::efi::EfiError;
use emu_host::signal::{
    LibcInstaller, SigTermFlag, SigTermHook, SignalBridge, SignalHandler, SignalInfo, SignalInstaller, SignalNumber,
    EMU_SIGBUS, EMU_SIGSEGV,
};
use serial_test::serial;

static HITS: AtomicUsize = AtomicUsize::new(0);
static LAST_SIGNAL: AtomicUsize = AtomicUsize::new(0);
static LAST_CODE: AtomicUsize = AtomicUsize::new(usize::MAX);

fn recording_handler() -> Option<Arc<dyn SignalHandler>> {
    let handler: Arc<dyn SignalHandler> = Arc::new(|sig: SignalNumber, info: &mut SignalInfo| {
        HITS.fetch_add(1, Ordering::SeqCst);
        LAST_SIGNAL.store(sig.raw(), Ordering::SeqCst);
        LAST_CODE.store(info.code, Ordering::SeqCst);
    });
    Some(handler)
}

#[test]
#[serial]
fn raised_signal_reaches_registered_handler() {
    let _ = env_logger::builder().is_test(true).try_init();
    HITS.store(0, Ordering::SeqCst);
    let bridge = SignalBridge::open(0).unwrap();
    assert!(bridge.is_attached());
    bridge.register(EMU_SIGBUS, recording_handler()).unwrap();

    // SAFETY: the trampoline returns normally for a raised (non-fault) signal.
    assert_eq!(unsafe { libc::raise(libc::SIGBUS) }, 0);

    assert_eq!(HITS.load(Ordering::SeqCst), 1);
    assert_eq!(LAST_SIGNAL.load(Ordering::SeqCst), EMU_SIGBUS);
    // raise() reports SI_TKILL, which has no abstract reason code
    assert_eq!(LAST_CODE.load(Ordering::SeqCst), 0);
    bridge.unregister(EMU_SIGBUS).unwrap();
}

#[test]
#[serial]
fn only_one_host_bridge() {
    let first = SignalBridge::host().unwrap();
    assert_eq!(SignalBridge::host().err(), Some(EfiError::AlreadyStarted));
    drop(first);
    let again = SignalBridge::host().unwrap();
    assert!(again.is_attached());
}

#[test]
#[serial]
fn unregistered_slot_ignores_other_signals() {
    HITS.store(0, Ordering::SeqCst);
    let bridge = SignalBridge::host().unwrap();
    bridge.register(EMU_SIGSEGV, recording_handler()).unwrap();
    bridge.register(EMU_SIGBUS, recording_handler()).unwrap();
    bridge.unregister(EMU_SIGBUS).unwrap();
    assert!(!bridge.is_registered(EMU_SIGBUS));

    // SAFETY: SIGSEGV is routed to the trampoline, which returns normally.
    assert_eq!(unsafe { libc::raise(libc::SIGSEGV) }, 0);
    assert_eq!(HITS.load(Ordering::SeqCst), 1);
    assert_eq!(LAST_SIGNAL.load(Ordering::SeqCst), EMU_SIGSEGV);
}

#[test]
#[serial]
fn sigterm_hook_raises_shutdown_flag() {
    let flag = SigTermFlag::new();
    let hook = SigTermHook::install(&flag).unwrap();
    assert_eq!(SigTermHook::install(&flag).err(), Some(EfiError::AlreadyStarted));
    assert!(!flag.is_signaled());

    // SAFETY: SIGTERM is hooked to a handler that only stores a flag.
    assert_eq!(unsafe { libc::raise(libc::SIGTERM) }, 0);
    assert!(flag.is_signaled());
    drop(hook);
}

#[test]
#[serial]
fn fault_disposition_blocks_timer_tick() {
    LibcInstaller.install(libc::SIGBUS).unwrap();
    // SAFETY: a null new action only queries; `old` is written by the kernel.
    let old = unsafe {
        let mut old: libc::sigaction = std::mem::zeroed();
        assert_eq!(libc::sigaction(libc::SIGBUS, std::ptr::null(), &mut old), 0);
        old
    };
    assert_ne!(old.sa_flags & libc::SA_SIGINFO, 0);
    // SAFETY: `old.sa_mask` is an initialised set returned by the kernel.
    assert_eq!(unsafe { libc::sigismember(&old.sa_mask, libc::SIGALRM) }, 1);
    LibcInstaller.restore_default(libc::SIGBUS).unwrap();
}
