// CLASSIFICATION: COMMUNITY
// Filename: signal_bridge.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use emu_host::efi::{EfiError, EfiResult};
use emu_host::signal::context::{ia32, x64, ArmNativeContext, Ia32NativeContext, X64NativeContext};
use emu_host::signal::{
    NativeContext, SignalBridge, SignalHandler, SignalInfo, SignalInstaller, SignalNumber, EMU_SIGBUS,
    EMU_SIGILL, EMU_SIGSEGV,
};
use libc::c_int;

#[derive(Clone, Default)]
struct CountingInstaller {
    installs: Arc<AtomicUsize>,
    restores: Arc<AtomicUsize>,
    fail_install: Arc<AtomicBool>,
    fail_restore: Arc<AtomicBool>,
}

impl SignalInstaller for CountingInstaller {
    fn install(&self, _signum: c_int) -> EfiResult<()> {
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(EfiError::InvalidParameter);
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn restore_default(&self, _signum: c_int) -> EfiResult<()> {
        if self.fail_restore.load(Ordering::SeqCst) {
            return Err(EfiError::InvalidParameter);
        }
        self.restores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn tagging_handler(tag: usize, last: &Arc<AtomicUsize>) -> Option<Arc<dyn SignalHandler>> {
    let last = Arc::clone(last);
    let handler: Arc<dyn SignalHandler> = Arc::new(move |_: SignalNumber, _: &mut SignalInfo| {
        last.store(tag, Ordering::SeqCst);
    });
    Some(handler)
}

#[test]
fn reregistration_replaces_handler_without_reinstalling() {
    let installer = CountingInstaller::default();
    let bridge = SignalBridge::with_installer(installer.clone());
    let last = Arc::new(AtomicUsize::new(0));

    bridge.register(EMU_SIGSEGV, tagging_handler(1, &last)).unwrap();
    bridge.register(EMU_SIGSEGV, tagging_handler(2, &last)).unwrap();
    assert_eq!(installer.installs.load(Ordering::SeqCst), 1);

    let mut frame = X64NativeContext::default();
    assert!(bridge.dispatch_native(libc::SIGSEGV, 2, 0x1000, &mut NativeContext::X64(&mut frame)));
    assert_eq!(last.load(Ordering::SeqCst), 2);
}

#[test]
fn reregistration_skips_a_failing_os_call() {
    let installer = CountingInstaller::default();
    let bridge = SignalBridge::with_installer(installer.clone());
    let last = Arc::new(AtomicUsize::new(0));
    bridge.register(EMU_SIGILL, tagging_handler(1, &last)).unwrap();

    installer.fail_install.store(true, Ordering::SeqCst);
    bridge.register(EMU_SIGILL, tagging_handler(2, &last)).unwrap();
    assert_eq!(bridge.register(EMU_SIGBUS, tagging_handler(3, &last)), Err(EfiError::DeviceError));
    assert!(!bridge.is_registered(EMU_SIGBUS));
}

#[test]
fn unregister_state_machine() {
    let installer = CountingInstaller::default();
    let bridge = SignalBridge::with_installer(installer.clone());
    let last = Arc::new(AtomicUsize::new(0));

    assert_eq!(bridge.unregister(EMU_SIGBUS), Err(EfiError::InvalidParameter));
    bridge.register(EMU_SIGBUS, tagging_handler(1, &last)).unwrap();
    bridge.unregister(EMU_SIGBUS).unwrap();
    assert_eq!(bridge.unregister(EMU_SIGBUS), Err(EfiError::InvalidParameter));
    assert_eq!(installer.restores.load(Ordering::SeqCst), 1);

    // after unregistering, a fault reaches nobody
    let mut frame = X64NativeContext::default();
    assert!(!bridge.dispatch_native(libc::SIGBUS, 1, 0, &mut NativeContext::X64(&mut frame)));
    assert_eq!(last.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_restore_keeps_handler() {
    let installer = CountingInstaller::default();
    let bridge = SignalBridge::with_installer(installer.clone());
    let last = Arc::new(AtomicUsize::new(0));
    bridge.register(EMU_SIGSEGV, tagging_handler(1, &last)).unwrap();

    installer.fail_restore.store(true, Ordering::SeqCst);
    assert_eq!(bridge.unregister(EMU_SIGSEGV), Err(EfiError::DeviceError));
    assert!(bridge.is_registered(EMU_SIGSEGV));
    installer.fail_restore.store(false, Ordering::SeqCst);
}

#[test]
fn handler_redirects_execution() {
    let bridge = SignalBridge::with_installer(CountingInstaller::default());
    let handler: Arc<dyn SignalHandler> = Arc::new(|sig: SignalNumber, info: &mut SignalInfo| {
        assert_eq!(sig, SignalNumber::IllegalInstruction);
        assert_eq!(info.code, 1);
        // skip the faulting 2-byte opcode and report success in the return register
        let pc = info.context.program_counter();
        info.context.set_program_counter(pc + 2);
        info.context.set_return_value(0);
    });
    bridge.register(EMU_SIGILL, Some(handler)).unwrap();

    let mut frame = X64NativeContext::default();
    frame.gregs[x64::REG_RIP] = 0x40_0000;
    frame.gregs[x64::REG_RAX] = 0xFFFF;
    assert!(bridge.dispatch_native(libc::SIGILL, 1, 0x40_0000, &mut NativeContext::X64(&mut frame)));
    assert_eq!(frame.gregs[x64::REG_RIP], 0x40_0002);
    assert_eq!(frame.gregs[x64::REG_RAX], 0);
}

#[test]
fn dispatch_is_architecture_neutral() {
    let bridge = SignalBridge::with_installer(CountingInstaller::default());
    let seen = Arc::new(AtomicUsize::new(0));
    let seen_in = Arc::clone(&seen);
    let handler: Arc<dyn SignalHandler> = Arc::new(move |_: SignalNumber, info: &mut SignalInfo| {
        seen_in.store(info.context.stack_pointer() as usize, Ordering::SeqCst);
    });
    bridge.register(EMU_SIGSEGV, Some(handler)).unwrap();

    let mut arm = ArmNativeContext {
        arm_sp: 0x7000,
        ..Default::default()
    };
    assert!(bridge.dispatch_native(libc::SIGSEGV, 2, 0, &mut NativeContext::Arm(&mut arm)));
    assert_eq!(seen.load(Ordering::SeqCst), 0x7000);

    let mut frame = Ia32NativeContext::default();
    frame.gregs[ia32::REG_ESP] = 0x6000;
    let before = frame;
    assert!(bridge.dispatch_native(libc::SIGSEGV, 1, 0, &mut NativeContext::Ia32(&mut frame)));
    assert_eq!(seen.load(Ordering::SeqCst), 0x6000);
    assert_eq!(frame, before);
}

#[test]
fn only_instance_zero_opens() {
    assert_eq!(SignalBridge::open(3).err(), Some(EfiError::NotFound));
}
