// CLASSIFICATION: COMMUNITY
// Filename: bridge.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Fault-signal registration and dispatch.
//!
//! A [`SignalBridge`] owns one handler slot per fault signal. Registering the
//! first handler for a signal installs the process trampoline for it;
//! re-registering only swaps the stored handler. Dispatch translates the
//! native signal, snapshots the machine context, runs the handler and always
//! commits the snapshot back before the OS resumes the faulting thread.
//!
//! Handler cells are published through atomic pointers so the trampoline can
//! read them without taking a lock. A replaced cell is retired and freed once
//! no dispatch is in flight; until then it waits on the retired list and is
//! swept by the next registration change.

use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use libc::c_int;
use log::{debug, info, warn};

use super::abi::{abstract_to_native, native_to_abstract, AbstractSignal, FaultSlot, SignalNumber};
use super::context::{capture_context, commit_context, NativeContext, SystemContext};
use super::trampoline::LibcInstaller;
use crate::efi::{check_single_instance, EfiError, EfiResult};

/// Fault details handed to a handler. The handler may edit `context`; the
/// edited registers are what the faulting thread resumes with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalInfo {
    /// Abstract reason code, 0 when the native code has no equivalent.
    pub code: usize,
    /// Faulting address reported by the OS.
    pub address: usize,
    pub context: SystemContext,
}

/// Callback run from the signal trampoline.
///
/// Runs in async-signal context: implementations must not block, allocate or
/// take locks shared with ordinary code.
pub trait SignalHandler: Send + Sync {
    fn handle(&self, signal: SignalNumber, info: &mut SignalInfo);
}

impl<F> SignalHandler for F
where
    F: Fn(SignalNumber, &mut SignalInfo) + Send + Sync,
{
    fn handle(&self, signal: SignalNumber, info: &mut SignalInfo) {
        self(signal, info)
    }
}

/// OS disposition control for one native signal.
pub trait SignalInstaller: Send + Sync {
    /// Route `signum` to the fault trampoline.
    fn install(&self, signum: c_int) -> EfiResult<()>;
    /// Put back the default disposition for `signum`.
    fn restore_default(&self, signum: c_int) -> EfiResult<()>;
}

struct HandlerCell {
    handler: Arc<dyn SignalHandler>,
}

struct BridgeInner {
    slots: [AtomicPtr<HandlerCell>; 3],
    /// Dispatches currently between loading a cell and returning.
    active: AtomicUsize,
    retired: Mutex<Vec<Box<HandlerCell>>>,
    registration: Mutex<()>,
    installer: Box<dyn SignalInstaller>,
}

impl BridgeInner {
    fn slot(&self, slot: FaultSlot) -> &AtomicPtr<HandlerCell> {
        &self.slots[slot.index()]
    }

    #[cfg(test)]
    fn retired_len(&self) -> usize {
        self.retired.lock().map(|list| list.len()).unwrap_or(0)
    }

    /// Queue `cell`, which must already be unpublished, and free every queued
    /// cell if no dispatch is in flight.
    fn retire(&self, cell: *mut HandlerCell) -> EfiResult<()> {
        let mut retired = self.retired.lock()?;
        if !cell.is_null() {
            // SAFETY: cells are only ever created by Box::into_raw in `register`
            // and removed from their slot exactly once before reaching here.
            retired.push(unsafe { Box::from_raw(cell) });
        }
        // A dispatch entering after this load sees the slots as they are now,
        // so nothing on the list can still be reached.
        if self.active.load(Ordering::SeqCst) == 0 && !retired.is_empty() {
            debug!("reclaiming {} retired signal handlers", retired.len());
            retired.clear();
        }
        Ok(())
    }

    fn dispatch(
        &self,
        signum: c_int,
        si_code: c_int,
        address: usize,
        native: &mut NativeContext<'_>,
    ) -> bool {
        let Ok(translated) = native_to_abstract(signum, si_code) else {
            return false;
        };
        self.active.fetch_add(1, Ordering::SeqCst);
        let handled = self.dispatch_to(translated, address, native);
        self.active.fetch_sub(1, Ordering::SeqCst);
        handled
    }

    fn dispatch_to(&self, translated: AbstractSignal, address: usize, native: &mut NativeContext<'_>) -> bool {
        let cell = self.slot(translated.slot).load(Ordering::SeqCst);
        if cell.is_null() {
            return false;
        }
        // SAFETY: `active` is raised, so `retire` keeps this cell allocated
        // even if it is swapped out while the handler runs.
        let handler = unsafe { &(*cell).handler };
        let mut info = SignalInfo {
            code: translated.code,
            address,
            context: capture_context(native),
        };
        handler.handle(translated.signal, &mut info);
        commit_context(&info.context, native).is_ok()
    }
}

impl Drop for BridgeInner {
    fn drop(&mut self) {
        for slot in &self.slots {
            let cell = slot.swap(ptr::null_mut(), Ordering::AcqRel);
            if !cell.is_null() {
                // SAFETY: see `retire`.
                drop(unsafe { Box::from_raw(cell) });
            }
        }
    }
}

static ACTIVE_BRIDGE: AtomicPtr<BridgeInner> = AtomicPtr::new(ptr::null_mut());

/// Trampoline calls currently holding a pointer taken from `ACTIVE_BRIDGE`.
static TRAMPOLINE_ACTIVE: AtomicUsize = AtomicUsize::new(0);

/// How long a dropping host bridge waits for running trampolines to leave.
const DETACH_DRAIN_LIMIT: Duration = Duration::from_millis(100);

/// Dispatch a native fault to the bridge currently attached to the process
/// trampoline. Returns `false` when nothing handled it.
pub(crate) fn dispatch_active(
    signum: c_int,
    si_code: c_int,
    address: usize,
    native: &mut NativeContext<'_>,
) -> bool {
    TRAMPOLINE_ACTIVE.fetch_add(1, Ordering::SeqCst);
    let inner = ACTIVE_BRIDGE.load(Ordering::SeqCst);
    let handled = if inner.is_null() {
        false
    } else {
        // SAFETY: a dropping bridge clears the pointer and then waits for
        // TRAMPOLINE_ACTIVE to reach zero before freeing it.
        unsafe { (*inner).dispatch(signum, si_code, address, native) }
    };
    TRAMPOLINE_ACTIVE.fetch_sub(1, Ordering::SeqCst);
    handled
}

/// Spin until no trampoline holds an attached-bridge pointer, or `limit` passes.
fn drain_trampolines(limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while TRAMPOLINE_ACTIVE.load(Ordering::SeqCst) != 0 {
        if Instant::now() >= deadline {
            return false;
        }
        thread::yield_now();
    }
    true
}

/// Owner of the three fault-signal handler slots.
pub struct SignalBridge {
    inner: ManuallyDrop<Box<BridgeInner>>,
    attached: bool,
}

impl SignalBridge {
    /// Bridge driving a caller-provided installer. It is not attached to the
    /// process trampoline; faults reach it only through [`dispatch_native`].
    ///
    /// [`dispatch_native`]: SignalBridge::dispatch_native
    pub fn with_installer<I>(installer: I) -> Self
    where
        I: SignalInstaller + 'static,
    {
        Self {
            inner: ManuallyDrop::new(Box::new(BridgeInner {
                slots: Default::default(),
                active: AtomicUsize::new(0),
                retired: Mutex::new(Vec::new()),
                registration: Mutex::new(()),
                installer: Box::new(installer),
            })),
            attached: false,
        }
    }

    /// Bridge bound to the real process signal dispositions. Only one may be
    /// alive at a time; a second returns `AlreadyStarted`.
    pub fn host() -> EfiResult<Self> {
        let mut bridge = Self::with_installer(LibcInstaller);
        let target: *mut BridgeInner = &mut **bridge.inner;
        ACTIVE_BRIDGE
            .compare_exchange(ptr::null_mut(), target, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EfiError::AlreadyStarted)?;
        bridge.attached = true;
        info!("signal bridge attached to process trampoline");
        Ok(bridge)
    }

    /// Thunk-style open: instance 0 is the host bridge, anything else is `NotFound`.
    pub fn open(instance: usize) -> EfiResult<Self> {
        check_single_instance(instance)?;
        Self::host()
    }

    /// Register `handler` for an abstract fault signal.
    pub fn register(&self, signal: usize, handler: Option<Arc<dyn SignalHandler>>) -> EfiResult<()> {
        let handler = handler.ok_or(EfiError::InvalidParameter)?;
        let (native, slot) = abstract_to_native(signal)?;
        let _guard = self.inner.registration.lock()?;

        let cell = Box::into_raw(Box::new(HandlerCell { handler }));
        let previous = self.inner.slot(slot).swap(cell, Ordering::SeqCst);
        if !previous.is_null() {
            debug!("replacing handler for signal {}", signal);
            return self.inner.retire(previous);
        }

        if let Err(err) = self.inner.installer.install(native) {
            warn!("installing trampoline for native signal {} failed: {}", native, err);
            let ours = self.inner.slot(slot).swap(ptr::null_mut(), Ordering::SeqCst);
            self.inner.retire(ours)?;
            return Err(EfiError::DeviceError);
        }
        info!("registered handler for signal {} (native {})", signal, native);
        self.inner.retire(ptr::null_mut())
    }

    /// Drop the handler for an abstract fault signal and restore the OS default.
    pub fn unregister(&self, signal: usize) -> EfiResult<()> {
        let (native, slot) = abstract_to_native(signal)?;
        let _guard = self.inner.registration.lock()?;
        if self.inner.slot(slot).load(Ordering::Acquire).is_null() {
            return Err(EfiError::InvalidParameter);
        }
        if let Err(err) = self.inner.installer.restore_default(native) {
            warn!("restoring default for native signal {} failed: {}", native, err);
            return Err(EfiError::DeviceError);
        }
        let cell = self.inner.slot(slot).swap(ptr::null_mut(), Ordering::SeqCst);
        self.inner.retire(cell)?;
        info!("unregistered handler for signal {}", signal);
        Ok(())
    }

    /// Whether a handler is stored for `signal`.
    pub fn is_registered(&self, signal: usize) -> bool {
        abstract_to_native(signal)
            .map(|(_, slot)| !self.inner.slot(slot).load(Ordering::Acquire).is_null())
            .unwrap_or(false)
    }

    /// Whether this bridge receives faults from the process trampoline.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Dispatch a native fault as the trampoline would. Returns `true` when a
    /// handler ran and its snapshot was committed.
    pub fn dispatch_native(
        &self,
        signum: c_int,
        si_code: c_int,
        address: usize,
        native: &mut NativeContext<'_>,
    ) -> bool {
        self.inner.dispatch(signum, si_code, address, native)
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        // No new fault may reach the trampoline once the defaults are back.
        for slot in FaultSlot::ALL {
            if self.inner.slot(slot).load(Ordering::Acquire).is_null() {
                continue;
            }
            if let Err(err) = self.inner.installer.restore_default(slot.native()) {
                warn!("restoring default for native signal {} failed: {}", slot.native(), err);
            }
        }
        if self.attached {
            let ours: *mut BridgeInner = &mut **self.inner;
            let _ = ACTIVE_BRIDGE.compare_exchange(ours, ptr::null_mut(), Ordering::SeqCst, Ordering::SeqCst);
            if !drain_trampolines(DETACH_DRAIN_LIMIT) {
                // a handler is still running, possibly on this thread
                warn!("signal trampoline still busy after {:?}; leaking bridge state", DETACH_DRAIN_LIMIT);
                return;
            }
        }
        // SAFETY: `inner` is not touched again, and nothing else can reach it.
        unsafe { ManuallyDrop::drop(&mut self.inner) };
    }
}
