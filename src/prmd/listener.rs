// CLASSIFICATION: COMMUNITY
// Filename: listener.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! IPC worker thread: drain the bus, wait with a bound, poll for shutdown.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};

use crate::efi::{EfiError, EfiResult};
use crate::signal::SigTermFlag;

/// Default bound on one bus wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Minimal bus surface driven by the message loop.
pub trait BusTransport {
    /// Handle at most one queued request. `Ok(true)` if one was handled.
    fn process(&mut self) -> EfiResult<bool>;

    /// Block until traffic arrives or `timeout` elapses.
    fn wait(&mut self, timeout: Duration) -> EfiResult<()>;
}

/// Run until `shutdown` is raised. Returns the number of requests handled.
pub fn run_message_loop<T>(transport: &mut T, shutdown: &SigTermFlag, timeout: Duration) -> EfiResult<u64>
where
    T: BusTransport + ?Sized,
{
    let mut handled = 0u64;
    loop {
        if transport.process()? {
            handled += 1;
            continue;
        }
        if shutdown.is_signaled() {
            break;
        }
        transport.wait(timeout)?;
    }
    info!("message loop exiting after {} requests", handled);
    Ok(handled)
}

/// Running listener thread.
#[derive(Debug)]
pub struct ListenerHandle {
    thread: JoinHandle<EfiResult<u64>>,
    shutdown: SigTermFlag,
}

impl ListenerHandle {
    /// Ask the loop to stop; it exits within one wait period.
    pub fn shutdown(&self) {
        self.shutdown.set(true);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> EfiResult<u64> {
        self.thread.join().map_err(|_| {
            error!("listener thread panicked");
            EfiError::Aborted
        })?
    }
}

/// Spawn the listener. The transport is built on the worker thread and
/// dropped there when the loop ends.
pub fn start_listener<F, T>(make_transport: F, shutdown: SigTermFlag, timeout: Duration) -> EfiResult<ListenerHandle>
where
    F: FnOnce() -> EfiResult<T> + Send + 'static,
    T: BusTransport,
{
    let flag = shutdown.clone();
    let thread = thread::Builder::new()
        .name("prmd-dbus".into())
        .spawn(move || {
            let mut transport = make_transport().map_err(|err| {
                error!("listener transport setup failed: {}", err);
                err
            })?;
            run_message_loop(&mut transport, &flag, timeout)
        })
        .map_err(|err| {
            error!("failed to spawn listener thread: {}", err);
            match err.raw_os_error() {
                Some(errno) => EfiError::from_errno(errno),
                None => EfiError::OutOfResources,
            }
        })?;
    info!("listener started");
    Ok(ListenerHandle { thread, shutdown })
}
