// CLASSIFICATION: COMMUNITY
// Filename: handshake.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Ready flags and the mailbox thunk shared by producer and consumer.
//!
//! Each direction is a capacity-1 channel carrying a unit token. Signalling
//! a set flag is a no-op, and waking from a wait consumes the token, so a
//! flag is level-triggered and cleared on wake.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::trace;

use super::mailbox::{Mailbox, MailboxGuard, PRMD_MAILBOX_SIZE};
use crate::efi::{check_single_instance, EfiError, EfiResult};

#[derive(Debug)]
pub struct ReadyFlag {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ReadyFlag {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Set the flag and wake one waiter. Best effort, never fails.
    pub fn signal(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {}
        }
    }

    /// Block until set, then clear.
    pub fn wait(&self) -> EfiResult<()> {
        self.rx.recv().map_err(|_| EfiError::Aborted)
    }

    /// Like [`wait`](Self::wait) with an upper bound; expiry is `Timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> EfiResult<()> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => EfiError::Timeout,
            RecvTimeoutError::Disconnected => EfiError::Aborted,
        })
    }

    pub fn is_set(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Drop a pending token without waiting. Returns whether one was set.
    pub fn clear(&self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

impl Default for ReadyFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The PRM dispatch service thunk: the mailbox plus its two ready flags.
///
/// Shared between the IPC worker (producer) and the firmware thread
/// (consumer), typically behind an `Arc`.
#[derive(Debug)]
pub struct PrmdServiceThunk {
    mailbox: Mailbox,
    message_ready: ReadyFlag,
    response_ready: ReadyFlag,
    in_flight: Mutex<()>,
    sequence: AtomicU64,
}

impl PrmdServiceThunk {
    pub fn new(mailbox_size: usize) -> EfiResult<Self> {
        Ok(Self {
            mailbox: Mailbox::new(mailbox_size)?,
            message_ready: ReadyFlag::new(),
            response_ready: ReadyFlag::new(),
            in_flight: Mutex::new(()),
            sequence: AtomicU64::new(0),
        })
    }

    /// Instance 0 with the default mailbox; other instances are `NotFound`.
    pub fn open(instance: usize) -> EfiResult<Self> {
        check_single_instance(instance)?;
        Self::new(PRMD_MAILBOX_SIZE)
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn acquire_mailbox(&self) -> EfiResult<MailboxGuard<'_>> {
        self.mailbox.acquire()
    }

    pub fn release_mailbox(&self, guard: MailboxGuard<'_>) -> EfiResult<()> {
        guard.release()
    }

    /// Consumer: block until a request is posted.
    pub fn wait_for_message(&self) -> EfiResult<()> {
        self.message_ready.wait()
    }

    /// Consumer: bounded variant used by polling loops.
    pub fn wait_for_message_timeout(&self, timeout: Duration) -> EfiResult<()> {
        self.message_ready.wait_timeout(timeout)
    }

    /// Consumer: the response is in the mailbox.
    pub fn message_response_ready(&self) {
        trace!("response ready");
        self.response_ready.signal();
    }

    /// Producer: a request is in the mailbox.
    pub fn signal_message_is_ready(&self) {
        trace!("message ready");
        self.message_ready.signal();
    }

    /// Producer: block for the response, optionally bounded.
    pub fn wait_for_response(&self, timeout: Option<Duration>) -> EfiResult<()> {
        match timeout {
            Some(limit) => self.response_ready.wait_timeout(limit),
            None => self.response_ready.wait(),
        }
    }

    /// Drop a response left over from an abandoned (timed out) request.
    pub(crate) fn discard_stale_response(&self) -> bool {
        self.response_ready.clear()
    }

    /// Fresh request sequence number; never 0, which marks "unanswered".
    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1).max(1)
    }

    /// Hold for a whole producer round trip; requests carry no correlation id.
    pub(crate) fn begin_request(&self) -> EfiResult<MutexGuard<'_, ()>> {
        Ok(self.in_flight.lock()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn flag_is_level_triggered() {
        let flag = ReadyFlag::new();
        flag.signal();
        flag.signal();
        assert!(flag.is_set());
        flag.wait().unwrap();
        assert!(!flag.is_set());
        assert_eq!(flag.wait_timeout(Duration::from_millis(10)), Err(EfiError::Timeout));
    }

    #[test]
    fn clear_consumes_pending_token() {
        let flag = ReadyFlag::new();
        assert!(!flag.clear());
        flag.signal();
        assert!(flag.clear());
        assert!(!flag.is_set());
    }

    #[test]
    fn sequence_numbers_are_fresh_and_nonzero() {
        let thunk = PrmdServiceThunk::open(0).unwrap();
        let first = thunk.next_sequence();
        assert_ne!(first, 0);
        assert_ne!(thunk.next_sequence(), first);
    }

    #[test]
    fn only_instance_zero_opens() {
        assert!(PrmdServiceThunk::open(0).is_ok());
        assert_eq!(PrmdServiceThunk::open(1).err(), Some(EfiError::NotFound));
    }

    #[test]
    fn wakes_across_threads() {
        let thunk = Arc::new(PrmdServiceThunk::open(0).unwrap());
        let consumer = {
            let thunk = Arc::clone(&thunk);
            thread::spawn(move || {
                thunk.wait_for_message().unwrap();
                let mut guard = thunk.acquire_mailbox().unwrap();
                let function = guard.function();
                guard.set_function(function + 1);
                thunk.release_mailbox(guard).unwrap();
                thunk.message_response_ready();
            })
        };
        let mut guard = thunk.acquire_mailbox().unwrap();
        guard.set_function(41);
        thunk.release_mailbox(guard).unwrap();
        thunk.signal_message_is_ready();
        thunk.wait_for_response(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(thunk.acquire_mailbox().unwrap().function(), 42);
        consumer.join().unwrap();
    }

    #[test]
    fn bounded_response_wait_times_out() {
        let thunk = PrmdServiceThunk::open(0).unwrap();
        assert_eq!(
            thunk.wait_for_response(Some(Duration::from_millis(20))),
            Err(EfiError::Timeout)
        );
    }
}
