// CLASSIFICATION: COMMUNITY
// Filename: producer.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Request side of the mailbox protocol.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error};

use super::handshake::PrmdServiceThunk;
use super::mailbox::MailboxGuard;
use super::message::{PrmdFunction, PrmdRequest, PrmdResponse};
use crate::efi::{EfiError, EfiResult, EfiStatus};

/// Posts requests into the mailbox and waits for the consumer's answer.
#[derive(Debug, Clone)]
pub struct PrmdProducer {
    thunk: Arc<PrmdServiceThunk>,
    response_timeout: Option<Duration>,
}

impl PrmdProducer {
    /// `response_timeout = None` waits for the consumer forever.
    pub fn new(thunk: Arc<PrmdServiceThunk>, response_timeout: Option<Duration>) -> Self {
        Self {
            thunk,
            response_timeout,
        }
    }

    pub fn thunk(&self) -> &Arc<PrmdServiceThunk> {
        &self.thunk
    }

    /// One full round trip. A non-success status written by the consumer
    /// comes back as the matching `EfiError`.
    pub fn round_trip(&self, request: &PrmdRequest) -> EfiResult<PrmdResponse> {
        let (status, response) = self.exchange(request)?;
        if status.is_error() {
            debug!("{:?}: consumer reported {}", request.function(), status);
            return Err(EfiError::from_status(status));
        }
        Ok(response)
    }

    /// One full round trip returning the consumer's status next to whatever
    /// payload it left, including on an error status. `Err` only when the
    /// protocol itself failed.
    pub fn exchange(&self, request: &PrmdRequest) -> EfiResult<(EfiStatus, PrmdResponse)> {
        let function = request.function();
        if request.encoded_len() > self.thunk.mailbox().payload_capacity() {
            error!("{:?}: payload of {} bytes does not fit the mailbox", function, request.encoded_len());
            return Err(EfiError::BadBufferSize);
        }
        let _in_flight = self.thunk.begin_request()?;
        let sequence = self.thunk.next_sequence();

        let mut mailbox = self.thunk.acquire_mailbox().map_err(|err| {
            error!("{:?}: failed to acquire mailbox: {}", function, err);
            err
        })?;
        if self.thunk.discard_stale_response() {
            debug!("{:?}: discarded response left by an abandoned request", function);
        }
        mailbox.clear();
        request.encode(&mut mailbox).map_err(|err| {
            error!("{:?}: failed to write request: {}", function, err);
            err
        })?;
        mailbox.set_request_sequence(sequence);
        self.thunk.release_mailbox(mailbox).map_err(|err| {
            error!("{:?}: failed to release mailbox: {}", function, err);
            err
        })?;

        self.thunk.signal_message_is_ready();
        let mailbox = self.await_answer(function, sequence)?;
        let status = mailbox.status();
        let decoded = PrmdResponse::decode(function, &mailbox);
        self.thunk.release_mailbox(mailbox)?;
        match decoded {
            Ok(response) => Ok((status, response)),
            // an error answer may leave no readable payload
            Err(_) if status.is_error() => Ok((status, PrmdResponse::Empty)),
            Err(err) => {
                error!("{:?}: unreadable response: {}", function, err);
                Err(err)
            }
        }
    }

    /// Wait until the mailbox holds the answer to `sequence`. Wake-ups left by
    /// an earlier, abandoned request are skipped.
    fn await_answer(&self, function: PrmdFunction, sequence: u64) -> EfiResult<MailboxGuard<'_>> {
        let deadline = self.response_timeout.map(|limit| Instant::now() + limit);
        loop {
            let remaining = deadline.map(|at| at.saturating_duration_since(Instant::now()));
            self.thunk.wait_for_response(remaining).map_err(|err| {
                error!("{:?}: failed waiting for response: {}", function, err);
                err
            })?;
            let mailbox = self.thunk.acquire_mailbox().map_err(|err| {
                error!("{:?}: failed to reacquire mailbox: {}", function, err);
                err
            })?;
            if mailbox.answered_sequence() == sequence {
                return Ok(mailbox);
            }
            debug!(
                "{:?}: ignoring wake-up for request {} while waiting on {}",
                function,
                mailbox.answered_sequence(),
                sequence
            );
            self.thunk.release_mailbox(mailbox)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn oversize_payload_never_touches_mailbox() {
        let thunk = Arc::new(PrmdServiceThunk::new(64).unwrap());
        let producer = PrmdProducer::new(Arc::clone(&thunk), None);
        let request = PrmdRequest::InstallPackage {
            package: vec![1; 64],
        };
        assert_eq!(producer.round_trip(&request), Err(EfiError::BadBufferSize));
        assert_eq!(thunk.mailbox().acquisitions(), 0);
    }

    #[test]
    fn absent_consumer_times_out_when_bounded() {
        let thunk = Arc::new(PrmdServiceThunk::open(0).unwrap());
        let producer = PrmdProducer::new(thunk, Some(Duration::from_millis(20)));
        assert_eq!(
            producer.round_trip(&PrmdRequest::EnumerateHandlers),
            Err(EfiError::Timeout)
        );
    }

    #[test]
    fn consumer_status_becomes_error() {
        let thunk = Arc::new(PrmdServiceThunk::open(0).unwrap());
        let consumer = {
            let thunk = Arc::clone(&thunk);
            thread::spawn(move || {
                thunk.wait_for_message().unwrap();
                let mut guard = thunk.acquire_mailbox().unwrap();
                guard.set_status(EfiStatus::NOT_FOUND);
                guard.mark_answered();
                thunk.release_mailbox(guard).unwrap();
                thunk.message_response_ready();
            })
        };
        let producer = PrmdProducer::new(thunk, Some(Duration::from_secs(5)));
        let guid = "11111111-2222-3333-4444-555555555555".parse().unwrap();
        assert_eq!(
            producer.round_trip(&PrmdRequest::UninstallModule { guid }),
            Err(EfiError::NotFound)
        );
        consumer.join().unwrap();
    }
}
