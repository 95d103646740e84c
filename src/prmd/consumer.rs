// CLASSIFICATION: COMMUNITY
// Filename: consumer.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Firmware side of the mailbox protocol.
//!
//! [`MailboxConsumer`] waits for a posted request, hands it to a
//! [`PrmDispatcher`], copies the result back into the mailbox and signals
//! the producer. Every request gets a status, including ones that fail to
//! decode.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::handshake::PrmdServiceThunk;
use super::message::{HandlerDebugInfo, PrmdRequest, PrmdResponse};
use crate::efi::{EfiError, EfiResult, EfiStatus, Guid};
use crate::signal::SigTermFlag;

/// Firmware services reachable through the mailbox.
pub trait PrmDispatcher: Send {
    fn install_package(&mut self, package: &[u8]) -> EfiResult<()>;

    fn enumerate_handlers(&mut self) -> EfiResult<()> {
        Err(EfiError::Unsupported)
    }

    /// Run a handler over `parameters` in place and return its own status.
    fn invoke_handler(&mut self, guid: &Guid, parameters: &mut [u8]) -> EfiResult<EfiStatus>;

    fn uninstall_module(&mut self, _guid: &Guid) -> EfiResult<()> {
        Err(EfiError::Unsupported)
    }

    fn handler_debug_info(&mut self, guid: &Guid) -> EfiResult<HandlerDebugInfo>;
}

pub struct MailboxConsumer<D> {
    thunk: Arc<PrmdServiceThunk>,
    dispatcher: D,
}

impl<D: PrmDispatcher> MailboxConsumer<D> {
    pub fn new(thunk: Arc<PrmdServiceThunk>, dispatcher: D) -> Self {
        Self { thunk, dispatcher }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Block for one request and answer it.
    pub fn serve_one(&mut self) -> EfiResult<()> {
        self.thunk.wait_for_message()?;
        self.answer()
    }

    /// Answer one request if it arrives within `timeout`. Returns `false` on
    /// an idle timeout.
    pub fn serve_within(&mut self, timeout: Duration) -> EfiResult<bool> {
        match self.thunk.wait_for_message_timeout(timeout) {
            Ok(()) => self.answer().map(|()| true),
            Err(EfiError::Timeout) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Serve until `shutdown` is raised, polling it every `poll`.
    pub fn run(&mut self, shutdown: &SigTermFlag, poll: Duration) -> EfiResult<u64> {
        let mut served = 0;
        while !shutdown.is_signaled() {
            if self.serve_within(poll)? {
                served += 1;
            }
        }
        info!("mailbox consumer stopping after {} requests", served);
        Ok(served)
    }

    fn answer(&mut self) -> EfiResult<()> {
        let mut mailbox = self.thunk.acquire_mailbox()?;
        let outcome = PrmdRequest::decode(&mailbox).and_then(|request| {
            debug!("serving {:?}", request.function());
            dispatch(&mut self.dispatcher, request)
        });
        let status = match outcome.and_then(|response| response.encode(&mut mailbox)) {
            Ok(()) => EfiStatus::SUCCESS,
            Err(err) => {
                warn!("mailbox request failed: {}", err);
                err.status()
            }
        };
        mailbox.set_status(status);
        mailbox.mark_answered();
        // signal before release so no new request can slip in between
        self.thunk.message_response_ready();
        self.thunk.release_mailbox(mailbox)
    }
}

fn dispatch<D: PrmDispatcher>(dispatcher: &mut D, request: PrmdRequest) -> EfiResult<PrmdResponse> {
    Ok(match request {
        PrmdRequest::InstallPackage { package } => {
            dispatcher.install_package(&package)?;
            PrmdResponse::Empty
        }
        PrmdRequest::EnumerateHandlers => {
            dispatcher.enumerate_handlers()?;
            PrmdResponse::Empty
        }
        PrmdRequest::InvokeHandler { guid, mut parameters } => {
            let handler_status = dispatcher.invoke_handler(&guid, &mut parameters)?;
            PrmdResponse::Invoke {
                handler_status,
                parameters,
            }
        }
        PrmdRequest::UninstallModule { guid } => {
            dispatcher.uninstall_module(&guid)?;
            PrmdResponse::Empty
        }
        PrmdRequest::GetHandlerDebugInfo { guid } => PrmdResponse::DebugInfo(dispatcher.handler_debug_info(&guid)?),
    })
}

/// PRM handler body: edits the parameter buffer in place.
pub type PrmHandlerFn = Box<dyn FnMut(&mut [u8]) -> EfiStatus + Send>;

/// Turns an installed package into the handlers it provides.
pub type PackageInstaller = Box<dyn FnMut(&[u8]) -> EfiResult<Vec<PrmHandler>> + Send>;

pub struct PrmHandler {
    pub guid: Guid,
    pub name: String,
    pub acpi_parameter_buffer: Vec<u8>,
    body: PrmHandlerFn,
}

impl PrmHandler {
    pub fn new<F>(guid: Guid, name: impl Into<String>, acpi_parameter_buffer: Vec<u8>, body: F) -> Self
    where
        F: FnMut(&mut [u8]) -> EfiStatus + Send + 'static,
    {
        Self {
            guid,
            name: name.into(),
            acpi_parameter_buffer,
            body: Box::new(body),
        }
    }
}

/// In-memory dispatcher keyed by handler GUID.
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<Guid, PrmHandler>,
    installer: Option<PackageInstaller>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package_installer<F>(installer: F) -> Self
    where
        F: FnMut(&[u8]) -> EfiResult<Vec<PrmHandler>> + Send + 'static,
    {
        Self {
            handlers: HashMap::new(),
            installer: Some(Box::new(installer)),
        }
    }

    /// Add or replace a handler.
    pub fn insert(&mut self, handler: PrmHandler) -> Option<PrmHandler> {
        self.handlers.insert(handler.guid, handler)
    }

    pub fn remove(&mut self, guid: &Guid) -> Option<PrmHandler> {
        self.handlers.remove(guid)
    }

    pub fn contains(&self, guid: &Guid) -> bool {
        self.handlers.contains_key(guid)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl PrmDispatcher for HandlerTable {
    fn install_package(&mut self, package: &[u8]) -> EfiResult<()> {
        if package.is_empty() {
            return Err(EfiError::InvalidParameter);
        }
        let installer = self.installer.as_mut().ok_or(EfiError::Unsupported)?;
        let handlers = installer(package)?;
        for handler in handlers {
            info!("installed PRM handler {} ({})", handler.name, handler.guid);
            self.insert(handler);
        }
        Ok(())
    }

    fn invoke_handler(&mut self, guid: &Guid, parameters: &mut [u8]) -> EfiResult<EfiStatus> {
        let handler = self.handlers.get_mut(guid).ok_or(EfiError::NotFound)?;
        Ok((handler.body)(parameters))
    }

    fn handler_debug_info(&mut self, guid: &Guid) -> EfiResult<HandlerDebugInfo> {
        let handler = self.handlers.get(guid).ok_or(EfiError::NotFound)?;
        Ok(HandlerDebugInfo {
            acpi_parameter_buffer: handler.acpi_parameter_buffer.clone(),
            handler_name: handler.name.clone(),
        })
    }
}
