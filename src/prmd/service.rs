// CLASSIFICATION: COMMUNITY
// Filename: service.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! PRM dispatch method contracts, independent of the bus binding.
//!
//! Every method produces a reply. Failures are encoded with
//! [`EfiStatus::to_wire`] next to empty or zero result fields.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use super::handshake::PrmdServiceThunk;
use super::message::{HandlerDebugInfo, PrmdRequest, PrmdResponse};
use super::producer::PrmdProducer;
use crate::efi::{EfiError, EfiResult, EfiStatus, Guid};

/// Version reported through the `Version` bus property.
pub const PRM_DISPATCH_API_VERSION: &str = "0.1";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumerateReply {
    pub status: u32,
    pub handler_info: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvokeHandlerReply {
    pub parameter_buffer: Vec<u8>,
    pub handler_status: u32,
    pub status: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebugInfoReply {
    pub acpi_parameter_buffer: Vec<u8>,
    pub handler_name: String,
    pub status: u32,
}

fn wire(err: EfiError) -> u32 {
    err.status().to_wire()
}

fn parse_guid(text: &str) -> EfiResult<Guid> {
    text.parse::<Guid>().map_err(|err| {
        warn!("rejecting handler guid {:?}: {}", text, err);
        EfiError::from(err)
    })
}

/// The PRM dispatch service exported on the bus.
#[derive(Debug, Clone)]
pub struct PrmdService {
    producer: PrmdProducer,
}

impl PrmdService {
    pub fn new(thunk: Arc<PrmdServiceThunk>, response_timeout: Option<Duration>) -> Self {
        Self {
            producer: PrmdProducer::new(thunk, response_timeout),
        }
    }

    pub fn thunk(&self) -> &Arc<PrmdServiceThunk> {
        self.producer.thunk()
    }

    pub fn api_version(&self) -> &'static str {
        PRM_DISPATCH_API_VERSION
    }

    /// `InstallPrmPackage(ay ParameterBuffer) -> (u Status)`.
    pub fn install_prm_package(&self, package: &[u8]) -> u32 {
        if package.is_empty() {
            warn!("InstallPrmPackage: empty package");
            return wire(EfiError::InvalidParameter);
        }
        let request = PrmdRequest::InstallPackage {
            package: package.to_vec(),
        };
        match self.producer.round_trip(&request) {
            Ok(_) => {
                info!("InstallPrmPackage: installed {} bytes", package.len());
                EfiStatus::SUCCESS.to_wire()
            }
            Err(err) => wire(err),
        }
    }

    /// `EnumerateHandlers() -> (u Status, a{ss} HandlerInfo)`; not implemented.
    pub fn enumerate_handlers(&self) -> EnumerateReply {
        EnumerateReply {
            status: wire(EfiError::Unsupported),
            handler_info: HashMap::new(),
        }
    }

    /// `InvokeHandler(s HandlerGuid, ay ParameterBuffer) -> (ay, u HandlerStatus, u Status)`.
    pub fn invoke_handler(&self, handler_guid: &str, parameters: &[u8]) -> InvokeHandlerReply {
        match self.try_invoke(handler_guid, parameters) {
            Ok(reply) => reply,
            Err(err) => InvokeHandlerReply {
                status: wire(err),
                ..Default::default()
            },
        }
    }

    fn try_invoke(&self, handler_guid: &str, parameters: &[u8]) -> EfiResult<InvokeHandlerReply> {
        let guid = parse_guid(handler_guid)?;
        if parameters.is_empty() {
            warn!("InvokeHandler {}: empty parameter buffer", guid);
            return Err(EfiError::InvalidParameter);
        }
        let request = PrmdRequest::InvokeHandler {
            guid,
            parameters: parameters.to_vec(),
        };
        // the payload is returned whatever status the consumer wrote
        match self.producer.exchange(&request)? {
            (
                status,
                PrmdResponse::Invoke {
                    handler_status,
                    parameters,
                },
            ) => Ok(InvokeHandlerReply {
                parameter_buffer: parameters,
                handler_status: handler_status.to_wire(),
                status: status.to_wire(),
            }),
            (status, _) if status.is_error() => Err(EfiError::from_status(status)),
            _ => Err(EfiError::DeviceError),
        }
    }

    /// `UninstallPrmModule(s ModuleGuid) -> (u Status)`; not implemented.
    pub fn uninstall_prm_module(&self, _module_guid: &str) -> u32 {
        wire(EfiError::Unsupported)
    }

    /// `GetHandlerDebugInfo(s HandlerGuid) -> (ay AcpiParameterBuffer, s HandlerName, u Status)`.
    pub fn get_handler_debug_info(&self, handler_guid: &str) -> DebugInfoReply {
        match self.try_debug_info(handler_guid) {
            Ok(info) => DebugInfoReply {
                acpi_parameter_buffer: info.acpi_parameter_buffer,
                handler_name: info.handler_name,
                status: EfiStatus::SUCCESS.to_wire(),
            },
            Err(err) => DebugInfoReply {
                status: wire(err),
                ..Default::default()
            },
        }
    }

    fn try_debug_info(&self, handler_guid: &str) -> EfiResult<HandlerDebugInfo> {
        let guid = parse_guid(handler_guid)?;
        match self.producer.round_trip(&PrmdRequest::GetHandlerDebugInfo { guid })? {
            PrmdResponse::DebugInfo(info) => Ok(info),
            _ => Err(EfiError::DeviceError),
        }
    }
}
