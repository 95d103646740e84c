// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! PRM dispatch: a single-slot mailbox between an IPC worker and the
//! firmware thread, plus the bus-facing service built on it.

pub mod consumer;
#[cfg(feature = "dbus")]
pub mod dbus;
pub mod handshake;
pub mod listener;
pub mod mailbox;
pub mod message;
pub mod producer;
pub mod service;

pub use consumer::{HandlerTable, MailboxConsumer, PrmDispatcher, PrmHandler};
pub use handshake::{PrmdServiceThunk, ReadyFlag};
pub use listener::{run_message_loop, start_listener, BusTransport, ListenerHandle, DEFAULT_WAIT_TIMEOUT};
pub use mailbox::{Mailbox, MailboxGuard, PRMD_HEADER_SIZE, PRMD_MAILBOX_SIZE};
pub use message::{HandlerDebugInfo, PrmdFunction, PrmdRequest, PrmdResponse, INVOKE_HEADER_SIZE};
pub use producer::PrmdProducer;
pub use service::{DebugInfoReply, EnumerateReply, InvokeHandlerReply, PrmdService, PRM_DISPATCH_API_VERSION};
