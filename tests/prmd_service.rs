// CLASSIFICATION: COMMUNITY
// Filename: prmd_service.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use emu_host::efi::{EfiResult, EfiStatus, Guid};
use emu_host::prmd::{
    HandlerTable, InvokeHandlerReply, MailboxConsumer, PrmHandler, PrmdService, PrmdServiceThunk,
};
use emu_host::signal::SigTermFlag;

const SMBIOS: &str = "7b9a8c1e-2f3d-4e5a-9b6c-0d1e2f3a4b5c";
const POLL: Duration = Duration::from_millis(20);

struct Stack {
    service: PrmdService,
    shutdown: SigTermFlag,
    consumer: Option<JoinHandle<EfiResult<u64>>>,
}

impl Stack {
    fn start(table: HandlerTable) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let thunk = Arc::new(PrmdServiceThunk::open(0).unwrap());
        let shutdown = SigTermFlag::new();
        let consumer = {
            let thunk = Arc::clone(&thunk);
            let shutdown = shutdown.clone();
            thread::spawn(move || MailboxConsumer::new(thunk, table).run(&shutdown, POLL))
        };
        Self {
            service: PrmdService::new(thunk, Some(Duration::from_secs(10))),
            shutdown,
            consumer: Some(consumer),
        }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        self.shutdown.set(true);
        if let Some(consumer) = self.consumer.take() {
            let _ = consumer.join();
        }
    }
}

fn smbios_table() -> HandlerTable {
    let mut table = HandlerTable::new();
    table.insert(PrmHandler::new(
        SMBIOS.parse().unwrap(),
        "DumpSmbiosHandler",
        vec![0xA0, 0xA1, 0xA2],
        |buffer: &mut [u8]| {
            for byte in buffer.iter_mut() {
                *byte = byte.wrapping_add(1);
            }
            EfiStatus::SUCCESS
        },
    ));
    table
}

#[test]
fn invoke_handler_round_trips_through_consumer() {
    let stack = Stack::start(smbios_table());
    let reply = stack.service.invoke_handler(SMBIOS, &[1, 2, 0xFF]);
    assert_eq!(
        reply,
        InvokeHandlerReply {
            parameter_buffer: vec![2, 3, 0],
            handler_status: 0,
            status: 0,
        }
    );
}

#[test]
fn guid_text_is_case_insensitive() {
    let stack = Stack::start(smbios_table());
    let reply = stack.service.invoke_handler(&SMBIOS.to_uppercase(), &[7]);
    assert_eq!(reply.status, 0);
    assert_eq!(reply.parameter_buffer, vec![8]);
}

#[test]
fn unknown_handler_reports_not_found() {
    let stack = Stack::start(smbios_table());
    let reply = stack
        .service
        .invoke_handler("00000000-0000-0000-0000-000000000001", &[1]);
    assert_eq!(EfiStatus::from_wire(reply.status), EfiStatus::NOT_FOUND);
    // the mailbox still holds the untouched parameters
    assert_eq!(reply.parameter_buffer, vec![1]);
    assert_eq!(reply.handler_status, 0);
}

#[test]
fn handler_status_is_reported_separately() {
    let mut table = HandlerTable::new();
    let guid: Guid = SMBIOS.parse().unwrap();
    table.insert(PrmHandler::new(guid, "Failing", Vec::new(), |_: &mut [u8]| {
        EfiStatus::DEVICE_ERROR
    }));
    let stack = Stack::start(table);
    let reply = stack.service.invoke_handler(SMBIOS, &[0]);
    assert_eq!(reply.status, 0);
    assert_eq!(reply.handler_status, 0x8000_0007);
}

#[test]
fn debug_info_is_copied_out() {
    let stack = Stack::start(smbios_table());
    let reply = stack.service.get_handler_debug_info(SMBIOS);
    assert_eq!(reply.status, 0);
    assert_eq!(reply.handler_name, "DumpSmbiosHandler");
    assert_eq!(reply.acpi_parameter_buffer, vec![0xA0, 0xA1, 0xA2]);
}

#[test]
fn debug_info_with_bad_guid_never_touches_mailbox() {
    let stack = Stack::start(smbios_table());
    let reply = stack.service.get_handler_debug_info("7b9a8c1e-2f3d-4e5a-9b6c-0d1e2f3a4b5");
    assert_eq!(reply.status, EfiStatus::INVALID_PARAMETER.to_wire());
    assert!(reply.acpi_parameter_buffer.is_empty());
    assert!(reply.handler_name.is_empty());
    assert_eq!(stack.service.thunk().mailbox().acquisitions(), 0);
}

#[test]
fn install_package_goes_through_installer() {
    let table = HandlerTable::with_package_installer(|package: &[u8]| {
        let guid = Guid::from_fields(u32::from(package[0]), 0, 0, [0; 8]);
        Ok(vec![PrmHandler::new(guid, "FromPackage", package.to_vec(), |_: &mut [u8]| {
            EfiStatus::SUCCESS
        })])
    });
    let stack = Stack::start(table);
    assert_eq!(stack.service.install_prm_package(&[0x42, 0x00]), 0);
    let reply = stack
        .service
        .get_handler_debug_info("00000042-0000-0000-0000-000000000000");
    assert_eq!(reply.handler_name, "FromPackage");
    assert_eq!(reply.acpi_parameter_buffer, vec![0x42, 0x00]);
}

#[test]
fn install_without_installer_is_unsupported() {
    let stack = Stack::start(HandlerTable::new());
    assert_eq!(stack.service.install_prm_package(&[1]), EfiStatus::UNSUPPORTED.to_wire());
}

#[test]
fn sequential_callers_are_serialised() {
    let stack = Stack::start(smbios_table());
    let service = stack.service.clone();
    let workers: Vec<_> = (0..4u8)
        .map(|n| {
            let service = service.clone();
            thread::spawn(move || {
                for i in 0..25u8 {
                    let reply = service.invoke_handler(SMBIOS, &[n, i]);
                    assert_eq!(reply.parameter_buffer, vec![n + 1, i + 1]);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}
