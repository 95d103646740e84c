// CLASSIFICATION: COMMUNITY
// Filename: dbus.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! D-Bus binding of [`PrmdService`].

use std::time::Duration;

use dbus::blocking::Connection;
use dbus::strings::{BusName, Interface, Path};
use dbus_crossroads::{Crossroads, IfaceBuilder};
use log::{debug, error, info};

use super::listener::BusTransport;
use super::service::{PrmdService, PRM_DISPATCH_API_VERSION};
use crate::config::{BusKind, PrmdConfig};
use crate::efi::{EfiError, EfiResult};

fn bus_error(context: &str, err: dbus::Error) -> EfiError {
    error!("{}: {}", context, err);
    EfiError::DeviceError
}

/// A bus connection with the PRM dispatch object exported on it.
pub struct DbusTransport {
    conn: Connection,
    cr: Crossroads,
}

impl DbusTransport {
    /// Connect, export the object and claim the well-known name.
    pub fn connect(config: &PrmdConfig, service: PrmdService) -> EfiResult<Self> {
        let conn = match config.bus {
            BusKind::System => Connection::new_system(),
            BusKind::Session => Connection::new_session(),
        }
        .map_err(|err| bus_error("failed to connect to bus", err))?;

        let interface = Interface::new(config.interface.clone()).map_err(|err| {
            error!("invalid interface name {:?}: {}", config.interface, err);
            EfiError::InvalidParameter
        })?;
        let path = Path::new(config.object_path.clone()).map_err(|err| {
            error!("invalid object path {:?}: {}", config.object_path, err);
            EfiError::InvalidParameter
        })?;
        let name = BusName::new(config.service_name.clone()).map_err(|err| {
            error!("invalid service name {:?}: {}", config.service_name, err);
            EfiError::InvalidParameter
        })?;

        let mut cr = Crossroads::new();
        let token = cr.register(interface, |b: &mut IfaceBuilder<PrmdService>| {
            b.property::<String, _>("Version")
                .get(|_, _| Ok(PRM_DISPATCH_API_VERSION.to_string()));
            b.method(
                "InstallPrmPackage",
                ("ParameterBuffer",),
                ("Status",),
                |_, svc: &mut PrmdService, (buffer,): (Vec<u8>,)| Ok((svc.install_prm_package(&buffer),)),
            );
            b.method(
                "EnumerateHandlers",
                (),
                ("Status", "HandlerInfo"),
                |_, svc: &mut PrmdService, (): ()| {
                    let reply = svc.enumerate_handlers();
                    Ok((reply.status, reply.handler_info))
                },
            );
            b.method(
                "InvokeHandler",
                ("HandlerGuid", "ParameterBuffer"),
                ("ModifiedParameterBuffer", "HandlerStatus", "Status"),
                |_, svc: &mut PrmdService, (guid, buffer): (String, Vec<u8>)| {
                    let reply = svc.invoke_handler(&guid, &buffer);
                    Ok((reply.parameter_buffer, reply.handler_status, reply.status))
                },
            );
            b.method(
                "UninstallPrmModule",
                ("ModuleGuid",),
                ("Status",),
                |_, svc: &mut PrmdService, (guid,): (String,)| Ok((svc.uninstall_prm_module(&guid),)),
            );
            b.method(
                "GetHandlerDebugInfo",
                ("HandlerGuid",),
                ("AcpiParameterBuffer", "HandlerName", "Status"),
                |_, svc: &mut PrmdService, (guid,): (String,)| {
                    let reply = svc.get_handler_debug_info(&guid);
                    Ok((reply.acpi_parameter_buffer, reply.handler_name, reply.status))
                },
            );
        });
        cr.insert(path, &[token], service);

        conn.request_name(name, false, true, false)
            .map_err(|err| bus_error("failed to acquire service name", err))?;
        info!(
            "exported {} at {} as {}",
            config.interface, config.object_path, config.service_name
        );
        Ok(Self { conn, cr })
    }
}

impl BusTransport for DbusTransport {
    fn process(&mut self) -> EfiResult<bool> {
        let channel = self.conn.channel();
        channel.read_write(Some(Duration::ZERO)).map_err(|()| {
            error!("bus connection lost");
            EfiError::DeviceError
        })?;
        let Some(message) = channel.pop_message() else {
            return Ok(false);
        };
        if self.cr.handle_message(message, &self.conn).is_err() {
            debug!("ignored non-method bus message");
        }
        channel.flush();
        Ok(true)
    }

    fn wait(&mut self, timeout: Duration) -> EfiResult<()> {
        self.conn.channel().read_write(Some(timeout)).map_err(|()| {
            error!("bus connection lost");
            EfiError::DeviceError
        })
    }
}

