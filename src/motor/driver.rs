// High-level motor driver for a Roboteq two-channel controller
//
// Combines kinematics and the command encoder. Every method writes through
// the shared transport, so it may be called from any request context.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::kinematics::{twist_to_drive, DriveCommand, DriveGeometry};
use super::roboteq::{registration_sequence, DeviceCommand, FaultFlags, Result, RoboteqError};
use super::transport::{SharedTransport, Transport};
use crate::config::QueryGroup;
use crate::messages::{
    DeviceRequest, MaintenanceRequest, MaintenanceResponse, ServiceResponse, VelocityCommand,
};

pub struct MotorDriver {
    transport: SharedTransport,
    geometry: DriveGeometry,
    settle: Duration,
}

impl MotorDriver {
    pub fn new(transport: SharedTransport, geometry: DriveGeometry, settle: Duration) -> Self {
        Self {
            transport,
            geometry,
            settle,
        }
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    /// Turn off echo and start periodic reporting for every query group.
    ///
    /// The whole sequence is written under one lock so no request can land
    /// between the echo switch and the registrations.
    pub fn register_queries(&self, groups: &[QueryGroup]) -> Result<()> {
        let commands = registration_sequence(groups);
        let mut transport = self.transport.lock();
        for command in &commands {
            debug!("Registering: {}", command);
            transport.write_all(command.as_bytes())?;
        }
        info!("Registered {} query groups", groups.len());
        Ok(())
    }

    /// Send a body velocity command, returns the string written
    pub fn drive(&self, cmd: &VelocityCommand) -> Result<String> {
        let drive = twist_to_drive(cmd.linear_x, cmd.angular_z, &self.geometry);
        self.set_drive(drive)
    }

    pub fn set_drive(&self, drive: DriveCommand) -> Result<String> {
        let encoded = DeviceCommand::Motion(drive).encode();
        self.transport.write_str(&encoded)?;
        debug!("{}", encoded);
        Ok(encoded)
    }

    /// Stop both channels
    pub fn stop(&self) -> Result<String> {
        info!("Stopping both motor channels");
        self.set_drive(DriveCommand::zero())
    }

    /// `^name ch value` followed by the save trailer
    pub fn config(&self, request: &DeviceRequest) -> ServiceResponse {
        self.send(DeviceCommand::Config {
            name: &request.user_input,
            channel: request.channel,
            value: request.value,
        })
    }

    /// `!name ch value`
    pub fn command(&self, request: &DeviceRequest) -> ServiceResponse {
        self.send(DeviceCommand::Command {
            name: &request.user_input,
            channel: request.channel,
            value: request.value,
        })
    }

    /// `%name`, then read back whatever the controller answers
    pub fn maintenance(&self, request: &MaintenanceRequest) -> MaintenanceResponse {
        let command = DeviceCommand::Maintenance {
            name: &request.user_input,
        };
        if let Err(e) = command.validate() {
            warn!("Rejected maintenance request: {}", e);
            return MaintenanceResponse {
                command: ServiceResponse::failed(String::new(), e),
                ..Default::default()
            };
        }

        let encoded = command.encode();
        // Hold the port so the polling loop cannot consume the reply
        let exchange = {
            let mut transport = self.transport.lock();
            transport.write_all(encoded.as_bytes()).and_then(|()| {
                if !self.settle.is_zero() {
                    std::thread::sleep(self.settle);
                }
                transport.read_available()
            })
        };

        match exchange {
            Ok(bytes) => {
                let response = String::from_utf8_lossy(&bytes).into_owned();
                info!("{} -> {:?}", encoded, response);
                let faults = FaultFlags::from_response(&response)
                    .map(|flags| flags.names().into_iter().map(str::to_string).collect());
                MaintenanceResponse {
                    command: ServiceResponse::sent(encoded),
                    response,
                    faults,
                }
            }
            Err(e) => {
                warn!("Maintenance command {} failed: {}", encoded, e);
                MaintenanceResponse {
                    command: ServiceResponse::failed(encoded, e),
                    ..Default::default()
                }
            }
        }
    }

    fn send(&self, command: DeviceCommand<'_>) -> ServiceResponse {
        if let Err(e) = command.validate() {
            warn!("Rejected request: {}", e);
            return ServiceResponse::failed(String::new(), e);
        }

        let encoded = command.encode();
        match self.transport.write_str(&encoded) {
            Ok(()) => {
                info!("{}", encoded);
                ServiceResponse::sent(encoded)
            }
            Err(e) => {
                if matches!(e, RoboteqError::PortClosed) {
                    warn!("Dropped {}: serial port is not open", encoded);
                } else {
                    warn!("Failed to write {}: {}", encoded, e);
                }
                ServiceResponse::failed(encoded, e)
            }
        }
    }
}
