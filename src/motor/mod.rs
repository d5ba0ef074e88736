// Motor control module for a Roboteq two-channel controller
//
// Provides:
// - Differential drive kinematics (twist -> per-wheel commands)
// - Roboteq ASCII command encoding
// - Serial transport shared between writers and the polling loop
// - High-level motor driver API

mod driver;
pub mod kinematics;
pub mod roboteq;
pub mod transport;

pub use driver::MotorDriver;
pub use kinematics::{twist_to_drive, DriveCommand, DriveGeometry};
pub use roboteq::{DeviceCommand, FaultFlags, RoboteqError};
pub use transport::{SerialTransport, SharedTransport, Transport};
