// Roboteq ASCII command protocol
//
// Every command ends with the field separator '_':
//   !G <ch> <value>_            motion (per channel)
//   ^<name> <ch> <value>_       configuration write
//   !<name> <ch> <value>_       runtime command
//   %<name> _                   maintenance
//   /"DH?","?"<code>_...# <ms>_ query history registration

use bitflags::bitflags;
use std::fmt;

use super::kinematics::DriveCommand;
use crate::config::{GroupTag, QueryGroup};

/// Terminates every command on the wire
pub const FIELD_SEPARATOR: char = '_';

/// Maintenance token sent after a configuration write to persist it
pub const SAVE_TRAILER: &str = "%clsav321654987";

/// Error types for Roboteq communication
#[derive(Debug, thiserror::Error)]
pub enum RoboteqError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port is not open")]
    PortClosed,

    #[error("Invalid command name {name:?}: {reason}")]
    InvalidCommand { name: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, RoboteqError>;

/// Outbound command kinds
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand<'a> {
    /// `!G` on both channels
    Motion(DriveCommand),
    /// `^name ch value` followed by the save trailer
    Config { name: &'a str, channel: i32, value: i64 },
    /// `!name ch value`
    Command { name: &'a str, channel: i32, value: i64 },
    /// `%name`
    Maintenance { name: &'a str },
    /// Stop the controller echoing input back into the telemetry stream
    EchoOff,
    /// Start periodic reporting for one query group
    QueryRegistration { group: &'a QueryGroup, clear: bool },
}

impl DeviceCommand<'_> {
    /// Reject names that would break the command grammar
    pub fn validate(&self) -> Result<()> {
        match self {
            DeviceCommand::Config { name, .. } | DeviceCommand::Command { name, .. } => {
                validate_name(name)
            }
            DeviceCommand::Maintenance { name } => validate_maintenance(name),
            _ => Ok(()),
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RoboteqError::InvalidCommand {
            name: name.to_string(),
            reason: "empty",
        });
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RoboteqError::InvalidCommand {
            name: name.to_string(),
            reason: "only ASCII letters and digits are allowed",
        });
    }
    Ok(())
}

/// Maintenance commands may carry arguments such as an unlock key
/// (`RESET 321654987`), separated by single spaces
fn validate_maintenance(input: &str) -> Result<()> {
    let invalid = |reason| {
        Err(RoboteqError::InvalidCommand {
            name: input.to_string(),
            reason,
        })
    };
    let mut words = input.split(' ');
    match words.next() {
        Some(name) if !name.is_empty() => validate_name(name)?,
        _ => return invalid("empty"),
    }
    for word in words {
        if word.is_empty() {
            return invalid("arguments must be separated by single spaces");
        }
        if !word.chars().all(|c| c.is_ascii_alphanumeric()) {
            return invalid("arguments may only contain ASCII letters and digits");
        }
    }
    Ok(())
}

impl fmt::Display for DeviceCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = FIELD_SEPARATOR;
        match self {
            DeviceCommand::Motion(drive) => {
                let [ch1, ch2] = drive.channel_values();
                write!(f, "!G 1 {ch1}{sep}!G 2 {ch2}{sep}")
            }
            DeviceCommand::Config {
                name,
                channel,
                value,
            } => write!(f, "^{name} {channel} {value}{sep} {SAVE_TRAILER}"),
            DeviceCommand::Command {
                name,
                channel,
                value,
            } => write!(f, "!{name} {channel} {value}{sep}"),
            DeviceCommand::Maintenance { name } => write!(f, "%{name} {sep}"),
            DeviceCommand::EchoOff => write!(f, "^echof 1{sep}"),
            DeviceCommand::QueryRegistration { group, clear } => {
                if *clear {
                    write!(f, "# c{sep}")?;
                }
                write!(f, "/\"D{}?\",\"?\"", group.tag)?;
                for sink in &group.sinks {
                    write!(f, "{}{sep}", sink.code)?;
                }
                write!(f, "# {}{sep}", group.frequency)
            }
        }
    }
}

/// Registration strings in the order they must reach the device
pub fn registration_sequence(groups: &[QueryGroup]) -> Vec<String> {
    let mut commands = vec![DeviceCommand::EchoOff.encode()];
    for group in groups {
        let clear = group.tag == GroupTag::High;
        if group.sinks.is_empty() {
            if clear {
                // Still clear any history left over from a previous run
                commands.push(format!("# c{FIELD_SEPARATOR}"));
            }
            continue;
        }
        commands.push(DeviceCommand::QueryRegistration { group, clear }.encode());
    }
    commands
}

bitflags! {
    /// Controller fault flags as reported by the `FF` query
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FaultFlags: u8 {
        const OVERHEAT = 1;
        const OVERVOLTAGE = 2;
        const UNDERVOLTAGE = 4;
        const SHORT_CIRCUIT = 8;
        const EMERGENCY_STOP = 16;
        const SETUP_FAULT = 32;
        const MOSFET_FAILURE = 64;
        const STARTUP_CONFIG_FAULT = 128;
    }
}

impl FaultFlags {
    /// Device query code reporting the fault bitmask
    pub const QUERY_CODE: &'static str = "FF";

    /// Decode a raw bitmask value; bits outside the low byte are ignored
    pub fn from_value(value: i64) -> Self {
        Self::from_bits_truncate((value & 0xFF) as u8)
    }

    /// Find an `FF=<n>` report in a device response
    pub fn from_response(response: &str) -> Option<Self> {
        let start = response.find("FF=")? + 3;
        let digits: String = response[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<i64>().ok().map(Self::from_value)
    }

    pub fn is_fault_free(&self) -> bool {
        self.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}
