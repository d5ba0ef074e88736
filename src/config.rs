// Timeouts, topics, robot and query configuration
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::motor::kinematics::{DriveGeometry, MAX_RPM, WHEEL_AXLE_LENGTH, WHEEL_RADIUS};
use crate::motor::transport::DEFAULT_BAUDRATE;

// Polling loop frequency
pub const LOOP_HZ: u64 = 50;

// Zenoh topics, relative to the configured prefix
pub const DEFAULT_TOPIC_PREFIX: &str = "roboteq";
pub const TOPIC_READ: &str = "read"; // raw serial stream
pub const TOPIC_TELEMETRY: &str = "telemetry"; // one topic per query sink
pub const TOPIC_FAULTS: &str = "faults";
pub const TOPIC_SRV_CONFIG: &str = "srv/config";
pub const TOPIC_SRV_COMMAND: &str = "srv/command";
pub const TOPIC_SRV_MAINTENANCE: &str = "srv/maintenance";

// Serial port for the Roboteq controller
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";

// Time given to the controller to answer a maintenance command
pub const MAINTENANCE_SETTLE: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Telemetry polling group, identified on the wire by its tag letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupTag {
    High,
    Low,
    General,
}

impl GroupTag {
    pub const ALL: [GroupTag; 3] = [GroupTag::High, GroupTag::Low, GroupTag::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupTag::High => "H",
            GroupTag::Low => "L",
            GroupTag::General => "G",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "H" => Some(GroupTag::High),
            "L" => Some(GroupTag::Low),
            "G" => Some(GroupTag::General),
            _ => None,
        }
    }

    /// H and L carry integer channel values, G carries raw strings
    pub fn is_numeric(&self) -> bool {
        !matches!(self, GroupTag::General)
    }
}

impl fmt::Display for GroupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured query: output sink name and the device code it reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySink {
    pub name: String,
    pub code: String,
}

/// Frozen view of one polling group. Sink order is fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryGroup {
    pub tag: GroupTag,
    /// Reporting period passed to the controller's `#` command
    pub frequency: u32,
    pub sinks: Vec<QuerySink>,
}

impl QueryGroup {
    pub fn sink_names(&self) -> impl Iterator<Item = &str> {
        self.sinks.iter().map(|s| s.name.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RobotConfig {
    pub pub_odom: bool,
    pub wheel_axle_length: f64,
    pub wheel_radius: f64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            pub_odom: true,
            wheel_axle_length: WHEEL_AXLE_LENGTH,
            wheel_radius: WHEEL_RADIUS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriveConfig {
    pub open_loop: bool,
    pub serial_port: String,
    pub baud_rate: u32,
    pub odom_frame: String,
    pub base_frame: String,
    pub cmd_vel_topic: String,
    pub encoder_ppr: u32,
    pub encoder_cpr: u32,
    pub max_amp: u32,
    pub max_rpm: u32,
    pub maintenance_settle_ms: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            open_loop: false,
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            baud_rate: DEFAULT_BAUDRATE,
            odom_frame: "odom".to_string(),
            base_frame: "base_link".to_string(),
            cmd_vel_topic: "cmd_vel".to_string(),
            encoder_ppr: 900,
            encoder_cpr: 3600,
            max_amp: 100,
            max_rpm: MAX_RPM as u32,
            maintenance_settle_ms: MAINTENANCE_SETTLE.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrequencyConfig {
    pub h: u32,
    pub l: u32,
    pub g: u32,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            h: 10,
            l: 100,
            g: 1000,
        }
    }
}

/// sink name -> device code, per group. BTreeMap keeps a stable sorted order.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    pub h: BTreeMap<String, String>,
    pub l: BTreeMap<String, String>,
    pub g: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    pub topic_prefix: String,
    pub robot: RobotConfig,
    pub drive: DriveConfig,
    pub frequency: FrequencyConfig,
    pub query: QueryConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            robot: RobotConfig::default(),
            drive: DriveConfig::default(),
            frequency: FrequencyConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl DriverConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DriverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_topic_segment(&self.topic_prefix) {
            return Err(invalid(format!("topic_prefix {:?}", self.topic_prefix)));
        }
        if !is_topic_segment(&self.drive.cmd_vel_topic) {
            return Err(invalid(format!(
                "cmd_vel_topic {:?}",
                self.drive.cmd_vel_topic
            )));
        }
        if !(self.robot.wheel_radius > 0.0) {
            return Err(invalid("wheel_radius must be positive".to_string()));
        }
        if !(self.robot.wheel_axle_length > 0.0) {
            return Err(invalid("wheel_axle_length must be positive".to_string()));
        }
        if self.drive.max_rpm == 0 {
            return Err(invalid("max_rpm must be positive".to_string()));
        }
        if self.drive.baud_rate == 0 {
            return Err(invalid("baud_rate must be positive".to_string()));
        }

        let mut seen = HashSet::new();
        for group in self.query_groups() {
            if !group.sinks.is_empty() && group.frequency == 0 {
                return Err(invalid(format!("frequency for group {} is zero", group.tag)));
            }
            for sink in &group.sinks {
                if !is_topic_segment(&sink.name) {
                    return Err(invalid(format!("sink name {:?}", sink.name)));
                }
                if sink.code.is_empty() || !sink.code.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(invalid(format!(
                        "device code {:?} for sink {}",
                        sink.code, sink.name
                    )));
                }
                if !seen.insert(sink.name.clone()) {
                    return Err(invalid(format!("sink {} configured twice", sink.name)));
                }
            }
        }
        Ok(())
    }

    pub fn geometry(&self) -> DriveGeometry {
        DriveGeometry {
            wheel_axle_length: self.robot.wheel_axle_length,
            wheel_radius: self.robot.wheel_radius,
            max_rpm: self.drive.max_rpm as f64,
        }
    }

    pub fn maintenance_settle(&self) -> Duration {
        Duration::from_millis(self.drive.maintenance_settle_ms)
    }

    /// Groups in registration order: H, L, G
    pub fn query_groups(&self) -> [QueryGroup; 3] {
        GroupTag::ALL.map(|tag| {
            let (map, frequency) = match tag {
                GroupTag::High => (&self.query.h, self.frequency.h),
                GroupTag::Low => (&self.query.l, self.frequency.l),
                GroupTag::General => (&self.query.g, self.frequency.g),
            };
            QueryGroup {
                tag,
                frequency,
                sinks: map
                    .iter()
                    .map(|(name, code)| QuerySink {
                        name: name.clone(),
                        code: code.clone(),
                    })
                    .collect(),
            }
        })
    }

    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.topic_prefix, suffix)
    }

    pub fn sink_topic(&self, sink: &str) -> String {
        format!("{}/{}/{}", self.topic_prefix, TOPIC_TELEMETRY, sink)
    }

    pub fn log_summary(&self) {
        info!("pub_odom: {}", self.robot.pub_odom);
        info!("open_loop: {}", self.drive.open_loop);
        info!("serial_port: {}", self.drive.serial_port);
        info!("odom_frame: {}", self.drive.odom_frame);
        info!("base_frame: {}", self.drive.base_frame);
        info!("cmd_vel_topic: {}", self.drive.cmd_vel_topic);
        info!("wheel_axle_length: {}", self.robot.wheel_axle_length);
        info!("wheel_radius: {}", self.robot.wheel_radius);
        info!("baud_rate: {}", self.drive.baud_rate);
        info!("encoder_ppr: {}", self.drive.encoder_ppr);
        info!("encoder_cpr: {}", self.drive.encoder_cpr);
        info!("max_amp: {}", self.drive.max_amp);
        info!("max_rpm: {}", self.drive.max_rpm);
        for group in self.query_groups() {
            info!(
                "query group {}: every {} ms, sinks {:?}",
                group.tag,
                group.frequency,
                group.sink_names().collect::<Vec<_>>()
            );
        }
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid(reason)
}

fn is_topic_segment(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
