// Message types exchanged with the middleware

use serde::{Deserialize, Serialize};

// Velocity command from teleop/planners -> driver
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct VelocityCommand {
    pub linear_x: f64,
    pub angular_z: f64,
}

/// Body of the config and command services
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceRequest {
    pub user_input: String,
    pub channel: i32,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceRequest {
    pub user_input: String,
}

/// Reply to every service call.
/// `result` is the exact string written to the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceResponse {
    pub result: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceResponse {
    pub fn sent(result: String) -> Self {
        Self {
            result,
            success: true,
            error: None,
        }
    }

    pub fn failed(result: String, error: impl ToString) -> Self {
        Self {
            result,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Reply to the maintenance service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceResponse {
    #[serde(flatten)]
    pub command: ServiceResponse,
    /// Raw bytes the controller answered with (lossy UTF-8)
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faults: Option<Vec<String>>,
}

/// Integer readings for one H/L sink; element 0 is always the zero marker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelValues {
    pub value: Vec<i32>,
}

impl ChannelValues {
    pub fn from_fields(fields: impl IntoIterator<Item = i32>) -> Self {
        let mut value = vec![0];
        value.extend(fields);
        Self { value }
    }

    /// Parsed fields without the leading marker
    pub fn fields(&self) -> &[i32] {
        self.value.get(1..).unwrap_or(&[])
    }
}

/// String reading for one G sink
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StringReading {
    pub data: String,
}
