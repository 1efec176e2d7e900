use serde::{Deserialize, Serialize};

use crate::{AngleUnit, CommandType, RmiError, RobotErrorCode, ToolPose};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "Command")]
pub enum Command {
    #[serde(rename = "JACO_GetState")]
    GetState,

    #[serde(rename = "JACO_Home")]
    Home,

    #[serde(rename = "JACO_Step")]
    Step(JointStep),
}

/// One control-period joint command.
///
/// `data` holds one value per commanded joint, major joints first. When fewer
/// values than joints are sent the server keeps the remaining joints where they
/// are.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointStep {
    #[serde(rename = "CommandType")]
    pub command_type: CommandType,
    #[serde(rename = "Relative")]
    pub relative: bool,
    #[serde(rename = "Unit")]
    pub unit: AngleUnit,
    #[serde(rename = "Data")]
    pub data: Vec<f64>,
}

impl JointStep {
    pub fn new(command_type: CommandType, relative: bool, unit: AngleUnit, data: Vec<f64>) -> Self {
        Self {
            command_type,
            relative,
            unit,
            data,
        }
    }

    /// Joint velocities in rad/s.
    pub fn velocity(data: Vec<f64>) -> Self {
        Self::new(CommandType::Velocity, false, AngleUnit::Radians, data)
    }

    /// Absolute joint positions in radians.
    pub fn absolute(data: Vec<f64>) -> Self {
        Self::new(CommandType::Absolute, false, AngleUnit::Radians, data)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "Command")]
pub enum CommandResponse {
    #[serde(rename = "JACO_GetState")]
    GetState(RobotStateResponse),

    #[serde(rename = "JACO_Home")]
    Home(RobotStateResponse),

    #[serde(rename = "JACO_Step")]
    Step(RobotStateResponse),

    /// Sent back for any command the server does not recognize,
    /// e.g. `{"Command": "Unknown", "ErrorID": 2}`.
    #[serde(rename = "Unknown")]
    Unknown(UnknownResponse),
}

impl CommandResponse {
    /// The telemetry carried by the response, if it is a state response.
    pub fn state(&self) -> Option<&RobotStateResponse> {
        match self {
            CommandResponse::GetState(state)
            | CommandResponse::Home(state)
            | CommandResponse::Step(state) => Some(state),
            CommandResponse::Unknown(_) => None,
        }
    }

    pub fn into_state(self) -> Option<RobotStateResponse> {
        match self {
            CommandResponse::GetState(state)
            | CommandResponse::Home(state)
            | CommandResponse::Step(state) => Some(state),
            CommandResponse::Unknown(_) => None,
        }
    }
}

/// Telemetry snapshot returned by every state-bearing command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RobotStateResponse {
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "Message", default)]
    pub message: String,
    /// Number of joint-state messages the server has consumed so far.
    #[serde(rename = "StateCount", default)]
    pub n_states: u32,
    /// Seconds between the command being received and the state being sampled.
    #[serde(rename = "TimeOffset", default)]
    pub time_offset: f64,
    #[serde(rename = "JointAngles")]
    pub joint_angles: Vec<f64>,
    #[serde(rename = "JointVelocities")]
    pub joint_velocities: Vec<f64>,
    #[serde(rename = "JointEfforts")]
    pub joint_efforts: Vec<f64>,
    #[serde(rename = "ToolPose")]
    pub tool_pose: ToolPose,
}

impl RobotStateResponse {
    /// Turns a failed response into the matching error.
    pub fn check(self) -> Result<Self, RmiError> {
        if let Some(code) = RobotErrorCode::from_error_id(self.error_id) {
            return Err(RmiError::Controller(code));
        }
        if !self.success {
            return Err(RmiError::Rejected(self.message));
        }
        Ok(self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnknownResponse {
    #[serde(rename = "ErrorID")]
    pub error_id: u32,
}
