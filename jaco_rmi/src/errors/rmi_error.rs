use int_enum::IntEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum RmiError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Robot server sent an unrecognized packet: {0}")]
    UnrecognizedPacket(String),
    #[error("Robot server returned error#{}: {}", u32::from(*.0), .0.message())]
    Controller(RobotErrorCode),
    #[error("Robot server rejected the command: {0}")]
    Rejected(String),
    #[error("SendError: {0}")]
    FailedToSend(String),
    #[error("ReceiveError: {0}")]
    FailedToReceive(String),
    #[error("Robot server appears to be disconnected")]
    Disconnected,
    #[error("No response from robot server within {waited_ms} ms")]
    Timeout { waited_ms: u64 },
    #[error("Could not initialize: {0}")]
    Initialization(String),
}

/// `ErrorID` values reported by the robot server. `0` means success and has no
/// variant; see [`RobotErrorCode::from_error_id`].
#[repr(u32)]
#[derive(Debug, Serialize, Deserialize, IntEnum, Clone, Copy, PartialEq, Eq)]
pub enum RobotErrorCode {
    InternalSystemError = 1,
    InvalidCommand = 2,
    InvalidJointCount = 3,
    JointLimitExceeded = 4,
    NotHomed = 5,
    ArmFault = 6,
    EmergencyStop = 7,
    CommandTimeout = 8,
    UnrecognizedError = 255,
}

impl RobotErrorCode {
    /// Maps a wire `ErrorID` to a code. Returns `None` for success (`0`).
    pub fn from_error_id(error_id: u32) -> Option<Self> {
        if error_id == 0 {
            return None;
        }
        Some(RobotErrorCode::try_from(error_id).unwrap_or(RobotErrorCode::UnrecognizedError))
    }

    pub fn message(&self) -> &str {
        match self {
            RobotErrorCode::InternalSystemError => "Internal System Error.",
            RobotErrorCode::InvalidCommand => "Invalid Command.",
            RobotErrorCode::InvalidJointCount => "Command joint count does not match the arm.",
            RobotErrorCode::JointLimitExceeded => "Joint Limit Exceeded.",
            RobotErrorCode::NotHomed => "Arm is Not Homed.",
            RobotErrorCode::ArmFault => "Arm Fault.",
            RobotErrorCode::EmergencyStop => "Emergency Stop Engaged.",
            RobotErrorCode::CommandTimeout => "Command Timed Out on the Controller.",
            RobotErrorCode::UnrecognizedError => "Unrecognized Robot Error ID",
        }
    }
}
