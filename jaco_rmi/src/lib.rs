use serde::{Deserialize, Serialize};

pub mod drivers;

pub mod packets;
pub mod errors;
pub use errors::*;

mod transforms;

/// Cartesian position of the tool (hand) in meters, world frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ToolPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ToolPose {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// How the `Data` array of a `JACO_Step` command is interpreted.
///
/// # Variants
///
/// * `Velocity` - joint velocities, held for one control period.
/// * `Absolute` - joint positions the servo loop should track.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandType {
    #[serde(rename = "VEL")]
    #[default]
    Velocity,
    #[serde(rename = "ABS")]
    Absolute,
}

/// Angular unit of a joint command. The reacher stack only ever sends radians,
/// degrees exist because the robot server accepts them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    #[serde(rename = "rad")]
    #[default]
    Radians,
    #[serde(rename = "deg")]
    Degrees,
}

impl AngleUnit {
    /// Converts a value expressed in this unit to radians.
    pub fn to_radians(self, value: f64) -> f64 {
        match self {
            AngleUnit::Radians => value,
            AngleUnit::Degrees => value.to_radians(),
        }
    }
}
