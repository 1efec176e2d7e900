use serde::{Deserialize, Serialize};
use std::path::Path;

use jaco_rmi::drivers::RobotClientConfig;
use jaco_rmi::CommandType;

use crate::arm::RobotModel;
use crate::error::{ReacherError, Result};
use crate::fence::FenceBounds;

/// How the arm is posed at the start of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    #[default]
    Home,
    Random,
}

/// Settings of the reaching task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Radius of the target sphere, in meters.
    pub target_size: f64,
    /// Upper bound of the distance between the start tool pose and the target.
    pub max_target_distance: f64,
    pub start_position: StartPosition,
    /// Leading major joints the policy controls.
    pub degrees_of_freedom: usize,
    /// Actions are joint deltas instead of absolute joint angles.
    pub relative_step: bool,
    /// 1-based joints checked against the fence and reported in observations.
    /// The last one is taken as the fingertip.
    pub extreme_joints: Vec<usize>,
    /// `None` seeds from entropy.
    pub random_seed: Option<u64>,
    /// Added to `target_size` to get the radius of full reward.
    pub target_margin: f64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            target_size: 0.015,
            max_target_distance: 1.0,
            start_position: StartPosition::Home,
            degrees_of_freedom: 7,
            relative_step: true,
            extreme_joints: vec![4, 6, 7],
            random_seed: None,
            target_margin: 0.01,
        }
    }
}

impl TaskConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.target_size > 0.0) {
            return Err(format!("target_size must be positive, got {}", self.target_size));
        }
        if !(self.max_target_distance > 0.01) {
            return Err(format!(
                "max_target_distance must exceed the 0.01 m minimum offset, got {}",
                self.max_target_distance
            ));
        }
        if !(self.target_margin >= 0.0) {
            return Err(format!("target_margin cannot be negative, got {}", self.target_margin));
        }
        if self.degrees_of_freedom == 0 {
            return Err("degrees_of_freedom must be at least 1".to_string());
        }
        if self.extreme_joints.is_empty() {
            return Err("at least one extreme joint must be monitored".to_string());
        }
        if let Some(&j) = self
            .extreme_joints
            .iter()
            .find(|&&j| j == 0 || j > self.degrees_of_freedom)
        {
            return Err(format!(
                "extreme joint {} is outside 1..={}",
                j, self.degrees_of_freedom
            ));
        }
        Ok(())
    }

    /// Radius around the target inside which the reward is 1.
    pub fn reward_radius(&self) -> f64 {
        self.target_size + self.target_margin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub client: RobotClientConfig,
    /// Arm attached to the robot server; provides joint names and ranges.
    pub model: RobotModel,
    pub command_type: CommandType,
    /// Joint speed cap for velocity commands, rad/s.
    pub velocity_limit: f64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            client: RobotClientConfig::default(),
            model: RobotModel::default(),
            command_type: CommandType::Absolute,
            velocity_limit: 1.0,
        }
    }
}

impl HardwareConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.client.validate()?;
        if !(self.velocity_limit > 0.0) {
            return Err(format!("velocity_limit must be positive, got {}", self.velocity_limit));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Simulated {
        #[serde(default)]
        model: RobotModel,
    },
    Hardware(HardwareConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Simulated {
            model: RobotModel::default(),
        }
    }
}

/// Everything needed to build an environment. Loaded once at startup.
///
/// ```json
/// {
///   "backend": { "type": "hardware", "client": { "addr": "10.0.0.5", "port": 9030 } },
///   "task": { "start_position": "home", "random_seed": 42 },
///   "fence": { "x_min": -0.6, "x_max": 0.6 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub backend: BackendConfig,
    pub task: TaskConfig,
    pub fence: FenceBounds,
    /// Episode length in seconds.
    pub time_limit: f64,
    /// Seconds of physics time per control tick.
    pub control_timestep: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            task: TaskConfig::default(),
            fence: FenceBounds::default(),
            time_limit: 10.0,
            control_timestep: 0.02,
        }
    }
}

impl EnvironmentConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ReacherError::Configuration(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReacherError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.task.validate().map_err(ReacherError::Configuration)?;
        self.fence.validate().map_err(ReacherError::Configuration)?;
        if let BackendConfig::Hardware(hardware) = &self.backend {
            hardware.validate().map_err(ReacherError::Configuration)?;
        }
        if !(self.control_timestep > 0.0) {
            return Err(ReacherError::Configuration(format!(
                "control_timestep must be positive, got {}",
                self.control_timestep
            )));
        }
        if !(self.time_limit >= self.control_timestep) {
            return Err(ReacherError::Configuration(format!(
                "time_limit {} is shorter than one control step",
                self.time_limit
            )));
        }
        Ok(())
    }
}
