use nalgebra::Vector3;
use rand::rngs::StdRng;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

use jaco_rmi::drivers::{JointStep, RobotClient, RobotStateResponse};
use jaco_rmi::{CommandType, RmiError};

use super::{ActionSpec, PhysicsBackend};
use crate::arm::ArmModel;
use crate::config::{HardwareConfig, StartPosition};
use crate::error::{ReacherError, Result};

/// A live Jaco behind a robot server.
///
/// Reads return the telemetry of the last successful round trip. Every
/// command blocks the calling thread until the server answers or the client
/// timeout expires; a failed command leaves the cached telemetry untouched.
/// The session is closed by [`PhysicsBackend::close`] or on drop.
#[derive(Debug)]
pub struct HardwareBackend {
    runtime: Runtime,
    client: RobotClient,
    config: HardwareConfig,
    arm: ArmModel,
    control_timestep: f64,
    telemetry: RobotStateResponse,
    target: Option<(Vector3<f64>, f64)>,
    closed: bool,
}

impl HardwareBackend {
    /// Opens the session and reads the initial telemetry.
    pub fn connect(config: HardwareConfig, control_timestep: f64) -> Result<Self> {
        config.validate().map_err(ReacherError::Configuration)?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RmiError::Initialization(format!("failed to start I/O runtime: {e}")))?;

        let mut client = runtime.block_on(RobotClient::connect(config.client.clone()))?;
        let telemetry = runtime.block_on(client.get_state())?;
        info!(
            "Hardware backend ready: {} joints reported by {}",
            telemetry.joint_angles.len(),
            client.robot_type
        );

        Ok(Self {
            runtime,
            client,
            arm: ArmModel::from_model(config.model),
            config,
            control_timestep,
            telemetry,
            target: None,
            closed: false,
        })
    }

    pub fn telemetry(&self) -> &RobotStateResponse {
        &self.telemetry
    }

    pub fn target(&self) -> Option<(Vector3<f64>, f64)> {
        self.target
    }

    pub fn is_connected(&self) -> bool {
        !self.closed && self.client.is_connected()
    }

    /// Command for a full vector of target joint angles, in the configured
    /// command mode.
    fn joint_step(&self, angles: &[f64]) -> JointStep {
        match self.config.command_type {
            CommandType::Absolute => JointStep::absolute(angles.to_vec()),
            CommandType::Velocity => {
                let limit = self.config.velocity_limit;
                let velocities = angles
                    .iter()
                    .zip(&self.telemetry.joint_angles)
                    .map(|(target, current)| {
                        ((target - current) / self.control_timestep).clamp(-limit, limit)
                    })
                    .collect();
                JointStep::velocity(velocities)
            }
        }
    }

    fn send(&mut self, step: JointStep) -> Result<()> {
        if self.closed {
            return Err(RmiError::Disconnected.into());
        }
        let state = self.runtime.block_on(self.client.step(step))?;
        self.telemetry = state;
        Ok(())
    }
}

impl PhysicsBackend for HardwareBackend {
    fn initialize_episode(&mut self, start: StartPosition, _rng: &mut StdRng) -> Result<()> {
        match start {
            StartPosition::Home => {
                if self.closed {
                    return Err(RmiError::Disconnected.into());
                }
                let state = self.runtime.block_on(self.client.home())?;
                self.telemetry = state;
                Ok(())
            }
            StartPosition::Random => Err(ReacherError::UnsupportedOperation(
                "random start position is not available on hardware".to_string(),
            )),
        }
    }

    fn set_joint_positions(&mut self, values: &[f64]) -> Result<()> {
        let mut angles = self.telemetry.joint_angles.clone();
        for (q, v) in angles.iter_mut().zip(values) {
            *q = *v;
        }
        let step = self.joint_step(&angles);
        self.send(step)
    }

    fn joint_angles(&self) -> Vec<f64> {
        self.telemetry.joint_angles.clone()
    }

    fn joint_velocities(&self) -> Vec<f64> {
        self.telemetry.joint_velocities.clone()
    }

    fn joint_forces(&self) -> Vec<f64> {
        self.telemetry.joint_efforts.clone()
    }

    fn tool_pose(&self) -> Vector3<f64> {
        self.telemetry.tool_pose.into()
    }

    fn actuator_count(&self) -> usize {
        self.telemetry.joint_angles.len()
    }

    fn action_spec(&self) -> ActionSpec {
        let n = self.actuator_count();
        ActionSpec {
            names: self.arm.joint_names(),
            minimum: self.arm.joints.iter().map(|j| j.range.0).collect(),
            maximum: self.arm.joints.iter().map(|j| j.range.1).collect(),
        }
        .truncated(n)
    }

    fn set_target(&mut self, pose: Vector3<f64>, size: f64) {
        debug!("target at {:?}, size {}", pose.as_slice(), size);
        self.target = Some((pose, size));
    }

    fn step(&mut self, action: &[f64]) -> Result<()> {
        if action.len() != self.actuator_count() {
            return Err(ReacherError::InvalidAction(format!(
                "{} values for {} actuators",
                action.len(),
                self.actuator_count()
            )));
        }
        let step = self.joint_step(action);
        self.send(step)
    }

    fn timestep(&self) -> f64 {
        self.control_timestep
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.runtime.block_on(self.client.disconnect())?;
        Ok(())
    }
}

impl Drop for HardwareBackend {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close robot session cleanly: {}", e);
        }
    }
}
