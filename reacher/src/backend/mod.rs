//! Physics backends: the component that actually moves joints.
//!
//! Both variants report joints in the same order, major joints base to wrist
//! first, finger joints last.

use nalgebra::Vector3;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::{BackendConfig, EnvironmentConfig, StartPosition};
use crate::error::Result;

mod hardware;
mod simulated;

pub use hardware::HardwareBackend;
pub use simulated::{SimulatedBackend, J2S7S300_HOME, PHYSICS_TIMESTEP};

/// Per-actuator bounds of an action vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub names: Vec<String>,
    pub minimum: Vec<f64>,
    pub maximum: Vec<f64>,
}

impl ActionSpec {
    pub fn len(&self) -> usize {
        self.minimum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minimum.is_empty()
    }

    /// Keeps the leading `n` actuators.
    pub fn truncated(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            names: self.names.iter().take(n).cloned().collect(),
            minimum: self.minimum[..n].to_vec(),
            maximum: self.maximum[..n].to_vec(),
        }
    }
}

pub trait PhysicsBackend {
    /// Poses the arm for a new episode.
    fn initialize_episode(&mut self, start: StartPosition, rng: &mut StdRng) -> Result<()>;

    /// Writes the leading joint angles; joints past `values.len()` keep their
    /// current position.
    fn set_joint_positions(&mut self, values: &[f64]) -> Result<()>;

    fn joint_angles(&self) -> Vec<f64>;

    fn joint_velocities(&self) -> Vec<f64>;

    fn joint_forces(&self) -> Vec<f64>;

    /// Position of the hand, world frame.
    fn tool_pose(&self) -> Vector3<f64>;

    fn actuator_count(&self) -> usize;

    fn action_spec(&self) -> ActionSpec;

    fn set_target(&mut self, pose: Vector3<f64>, size: f64);

    /// Applies one full actuator command (absolute joint angles) and advances
    /// one control period.
    fn step(&mut self, action: &[f64]) -> Result<()>;

    /// Control period, seconds.
    fn timestep(&self) -> f64;

    /// Releases the simulation or the robot session. Safe to call twice.
    fn close(&mut self) -> Result<()>;
}

impl<B: PhysicsBackend + ?Sized> PhysicsBackend for Box<B> {
    fn initialize_episode(&mut self, start: StartPosition, rng: &mut StdRng) -> Result<()> {
        (**self).initialize_episode(start, rng)
    }

    fn set_joint_positions(&mut self, values: &[f64]) -> Result<()> {
        (**self).set_joint_positions(values)
    }

    fn joint_angles(&self) -> Vec<f64> {
        (**self).joint_angles()
    }

    fn joint_velocities(&self) -> Vec<f64> {
        (**self).joint_velocities()
    }

    fn joint_forces(&self) -> Vec<f64> {
        (**self).joint_forces()
    }

    fn tool_pose(&self) -> Vector3<f64> {
        (**self).tool_pose()
    }

    fn actuator_count(&self) -> usize {
        (**self).actuator_count()
    }

    fn action_spec(&self) -> ActionSpec {
        (**self).action_spec()
    }

    fn set_target(&mut self, pose: Vector3<f64>, size: f64) {
        (**self).set_target(pose, size)
    }

    fn step(&mut self, action: &[f64]) -> Result<()> {
        (**self).step(action)
    }

    fn timestep(&self) -> f64 {
        (**self).timestep()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Builds the backend selected in `config`. A hardware backend connects to
/// the robot server before returning.
pub fn build_backend(config: &EnvironmentConfig) -> Result<Box<dyn PhysicsBackend>> {
    Ok(match &config.backend {
        BackendConfig::Simulated { model } => Box::new(SimulatedBackend::from_model(
            *model,
            config.control_timestep,
        )?),
        BackendConfig::Hardware(hardware) => Box::new(HardwareBackend::connect(
            hardware.clone(),
            config.control_timestep,
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_keeps_leading_entries() {
        let spec = ActionSpec {
            names: vec!["a".into(), "b".into(), "c".into()],
            minimum: vec![-1.0, -2.0, -3.0],
            maximum: vec![1.0, 2.0, 3.0],
        };
        let short = spec.truncated(2);
        assert_eq!(short.names, vec!["a", "b"]);
        assert_eq!(short.minimum, vec![-1.0, -2.0]);
        assert_eq!(short.maximum, vec![1.0, 2.0]);
        assert_eq!(spec.truncated(10), spec);
    }

    #[test]
    fn builds_simulated_backend_by_default() {
        let backend = build_backend(&EnvironmentConfig::default()).unwrap();
        assert_eq!(backend.actuator_count(), 13);
        assert_eq!(backend.timestep(), 0.02);
    }
}
