use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::kinematics::ExtremePoint;

/// Sensor bundle handed to the policy every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Control period of the backend, seconds.
    pub timestep: f64,
    /// Target minus the last monitored extreme point (the fingertip).
    pub to_target: Vector3<f64>,
    pub joint_angles: Vec<f64>,
    pub joint_forces: Vec<f64>,
    pub joint_velocity: Vec<f64>,
    pub joint_extremes: Vec<ExtremePoint>,
}

impl Observation {
    /// Flattens the bundle in field order, extreme points as `x, y, z`
    /// triples.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(
            4 + self.joint_angles.len()
                + self.joint_forces.len()
                + self.joint_velocity.len()
                + 3 * self.joint_extremes.len(),
        );
        flat.push(self.timestep);
        flat.extend(self.to_target.iter());
        flat.extend(&self.joint_angles);
        flat.extend(&self.joint_forces);
        flat.extend(&self.joint_velocity);
        for extreme in &self.joint_extremes {
            flat.extend(extreme.position.iter());
        }
        flat
    }
}
