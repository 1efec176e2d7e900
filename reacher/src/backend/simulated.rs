use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use super::{ActionSpec, PhysicsBackend};
use crate::arm::{ArmModel, RobotModel};
use crate::config::StartPosition;
use crate::error::{ReacherError, Result};
use crate::kinematics::KinematicChain;

/// Home configuration of the j2s7s300, approximately the factory home of the
/// real arm.
pub const J2S7S300_HOME: [f64; 7] = [4.71, 2.61, 0.0, 0.5, 6.28, 3.7, 3.14];

/// Finger joints start fully closed against their stop.
const FINGER_HOME: f64 = 10.0;

/// Position servo gains, unit joint inertia. Critically damped.
const KP: f64 = 400.0;
const KV: f64 = 40.0;

/// Physics substep, seconds.
pub const PHYSICS_TIMESTEP: f64 = 0.001;

/// Kinematic stand-in for the physics engine: every joint is a unit inertia
/// driven by a PD position actuator. No contacts, no gravity.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    arm: ArmModel,
    chain: KinematicChain,
    home: Vec<f64>,
    qpos: Vec<f64>,
    qvel: Vec<f64>,
    ctrl: Vec<f64>,
    force: Vec<f64>,
    control_timestep: f64,
    n_substeps: usize,
    target: Option<(Vector3<f64>, f64)>,
    time: f64,
}

impl SimulatedBackend {
    /// Introspects the joint layout of `arm` and derives its home pose.
    ///
    /// # Errors
    ///
    /// [`ReacherError::Configuration`] when the number of major joints is not
    /// one of a known arm, or the control timestep is not positive.
    pub fn new(arm: ArmModel, control_timestep: f64) -> Result<Self> {
        let n_major = arm.n_major_joints();
        let home = match n_major {
            7 => {
                let mut home = J2S7S300_HOME.to_vec();
                home.resize(arm.joints.len(), FINGER_HOME);
                home
            }
            n => {
                return Err(ReacherError::Configuration(format!(
                    "unknown or unconfigured robot type with {n} major joints"
                )))
            }
        };
        if !(control_timestep > 0.0) {
            return Err(ReacherError::Configuration(format!(
                "control timestep must be positive, got {control_timestep}"
            )));
        }

        let n = arm.joints.len();
        let n_substeps = ((control_timestep / PHYSICS_TIMESTEP).round() as usize).max(1);
        let chain = KinematicChain::from_link_lengths(&arm.link_lengths);

        debug!(
            "simulated {:?}: {} actuators, {} substeps per control step",
            arm.model, n, n_substeps
        );

        Ok(Self {
            arm,
            chain,
            qpos: home.clone(),
            ctrl: home.clone(),
            home,
            qvel: vec![0.0; n],
            force: vec![0.0; n],
            control_timestep,
            n_substeps,
            target: None,
            time: 0.0,
        })
    }

    pub fn from_model(model: RobotModel, control_timestep: f64) -> Result<Self> {
        Self::new(ArmModel::from_model(model), control_timestep)
    }

    pub fn arm(&self) -> &ArmModel {
        &self.arm
    }

    pub fn home_joint_angles(&self) -> &[f64] {
        &self.home
    }

    pub fn target(&self) -> Option<(Vector3<f64>, f64)> {
        self.target
    }

    /// Simulated seconds since construction.
    pub fn time(&self) -> f64 {
        self.time
    }

    fn reset_dynamics(&mut self) {
        self.qvel.iter_mut().for_each(|v| *v = 0.0);
        self.force.iter_mut().for_each(|f| *f = 0.0);
        self.ctrl.copy_from_slice(&self.qpos);
    }

    fn substep(&mut self) {
        for i in 0..self.qpos.len() {
            let torque = KP * (self.ctrl[i] - self.qpos[i]) - KV * self.qvel[i];
            self.force[i] = torque;
            // semi-implicit Euler
            self.qvel[i] += torque * PHYSICS_TIMESTEP;
            self.qpos[i] += self.qvel[i] * PHYSICS_TIMESTEP;
        }
        self.time += PHYSICS_TIMESTEP;
    }
}

impl PhysicsBackend for SimulatedBackend {
    fn initialize_episode(&mut self, start: StartPosition, rng: &mut StdRng) -> Result<()> {
        let pose = match start {
            StartPosition::Home => self.home.clone(),
            StartPosition::Random => self
                .arm
                .joints
                .iter()
                .zip(&self.home)
                .map(|(joint, &home)| {
                    if joint.is_finger() {
                        home
                    } else {
                        rng.gen_range(joint.range.0..=joint.range.1)
                    }
                })
                .collect(),
        };
        self.set_joint_positions(&pose)
    }

    fn set_joint_positions(&mut self, values: &[f64]) -> Result<()> {
        for (q, v) in self.qpos.iter_mut().zip(values) {
            *q = *v;
        }
        self.reset_dynamics();
        Ok(())
    }

    fn joint_angles(&self) -> Vec<f64> {
        self.qpos.clone()
    }

    fn joint_velocities(&self) -> Vec<f64> {
        self.qvel.clone()
    }

    fn joint_forces(&self) -> Vec<f64> {
        self.force.clone()
    }

    fn tool_pose(&self) -> Vector3<f64> {
        self.chain
            .end_effector(&self.qpos)
            .unwrap_or_else(Vector3::zeros)
    }

    fn actuator_count(&self) -> usize {
        self.arm.joints.len()
    }

    fn action_spec(&self) -> ActionSpec {
        ActionSpec {
            names: self.arm.joint_names(),
            minimum: self.arm.joints.iter().map(|j| j.range.0).collect(),
            maximum: self.arm.joints.iter().map(|j| j.range.1).collect(),
        }
    }

    fn set_target(&mut self, pose: Vector3<f64>, size: f64) {
        self.target = Some((pose, size));
    }

    fn step(&mut self, action: &[f64]) -> Result<()> {
        if action.len() > self.ctrl.len() {
            return Err(ReacherError::InvalidAction(format!(
                "{} values for {} actuators",
                action.len(),
                self.ctrl.len()
            )));
        }
        for ((ctrl, joint), &a) in self.ctrl.iter_mut().zip(&self.arm.joints).zip(action) {
            *ctrl = a.clamp(joint.range.0, joint.range.1);
        }
        for _ in 0..self.n_substeps {
            self.substep();
        }
        Ok(())
    }

    fn timestep(&self) -> f64 {
        self.control_timestep
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
