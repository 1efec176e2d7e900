//! Arm model data for the Kinova Jaco 2 family.
//!
//! Holds the fixed link lengths the Denavit-Hartenberg table is derived from,
//! and the joint layout (names and control ranges) a simulated arm exposes.
//! Lengths are in meters, angles in radians.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Supported arm models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RobotModel {
    /// 7 DOF spherical wrist, 3 fingers.
    #[default]
    J2s7s300,
}

/// Parameters of one link in the DH chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DhLink {
    /// `+1.0` or `-1.0`; flips the joint direction relative to the DH frame.
    pub theta_sign: f64,
    pub d: f64,
    pub a: f64,
    pub alpha: f64,
    pub theta_offset: f64,
}

impl DhLink {
    pub fn new(theta_sign: f64, d: f64, a: f64, alpha: f64, theta_offset: f64) -> Self {
        Self {
            theta_sign,
            d,
            a,
            alpha,
            theta_offset,
        }
    }
}

/// Physical link lengths of a Jaco 2 arm.
///
/// | Name | Segment |
/// |------|---------|
/// | d1 | base to shoulder |
/// | d2 | first half of upper arm |
/// | d3 | second half of upper arm |
/// | d4 | forearm (elbow to wrist) |
/// | d5 | first wrist length |
/// | d6 | second wrist length |
/// | d7 | wrist to center of the hand |
/// | e2 | joint 3-4 lateral offset |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkLengths {
    pub d1: f64,
    pub d2: f64,
    pub d3: f64,
    pub d4: f64,
    pub d5: f64,
    pub d6: f64,
    pub d7: f64,
    pub e2: f64,
}

impl LinkLengths {
    pub fn j2s7s300() -> Self {
        Self {
            d1: 0.2755,
            d2: 0.2050,
            d3: 0.2050,
            d4: 0.2073,
            d5: 0.1038,
            d6: 0.1038,
            d7: 0.1600,
            e2: 0.0098,
        }
    }

    /// DH table of the 7 major joints, base to hand, in the Kinova ROS
    /// convention.
    pub fn dh_table(&self) -> Vec<DhLink> {
        let theta_sign = [-1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let d = [
            -self.d1,
            0.0,
            -(self.d2 + self.d3),
            -self.e2,
            -(self.d4 + self.d5),
            0.0,
            -(self.d6 + self.d7),
        ];
        let alpha = [FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, FRAC_PI_2, PI];

        (0..7)
            .map(|i| DhLink::new(theta_sign[i], d[i], 0.0, alpha[i], 0.0))
            .collect()
    }
}

impl Default for LinkLengths {
    fn default() -> Self {
        Self::j2s7s300()
    }
}

/// One actuated joint of a simulated arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    /// Control range `(min, max)` of the position actuator driving the joint.
    pub range: (f64, f64),
}

impl JointSpec {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            range: (min, max),
        }
    }

    /// Finger joints are recognized by name, the way the model file labels them.
    pub fn is_finger(&self) -> bool {
        self.name.contains("finger")
    }
}

/// Joint layout of an arm as a simulator sees it. Major joints come first,
/// finger joints last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmModel {
    pub model: RobotModel,
    pub joints: Vec<JointSpec>,
    pub link_lengths: LinkLengths,
}

impl ArmModel {
    /// Jaco 2, 7 DOF, 3 fingers: 7 major joints then a proximal and a tip
    /// joint per finger.
    pub fn j2s7s300() -> Self {
        let continuous = 2.0 * TAU;
        let mut joints = vec![
            JointSpec::new("jaco_joint_1", -continuous, continuous),
            JointSpec::new("jaco_joint_2", 0.82, 5.46),
            JointSpec::new("jaco_joint_3", -continuous, continuous),
            JointSpec::new("jaco_joint_4", 0.33, 5.95),
            JointSpec::new("jaco_joint_5", -continuous, continuous),
            JointSpec::new("jaco_joint_6", 1.13, 5.15),
            JointSpec::new("jaco_joint_7", -continuous, continuous),
        ];
        for finger in 1..=3 {
            joints.push(JointSpec::new(format!("jaco_joint_finger_{finger}"), 0.0, 2.0));
            joints.push(JointSpec::new(format!("jaco_joint_finger_tip_{finger}"), 0.0, 2.0));
        }

        Self {
            model: RobotModel::J2s7s300,
            joints,
            link_lengths: LinkLengths::j2s7s300(),
        }
    }

    pub fn from_model(model: RobotModel) -> Self {
        match model {
            RobotModel::J2s7s300 => Self::j2s7s300(),
        }
    }

    pub fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }

    pub fn n_major_joints(&self) -> usize {
        self.joints.iter().filter(|j| !j.is_finger()).count()
    }
}

impl Default for ArmModel {
    fn default() -> Self {
        Self::j2s7s300()
    }
}
