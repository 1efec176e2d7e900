//! Forward kinematics over a DH chain.
//!
//! Only positions of a chosen subset of joints ("extreme joints") are
//! produced; they are what the safety fence and the observation need. Nothing
//! is cached, joint angles change every tick.

use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::arm::{DhLink, LinkLengths};
use crate::transform::dh_transform;

/// World-space position of one joint of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremePoint {
    /// 1-based joint index, base to tip.
    pub joint: usize,
    pub position: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KinematicChain {
    links: Vec<DhLink>,
    base: Matrix4<f64>,
}

impl KinematicChain {
    /// Chain over `links`, ordered base to tip. The base frame is a half turn
    /// about x, aligning the DH frames with the simulation frame.
    pub fn new(links: Vec<DhLink>) -> Self {
        Self {
            links,
            base: dh_transform(0.0, 0.0, 0.0, PI),
        }
    }

    pub fn jaco_j2s7s300() -> Self {
        Self::from_link_lengths(&LinkLengths::j2s7s300())
    }

    pub fn from_link_lengths(lengths: &LinkLengths) -> Self {
        Self::new(lengths.dh_table())
    }

    pub fn dof(&self) -> usize {
        self.links.len()
    }

    pub fn links(&self) -> &[DhLink] {
        &self.links
    }

    /// Positions of the joints listed in `extreme_joints` (1-based), in chain
    /// order.
    ///
    /// Only as many links as there are angles are composed, so a short prefix
    /// yields only the extreme points inside that prefix. Angles past the end
    /// of the chain are ignored.
    pub fn evaluate(&self, joint_angles: &[f64], extreme_joints: &[usize]) -> Vec<ExtremePoint> {
        let mut cumulative = self.base;
        let mut extremes = Vec::with_capacity(extreme_joints.len());

        for (i, (angle, link)) in joint_angles.iter().zip(&self.links).enumerate() {
            let theta = link.theta_sign * angle + link.theta_offset;
            cumulative *= dh_transform(link.d, theta, link.a, link.alpha);

            if extreme_joints.contains(&(i + 1)) {
                // x of the base frame points opposite to the world x axis
                extremes.push(ExtremePoint {
                    joint: i + 1,
                    position: Vector3::new(-cumulative[(0, 3)], cumulative[(1, 3)], cumulative[(2, 3)]),
                });
            }
        }

        extremes
    }

    /// Position of the last link of the chain (the hand).
    pub fn end_effector(&self, joint_angles: &[f64]) -> Option<Vector3<f64>> {
        self.evaluate(joint_angles, &[self.dof()])
            .first()
            .map(|p| p.position)
    }
}

impl Default for KinematicChain {
    fn default() -> Self {
        Self::jaco_j2s7s300()
    }
}
