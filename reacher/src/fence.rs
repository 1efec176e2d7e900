//! Axis-aligned safety fence.
//!
//! The fence is used two ways. Target placement clamps the sampled point and
//! keeps the clamped value. Motion validation rejects a whole candidate pose
//! when any monitored point would need clamping.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kinematics::ExtremePoint;

/// Bounds of the safe workspace, in meters, world frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FenceBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl FenceBounds {
    pub fn new(x: (f64, f64), y: (f64, f64), z: (f64, f64)) -> Self {
        Self {
            x_min: x.0,
            x_max: x.1,
            y_min: y.0,
            y_max: y.1,
            z_min: z.0,
            z_max: z.1,
        }
    }

    /// Cube of half-width `half_width` centered on the origin.
    pub fn symmetric(half_width: f64) -> Self {
        Self::new(
            (-half_width, half_width),
            (-half_width, half_width),
            (-half_width, half_width),
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        for (axis, min, max) in self.axes() {
            if !min.is_finite() || !max.is_finite() {
                return Err(format!("fence {axis} bounds must be finite, got [{min}, {max}]"));
            }
            if min > max {
                return Err(format!("fence {axis} minimum {min} exceeds maximum {max}"));
            }
        }
        Ok(())
    }

    pub fn contains(&self, point: &Vector3<f64>) -> bool {
        self.axes()
            .iter()
            .zip(point.iter())
            .all(|((_, min, max), v)| v >= min && v <= max)
    }

    fn axes(&self) -> [(char, f64, f64); 3] {
        [
            ('x', self.x_min, self.x_max),
            ('y', self.y_min, self.y_max),
            ('z', self.z_min, self.z_max),
        ]
    }
}

impl Default for FenceBounds {
    /// A box around the Jaco base that keeps the hand off the table and the
    /// home pose well inside.
    fn default() -> Self {
        Self::new((-0.8, 0.8), (-0.8, 0.8), (0.05, 1.2))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SafetyFence {
    bounds: FenceBounds,
}

impl SafetyFence {
    pub fn new(bounds: FenceBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &FenceBounds {
        &self.bounds
    }

    /// Nearest in-bounds point, and whether any axis had to be moved.
    ///
    /// A non-finite coordinate is reported as a violation. NaN passes through
    /// unchanged since it has no nearest bound.
    pub fn clamp(&self, point: &Vector3<f64>) -> (Vector3<f64>, bool) {
        let mut clamped = *point;
        let mut violated = false;

        for (i, (_, min, max)) in self.bounds.axes().into_iter().enumerate() {
            let v = point[i];
            if v.is_nan() {
                violated = true;
            } else if v < min {
                clamped[i] = min;
                violated = true;
            } else if v > max {
                clamped[i] = max;
                violated = true;
            }
        }

        (clamped, violated)
    }

    /// Target placement: keep the clamped point, note the adjustment.
    pub fn advisory_clamp(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let (clamped, violated) = self.clamp(point);
        if violated {
            debug!(
                "target {:?} moved to fence boundary at {:?}",
                point.as_slice(),
                clamped.as_slice()
            );
        }
        clamped
    }

    /// Motion validation: the first monitored point that lies outside, if any.
    pub fn first_violation<'a>(&self, points: &'a [ExtremePoint]) -> Option<&'a ExtremePoint> {
        points.iter().find(|p| self.clamp(&p.position).1)
    }

    pub fn admits(&self, points: &[ExtremePoint]) -> bool {
        self.first_violation(points).is_none()
    }
}
