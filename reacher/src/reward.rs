//! Bounded tolerance rewards.
//!
//! A value is rewarded with 1 inside `bounds` and falls off through a sigmoid
//! outside, reaching `value_at_margin` at distance `margin` from the nearest
//! bound. A zero margin gives a plain indicator of the bounds.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{ReacherError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sigmoid {
    #[default]
    Gaussian,
    Hyperbolic,
    LongTail,
    Reciprocal,
    Cosine,
    Linear,
    Quadratic,
    TanhSquared,
}

impl Sigmoid {
    /// Finite support sigmoids reach exactly zero, so they accept a zero
    /// value at the margin.
    fn accepts_zero(self) -> bool {
        matches!(self, Sigmoid::Cosine | Sigmoid::Linear | Sigmoid::Quadratic)
    }

    /// Maps a distance in margin units to `(0, 1]`, with `value(1) == value_at_1`.
    fn value(self, x: f64, value_at_1: f64) -> f64 {
        match self {
            Sigmoid::Gaussian => {
                let scale = (-2.0 * value_at_1.ln()).sqrt();
                (-0.5 * (x * scale).powi(2)).exp()
            }
            Sigmoid::Hyperbolic => {
                let scale = (1.0 / value_at_1).acosh();
                1.0 / (x * scale).cosh()
            }
            Sigmoid::LongTail => {
                let scale = (1.0 / value_at_1 - 1.0).sqrt();
                1.0 / ((x * scale).powi(2) + 1.0)
            }
            Sigmoid::Reciprocal => {
                let scale = 1.0 / value_at_1 - 1.0;
                1.0 / (x.abs() * scale + 1.0)
            }
            Sigmoid::Cosine => {
                let scaled = x * (2.0 * value_at_1 - 1.0).acos() / PI;
                if scaled.abs() < 1.0 {
                    (1.0 + (PI * scaled).cos()) / 2.0
                } else {
                    0.0
                }
            }
            Sigmoid::Linear => {
                let scaled = x * (1.0 - value_at_1);
                if scaled.abs() < 1.0 {
                    1.0 - scaled
                } else {
                    0.0
                }
            }
            Sigmoid::Quadratic => {
                let scaled = x * (1.0 - value_at_1).sqrt();
                if scaled.abs() < 1.0 {
                    1.0 - scaled * scaled
                } else {
                    0.0
                }
            }
            Sigmoid::TanhSquared => {
                let scale = (1.0 - value_at_1).sqrt().atanh();
                1.0 - (x * scale).tanh().powi(2)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    lower: f64,
    upper: f64,
    margin: f64,
    sigmoid: Sigmoid,
    value_at_margin: f64,
}

impl Tolerance {
    pub fn new(
        bounds: (f64, f64),
        margin: f64,
        sigmoid: Sigmoid,
        value_at_margin: f64,
    ) -> Result<Self> {
        let (lower, upper) = bounds;
        if !(lower <= upper) {
            return Err(ReacherError::Configuration(format!(
                "tolerance lower bound {lower} must not exceed upper bound {upper}"
            )));
        }
        if !(margin >= 0.0) {
            return Err(ReacherError::Configuration(format!(
                "tolerance margin must be non-negative, got {margin}"
            )));
        }
        let min_ok = if sigmoid.accepts_zero() {
            value_at_margin >= 0.0
        } else {
            value_at_margin > 0.0
        };
        if margin > 0.0 && !(min_ok && value_at_margin < 1.0) {
            return Err(ReacherError::Configuration(format!(
                "value_at_margin {value_at_margin} is out of range for {sigmoid:?}"
            )));
        }

        Ok(Self {
            lower,
            upper,
            margin,
            sigmoid,
            value_at_margin,
        })
    }

    /// Indicator of `bounds`.
    pub fn bounds(bounds: (f64, f64)) -> Result<Self> {
        Self::new(bounds, 0.0, Sigmoid::Gaussian, 0.1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        if x >= self.lower && x <= self.upper {
            return 1.0;
        }
        if self.margin == 0.0 {
            return 0.0;
        }
        let distance = if x < self.lower {
            self.lower - x
        } else {
            x - self.upper
        };
        self.sigmoid.value(distance / self.margin, self.value_at_margin)
    }
}

/// One-shot form of [`Tolerance::eval`].
pub fn tolerance(
    x: f64,
    bounds: (f64, f64),
    margin: f64,
    sigmoid: Sigmoid,
    value_at_margin: f64,
) -> Result<f64> {
    Ok(Tolerance::new(bounds, margin, sigmoid, value_at_margin)?.eval(x))
}
