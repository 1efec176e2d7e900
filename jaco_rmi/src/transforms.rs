//! Conversions between wire types and nalgebra geometric types.
//!
//! Only compiled with the `nalgebra-support` feature:
//!
//! ```toml
//! [dependencies]
//! jaco_rmi = { path = "../jaco_rmi", features = ["nalgebra-support"] }
//! ```

#[cfg(feature = "nalgebra-support")]
use crate::ToolPose;

#[cfg(feature = "nalgebra-support")]
use nalgebra::{Point3, Vector3};

#[cfg(feature = "nalgebra-support")]
impl From<ToolPose> for Vector3<f64> {
    fn from(pose: ToolPose) -> Self {
        Vector3::new(pose.x, pose.y, pose.z)
    }
}

#[cfg(feature = "nalgebra-support")]
impl From<&ToolPose> for Vector3<f64> {
    fn from(pose: &ToolPose) -> Self {
        (*pose).into()
    }
}

#[cfg(feature = "nalgebra-support")]
impl From<Vector3<f64>> for ToolPose {
    fn from(v: Vector3<f64>) -> Self {
        ToolPose::new(v.x, v.y, v.z)
    }
}

#[cfg(feature = "nalgebra-support")]
impl From<ToolPose> for Point3<f64> {
    fn from(pose: ToolPose) -> Self {
        Point3::new(pose.x, pose.y, pose.z)
    }
}
