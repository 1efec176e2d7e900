//! Control-safety loop for a Kinova Jaco reaching task.
//!
//! Every action is run through forward kinematics and checked against an
//! axis-aligned fence before it may reach a simulated or real arm.

pub mod arm;
pub mod backend;
pub mod config;
pub mod environment;
pub mod error;
pub mod fence;
pub mod kinematics;
pub mod observation;
pub mod reward;
pub mod suite;
pub mod task;
pub mod transform;

pub use arm::{ArmModel, DhLink, JointSpec, LinkLengths, RobotModel};
pub use backend::{build_backend, ActionSpec, HardwareBackend, PhysicsBackend, SimulatedBackend};
pub use config::{BackendConfig, EnvironmentConfig, HardwareConfig, StartPosition, TaskConfig};
pub use environment::{Environment, StepType, TimeStep};
pub use error::{ReacherError, Result};
pub use fence::{FenceBounds, SafetyFence};
pub use kinematics::{ExtremePoint, KinematicChain};
pub use observation::Observation;
pub use reward::{tolerance, Sigmoid, Tolerance};
pub use suite::Difficulty;
pub use task::{EpisodeState, TaskController};
pub use transform::dh_transform;
