use jaco_rmi::RmiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReacherError {
    /// Unrecognized arm topology, invalid settings, or a start pose that
    /// could not be placed inside the fence. Fatal for setup.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The hardware round trip timed out or the session dropped. The episode
    /// cannot be resumed without re-homing.
    #[error("communication with robot server failed: {0}")]
    Communication(#[from] RmiError),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("no active episode; initialize_episode must be called first")]
    NoActiveEpisode,
}

pub type Result<T, E = ReacherError> = std::result::Result<T, E>;
