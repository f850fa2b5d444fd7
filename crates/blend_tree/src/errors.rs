use blend_tree_pose_mesh::errors::PoseMeshError;
use thiserror::Error;

/// Errors produced while loading a [`BlendConfig`](crate::config::BlendConfig).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not parse RON: {0}")]
    RonSpannedError(#[from] ron::error::SpannedError),
    #[error("Walk speed {walk_speed} and run speed {run_speed} must be finite with 0 <= walk <= run and run > 0")]
    InvalidSpeeds { walk_speed: f32, run_speed: f32 },
    #[error("Pose mesh {0} is defined more than once")]
    DuplicatePoseMesh(String),
    #[error("Could not build pose mesh: {0}")]
    PoseMesh(#[from] PoseMeshError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
