//! Error types for chain building and solver configuration.

use thiserror::Error;

use ccdik_model::ModelError;

/// Top-level error type for ccdik.
#[derive(Debug, Error)]
pub enum IkError {
    #[error("Malformed chain: {0}")]
    MalformedChain(#[from] MalformedChain),

    #[error("Description error: {0}")]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Structural defects detected while building a chain from a description.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedChain {
    #[error("link {link} branches into {} joints: {}", .joints.len(), .joints.join(", "))]
    Branching { link: String, joints: Vec<String> },

    #[error("link {link} is reached twice")]
    Cycle { link: String },

    #[error("joint {joint} has a degenerate axis {axis:?}")]
    DegenerateAxis { joint: String, axis: [f32; 3] },

    #[error("joint {joint} has a zero-length orientation quaternion")]
    DegenerateOrientation { joint: String },

    #[error("joint {joint} has lower limit {lower} above upper limit {upper}")]
    InvertedLimit {
        joint: String,
        lower: f32,
        upper: f32,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid tolerance: {0} (must be finite and > 0)")]
    InvalidTolerance(f32),

    #[error("max_iterations must be > 0")]
    ZeroIterations,
}
