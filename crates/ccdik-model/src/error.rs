//! Error types for robot description lookups and assembly.

/// Errors that can occur while assembling or querying a [`RobotModel`](crate::RobotModel).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A referenced link was not found in the model.
    #[error("missing link: {0}")]
    MissingLink(String),

    /// A referenced joint was not found in the model.
    #[error("missing joint: {0}")]
    MissingJoint(String),

    /// The description has no root link (no link that is never a child).
    #[error("no root link found")]
    NoRootLink,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
