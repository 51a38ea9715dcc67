//! In-memory robot description for CCD inverse kinematics.
//!
//! Provides types for representing a robot's link/joint tree: joint origins,
//! types, rotation axes and limits. A kinematic chain is built from a
//! [`RobotModel`], and solved joint orientations can be written back to it.

pub mod error;
pub mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::ModelError;
pub use types::{JointData, JointLimits, JointType, LinkData, Origin, RobotModel};
