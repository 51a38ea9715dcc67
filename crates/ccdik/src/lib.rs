//! Cyclic Coordinate Descent inverse kinematics for robot arms.
//!
//! Builds a single-branch kinematic chain from a robot description and
//! drives its end effector toward a target point by rotating one joint at a
//! time, sweeping from the effector toward the base.
//!
//! # Architecture
//!
//! ```text
//! RobotModel ──► KinematicChain ──► CcdSolver ──► joint orientations
//!                      ▲                              │
//!                      └──── IkOrchestrator ◄─────────┘ (optional write-back)
//! ```
//!
//! The [`KinematicChain`] is built from a [`RobotModel`](ccdik_model::RobotModel)
//! once, at setup. The solver mutates the chain's joint orientations in place;
//! the [`IkOrchestrator`] owns chain, target and configuration and is meant
//! to be updated once per frame, directly or through [`CcdIkPlugin`].

pub mod chain;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod plugin;
pub mod solver;

pub use chain::{ChainJoint, DominantAxis, JointKind, JointLimit, KinematicChain};
pub use config::CcdConfig;
pub use error::{ConfigError, IkError, MalformedChain};
pub use orchestrator::IkOrchestrator;
pub use plugin::{CcdIk, CcdIkPlugin, CcdIkSet, IkLastReport};
pub use solver::{CcdSolver, SolveReport, shortest_arc};
