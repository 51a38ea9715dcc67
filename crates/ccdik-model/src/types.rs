//! Core data types for the in-memory robot description.
//!
//! The description mirrors the usual link/joint tree of a robot arm: every
//! joint connects a parent link to a child link and carries its origin,
//! type, optional rotation axis and optional position limits. It is the
//! source a kinematic chain is built from, and the place solved joint
//! orientations are written back to.

use std::collections::{HashMap, HashSet};

use nalgebra::UnitQuaternion;

use crate::error::ModelError;

const fn identity_orientation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

// ---------------------------------------------------------------------------
// JointType
// ---------------------------------------------------------------------------

/// Joint type as declared by the description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Rotation about a single axis, with position limits.
    Revolute,
    /// Unlimited rotation about a single axis.
    Continuous,
    /// Translation along an axis, with position limits.
    Prismatic,
    /// No relative motion between parent and child.
    Fixed,
    /// Unconstrained 6-DOF joint.
    Floating,
    /// Motion within a plane.
    Planar,
}

// ---------------------------------------------------------------------------
// JointLimits
// ---------------------------------------------------------------------------

/// Position limits of a joint, in radians for rotational joints.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointLimits {
    /// Lower position limit. `None` means unbounded.
    pub lower: Option<f32>,
    /// Upper position limit. `None` means unbounded.
    pub upper: Option<f32>,
}

impl JointLimits {
    /// Limits bounded on both sides.
    pub const fn new(lower: f32, upper: f32) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// Both bounds, if both are present.
    pub fn bounds(&self) -> Option<(f32, f32)> {
        self.lower.zip(self.upper)
    }
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// A local pose: translation plus orientation quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Origin {
    /// Translation `[x, y, z]`.
    pub xyz: [f32; 3],
    /// Orientation quaternion `[x, y, z, w]`.
    pub orientation: [f32; 4],
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            xyz: [0.0; 3],
            orientation: identity_orientation(),
        }
    }
}

impl Origin {
    /// Pure translation.
    pub fn from_xyz(xyz: [f32; 3]) -> Self {
        Self {
            xyz,
            ..Self::default()
        }
    }

    /// Translation plus roll-pitch-yaw (extrinsic XYZ) rotation.
    pub fn from_xyz_rpy(xyz: [f32; 3], rpy: [f32; 3]) -> Self {
        let q = UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]);
        Self {
            xyz,
            orientation: [q.i, q.j, q.k, q.w],
        }
    }
}

// ---------------------------------------------------------------------------
// LinkData
// ---------------------------------------------------------------------------

/// A rigid body between joints. Only the name matters for chain building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkData {
    /// Link name.
    pub name: String,
}

impl LinkData {
    /// Create a link with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ---------------------------------------------------------------------------
// JointData
// ---------------------------------------------------------------------------

/// A joint connecting a parent link to a child link.
#[derive(Debug, Clone, PartialEq)]
pub struct JointData {
    /// Joint name.
    pub name: String,
    /// Joint type.
    pub joint_type: JointType,
    /// Parent link name.
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Joint origin relative to the parent link. The orientation is the
    /// joint's current local rotation and is overwritten by write-back.
    pub origin: Origin,
    /// Rotation axis in the joint frame. `None` means the +Y default.
    pub axis: Option<[f32; 3]>,
    /// Position limits.
    pub limits: JointLimits,
}

impl JointData {
    /// Create a joint with a default origin, no axis and no limits.
    pub fn new(
        name: impl Into<String>,
        joint_type: JointType,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type,
            parent: parent.into(),
            child: child.into(),
            origin: Origin::default(),
            axis: None,
            limits: JointLimits::default(),
        }
    }

    /// Set the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Set the rotation axis.
    #[must_use]
    pub fn with_axis(mut self, axis: [f32; 3]) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Set lower and upper position limits.
    #[must_use]
    pub fn with_limits(mut self, lower: f32, upper: f32) -> Self {
        self.limits = JointLimits::new(lower, upper);
        self
    }
}

// ---------------------------------------------------------------------------
// RobotModel
// ---------------------------------------------------------------------------

/// Complete in-memory description of a robot.
///
/// Contains the link/joint tree, the root link name and the pose of the
/// robot base in the world.
#[derive(Debug, Clone)]
pub struct RobotModel {
    /// Robot name.
    pub name: String,
    /// Pose of the robot base in the world.
    pub base: Origin,
    /// All links, keyed by name.
    pub links: HashMap<String, LinkData>,
    /// All joints, keyed by name.
    pub joints: HashMap<String, JointData>,
    /// Name of the root link (the one never referenced as a child).
    pub root_link: String,
}

impl RobotModel {
    /// Assemble a model from links and joints.
    ///
    /// The root link is the link never referenced as a joint child; if
    /// several qualify, the alphabetically first one is used.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingLink`] if a joint references an unknown
    /// link, or [`ModelError::NoRootLink`] if every link is some joint's child.
    pub fn from_parts(
        name: impl Into<String>,
        links: impl IntoIterator<Item = LinkData>,
        joints: impl IntoIterator<Item = JointData>,
    ) -> Result<Self, ModelError> {
        let links: HashMap<String, LinkData> =
            links.into_iter().map(|l| (l.name.clone(), l)).collect();
        let joints: HashMap<String, JointData> =
            joints.into_iter().map(|j| (j.name.clone(), j)).collect();

        for joint in joints.values() {
            for link in [&joint.parent, &joint.child] {
                if !links.contains_key(link) {
                    return Err(ModelError::MissingLink(link.clone()));
                }
            }
        }

        let child_links: HashSet<&str> = joints.values().map(|j| j.child.as_str()).collect();
        let root_link = links
            .keys()
            .filter(|name| !child_links.contains(name.as_str()))
            .min()
            .ok_or(ModelError::NoRootLink)?
            .clone();

        Ok(Self {
            name: name.into(),
            base: Origin::default(),
            links,
            joints,
            root_link,
        })
    }

    /// Set the base pose.
    #[must_use]
    pub fn with_base(mut self, base: Origin) -> Self {
        self.base = base;
        self
    }

    /// Get a link by name.
    pub fn link(&self, name: &str) -> Result<&LinkData, ModelError> {
        self.links
            .get(name)
            .ok_or_else(|| ModelError::MissingLink(name.into()))
    }

    /// Get a joint by name.
    pub fn joint(&self, name: &str) -> Result<&JointData, ModelError> {
        self.joints
            .get(name)
            .ok_or_else(|| ModelError::MissingJoint(name.into()))
    }

    /// Get a mutable joint by name.
    pub fn joint_mut(&mut self, name: &str) -> Result<&mut JointData, ModelError> {
        self.joints
            .get_mut(name)
            .ok_or_else(|| ModelError::MissingJoint(name.into()))
    }

    /// Joints whose parent is `link`, sorted by name.
    pub fn child_joints(&self, link: &str) -> Vec<&JointData> {
        let mut children: Vec<&JointData> =
            self.joints.values().filter(|j| j.parent == link).collect();
        children.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Overwrite a joint's local orientation (`[x, y, z, w]`).
    pub fn set_joint_orientation(
        &mut self,
        name: &str,
        orientation: [f32; 4],
    ) -> Result<(), ModelError> {
        self.joint_mut(name)?.origin.orientation = orientation;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
