//! Kinematic chain built from a [`RobotModel`].
//!
//! A [`KinematicChain`] is an ordered arena of joints from the robot base
//! (the synthesised root joint) to the end effector. Each joint stores its
//! local transform, axis and limit metadata, plus the index of its parent.
//! World transforms are cached and only recomputed by [`KinematicChain::refresh`];
//! mutating a joint's orientation does not propagate on its own.

use std::collections::HashSet;
use std::f32::consts::TAU;

use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, UnitVector3, Vector3};
use tracing::{debug, warn};

use ccdik_model::{JointData, JointType, Origin, RobotModel};

use crate::error::{IkError, MalformedChain};

/// Axis used when the description does not declare one.
pub const DEFAULT_AXIS: [f32; 3] = [0.0, 1.0, 0.0];

/// Axes shorter than this are degenerate.
const AXIS_EPSILON: f32 = 1e-6;

/// Unit-axis components at or below this magnitude are treated as zero.
const DOMINANT_EPSILON: f32 = 1e-3;

// ---------------------------------------------------------------------------
// JointKind
// ---------------------------------------------------------------------------

/// How the solver treats a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    /// The robot base. Rotates about its axis only.
    Root,
    /// Hinge: rotates about its axis only, optionally limited.
    Revolute,
    /// Never rotates.
    Fixed,
    /// Any other description type; rotates freely.
    Other,
}

impl JointKind {
    /// Classify a description joint type.
    pub const fn classify(joint_type: JointType) -> Self {
        match joint_type {
            JointType::Revolute => Self::Revolute,
            JointType::Fixed => Self::Fixed,
            JointType::Continuous
            | JointType::Prismatic
            | JointType::Floating
            | JointType::Planar => Self::Other,
        }
    }

    /// Whether rotation is projected back onto the joint axis.
    pub const fn is_axis_constrained(self) -> bool {
        matches!(self, Self::Root | Self::Revolute)
    }
}

// ---------------------------------------------------------------------------
// DominantAxis
// ---------------------------------------------------------------------------

/// The first clearly nonzero component of a joint axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DominantAxis {
    X,
    Y,
    Z,
}

impl DominantAxis {
    /// Label for `axis`, or `None` if no component exceeds the threshold.
    pub fn of(axis: &Vector3<f32>) -> Option<Self> {
        let index = axis.iter().position(|c| c.abs() > DOMINANT_EPSILON)?;
        Some(match index {
            0 => Self::X,
            1 => Self::Y,
            _ => Self::Z,
        })
    }

    /// Component index (`x = 0`, `y = 1`, `z = 2`).
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// JointLimit
// ---------------------------------------------------------------------------

/// Angular limit of a revolute joint, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimit {
    pub lower: f32,
    pub upper: f32,
}

impl JointLimit {
    /// Whether `angle` lies inside `[lower, upper]`.
    pub fn contains(&self, angle: f32) -> bool {
        (self.lower..=self.upper).contains(&angle)
    }

    /// Clamp `angle` into `[lower, upper]`.
    ///
    /// Angles outside the range snap to whichever bound is closer around the
    /// circle, so a half turn reads the same as `PI` or `-PI`.
    pub fn clamp(&self, angle: f32) -> f32 {
        if self.contains(angle) {
            angle
        } else if circular_distance(angle, self.lower) <= circular_distance(angle, self.upper) {
            self.lower
        } else {
            self.upper
        }
    }
}

/// Unsigned angle between `a` and `b` on the circle, in `[0, PI]`.
fn circular_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

// ---------------------------------------------------------------------------
// ChainJoint
// ---------------------------------------------------------------------------

/// A single joint in the kinematic chain.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    /// Joint name. The root joint carries the robot name.
    pub name: String,
    /// Solver classification.
    pub kind: JointKind,
    /// Index of the parent joint in the chain. `None` for the root.
    pub parent: Option<usize>,
    /// Local position offset from the parent joint frame.
    pub position: Vector3<f32>,
    /// Local orientation relative to the parent joint frame.
    pub orientation: UnitQuaternion<f32>,
    /// Rotation axis in the joint's local frame.
    pub axis: UnitVector3<f32>,
    /// First nonzero component of `axis`.
    pub dominant: DominantAxis,
    /// Angular limit. Only revolute joints carry one.
    pub limit: Option<JointLimit>,
}

impl ChainJoint {
    fn root(model: &RobotModel) -> Result<Self, MalformedChain> {
        let (axis, dominant) = unit_axis(&model.name, DEFAULT_AXIS)?;
        let (position, orientation) = split_origin(&model.name, &model.base)?;
        Ok(Self {
            name: model.name.clone(),
            kind: JointKind::Root,
            parent: None,
            position,
            orientation,
            axis,
            dominant,
            limit: None,
        })
    }

    fn from_data(data: &JointData, parent: usize) -> Result<Self, MalformedChain> {
        let kind = JointKind::classify(data.joint_type);
        let (axis, dominant) = unit_axis(&data.name, data.axis.unwrap_or(DEFAULT_AXIS))?;
        let (position, orientation) = split_origin(&data.name, &data.origin)?;

        let limit = match (kind, data.limits.bounds()) {
            (JointKind::Revolute, Some((lower, upper))) => {
                if lower > upper {
                    return Err(MalformedChain::InvertedLimit {
                        joint: data.name.clone(),
                        lower,
                        upper,
                    });
                }
                Some(JointLimit { lower, upper })
            }
            _ => None,
        };

        Ok(Self {
            name: data.name.clone(),
            kind,
            parent: Some(parent),
            position,
            orientation,
            axis,
            dominant,
            limit,
        })
    }

    /// Local transform relative to the parent joint frame.
    pub fn local_transform(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }

    /// Signed rotation angle about the joint axis, in `[-PI, PI]`.
    ///
    /// Read from the quaternion component matching the dominant axis. The
    /// ratio is clamped to `[-1, 1]` before the inverse sine so that
    /// floating-point drift cannot produce NaN.
    pub fn angle(&self) -> f32 {
        let q = *self.orientation.quaternion();
        let q = if q.w < 0.0 { -q } else { q };
        let d = self.dominant.index();
        let ratio = (q.imag()[d] / self.axis[d]).clamp(-1.0, 1.0);
        2.0 * ratio.asin()
    }
}

// ---------------------------------------------------------------------------
// KinematicChain
// ---------------------------------------------------------------------------

/// An ordered, single-branch chain from the robot base to the end effector.
///
/// Index 0 is always the root joint; the last index is the end effector.
/// The chain is never empty.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    /// Joints from root to end effector.
    joints: Vec<ChainJoint>,
    /// Cached world transform of each joint, same indexing as `joints`.
    world: Vec<Isometry3<f32>>,
}

impl KinematicChain {
    /// Build a chain from a [`RobotModel`].
    ///
    /// Starts from a root joint synthesised from the robot base, then follows
    /// the single joint hanging off each link until a link with no child
    /// joint is reached. The last joint followed becomes the end effector.
    ///
    /// # Errors
    ///
    /// Returns [`IkError::MalformedChain`] if a link has more than one child
    /// joint, the walk revisits a link, a joint axis has no dominant
    /// component, a joint origin has a zero quaternion, or a revolute limit
    /// is inverted. Returns [`IkError::Model`] if the root link is missing.
    pub fn from_model(model: &RobotModel) -> Result<Self, IkError> {
        let joints = trace_joints(model).inspect_err(|err| {
            warn!(robot = %model.name, error = %err, "Rejected robot description");
        })?;

        let mut chain = Self {
            world: vec![Isometry3::identity(); joints.len()],
            joints,
        };
        chain.refresh_all();

        debug!(
            robot = %model.name,
            joints = chain.len(),
            end_effector = %chain.end_effector().name,
            "Built kinematic chain"
        );
        Ok(chain)
    }

    /// Discard the current joints and rebuild from `model`.
    ///
    /// On error the chain is left unchanged.
    pub fn rebuild(&mut self, model: &RobotModel) -> Result<(), IkError> {
        *self = Self::from_model(model)?;
        Ok(())
    }

    /// Number of joints, root and end effector included.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Always `false`: a chain holds at least its root joint.
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joints in chain order, root first.
    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub(crate) fn joint_mut(&mut self, index: usize) -> &mut ChainJoint {
        &mut self.joints[index]
    }

    /// Index of the joint called `name`.
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Index of the end effector.
    pub fn end_effector_index(&self) -> usize {
        self.joints.len() - 1
    }

    /// The end effector (last joint).
    pub fn end_effector(&self) -> &ChainJoint {
        &self.joints[self.end_effector_index()]
    }

    /// Cached world transform of joint `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn world_transform(&self, index: usize) -> &Isometry3<f32> {
        &self.world[index]
    }

    /// World-space origin of joint `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn world_position(&self, index: usize) -> Point3<f32> {
        Point3::from(self.world[index].translation.vector)
    }

    /// Convert a world-space point into joint `index`'s local frame.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn to_local(&self, index: usize, world_point: &Point3<f32>) -> Point3<f32> {
        self.world[index].inverse_transform_point(world_point)
    }

    /// Convert a point in joint `index`'s local frame into world space.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn to_world(&self, index: usize, local_point: &Point3<f32>) -> Point3<f32> {
        self.world[index].transform_point(local_point)
    }

    /// Distance from the end effector to `target`, measured in the
    /// effector's local frame.
    pub fn effector_distance(&self, target: &Point3<f32>) -> f32 {
        self.to_local(self.end_effector_index(), target).coords.norm()
    }

    /// Sum of the link offsets between joints: an upper bound on how far the
    /// end effector can get from the root.
    pub fn reach(&self) -> f32 {
        self.joints.iter().skip(1).map(|j| j.position.norm()).sum()
    }

    /// Overwrite joint `index`'s local orientation and refresh the cache.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn set_orientation(&mut self, index: usize, orientation: UnitQuaternion<f32>) {
        self.joints[index].orientation = orientation;
        self.refresh(index);
    }

    /// Recompute the cached world transforms of joint `index` and every
    /// joint after it.
    ///
    /// Does nothing if `index >= self.len()`.
    pub fn refresh(&mut self, index: usize) {
        for i in index..self.joints.len() {
            let local = self.joints[i].local_transform();
            self.world[i] = match self.joints[i].parent {
                Some(parent) => self.world[parent] * local,
                None => local,
            };
        }
    }

    /// Recompute every cached world transform.
    pub fn refresh_all(&mut self) {
        self.refresh(0);
    }
}

// ---------------------------------------------------------------------------
// Build helpers
// ---------------------------------------------------------------------------

/// Walk the description from the root link, one joint per link.
fn trace_joints(model: &RobotModel) -> Result<Vec<ChainJoint>, IkError> {
    model.link(&model.root_link)?;

    let mut joints = vec![ChainJoint::root(model)?];
    let mut visited = HashSet::from([model.root_link.as_str()]);
    let mut link = model.root_link.as_str();

    loop {
        let children = model.child_joints(link);
        let joint = match children.as_slice() {
            [] => break,
            [joint] => *joint,
            _ => {
                return Err(MalformedChain::Branching {
                    link: link.to_owned(),
                    joints: children.iter().map(|j| j.name.clone()).collect(),
                }
                .into());
            }
        };

        if !visited.insert(joint.child.as_str()) {
            return Err(MalformedChain::Cycle {
                link: joint.child.clone(),
            }
            .into());
        }

        let parent = joints.len() - 1;
        joints.push(ChainJoint::from_data(joint, parent)?);
        link = joint.child.as_str();
    }

    Ok(joints)
}

/// Normalise a declared axis and find its dominant component.
fn unit_axis(
    joint: &str,
    raw: [f32; 3],
) -> Result<(UnitVector3<f32>, DominantAxis), MalformedChain> {
    let degenerate = || MalformedChain::DegenerateAxis {
        joint: joint.to_owned(),
        axis: raw,
    };

    let v = Vector3::from(raw);
    if !v.iter().all(|c| c.is_finite()) {
        return Err(degenerate());
    }
    let axis = UnitVector3::try_new(v, AXIS_EPSILON).ok_or_else(degenerate)?;
    let dominant = DominantAxis::of(&axis).ok_or_else(degenerate)?;
    Ok((axis, dominant))
}

/// Split a description [`Origin`] into position and unit orientation.
fn split_origin(
    joint: &str,
    origin: &Origin,
) -> Result<(Vector3<f32>, UnitQuaternion<f32>), MalformedChain> {
    let [x, y, z, w] = origin.orientation;
    let orientation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), f32::EPSILON)
        .ok_or_else(|| MalformedChain::DegenerateOrientation {
            joint: joint.to_owned(),
        })?;
    Ok((Vector3::from(origin.xyz), orientation))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
