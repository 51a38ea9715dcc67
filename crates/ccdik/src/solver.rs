//! Cyclic Coordinate Descent IK solver.
//!
//! Sweeps the chain from the joint nearest the end effector toward the
//! root, rotating one joint at a time so the effector swings toward the
//! target. Axis-constrained joints have any off-axis rotation projected
//! out, and limited joints are clamped, after every step.

use std::f32::consts::PI;

use nalgebra::{Point3, UnitQuaternion, UnitVector3, Vector3};
use tracing::debug;

use crate::chain::{JointKind, KinematicChain};
use crate::config::CcdConfig;

/// Largest cosine between a preferred half-turn axis and the rotated
/// direction for the axis to count as perpendicular.
const PERPENDICULAR_EPSILON: f32 = 1e-4;

/// Diagnostics of a single solve.
///
/// The solver never reports failure; this only says where it stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Number of sweeps performed.
    pub iterations: u32,
    /// Effector-to-target distance after the last sweep.
    pub distance: f32,
}

/// CCD inverse kinematics solver.
#[derive(Debug, Clone, Default)]
pub struct CcdSolver {
    config: CcdConfig,
}

impl CcdSolver {
    /// Create a new solver with the given configuration.
    ///
    /// `config` is used as given; run [`CcdConfig::validate`] first. A
    /// non-positive or NaN tolerance, or zero `max_iterations`, turns every
    /// solve into a no-op. [`IkOrchestrator::new`](crate::IkOrchestrator::new)
    /// validates for you.
    pub const fn new(config: CcdConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CcdConfig::default())
    }

    /// The solver configuration.
    pub fn config(&self) -> &CcdConfig {
        &self.config
    }

    /// Drive the end effector of `chain` toward `target` (world space).
    ///
    /// Joint orientations are mutated in place. Stops once the effector is
    /// within `tolerance` of the target or after `max_iterations` sweeps,
    /// whichever comes first; the best pose reached is kept either way.
    pub fn solve(&self, chain: &mut KinematicChain, target: &Point3<f32>) -> SolveReport {
        let effector = chain.end_effector_index();
        let mut distance = chain.effector_distance(target);
        let mut iterations = 0;

        while distance > self.config.tolerance && iterations < self.config.max_iterations {
            for index in (0..effector).rev() {
                step_joint(chain, index, target);
            }
            distance = chain.effector_distance(target);
            iterations += 1;
        }

        debug!(
            iterations,
            distance,
            converged = distance <= self.config.tolerance,
            "CCD solve finished"
        );

        SolveReport {
            iterations,
            distance,
        }
    }
}

/// Rotate joint `index` so the end effector points at `target`, then apply
/// the joint's axis and limit constraints and refresh the world cache.
fn step_joint(chain: &mut KinematicChain, index: usize, target: &Point3<f32>) {
    if chain.joints()[index].kind == JointKind::Fixed {
        return;
    }

    let effector = chain.world_position(chain.end_effector_index());
    let to_effector = chain.to_local(index, &effector).coords;
    let to_target = chain.to_local(index, target).coords;

    let joint = chain.joint_mut(index);
    let hinge = joint.kind.is_axis_constrained().then_some(joint.axis);
    joint.orientation *= shortest_arc(&to_effector, &to_target, hinge.as_ref());

    if hinge.is_some() {
        let carried = joint.orientation.inverse_transform_vector(&joint.axis);
        joint.orientation *= shortest_arc(&joint.axis, &carried, None);
    }

    if let Some(limit) = joint.limit {
        let angle = joint.angle();
        if !limit.contains(angle) {
            joint.orientation = UnitQuaternion::from_axis_angle(&joint.axis, limit.clamp(angle));
        }
    }

    chain.refresh(index);
}

/// Minimal rotation taking the direction of `from` onto the direction of `to`.
///
/// Zero-length inputs give the identity. Opposite directions give a half
/// turn, about `preferred` when it is perpendicular to `from` and about an
/// arbitrary axis orthogonal to `from` otherwise.
pub fn shortest_arc(
    from: &Vector3<f32>,
    to: &Vector3<f32>,
    preferred: Option<&UnitVector3<f32>>,
) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between(from, to).unwrap_or_else(|| {
        let axis = preferred
            .filter(|axis| axis.dot(from).abs() <= PERPENDICULAR_EPSILON * from.norm())
            .copied()
            .unwrap_or_else(|| UnitVector3::new_normalize(orthogonal_to(from)));
        UnitQuaternion::from_axis_angle(&axis, PI)
    })
}

fn orthogonal_to(v: &Vector3<f32>) -> Vector3<f32> {
    if v.x.abs() > v.z.abs() {
        Vector3::new(-v.y, v.x, 0.0)
    } else {
        Vector3::new(0.0, -v.z, v.y)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ccdik_model::{JointData, JointType, LinkData, Origin, RobotModel};
    use std::f32::consts::FRAC_PI_2;

    /// Root at the origin, one Z-axis hinge half a unit up, fixed tip one
    /// unit along the hinge's X axis.
    fn hinge_arm(lower: f32, upper: f32) -> RobotModel {
        RobotModel::from_parts(
            "hinge_arm",
            [
                LinkData::new("base"),
                LinkData::new("arm"),
                LinkData::new("tip"),
            ],
            [
                JointData::new("hinge", JointType::Revolute, "base", "arm")
                    .with_origin(Origin::from_xyz([0.0, 0.5, 0.0]))
                    .with_axis([0.0, 0.0, 1.0])
                    .with_limits(lower, upper),
                JointData::new("tip", JointType::Fixed, "arm", "tip")
                    .with_origin(Origin::from_xyz([1.0, 0.0, 0.0])),
            ],
        )
        .unwrap()
    }

    /// Point reached by the hinge arm's tip at hinge angle `angle`.
    fn hinge_target(angle: f32) -> Point3<f32> {
        Point3::new(angle.cos(), 0.5 + angle.sin(), 0.0)
    }

    fn axis_deviation(chain: &KinematicChain, index: usize) -> f32 {
        let joint = &chain.joints()[index];
        (joint.orientation * joint.axis.into_inner() - joint.axis.into_inner()).norm()
    }

    // -- shortest_arc --

    #[test]
    fn shortest_arc_maps_direction() {
        let from = Vector3::new(1.0, 0.0, 0.0);
        let to = Vector3::new(0.0, 2.0, 0.0);
        let q = shortest_arc(&from, &to, None);
        let mapped = q * from;
        assert_relative_eq!(mapped.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(mapped.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(q.angle(), FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn shortest_arc_identical_is_identity() {
        let v = Vector3::new(0.3, -0.2, 0.9);
        assert_relative_eq!(shortest_arc(&v, &v, None).angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn shortest_arc_zero_length_is_identity() {
        let q = shortest_arc(&Vector3::zeros(), &Vector3::new(1.0, 0.0, 0.0), None);
        assert_relative_eq!(q.angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn shortest_arc_opposite_is_half_turn() {
        for from in [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ] {
            let q = shortest_arc(&from, &(-from), None);
            assert_relative_eq!(q.angle(), PI, epsilon = 1e-5);
            let mapped = q * from;
            assert_relative_eq!((mapped + from).norm(), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn shortest_arc_opposite_turns_about_preferred_axis() {
        let from = Vector3::new(1.0, 0.0, 0.0);
        let hinge = Vector3::z_axis();
        let q = shortest_arc(&from, &(-from), Some(&hinge));

        assert_relative_eq!(q.angle(), PI, epsilon = 1e-5);
        let axis = q.axis().unwrap();
        assert_relative_eq!(axis.dot(&hinge.into_inner()).abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn shortest_arc_ignores_preferred_axis_along_direction() {
        let from = Vector3::new(0.0, 0.0, 1.0);
        let q = shortest_arc(&from, &(-from), Some(&Vector3::z_axis()));

        let mapped = q * from;
        assert_relative_eq!((mapped + from).norm(), 0.0, epsilon = 1e-5);
    }

    // -- solve --

    #[test]
    fn reachable_target_converges() {
        let mut chain = KinematicChain::from_model(&hinge_arm(-PI, PI)).unwrap();
        let solver = CcdSolver::with_defaults();
        let report = solver.solve(&mut chain, &hinge_target(PI / 3.0));

        assert!(report.distance <= solver.config().tolerance);
        assert_eq!(report.iterations, 1);
        assert_relative_eq!(chain.joints()[1].angle(), PI / 3.0, epsilon = 1e-4);
    }

    #[test]
    fn target_at_effector_is_noop() {
        let mut chain = KinematicChain::from_model(&hinge_arm(-PI, PI)).unwrap();
        let before: Vec<_> = chain.joints().iter().map(|j| j.orientation).collect();
        let target = chain.world_position(chain.end_effector_index());

        let report = CcdSolver::with_defaults().solve(&mut chain, &target);

        assert_eq!(report.iterations, 0);
        let after: Vec<_> = chain.joints().iter().map(|j| j.orientation).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn limit_clamps_angle() {
        let mut chain = KinematicChain::from_model(&hinge_arm(0.0, FRAC_PI_2)).unwrap();
        let solver = CcdSolver::new(CcdConfig {
            max_iterations: 10,
            ..CcdConfig::default()
        });
        let report = solver.solve(&mut chain, &hinge_target(0.9 * PI));

        assert_eq!(report.iterations, 10);
        assert_relative_eq!(chain.joints()[1].angle(), FRAC_PI_2, epsilon = 1e-4);
    }

    #[test]
    fn limit_clamps_exact_half_turn() {
        let mut chain = KinematicChain::from_model(&hinge_arm(0.0, FRAC_PI_2)).unwrap();
        let report = CcdSolver::with_defaults().solve(&mut chain, &hinge_target(PI));

        assert_relative_eq!(chain.joints()[1].angle(), FRAC_PI_2, epsilon = 1e-4);
        assert_relative_eq!(report.distance, 2.0_f32.sqrt(), epsilon = 1e-4);
    }

    #[test]
    fn constrained_joints_stay_on_axis() {
        let mut chain = KinematicChain::from_model(&hinge_arm(-PI, PI)).unwrap();
        // Out-of-plane target: reachable only by tilting the hinge, which
        // the axis constraint forbids.
        let target = Point3::new(0.5, 0.8, 0.6);
        CcdSolver::with_defaults().solve(&mut chain, &target);

        assert!(axis_deviation(&chain, 0) < 1e-4);
        assert!(axis_deviation(&chain, 1) < 1e-4);
    }

    #[test]
    fn other_joints_rotate_freely() {
        let model = RobotModel::from_parts(
            "ball",
            [LinkData::new("base"), LinkData::new("arm"), LinkData::new("tip")],
            [
                JointData::new("swivel", JointType::Floating, "base", "arm")
                    .with_origin(Origin::from_xyz([0.0, 0.5, 0.0])),
                JointData::new("tip", JointType::Fixed, "arm", "tip")
                    .with_origin(Origin::from_xyz([1.0, 0.0, 0.0])),
            ],
        )
        .unwrap();
        let mut chain = KinematicChain::from_model(&model).unwrap();
        let target = Point3::new(0.0, 0.5, 1.0);
        let report = CcdSolver::with_defaults().solve(&mut chain, &target);

        assert!(report.distance <= 1e-3, "distance {}", report.distance);
    }

    #[test]
    fn effector_itself_is_never_rotated() {
        let mut chain = KinematicChain::from_model(&hinge_arm(-PI, PI)).unwrap();
        CcdSolver::with_defaults().solve(&mut chain, &hinge_target(1.0));
        assert_eq!(
            chain.end_effector().orientation,
            UnitQuaternion::identity()
        );
    }
}
