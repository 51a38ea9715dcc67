//! Per-tick driver tying a chain, a target and a configuration together.
//!
//! [`IkOrchestrator`] holds optional operands: a chain (plus the robot
//! description it was built from) and a world-space target. Calling
//! [`IkOrchestrator::update`] once per tick runs the solver when both are
//! present and does nothing otherwise.

use nalgebra::Point3;
use tracing::warn;

use ccdik_model::{ModelError, RobotModel};

use crate::chain::{JointKind, KinematicChain};
use crate::config::CcdConfig;
use crate::error::{ConfigError, IkError};
use crate::solver::{CcdSolver, SolveReport};

/// Owns the IK operands and runs the solver on demand.
#[derive(Debug, Clone, Default)]
pub struct IkOrchestrator {
    solver: CcdSolver,
    chain: Option<KinematicChain>,
    model: Option<RobotModel>,
    target: Option<Point3<f32>>,
}

impl IkOrchestrator {
    /// Create an orchestrator with no chain and no target.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails [`CcdConfig::validate`].
    pub fn new(config: CcdConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            solver: CcdSolver::new(config),
            chain: None,
            model: None,
            target: None,
        })
    }

    /// Create an orchestrator driving a chain built from `model`.
    ///
    /// # Errors
    ///
    /// Returns [`IkError::Config`] for an invalid configuration, or the chain
    /// build error for a malformed description.
    pub fn from_model(model: RobotModel, config: CcdConfig) -> Result<Self, IkError> {
        let mut orchestrator = Self::new(config)?;
        orchestrator.set_model(model)?;
        Ok(orchestrator)
    }

    /// Replace the robot description and rebuild the chain from it.
    ///
    /// On error the previous description and chain are kept.
    pub fn set_model(&mut self, model: RobotModel) -> Result<(), IkError> {
        let chain = KinematicChain::from_model(&model)?;
        self.chain = Some(chain);
        self.model = Some(model);
        Ok(())
    }

    /// Rebuild the chain from the held description, discarding solved
    /// orientations not yet written back. Does nothing without a description.
    pub fn rebuild(&mut self) -> Result<(), IkError> {
        if let Some(model) = &self.model {
            self.chain = Some(KinematicChain::from_model(model)?);
        }
        Ok(())
    }

    /// Drive a chain that has no backing description.
    pub fn set_chain(&mut self, chain: KinematicChain) {
        self.chain = Some(chain);
        self.model = None;
    }

    /// Drop the chain and its description.
    pub fn clear_chain(&mut self) {
        self.chain = None;
        self.model = None;
    }

    /// Set the world-space target.
    pub fn set_target(&mut self, target: Point3<f32>) {
        self.target = Some(target);
    }

    /// Remove the target; subsequent updates do nothing.
    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Current target, if any.
    pub fn target(&self) -> Option<&Point3<f32>> {
        self.target.as_ref()
    }

    /// Current chain, if any.
    pub fn chain(&self) -> Option<&KinematicChain> {
        self.chain.as_ref()
    }

    /// Current robot description, if any.
    pub fn model(&self) -> Option<&RobotModel> {
        self.model.as_ref()
    }

    /// Solver configuration.
    pub fn config(&self) -> &CcdConfig {
        self.solver.config()
    }

    /// Run one solve.
    ///
    /// Returns `None` without touching anything when the chain or target is
    /// missing. Otherwise solves, writes orientations back to the
    /// description if `update_source` is set, and returns the solver's
    /// diagnostics.
    pub fn update(&mut self) -> Option<SolveReport> {
        let (Some(chain), Some(target)) = (self.chain.as_mut(), self.target.as_ref()) else {
            return None;
        };

        let report = self.solver.solve(chain, target);

        if self.solver.config().update_source {
            if let Some(model) = self.model.as_mut() {
                if let Err(err) = write_back(chain, model) {
                    warn!(error = %err, "Orientation write-back failed");
                }
            }
        }

        Some(report)
    }
}

/// Copy every joint's local orientation into the description. The root's
/// orientation goes to the robot base.
fn write_back(chain: &KinematicChain, model: &mut RobotModel) -> Result<(), ModelError> {
    for joint in chain.joints() {
        let q = joint.orientation;
        let orientation = [q.i, q.j, q.k, q.w];
        if joint.kind == JointKind::Root {
            model.base.orientation = orientation;
        } else {
            model.set_joint_orientation(&joint.name, orientation)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
