//! Bevy ECS integration for the CCD solver.
//!
//! Provides [`CcdIkPlugin`], which runs [`IkOrchestrator::update`] once per
//! frame on the [`CcdIk`] resource.
//!
//! # Usage
//!
//! 1. Add [`CcdIkPlugin`] to your app.
//! 2. Replace the [`CcdIk`] resource with an orchestrator built from your
//!    robot description.
//! 3. Move the target with [`IkOrchestrator::set_target`] as the scene changes.
//!
//! The solve system runs in [`CcdIkSet`] during [`Update`]; order your own
//! systems relative to that set.

use bevy::prelude::*;

use crate::orchestrator::IkOrchestrator;
use crate::solver::SolveReport;

/// Bevy plugin that adds a CCD solve each frame.
pub struct CcdIkPlugin;

impl Plugin for CcdIkPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CcdIk>()
            .init_resource::<IkLastReport>()
            .add_systems(Update, ik_update_system.in_set(CcdIkSet));
    }
}

/// System set containing the per-frame solve.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CcdIkSet;

/// Resource wrapping the orchestrator driven each frame.
#[derive(Resource, Debug, Clone, Default)]
pub struct CcdIk(pub IkOrchestrator);

/// Diagnostics from the most recent frame. `None` when that frame had no
/// chain or no target.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct IkLastReport(pub Option<SolveReport>);

/// System that runs one orchestrator update.
#[allow(clippy::needless_pass_by_value)]
pub fn ik_update_system(mut ik: ResMut<CcdIk>, mut last: ResMut<IkLastReport>) {
    last.0 = ik.0.update();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
