pub mod walk_run;

use crate::{animatable::AnimatableId, arena::SequencePass};
use bevy::platform::collections::HashMap;

pub use walk_run::WalkRunController;

/// Strategy owned by every sequence that computes the weight and speed of its children once
/// per tick.
#[derive(Clone, Debug, Default)]
pub enum AnimationController {
    /// Applies each child's fade envelope to its authored base weight.
    #[default]
    Fader,
    /// Speed-indexed cross fade between idle, walk and run anchors.
    WalkRun(WalkRunController),
}

impl AnimationController {
    pub fn walk_run(controller: WalkRunController) -> Self {
        Self::WalkRun(controller)
    }

    pub fn as_walk_run(&self) -> Option<&WalkRunController> {
        match self {
            Self::WalkRun(controller) => Some(controller),
            Self::Fader => None,
        }
    }

    pub fn as_walk_run_mut(&mut self) -> Option<&mut WalkRunController> {
        match self {
            Self::WalkRun(controller) => Some(controller),
            Self::Fader => None,
        }
    }

    pub(crate) fn update(&mut self, pass: &mut SequencePass) {
        if let Self::WalkRun(controller) = self {
            controller.apply_anchor_weights(pass);
        }

        for child in pass.children().to_vec() {
            pass.update_child(child);
        }
    }

    /// Called whenever the owning sequence's membership or timeline changes.
    pub(crate) fn recalculate(&mut self, children: &[AnimatableId]) {
        if let Self::WalkRun(controller) = self {
            controller.retain_children(children);
        }
    }

    /// Point any child handles held by the controller at their clones.
    pub(crate) fn remap(&mut self, clones: &HashMap<AnimatableId, AnimatableId>) {
        if let Self::WalkRun(controller) = self {
            controller.remap(clones);
        }
    }
}
