//! Time-driven blend tree for skeletal animation.
//!
//! Every playable node is an [`Animatable`]: a name plus a fade envelope on a shared timeline.
//! Leaves are [`AnimationChannel`]s, each bound to one animation of the host model. Sequences
//! group children and own an [`AnimationController`] that decides how the children's weights
//! evolve each tick.
//!
//! All nodes live in an [`AnimationArena`]. Each tick, [`AnimationArena::update`] advances the
//! tree, pushes the resulting clip weights to a [`ModelDriver`] and prunes nodes whose fade out
//! has completed.
//!
//! Nodes can carry named time markers ([`TimeEventMap`]) that the host queries against the
//! node's local time, see [`AnimationArena::relative_elapsed_time`].
//!
//! [`Animatable`]: animatable::Animatable
//! [`AnimationChannel`]: channel::AnimationChannel
//! [`AnimationController`]: controller::AnimationController
//! [`AnimationArena`]: arena::AnimationArena
//! [`AnimationArena::update`]: arena::AnimationArena::update
//! [`ModelDriver`]: collaborators::ModelDriver
//! [`TimeEventMap`]: events::TimeEventMap
//! [`AnimationArena::relative_elapsed_time`]: arena::AnimationArena::relative_elapsed_time

pub mod animatable;
pub mod arena;
pub mod channel;
pub mod collaborators;
pub mod controller;
pub mod events;

pub mod prelude {
    pub use super::animatable::{Animatable, AnimatableId};
    pub use super::arena::{AnimatableKind, AnimatableNode, AnimationArena, Sequence};
    pub use super::channel::AnimationChannel;
    pub use super::collaborators::{
        AnimationId, BoneId, ModelDriver, NullModelDriver, PoseSampler, SharedVelocity,
        SkeletonQuery, VelocityProvider,
    };
    pub use super::controller::{
        AnimationController, WalkRunController,
        walk_run::{LOWER_THRESHOLD, UPPER_THRESHOLD, WalkRunConfig},
    };
    pub use super::events::{TimeEvent, TimeEventMap};
}
