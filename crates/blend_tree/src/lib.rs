//! # Blend Tree
//!
//! **Blend Tree** turns continuous control signals of a character, such as its ground speed or
//! the direction it is looking at, into per-animation blend weights for a skeletal model.
//!
//! ## Introduction
//!
//! The library is made of three parts:
//! - A time-driven blend tree ([`AnimationArena`]). Leaves ([`AnimationChannel`]) are single
//!   animations of the model; sequences group them and lay them out on a shared timeline. Every
//!   node carries a fade envelope ([`Animatable`]), so animations fade in when they start and
//!   fade out before they end instead of popping. Finished nodes are pruned automatically.
//! - Controllers attached to sequences. The default one only applies the fades. The
//!   [`WalkRunController`] selects between idle, walk and run clips from the character's
//!   velocity, with hysteresis so that speeds near a threshold do not flicker between clips.
//! - Pose meshes ([`PoseMesh`]): triangulated blend spaces of poses indexed by the direction an
//!   effector bone points to. They are used to aim a head or a weapon at a target by blending
//!   three poses. A [`PoseController`] chains several meshes by priority.
//!
//! The host engine plugs in through a handful of traits: [`ModelDriver`] receives the computed
//! weights, [`PoseSampler`] answers skeleton queries when pose meshes are built, and
//! [`VelocityProvider`] feeds locomotion blending.
//!
//! Characters are usually set up from a RON [`BlendConfig`] and driven through a
//! [`SequenceMixer`], which plays named animations from registered templates.
//!
//! ## Example
//!
//! ```
//! use bevy::math::Vec3;
//! use blend_tree::prelude::*;
//! use std::sync::Arc;
//!
//! let mut arena = AnimationArena::new();
//! let locomotion = arena.create_walk_run_sequence(
//!     Animatable::new("locomotion"),
//!     WalkRunController::new(1.3, 2.5),
//! );
//!
//! let mut clip = |name: &str, id: u32| {
//!     let clip = arena.create_channel(
//!         Animatable::new(name).with_fades(0.2, 0.2),
//!         AnimationChannel::new(AnimationId(id), 1.),
//!     );
//!     arena.add_animation(locomotion, clip);
//!     clip
//! };
//! let stand = clip("stand", 0);
//! let walk = clip("walk", 1);
//! let run = clip("run", 2);
//!
//! let root = arena.root();
//! arena.add_animation(root, locomotion);
//!
//! let velocity = Arc::new(SharedVelocity::default());
//! if let Some(controller) = arena.walk_run_controller_mut(locomotion) {
//!     controller.set_animations(Some(stand), Some(walk), Some(run));
//!     controller.set_velocity_provider(velocity.clone());
//! }
//!
//! velocity.set(Vec3::new(2.5, 0., 0.));
//! for _ in 0..30 {
//!     arena.update(1. / 60., &mut NullModelDriver);
//! }
//! assert_eq!(arena.current_weight(run), Some(1.));
//! assert_eq!(arena.current_weight(stand), Some(0.));
//! ```
//!
//! [`AnimationArena`]: prelude::AnimationArena
//! [`AnimationChannel`]: prelude::AnimationChannel
//! [`Animatable`]: prelude::Animatable
//! [`WalkRunController`]: prelude::WalkRunController
//! [`PoseMesh`]: prelude::PoseMesh
//! [`PoseController`]: prelude::PoseController
//! [`ModelDriver`]: prelude::ModelDriver
//! [`PoseSampler`]: prelude::PoseSampler
//! [`VelocityProvider`]: prelude::VelocityProvider
//! [`BlendConfig`]: config::BlendConfig
//! [`SequenceMixer`]: mixer::SequenceMixer

pub mod config;
pub mod errors;
pub mod mixer;

pub use blend_tree_core as tree;
pub use blend_tree_pose_mesh as pose_mesh;

pub mod prelude {
    pub use super::config::BlendConfig;
    pub use super::errors::{ConfigError, ConfigResult};
    pub use super::mixer::SequenceMixer;
    pub use blend_tree_core::prelude::*;
    pub use blend_tree_pose_mesh::prelude::*;
}
