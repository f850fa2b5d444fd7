//! Capabilities the blend tree consumes from the host: the skinned model that receives the
//! computed clip weights, skeleton queries used when sampling poses, and a velocity source for
//! locomotion blending.

use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Identifier of a bone in the host skeleton.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoneId(pub u32);

/// Identifier of an animation known to the host model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnimationId(pub u32);

/// Mixing stage that consumes the per-clip weights.
pub trait ModelDriver {
    /// Blend the looping animation towards `weight` over `delay` seconds.
    fn play_cycle(&mut self, animation: AnimationId, weight: f32, delay: f32);
    /// Fade the animation out over `delay` seconds.
    fn clear_cycle(&mut self, animation: AnimationId, delay: f32);
}

/// Model driver that drops every request. Useful when a tree is evaluated only for its weights.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullModelDriver;

impl ModelDriver for NullModelDriver {
    fn play_cycle(&mut self, _animation: AnimationId, _weight: f32, _delay: f32) {}
    fn clear_cycle(&mut self, _animation: AnimationId, _delay: f32) {}
}

/// Read-only skeleton and animation lookups.
pub trait SkeletonQuery {
    fn bone_id(&self, name: &str) -> Option<BoneId>;
    fn animation_id(&self, name: &str) -> Option<AnimationId>;
    /// Rotation of the bone in model space for the current pose.
    fn bone_absolute_rotation(&self, bone: BoneId) -> Quat;
}

/// A skeleton that can be posed directly, used to sample the terminal pose of animations.
pub trait PoseSampler: SkeletonQuery {
    /// Drive the skeleton to the last frame of `animation`, replacing any previous pose.
    fn apply_terminal_pose(&mut self, animation: AnimationId);
    /// Return the skeleton to its bind pose.
    fn reset_pose(&mut self);
}

/// Source of the character's velocity. Providers are shared with the controllers that read
/// them, so a blend tree can live in an ECS component.
pub trait VelocityProvider: Send + Sync {
    fn velocity(&self) -> Vec3;
}

/// Velocity written by the owning character each tick and read by locomotion controllers.
#[derive(Debug, Default)]
pub struct SharedVelocity {
    velocity: Mutex<Vec3>,
}

impl SharedVelocity {
    pub fn new(velocity: Vec3) -> Self {
        Self {
            velocity: Mutex::new(velocity),
        }
    }

    pub fn set(&self, velocity: Vec3) {
        let mut guard = self
            .velocity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = velocity;
    }
}

impl VelocityProvider for SharedVelocity {
    fn velocity(&self) -> Vec3 {
        *self
            .velocity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
