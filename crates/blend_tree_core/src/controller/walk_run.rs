use crate::{animatable::AnimatableId, arena::SequencePass, collaborators::VelocityProvider};
use bevy::{log::warn, platform::collections::HashMap};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Blend position past which the upper anchor of a speed bracket is selected.
pub const UPPER_THRESHOLD: f32 = 0.618;
/// Blend position below which the lower anchor of a speed bracket is selected.
pub const LOWER_THRESHOLD: f32 = 0.382;
/// Idle, slow walk, walk and run.
pub const ANCHOR_COUNT: usize = 4;

const IDLE: usize = 0;
const SLOW_WALK: usize = 1;
const RUN: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkRunConfig {
    /// Ground speed at which the walk clip looks right, in meters per second.
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Scale locomotion clip playback so feet match the actual ground speed.
    pub scale_playback_speed: bool,
}

impl Default for WalkRunConfig {
    fn default() -> Self {
        Self {
            walk_speed: 0.79,
            run_speed: 1.4,
            scale_playback_speed: false,
        }
    }
}

/// Picks between idle, walk and run clips from the character's ground speed.
///
/// The clips are laid out on four speed anchors: idle at rest, a slow walk at
/// [`UPPER_THRESHOLD`] of the walk speed (a mix of the idle and walk clips), the walk speed and
/// the run speed. The speed selects a bracket between two neighbouring anchors, and the
/// position inside the bracket latches to one of them: above [`UPPER_THRESHOLD`] the upper
/// anchor, below [`LOWER_THRESHOLD`] the lower one, and in between the anchor already playing is
/// kept. A newly selected anchor is committed on the following tick. Switching anchors moves
/// the clip weights in a single step; clip fades only shape a clip's own start and end.
#[derive(Clone)]
pub struct WalkRunController {
    walk_speed: f32,
    run_speed: f32,
    scale_playback_speed: bool,
    anchors: Option<[Option<AnimatableId>; ANCHOR_COUNT]>,
    committed: usize,
    pending: Option<usize>,
    anchor_weights: [f32; ANCHOR_COUNT],
    velocity: Option<Arc<dyn VelocityProvider>>,
}

impl fmt::Debug for WalkRunController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkRunController")
            .field("walk_speed", &self.walk_speed)
            .field("run_speed", &self.run_speed)
            .field("scale_playback_speed", &self.scale_playback_speed)
            .field("anchors", &self.anchors)
            .field("committed", &self.committed)
            .field("pending", &self.pending)
            .field("anchor_weights", &self.anchor_weights)
            .finish_non_exhaustive()
    }
}

impl Default for WalkRunController {
    fn default() -> Self {
        Self::from_config(&WalkRunConfig::default())
    }
}

impl WalkRunController {
    pub fn new(walk_speed: f32, run_speed: f32) -> Self {
        Self {
            walk_speed,
            run_speed,
            scale_playback_speed: false,
            anchors: None,
            committed: IDLE,
            pending: None,
            anchor_weights: one_hot(IDLE),
            velocity: None,
        }
    }

    pub fn from_config(config: &WalkRunConfig) -> Self {
        let mut controller = Self::new(config.walk_speed, config.run_speed);
        controller.scale_playback_speed = config.scale_playback_speed;
        controller
    }

    /// Sets the ground speeds of the walk and run clips.
    pub fn setup(&mut self, walk_speed: f32, run_speed: f32) {
        self.walk_speed = walk_speed;
        self.run_speed = run_speed;
    }

    /// Assigns the clips of the anchors. The walk clip also drives the slow walk anchor.
    pub fn set_animations(
        &mut self,
        stand: Option<AnimatableId>,
        walk: Option<AnimatableId>,
        run: Option<AnimatableId>,
    ) {
        self.anchors = Some([stand, walk, walk, run]);
    }

    pub fn set_velocity_provider(&mut self, provider: Arc<dyn VelocityProvider>) {
        self.velocity = Some(provider);
    }

    pub fn clear_velocity_provider(&mut self) {
        self.velocity = None;
    }

    pub fn set_scale_playback_speed(&mut self, scale: bool) {
        self.scale_playback_speed = scale;
    }

    pub fn scale_playback_speed(&self) -> bool {
        self.scale_playback_speed
    }

    pub fn walk_speed(&self) -> f32 {
        self.walk_speed
    }

    pub fn run_speed(&self) -> f32 {
        self.run_speed
    }

    /// Number of anchors, `0` until the clips have been assigned.
    pub fn animation_count(&self) -> usize {
        if self.anchors.is_some() { ANCHOR_COUNT } else { 0 }
    }

    pub fn animation(&self, index: usize) -> Option<AnimatableId> {
        self.anchors?.get(index).copied().flatten()
    }

    /// Ground speed at which the anchor's clip plays naturally.
    pub fn animation_inherent_speed(&self, index: usize) -> Option<f32> {
        if index >= self.animation_count() {
            return None;
        }
        self.speeds().get(index).copied()
    }

    pub fn anchor_weights(&self) -> [f32; ANCHOR_COUNT] {
        self.anchor_weights
    }

    /// Anchor currently driving the clip weights.
    pub fn committed_anchor(&self) -> usize {
        self.committed
    }

    /// Anchor selected by the last tick, committed on the next one.
    pub fn pending_anchor(&self) -> Option<usize> {
        self.pending
    }

    fn speeds(&self) -> [f32; ANCHOR_COUNT] {
        [
            0.,
            UPPER_THRESHOLD * self.walk_speed,
            self.walk_speed,
            self.run_speed,
        ]
    }

    fn ground_speed(&self) -> f32 {
        let Some(provider) = &self.velocity else {
            return 0.;
        };
        let speed = provider.velocity().length();
        if speed.is_finite() {
            speed
        } else {
            warn!("Ignoring non-finite velocity in walk/run blending");
            0.
        }
    }

    /// Anchor the ground speed latches to, given the anchor currently playing.
    fn target_anchor(&self, speed: f32) -> usize {
        // A character at rest stands, even when the anchor speeds collapse onto zero.
        if speed <= 0. {
            return IDLE;
        }
        let speeds = self.speeds();
        let bracket = (0..RUN)
            .find(|i| speeds[*i] <= speed && speed < speeds[*i + 1])
            .unwrap_or(if speed >= speeds[RUN] { RUN - 1 } else { IDLE });

        let (lower, upper) = (speeds[bracket], speeds[bracket + 1]);
        let t = if upper > lower {
            ((speed - lower) / (upper - lower)).clamp(0., 1.)
        } else {
            1.
        };

        if t >= UPPER_THRESHOLD {
            bracket + 1
        } else if t <= LOWER_THRESHOLD {
            bracket
        } else if self.committed == bracket || self.committed == bracket + 1 {
            self.committed
        } else {
            bracket
        }
    }

    /// Per-clip weights of the committed anchor. The slow walk is a mix of idle and walk.
    fn clip_weights(
        &self,
        anchors: &[Option<AnimatableId>; ANCHOR_COUNT],
    ) -> Vec<(AnimatableId, f32)> {
        let mut weights: Vec<(AnimatableId, f32)> = Vec::with_capacity(ANCHOR_COUNT);
        for id in anchors.iter().flatten() {
            if !weights.iter().any(|(existing, _)| existing == id) {
                weights.push((*id, 0.));
            }
        }

        let mut contribute = |slot: usize, weight: f32| {
            if let Some(id) = anchors[slot] {
                if let Some(entry) = weights.iter_mut().find(|(existing, _)| *existing == id) {
                    entry.1 += weight;
                }
            }
        };

        if self.committed == SLOW_WALK {
            contribute(IDLE, LOWER_THRESHOLD);
            contribute(SLOW_WALK, UPPER_THRESHOLD);
        } else {
            contribute(self.committed, 1.);
        }

        weights
    }

    pub(crate) fn apply_anchor_weights(&mut self, pass: &mut SequencePass) {
        if let Some(pending) = self.pending.take() {
            self.committed = pending;
        }

        let speed = self.ground_speed();
        let target = self.target_anchor(speed);
        if target != self.committed {
            self.pending = Some(target);
        }
        self.anchor_weights = one_hot(self.committed);

        let Some(anchors) = self.anchors else {
            return;
        };

        for (child, weight) in self.clip_weights(&anchors) {
            pass.set_base_weight(child, weight);
        }

        if self.scale_playback_speed {
            let inherent = self.speeds()[self.committed];
            let playback = if inherent > 0. { speed / inherent } else { 1. };
            for (slot, child) in anchors.iter().enumerate() {
                if let Some(child) = child {
                    pass.set_speed(*child, if slot == IDLE { 1. } else { playback });
                }
            }
        }
    }

    /// Forgets anchors that are no longer children of the owning sequence.
    pub(crate) fn retain_children(&mut self, children: &[AnimatableId]) {
        if let Some(anchors) = &mut self.anchors {
            for slot in anchors.iter_mut() {
                if slot.is_some_and(|id| !children.contains(&id)) {
                    *slot = None;
                }
            }
        }
    }

    pub(crate) fn remap(&mut self, clones: &HashMap<AnimatableId, AnimatableId>) {
        if let Some(anchors) = &mut self.anchors {
            for id in anchors.iter_mut().flatten() {
                if let Some(cloned) = clones.get(id) {
                    *id = *cloned;
                }
            }
        }
        self.committed = IDLE;
        self.pending = None;
        self.anchor_weights = one_hot(IDLE);
    }
}

fn one_hot(anchor: usize) -> [f32; ANCHOR_COUNT] {
    let mut weights = [0.; ANCHOR_COUNT];
    weights[anchor] = 1.;
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        animatable::Animatable,
        arena::AnimationArena,
        channel::AnimationChannel,
        collaborators::{AnimationId, NullModelDriver, SharedVelocity},
    };
    use bevy::math::Vec3;

    const EPSILON: f32 = 1e-5;

    struct Locomotion {
        arena: AnimationArena,
        sequence: AnimatableId,
        stand: AnimatableId,
        walk: AnimatableId,
        run: AnimatableId,
        velocity: Arc<SharedVelocity>,
    }

    impl Locomotion {
        fn new(walk_speed: f32, run_speed: f32) -> Self {
            let mut arena = AnimationArena::new();
            let sequence = arena.create_walk_run_sequence(
                Animatable::new("locomotion"),
                WalkRunController::new(walk_speed, run_speed),
            );
            let mut clip = |name: &str, id: u32| {
                arena.create_channel(
                    Animatable::new(name),
                    AnimationChannel::new(AnimationId(id), 1.),
                )
            };
            let stand = clip("stand", 0);
            let walk = clip("walk", 1);
            let run = clip("run", 2);
            for child in [stand, walk, run] {
                arena.add_animation(sequence, child);
            }
            arena.add_animation(arena.root(), sequence);

            let velocity = Arc::new(SharedVelocity::default());
            let controller = arena.walk_run_controller_mut(sequence).unwrap();
            controller.set_animations(Some(stand), Some(walk), Some(run));
            controller.set_velocity_provider(velocity.clone());

            Self {
                arena,
                sequence,
                stand,
                walk,
                run,
                velocity,
            }
        }

        fn controller(&self) -> &WalkRunController {
            self.arena.walk_run_controller(self.sequence).unwrap()
        }

        fn tick(&mut self) {
            self.arena.update(0.1, &mut NullModelDriver);
        }

        /// Drives at `speed` long enough for a new anchor to be committed.
        fn settle(&mut self, speed: f32) {
            self.velocity.set(Vec3::new(speed, 0., 0.));
            self.tick();
            self.tick();
        }

        fn weights(&self) -> [f32; 3] {
            [self.stand, self.walk, self.run].map(|id| self.arena.current_weight(id).unwrap())
        }
    }

    fn assert_weights(actual: [f32; 3], expected: [f32; 3]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < EPSILON, "expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn test_inherent_speeds() {
        let mut controller = WalkRunController::new(1.3, 2.6);
        assert_eq!(controller.animation_count(), 0);
        assert_eq!(controller.animation_inherent_speed(0), None);

        controller.set_animations(None, None, None);
        assert_eq!(controller.animation_count(), 4);
        let speeds = (0..4)
            .map(|i| controller.animation_inherent_speed(i).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(speeds, vec![0., UPPER_THRESHOLD * 1.3, 1.3, 2.6]);
        assert_eq!(controller.animation_inherent_speed(4), None);
    }

    #[test]
    fn test_setup_and_assignment_commute() {
        let mut arena = AnimationArena::new();
        let stand = arena.create_channel(
            Animatable::new("stand"),
            AnimationChannel::new(AnimationId(0), 1.),
        );

        let mut first = WalkRunController::default();
        first.setup(1., 3.);
        first.set_animations(Some(stand), None, None);

        let mut second = WalkRunController::default();
        second.set_animations(Some(stand), None, None);
        second.setup(1., 3.);

        for i in 0..4 {
            assert_eq!(first.animation(i), second.animation(i));
            assert_eq!(
                first.animation_inherent_speed(i),
                second.animation_inherent_speed(i)
            );
        }
        assert_eq!(first.animation(0), Some(stand));
        assert_eq!(first.animation(1), None);
    }

    #[test]
    fn test_rest_plays_stand() {
        let mut locomotion = Locomotion::new(1.3, 2.6);
        locomotion.settle(0.);
        assert_weights(locomotion.weights(), [1., 0., 0.]);
        assert_eq!(locomotion.controller().anchor_weights(), [1., 0., 0., 0.]);
    }

    #[test]
    fn test_missing_velocity_provider_means_rest() {
        let mut locomotion = Locomotion::new(1.3, 2.6);
        locomotion
            .arena
            .walk_run_controller_mut(locomotion.sequence)
            .unwrap()
            .clear_velocity_provider();
        locomotion.velocity.set(Vec3::new(5., 0., 0.));
        locomotion.tick();
        locomotion.tick();
        assert_weights(locomotion.weights(), [1., 0., 0.]);
    }

    #[test]
    fn test_slow_walk_mixes_stand_and_walk() {
        let mut locomotion = Locomotion::new(1.3, 2.6);
        locomotion.settle(0.5);
        assert_eq!(locomotion.controller().committed_anchor(), 1);
        assert_weights(locomotion.weights(), [LOWER_THRESHOLD, UPPER_THRESHOLD, 0.]);
    }

    #[test]
    fn test_walk_and_run_speeds() {
        let mut locomotion = Locomotion::new(1.3, 2.5);
        locomotion.settle(1.2);
        assert_weights(locomotion.weights(), [0., 1., 0.]);
        locomotion.settle(2.5);
        assert_weights(locomotion.weights(), [0., 0., 1.]);
        locomotion.settle(0.);
        assert_weights(locomotion.weights(), [1., 0., 0.]);
    }

    #[test]
    fn test_switch_is_committed_on_next_tick() {
        let mut locomotion = Locomotion::new(1., 2.);
        locomotion.velocity.set(Vec3::new(3., 0., 0.));

        locomotion.tick();
        assert_eq!(locomotion.controller().committed_anchor(), 0);
        assert_eq!(locomotion.controller().pending_anchor(), Some(3));
        assert_weights(locomotion.weights(), [1., 0., 0.]);

        locomotion.tick();
        assert_eq!(locomotion.controller().committed_anchor(), 3);
        assert_eq!(locomotion.controller().pending_anchor(), None);
        assert_weights(locomotion.weights(), [0., 0., 1.]);
    }

    #[test]
    fn test_hysteresis() {
        let mut locomotion = Locomotion::new(1., 2.);
        let expected = [
            (1.4, [0., 1., 0.]),
            (1.6, [0., 1., 0.]),
            (1.8, [0., 0., 1.]),
            (1.4, [0., 0., 1.]),
            (0.9, [0., 1., 0.]),
        ];

        for (speed, weights) in expected {
            locomotion.settle(speed);
            assert_weights(locomotion.weights(), weights);
        }
    }

    #[test]
    fn test_faster_than_run_stays_on_run() {
        let mut locomotion = Locomotion::new(1., 2.);
        locomotion.settle(10.);
        assert_weights(locomotion.weights(), [0., 0., 1.]);
        assert_eq!(locomotion.controller().anchor_weights(), [0., 0., 0., 1.]);
    }

    #[test]
    fn test_non_finite_velocity_is_rest() {
        let mut locomotion = Locomotion::new(1., 2.);
        locomotion.settle(1.);
        locomotion.settle(f32::NAN);
        assert_weights(locomotion.weights(), [1., 0., 0.]);
    }

    #[test]
    fn test_playback_speed_scaling() {
        let mut locomotion = Locomotion::new(1., 2.);
        locomotion
            .arena
            .walk_run_controller_mut(locomotion.sequence)
            .unwrap()
            .set_scale_playback_speed(true);
        locomotion.settle(2.4);
        let run = locomotion.arena.animatable(locomotion.run).unwrap();
        assert!((run.speed() - 1.2).abs() < EPSILON);
        let stand = locomotion.arena.animatable(locomotion.stand).unwrap();
        assert_eq!(stand.speed(), 1.);
    }

    #[test]
    fn test_clone_keeps_speeds_and_remaps_clips() {
        let mut locomotion = Locomotion::new(1.3, 2.6);
        let cloned = locomotion
            .arena
            .clone_animatable(locomotion.sequence)
            .unwrap();
        let source = locomotion.controller().clone();
        let copy = locomotion.arena.walk_run_controller(cloned).unwrap();

        assert_eq!(copy.animation_count(), source.animation_count());
        for i in 0..ANCHOR_COUNT {
            assert_eq!(
                copy.animation_inherent_speed(i),
                source.animation_inherent_speed(i)
            );
        }

        let cloned_walk = locomotion.arena.get_animation(cloned, "walk");
        assert_eq!(copy.animation(2), cloned_walk);
        assert_ne!(copy.animation(2), source.animation(2));
        assert_eq!(locomotion.arena.parent(copy.animation(0).unwrap()), Some(cloned));
    }

    #[test]
    fn test_zero_speeds_rest_on_stand() {
        let mut locomotion = Locomotion::new(0., 0.);
        locomotion.settle(0.);
        assert_weights(locomotion.weights(), [1., 0., 0.]);
        assert_eq!(locomotion.controller().committed_anchor(), 0);
        locomotion.settle(1.);
        assert_weights(locomotion.weights(), [0., 0., 1.]);
    }

    #[test]
    fn test_update_without_anchors() {
        let mut arena = AnimationArena::new();
        let sequence = arena.create_walk_run_sequence(
            Animatable::new("locomotion"),
            WalkRunController::new(1., 2.),
        );
        let idle = arena.create_channel(
            Animatable::new("idle"),
            AnimationChannel::new(AnimationId(0), 1.),
        );
        arena.add_animation(sequence, idle);
        arena.add_animation(arena.root(), sequence);
        arena
            .walk_run_controller_mut(sequence)
            .unwrap()
            .set_velocity_provider(Arc::new(SharedVelocity::new(Vec3::new(3., 0., 0.))));

        arena.update(0.1, &mut NullModelDriver);
        arena.update(0.1, &mut NullModelDriver);

        let controller = arena.walk_run_controller(sequence).unwrap();
        assert_eq!(controller.animation_count(), 0);
        assert_eq!(controller.animation(0), None);
        assert_eq!(controller.committed_anchor(), 3);
        assert_eq!(arena.current_weight(idle), Some(1.));

        let empty = arena.create_walk_run_sequence(
            Animatable::new("empty"),
            WalkRunController::default(),
        );
        arena.add_animation(arena.root(), empty);
        arena.update(0.1, &mut NullModelDriver);
        assert!(!arena.contains(empty));
    }

    #[test]
    fn test_removed_clip_is_forgotten() {
        let mut locomotion = Locomotion::new(1., 2.);
        let run = locomotion.run;
        locomotion.arena.prune(run, &mut NullModelDriver);
        assert_eq!(locomotion.controller().animation(3), None);
        locomotion.settle(3.);
        assert_eq!(locomotion.arena.current_weight(locomotion.stand), Some(0.));
        assert_eq!(locomotion.arena.current_weight(locomotion.walk), Some(0.));
    }
}
