use crate::events::TimeEventMap;
use serde::{Deserialize, Serialize};

/// Stable handle of a node stored in an [`AnimationArena`]. Handles are never reused, so a
/// handle to a pruned node simply stops resolving.
///
/// [`AnimationArena`]: crate::arena::AnimationArena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnimatableId(pub(crate) u64);

impl AnimatableId {
    pub fn index(&self) -> u64 {
        self.0
    }
}

/// Timing and weighting state shared by every playable node, leaf clip or sequence.
///
/// All times are in seconds on the timeline of the top-level node the animatable was played
/// under. An `end_time` of `0.` means the node has no definite end (it loops or contains a
/// looping child).
#[derive(Clone, Debug, PartialEq)]
pub struct Animatable {
    pub(crate) name: String,
    pub(crate) elapsed_time: f32,
    pub(crate) start_time: f32,
    pub(crate) start_delay: f32,
    pub(crate) end_time: f32,
    pub(crate) fade_in: f32,
    pub(crate) fade_out: f32,
    pub(crate) base_weight: f32,
    pub(crate) current_weight: f32,
    pub(crate) speed: f32,
    pub(crate) current_speed: f32,
    pub(crate) active: bool,
    pub(crate) prune: bool,
    /// Length of a forced fade out. While set, the end time has been rewritten and
    /// recalculating the timeline keeps it.
    pub(crate) forced_fade: Option<f32>,
    pub(crate) events: TimeEventMap,
}

impl Default for Animatable {
    fn default() -> Self {
        Self {
            name: String::new(),
            elapsed_time: 0.,
            start_time: 0.,
            start_delay: 0.,
            end_time: 0.,
            fade_in: 0.,
            fade_out: 0.,
            base_weight: 1.,
            current_weight: 0.,
            speed: 1.,
            current_speed: 1.,
            active: false,
            prune: false,
            forced_fade: None,
            events: TimeEventMap::default(),
        }
    }
}

impl Animatable {
    /// Sentinel end time of nodes without a definite end.
    pub const UNBOUNDED_END: f32 = 0.;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_fades(mut self, fade_in: f32, fade_out: f32) -> Self {
        self.fade_in = fade_in.max(0.);
        self.fade_out = fade_out.max(0.);
        self
    }

    pub fn with_start_delay(mut self, start_delay: f32) -> Self {
        self.start_delay = start_delay;
        self
    }

    pub fn with_base_weight(mut self, base_weight: f32) -> Self {
        self.base_weight = base_weight;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    pub fn set_elapsed_time(&mut self, elapsed_time: f32) {
        self.elapsed_time = elapsed_time;
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    pub fn set_start_time(&mut self, start_time: f32) {
        self.start_time = start_time;
    }

    pub fn start_delay(&self) -> f32 {
        self.start_delay
    }

    pub fn set_start_delay(&mut self, start_delay: f32) {
        self.start_delay = start_delay;
    }

    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    pub fn set_end_time(&mut self, end_time: f32) {
        self.end_time = end_time;
    }

    pub fn has_definite_end(&self) -> bool {
        self.end_time != Self::UNBOUNDED_END
    }

    pub fn fade_in(&self) -> f32 {
        self.fade_in
    }

    pub fn set_fade_in(&mut self, fade_in: f32) {
        self.fade_in = fade_in.max(0.);
    }

    pub fn fade_out(&self) -> f32 {
        self.fade_out
    }

    pub fn set_fade_out(&mut self, fade_out: f32) {
        self.fade_out = fade_out.max(0.);
    }

    pub fn base_weight(&self) -> f32 {
        self.base_weight
    }

    pub fn set_base_weight(&mut self, base_weight: f32) {
        self.base_weight = base_weight;
    }

    pub fn current_weight(&self) -> f32 {
        self.current_weight
    }

    pub fn set_current_weight(&mut self, current_weight: f32) {
        self.current_weight = current_weight.clamp(0., 1.);
    }

    /// Authored playback speed multiplier of this node.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Effective playback speed: the product of the speeds from the root down to this node.
    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn should_prune(&self) -> bool {
        self.prune
    }

    /// Weight of this node for its current elapsed time, given the weight of its parent.
    ///
    /// Linear fade in from the start time, linear fade out towards a definite end time, zero
    /// outside of the `[start, end)` window. The result is clamped to `[0, 1]`.
    pub fn compute_weight(&self, parent_weight: f32) -> f32 {
        let elapsed = self.elapsed_time;
        let start = self.start_time;
        let end = self.end_time;

        if elapsed < start {
            return 0.;
        }
        if end != Self::UNBOUNDED_END && elapsed >= end {
            return 0.;
        }

        let mut weight = self.base_weight * parent_weight;

        if self.fade_in > 0. && elapsed < start + self.fade_in {
            weight *= (elapsed - start) / self.fade_in;
        }

        let fade_out = self.forced_fade.unwrap_or(self.fade_out);
        if end != Self::UNBOUNDED_END && fade_out > 0. && elapsed >= end - fade_out {
            weight *= (end - elapsed) / fade_out;
        }

        weight.clamp(0., 1.)
    }

    /// Whether the fade out window has been fully played.
    pub fn fade_out_completed(&self) -> bool {
        self.end_time != Self::UNBOUNDED_END && self.elapsed_time >= self.end_time
    }

    /// Named markers relative to the start of this node.
    pub fn events(&self) -> &TimeEventMap {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut TimeEventMap {
        &mut self.events
    }

    pub fn add_event_on_start(&mut self, name: impl Into<String>) -> bool {
        self.events.add_event(name, 0.)
    }

    pub fn is_fading_out_forced(&self) -> bool {
        self.forced_fade.is_some()
    }

    /// Rewrite the end time so a fade of `time` seconds starts now. A non-positive time cancels
    /// the node within the current tick. The authored fade out is left untouched.
    pub fn force_fade_out(&mut self, time: f32) {
        if time <= 0. {
            self.forced_fade = Some(0.);
            self.current_weight = 0.;
            self.prune = true;
            // Keep the end definite even for a node that has never been ticked.
            self.end_time = self.elapsed_time.max(f32::MIN_POSITIVE);
        } else {
            self.forced_fade = Some(time);
            self.end_time = self.elapsed_time + time;
        }
    }

    /// Copy of this animatable with all runtime state cleared, as used when cloning templates.
    /// The end time has to be laid out again by the owner.
    pub(crate) fn reset_runtime(&self) -> Self {
        Self {
            elapsed_time: 0.,
            end_time: Self::UNBOUNDED_END,
            current_weight: 0.,
            current_speed: self.speed,
            active: false,
            prune: false,
            forced_fade: None,
            ..self.clone()
        }
    }
}
