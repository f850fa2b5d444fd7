use crate::collaborators::{AnimationId, ModelDriver};

/// Leaf of the blend tree: a single animation of the host model.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationChannel {
    animation: AnimationId,
    duration: f32,
    max_duration: f32,
    looping: bool,
    /// Last weight sent to the model, so the model is only told about changes.
    pushed_weight: Option<f32>,
}

impl AnimationChannel {
    pub fn new(animation: AnimationId, duration: f32) -> Self {
        Self {
            animation,
            duration,
            max_duration: 0.,
            looping: true,
            pushed_weight: None,
        }
    }

    /// A channel that plays once and then fades away.
    pub fn once(animation: AnimationId, duration: f32) -> Self {
        Self {
            looping: false,
            ..Self::new(animation, duration)
        }
    }

    pub fn animation(&self) -> AnimationId {
        self.animation
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
    }

    /// Upper bound on the play time, `0.` for none.
    pub fn max_duration(&self) -> f32 {
        self.max_duration
    }

    pub fn set_max_duration(&mut self, max_duration: f32) {
        self.max_duration = max_duration.max(0.);
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Play time of the channel, `None` when it has no definite end.
    pub fn calculate_duration(&self) -> Option<f32> {
        match (self.looping, self.max_duration > 0.) {
            (true, true) => Some(self.max_duration),
            (true, false) => None,
            (false, true) => Some(self.duration.min(self.max_duration)),
            (false, false) => Some(self.duration),
        }
    }

    /// Position inside the animation clip at `time`, for a channel started at `start_time`.
    ///
    /// A looping channel wraps around the clip duration. A channel that plays once holds its
    /// last frame after the clip has ended.
    pub fn relative_time(&self, time: f32, start_time: f32) -> f32 {
        let elapsed = (time - start_time).max(0.);
        if self.duration <= 0. {
            return 0.;
        }
        if self.looping {
            elapsed % self.duration
        } else {
            elapsed.min(self.duration)
        }
    }

    pub(crate) fn push_weight(&mut self, weight: f32, model: &mut dyn ModelDriver) {
        if self.pushed_weight != Some(weight) {
            model.play_cycle(self.animation, weight, 0.);
            self.pushed_weight = Some(weight);
        }
    }

    pub(crate) fn release(&mut self, model: &mut dyn ModelDriver, delay: f32) {
        if self.pushed_weight.take().is_some() {
            model.clear_cycle(self.animation, delay);
        }
    }

    pub(crate) fn reset_runtime(&self) -> Self {
        Self {
            pushed_weight: None,
            ..self.clone()
        }
    }
}
