use blend_tree_core::{
    animatable::AnimatableId,
    arena::AnimationArena,
    collaborators::{ModelDriver, NullModelDriver},
};
use bevy::log::warn;
use indexmap::IndexMap;

/// Plays named animations on a character.
///
/// Animations are registered once as templates. Playing one adds a fresh copy of the template
/// to the root sequence, so the same template can be played again after the previous copy has
/// finished.
#[derive(Debug, Default)]
pub struct SequenceMixer {
    arena: AnimationArena,
    templates: IndexMap<String, AnimatableId>,
}

impl SequenceMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &AnimationArena {
        &self.arena
    }

    /// Use to author templates before registering them.
    pub fn arena_mut(&mut self) -> &mut AnimationArena {
        &mut self.arena
    }

    /// Registers a detached node of the arena as a template under its own name.
    pub fn register_animation(&mut self, template: AnimatableId) -> bool {
        let Some(node) = self.arena.get(template) else {
            return false;
        };
        if node.parent().is_some() || template == self.arena.root() {
            warn!("Only detached animations can be registered as templates");
            return false;
        }
        let name = node.animatable().name().to_string();
        if self.templates.contains_key(&name) {
            warn!("An animation named {name:?} is already registered");
            return false;
        }
        self.templates.insert(name, template);
        true
    }

    pub fn registered_animation(&self, name: &str) -> Option<AnimatableId> {
        self.templates.get(name).copied()
    }

    pub fn unregister_animation(&mut self, name: &str) -> bool {
        match self.templates.shift_remove(name) {
            Some(template) => self.arena.prune(template, &mut NullModelDriver),
            None => false,
        }
    }

    /// Starts a copy of the template named `name`. Fails if the template is unknown or a copy is
    /// still playing.
    pub fn play_animation(&mut self, name: &str) -> Option<AnimatableId> {
        let Some(template) = self.registered_animation(name) else {
            warn!("Cannot play animation {name:?}: it has not been registered");
            return None;
        };
        let animation = self.arena.clone_animatable(template)?;
        let root = self.arena.root();
        self.arena.add_animation(root, animation).then_some(animation)
    }

    pub fn active_animation(&self, name: &str) -> Option<AnimatableId> {
        self.arena.get_animation(self.arena.root(), name)
    }

    /// Fades out the playing animation named `name` over `fade_out` seconds.
    pub fn clear_animation(&mut self, name: &str, fade_out: f32) -> bool {
        match self.active_animation(name) {
            Some(animation) => {
                self.arena.force_fade_out(animation, fade_out);
                true
            }
            None => false,
        }
    }

    pub fn clear_active_animations(&mut self, fade_out: f32) {
        let root = self.arena.root();
        for animation in self.arena.child_animations(root).to_vec() {
            self.arena.force_fade_out(animation, fade_out);
        }
    }

    pub fn update(&mut self, dt: f32, model: &mut dyn ModelDriver) {
        self.arena.update(dt, model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend_tree_core::{
        animatable::Animatable, channel::AnimationChannel, collaborators::AnimationId,
    };

    fn mixer_with_wave() -> SequenceMixer {
        let mut mixer = SequenceMixer::new();
        let wave = mixer.arena_mut().create_channel(
            Animatable::new("wave").with_fades(0.25, 0.25),
            AnimationChannel::once(AnimationId(5), 1.),
        );
        assert!(mixer.register_animation(wave));
        mixer
    }

    #[test]
    fn test_play_registered_animation() {
        let mut mixer = mixer_with_wave();
        let template = mixer.registered_animation("wave").unwrap();

        let playing = mixer.play_animation("wave").unwrap();
        assert_ne!(playing, template);
        assert_eq!(mixer.active_animation("wave"), Some(playing));
        assert!(mixer.play_animation("wave").is_none());
        assert!(mixer.play_animation("dance").is_none());

        mixer.update(1., &mut NullModelDriver);
        assert_eq!(mixer.active_animation("wave"), None);
        assert!(mixer.arena().contains(template));
        assert!(mixer.play_animation("wave").is_some());
    }

    #[test]
    fn test_clear_animation() {
        let mut mixer = mixer_with_wave();
        mixer.play_animation("wave");
        mixer.update(0.5, &mut NullModelDriver);

        assert!(mixer.clear_animation("wave", 0.));
        mixer.update(0.01, &mut NullModelDriver);
        assert_eq!(mixer.active_animation("wave"), None);
        assert!(!mixer.clear_animation("wave", 0.));
    }

    #[test]
    fn test_register_rules() {
        let mut mixer = mixer_with_wave();
        let other = mixer.arena_mut().create_channel(
            Animatable::new("wave"),
            AnimationChannel::new(AnimationId(6), 1.),
        );
        assert!(!mixer.register_animation(other));
        assert!(!mixer.register_animation(mixer.arena().root()));

        assert!(mixer.unregister_animation("wave"));
        assert!(mixer.registered_animation("wave").is_none());
        assert!(mixer.register_animation(other));
    }
}
