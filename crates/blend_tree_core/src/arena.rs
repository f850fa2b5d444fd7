use crate::{
    animatable::{Animatable, AnimatableId},
    channel::AnimationChannel,
    collaborators::ModelDriver,
    controller::{AnimationController, WalkRunController},
};
use bevy::{
    log::{debug, warn},
    platform::collections::HashMap,
};
use indexmap::IndexMap;

/// Composite node: an ordered set of children driven by one controller.
#[derive(Clone, Debug, Default)]
pub struct Sequence {
    children: Vec<AnimatableId>,
    controller: AnimationController,
}

impl Sequence {
    /// Children in evaluation order.
    pub fn children(&self) -> &[AnimatableId] {
        &self.children
    }

    pub fn controller(&self) -> &AnimationController {
        &self.controller
    }
}

#[derive(Clone, Debug)]
pub enum AnimatableKind {
    Channel(AnimationChannel),
    Sequence(Sequence),
}

#[derive(Clone, Debug)]
pub struct AnimatableNode {
    animatable: Animatable,
    /// Owning sequence. Only used for structural queries, ownership lives in the arena.
    parent: Option<AnimatableId>,
    kind: AnimatableKind,
}

impl AnimatableNode {
    pub fn animatable(&self) -> &Animatable {
        &self.animatable
    }

    pub fn parent(&self) -> Option<AnimatableId> {
        self.parent
    }

    pub fn kind(&self) -> &AnimatableKind {
        &self.kind
    }

    pub fn as_channel(&self) -> Option<&AnimationChannel> {
        match &self.kind {
            AnimatableKind::Channel(channel) => Some(channel),
            AnimatableKind::Sequence(_) => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match &self.kind {
            AnimatableKind::Sequence(sequence) => Some(sequence),
            AnimatableKind::Channel(_) => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, AnimatableKind::Sequence(_))
    }

    fn children(&self) -> &[AnimatableId] {
        match &self.kind {
            AnimatableKind::Sequence(sequence) => &sequence.children,
            AnimatableKind::Channel(_) => &[],
        }
    }
}

/// Owner of every node of a character's blend tree.
///
/// Nodes are created detached (as roots of their own subtree) and become part of the played
/// tree when added to a sequence reachable from [`AnimationArena::root`]. The structure is
/// strictly a tree: every node has at most one owning sequence.
#[derive(Debug)]
pub struct AnimationArena {
    nodes: IndexMap<AnimatableId, AnimatableNode>,
    next_id: u64,
    root: AnimatableId,
}

impl Default for AnimationArena {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationArena {
    pub const ROOT_NAME: &'static str = "root";

    pub fn new() -> Self {
        let mut arena = Self {
            nodes: IndexMap::new(),
            next_id: 0,
            root: AnimatableId(0),
        };
        arena.root = arena.create_sequence(
            Animatable::new(Self::ROOT_NAME),
            AnimationController::default(),
        );
        arena
    }

    /// The top-level sequence updated by [`AnimationArena::update`].
    pub fn root(&self) -> AnimatableId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: AnimatableId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn insert(&mut self, node: AnimatableNode) -> AnimatableId {
        let id = AnimatableId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    pub fn create_channel(
        &mut self,
        animatable: Animatable,
        channel: AnimationChannel,
    ) -> AnimatableId {
        self.insert(AnimatableNode {
            animatable,
            parent: None,
            kind: AnimatableKind::Channel(channel),
        })
    }

    pub fn create_sequence(
        &mut self,
        animatable: Animatable,
        controller: AnimationController,
    ) -> AnimatableId {
        self.insert(AnimatableNode {
            animatable,
            parent: None,
            kind: AnimatableKind::Sequence(Sequence {
                children: Vec::new(),
                controller,
            }),
        })
    }

    /// Creates an empty sequence driven by a walk/run controller.
    pub fn create_walk_run_sequence(
        &mut self,
        animatable: Animatable,
        controller: WalkRunController,
    ) -> AnimatableId {
        self.create_sequence(animatable, AnimationController::walk_run(controller))
    }

    pub fn get(&self, id: AnimatableId) -> Option<&AnimatableNode> {
        self.nodes.get(&id)
    }

    pub fn animatable(&self, id: AnimatableId) -> Option<&Animatable> {
        self.nodes.get(&id).map(|node| &node.animatable)
    }

    /// Mutable access for authoring timing and weights. Use [`AnimationArena::set_name`] to
    /// rename, since names must stay unique among siblings.
    pub fn animatable_mut(&mut self, id: AnimatableId) -> Option<&mut Animatable> {
        self.nodes.get_mut(&id).map(|node| &mut node.animatable)
    }

    pub fn channel_mut(&mut self, id: AnimatableId) -> Option<&mut AnimationChannel> {
        match &mut self.nodes.get_mut(&id)?.kind {
            AnimatableKind::Channel(channel) => Some(channel),
            AnimatableKind::Sequence(_) => None,
        }
    }

    pub fn name(&self, id: AnimatableId) -> Option<&str> {
        self.animatable(id).map(Animatable::name)
    }

    /// Renames a node. Fails, leaving the name untouched, if a sibling already uses the name.
    pub fn set_name(&mut self, id: AnimatableId, name: impl Into<String>) -> bool {
        let name = name.into();
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        if let Some(parent) = node.parent {
            if let Some(existing) = self.get_animation(parent, &name) {
                if existing != id {
                    warn!("Cannot rename animation to {name:?}: a sibling already uses that name");
                    return false;
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.animatable.name = name;
        }
        true
    }

    /// Play time of a node from its start, `None` when it has no definite end.
    pub fn calculate_duration(&self, id: AnimatableId) -> Option<f32> {
        let node = self.nodes.get(&id)?;
        match &node.kind {
            AnimatableKind::Channel(channel) => channel.calculate_duration(),
            AnimatableKind::Sequence(_) => node
                .animatable
                .has_definite_end()
                .then(|| node.animatable.end_time - node.animatable.start_time),
        }
    }

    /// Time since a node started, in the scope of its animation. Channels wrap around or hold
    /// at the end of their clip, sequences keep counting.
    pub fn relative_elapsed_time(&self, id: AnimatableId) -> Option<f32> {
        let node = self.nodes.get(&id)?;
        let animatable = &node.animatable;
        Some(match &node.kind {
            AnimatableKind::Channel(channel) => {
                channel.relative_time(animatable.elapsed_time, animatable.start_time)
            }
            AnimatableKind::Sequence(_) => (animatable.elapsed_time - animatable.start_time).max(0.),
        })
    }

    /// Places a named event `offset` seconds after a node starts. A negative offset places it
    /// at the end of the node, which fails for nodes without a definite end.
    pub fn add_event_on_time(
        &mut self,
        id: AnimatableId,
        name: impl Into<String>,
        offset: f32,
    ) -> bool {
        let offset = if offset < 0. {
            match self.calculate_duration(id) {
                Some(duration) => duration,
                None => {
                    warn!(
                        "Cannot place an event at the end of {:?}: it has no definite end",
                        self.name(id)
                    );
                    return false;
                }
            }
        } else {
            offset
        };
        self.animatable_mut(id)
            .is_some_and(|animatable| animatable.events.add_event(name, offset))
    }

    pub fn add_event_on_end(&mut self, id: AnimatableId, name: impl Into<String>) -> bool {
        self.add_event_on_time(id, name, -1.)
    }

    pub fn current_weight(&self, id: AnimatableId) -> Option<f32> {
        self.animatable(id).map(Animatable::current_weight)
    }

    pub fn parent(&self, id: AnimatableId) -> Option<AnimatableId> {
        self.nodes.get(&id)?.parent
    }

    /// Children of a sequence in evaluation order. Empty for channels and unknown ids.
    pub fn child_animations(&self, sequence: AnimatableId) -> &[AnimatableId] {
        self.nodes
            .get(&sequence)
            .map(AnimatableNode::children)
            .unwrap_or(&[])
    }

    pub fn get_animation(&self, sequence: AnimatableId, name: &str) -> Option<AnimatableId> {
        self.child_animations(sequence)
            .iter()
            .copied()
            .find(|child| self.name(*child) == Some(name))
    }

    fn sequence_mut(&mut self, id: AnimatableId) -> Option<&mut Sequence> {
        match &mut self.nodes.get_mut(&id)?.kind {
            AnimatableKind::Sequence(sequence) => Some(sequence),
            AnimatableKind::Channel(_) => None,
        }
    }

    pub fn controller(&self, sequence: AnimatableId) -> Option<&AnimationController> {
        self.get(sequence)?.as_sequence().map(Sequence::controller)
    }

    pub fn controller_mut(&mut self, sequence: AnimatableId) -> Option<&mut AnimationController> {
        self.sequence_mut(sequence)
            .map(|sequence| &mut sequence.controller)
    }

    /// Replaces the controller of a sequence. Returns false if `sequence` is not a sequence.
    pub fn set_controller(
        &mut self,
        sequence: AnimatableId,
        mut controller: AnimationController,
    ) -> bool {
        let children = self.child_animations(sequence).to_vec();
        let Some(slot) = self.controller_mut(sequence) else {
            return false;
        };
        controller.recalculate(&children);
        *slot = controller;
        true
    }

    pub fn walk_run_controller(&self, sequence: AnimatableId) -> Option<&WalkRunController> {
        self.controller(sequence)?.as_walk_run()
    }

    pub fn walk_run_controller_mut(
        &mut self,
        sequence: AnimatableId,
    ) -> Option<&mut WalkRunController> {
        self.controller_mut(sequence)?.as_walk_run_mut()
    }

    /// Appends a detached node to a sequence and recalculates the sequence timeline.
    ///
    /// A child whose name is already used by a sibling is rejected with a warning and
    /// discarded together with its subtree.
    pub fn add_animation(&mut self, sequence: AnimatableId, child: AnimatableId) -> bool {
        let Some(child_node) = self.nodes.get(&child) else {
            warn!("Cannot add unknown animation {child:?} to {sequence:?}");
            return false;
        };
        if child_node.parent.is_some() || child == self.root {
            warn!(
                "Animation {:?} already belongs to a sequence",
                child_node.animatable.name
            );
            return false;
        }
        if self.is_ancestor_or_self(child, sequence) {
            warn!("Cannot add animation {child:?} to its own subtree");
            return false;
        }
        if self.get(sequence).is_none_or(|node| !node.is_sequence()) {
            warn!("Cannot add animation to {sequence:?}: not a sequence");
            return false;
        }

        let name = child_node.animatable.name.clone();
        if self.get_animation(sequence, &name).is_some() {
            warn!("Animation {name:?} already exists in the sequence, it will not be added");
            self.discard_subtree(child);
            return false;
        }

        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(sequence);
        }
        if let Some(node) = self.nodes.get_mut(&sequence) {
            // A sequence that emptied out is alive again.
            node.animatable.prune = false;
        }
        if let Some(seq) = self.sequence_mut(sequence) {
            seq.children.push(child);
        }
        self.recalculate(sequence);
        true
    }

    fn is_ancestor_or_self(&self, ancestor: AnimatableId, mut id: AnimatableId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Lays the children of a sequence out on its timeline and derives its end time.
    ///
    /// Each child starts `start_delay` seconds after the sequence. The sequence ends when its
    /// last child ends, or never if any child is unbounded.
    pub fn recalculate(&mut self, sequence: AnimatableId) {
        let Some(node) = self.nodes.get(&sequence) else {
            return;
        };
        let start = node.animatable.start_time;
        let children = node.children().to_vec();

        let mut max_end = 0f32;
        let mut unbounded = false;

        for child in children.iter().copied() {
            let Some(child_node) = self.nodes.get_mut(&child) else {
                continue;
            };
            child_node.animatable.start_time = start + child_node.animatable.start_delay;
            self.lay_out(child);

            match self.animatable(child) {
                Some(animatable) if animatable.has_definite_end() => {
                    max_end = max_end.max(animatable.end_time);
                }
                Some(_) => unbounded = true,
                None => {}
            }
        }

        if let Some(node) = self.nodes.get_mut(&sequence) {
            if !node.animatable.is_fading_out_forced() {
                node.animatable.end_time = if unbounded {
                    Animatable::UNBOUNDED_END
                } else {
                    max_end
                };
            }
            if let AnimatableKind::Sequence(seq) = &mut node.kind {
                seq.controller.recalculate(&children);
            }
        }
    }

    /// Derives the end time of a node from its own start time.
    fn lay_out(&mut self, id: AnimatableId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if let AnimatableKind::Channel(channel) = &node.kind {
            if !node.animatable.is_fading_out_forced() {
                let start = node.animatable.start_time;
                node.animatable.end_time = channel
                    .calculate_duration()
                    .map_or(Animatable::UNBOUNDED_END, |duration| start + duration);
            }
        } else {
            self.recalculate(id);
        }
    }

    /// Advances the whole tree by `dt` seconds and pushes the resulting clip weights to
    /// `model`.
    pub fn update(&mut self, dt: f32, model: &mut dyn ModelDriver) {
        let root = self.root;
        let Some(node) = self.nodes.get_mut(&root) else {
            return;
        };
        // The root has no timeline of its own to fade against.
        node.animatable.elapsed_time += dt;
        node.animatable.current_weight = node.animatable.base_weight.clamp(0., 1.);
        node.animatable.current_speed = node.animatable.speed;
        node.animatable.active = true;

        self.run_sequence(root, dt, model);
    }

    fn run_sequence(&mut self, id: AnimatableId, dt: f32, model: &mut dyn ModelDriver) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let parent_weight = node.animatable.current_weight;
        let parent_speed = node.animatable.current_speed;
        let AnimatableKind::Sequence(sequence) = &mut node.kind else {
            return;
        };
        let children = sequence.children.clone();
        let mut controller = std::mem::take(&mut sequence.controller);

        let mut pass = SequencePass {
            arena: self,
            children,
            parent_weight,
            parent_speed,
            dt,
            model: &mut *model,
        };
        controller.update(&mut pass);
        let children = pass.children;

        let finished = children
            .iter()
            .copied()
            .filter(|child| self.animatable(*child).is_some_and(Animatable::should_prune))
            .collect::<Vec<_>>();
        for child in finished.iter().copied() {
            debug!("Pruning finished animation {:?}", self.name(child));
            self.remove_subtree(child, model);
        }

        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let AnimatableKind::Sequence(sequence) = &mut node.kind else {
            return;
        };
        sequence.children.retain(|child| !finished.contains(child));
        if !finished.is_empty() {
            controller.recalculate(&sequence.children);
        }
        sequence.controller = controller;
        if sequence.children.is_empty() {
            node.animatable.prune = true;
        }
    }

    /// Moves the clocks of a subtree that has not started yet.
    fn advance_dormant(&mut self, id: AnimatableId, dt: f32) {
        for child in self.child_animations(id).to_vec() {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.animatable.elapsed_time += dt;
                node.animatable.current_weight = 0.;
            }
            self.advance_dormant(child, dt);
        }
    }

    /// Starts a fade of `time` seconds on a node and everything below it.
    pub fn force_fade_out(&mut self, id: AnimatableId, time: f32) {
        for child in self.child_animations(id).to_vec() {
            self.force_fade_out(child, time);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.animatable.force_fade_out(time);
        }
    }

    /// Detaches a node from its sequence immediately and drops its subtree, releasing any
    /// animation it was playing on `model`.
    pub fn prune(&mut self, id: AnimatableId, model: &mut dyn ModelDriver) -> bool {
        if id == self.root || !self.contains(id) {
            return false;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(sequence) = self.sequence_mut(parent) {
                sequence.children.retain(|child| *child != id);
                let children = sequence.children.clone();
                sequence.controller.recalculate(&children);
                if children.is_empty() {
                    if let Some(parent_node) = self.nodes.get_mut(&parent) {
                        parent_node.animatable.prune = true;
                    }
                }
            }
        }
        self.remove_subtree(id, model);
        true
    }

    fn remove_subtree(&mut self, id: AnimatableId, model: &mut dyn ModelDriver) {
        let Some(mut node) = self.nodes.shift_remove(&id) else {
            return;
        };
        match &mut node.kind {
            AnimatableKind::Channel(channel) => channel.release(model, 0.),
            AnimatableKind::Sequence(sequence) => {
                for child in std::mem::take(&mut sequence.children) {
                    self.remove_subtree(child, model);
                }
            }
        }
    }

    /// Drops a subtree that never reached a model.
    fn discard_subtree(&mut self, id: AnimatableId) {
        let Some(node) = self.nodes.shift_remove(&id) else {
            return;
        };
        for child in node.children() {
            self.discard_subtree(*child);
        }
    }

    /// Deep copies a node and its subtree. The copy is detached, inactive and has its clock
    /// reset, and forced fades of the source are not carried over. Controllers are copied with
    /// their child handles pointing at the copies.
    pub fn clone_animatable(&mut self, id: AnimatableId) -> Option<AnimatableId> {
        let mut clones = HashMap::default();
        let cloned = self.clone_subtree(id, None, &mut clones)?;

        for clone in clones.values() {
            if let Some(sequence) = self.sequence_mut(*clone) {
                sequence.controller.remap(&clones);
                let children = sequence.children.clone();
                sequence.controller.recalculate(&children);
            }
        }
        self.lay_out(cloned);

        Some(cloned)
    }

    fn clone_subtree(
        &mut self,
        id: AnimatableId,
        parent: Option<AnimatableId>,
        clones: &mut HashMap<AnimatableId, AnimatableId>,
    ) -> Option<AnimatableId> {
        let node = self.nodes.get(&id)?;
        let children = node.children().to_vec();
        let animatable = node.animatable.reset_runtime();
        let kind = match &node.kind {
            AnimatableKind::Channel(channel) => AnimatableKind::Channel(channel.reset_runtime()),
            AnimatableKind::Sequence(sequence) => AnimatableKind::Sequence(Sequence {
                children: Vec::with_capacity(children.len()),
                controller: sequence.controller.clone(),
            }),
        };
        let cloned = self.insert(AnimatableNode {
            animatable,
            parent,
            kind,
        });
        clones.insert(id, cloned);

        for child in children {
            if let Some(cloned_child) = self.clone_subtree(child, Some(cloned), clones) {
                if let Some(sequence) = self.sequence_mut(cloned) {
                    sequence.children.push(cloned_child);
                }
            }
        }

        Some(cloned)
    }
}

/// Context handed to a controller while it evaluates the children of one sequence.
pub struct SequencePass<'a> {
    arena: &'a mut AnimationArena,
    children: Vec<AnimatableId>,
    parent_weight: f32,
    parent_speed: f32,
    dt: f32,
    model: &'a mut dyn ModelDriver,
}

impl SequencePass<'_> {
    pub fn children(&self) -> &[AnimatableId] {
        &self.children
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Current weight of the sequence being evaluated.
    pub fn parent_weight(&self) -> f32 {
        self.parent_weight
    }

    pub fn is_child(&self, id: AnimatableId) -> bool {
        self.children.contains(&id)
    }

    pub fn set_base_weight(&mut self, child: AnimatableId, weight: f32) {
        if !self.is_child(child) {
            return;
        }
        if let Some(animatable) = self.arena.animatable_mut(child) {
            animatable.base_weight = weight;
        }
    }

    pub fn set_speed(&mut self, child: AnimatableId, speed: f32) {
        if !self.is_child(child) {
            return;
        }
        if let Some(animatable) = self.arena.animatable_mut(child) {
            animatable.speed = speed;
        }
    }

    /// Advances a child's clock, computes its weight and speed, and updates it if it has
    /// started.
    pub fn update_child(&mut self, child: AnimatableId) {
        let dt = self.dt;
        let Some(node) = self.arena.nodes.get_mut(&child) else {
            return;
        };
        let animatable = &mut node.animatable;
        animatable.elapsed_time += dt;
        animatable.current_speed = self.parent_speed * animatable.speed;

        if animatable.prune {
            animatable.current_weight = 0.;
            return;
        }

        animatable.current_weight = animatable.compute_weight(self.parent_weight);
        if animatable.fade_out_completed() {
            animatable.prune = true;
            return;
        }

        let started = animatable.elapsed_time >= animatable.start_time;
        animatable.active |= started;
        let weight = animatable.current_weight;

        if let AnimatableKind::Channel(channel) = &mut node.kind {
            if started {
                channel.push_weight(weight, &mut *self.model);
            }
        } else if started {
            self.arena.run_sequence(child, dt, &mut *self.model);
        } else {
            self.arena.advance_dormant(child, dt);
        }
    }
}
