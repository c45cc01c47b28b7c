// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame driver tying the scene tree to both schedulers.
//!
//! [`World`] is the only place user callbacks run. Every structural mutation
//! is applied to the [`SceneTree`], propagated immediately, and the resulting
//! transitions are pushed to the schedulers before the call returns:
//!
//! - depth changes move queued animations to their new bucket,
//! - frozen flips re-filter behavior membership, (de)activate animations,
//!   and fire [`Behavior::on_owner_frozen_changed`].
//!
//! While a callback runs, its instance is checked out of its record. A
//! component removed during its own callback is detached immediately; a
//! behavior's `stop` then runs as soon as the callback returns.

mod context;

use alloc::boxed::Box;
use alloc::vec::Vec;

pub use context::{Component, Context};

use crate::animation::{Animation, AnimationKey, AnimationSystem};
use crate::behavior::{Behavior, BehaviorKey, BehaviorSystem, BehaviorType, Removal, Restored, StageId};
use crate::config::{Phase, WorldConfig};
use crate::error::ScheduleError;
use crate::scene::{NodeId, SceneTree};
#[cfg(feature = "trace-rich")]
use crate::trace::BehaviorStartedEvent;
use crate::trace::{FrameBeginEvent, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, Tracer};

/// Components attached to one node slot.
#[derive(Clone, Debug, Default)]
struct Attached {
    behaviors: Vec<BehaviorKey>,
    animations: Vec<AnimationKey>,
}

impl Attached {
    fn is_empty(&self) -> bool {
        self.behaviors.is_empty() && self.animations.is_empty()
    }
}

/// A scene tree plus the behavior and animation schedulers driving it.
///
/// ```rust,ignore
/// let mut world = World::new(WorldConfig::DEFAULT);
/// let root = world.create_node();
/// world.add_behavior(root, Spin::default());
/// loop {
///     world.update(1.0 / 60.0)?;
/// }
/// ```
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    tree: SceneTree,
    behaviors: BehaviorSystem,
    animations: AnimationSystem,
    attached: Vec<Attached>,
    frame_index: u64,
    summary: FrameSummaryBuilder,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::DEFAULT)
    }
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            tree: SceneTree::new(),
            behaviors: BehaviorSystem::new(),
            animations: AnimationSystem::new(config.initial_depth_buckets),
            attached: Vec::new(),
            frame_index: 0,
            summary: FrameSummaryBuilder::new(0),
        }
    }

    /// The configuration the world was created with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The scene tree.
    #[must_use]
    pub fn tree(&self) -> &SceneTree {
        &self.tree
    }

    /// The behavior scheduler.
    #[must_use]
    pub fn behaviors(&self) -> &BehaviorSystem {
        &self.behaviors
    }

    /// The animation scheduler.
    #[must_use]
    pub fn animations(&self) -> &AnimationSystem {
        &self.animations
    }

    /// Index of the next frame [`update`](Self::update) runs.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Behaviors attached to `node`, in attach order.
    #[must_use]
    pub fn behaviors_of(&self, node: NodeId) -> &[BehaviorKey] {
        self.attached_to(node)
            .map(|a| a.behaviors.as_slice())
            .unwrap_or_default()
    }

    /// Animations attached to `node`, in attach order.
    #[must_use]
    pub fn animations_of(&self, node: NodeId) -> &[AnimationKey] {
        self.attached_to(node)
            .map(|a| a.animations.as_slice())
            .unwrap_or_default()
    }

    // -- Tree API --

    /// Creates a new root node.
    pub fn create_node(&mut self) -> NodeId {
        let node = self.tree.create_node();
        let idx = node.idx as usize;
        if self.attached.len() <= idx {
            self.attached.resize_with(idx + 1, Attached::default);
        }
        node
    }

    /// Destroys `node` and its whole subtree, children first.
    ///
    /// Every attached component is detached; behaviors receive `stop`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_node(&mut self, node: NodeId) {
        assert!(self.tree.is_alive(node), "stale NodeId: {node:?}");
        self.destroy_subtree(node);
        self.sync_tree();
    }

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// See [`SceneTree::add_child`].
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.tree.add_child(parent, child);
        self.sync_tree();
    }

    /// Inserts `child` right before `sibling`.
    ///
    /// # Panics
    ///
    /// See [`SceneTree::insert_before`].
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) {
        self.tree.insert_before(child, sibling);
        self.sync_tree();
    }

    /// Detaches `child` from its parent, making it a root.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.tree.remove_from_parent(child);
        self.sync_tree();
    }

    /// Moves `child` under `new_parent`.
    ///
    /// # Panics
    ///
    /// See [`SceneTree::reparent`].
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        self.tree.reparent(child, new_parent);
        self.sync_tree();
    }

    /// Sets the local frozen flag of `node`.
    pub fn set_frozen(&mut self, node: NodeId, frozen: bool) {
        self.tree.set_frozen(node, frozen);
        self.sync_tree();
    }

    /// Sets the local speed multiplier of `node`.
    pub fn set_speed(&mut self, node: NodeId, speed: f32) {
        self.tree.set_speed(node, speed);
        self.sync_tree();
    }

    // -- Behavior API --

    /// Attaches a behavior to `owner`. It starts at the next start drain.
    ///
    /// # Panics
    ///
    /// Panics if `owner` is stale.
    pub fn add_behavior<B: Behavior>(&mut self, owner: NodeId, behavior: B) -> BehaviorKey {
        assert!(self.tree.is_alive(owner), "stale NodeId: {owner:?}");
        let key = self
            .behaviors
            .add(owner, BehaviorType::of::<B>(), Box::new(behavior));
        self.attached[owner.idx as usize].behaviors.push(key);
        key
    }

    /// Detaches a behavior.
    ///
    /// A behavior that has not started yet is dropped silently; otherwise
    /// its `stop` runs.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale or was already removed.
    pub fn remove_behavior(&mut self, key: BehaviorKey) {
        assert!(self.behaviors.contains(key), "stale {key:?}");
        let owner = self.behaviors.owner(key);
        self.attached[owner.idx as usize]
            .behaviors
            .retain(|&k| k != key);
        self.detach_behavior(key);
    }

    /// Excludes a behavior from updates without stopping it.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale.
    pub fn suspend_behavior(&mut self, key: BehaviorKey) {
        self.set_suspended(key, true);
    }

    /// Undoes [`suspend_behavior`](Self::suspend_behavior).
    ///
    /// # Panics
    ///
    /// Panics if the key is stale.
    pub fn resume_behavior(&mut self, key: BehaviorKey) {
        self.set_suspended(key, false);
    }

    // -- Animation API --

    /// Attaches an animation to `owner`.
    ///
    /// A running animation is scheduled at once unless its owner is frozen.
    ///
    /// # Panics
    ///
    /// Panics if `owner` is stale.
    pub fn add_animation<A: Animation>(&mut self, owner: NodeId, animation: A, running: bool) -> AnimationKey {
        assert!(self.tree.is_alive(owner), "stale NodeId: {owner:?}");
        let key = self.animations.add(owner, Box::new(animation), running);
        self.attached[owner.idx as usize].animations.push(key);
        self.schedule_animation(key);
        key
    }

    /// Detaches an animation.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale or was already removed.
    pub fn remove_animation(&mut self, key: AnimationKey) {
        assert!(self.animations.contains(key), "stale {key:?}");
        let owner = self.animations.owner(key);
        self.attached[owner.idx as usize]
            .animations
            .retain(|&k| k != key);
        self.animations.remove(key);
    }

    /// Marks an animation running and schedules it unless its owner is
    /// frozen.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale.
    pub fn run_animation(&mut self, key: AnimationKey) {
        assert!(self.animations.contains(key), "stale {key:?}");
        if self.animations.set_running(key, true) {
            self.schedule_animation(key);
        }
    }

    /// Marks an animation stopped and unschedules it.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale.
    pub fn stop_animation(&mut self, key: AnimationKey) {
        assert!(self.animations.contains(key), "stale {key:?}");
        if self.animations.set_running(key, false) {
            self.schedule_animation(key);
        }
    }

    // -- Frame API --

    /// Runs one frame of the configured pipeline.
    ///
    /// Pending behaviors are started first and again after every stage
    /// phase. Behaviors attached while animations advance are started after
    /// the stage that follows.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScheduleError`] hit; the rest of the frame is
    /// skipped.
    pub fn update(&mut self, delta: f32) -> Result<(), ScheduleError> {
        self.update_traced(delta, &mut Tracer::none())
    }

    /// Like [`update`](Self::update), reporting to `tracer`.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update).
    pub fn update_traced(&mut self, delta: f32, tracer: &mut Tracer<'_>) -> Result<(), ScheduleError> {
        let frame_index = self.frame_index;
        self.summary = FrameSummaryBuilder::new(frame_index);
        tracer.frame_begin(&FrameBeginEvent { frame_index, delta });

        self.run_phase(PhaseKind::StartBehaviors, tracer, |w, t| w.start_pending(t))?;
        let pipeline = self.config.pipeline;
        for &phase in pipeline {
            match phase {
                Phase::Stage(stage) => {
                    self.run_phase(PhaseKind::Stage(stage), tracer, |w, t| {
                        w.run_stage(stage, delta, t)
                    })?;
                    self.run_phase(PhaseKind::StartBehaviors, tracer, |w, t| w.start_pending(t))?;
                }
                Phase::Animation => {
                    self.run_phase(PhaseKind::Animation, tracer, |w, _| {
                        w.run_animations(delta);
                        Ok(())
                    })?;
                }
            }
        }

        tracer.frame_summary(&self.summary.finish());
        self.frame_index += 1;
        Ok(())
    }

    /// Starts every pending behavior, including ones attached by `start`
    /// callbacks during the drain.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidDependency`] if a newly seen type
    /// declares an unschedulable ordering dependency.
    pub fn start_pending_behaviors(&mut self) -> Result<(), ScheduleError> {
        self.start_pending(&mut Tracer::none())
    }

    /// Updates every family of `stage` in dependency order.
    ///
    /// Does nothing if no behavior of that stage was ever started.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::DependencyCycle`] if the stage's ordering
    /// constraints are unsatisfiable.
    pub fn update_stage(&mut self, stage: StageId, delta: f32) -> Result<(), ScheduleError> {
        self.run_stage(stage, delta, &mut Tracer::none())
    }

    /// Advances every scheduled animation once, in ascending owner depth.
    pub fn update_animations(&mut self, delta: f32) {
        self.run_animations(delta);
    }

    // -- Internals --

    fn attached_to(&self, node: NodeId) -> Option<&Attached> {
        if !self.tree.is_alive(node) {
            return None;
        }
        self.attached.get(node.idx as usize)
    }

    fn run_phase(
        &mut self,
        phase: PhaseKind,
        tracer: &mut Tracer<'_>,
        run: impl FnOnce(&mut Self, &mut Tracer<'_>) -> Result<(), ScheduleError>,
    ) -> Result<(), ScheduleError> {
        let frame_index = self.frame_index;
        tracer.phase_begin(&PhaseBeginEvent { frame_index, phase });
        run(self, tracer)?;
        tracer.phase_end(&PhaseEndEvent { frame_index, phase });
        Ok(())
    }

    fn start_pending(&mut self, tracer: &mut Tracer<'_>) -> Result<(), ScheduleError> {
        while let Some(key) = self.behaviors.next_pending() {
            let owner = self.behaviors.owner(key);
            let frozen = self.tree.globally_frozen(owner);
            self.behaviors.assign_family(key, frozen, tracer)?;
            self.summary.behavior_started();
            #[cfg(feature = "trace-rich")]
            tracer.behavior_started(&BehaviorStartedEvent {
                frame_index: self.frame_index,
                behavior: self.behaviors.behavior_type(key).name(),
                owner,
            });
            self.run_behavior(key, &mut |b: &mut dyn Behavior, cx: &mut Context<'_>| b.start(cx));
        }
        Ok(())
    }

    fn run_stage(&mut self, stage: StageId, delta: f32, tracer: &mut Tracer<'_>) -> Result<(), ScheduleError> {
        let Some(stage) = self.behaviors.prepare_stage(stage, tracer)? else {
            return Ok(());
        };
        let mut n = 0;
        while let Some(family) = self.behaviors.stage_family_at(stage, n) {
            // Reverse sweep; see `UpdateFamily::visit`.
            let mut i = self.behaviors.family_slot_count(family);
            while i > 0 {
                i -= 1;
                let Some(key) = self.behaviors.visit_family_slot(family, i) else {
                    continue;
                };
                let scaled = delta * self.tree.effective_speed(self.behaviors.owner(key));
                self.summary.behavior_updated();
                self.run_behavior(key, &mut |b: &mut dyn Behavior, cx: &mut Context<'_>| {
                    b.update(cx, scaled);
                });
            }
            n += 1;
        }
        Ok(())
    }

    fn run_animations(&mut self, delta: f32) {
        loop {
            let tree = &self.tree;
            let Some(key) = self.animations.next_to_advance(|owner| tree.depth(owner)) else {
                break;
            };
            let owner = self.animations.owner(key);
            // Read at the instant of the advance.
            let scaled = delta * self.tree.effective_speed(owner);
            let Some(mut instance) = self.animations.take_instance(key) else {
                continue;
            };
            self.summary.animation_advanced();
            instance.advance(
                &mut Context::new(self, owner, Component::Animation(key)),
                scaled,
            );
            self.animations.restore_instance(key, instance);
        }
        self.animations.finish_pass();
    }

    /// Runs a callback with the behavior's instance checked out, then
    /// settles a removal or frozen flip that happened meanwhile.
    fn run_behavior(
        &mut self,
        key: BehaviorKey,
        f: &mut dyn FnMut(&mut dyn Behavior, &mut Context<'_>),
    ) {
        let Some((mut instance, owner)) = self.behaviors.take_instance(key) else {
            return;
        };
        f(
            instance.as_mut(),
            &mut Context::new(self, owner, Component::Behavior(key)),
        );
        match self.behaviors.restore_instance(key, instance) {
            Restored::Kept => {
                if self.behaviors.take_frozen_hook(key) {
                    self.run_behavior(key, &mut |b: &mut dyn Behavior, cx: &mut Context<'_>| {
                        b.on_owner_frozen_changed(cx);
                    });
                }
            }
            Restored::Detached { instance, owner } => self.stop_behavior(key, instance, owner),
        }
    }

    fn stop_behavior(&mut self, key: BehaviorKey, mut instance: Box<dyn Behavior>, owner: NodeId) {
        instance.stop(
            &mut Context::new(self, owner, Component::Behavior(key)),
            owner,
        );
    }

    fn detach_behavior(&mut self, key: BehaviorKey) {
        match self.behaviors.remove(key) {
            Removal::Dequeued | Removal::Deferred => {}
            Removal::Stop { instance, owner } => self.stop_behavior(key, instance, owner),
        }
    }

    fn set_suspended(&mut self, key: BehaviorKey, suspended: bool) {
        assert!(self.behaviors.contains(key), "stale {key:?}");
        let frozen = self.tree.globally_frozen(self.behaviors.owner(key));
        self.behaviors.set_suspended(key, suspended, frozen);
    }

    /// Activates a running animation of a non-frozen owner, deactivates
    /// anything else.
    fn schedule_animation(&mut self, key: AnimationKey) {
        let owner = self.animations.owner(key);
        if self.animations.is_running(key) && !self.tree.globally_frozen(owner) {
            self.animations.activate(key, self.tree.depth(owner));
        } else {
            self.animations.deactivate(key);
        }
    }

    fn destroy_subtree(&mut self, node: NodeId) {
        self.destroy_children(node);
        self.detach_components(node);
        if !self.tree.is_alive(node) {
            // A stop callback destroyed it already.
            return;
        }
        // Stop callbacks may have attached new children.
        self.destroy_children(node);
        self.tree.destroy_node(node);
    }

    fn destroy_children(&mut self, node: NodeId) {
        loop {
            let Some(child) = self.tree.children(node).next() else {
                return;
            };
            self.destroy_subtree(child);
            if !self.tree.is_alive(node) {
                return;
            }
        }
    }

    fn detach_components(&mut self, node: NodeId) {
        loop {
            if !self.tree.is_alive(node) {
                return;
            }
            let attached = core::mem::take(&mut self.attached[node.idx as usize]);
            if attached.is_empty() {
                return;
            }
            for key in attached.animations {
                if self.animations.contains(key) {
                    self.animations.remove(key);
                }
            }
            for key in attached.behaviors {
                if self.behaviors.contains(key) {
                    self.detach_behavior(key);
                }
            }
        }
    }

    /// Propagates tree changes and pushes the transitions to the schedulers.
    fn sync_tree(&mut self) {
        let changes = self.tree.propagate();
        if changes.is_empty() {
            return;
        }
        for &idx in &changes.depths {
            let depth = self.tree.depth_at(idx);
            if let Some(attached) = self.attached.get(idx as usize) {
                for &key in &attached.animations {
                    self.animations.rekey(key, depth);
                }
            }
        }
        for &idx in changes.frozen.iter().chain(&changes.unfrozen) {
            self.owner_frozen_changed(idx);
        }
    }

    fn owner_frozen_changed(&mut self, idx: u32) {
        let Some(attached) = self.attached.get(idx as usize).cloned() else {
            return;
        };
        for key in attached.animations {
            if self.animations.contains(key) {
                self.schedule_animation(key);
            }
        }
        for key in attached.behaviors {
            if !self.behaviors.contains(key) {
                continue;
            }
            // Re-read per behavior; earlier hooks may have flipped it back.
            let frozen = self.tree.globally_frozen(self.behaviors.owner(key));
            if self.behaviors.owner_frozen_changed(key, frozen) {
                self.run_behavior(key, &mut |b: &mut dyn Behavior, cx: &mut Context<'_>| {
                    b.on_owner_frozen_changed(cx);
                });
            }
        }
    }
}
