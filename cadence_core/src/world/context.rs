// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The handle user callbacks mutate the world through.

use super::World;
use crate::animation::{Animation, AnimationKey};
use crate::behavior::{Behavior, BehaviorKey};
use crate::scene::{NodeId, SceneTree};

/// The component whose callback is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    /// A behavior. Stale inside [`Behavior::stop`].
    Behavior(BehaviorKey),
    /// An animation.
    Animation(AnimationKey),
}

/// Mutable access to the [`World`] from inside a component callback.
///
/// Exposes the structural and attachment API of the world. Frame entry
/// points are not reachable from here.
pub struct Context<'w> {
    world: &'w mut World,
    owner: NodeId,
    component: Component,
}

impl core::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("owner", &self.owner)
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

impl<'w> Context<'w> {
    pub(crate) fn new(world: &'w mut World, owner: NodeId, component: Component) -> Self {
        Self {
            world,
            owner,
            component,
        }
    }

    /// The node the running component is attached to.
    #[must_use]
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// The running component.
    #[must_use]
    pub fn component(&self) -> Component {
        self.component
    }

    /// Read access to the whole world.
    #[must_use]
    pub fn world(&self) -> &World {
        self.world
    }

    /// The scene tree.
    #[must_use]
    pub fn tree(&self) -> &SceneTree {
        self.world.tree()
    }

    /// Detaches the running component from its owner.
    ///
    /// A behavior's `stop` runs once the current callback returns.
    pub fn remove_self(&mut self) {
        match self.component {
            Component::Behavior(key) => self.world.remove_behavior(key),
            Component::Animation(key) => self.world.remove_animation(key),
        }
    }

    /// See [`World::create_node`].
    pub fn create_node(&mut self) -> NodeId {
        self.world.create_node()
    }

    /// See [`World::destroy_node`].
    pub fn destroy_node(&mut self, node: NodeId) {
        self.world.destroy_node(node);
    }

    /// See [`World::add_child`].
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.world.add_child(parent, child);
    }

    /// See [`World::insert_before`].
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) {
        self.world.insert_before(child, sibling);
    }

    /// See [`World::remove_from_parent`].
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.world.remove_from_parent(child);
    }

    /// See [`World::reparent`].
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        self.world.reparent(child, new_parent);
    }

    /// See [`World::set_frozen`].
    pub fn set_frozen(&mut self, node: NodeId, frozen: bool) {
        self.world.set_frozen(node, frozen);
    }

    /// See [`World::set_speed`].
    pub fn set_speed(&mut self, node: NodeId, speed: f32) {
        self.world.set_speed(node, speed);
    }

    /// See [`World::add_behavior`].
    pub fn add_behavior<B: Behavior>(&mut self, owner: NodeId, behavior: B) -> BehaviorKey {
        self.world.add_behavior(owner, behavior)
    }

    /// See [`World::remove_behavior`].
    pub fn remove_behavior(&mut self, key: BehaviorKey) {
        self.world.remove_behavior(key);
    }

    /// See [`World::suspend_behavior`].
    pub fn suspend_behavior(&mut self, key: BehaviorKey) {
        self.world.suspend_behavior(key);
    }

    /// See [`World::resume_behavior`].
    pub fn resume_behavior(&mut self, key: BehaviorKey) {
        self.world.resume_behavior(key);
    }

    /// See [`World::add_animation`].
    pub fn add_animation<A: Animation>(&mut self, owner: NodeId, animation: A, running: bool) -> AnimationKey {
        self.world.add_animation(owner, animation, running)
    }

    /// See [`World::remove_animation`].
    pub fn remove_animation(&mut self, key: AnimationKey) {
        self.world.remove_animation(key);
    }

    /// See [`World::run_animation`].
    pub fn run_animation(&mut self, key: AnimationKey) {
        self.world.run_animation(key);
    }

    /// See [`World::stop_animation`].
    pub fn stop_animation(&mut self, key: AnimationKey) {
        self.world.stop_animation(key);
    }
}
