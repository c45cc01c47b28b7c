// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth-ordered animation scheduling.
//!
//! Running animations of non-frozen owners sit in one of two
//! [`DepthBucketQueue`]s. Each pass drains the *current* queue in ascending
//! owner depth, moving every animation into the *next* queue at its owner's
//! depth as read at that moment, then swaps the two. A reparent during the
//! pass therefore cannot disturb the queue being drained, and the moved
//! animation is already filed at its new depth for the following frame.

mod queue;
mod system;

pub use queue::{DepthBucketQueue, QueueNode, QueueNodePool};
pub use system::AnimationSystem;

use crate::slab::slot_key;
use crate::world::Context;

slot_key! {
    /// A handle to an animation attached through a [`World`](crate::World).
    AnimationKey
}

/// A time-driven track attached to a scene node.
pub trait Animation: 'static {
    /// Advances the track.
    ///
    /// `delta` is already scaled by the owner's effective speed.
    fn advance(&mut self, cx: &mut Context<'_>, delta: f32);
}
