// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants for the scene tree.
//!
//! Every channel here is *inherited*: each child has a dependency edge to its
//! parent on all three channels and mutations are marked with
//! [`EagerPolicy`](understory_dirty::EagerPolicy), so marking a node marks its
//! whole subtree. [`SceneTree::propagate`](crate::scene::SceneTree::propagate)
//! drains them parent-first and reports what actually changed as
//! [`TreeChanges`](crate::scene::TreeChanges).

use understory_dirty::Channel;

/// Parent link changed, so depth must be recomputed for the subtree.
pub const DEPTH: Channel = Channel::new(0);

/// Local frozen flag or ancestry changed, so `globally_frozen` must be
/// recomputed for the subtree.
pub const FROZEN: Channel = Channel::new(1);

/// Local speed or ancestry changed, so `effective_speed` must be recomputed
/// for the subtree.
pub const SPEED: Channel = Channel::new(2);
