// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene tree data model.
//!
//! A *node* is an element of the tree that components are attached to. Each
//! node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - Topology: parent, first-child, and sibling links forming an ordered tree.
//! - **Local properties** set by the caller: [`frozen`](SceneTree::set_frozen)
//!   and [`speed`](SceneTree::set_speed).
//! - **Computed properties** produced by [`propagate`](SceneTree::propagate):
//!   `depth` (distance from the root), `globally_frozen` (the node or any
//!   ancestor is frozen) and `effective_speed` (product of ancestor speeds).
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.

mod id;
mod propagate;
mod traverse;
mod tree;

pub use id::{INVALID, NodeId};
pub use propagate::TreeChanges;
pub use traverse::Children;
pub use tree::SceneTree;
