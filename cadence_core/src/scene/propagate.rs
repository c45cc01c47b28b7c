// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Propagation of inherited node state.
//!
//! Propagation follows a drain-recompute pattern for each dirty channel,
//! always visiting parents before children:
//!
//! 1. **DEPTH** — `depth = parent_depth + 1`, or 0 for roots.
//! 2. **FROZEN** — `globally_frozen = parent_globally_frozen || frozen`.
//! 3. **SPEED** — `effective_speed = parent_effective_speed * speed`.
//!
//! Only nodes whose computed value actually changed are reported in
//! [`TreeChanges`], so the schedulers are notified exactly on transitions.

use alloc::vec::Vec;

use super::id::INVALID;
use super::tree::SceneTree;
use crate::dirty;

/// The set of transitions produced by a single [`SceneTree::propagate`] call.
///
/// Each field contains raw slot indices; use
/// [`node_at`](SceneTree::node_at) to turn them back into handles.
#[derive(Clone, Debug, Default)]
pub struct TreeChanges {
    /// Nodes whose depth changed.
    pub depths: Vec<u32>,
    /// Nodes that became globally frozen.
    pub frozen: Vec<u32>,
    /// Nodes that stopped being globally frozen.
    pub unfrozen: Vec<u32>,
    /// Nodes whose effective speed changed.
    pub speeds: Vec<u32>,
}

impl TreeChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.depths.clear();
        self.frozen.clear();
        self.unfrozen.clear();
        self.speeds.clear();
    }

    /// Returns `true` if no node changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
            && self.frozen.is_empty()
            && self.unfrozen.is_empty()
            && self.speeds.is_empty()
    }
}

impl SceneTree {
    /// Recomputes dirty inherited properties and returns the transitions.
    pub fn propagate(&mut self) -> TreeChanges {
        let mut changes = TreeChanges::default();
        self.propagate_into(&mut changes);
        changes
    }

    /// Like [`propagate`](Self::propagate), but reuses a caller-provided
    /// buffer.
    pub fn propagate_into(&mut self, changes: &mut TreeChanges) {
        changes.clear();

        let dirty_depths: Vec<u32> = self
            .dirty
            .drain(dirty::DEPTH)
            .affected()
            .deterministic()
            .run()
            .collect();
        for idx in dirty_depths {
            let p = self.parent[idx as usize];
            let depth = if p != INVALID {
                self.depth[p as usize] + 1
            } else {
                0
            };
            if depth != self.depth[idx as usize] {
                self.depth[idx as usize] = depth;
                changes.depths.push(idx);
            }
        }

        let dirty_frozen: Vec<u32> = self
            .dirty
            .drain(dirty::FROZEN)
            .affected()
            .deterministic()
            .run()
            .collect();
        for idx in dirty_frozen {
            let p = self.parent[idx as usize];
            let parent_frozen = p != INVALID && self.globally_frozen[p as usize];
            let new_frozen = parent_frozen || self.frozen[idx as usize];
            if new_frozen != self.globally_frozen[idx as usize] {
                self.globally_frozen[idx as usize] = new_frozen;
                if new_frozen {
                    changes.frozen.push(idx);
                } else {
                    changes.unfrozen.push(idx);
                }
            }
        }

        let dirty_speeds: Vec<u32> = self
            .dirty
            .drain(dirty::SPEED)
            .affected()
            .deterministic()
            .run()
            .collect();
        for idx in dirty_speeds {
            let p = self.parent[idx as usize];
            let parent_speed = if p != INVALID {
                self.effective_speed[p as usize]
            } else {
                1.0
            };
            let speed = parent_speed * self.speed[idx as usize];
            if speed != self.effective_speed[idx as usize] {
                self.effective_speed[idx as usize] = speed;
                changes.speeds.push(idx);
            }
        }
    }
}
