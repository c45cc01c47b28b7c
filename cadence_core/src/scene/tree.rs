// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property management.

use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::id::{INVALID, NodeId};
use super::traverse::Children;
use crate::dirty;

/// Struct-of-arrays storage for all scene nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Mutations only mark dirty channels; computed properties are brought up to
/// date by [`propagate`](Self::propagate).
#[derive(Debug)]
pub struct SceneTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local properties (set by callers) --
    pub(crate) frozen: Vec<bool>,
    pub(crate) speed: Vec<f32>,

    // -- Computed properties (written by propagate) --
    pub(crate) depth: Vec<u32>,
    pub(crate) globally_frozen: Vec<bool>,
    pub(crate) effective_speed: Vec<f32>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            frozen: Vec::new(),
            speed: Vec::new(),
            depth: Vec::new(),
            globally_frozen: Vec::new(),
            effective_speed: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
        }
    }

    // -- Allocation API --

    /// Creates a new root node and returns its handle.
    ///
    /// The node starts unfrozen at depth 0 with speed 1.0 and no parent.
    pub fn create_node(&mut self) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.frozen[i] = false;
            self.speed[i] = 1.0;
            self.depth[i] = 0;
            self.globally_frozen[i] = false;
            self.effective_speed[i] = 1.0;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.frozen.push(false);
            self.speed.push(1.0);
            self.depth.push(0);
            self.globally_frozen.push(false);
            self.effective_speed.push(1.0);
            self.generation.push(0);
            idx
        };

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// Marks every inherited channel for `child`'s subtree so depth, frozen
    /// state, and speed are recomputed under the new ancestry.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, or
    /// if `parent` is `child` itself or one of its descendants.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] == INVALID,
            "child already has a parent"
        );
        self.assert_not_ancestor(child.idx, parent.idx);
        self.link_last(parent.idx, child.idx);
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// `child` must not already have a parent. `sibling` must have a parent.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, `sibling`
    /// has no parent, or the insertion would create a cycle.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");
        self.assert_not_ancestor(c, p);

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.add_inherited_dependencies(c, p);
        self.mark_subtree_inherited_dirty(c);
    }

    /// Removes `child` from its current parent, making it a root.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "node has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.remove_inherited_dependencies(c, p);
        self.mark_subtree_inherited_dirty(c);
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// If `child` already has a parent, it is removed first.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `new_parent` is `child` itself
    /// or one of its descendants.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        self.validate(child);
        self.validate(new_parent);
        let c = child.idx;
        self.assert_not_ancestor(c, new_parent.idx);

        let old_p = self.parent[c as usize];
        if old_p != INVALID {
            self.unlink_from_parent(c);
            self.remove_inherited_dependencies(c, old_p);
        }
        self.link_last(new_parent.idx, c);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.node_at(p))
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the root nodes (those with no parent).
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.len)
            .filter(|&idx| self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx))
            .map(|idx| self.node_at(idx))
            .collect()
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the local frozen flag of a node.
    #[must_use]
    pub fn frozen(&self, id: NodeId) -> bool {
        self.validate(id);
        self.frozen[id.idx as usize]
    }

    /// Returns the local speed multiplier of a node.
    #[must_use]
    pub fn speed(&self, id: NodeId) -> f32 {
        self.validate(id);
        self.speed[id.idx as usize]
    }

    /// Returns the distance of a node from its root.
    ///
    /// Only valid after [`propagate`](Self::propagate) has been called.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.depth[id.idx as usize]
    }

    /// Returns whether the node or any of its ancestors is frozen.
    ///
    /// Only valid after [`propagate`](Self::propagate) has been called.
    #[must_use]
    pub fn globally_frozen(&self, id: NodeId) -> bool {
        self.validate(id);
        self.globally_frozen[id.idx as usize]
    }

    /// Returns the product of the speeds of the node and all its ancestors.
    ///
    /// Only valid after [`propagate`](Self::propagate) has been called.
    #[must_use]
    pub fn effective_speed(&self, id: NodeId) -> f32 {
        self.validate(id);
        self.effective_speed[id.idx as usize]
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the local frozen flag of a node.
    ///
    /// Marks the FROZEN channel dirty with eager propagation to descendants.
    pub fn set_frozen(&mut self, id: NodeId, frozen: bool) {
        self.validate(id);
        self.frozen[id.idx as usize] = frozen;
        self.dirty.mark_with(id.idx, dirty::FROZEN, &EagerPolicy);
    }

    /// Sets the local speed multiplier of a node.
    ///
    /// Marks the SPEED channel dirty with eager propagation to descendants.
    pub fn set_speed(&mut self, id: NodeId, speed: f32) {
        self.validate(id);
        self.speed[id.idx as usize] = speed;
        self.dirty.mark_with(id.idx, dirty::SPEED, &EagerPolicy);
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `TreeChanges`) rather than
    // `NodeId` handles, skipping generation validation.

    /// Returns the current handle for raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn node_at(&self, idx: u32) -> NodeId {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the computed depth at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn depth_at(&self, idx: u32) -> u32 {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.depth[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Panics if `ancestor` is `idx` or lies on the parent chain of `idx`.
    fn assert_not_ancestor(&self, ancestor: u32, idx: u32) {
        let mut cur = idx;
        while cur != INVALID {
            assert!(cur != ancestor, "cannot attach a node under itself");
            cur = self.parent[cur as usize];
        }
    }

    /// Appends `c` to the child list of `p` and marks the new subtree dirty.
    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        self.add_inherited_dependencies(c, p);
        self.mark_subtree_inherited_dirty(c);
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn add_inherited_dependencies(&mut self, c: u32, p: u32) {
        // Parent links are acyclic (checked above), so these cannot fail.
        let _ = self.dirty.add_dependency(c, p, dirty::DEPTH);
        let _ = self.dirty.add_dependency(c, p, dirty::FROZEN);
        let _ = self.dirty.add_dependency(c, p, dirty::SPEED);
    }

    fn remove_inherited_dependencies(&mut self, c: u32, p: u32) {
        self.dirty.remove_dependency(c, p, dirty::DEPTH);
        self.dirty.remove_dependency(c, p, dirty::FROZEN);
        self.dirty.remove_dependency(c, p, dirty::SPEED);
    }

    /// Marks the subtree rooted at `idx` dirty for every inherited channel.
    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::DEPTH, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::FROZEN, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::SPEED, &EagerPolicy);
    }
}
