// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation records and the double-buffered depth queues.

use alloc::boxed::Box;
use core::fmt;

use super::{Animation, AnimationKey, DepthBucketQueue, QueueNode, QueueNodePool};
use crate::scene::NodeId;
use crate::slab::Slab;

struct AnimationRecord {
    owner: NodeId,
    running: bool,
    /// Set while the animation sits in one of the two queues.
    queue_node: Option<QueueNode>,
    /// `None` while `advance` runs.
    instance: Option<Box<dyn Animation>>,
    /// Removed during its own `advance`.
    detached: bool,
}

impl fmt::Debug for AnimationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationRecord")
            .field("owner", &self.owner)
            .field("running", &self.running)
            .field("queue_node", &self.queue_node)
            .finish_non_exhaustive()
    }
}

/// Owns every animation record and the current/next queues.
#[derive(Debug)]
pub struct AnimationSystem {
    records: Slab<AnimationKey, AnimationRecord>,
    pool: QueueNodePool<AnimationKey>,
    current: DepthBucketQueue,
    next: DepthBucketQueue,
}

impl AnimationSystem {
    /// Creates an empty system whose queues start with `depth_buckets`
    /// buckets.
    #[must_use]
    pub fn new(depth_buckets: u32) -> Self {
        Self {
            records: Slab::new(),
            pool: QueueNodePool::new(),
            current: DepthBucketQueue::new(0, depth_buckets),
            next: DepthBucketQueue::new(1, depth_buckets),
        }
    }

    /// Number of attached animations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no animation is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    /// Returns `true` if `key` refers to an attached animation.
    #[must_use]
    pub fn contains(&self, key: AnimationKey) -> bool {
        self.records.get(key).is_some_and(|r| !r.detached)
    }

    /// Owner of the animation.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale.
    #[must_use]
    pub fn owner(&self, key: AnimationKey) -> NodeId {
        self.records[key].owner
    }

    /// Returns `true` if the animation is marked running.
    #[must_use]
    pub fn is_running(&self, key: AnimationKey) -> bool {
        self.records.get(key).is_some_and(|r| r.running)
    }

    /// Returns `true` if the animation is scheduled in a queue.
    #[must_use]
    pub fn is_active(&self, key: AnimationKey) -> bool {
        self.records
            .get(key)
            .is_some_and(|r| r.queue_node.is_some())
    }

    /// Number of queue wrappers ever allocated.
    ///
    /// Stays flat across frames once the active set stops growing.
    #[must_use]
    pub fn allocated_wrappers(&self) -> usize {
        self.pool.allocated()
    }

    /// The queue drained by the next pass.
    #[must_use]
    pub fn current_queue(&self) -> &DepthBucketQueue {
        &self.current
    }

    /// The queue filled by the pass in progress.
    #[must_use]
    pub fn next_queue(&self) -> &DepthBucketQueue {
        &self.next
    }

    pub(crate) fn add(&mut self, owner: NodeId, instance: Box<dyn Animation>, running: bool) -> AnimationKey {
        self.records.insert(AnimationRecord {
            owner,
            running,
            queue_node: None,
            instance: Some(instance),
            detached: false,
        })
    }

    /// Deactivates and detaches an animation.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale or was already removed.
    pub(crate) fn remove(&mut self, key: AnimationKey) {
        assert!(!self.records[key].detached, "{key:?} was already removed");
        self.deactivate(key);
        let record = &mut self.records[key];
        if record.instance.is_some() {
            self.records.remove(key);
        } else {
            record.detached = true;
        }
    }

    /// Sets the running flag. Returns `true` if it changed.
    pub(crate) fn set_running(&mut self, key: AnimationKey, running: bool) -> bool {
        let record = &mut self.records[key];
        let changed = record.running != running;
        record.running = running;
        changed
    }

    /// Schedules the animation into the current queue. No-op if already
    /// scheduled.
    pub(crate) fn activate(&mut self, key: AnimationKey, depth: u32) {
        let record = &mut self.records[key];
        if record.queue_node.is_some() {
            return;
        }
        let node = self.pool.acquire(key);
        record.queue_node = Some(node);
        self.current.enqueue(&mut self.pool, depth, node);
    }

    /// Unschedules the animation and recycles its wrapper. No-op if not
    /// scheduled.
    pub(crate) fn deactivate(&mut self, key: AnimationKey) {
        let Some(node) = self.records[key].queue_node.take() else {
            return;
        };
        if self.current.contains(&self.pool, node) {
            self.current.remove(&mut self.pool, node);
        } else if self.next.contains(&self.pool, node) {
            self.next.remove(&mut self.pool, node);
        }
        self.pool.release(node);
    }

    /// Moves a scheduled animation to the bucket for `depth` within the
    /// queue that holds it.
    pub(crate) fn rekey(&mut self, key: AnimationKey, depth: u32) {
        let Some(node) = self.records[key].queue_node else {
            return;
        };
        let queue = if self.current.contains(&self.pool, node) {
            &mut self.current
        } else {
            &mut self.next
        };
        queue.remove(&mut self.pool, node);
        queue.enqueue(&mut self.pool, depth, node);
    }

    /// Takes the shallowest animation of the current queue and files it in
    /// the next queue at its owner's present depth.
    pub(crate) fn next_to_advance(&mut self, depth_of: impl Fn(NodeId) -> u32) -> Option<AnimationKey> {
        if self.current.is_empty() {
            return None;
        }
        let node = self.current.dequeue(&mut self.pool);
        let key = self.pool.payload(node);
        let depth = depth_of(self.records[key].owner);
        self.next.enqueue(&mut self.pool, depth, node);
        Some(key)
    }

    /// Ends a pass: the filled queue becomes current.
    pub(crate) fn finish_pass(&mut self) {
        core::mem::swap(&mut self.current, &mut self.next);
    }

    /// Checks out the instance for `advance`.
    pub(crate) fn take_instance(&mut self, key: AnimationKey) -> Option<Box<dyn Animation>> {
        let record = self.records.get_mut(key)?;
        if record.detached {
            return None;
        }
        record.instance.take()
    }

    /// Returns a checked-out instance, or drops it if the animation was
    /// removed meanwhile.
    pub(crate) fn restore_instance(&mut self, key: AnimationKey, instance: Box<dyn Animation>) {
        let record = &mut self.records[key];
        if record.detached {
            self.records.remove(key);
        } else {
            record.instance = Some(instance);
        }
    }
}
