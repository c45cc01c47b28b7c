// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth-keyed bucket queue over a shared, recycled node pool.
//!
//! Each bucket is an intrusive doubly linked list of pool nodes, so removal
//! of an arbitrary node is O(1). Dequeue scans buckets upward from a cursor
//! that only moves back when a lower bucket receives a node, which makes a
//! full drain O(nodes + buckets).
//!
//! Several queues may share one [`QueueNodePool`]; each queue has a tag and
//! every linked node records the tag of the queue holding it.

use alloc::vec::Vec;

use crate::scene::INVALID;

/// Handle to a node of a [`QueueNodePool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueueNode(pub(crate) u32);

#[derive(Debug)]
struct Slot<T> {
    payload: T,
    bucket: u32,
    prev: u32,
    next: u32,
    /// Tag of the queue holding the node, or `INVALID`.
    queue: u32,
    free: bool,
}

/// Recyclable wrappers shared by one or more [`DepthBucketQueue`]s.
///
/// A node is owned at any instant by exactly one of: a queue bucket, its
/// acquirer (between queues), or the free list.
#[derive(Debug)]
pub struct QueueNodePool<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
}

impl<T: Copy> Default for QueueNodePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> QueueNodePool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Takes a node from the free list, allocating only if it is empty.
    pub fn acquire(&mut self, payload: T) -> QueueNode {
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.payload = payload;
            slot.free = false;
            return QueueNode(idx);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "node counts stay far below u32::MAX"
        )]
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            payload,
            bucket: INVALID,
            prev: INVALID,
            next: INVALID,
            queue: INVALID,
            free: false,
        });
        QueueNode(idx)
    }

    /// Returns a node to the free list.
    ///
    /// # Panics
    ///
    /// Panics if the node is still linked into a queue or already free.
    pub fn release(&mut self, node: QueueNode) {
        let slot = &mut self.slots[node.0 as usize];
        assert!(slot.queue == INVALID, "{node:?} is still queued");
        assert!(!slot.free, "{node:?} released twice");
        slot.free = true;
        self.free_list.push(node.0);
    }

    /// The payload of a node.
    #[must_use]
    pub fn payload(&self, node: QueueNode) -> T {
        self.slots[node.0 as usize].payload
    }

    /// Number of nodes ever allocated (live plus free).
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Number of nodes waiting on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }
}

#[derive(Clone, Copy, Debug)]
struct Bucket {
    head: u32,
    tail: u32,
}

const EMPTY: Bucket = Bucket {
    head: INVALID,
    tail: INVALID,
};

/// A min-priority queue keyed by small non-negative depths.
///
/// Nodes with equal depth come out in FIFO order.
#[derive(Debug)]
pub struct DepthBucketQueue {
    tag: u32,
    buckets: Vec<Bucket>,
    len: usize,
    /// No bucket below this index holds a node.
    cursor: usize,
}

impl DepthBucketQueue {
    /// Creates an empty queue with `bucket_count` buckets.
    ///
    /// `tag` must be unique among queues sharing a pool.
    #[must_use]
    pub fn new(tag: u32, bucket_count: u32) -> Self {
        Self {
            tag,
            buckets: alloc::vec![EMPTY; bucket_count as usize],
            len: 0,
            cursor: 0,
        }
    }

    /// Number of queued nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no node is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current number of buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if `node` is linked into this queue.
    #[must_use]
    pub fn contains<T>(&self, pool: &QueueNodePool<T>, node: QueueNode) -> bool {
        pool.slots
            .get(node.0 as usize)
            .is_some_and(|s| s.queue == self.tag)
    }

    /// Grows the queue to `bucket_count` buckets, keeping its contents.
    ///
    /// Never shrinks.
    pub fn resize(&mut self, bucket_count: usize) {
        if bucket_count > self.buckets.len() {
            self.buckets.resize(bucket_count, EMPTY);
        }
    }

    /// Appends `node` to the bucket for `depth`, growing the queue if needed.
    ///
    /// # Panics
    ///
    /// Panics if the node is already queued somewhere.
    pub fn enqueue<T>(&mut self, pool: &mut QueueNodePool<T>, depth: u32, node: QueueNode) {
        let d = depth as usize;
        if d >= self.buckets.len() {
            self.resize((d + 1).max(self.buckets.len() * 2));
        }

        let idx = node.0;
        let tail = self.buckets[d].tail;
        {
            let slot = &mut pool.slots[idx as usize];
            assert!(slot.queue == INVALID, "{node:?} is already queued");
            assert!(!slot.free, "{node:?} is on the free list");
            slot.bucket = depth;
            slot.prev = tail;
            slot.next = INVALID;
            slot.queue = self.tag;
        }
        if tail == INVALID {
            self.buckets[d].head = idx;
        } else {
            pool.slots[tail as usize].next = idx;
        }
        self.buckets[d].tail = idx;

        self.len += 1;
        if d < self.cursor {
            self.cursor = d;
        }
    }

    /// Removes and returns the first node of the lowest non-empty bucket.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn dequeue<T>(&mut self, pool: &mut QueueNodePool<T>) -> QueueNode {
        assert!(self.len > 0, "dequeue from an empty DepthBucketQueue");
        while self.buckets[self.cursor].head == INVALID {
            self.cursor += 1;
        }
        let node = QueueNode(self.buckets[self.cursor].head);
        self.unlink(pool, node);
        node
    }

    /// Unlinks `node` from this queue in O(1).
    ///
    /// # Panics
    ///
    /// Panics if the node is not in this queue.
    pub fn remove<T>(&mut self, pool: &mut QueueNodePool<T>, node: QueueNode) {
        assert!(
            self.contains(pool, node),
            "{node:?} is not in queue {}",
            self.tag
        );
        self.unlink(pool, node);
    }

    fn unlink<T>(&mut self, pool: &mut QueueNodePool<T>, node: QueueNode) {
        let (bucket, prev, next) = {
            let slot = &mut pool.slots[node.0 as usize];
            let links = (slot.bucket as usize, slot.prev, slot.next);
            slot.prev = INVALID;
            slot.next = INVALID;
            slot.bucket = INVALID;
            slot.queue = INVALID;
            links
        };
        if prev == INVALID {
            self.buckets[bucket].head = next;
        } else {
            pool.slots[prev as usize].next = next;
        }
        if next == INVALID {
            self.buckets[bucket].tail = prev;
        } else {
            pool.slots[next as usize].prev = prev;
        }
        self.len -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut DepthBucketQueue, pool: &mut QueueNodePool<char>) -> Vec<char> {
        let mut out = Vec::new();
        while !queue.is_empty() {
            let node = queue.dequeue(pool);
            out.push(pool.payload(node));
        }
        out
    }

    #[test]
    fn dequeues_in_depth_order_fifo_within_depth() {
        let mut pool = QueueNodePool::new();
        let mut queue = DepthBucketQueue::new(0, 4);
        for (c, depth) in [('a', 2), ('b', 0), ('c', 2), ('d', 1), ('e', 0)] {
            let node = pool.acquire(c);
            queue.enqueue(&mut pool, depth, node);
        }
        assert_eq!(drain(&mut queue, &mut pool), &['b', 'e', 'd', 'a', 'c']);
    }

    #[test]
    fn enqueue_below_cursor_is_seen() {
        let mut pool = QueueNodePool::new();
        let mut queue = DepthBucketQueue::new(0, 4);
        let deep = pool.acquire('d');
        queue.enqueue(&mut pool, 3, deep);
        let shallow = pool.acquire('s');
        queue.enqueue(&mut pool, 3, shallow);
        assert_eq!(pool.payload(queue.dequeue(&mut pool)), 'd');

        let root = pool.acquire('r');
        queue.enqueue(&mut pool, 0, root);
        assert_eq!(drain(&mut queue, &mut pool), &['r', 's']);
    }

    #[test]
    fn grows_on_deep_enqueue() {
        let mut pool = QueueNodePool::new();
        let mut queue = DepthBucketQueue::new(0, 2);
        let a = pool.acquire('a');
        queue.enqueue(&mut pool, 1, a);
        let b = pool.acquire('b');
        queue.enqueue(&mut pool, 9, b);
        assert_eq!(queue.bucket_count(), 10, "grows to depth + 1 when that exceeds doubling");

        let c = pool.acquire('c');
        queue.enqueue(&mut pool, 10, c);
        assert_eq!(queue.bucket_count(), 20, "otherwise doubles");
        assert_eq!(drain(&mut queue, &mut pool), &['a', 'b', 'c']);
    }

    #[test]
    fn resize_preserves_contents() {
        let mut pool = QueueNodePool::new();
        let mut queue = DepthBucketQueue::new(0, 2);
        let a = pool.acquire('a');
        queue.enqueue(&mut pool, 1, a);
        queue.resize(64);
        queue.resize(8);
        assert_eq!(queue.bucket_count(), 64, "resize never shrinks");
        assert_eq!(drain(&mut queue, &mut pool), &['a']);
    }

    #[test]
    fn remove_unlinks_from_the_middle() {
        let mut pool = QueueNodePool::new();
        let mut queue = DepthBucketQueue::new(0, 2);
        let nodes: Vec<_> = ['a', 'b', 'c'].map(|c| pool.acquire(c)).into_iter().collect();
        for &n in &nodes {
            queue.enqueue(&mut pool, 1, n);
        }
        queue.remove(&mut pool, nodes[1]);
        assert!(!queue.contains(&pool, nodes[1]));
        assert_eq!(queue.len(), 2);
        assert_eq!(drain(&mut queue, &mut pool), &['a', 'c']);
    }

    #[test]
    fn pool_recycles_released_nodes() {
        let mut pool = QueueNodePool::new();
        let a = pool.acquire('a');
        pool.release(a);
        assert_eq!(pool.free_count(), 1);
        let b = pool.acquire('b');
        assert_eq!(a, b, "released node is reused");
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.payload(b), 'b');
    }

    #[test]
    fn queues_sharing_a_pool_are_distinguished() {
        let mut pool = QueueNodePool::new();
        let mut first = DepthBucketQueue::new(0, 2);
        let second = DepthBucketQueue::new(1, 2);
        let n = pool.acquire('n');
        first.enqueue(&mut pool, 0, n);
        assert!(first.contains(&pool, n));
        assert!(!second.contains(&pool, n));
    }

    #[test]
    #[should_panic(expected = "dequeue from an empty DepthBucketQueue")]
    fn dequeue_empty_panics() {
        let mut pool = QueueNodePool::<char>::new();
        let mut queue = DepthBucketQueue::new(0, 2);
        let _ = queue.dequeue(&mut pool);
    }

    #[test]
    #[should_panic(expected = "is still queued")]
    fn releasing_a_queued_node_panics() {
        let mut pool = QueueNodePool::new();
        let mut queue = DepthBucketQueue::new(0, 2);
        let n = pool.acquire('n');
        queue.enqueue(&mut pool, 0, n);
        pool.release(n);
    }
}
