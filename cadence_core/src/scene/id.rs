// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node identity.

use crate::slab::slot_key;

/// Sentinel value indicating "no node" or "no slot" in index fields.
pub const INVALID: u32 = u32::MAX;

slot_key! {
    /// A handle to a node in a [`SceneTree`](super::SceneTree).
    ///
    /// Contains both a slot index and a generation counter so that stale
    /// handles can be detected after a node is destroyed and the slot is
    /// reused.
    NodeId
}
