// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dense per-type membership arrays.

use alloc::vec::Vec;

use super::system::BehaviorRecord;
use super::{BehaviorKey, BehaviorType, StageId};
use crate::scene::INVALID;
use crate::slab::Slab;

/// Index of an [`UpdateFamily`] inside a [`BehaviorSystem`](super::BehaviorSystem).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FamilyId(pub(crate) u32);

impl FamilyId {
    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// All active behaviors of one concrete type.
///
/// Members live in a dense array. Removal only vacates the slot; vacated
/// slots are compacted lazily by the reverse update sweep, which swaps the
/// last element into the hole. Every member record knows its own index, so
/// removal is O(1).
#[derive(Debug)]
pub struct UpdateFamily {
    ty: BehaviorType,
    update_frozen: bool,
    stage: StageId,
    stage_slot: u32,
    members: Vec<Option<BehaviorKey>>,
}

impl UpdateFamily {
    pub(crate) fn new(ty: BehaviorType, update_frozen: bool, stage: StageId, stage_slot: u32) -> Self {
        Self {
            ty,
            update_frozen,
            stage,
            stage_slot,
            members: Vec::new(),
        }
    }

    /// The behavior type this family holds.
    #[must_use]
    pub fn behavior_type(&self) -> BehaviorType {
        self.ty
    }

    /// Whether members keep updating while their owner is frozen.
    #[must_use]
    pub fn update_frozen(&self) -> bool {
        self.update_frozen
    }

    /// The stage this family belongs to.
    #[must_use]
    pub fn stage(&self) -> StageId {
        self.stage
    }

    pub(crate) fn stage_slot(&self) -> u32 {
        self.stage_slot
    }

    /// Number of array slots, including vacated ones not yet compacted.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.members.len()
    }

    /// Number of live members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_some()).count()
    }

    /// Returns `true` if `key` currently occupies a slot.
    #[must_use]
    pub fn contains(&self, key: BehaviorKey) -> bool {
        self.members.iter().any(|m| *m == Some(key))
    }

    /// Appends `key` and records its index. No-op for members.
    pub(crate) fn add(&mut self, key: BehaviorKey, record: &mut BehaviorRecord) {
        if record.index_in_family != INVALID {
            return;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "family sizes stay far below u32::MAX"
        )]
        let index = self.members.len() as u32;
        record.index_in_family = index;
        self.members.push(Some(key));
    }

    /// Vacates the record's slot. No-op for non-members.
    pub(crate) fn remove(&mut self, record: &mut BehaviorRecord) {
        let index = record.index_in_family;
        if index == INVALID {
            return;
        }
        self.members[index as usize] = None;
        record.index_in_family = INVALID;
    }

    /// Adds or removes the record so that membership matches
    /// `!suspended && (update_frozen || !owner_frozen)`.
    pub(crate) fn filter(&mut self, key: BehaviorKey, record: &mut BehaviorRecord, owner_frozen: bool) {
        let active = !record.suspended && (self.update_frozen || !owner_frozen);
        let member = record.index_in_family != INVALID;
        if active && !member {
            self.add(key, record);
        } else if !active && member {
            self.remove(record);
        }
    }

    /// One step of the reverse update sweep.
    ///
    /// Returns the member at slot `i`. A vacated slot is filled with the last
    /// element (whose recorded index is patched) and `None` is returned; the
    /// moved element was already visited by the sweep.
    pub(crate) fn visit(
        &mut self,
        i: usize,
        records: &mut Slab<BehaviorKey, BehaviorRecord>,
    ) -> Option<BehaviorKey> {
        match self.members.get(i) {
            Some(Some(key)) => Some(*key),
            Some(None) => {
                let last = self.members.pop().flatten();
                if i < self.members.len() {
                    self.members[i] = last;
                    if let Some(moved) = last {
                        #[expect(
                            clippy::cast_possible_truncation,
                            reason = "family sizes stay far below u32::MAX"
                        )]
                        let index = i as u32;
                        records[moved].index_in_family = index;
                    }
                }
                None
            }
            None => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn members(&self) -> &[Option<BehaviorKey>] {
        &self.members
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use super::*;
    use crate::behavior::Behavior;
    use crate::scene::NodeId;
    use crate::slab::SlotKey;

    struct Probe;
    impl Behavior for Probe {}

    fn family(update_frozen: bool) -> UpdateFamily {
        UpdateFamily::new(BehaviorType::of::<Probe>(), update_frozen, StageId::EARLY, 0)
    }

    fn record(records: &mut Slab<BehaviorKey, BehaviorRecord>) -> BehaviorKey {
        records.insert(BehaviorRecord::new(
            NodeId::from_parts(0, 0),
            BehaviorType::of::<Probe>(),
            Box::new(Probe),
        ))
    }

    /// Runs a full reverse sweep, returning the visited keys.
    fn sweep(family: &mut UpdateFamily, records: &mut Slab<BehaviorKey, BehaviorRecord>) -> Vec<BehaviorKey> {
        let mut seen = Vec::new();
        let mut i = family.slot_count();
        while i > 0 {
            i -= 1;
            if let Some(key) = family.visit(i, records) {
                seen.push(key);
            }
        }
        seen
    }

    #[test]
    fn sweep_runs_in_reverse_insertion_order() {
        let mut records = Slab::new();
        let mut fam = family(false);
        let keys: Vec<_> = (0..3).map(|_| record(&mut records)).collect();
        for &k in &keys {
            fam.add(k, &mut records[k]);
        }
        assert_eq!(sweep(&mut fam, &mut records), &[keys[2], keys[1], keys[0]]);
    }

    #[test]
    fn vacated_slot_is_compacted_with_last_member() {
        let mut records = Slab::new();
        let mut fam = family(false);
        let keys: Vec<_> = (0..4).map(|_| record(&mut records)).collect();
        for &k in &keys {
            fam.add(k, &mut records[k]);
        }
        fam.remove(&mut records[keys[1]]);
        assert_eq!(records[keys[1]].index_in_family, INVALID);

        let seen = sweep(&mut fam, &mut records);
        assert_eq!(seen, &[keys[3], keys[2], keys[0]]);
        assert_eq!(fam.slot_count(), 3);
        assert_eq!(fam.members()[1], Some(keys[3]));
        assert_eq!(records[keys[3]].index_in_family, 1);
    }

    #[test]
    fn vacated_tail_is_popped() {
        let mut records = Slab::new();
        let mut fam = family(false);
        let a = record(&mut records);
        let b = record(&mut records);
        fam.add(a, &mut records[a]);
        fam.add(b, &mut records[b]);
        fam.remove(&mut records[b]);

        assert_eq!(sweep(&mut fam, &mut records), &[a]);
        assert_eq!(fam.slot_count(), 1);
    }

    #[test]
    fn filter_honors_frozen_and_suspended() {
        let mut records = Slab::new();
        let mut fam = family(false);
        let k = record(&mut records);

        fam.filter(k, &mut records[k], true);
        assert!(!fam.contains(k), "frozen owner keeps a regular family inactive");
        fam.filter(k, &mut records[k], false);
        assert!(fam.contains(k));

        records[k].suspended = true;
        fam.filter(k, &mut records[k], false);
        assert!(!fam.contains(k));

        let mut frozen_ok = family(true);
        records[k].suspended = false;
        frozen_ok.filter(k, &mut records[k], true);
        assert!(frozen_ok.contains(k), "update_frozen families ignore freezing");
    }
}
