// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Behavior records, the deferred-start queue, and lazy family construction.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;
use core::any::TypeId;

use super::{
    Behavior, BehaviorDescriptor, BehaviorKey, BehaviorType, FamilyId, StageId, UpdateFamily,
    UpdateStage,
};
use crate::error::{DependencyIssue, ScheduleError};
use crate::scene::{INVALID, NodeId};
use crate::slab::Slab;
#[cfg(feature = "trace-rich")]
use crate::trace::FamilyCreatedEvent;
use crate::trace::{StageSortedEvent, Tracer};

/// Scheduler-side state of one attached behavior.
pub(crate) struct BehaviorRecord {
    pub(crate) owner: NodeId,
    pub(crate) ty: BehaviorType,
    pub(crate) suspended: bool,
    /// Set while the key sits in the start queue.
    pub(crate) pending_start: bool,
    pub(crate) family: Option<FamilyId>,
    pub(crate) index_in_family: u32,
    /// `None` while a callback of this behavior is running.
    pub(crate) instance: Option<Box<dyn Behavior>>,
    /// Removed while its instance was checked out.
    pub(crate) detached: bool,
    /// Owner frozen state flipped while its instance was checked out.
    pub(crate) frozen_hook_pending: bool,
}

impl BehaviorRecord {
    pub(crate) fn new(owner: NodeId, ty: BehaviorType, instance: Box<dyn Behavior>) -> Self {
        Self {
            owner,
            ty,
            suspended: false,
            pending_start: false,
            family: None,
            index_in_family: INVALID,
            instance: Some(instance),
            detached: false,
            frozen_hook_pending: false,
        }
    }
}

impl core::fmt::Debug for BehaviorRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BehaviorRecord")
            .field("owner", &self.owner)
            .field("ty", &self.ty)
            .field("suspended", &self.suspended)
            .field("pending_start", &self.pending_start)
            .field("family", &self.family)
            .field("index_in_family", &self.index_in_family)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`BehaviorSystem::remove`].
pub(crate) enum Removal {
    /// Removed before it started; no stop callback.
    Dequeued,
    /// Removed; the caller runs the stop callback.
    Stop {
        instance: Box<dyn Behavior>,
        owner: NodeId,
    },
    /// Removed while its own callback runs; stop happens on restore.
    Deferred,
}

/// Outcome of [`BehaviorSystem::restore_instance`].
pub(crate) enum Restored {
    Kept,
    /// The behavior was removed during the callback.
    Detached {
        instance: Box<dyn Behavior>,
        owner: NodeId,
    },
}

/// Cached outcome of resolving a behavior type.
#[derive(Clone, Debug)]
enum Resolution {
    /// The type declares no stage.
    Unscheduled,
    Family(FamilyId),
    /// A declared dependency cannot be honored. Reported on every resolution.
    Invalid(ScheduleError),
}

/// Owns every behavior record, family and stage.
#[derive(Debug, Default)]
pub struct BehaviorSystem {
    records: Slab<BehaviorKey, BehaviorRecord>,
    start_queue: VecDeque<BehaviorKey>,
    pending: usize,
    families: Vec<UpdateFamily>,
    family_by_type: BTreeMap<TypeId, Resolution>,
    stages: Vec<UpdateStage>,
    stage_by_id: BTreeMap<StageId, usize>,
}

impl BehaviorSystem {
    /// Creates an empty system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached behaviors, started or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no behavior is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    /// Returns `true` if `key` refers to an attached behavior.
    #[must_use]
    pub fn contains(&self, key: BehaviorKey) -> bool {
        self.records.get(key).is_some_and(|r| !r.detached)
    }

    /// Owner of the behavior.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale.
    #[must_use]
    pub fn owner(&self, key: BehaviorKey) -> NodeId {
        self.records[key].owner
    }

    /// Concrete type of the behavior.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale.
    #[must_use]
    pub fn behavior_type(&self, key: BehaviorKey) -> BehaviorType {
        self.records[key].ty
    }

    /// Returns `true` while the behavior waits for its first start.
    #[must_use]
    pub fn is_pending(&self, key: BehaviorKey) -> bool {
        self.records.get(key).is_some_and(|r| r.pending_start)
    }

    /// Returns `true` if the behavior is currently a family member.
    #[must_use]
    pub fn is_active(&self, key: BehaviorKey) -> bool {
        self.records
            .get(key)
            .is_some_and(|r| r.index_in_family != INVALID)
    }

    /// Returns `true` if the behavior was suspended.
    #[must_use]
    pub fn is_suspended(&self, key: BehaviorKey) -> bool {
        self.records.get(key).is_some_and(|r| r.suspended)
    }

    /// Number of behaviors waiting for their first start.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// All families constructed so far, in creation order.
    #[must_use]
    pub fn families(&self) -> &[UpdateFamily] {
        &self.families
    }

    /// Looks up a family by index.
    #[must_use]
    pub fn family(&self, id: FamilyId) -> &UpdateFamily {
        &self.families[id.0 as usize]
    }

    /// The family of behavior type `B`, if one was constructed.
    #[must_use]
    pub fn family_of<B: Behavior>(&self) -> Option<&UpdateFamily> {
        match self.family_by_type.get(&TypeId::of::<B>())? {
            Resolution::Family(id) => Some(self.family(*id)),
            Resolution::Unscheduled | Resolution::Invalid(_) => None,
        }
    }

    /// Looks up a stage by tag.
    #[must_use]
    pub fn stage(&self, id: StageId) -> Option<&UpdateStage> {
        self.stage_by_id.get(&id).map(|&i| &self.stages[i])
    }

    /// Attaches a record and enqueues it for its first start.
    pub(crate) fn add(&mut self, owner: NodeId, ty: BehaviorType, instance: Box<dyn Behavior>) -> BehaviorKey {
        let mut record = BehaviorRecord::new(owner, ty, instance);
        record.pending_start = true;
        let key = self.records.insert(record);
        self.start_queue.push_back(key);
        self.pending += 1;
        key
    }

    /// Detaches a record.
    ///
    /// # Panics
    ///
    /// Panics if the key is stale or was already removed.
    pub(crate) fn remove(&mut self, key: BehaviorKey) -> Removal {
        let Self {
            records,
            families,
            pending,
            ..
        } = self;
        let record = &mut records[key];
        assert!(!record.detached, "{key:?} was already removed");

        if record.pending_start {
            // The queue entry goes stale with the key and is skipped on drain.
            *pending -= 1;
            records.remove(key);
            return Removal::Dequeued;
        }
        if let Some(family) = record.family.take() {
            families[family.0 as usize].remove(record);
        }
        match record.instance.take() {
            Some(instance) => {
                let owner = records.remove(key).owner;
                Removal::Stop { instance, owner }
            }
            None => {
                record.detached = true;
                Removal::Deferred
            }
        }
    }

    /// Pops the next behavior to start, skipping entries removed meanwhile.
    pub(crate) fn next_pending(&mut self) -> Option<BehaviorKey> {
        while let Some(key) = self.start_queue.pop_front() {
            if let Some(record) = self.records.get_mut(key)
                && record.pending_start
            {
                record.pending_start = false;
                self.pending -= 1;
                return Some(key);
            }
        }
        None
    }

    /// Resolves the record's family and files it according to `owner_frozen`.
    ///
    /// On error the behavior goes back to the front of the start queue, so
    /// the next drain fails on it again.
    pub(crate) fn assign_family(
        &mut self,
        key: BehaviorKey,
        owner_frozen: bool,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), ScheduleError> {
        let ty = self.records[key].ty;
        let family = match self.resolve_family(ty, tracer) {
            Ok(family) => family,
            Err(err) => {
                self.records[key].pending_start = true;
                self.pending += 1;
                self.start_queue.push_front(key);
                return Err(err);
            }
        };
        let Self {
            records, families, ..
        } = self;
        let record = &mut records[key];
        record.family = family;
        if let Some(family) = family {
            families[family.0 as usize].filter(key, record, owner_frozen);
        }
        Ok(())
    }

    /// Re-filters membership after the owner's frozen state flipped.
    ///
    /// Returns `true` if the caller should run the frozen hook now. When the
    /// instance is checked out the hook is queued for its restore instead.
    pub(crate) fn owner_frozen_changed(&mut self, key: BehaviorKey, owner_frozen: bool) -> bool {
        let Self {
            records, families, ..
        } = self;
        let Some(record) = records.get_mut(key) else {
            return false;
        };
        if record.pending_start || record.detached {
            return false;
        }
        if let Some(family) = record.family {
            families[family.0 as usize].filter(key, record, owner_frozen);
        }
        if record.instance.is_none() {
            record.frozen_hook_pending = true;
            return false;
        }
        true
    }

    /// Sets the suspended flag and re-filters membership.
    ///
    /// Returns `true` if the flag changed.
    pub(crate) fn set_suspended(&mut self, key: BehaviorKey, suspended: bool, owner_frozen: bool) -> bool {
        let Self {
            records, families, ..
        } = self;
        let record = &mut records[key];
        if record.suspended == suspended {
            return false;
        }
        record.suspended = suspended;
        if let Some(family) = record.family {
            families[family.0 as usize].filter(key, record, owner_frozen);
        }
        true
    }

    /// Checks out the instance for a callback.
    ///
    /// Returns `None` if the record is gone or already checked out.
    pub(crate) fn take_instance(&mut self, key: BehaviorKey) -> Option<(Box<dyn Behavior>, NodeId)> {
        let record = self.records.get_mut(key)?;
        if record.detached {
            return None;
        }
        Some((record.instance.take()?, record.owner))
    }

    /// Returns a checked-out instance to its record.
    pub(crate) fn restore_instance(&mut self, key: BehaviorKey, instance: Box<dyn Behavior>) -> Restored {
        let record = &mut self.records[key];
        if record.detached {
            let owner = self.records.remove(key).owner;
            return Restored::Detached { instance, owner };
        }
        record.instance = Some(instance);
        Restored::Kept
    }

    /// Consumes a frozen hook queued while the instance was checked out.
    pub(crate) fn take_frozen_hook(&mut self, key: BehaviorKey) -> bool {
        self.records
            .get_mut(key)
            .is_some_and(|r| core::mem::take(&mut r.frozen_hook_pending))
    }

    /// Sorts `stage` if needed and returns its index, or `None` if no family
    /// was ever assigned to it.
    pub(crate) fn prepare_stage(
        &mut self,
        stage: StageId,
        tracer: &mut Tracer<'_>,
    ) -> Result<Option<usize>, ScheduleError> {
        let Some(&index) = self.stage_by_id.get(&stage) else {
            return Ok(None);
        };
        let stage = &mut self.stages[index];
        if stage.sort()? {
            tracer.stage_sorted(&StageSortedEvent {
                stage: stage.id(),
                family_count: stage.family_count(),
            });
        }
        Ok(Some(index))
    }

    /// The `n`th family of a prepared stage in execution order.
    pub(crate) fn stage_family_at(&self, stage: usize, n: usize) -> Option<FamilyId> {
        self.stages[stage].sorted_families().get(n).copied()
    }

    pub(crate) fn family_slot_count(&self, family: FamilyId) -> usize {
        self.families[family.0 as usize].slot_count()
    }

    /// One step of a family's reverse sweep; see [`UpdateFamily::visit`].
    pub(crate) fn visit_family_slot(&mut self, family: FamilyId, i: usize) -> Option<BehaviorKey> {
        let Self {
            records, families, ..
        } = self;
        families[family.0 as usize].visit(i, records)
    }

    /// Returns the family of `ty`, building it (and, recursively, the
    /// families it depends on) on first use.
    fn resolve_family(
        &mut self,
        ty: BehaviorType,
        tracer: &mut Tracer<'_>,
    ) -> Result<Option<FamilyId>, ScheduleError> {
        match self.family_by_type.get(&ty.id()) {
            Some(Resolution::Unscheduled) => return Ok(None),
            Some(Resolution::Family(id)) => return Ok(Some(*id)),
            Some(Resolution::Invalid(err)) => return Err(err.clone()),
            None => {}
        }
        let descriptor = ty.descriptor();
        let Some(stage_id) = descriptor.stage else {
            self.family_by_type.insert(ty.id(), Resolution::Unscheduled);
            return Ok(None);
        };

        let stage = self.stage_index(stage_id);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "family counts stay far below u32::MAX"
        )]
        let id = FamilyId(self.families.len() as u32);
        let slot = self.stages[stage].add_family(id, ty.name());
        self.families.push(UpdateFamily::new(
            ty,
            descriptor.update_frozen,
            stage_id,
            slot,
        ));
        // Cached before resolving dependencies so mutual references terminate.
        self.family_by_type.insert(ty.id(), Resolution::Family(id));

        #[cfg(feature = "trace-rich")]
        tracer.family_created(&FamilyCreatedEvent {
            stage: stage_id,
            behavior: ty.name(),
            update_frozen: descriptor.update_frozen,
        });

        if let Err(err) = self.link_dependencies(ty, &descriptor, stage, slot, tracer) {
            // The family stays in its stage but never gains members.
            self.family_by_type
                .insert(ty.id(), Resolution::Invalid(err.clone()));
            return Err(err);
        }
        Ok(Some(id))
    }

    fn link_dependencies(
        &mut self,
        ty: BehaviorType,
        descriptor: &BehaviorDescriptor,
        stage: usize,
        slot: u32,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), ScheduleError> {
        let stage_id = self.stages[stage].id();
        for &dependency in &descriptor.after {
            let first = self.dependency_slot(ty, dependency, stage_id, tracer)?;
            self.stages[stage].add_dependency(first, slot);
        }
        for &dependency in &descriptor.before {
            let then = self.dependency_slot(ty, dependency, stage_id, tracer)?;
            self.stages[stage].add_dependency(slot, then);
        }
        Ok(())
    }

    fn dependency_slot(
        &mut self,
        ty: BehaviorType,
        dependency: BehaviorType,
        stage: StageId,
        tracer: &mut Tracer<'_>,
    ) -> Result<u32, ScheduleError> {
        let issue = match self.resolve_family(dependency, tracer)? {
            Some(family) => {
                let family = &self.families[family.0 as usize];
                if family.stage() == stage {
                    return Ok(family.stage_slot());
                }
                DependencyIssue::OtherStage {
                    expected: stage,
                    found: family.stage(),
                }
            }
            None => DependencyIssue::Unscheduled,
        };
        Err(ScheduleError::InvalidDependency {
            behavior: ty.name(),
            dependency: dependency.name(),
            issue,
        })
    }

    fn stage_index(&mut self, id: StageId) -> usize {
        if let Some(&index) = self.stage_by_id.get(&id) {
            return index;
        }
        let index = self.stages.len();
        self.stages.push(UpdateStage::new(id));
        self.stage_by_id.insert(id, index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slab::SlotKey;

    struct Input;
    impl Behavior for Input {
        fn descriptor() -> BehaviorDescriptor {
            BehaviorDescriptor::in_stage(StageId::EARLY)
        }
    }

    struct Physics;
    impl Behavior for Physics {
        fn descriptor() -> BehaviorDescriptor {
            BehaviorDescriptor::in_stage(StageId::EARLY)
                .after::<Steering>()
        }
    }

    struct Steering;
    impl Behavior for Steering {
        fn descriptor() -> BehaviorDescriptor {
            BehaviorDescriptor::in_stage(StageId::EARLY)
                .after::<Input>()
                .before::<Physics>()
        }
    }

    struct Idle;
    impl Behavior for Idle {}

    struct Late;
    impl Behavior for Late {
        fn descriptor() -> BehaviorDescriptor {
            BehaviorDescriptor::in_stage(StageId::LATE)
        }
    }

    struct NeedsLate;
    impl Behavior for NeedsLate {
        fn descriptor() -> BehaviorDescriptor {
            BehaviorDescriptor::in_stage(StageId::EARLY).after::<Late>()
        }
    }

    struct NeedsIdle;
    impl Behavior for NeedsIdle {
        fn descriptor() -> BehaviorDescriptor {
            BehaviorDescriptor::in_stage(StageId::EARLY).before::<Idle>()
        }
    }

    fn owner() -> NodeId {
        NodeId::from_parts(0, 0)
    }

    fn add<B: Behavior>(system: &mut BehaviorSystem, behavior: B) -> BehaviorKey {
        system.add(owner(), BehaviorType::of::<B>(), Box::new(behavior))
    }

    fn start_all(system: &mut BehaviorSystem) -> Vec<BehaviorKey> {
        let mut started = Vec::new();
        while let Some(key) = system.next_pending() {
            system
                .assign_family(key, false, &mut Tracer::none())
                .unwrap();
            started.push(key);
        }
        started
    }

    #[test]
    fn start_queue_is_fifo_and_skips_removed() {
        let mut system = BehaviorSystem::new();
        let a = add(&mut system, Input);
        let b = add(&mut system, Input);
        let c = add(&mut system, Input);
        assert_eq!(system.pending_count(), 3);

        assert!(matches!(system.remove(b), Removal::Dequeued));
        assert_eq!(system.pending_count(), 2);
        assert_eq!(start_all(&mut system), &[a, c]);
        assert_eq!(system.pending_count(), 0);
    }

    #[test]
    fn families_are_built_lazily_with_dependencies() {
        let mut system = BehaviorSystem::new();
        let _ = add(&mut system, Physics);
        start_all(&mut system);

        // Physics pulled in Steering, which pulled in Input.
        assert_eq!(system.families().len(), 3);
        assert!(system.family_of::<Input>().is_some());

        let index = system
            .prepare_stage(StageId::EARLY, &mut Tracer::none())
            .unwrap()
            .unwrap();
        let order: Vec<_> = (0..3)
            .map(|n| {
                let family = system.stage_family_at(index, n).unwrap();
                system.family(family).behavior_type()
            })
            .collect();
        assert_eq!(
            order,
            &[
                BehaviorType::of::<Input>(),
                BehaviorType::of::<Steering>(),
                BehaviorType::of::<Physics>(),
            ]
        );
    }

    #[test]
    fn unscheduled_type_gets_no_family() {
        let mut system = BehaviorSystem::new();
        let key = add(&mut system, Idle);
        start_all(&mut system);
        assert!(system.families().is_empty());
        assert!(!system.is_active(key));
        assert!(system.stage(StageId::EARLY).is_none());
    }

    #[test]
    fn cross_stage_dependency_is_rejected() {
        let mut system = BehaviorSystem::new();
        let _ = add(&mut system, NeedsLate);
        let key = system.next_pending().unwrap();
        let err = system
            .assign_family(key, false, &mut Tracer::none())
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidDependency {
                issue: DependencyIssue::OtherStage {
                    expected: StageId::EARLY,
                    found: StageId::LATE,
                },
                ..
            }
        ));
    }

    #[test]
    fn dependency_on_unscheduled_type_is_rejected() {
        let mut system = BehaviorSystem::new();
        let _ = add(&mut system, NeedsIdle);
        let key = system.next_pending().unwrap();
        let err = system
            .assign_family(key, false, &mut Tracer::none())
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidDependency {
                issue: DependencyIssue::Unscheduled,
                ..
            }
        ));
    }

    #[test]
    fn invalid_dependency_keeps_failing_and_stays_pending() {
        let mut system = BehaviorSystem::new();
        let first = add(&mut system, NeedsIdle);
        let key = system.next_pending().unwrap();
        assert_eq!(key, first);
        assert!(system.assign_family(key, false, &mut Tracer::none()).is_err());
        assert!(system.is_pending(first));
        assert_eq!(system.pending_count(), 1);
        assert!(system.family_of::<NeedsIdle>().is_none());

        let second = add(&mut system, NeedsIdle);
        let key = system.next_pending().unwrap();
        assert_eq!(key, first, "the failed behavior is retried first");
        assert!(system.assign_family(key, false, &mut Tracer::none()).is_err());

        assert!(matches!(system.remove(first), Removal::Dequeued));
        let key = system.next_pending().unwrap();
        assert_eq!(key, second);
        assert!(matches!(
            system.assign_family(key, false, &mut Tracer::none()),
            Err(ScheduleError::InvalidDependency {
                issue: DependencyIssue::Unscheduled,
                ..
            })
        ));
        assert!(!system.is_active(second));
    }

    #[test]
    fn started_behavior_removal_returns_instance() {
        let mut system = BehaviorSystem::new();
        let key = add(&mut system, Input);
        start_all(&mut system);
        assert!(system.is_active(key));

        assert!(matches!(system.remove(key), Removal::Stop { .. }));
        assert!(!system.contains(key));
        assert_eq!(system.family_of::<Input>().unwrap().member_count(), 0);
    }

    #[test]
    fn removal_during_callback_is_deferred_to_restore() {
        let mut system = BehaviorSystem::new();
        let key = add(&mut system, Input);
        start_all(&mut system);

        let (instance, _) = system.take_instance(key).unwrap();
        assert!(matches!(system.remove(key), Removal::Deferred));
        assert!(!system.contains(key));
        assert!(matches!(
            system.restore_instance(key, instance),
            Restored::Detached { .. }
        ));
        assert!(system.is_empty());
    }

    #[test]
    fn suspend_and_freeze_filter_membership() {
        let mut system = BehaviorSystem::new();
        let key = add(&mut system, Input);
        start_all(&mut system);

        assert!(system.set_suspended(key, true, false));
        assert!(!system.is_active(key));
        assert!(!system.set_suspended(key, true, false), "no-op when unchanged");
        assert!(system.set_suspended(key, false, false));
        assert!(system.is_active(key));

        assert!(system.owner_frozen_changed(key, true));
        assert!(!system.is_active(key));
        assert!(system.owner_frozen_changed(key, false));
        assert!(system.is_active(key));
    }

    #[test]
    fn frozen_change_while_checked_out_is_queued() {
        let mut system = BehaviorSystem::new();
        let key = add(&mut system, Input);
        start_all(&mut system);

        let (instance, _) = system.take_instance(key).unwrap();
        assert!(!system.owner_frozen_changed(key, true));
        assert!(!system.is_active(key), "membership updates immediately");
        assert!(matches!(system.restore_instance(key, instance), Restored::Kept));
        assert!(system.take_frozen_hook(key));
        assert!(!system.take_frozen_hook(key));
    }
}
