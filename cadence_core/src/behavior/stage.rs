// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordering of families inside one stage.

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

use super::{FamilyId, StageId};
use crate::error::ScheduleError;

/// A named phase: a set of families plus "runs before" edges between them.
///
/// The execution order is a topological sort of those edges, cached until a
/// family or an edge is added. Families without constraints keep their
/// insertion order relative to each other.
#[derive(Debug)]
pub struct UpdateStage {
    id: StageId,
    families: Vec<FamilyId>,
    names: Vec<&'static str>,
    /// `successors[i]` lists the stage slots that must run after slot `i`.
    successors: Vec<Vec<u32>>,
    sorted: Vec<FamilyId>,
    needs_sort: bool,
}

impl UpdateStage {
    pub(crate) fn new(id: StageId) -> Self {
        Self {
            id,
            families: Vec::new(),
            names: Vec::new(),
            successors: Vec::new(),
            sorted: Vec::new(),
            needs_sort: false,
        }
    }

    /// The stage's tag.
    #[must_use]
    pub fn id(&self) -> StageId {
        self.id
    }

    /// Number of families assigned to the stage.
    #[must_use]
    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    /// Returns `true` if the cached order is up to date.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        !self.needs_sort
    }

    /// The last computed execution order.
    ///
    /// Empty until the stage has been updated once.
    #[must_use]
    pub fn sorted_families(&self) -> &[FamilyId] {
        &self.sorted
    }

    /// Registers a family and returns its slot within the stage.
    pub(crate) fn add_family(&mut self, family: FamilyId, name: &'static str) -> u32 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "stage sizes stay far below u32::MAX"
        )]
        let slot = self.families.len() as u32;
        self.families.push(family);
        self.names.push(name);
        self.successors.push(Vec::new());
        self.needs_sort = true;
        slot
    }

    /// Records that slot `first` must run before slot `then`.
    ///
    /// # Panics
    ///
    /// Panics if either slot is out of range.
    pub(crate) fn add_dependency(&mut self, first: u32, then: u32) {
        assert!(
            (first as usize) < self.families.len() && (then as usize) < self.families.len(),
            "stage slot out of range: {first} -> {then}"
        );
        self.successors[first as usize].push(then);
        self.needs_sort = true;
    }

    /// Recomputes the order if it is stale.
    ///
    /// Returns `Ok(true)` when a sort actually ran. On a cycle the stage
    /// stays unsorted, so every later update reports the cycle again.
    pub(crate) fn sort(&mut self) -> Result<bool, ScheduleError> {
        if !self.needs_sort {
            return Ok(false);
        }
        self.sorted.clear();

        let n = self.families.len();
        let mut in_degree = vec![0_u32; n];
        for edges in &self.successors {
            for &to in edges {
                in_degree[to as usize] += 1;
            }
        }

        let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        while let Some(slot) = ready.pop_front() {
            self.sorted.push(self.families[slot]);
            for &to in &self.successors[slot] {
                let d = &mut in_degree[to as usize];
                *d -= 1;
                if *d == 0 {
                    ready.push_back(to as usize);
                }
            }
        }

        if self.sorted.len() < n {
            let families = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.names[i])
                .collect();
            self.sorted.clear();
            return Err(ScheduleError::DependencyCycle {
                stage: self.id,
                families,
            });
        }

        self.needs_sort = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_with(n: u32) -> UpdateStage {
        let mut stage = UpdateStage::new(StageId::EARLY);
        for (i, name) in ["a", "b", "c", "d"].into_iter().take(n as usize).enumerate() {
            #[expect(clippy::cast_possible_truncation, reason = "test sizes are tiny")]
            let slot = stage.add_family(FamilyId(i as u32), name);
            assert_eq!(slot as usize, i, "slots are handed out in order");
        }
        stage
    }

    #[test]
    fn unconstrained_families_keep_insertion_order() {
        let mut stage = stage_with(3);
        assert_eq!(stage.sort(), Ok(true));
        assert_eq!(stage.sorted_families(), &[FamilyId(0), FamilyId(1), FamilyId(2)]);
        assert_eq!(stage.sort(), Ok(false), "second sort is cached");
    }

    #[test]
    fn edges_reorder_families() {
        let mut stage = stage_with(3);
        // c before a, b before c.
        stage.add_dependency(2, 0);
        stage.add_dependency(1, 2);
        stage.sort().unwrap();
        assert_eq!(stage.sorted_families(), &[FamilyId(1), FamilyId(2), FamilyId(0)]);
    }

    #[test]
    fn adding_an_edge_invalidates_the_cache() {
        let mut stage = stage_with(2);
        stage.sort().unwrap();
        assert!(stage.is_sorted());
        stage.add_dependency(1, 0);
        assert!(!stage.is_sorted());
        stage.sort().unwrap();
        assert_eq!(stage.sorted_families(), &[FamilyId(1), FamilyId(0)]);
    }

    #[test]
    fn cycle_is_reported_and_sticky() {
        let mut stage = stage_with(3);
        stage.add_dependency(0, 1);
        stage.add_dependency(1, 0);

        let err = stage.sort().unwrap_err();
        assert_eq!(
            err,
            ScheduleError::DependencyCycle {
                stage: StageId::EARLY,
                families: vec!["a", "b"],
            }
        );
        assert!(!stage.is_sorted());
        assert!(stage.sort().is_err(), "cycle must be reported again");
    }
}
