// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduling errors.
//!
//! Misuse of handles (stale keys, double removal, attaching a node under
//! itself) is a programming error and panics. Errors that depend on the
//! metadata user types declare are returned as [`ScheduleError`].

use alloc::vec::Vec;
use core::fmt;

use crate::behavior::StageId;

/// Why a declared ordering dependency cannot be honored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependencyIssue {
    /// The dependency type declares no stage.
    Unscheduled,
    /// The dependency type lives in another stage.
    OtherStage {
        /// Stage of the declaring type.
        expected: StageId,
        /// Stage of the dependency.
        found: StageId,
    },
}

/// A failure to build or order the behavior schedule.
///
/// Both variants are fatal. A cycle is reported again on every update of
/// its stage, and an invalid dependency on every start drain while a
/// behavior of the declaring type is attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// The ordering edges of a stage form a cycle.
    DependencyCycle {
        /// The stage being sorted.
        stage: StageId,
        /// Type names of the families left unsorted (the cycle and
        /// everything ordered after it).
        families: Vec<&'static str>,
    },
    /// A type declared an ordering dependency that cannot be scheduled.
    InvalidDependency {
        /// Type name of the declaring behavior.
        behavior: &'static str,
        /// Type name of the dependency.
        dependency: &'static str,
        /// What is wrong with it.
        issue: DependencyIssue,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependencyCycle { stage, families } => {
                write!(f, "dependency cycle in stage `{stage}` among: ")?;
                for (i, name) in families.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(name)?;
                }
                Ok(())
            }
            Self::InvalidDependency {
                behavior,
                dependency,
                issue: DependencyIssue::Unscheduled,
            } => write!(
                f,
                "`{behavior}` depends on `{dependency}`, which is not in any stage"
            ),
            Self::InvalidDependency {
                behavior,
                dependency,
                issue: DependencyIssue::OtherStage { expected, found },
            } => write!(
                f,
                "`{behavior}` in stage `{expected}` depends on `{dependency}` in stage `{found}`"
            ),
        }
    }
}

impl core::error::Error for ScheduleError {}
