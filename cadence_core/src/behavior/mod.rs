// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Behavior components and their stage scheduler.
//!
//! A *behavior* is a user type implementing [`Behavior`] attached to a scene
//! node. All live behaviors of one concrete type form an [`UpdateFamily`];
//! families are grouped into named [`UpdateStage`]s, and inside a stage they
//! run in a topological order derived from the `after`/`before` relations in
//! each type's [`BehaviorDescriptor`].
//!
//! Newly attached behaviors are not started immediately. They wait in a FIFO
//! queue until the next start drain, where their family is resolved, their
//! membership is filtered against the owner's frozen state, and
//! [`Behavior::start`] runs exactly once.

mod family;
mod stage;
mod system;

use alloc::vec::Vec;
use core::any::{TypeId, type_name};
use core::fmt;

pub use family::{FamilyId, UpdateFamily};
pub use stage::UpdateStage;
pub use system::BehaviorSystem;

pub(crate) use system::{Removal, Restored};

use crate::scene::NodeId;
use crate::slab::slot_key;
use crate::world::Context;

slot_key! {
    /// A handle to a behavior attached through a [`World`](crate::World).
    BehaviorKey
}

/// Opaque tag naming an update stage.
///
/// Stages are created on first use. The predefined tags are the ones the
/// default [`WorldConfig`](crate::WorldConfig) pipeline runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub &'static str);

impl StageId {
    /// Runs first in the frame.
    pub const PRE_EARLY: Self = Self("pre_early");
    /// Early update.
    pub const EARLY: Self = Self("early");
    /// Runs after [`EARLY`](Self::EARLY), before animations advance.
    pub const POST_EARLY: Self = Self("post_early");
    /// Runs right after animations advance.
    pub const AFTER_ANIMATION: Self = Self("after_animation");
    /// Runs before [`LATE`](Self::LATE).
    pub const PRE_LATE: Self = Self("pre_late");
    /// Late update.
    pub const LATE: Self = Self("late");
    /// Runs after [`LATE`](Self::LATE).
    pub const POST_LATE: Self = Self("post_late");
    /// Runs last in the frame.
    pub const POST_POST_LATE: Self = Self("post_post_late");

    /// Returns the tag's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A per-node component with ordered, per-stage update semantics.
///
/// Every callback receives a [`Context`] through which the behavior may
/// mutate the world: attach or detach components, restructure the tree,
/// freeze nodes. Those effects are immediate; see the crate docs for how
/// they interact with the iteration in progress.
pub trait Behavior: 'static {
    /// Declares the scheduling metadata of this type.
    ///
    /// Read once, the first time a behavior of this type is started. The
    /// default declares no stage, so `update` is never called.
    fn descriptor() -> BehaviorDescriptor
    where
        Self: Sized,
    {
        BehaviorDescriptor::unscheduled()
    }

    /// Called once, at the first start drain after the behavior was added.
    fn start(&mut self, cx: &mut Context<'_>) {
        _ = cx;
    }

    /// Called every frame while the behavior is an active family member.
    ///
    /// `delta` is already scaled by the owner's effective speed.
    fn update(&mut self, cx: &mut Context<'_>, delta: f32) {
        _ = (cx, delta);
    }

    /// Called after the behavior was removed from `owner`.
    ///
    /// Not called for behaviors removed before they were started.
    fn stop(&mut self, cx: &mut Context<'_>, owner: NodeId) {
        _ = (cx, owner);
    }

    /// Called when the globally-frozen state of the owner flips.
    fn on_owner_frozen_changed(&mut self, cx: &mut Context<'_>) {
        _ = cx;
    }
}

/// Runtime identity of a [`Behavior`] type, with access to its descriptor.
#[derive(Clone, Copy)]
pub struct BehaviorType {
    id: TypeId,
    name: &'static str,
    descriptor: fn() -> BehaviorDescriptor,
}

impl BehaviorType {
    /// Returns the identity of `B`.
    #[must_use]
    pub fn of<B: Behavior>() -> Self {
        Self {
            id: TypeId::of::<B>(),
            name: type_name::<B>(),
            descriptor: B::descriptor,
        }
    }

    /// Returns the [`TypeId`] of the behavior type.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the Rust type name of the behavior type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Evaluates the type's [`Behavior::descriptor`].
    #[must_use]
    pub fn descriptor(&self) -> BehaviorDescriptor {
        (self.descriptor)()
    }
}

impl PartialEq for BehaviorType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BehaviorType {}

impl fmt::Debug for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BehaviorType({})", self.name)
    }
}

/// Scheduling metadata of a behavior type.
///
/// ```rust,ignore
/// impl Behavior for Steering {
///     fn descriptor() -> BehaviorDescriptor {
///         BehaviorDescriptor::in_stage(StageId::EARLY)
///             .after::<Input>()
///             .before::<Physics>()
///     }
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct BehaviorDescriptor {
    /// Stage the type's family belongs to; `None` means never updated.
    pub stage: Option<StageId>,
    /// Keep updating while the owner is globally frozen.
    pub update_frozen: bool,
    /// Types whose families must update earlier in the same stage.
    pub after: Vec<BehaviorType>,
    /// Types whose families must update later in the same stage.
    pub before: Vec<BehaviorType>,
}

impl BehaviorDescriptor {
    /// A descriptor without a stage.
    #[must_use]
    pub const fn unscheduled() -> Self {
        Self {
            stage: None,
            update_frozen: false,
            after: Vec::new(),
            before: Vec::new(),
        }
    }

    /// A descriptor placing the type in `stage`.
    #[must_use]
    pub const fn in_stage(stage: StageId) -> Self {
        Self {
            stage: Some(stage),
            update_frozen: false,
            after: Vec::new(),
            before: Vec::new(),
        }
    }

    /// Keeps the family updating while owners are frozen.
    #[must_use]
    pub fn update_frozen(mut self) -> Self {
        self.update_frozen = true;
        self
    }

    /// Requires `B`'s family to update before this one.
    #[must_use]
    pub fn after<B: Behavior>(mut self) -> Self {
        self.after.push(BehaviorType::of::<B>());
        self
    }

    /// Requires `B`'s family to update after this one.
    #[must_use]
    pub fn before<B: Behavior>(mut self) -> Self {
        self.before.push(BehaviorType::of::<B>());
        self
    }
}
