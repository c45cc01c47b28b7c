// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame behavior and animation scheduling over a mutable scene tree.
//!
//! `cadence_core` decides, every frame, which user callbacks run and in what
//! order. It is `no_std` compatible (with `alloc`) and stores nodes and
//! component records in arrays addressed by generational handles.
//!
//! # Architecture
//!
//! ```text
//!   World::update(delta)
//!       │
//!       ├─► start pending behaviors (FIFO, deferred)
//!       │
//!       ├─► for each phase of the pipeline:
//!       │       Stage(id) ──► UpdateStage (sorted families) ──► update()
//!       │       Animation ──► DepthBucketQueue (current ─► next) ──► advance()
//!       │       start pending behaviors (after stages only)
//!       │
//!       └─► FrameSummary
//!
//!   tree mutation ──► SceneTree::propagate() ──► TreeChanges
//!                                                   │
//!            depth ──► requeue animations ◄─────────┤
//!            frozen ──► refilter families, hooks ◄──┘
//! ```
//!
//! **[`scene`]** — Struct-of-arrays node tree with generational handles.
//! Local `frozen` and `speed` flags are set by the caller; depth, global
//! frozen state and effective speed are computed by propagation.
//!
//! **[`dirty`]** — Inherited dirty channels (DEPTH, FROZEN, SPEED) via
//! `understory_dirty`. Mutations mark the whole affected subtree.
//!
//! **[`behavior`]** — The [`Behavior`](behavior::Behavior) trait, per-type
//! [`UpdateFamily`](behavior::UpdateFamily) arrays, and
//! [`UpdateStage`](behavior::UpdateStage) ordering by declared
//! dependencies.
//!
//! **[`animation`]** — The [`Animation`](animation::Animation) trait and the
//! double-buffered [`DepthBucketQueue`](animation::DepthBucketQueue)
//! scheduler.
//!
//! **[`world`]** — [`World`], the driver that owns the tree and both
//! schedulers and runs every callback.
//!
//! **[`config`]** — [`WorldConfig`] and the frame pipeline.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-family
//!   and per-start events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod slab;

pub mod animation;
pub mod behavior;
pub mod config;
pub mod dirty;
pub mod error;
pub mod scene;
pub mod trace;
pub mod world;

pub use animation::{Animation, AnimationKey};
pub use behavior::{Behavior, BehaviorDescriptor, BehaviorKey, StageId};
pub use config::{Phase, WorldConfig};
pub use error::ScheduleError;
pub use scene::{NodeId, SceneTree};
pub use world::{Context, World};
