// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame pipeline configuration.

use crate::behavior::StageId;

/// One step of the frame pipeline run by [`World::update`](crate::World::update).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Update every family of the stage in dependency order.
    Stage(StageId),
    /// Advance running animations in depth order.
    Animation,
}

/// Configuration for a [`World`](crate::World).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldConfig {
    /// Initial bucket count of both animation depth queues.
    ///
    /// Queues grow on demand, so this only avoids early reallocation.
    pub initial_depth_buckets: u32,
    /// Phases run by each frame, in order. Pending behaviors are started
    /// before the first phase and after every stage phase.
    pub pipeline: &'static [Phase],
}

impl WorldConfig {
    /// The stage and animation order of a regular frame.
    pub const DEFAULT_PIPELINE: &'static [Phase] = &[
        Phase::Stage(StageId::PRE_EARLY),
        Phase::Stage(StageId::EARLY),
        Phase::Stage(StageId::POST_EARLY),
        Phase::Animation,
        Phase::Stage(StageId::AFTER_ANIMATION),
        Phase::Stage(StageId::PRE_LATE),
        Phase::Stage(StageId::LATE),
        Phase::Stage(StageId::POST_LATE),
        Phase::Stage(StageId::POST_POST_LATE),
    ];

    /// Default configuration.
    pub const DEFAULT: Self = Self::new();

    /// Default configuration: [`DEFAULT_PIPELINE`](Self::DEFAULT_PIPELINE)
    /// and 16 depth buckets.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_depth_buckets: 16,
            pipeline: Self::DEFAULT_PIPELINE,
        }
    }

    /// Replaces the pipeline.
    #[must_use]
    pub const fn with_pipeline(mut self, pipeline: &'static [Phase]) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Replaces the initial depth bucket count.
    #[must_use]
    pub const fn with_depth_buckets(mut self, buckets: u32) -> Self {
        self.initial_depth_buckets = buckets;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::new()
    }
}
