// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. Names (stages, behavior types) are
//! stored as a `u32` length followed by UTF-8 bytes. [`decode`] reads the
//! buffer back as an iterator of [`RecordedEvent`].

use cadence_core::trace::{
    BehaviorStartedEvent, FamilyCreatedEvent, FrameBeginEvent, FrameSummary, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, StageSortedEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_STAGE_SORTED: u8 = 4;
const TAG_FRAME_SUMMARY: u8 = 5;
const TAG_FAMILY_CREATED: u8 = 6;
const TAG_BEHAVIOR_STARTED: u8 = 7;

const PHASE_START: u8 = 0;
const PHASE_STAGE: u8 = 1;
const PHASE_ANIMATION: u8 = 2;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "counts capped at u32::MAX for recording"
        )]
        self.write_u32(v.min(u32::MAX as usize) as u32);
    }

    fn write_str(&mut self, s: &str) {
        self.write_count(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_phase(&mut self, p: PhaseKind) {
        match p {
            PhaseKind::StartBehaviors => self.write_u8(PHASE_START),
            PhaseKind::Stage(stage) => {
                self.write_u8(PHASE_STAGE);
                self.write_str(stage.name());
            }
            PhaseKind::Animation => self.write_u8(PHASE_ANIMATION),
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_f32(e.delta);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_stage_sorted(&mut self, e: &StageSortedEvent) {
        self.write_u8(TAG_STAGE_SORTED);
        self.write_str(e.stage.name());
        self.write_count(e.family_count);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u32(s.behaviors_started);
        self.write_u32(s.behavior_updates);
        self.write_u32(s.animations_advanced);
    }

    fn on_family_created(&mut self, e: &FamilyCreatedEvent) {
        self.write_u8(TAG_FAMILY_CREATED);
        self.write_str(e.stage.name());
        self.write_str(e.behavior);
        self.write_u8(u8::from(e.update_frozen));
    }

    fn on_behavior_started(&mut self, e: &BehaviorStartedEvent) {
        self.write_u8(TAG_BEHAVIOR_STARTED);
        self.write_u64(e.frame_index);
        self.write_str(e.behavior);
        self.write_u32(e.owner.index());
        self.write_u32(e.owner.generation());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded frame phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedPhase {
    /// Draining the deferred-start queue.
    StartBehaviors,
    /// Updating the named stage.
    Stage(String),
    /// Advancing animations.
    Animation,
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin {
        /// Frame counter.
        frame_index: u64,
        /// Unscaled frame delta in seconds.
        delta: f32,
    },
    /// A [`PhaseBeginEvent`].
    PhaseBegin {
        /// Frame counter.
        frame_index: u64,
        /// Which phase is starting.
        phase: RecordedPhase,
    },
    /// A [`PhaseEndEvent`].
    PhaseEnd {
        /// Frame counter.
        frame_index: u64,
        /// Which phase is ending.
        phase: RecordedPhase,
    },
    /// A [`StageSortedEvent`].
    StageSorted {
        /// Stage name.
        stage: String,
        /// Number of sorted families.
        family_count: u32,
    },
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// A [`FamilyCreatedEvent`].
    FamilyCreated {
        /// Stage name.
        stage: String,
        /// Behavior type name.
        behavior: String,
        /// Whether the family updates frozen owners.
        update_frozen: bool,
    },
    /// A [`BehaviorStartedEvent`].
    BehaviorStarted {
        /// Frame counter.
        frame_index: u64,
        /// Behavior type name.
        behavior: String,
        /// Slot index of the owner node.
        owner_index: u32,
        /// Generation of the owner node.
        owner_generation: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_bytes(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.read_bytes(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.read_bytes(8)?.try_into().ok()?))
    }

    fn read_f32(&mut self) -> Option<f32> {
        Some(f32::from_le_bytes(self.read_bytes(4)?.try_into().ok()?))
    }

    fn read_string(&mut self) -> Option<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }

    fn read_phase(&mut self) -> Option<RecordedPhase> {
        Some(match self.read_u8()? {
            PHASE_START => RecordedPhase::StartBehaviors,
            PHASE_STAGE => RecordedPhase::Stage(self.read_string()?),
            PHASE_ANIMATION => RecordedPhase::Animation,
            _ => return None,
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin {
            frame_index: self.read_u64()?,
            delta: self.read_f32()?,
        })
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
        })
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
        })
    }

    fn decode_stage_sorted(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StageSorted {
            stage: self.read_string()?,
            family_count: self.read_u32()?,
        })
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            behaviors_started: self.read_u32()?,
            behavior_updates: self.read_u32()?,
            animations_advanced: self.read_u32()?,
        }))
    }

    fn decode_family_created(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FamilyCreated {
            stage: self.read_string()?,
            behavior: self.read_string()?,
            update_frozen: self.read_u8()? != 0,
        })
    }

    fn decode_behavior_started(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::BehaviorStarted {
            frame_index: self.read_u64()?,
            behavior: self.read_string()?,
            owner_index: self.read_u32()?,
            owner_generation: self.read_u32()?,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_STAGE_SORTED => self.decode_stage_sorted(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            TAG_FAMILY_CREATED => self.decode_family_created(),
            TAG_BEHAVIOR_STARTED => self.decode_behavior_started(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
