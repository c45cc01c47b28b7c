// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use cadence_core::trace::{
    BehaviorStartedEvent, FamilyCreatedEvent, FrameBeginEvent, FrameSummary, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, StageSortedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn phase_label(phase: PhaseKind) -> String {
    match phase {
        PhaseKind::StartBehaviors => "start".to_owned(),
        PhaseKind::Stage(stage) => format!("stage:{stage}"),
        PhaseKind::Animation => "animation".to_owned(),
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] frame={} delta={:.4}s",
            e.frame_index, e.delta,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame_index,
            phase_label(e.phase),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {}",
            e.frame_index,
            phase_label(e.phase),
        );
    }

    fn on_stage_sorted(&mut self, e: &StageSortedEvent) {
        let _ = writeln!(
            self.writer,
            "[sort] stage={} families={}",
            e.stage, e.family_count,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} started={} updates={} advances={}",
            s.frame_index, s.behaviors_started, s.behavior_updates, s.animations_advanced,
        );
    }

    fn on_family_created(&mut self, e: &FamilyCreatedEvent) {
        let frozen = if e.update_frozen { " update_frozen" } else { "" };
        let _ = writeln!(
            self.writer,
            "[family] stage={} type={}{frozen}",
            e.stage, e.behavior,
        );
    }

    fn on_behavior_started(&mut self, e: &BehaviorStartedEvent) {
        let _ = writeln!(
            self.writer,
            "[start] frame={} type={} owner={:?}",
            e.frame_index, e.behavior, e.owner,
        );
    }
}

#[cfg(test)]
mod tests {
    use cadence_core::StageId;

    use super::*;

    #[test]
    fn pretty_print_phases() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 3,
            phase: PhaseKind::Stage(StageId::LATE),
        });
        sink.on_phase_end(&PhaseEndEvent {
            frame_index: 3,
            phase: PhaseKind::Animation,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[phase:begin] frame=3 stage:late"), "got: {output}");
        assert!(output.contains("[phase:end] frame=3 animation"), "got: {output}");
    }

    #[test]
    fn pretty_print_summary() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_summary(&FrameSummary {
            frame_index: 9,
            behaviors_started: 1,
            behavior_updates: 12,
            animations_advanced: 4,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "[summary] frame=9 started=1 updates=12 advances=4\n"
        );
    }
}
