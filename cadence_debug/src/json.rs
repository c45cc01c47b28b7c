// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON exporter for recorded traces.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes one JSON object per event, in recording order.

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, RecordedPhase, decode};

/// Exports recorded events as a pretty-printed JSON array.
///
/// Every object carries an `"event"` discriminant plus the event's fields.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes).map(to_json).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn phase_json(phase: &RecordedPhase) -> Value {
    match phase {
        RecordedPhase::StartBehaviors => json!({ "kind": "start" }),
        RecordedPhase::Stage(stage) => json!({ "kind": "stage", "stage": stage }),
        RecordedPhase::Animation => json!({ "kind": "animation" }),
    }
}

fn to_json(event: RecordedEvent) -> Value {
    match event {
        RecordedEvent::FrameBegin { frame_index, delta } => json!({
            "event": "FrameBegin",
            "frame_index": frame_index,
            "delta": delta,
        }),
        RecordedEvent::PhaseBegin { frame_index, phase } => json!({
            "event": "PhaseBegin",
            "frame_index": frame_index,
            "phase": phase_json(&phase),
        }),
        RecordedEvent::PhaseEnd { frame_index, phase } => json!({
            "event": "PhaseEnd",
            "frame_index": frame_index,
            "phase": phase_json(&phase),
        }),
        RecordedEvent::StageSorted {
            stage,
            family_count,
        } => json!({
            "event": "StageSorted",
            "stage": stage,
            "family_count": family_count,
        }),
        RecordedEvent::FrameSummary(s) => json!({
            "event": "FrameSummary",
            "frame_index": s.frame_index,
            "behaviors_started": s.behaviors_started,
            "behavior_updates": s.behavior_updates,
            "animations_advanced": s.animations_advanced,
        }),
        RecordedEvent::FamilyCreated {
            stage,
            behavior,
            update_frozen,
        } => json!({
            "event": "FamilyCreated",
            "stage": stage,
            "behavior": behavior,
            "update_frozen": update_frozen,
        }),
        RecordedEvent::BehaviorStarted {
            frame_index,
            behavior,
            owner_index,
            owner_generation,
        } => json!({
            "event": "BehaviorStarted",
            "frame_index": frame_index,
            "behavior": behavior,
            "owner": { "index": owner_index, "generation": owner_generation },
        }),
    }
}

#[cfg(test)]
mod tests {
    use cadence_core::StageId;
    use cadence_core::trace::{FrameSummary, PhaseBeginEvent, PhaseKind, TraceSink};

    use super::*;
    use crate::recorder::RecorderSink;

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 2,
            phase: PhaseKind::Stage(StageId::EARLY),
        });
        rec.on_frame_summary(&FrameSummary {
            frame_index: 2,
            behaviors_started: 0,
            behavior_updates: 5,
            animations_advanced: 3,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 2);

        assert_eq!(parsed[0]["event"], "PhaseBegin");
        assert_eq!(parsed[0]["phase"]["kind"], "stage");
        assert_eq!(parsed[0]["phase"]["stage"], "early");

        assert_eq!(parsed[1]["event"], "FrameSummary");
        assert_eq!(parsed[1]["behavior_updates"], 5);
        assert_eq!(parsed[1]["animations_advanced"], 3);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
