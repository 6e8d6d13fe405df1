//! Session completeness tracking and flight-plan emission gating.
//!
//! A session collects the latest task, settings, and disabled-airspace
//! fragments. The instant all three are simultaneously present (arrival
//! order irrelevant) the session is Ready and yields a flight-plan
//! document exactly once. Later updates within the same airspace
//! generation do not re-trigger emission; a new airspace generation
//! re-arms the writer (one document per generation).

use crate::airspace::{AirspaceChunk, AirspaceChunkSet};
use crate::flightplan::FlightPlanDocument;
use crate::settings::SettingsBundle;
use crate::task::TaskCore;

/// Completeness phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    PartialAny,
    Ready,
    Written,
}

/// Aggregates the latest decoded fragment of each kind.
#[derive(Debug, Default)]
pub struct SessionState {
    task: Option<TaskCore>,
    settings: Option<SettingsBundle>,
    airspace: AirspaceChunkSet,
    /// Airspace generation a document was emitted for, if any.
    written_generation: Option<u64>,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }

    /// Replace the task atomically. Returns a document when this update
    /// made the session newly complete.
    pub fn set_task(&mut self, task: TaskCore) -> Option<FlightPlanDocument> {
        self.task = Some(task);
        self.try_emit()
    }

    /// Replace the settings bundle atomically.
    pub fn set_settings(&mut self, settings: SettingsBundle) -> Option<FlightPlanDocument> {
        self.settings = Some(settings);
        self.try_emit()
    }

    /// Feed one airspace chunk into the accumulator.
    pub fn accept_airspace_chunk(&mut self, chunk: AirspaceChunk) -> Option<FlightPlanDocument> {
        self.airspace.accept(chunk);
        self.try_emit()
    }

    pub fn task(&self) -> Option<&TaskCore> {
        self.task.as_ref()
    }

    pub fn settings(&self) -> Option<&SettingsBundle> {
        self.settings.as_ref()
    }

    pub fn airspace(&self) -> &AirspaceChunkSet {
        &self.airspace
    }

    fn is_ready(&self) -> bool {
        self.task.is_some() && self.settings.is_some() && self.airspace.is_complete()
    }

    fn written(&self) -> bool {
        self.written_generation == Some(self.airspace.generation())
    }

    pub fn phase(&self) -> SessionPhase {
        if self.written() {
            SessionPhase::Written
        } else if self.is_ready() {
            SessionPhase::Ready
        } else if self.task.is_some() || self.settings.is_some() || self.airspace.total().is_some()
        {
            SessionPhase::PartialAny
        } else {
            SessionPhase::Empty
        }
    }

    /// Emit a document on the false→true readiness transition, at most
    /// once per airspace generation.
    fn try_emit(&mut self) -> Option<FlightPlanDocument> {
        if !self.is_ready() || self.written() {
            return None;
        }
        self.written_generation = Some(self.airspace.generation());
        let task = self.task.as_ref().expect("ready implies task");
        let settings = self.settings.as_ref().expect("ready implies settings");
        Some(FlightPlanDocument::from_parts(
            task,
            settings,
            self.airspace.disabled_ids(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CLASS_UNKNOWN;
    use crate::task::Turnpoint;

    fn sample_task() -> TaskCore {
        TaskCore {
            landscape: "AA3".into(),
            turnpoints: vec![Turnpoint {
                name: "Start".into(),
                x: 1.0,
                y: 2.0,
                radius: 1000,
                angle: 90,
                altitude: 500.0,
            }],
        }
    }

    fn sample_settings() -> SettingsBundle {
        SettingsBundle {
            description: "desc".into(),
            plane_class: CLASS_UNKNOWN.into(),
            weather_zone: "Base".into(),
            options: Default::default(),
        }
    }

    fn chunk(index: u16, total: u32, ids: &[u16]) -> AirspaceChunk {
        AirspaceChunk {
            index,
            total,
            ids: ids.to_vec(),
        }
    }

    #[test]
    fn test_phase_progression() {
        let mut s = SessionState::new();
        assert_eq!(s.phase(), SessionPhase::Empty);

        assert!(s.set_task(sample_task()).is_none());
        assert_eq!(s.phase(), SessionPhase::PartialAny);

        assert!(s.set_settings(sample_settings()).is_none());
        assert_eq!(s.phase(), SessionPhase::PartialAny);

        let doc = s.accept_airspace_chunk(chunk(0, 1, &[4]));
        assert!(doc.is_some());
        assert_eq!(s.phase(), SessionPhase::Written);
        assert_eq!(doc.unwrap().disabled_airspaces, vec![4]);
    }

    #[test]
    fn test_ready_under_any_arrival_order() {
        // The completing event may be any of the three decoders.
        for order in 0..3 {
            let mut s = SessionState::new();
            let mut docs = 0;

            let mut apply = |s: &mut SessionState, step: usize| {
                let doc = match step {
                    0 => s.set_task(sample_task()),
                    1 => s.set_settings(sample_settings()),
                    _ => s.accept_airspace_chunk(chunk(0, 1, &[4])),
                };
                if doc.is_some() {
                    docs += 1;
                }
            };

            for i in 0..3 {
                apply(&mut s, (order + i) % 3);
            }
            assert_eq!(docs, 1, "order {order}");
            assert_eq!(s.phase(), SessionPhase::Written);
        }
    }

    #[test]
    fn test_no_duplicate_write() {
        let mut s = SessionState::new();
        s.set_task(sample_task());
        s.accept_airspace_chunk(chunk(0, 1, &[4]));
        assert!(s.set_settings(sample_settings()).is_some());

        // Injecting readiness again must not produce a second document.
        assert!(s.set_settings(sample_settings()).is_none());
        assert!(s.set_task(sample_task()).is_none());
        assert!(s.accept_airspace_chunk(chunk(0, 1, &[4])).is_none());
        assert_eq!(s.phase(), SessionPhase::Written);
    }

    #[test]
    fn test_new_generation_rearms_writer() {
        let mut s = SessionState::new();
        s.set_task(sample_task());
        s.set_settings(sample_settings());
        assert!(s.accept_airspace_chunk(chunk(0, 1, &[4])).is_some());

        // A differing declared total starts a new generation; once that
        // generation completes, one more document is emitted.
        assert!(s.accept_airspace_chunk(chunk(0, 2, &[5])).is_none());
        assert_eq!(s.phase(), SessionPhase::PartialAny);
        let doc = s.accept_airspace_chunk(chunk(1, 2, &[6]));
        assert!(doc.is_some());
        assert_eq!(doc.unwrap().disabled_airspaces, vec![5, 6]);
    }

    #[test]
    fn test_incomplete_airspace_blocks_ready() {
        let mut s = SessionState::new();
        s.set_task(sample_task());
        s.set_settings(sample_settings());
        assert!(s.accept_airspace_chunk(chunk(0, 3, &[1])).is_none());
        assert!(s.accept_airspace_chunk(chunk(2, 3, &[3])).is_none());
        assert_eq!(s.phase(), SessionPhase::PartialAny);
        assert!(s.accept_airspace_chunk(chunk(1, 3, &[2])).is_some());
    }
}
