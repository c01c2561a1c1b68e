//! Persisted mountain progress counters.
//!
//! Only these counters are saved. A live slide or fatal sequence is never a
//! valid save point.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::EventKind;
use crate::slide::SlideOutcome;

/// Reasons a progress snapshot cannot be taken.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveError {
    #[error("cannot save while a slide is in progress")]
    SlideInProgress,
    #[error("cannot save while a fatal sequence is playing")]
    FatalSequenceActive,
    #[error("progress storage failed: {message}")]
    Storage { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MountainProgress {
    pub mountain: String,
    pub slides_started: u32,
    pub slides_survived: u32,
    pub clean_stops: u32,
    pub tumble_stops: u32,
    pub terrain_catches: u32,
    pub compound_segments: u32,
    pub terminal_runouts: u32,
    pub self_arrests_attempted: u32,
    pub self_arrests_succeeded: u32,
    pub injuries_sustained: u32,
    pub fatalities: u32,
    pub distance_slid: f32,
    pub top_speed: f32,
}

impl MountainProgress {
    #[must_use]
    pub fn new(mountain: &str) -> Self {
        Self {
            mountain: mountain.to_string(),
            ..Self::default()
        }
    }

    /// Fold one core event into the counters.
    pub fn record_event(&mut self, kind: &EventKind) {
        match kind {
            EventKind::SlideStarted { entry_speed, .. } => {
                self.slides_started = self.slides_started.saturating_add(1);
                self.top_speed = self.top_speed.max(*entry_speed);
            }
            EventKind::SlideUpdated { state } => {
                self.top_speed = self.top_speed.max(state.speed);
            }
            EventKind::SlideSegmentStarted { .. } => {
                self.compound_segments = self.compound_segments.saturating_add(1);
            }
            EventKind::SlideEnded { outcome, .. } => self.record_outcome(*outcome),
            EventKind::SelfArrestAttempted { success, .. } => {
                self.self_arrests_attempted = self.self_arrests_attempted.saturating_add(1);
                if *success {
                    self.self_arrests_succeeded = self.self_arrests_succeeded.saturating_add(1);
                }
            }
            EventKind::RunEndedWithFatality { .. } => {
                self.fatalities = self.fatalities.saturating_add(1);
            }
            _ => {}
        }
    }

    fn record_outcome(&mut self, outcome: SlideOutcome) {
        let counter = match outcome {
            SlideOutcome::CleanStop => &mut self.clean_stops,
            SlideOutcome::TumbleStop => &mut self.tumble_stops,
            SlideOutcome::TerrainCatch => &mut self.terrain_catches,
            SlideOutcome::CompoundSlide => &mut self.compound_segments,
            SlideOutcome::TerminalRunout => &mut self.terminal_runouts,
        };
        *counter = counter.saturating_add(1);
        if outcome.is_survivable() {
            self.slides_survived = self.slides_survived.saturating_add(1);
        }
    }

    pub fn record_injuries(&mut self, count: usize) {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.injuries_sustained = self.injuries_sustained.saturating_add(count);
    }

    pub fn record_slide_distance(&mut self, distance: f32) {
        if distance.is_finite() && distance > 0.0 {
            self.distance_slid += distance;
        }
    }
}
