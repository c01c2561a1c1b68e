//! Typed notifications emitted by the descent core.
//!
//! Components push events onto a shared [`EventBus`] during a tick; consumers
//! (feedback, presentation, progress tracking) drain them after the tick in
//! the order they were emitted.

use serde::{Deserialize, Serialize};

use crate::fatal::ethics::Behavior;
use crate::fatal::{FatalPhase, FatalTrigger};
use crate::slide::{ControlLevel, SlideOutcome, SlideState};

/// Stable, deterministic identifier for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// Physics tick the event was emitted on.
    pub tick: u64,
    /// Per-tick sequence number (0-based).
    pub seq: u16,
}

impl EventId {
    #[must_use]
    pub const fn new(tick: u64, seq: u16) -> Self {
        Self { tick, seq }
    }
}

/// Severity tier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

/// Mechanical event kind with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    SlideStarted {
        entry_speed: f32,
        slope_angle: f32,
    },
    SlideUpdated {
        state: Box<SlideState>,
    },
    SlideControlChanged {
        old_level: ControlLevel,
        new_level: ControlLevel,
    },
    SlideEnded {
        outcome: SlideOutcome,
        final_speed: f32,
    },
    /// A compound slide keeps going as a new segment.
    SlideSegmentStarted {
        speed: f32,
    },
    TerminalVelocityWarning {
        speed: f32,
    },
    SlidePointOfNoReturn {
        cliff_distance: f32,
    },
    SelfArrestAttempted {
        chance: f32,
        success: bool,
    },
    ExitZoneDetected {
        distance: f32,
        quality: f32,
    },
    ExitZoneApproached {
        distance: f32,
        quality: f32,
    },
    ExitZoneEntered {
        quality: f32,
    },
    ExitZoneMissed {
        distance: f32,
        quality: f32,
    },
    NoExitsAhead,
    SpectrumLevelChanged {
        old_level: ControlLevel,
        new_level: ControlLevel,
    },
    ControlWarningStarted,
    ControlWarningEnded,
    PanicStarted,
    PanicEnded,
    CommitmentWindowOpened {
        duration: f32,
    },
    CommitmentWindowClosed,
    FatalDetected {
        trigger: FatalTrigger,
    },
    PointOfNoReturnReached {
        trigger: FatalTrigger,
    },
    PhaseStarted {
        phase: FatalPhase,
    },
    PhaseCompleted {
        phase: FatalPhase,
    },
    FatalSequenceComplete {
        trigger: FatalTrigger,
    },
    RunEndedWithFatality {
        trigger: FatalTrigger,
    },
    BehaviorDenied {
        behavior: Behavior,
        phase: FatalPhase,
    },
}

impl EventKind {
    /// Default severity tier for this kind.
    #[must_use]
    pub const fn severity(&self) -> EventSeverity {
        match self {
            Self::TerminalVelocityWarning { .. }
            | Self::ExitZoneMissed { .. }
            | Self::NoExitsAhead
            | Self::ControlWarningStarted
            | Self::PanicStarted
            | Self::BehaviorDenied { .. } => EventSeverity::Warning,
            Self::SlidePointOfNoReturn { .. }
            | Self::FatalDetected { .. }
            | Self::PointOfNoReturnReached { .. }
            | Self::FatalSequenceComplete { .. }
            | Self::RunEndedWithFatality { .. } => EventSeverity::Critical,
            _ => EventSeverity::Info,
        }
    }
}

/// Structured event stamped with its emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub severity: EventSeverity,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// In-process, single-threaded event queue.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    tick: u64,
    seq: u16,
    queue: Vec<Event>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next physics tick; sequence numbers restart at zero.
    pub const fn begin_tick(&mut self) {
        self.tick = self.tick.saturating_add(1);
        self.seq = 0;
    }

    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    pub fn emit(&mut self, kind: EventKind) {
        let id = EventId::new(self.tick, self.seq);
        self.seq = self.seq.saturating_add(1);
        self.queue.push(Event {
            id,
            severity: kind.severity(),
            kind,
        });
    }

    /// Events queued since the last drain, in emission order.
    #[must_use]
    pub fn pending(&self) -> &[Event] {
        &self.queue
    }

    /// Take every queued event, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.queue)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Count pending events matching a predicate.
    #[must_use]
    pub fn count_where(&self, predicate: impl Fn(&EventKind) -> bool) -> usize {
        self.queue.iter().filter(|event| predicate(&event.kind)).count()
    }
}
