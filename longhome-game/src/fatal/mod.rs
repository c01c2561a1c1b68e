//! Fatal-event sequencing.
//!
//! Once triggered, a sequence owns one trigger and walks
//! `MomentOfError → LossOfControl → Vanishing → Aftermath → Acknowledgment`
//! on fixed durations, then returns to `None`. Phases never repeat or skip.
pub mod detector;
pub mod ethics;
pub mod phases;
pub mod trigger;

pub use detector::FatalityDetector;
pub use ethics::{Behavior, EthicalConstraints, Violation, is_behavior_permitted};
pub use phases::{FatalPhaseHandler, InstructionTarget, PresentationInstruction};
pub use trigger::{FatalPhase, FatalTrigger};

use crate::config::FatalConfig;
use crate::constants::PHASE_EPSILON;
use crate::events::{EventBus, EventKind};
use crate::numbers::finite_or_zero;

#[derive(Debug, Clone, PartialEq)]
pub struct FatalEventManager {
    cfg: FatalConfig,
    phase: FatalPhase,
    trigger: Option<FatalTrigger>,
    phase_elapsed: f32,
    handler: FatalPhaseHandler,
    ethics: EthicalConstraints,
    instructions: Vec<PresentationInstruction>,
    point_of_no_return: Option<FatalTrigger>,
    completed: u32,
}

impl FatalEventManager {
    #[must_use]
    pub fn new(cfg: FatalConfig) -> Self {
        Self {
            cfg,
            phase: FatalPhase::None,
            trigger: None,
            phase_elapsed: 0.0,
            handler: FatalPhaseHandler,
            ethics: EthicalConstraints::new(),
            instructions: Vec::new(),
            point_of_no_return: None,
            completed: 0,
        }
    }

    /// Single entry point for starting a sequence.
    ///
    /// Returns `false` (and changes nothing) while a sequence is already active.
    pub fn trigger(&mut self, trigger: FatalTrigger, bus: &mut EventBus) -> bool {
        if self.phase.is_active() {
            log::warn!(
                "fatal trigger {trigger} ignored: sequence for {:?} already in {}",
                self.trigger,
                self.phase
            );
            return false;
        }
        log::debug!("fatal sequence started by {trigger}");
        self.trigger = Some(trigger);
        bus.emit(EventKind::FatalDetected { trigger });
        self.enter(FatalPhase::MomentOfError, bus);
        true
    }

    /// Advance phase timers.
    pub fn update(&mut self, dt: f32, bus: &mut EventBus) {
        if !self.phase.is_active() {
            return;
        }
        self.phase_elapsed += finite_or_zero(dt).max(0.0);
        while self.phase.is_active() {
            let duration = self.cfg.duration(self.phase);
            if self.phase_elapsed + PHASE_EPSILON < duration {
                break;
            }
            let overflow = (self.phase_elapsed - duration).max(0.0);
            self.advance(bus);
            if self.phase.is_active() {
                self.phase_elapsed = overflow;
            }
        }
    }

    /// Request an early move to `target`; only the immediate successor is accepted.
    pub fn request_phase(&mut self, target: FatalPhase, bus: &mut EventBus) -> bool {
        if !self.phase.is_active() || target != self.phase.next() {
            log::warn!("phase request {} rejected from {}", target, self.phase);
            return false;
        }
        self.advance(bus);
        self.phase_elapsed = 0.0;
        true
    }

    fn advance(&mut self, bus: &mut EventBus) {
        let finished = self.phase;
        bus.emit(EventKind::PhaseCompleted { phase: finished });
        let next = finished.next();
        if next.is_active() {
            self.enter(next, bus);
        } else {
            self.finish(bus);
        }
    }

    fn enter(&mut self, phase: FatalPhase, bus: &mut EventBus) {
        log::debug!("fatal phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.phase_elapsed = 0.0;
        bus.emit(EventKind::PhaseStarted { phase });
        let Some(trigger) = self.trigger else {
            return;
        };
        let duration = self.cfg.duration(phase);
        for instruction in self.handler.instructions(phase, trigger, duration) {
            self.submit(instruction, bus);
        }
    }

    fn finish(&mut self, bus: &mut EventBus) {
        self.phase = FatalPhase::None;
        self.phase_elapsed = 0.0;
        self.point_of_no_return = None;
        self.completed = self.completed.saturating_add(1);
        if let Some(trigger) = self.trigger.take() {
            log::debug!("fatal sequence for {trigger} complete");
            bus.emit(EventKind::FatalSequenceComplete { trigger });
            bus.emit(EventKind::RunEndedWithFatality { trigger });
        }
    }

    fn submit(&mut self, instruction: PresentationInstruction, bus: &mut EventBus) {
        if self.request_behavior(instruction.behavior, bus) {
            self.instructions.push(instruction);
        }
    }

    /// Permission gate for any presentation action from outside the script.
    pub fn request_behavior(&mut self, behavior: Behavior, bus: &mut EventBus) -> bool {
        if self.ethics.check(behavior, self.phase) {
            return true;
        }
        bus.emit(EventKind::BehaviorDenied {
            behavior,
            phase: self.phase,
        });
        false
    }

    /// Queue a gated instruction built outside the phase scripts.
    pub fn submit_instruction(
        &mut self,
        instruction: PresentationInstruction,
        bus: &mut EventBus,
    ) -> bool {
        let allowed = self.request_behavior(instruction.behavior, bus);
        if allowed {
            self.instructions.push(instruction);
        }
        allowed
    }

    /// Record a predicted fatality and queue an anticipatory fade.
    ///
    /// Informational only: phases do not change.
    pub fn notify_point_of_no_return(&mut self, trigger: FatalTrigger) {
        if self.phase.is_active() || self.point_of_no_return.is_some() {
            return;
        }
        self.point_of_no_return = Some(trigger);
        self.instructions.push(self.handler.anticipation(trigger));
    }

    /// Forget a prediction whose danger passed; the next one fades in again.
    pub fn clear_point_of_no_return(&mut self) -> bool {
        if self.phase.is_active() {
            return false;
        }
        self.point_of_no_return.take().is_some()
    }

    /// Drop the active sequence without emitting completion, e.g. for a save.
    pub fn abort(&mut self) -> bool {
        if !self.phase.is_active() {
            return false;
        }
        log::debug!("fatal sequence aborted in {}", self.phase);
        self.phase = FatalPhase::None;
        self.phase_elapsed = 0.0;
        self.trigger = None;
        self.point_of_no_return = None;
        self.instructions.clear();
        true
    }

    pub fn drain_instructions(&mut self) -> Vec<PresentationInstruction> {
        std::mem::take(&mut self.instructions)
    }

    #[must_use]
    pub const fn phase(&self) -> FatalPhase {
        self.phase
    }

    #[must_use]
    pub const fn active_trigger(&self) -> Option<FatalTrigger> {
        self.trigger
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    #[must_use]
    pub const fn phase_elapsed(&self) -> f32 {
        self.phase_elapsed
    }

    #[must_use]
    pub const fn point_of_no_return(&self) -> Option<FatalTrigger> {
        self.point_of_no_return
    }

    #[must_use]
    pub const fn completed_sequences(&self) -> u32 {
        self.completed
    }

    #[must_use]
    pub const fn ethics(&self) -> &EthicalConstraints {
        &self.ethics
    }
}
