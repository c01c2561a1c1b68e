//! Per-phase presentation scripts.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fatal::ethics::{AudioCue, Behavior, CameraAction, UiAction};
use crate::fatal::{FatalPhase, FatalTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionTarget {
    Subject,
    /// Where the subject was last seen.
    LastPosition,
    Landscape,
    Ambience,
    Screen,
}

/// One camera/audio/UI instruction for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationInstruction {
    pub behavior: Behavior,
    pub target: InstructionTarget,
    pub duration: f32,
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
}

impl PresentationInstruction {
    #[must_use]
    pub fn new(behavior: Behavior, target: InstructionTarget, duration: f32) -> Self {
        Self {
            behavior,
            target,
            duration,
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: &str, value: f32) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }
}

/// Builds the scripted instructions for each phase of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatalPhaseHandler;

impl FatalPhaseHandler {
    /// The subject leaves frame over an edge; the camera stays behind.
    const fn leaves_frame(trigger: FatalTrigger) -> bool {
        matches!(
            trigger,
            FatalTrigger::Fall | FatalTrigger::TerminalSlide | FatalTrigger::Crevasse
        )
    }

    #[must_use]
    pub fn instructions(
        &self,
        phase: FatalPhase,
        trigger: FatalTrigger,
        duration: f32,
    ) -> Vec<PresentationInstruction> {
        use InstructionTarget::{Ambience, Landscape, LastPosition, Screen, Subject};

        match phase {
            FatalPhase::None => Vec::new(),
            FatalPhase::MomentOfError => {
                let wind = if trigger == FatalTrigger::Exposure { 0.4 } else { 0.7 };
                vec![
                    PresentationInstruction::new(
                        Behavior::Camera(CameraAction::Hold),
                        Subject,
                        duration,
                    )
                    .with_param("time_scale", 0.85),
                    PresentationInstruction::new(
                        Behavior::Audio(AudioCue::Wind),
                        Ambience,
                        duration,
                    )
                    .with_param("volume", wind),
                ]
            }
            FatalPhase::LossOfControl => vec![
                PresentationInstruction::new(
                    Behavior::Camera(CameraAction::SlowPullBack),
                    Subject,
                    duration,
                )
                .with_param("distance", 6.0),
                PresentationInstruction::new(Behavior::Audio(AudioCue::Wind), Ambience, duration)
                    .with_param("volume", 1.0),
                PresentationInstruction::new(Behavior::Ui(UiAction::HideHud), Screen, 0.5),
            ],
            FatalPhase::Vanishing => {
                let camera = if Self::leaves_frame(trigger) {
                    PresentationInstruction::new(
                        Behavior::Camera(CameraAction::Hold),
                        LastPosition,
                        duration,
                    )
                } else {
                    PresentationInstruction::new(
                        Behavior::Camera(CameraAction::WidenToLandscape),
                        Landscape,
                        duration,
                    )
                    .with_param("fov_delta", 15.0)
                };
                vec![
                    camera,
                    PresentationInstruction::new(
                        Behavior::Audio(AudioCue::Silence),
                        Ambience,
                        duration,
                    )
                    .with_param("fade", 1.5),
                ]
            }
            FatalPhase::Aftermath => vec![
                PresentationInstruction::new(
                    Behavior::Camera(CameraAction::Drift),
                    Landscape,
                    duration,
                )
                .with_param("speed", 0.2),
                PresentationInstruction::new(
                    Behavior::Audio(AudioCue::DistantWind),
                    Ambience,
                    duration,
                )
                .with_param("volume", 0.3),
            ],
            FatalPhase::Acknowledgment => vec![
                PresentationInstruction::new(
                    Behavior::Ui(UiAction::ShowMountainName),
                    Screen,
                    duration,
                ),
                PresentationInstruction::new(
                    Behavior::Ui(UiAction::ShowRouteSummary),
                    Screen,
                    duration,
                ),
                PresentationInstruction::new(
                    Behavior::Audio(AudioCue::MountainAmbience),
                    Ambience,
                    duration,
                ),
                PresentationInstruction::new(
                    Behavior::Camera(CameraAction::FadeOut),
                    Landscape,
                    duration,
                ),
                PresentationInstruction::new(Behavior::Ui(UiAction::FadeToBlack), Screen, 1.0),
            ],
        }
    }

    /// Non-committal anticipation before any trigger fires.
    #[must_use]
    pub fn anticipation(&self, trigger: FatalTrigger) -> PresentationInstruction {
        let pull_back = if Self::leaves_frame(trigger) { 3.0 } else { 1.5 };
        PresentationInstruction::new(
            Behavior::Camera(CameraAction::SlowPullBack),
            InstructionTarget::Subject,
            1.0,
        )
        .with_param("distance", pull_back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fatal::ethics::is_behavior_permitted;

    #[test]
    fn scripts_pass_the_gate_for_every_trigger() {
        let handler = FatalPhaseHandler;
        for trigger in FatalTrigger::ALL {
            for phase in FatalPhase::SEQUENCE {
                let script = handler.instructions(phase, trigger, 2.0);
                assert!(!script.is_empty());
                for instruction in script {
                    assert!(
                        is_behavior_permitted(instruction.behavior, phase),
                        "{trigger} {phase} {}",
                        instruction.behavior
                    );
                }
            }
        }
    }

    #[test]
    fn camera_stays_behind_when_subject_drops_away() {
        let script = FatalPhaseHandler.instructions(FatalPhase::Vanishing, FatalTrigger::Fall, 3.0);
        assert_eq!(script[0].target, InstructionTarget::LastPosition);
        let script =
            FatalPhaseHandler.instructions(FatalPhase::Vanishing, FatalTrigger::Exposure, 3.0);
        assert_eq!(script[0].behavior, Behavior::Camera(CameraAction::WidenToLandscape));
    }
}
