//! Presentation rules for the fatal sequence.
//!
//! Every camera, audio and UI action requested while a fatal phase is active
//! passes through [`EthicalConstraints::check`]. Denied actions are logged and
//! recorded; they never raise an error.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fatal::FatalPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAction {
    Hold,
    SlowPullBack,
    WidenToLandscape,
    Drift,
    FadeOut,
    ZoomIn,
    FollowIntoVoid,
    HoverOverhead,
    CircleStoppedBody,
    ReframeToShowBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCue {
    Wind,
    Silence,
    DistantWind,
    MountainAmbience,
    Impact,
    Scream,
    DramaticSting,
    DeathJingle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiAction {
    HideHud,
    FadeToBlack,
    ShowRouteSummary,
    ShowMountainName,
    DeathText,
    DeathIcon,
    GameOver,
}

/// Any presentation action the fatal layer can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "channel", content = "action", rename_all = "snake_case")]
pub enum Behavior {
    Camera(CameraAction),
    Audio(AudioCue),
    Ui(UiAction),
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera(action) => write!(f, "camera:{action:?}"),
            Self::Audio(cue) => write!(f, "audio:{cue:?}"),
            Self::Ui(action) => write!(f, "ui:{action:?}"),
        }
    }
}

/// Actions denied in every active phase.
pub const ALWAYS_PROHIBITED: [Behavior; 11] = [
    Behavior::Camera(CameraAction::ZoomIn),
    Behavior::Camera(CameraAction::FollowIntoVoid),
    Behavior::Camera(CameraAction::HoverOverhead),
    Behavior::Camera(CameraAction::ReframeToShowBody),
    Behavior::Audio(AudioCue::Impact),
    Behavior::Audio(AudioCue::Scream),
    Behavior::Audio(AudioCue::DramaticSting),
    Behavior::Audio(AudioCue::DeathJingle),
    Behavior::Ui(UiAction::DeathText),
    Behavior::Ui(UiAction::DeathIcon),
    Behavior::Ui(UiAction::GameOver),
];

/// Whether `behavior` may run during `phase`.
#[must_use]
pub fn is_behavior_permitted(behavior: Behavior, phase: FatalPhase) -> bool {
    if !phase.is_active() {
        return true;
    }
    if ALWAYS_PROHIBITED.contains(&behavior) {
        return false;
    }
    !(behavior == Behavior::Camera(CameraAction::CircleStoppedBody)
        && phase >= FatalPhase::Aftermath)
}

/// A denied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub behavior: Behavior,
    pub phase: FatalPhase,
}

/// Central gate with a log of everything it refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EthicalConstraints {
    violations: Vec<Violation>,
}

impl EthicalConstraints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Permission check; denials are logged and recorded.
    pub fn check(&mut self, behavior: Behavior, phase: FatalPhase) -> bool {
        if is_behavior_permitted(behavior, phase) {
            return true;
        }
        log::warn!("blocked {behavior} during {phase}");
        self.violations.push(Violation { behavior, phase });
        false
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn clear(&mut self) {
        self.violations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_is_allowed_outside_a_sequence() {
        for behavior in ALWAYS_PROHIBITED {
            assert!(is_behavior_permitted(behavior, FatalPhase::None));
        }
        assert!(is_behavior_permitted(
            Behavior::Camera(CameraAction::CircleStoppedBody),
            FatalPhase::None
        ));
    }

    #[test]
    fn circling_is_only_denied_late() {
        let circle = Behavior::Camera(CameraAction::CircleStoppedBody);
        assert!(is_behavior_permitted(circle, FatalPhase::Vanishing));
        assert!(!is_behavior_permitted(circle, FatalPhase::Aftermath));
        assert!(!is_behavior_permitted(circle, FatalPhase::Acknowledgment));
    }

    #[test]
    fn gate_records_denials_only() {
        let mut gate = EthicalConstraints::new();
        assert!(gate.check(Behavior::Camera(CameraAction::SlowPullBack), FatalPhase::Vanishing));
        assert!(!gate.check(Behavior::Audio(AudioCue::Scream), FatalPhase::LossOfControl));
        assert_eq!(
            gate.violations(),
            &[Violation {
                behavior: Behavior::Audio(AudioCue::Scream),
                phase: FatalPhase::LossOfControl,
            }]
        );
        gate.clear();
        assert!(gate.violations().is_empty());
    }
}
