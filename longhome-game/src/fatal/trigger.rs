//! Causes of death and the ordered fatal phases.
use std::fmt;

use serde::{Deserialize, Serialize};

/// What set the fatal sequence in motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalTrigger {
    /// Collision above the lethal impact force
    Impact,
    /// Free fall beyond the lethal height
    Fall,
    /// Slide ran out onto unsurvivable terrain
    TerminalSlide,
    /// Cold exposure past the lethal limit
    Exposure,
    /// Injury load the body cannot carry
    AccumulatedInjury,
    Avalanche,
    Crevasse,
}

impl FatalTrigger {
    pub const ALL: [Self; 7] = [
        Self::Impact,
        Self::Fall,
        Self::TerminalSlide,
        Self::Exposure,
        Self::AccumulatedInjury,
        Self::Avalanche,
        Self::Crevasse,
    ];
}

impl fmt::Display for FatalTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Impact => "impact",
            Self::Fall => "fall",
            Self::TerminalSlide => "terminal_slide",
            Self::Exposure => "exposure",
            Self::AccumulatedInjury => "accumulated_injury",
            Self::Avalanche => "avalanche",
            Self::Crevasse => "crevasse",
        };
        write!(f, "{label}")
    }
}

/// Stage of the fatal sequence. `None` means no sequence is active.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum FatalPhase {
    #[default]
    None,
    MomentOfError,
    LossOfControl,
    Vanishing,
    Aftermath,
    Acknowledgment,
}

impl FatalPhase {
    /// Active phases in playback order.
    pub const SEQUENCE: [Self; 5] = [
        Self::MomentOfError,
        Self::LossOfControl,
        Self::Vanishing,
        Self::Aftermath,
        Self::Acknowledgment,
    ];

    /// The only phase that may follow this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::MomentOfError,
            Self::MomentOfError => Self::LossOfControl,
            Self::LossOfControl => Self::Vanishing,
            Self::Vanishing => Self::Aftermath,
            Self::Aftermath => Self::Acknowledgment,
            Self::Acknowledgment => Self::None,
        }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for FatalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::MomentOfError => "moment_of_error",
            Self::LossOfControl => "loss_of_control",
            Self::Vanishing => "vanishing",
            Self::Aftermath => "aftermath",
            Self::Acknowledgment => "acknowledgment",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_the_sequence_and_wraps_to_none() {
        let mut phase = FatalPhase::None;
        let mut visited = Vec::new();
        for _ in 0..5 {
            phase = phase.next();
            visited.push(phase);
        }
        assert_eq!(visited, FatalPhase::SEQUENCE.to_vec());
        assert_eq!(phase.next(), FatalPhase::None);
    }

    #[test]
    fn sequence_is_ordered() {
        assert!(FatalPhase::SEQUENCE.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(!FatalPhase::None.is_active());
        assert_eq!(FatalTrigger::TerminalSlide.to_string(), "terminal_slide");
    }
}
