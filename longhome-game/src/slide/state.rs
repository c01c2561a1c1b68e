//! Live slide record and its classifications.
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONTROLLED_THRESHOLD, FAR_CLIFF_DISTANCE, MARGINAL_THRESHOLD, NO_EXIT_DISTANCE,
    UNSTABLE_THRESHOLD,
};
use crate::numbers::finite_or_zero;
use crate::terrain::SurfaceType;

/// Four-band control spectrum, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ControlLevel {
    #[default]
    Controlled,
    Marginal,
    Unstable,
    Lost,
}

impl ControlLevel {
    /// Classify a control value; non-finite input counts as zero.
    #[must_use]
    pub fn from_control(control: f32) -> Self {
        let control = finite_or_zero(control);
        if control >= CONTROLLED_THRESHOLD {
            Self::Controlled
        } else if control >= MARGINAL_THRESHOLD {
            Self::Marginal
        } else if control >= UNSTABLE_THRESHOLD {
            Self::Unstable
        } else {
            Self::Lost
        }
    }

    /// Control range `[lower, upper)` covered by this band.
    #[must_use]
    pub const fn bounds(self) -> (f32, f32) {
        match self {
            Self::Controlled => (CONTROLLED_THRESHOLD, 1.0),
            Self::Marginal => (MARGINAL_THRESHOLD, CONTROLLED_THRESHOLD),
            Self::Unstable => (UNSTABLE_THRESHOLD, MARGINAL_THRESHOLD),
            Self::Lost => (0.0, UNSTABLE_THRESHOLD),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Controlled => "controlled",
            Self::Marginal => "marginal",
            Self::Unstable => "unstable",
            Self::Lost => "lost",
        }
    }
}

/// How a slide ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideOutcome {
    CleanStop,
    TumbleStop,
    TerrainCatch,
    CompoundSlide,
    TerminalRunout,
}

impl SlideOutcome {
    pub const ALL: [Self; 5] = [
        Self::CleanStop,
        Self::TumbleStop,
        Self::TerrainCatch,
        Self::CompoundSlide,
        Self::TerminalRunout,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CleanStop => "clean_stop",
            Self::TumbleStop => "tumble_stop",
            Self::TerrainCatch => "terrain_catch",
            Self::CompoundSlide => "compound_slide",
            Self::TerminalRunout => "terminal_runout",
        }
    }

    /// Outcomes the player walks away from.
    #[must_use]
    pub const fn is_survivable(self) -> bool {
        !matches!(self, Self::TerminalRunout)
    }
}

/// Per-tick slide record, owned by the slide system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub speed: f32,
    pub slope_angle: f32,
    pub slope_direction: Vec3,
    pub surface_type: SurfaceType,
    pub friction: f32,
    pub control: f32,
    pub control_level: ControlLevel,
    pub exit_zone_distance: f32,
    pub exit_zone_quality: f32,
    pub cliff_distance: f32,
    pub risk: f32,
    pub in_transition: bool,
    pub transition_danger: f32,
    /// Seconds since the slide began.
    pub time: f32,
    /// Metres travelled since the slide began.
    pub distance: f32,
}

impl Default for SlideState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            speed: 0.0,
            slope_angle: 0.0,
            slope_direction: Vec3::Z,
            surface_type: SurfaceType::SnowFirm,
            friction: SurfaceType::SnowFirm.friction(),
            control: 1.0,
            control_level: ControlLevel::Controlled,
            exit_zone_distance: NO_EXIT_DISTANCE,
            exit_zone_quality: 0.0,
            cliff_distance: FAR_CLIFF_DISTANCE,
            risk: 0.0,
            in_transition: false,
            transition_danger: 0.0,
            time: 0.0,
            distance: 0.0,
        }
    }
}

impl SlideState {
    /// Fresh record at a position and entry velocity.
    #[must_use]
    pub fn starting_at(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            speed: velocity.length(),
            ..Self::default()
        }
    }

    /// Unit direction of travel, falling back to downhill when stalled.
    #[must_use]
    pub fn travel_direction(&self) -> Vec3 {
        if self.speed > 0.5 {
            let flat = Vec3::new(self.velocity.x, 0.0, self.velocity.z);
            if let Some(direction) = flat.try_normalize() {
                return direction;
            }
        }
        self.slope_direction.normalize_or_zero()
    }

    /// Replace non-finite derived scalars with zero.
    pub fn sanitize(&mut self) {
        self.speed = finite_or_zero(self.speed);
        self.control = finite_or_zero(self.control);
        self.risk = finite_or_zero(self.risk);
        self.transition_danger = finite_or_zero(self.transition_danger);
        self.exit_zone_quality = finite_or_zero(self.exit_zone_quality);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_exact() {
        assert_eq!(ControlLevel::from_control(0.81), ControlLevel::Controlled);
        assert_eq!(ControlLevel::from_control(0.8), ControlLevel::Controlled);
        assert_eq!(ControlLevel::from_control(0.79), ControlLevel::Marginal);
        assert_eq!(ControlLevel::from_control(0.51), ControlLevel::Marginal);
        assert_eq!(ControlLevel::from_control(0.49), ControlLevel::Unstable);
        assert_eq!(ControlLevel::from_control(0.21), ControlLevel::Unstable);
        assert_eq!(ControlLevel::from_control(0.19), ControlLevel::Lost);
        assert_eq!(ControlLevel::from_control(f32::NAN), ControlLevel::Lost);
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(ControlLevel::Controlled < ControlLevel::Marginal);
        assert!(ControlLevel::Unstable < ControlLevel::Lost);
        assert_eq!(ControlLevel::Marginal.bounds(), (0.5, 0.8));
    }

    #[test]
    fn travel_direction_falls_back_to_slope() {
        let mut state = SlideState::starting_at(Vec3::ZERO, Vec3::ZERO);
        state.slope_direction = Vec3::X;
        assert_eq!(state.travel_direction(), Vec3::X);
        state.velocity = Vec3::new(0.0, -1.0, 4.0);
        state.speed = state.velocity.length();
        assert!((state.travel_direction() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn sanitize_zeroes_degenerate_values() {
        let mut state = SlideState {
            control: f32::NAN,
            risk: f32::INFINITY,
            ..SlideState::default()
        };
        state.sanitize();
        assert!(state.control.abs() < f32::EPSILON);
        assert!(state.risk.abs() < f32::EPSILON);
    }
}
