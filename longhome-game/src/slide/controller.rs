//! Player influence over an active slide: leaning, edging, tucking and the
//! cost of hesitating.
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::ControllerConfig;
use crate::constants::{
    COMMITMENT_LEAN_THRESHOLD, LEAN_KEY_WEIGHT, MIN_LEAN_EFFECTIVENESS, STRAFE_KEY_WEIGHT,
};
use crate::numbers::{finite_vec_or_zero, flatten, unit_clamp};

/// Raw input intents sampled once per physics tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlideInput {
    pub lean_left: bool,
    pub lean_right: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    /// Tuck: reduces friction for speed.
    pub forward: bool,
    /// Dig edges in.
    pub backward: bool,
    /// Self-arrest request.
    pub arrest: bool,
}

impl SlideInput {
    /// Combined lean axis in `[-1, 1]`; positive leans right.
    #[must_use]
    pub fn lean_axis(&self) -> f32 {
        let lean = f32::from(u8::from(self.lean_right)) - f32::from(u8::from(self.lean_left));
        let strafe =
            f32::from(u8::from(self.strafe_right)) - f32::from(u8::from(self.strafe_left));
        (lean * LEAN_KEY_WEIGHT + strafe * STRAFE_KEY_WEIGHT).clamp(-1.0, 1.0)
    }

    #[must_use]
    pub const fn idle() -> Self {
        Self {
            lean_left: false,
            lean_right: false,
            strafe_left: false,
            strafe_right: false,
            forward: false,
            backward: false,
            arrest: false,
        }
    }
}

/// Filters player intent into forces and control bonuses.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideController {
    cfg: ControllerConfig,
    lean: f32,
    edge_engagement: f32,
    tucked: bool,
    hesitation_penalty: f32,
    uncommitted_time: f32,
}

impl SlideController {
    #[must_use]
    pub const fn new(cfg: ControllerConfig) -> Self {
        Self {
            cfg,
            lean: 0.0,
            edge_engagement: 0.0,
            tucked: false,
            hesitation_penalty: 0.0,
            uncommitted_time: 0.0,
        }
    }

    /// Clear per-slide state at slide start.
    pub const fn reset(&mut self) {
        self.lean = 0.0;
        self.edge_engagement = 0.0;
        self.tucked = false;
        self.hesitation_penalty = 0.0;
        self.uncommitted_time = 0.0;
    }

    /// Restart the commitment window for a new slide segment.
    pub const fn restart_commitment_window(&mut self) {
        self.uncommitted_time = 0.0;
    }

    /// Sample input for this tick.
    pub fn update(&mut self, input: &SlideInput, dt: f32) {
        let dt = dt.max(0.0);
        self.lean = input.lean_axis();
        self.tucked = input.forward && !input.backward;

        if input.backward {
            self.edge_engagement =
                (self.edge_engagement + self.cfg.edge_buildup_rate * dt).min(1.0);
        } else {
            self.edge_engagement = (self.edge_engagement - self.cfg.edge_decay_rate * dt).max(0.0);
        }

        let committed = self.lean.abs() > COMMITMENT_LEAN_THRESHOLD || input.backward;
        if committed {
            self.uncommitted_time = 0.0;
            self.hesitation_penalty =
                (self.hesitation_penalty - self.cfg.hesitation_recovery * dt).max(0.0);
        } else {
            self.uncommitted_time += dt;
            if self.uncommitted_time > self.cfg.commitment_window {
                self.hesitation_penalty = (self.hesitation_penalty
                    + self.cfg.hesitation_rate * dt)
                    .min(self.cfg.max_hesitation);
            }
        }
    }

    /// Lateral steering force perpendicular to travel.
    ///
    /// Effectiveness falls with speed (floored at 0.2) and scales with the
    /// current control value, so steering fades as control is lost.
    #[must_use]
    pub fn lateral_force(&self, velocity: Vec3, slope_direction: Vec3, control: f32) -> Vec3 {
        if self.lean.abs() <= f32::EPSILON {
            return Vec3::ZERO;
        }
        let speed = velocity.length();
        let heading = flatten(velocity)
            .try_normalize()
            .unwrap_or_else(|| flatten(slope_direction).normalize_or_zero());
        // Right-hand perpendicular in the XZ plane.
        let perpendicular = heading.cross(Vec3::Y).normalize_or_zero();
        let effectiveness = (1.0 - speed * self.cfg.lean_speed_falloff)
            .max(MIN_LEAN_EFFECTIVENESS)
            * unit_clamp(control);
        finite_vec_or_zero(perpendicular * self.lean * self.cfg.max_lean_force * effectiveness)
    }

    /// Extra deceleration (m/s²) from dug-in edges.
    #[must_use]
    pub fn edge_friction_bonus(&self) -> f32 {
        self.edge_engagement * self.cfg.edge_friction_bonus
    }

    /// Multiplier on surface friction; below 1.0 while tucked.
    #[must_use]
    pub const fn friction_multiplier(&self) -> f32 {
        if self.tucked {
            self.cfg.tuck_friction_multiplier
        } else {
            1.0
        }
    }

    /// Edge bonus minus hesitation penalty, added to raw control.
    #[must_use]
    pub fn control_bonus(&self) -> f32 {
        self.edge_engagement * self.cfg.edge_control_bonus - self.hesitation_penalty
    }

    #[must_use]
    pub const fn lean(&self) -> f32 {
        self.lean
    }

    #[must_use]
    pub const fn edge_engagement(&self) -> f32 {
        self.edge_engagement
    }

    #[must_use]
    pub const fn hesitation_penalty(&self) -> f32 {
        self.hesitation_penalty
    }

    #[must_use]
    pub const fn is_tucked(&self) -> bool {
        self.tucked
    }
}
