//! Slide physics, control classification and the slide lifecycle.
pub mod controller;
pub mod exit_zone;
pub mod feedback;
pub mod spectrum;
pub mod state;

use std::fmt;
use std::rc::Rc;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use controller::{SlideController, SlideInput};
pub use exit_zone::{ExitZone, ExitZoneDetector};
pub use feedback::{EffectRequest, FeedbackCue, SlideFeedback};
pub use spectrum::{ControlSpectrum, SlideStateManager};
pub use state::{ControlLevel, SlideOutcome, SlideState};

use crate::config::{DescentConfig, SlideConfig};
use crate::constants::{
    ARREST_AXE_WEIGHT, ARREST_BASE_CHANCE, ARREST_BONUS_FIRM_SNOW, ARREST_BONUS_SOFT_SNOW,
    ARREST_CONTROL_WEIGHT, ARREST_FAIL_CONTROL_FACTOR, ARREST_FAIL_STABILITY_LOSS,
    ARREST_FAIL_TUMBLE_CHANCE, ARREST_MAX_CHANCE, ARREST_MIN_CHANCE, ARREST_PENALTY_ICE,
    ARREST_PENALTY_SCREE, ARREST_SPEED_WEIGHT, ARREST_SUCCESS_DAMPING, CATCH_FATIGUE,
    CATCH_GEAR_DAMAGE, CATCH_GEAR_DAMAGE_CHANCE, CLIFF_TERMINAL_DISTANCE, CONTROL_SPEED_LOSS,
    CONTROL_SPEED_ONSET, EXIT_ENTER_DISTANCE, EXIT_STOP_SPEED, NO_EXIT_DISTANCE,
    PONR_CLIFF_DISTANCE, RISK_CLIFF_RANGE, RISK_CLIFF_WEIGHT, RISK_CONTROL_WEIGHT,
    RISK_NO_EXIT_WEIGHT, RISK_SPEED_WEIGHT, RUNOUT_SEVERITY_MAX, RUNOUT_SEVERITY_MIN,
    RUNOUT_STOP_SPEED, STOP_SLOPE, STOP_SPEED, SURFACE_FACTOR_ICE, SURFACE_FACTOR_POWDER,
    SURFACE_FACTOR_SCREE, TERMINAL_WARNING_RATIO, TRANSITION_DANGER_RANGE,
    TRANSITION_SLOPE_DELTA, TUMBLE_FATIGUE, TUMBLE_INJURY_CHANCE, TUMBLE_INJURY_SEVERITY,
    TUMBLE_STABILITY_LOSS,
};
use crate::events::{EventBus, EventKind};
use crate::numbers::{finite_or_zero, finite_vec_or_zero, flatten, unit_clamp};
use crate::player::{MovementState, Player};
use crate::rng::RngBundle;
use crate::terrain::{SurfaceType, TerrainQuery};

/// Result of a self-arrest attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ArrestResult {
    NotSliding,
    Success,
    Failure { tumbled: bool },
}

/// Control multiplier for the surface under the slider.
#[must_use]
pub const fn surface_control_factor(surface: SurfaceType) -> f32 {
    match surface {
        SurfaceType::Ice => SURFACE_FACTOR_ICE,
        SurfaceType::SnowPowder => SURFACE_FACTOR_POWDER,
        SurfaceType::Scree => SURFACE_FACTOR_SCREE,
        _ => 1.0,
    }
}

const fn arrest_surface_bonus(surface: SurfaceType) -> f32 {
    match surface {
        SurfaceType::SnowFirm => ARREST_BONUS_FIRM_SNOW,
        SurfaceType::SnowSoft => ARREST_BONUS_SOFT_SNOW,
        SurfaceType::Ice => ARREST_PENALTY_ICE,
        SurfaceType::Scree => ARREST_PENALTY_SCREE,
        _ => 0.0,
    }
}

/// Probability that a self-arrest succeeds, always within `[0.05, 0.95]`.
#[must_use]
pub fn calculate_arrest_chance(
    axe_effectiveness: f32,
    speed: f32,
    terminal_speed: f32,
    surface: SurfaceType,
    control: f32,
) -> f32 {
    let speed_ratio = finite_or_zero(finite_or_zero(speed) / terminal_speed);
    let chance = ARREST_BASE_CHANCE + finite_or_zero(axe_effectiveness) * ARREST_AXE_WEIGHT
        - speed_ratio * ARREST_SPEED_WEIGHT
        + arrest_surface_bonus(surface)
        + (finite_or_zero(control) - 0.5) * ARREST_CONTROL_WEIGHT;
    finite_or_zero(chance).clamp(ARREST_MIN_CHANCE, ARREST_MAX_CHANCE)
}

/// Owns the live slide and its sub-components.
pub struct SlideSystem {
    cfg: SlideConfig,
    exit_scan_distance: f32,
    exit_scan_interval: f32,
    terrain: Option<Rc<dyn TerrainQuery>>,
    rngs: Rc<RngBundle>,
    state: SlideState,
    sliding: bool,
    controller: SlideController,
    exit_detector: ExitZoneDetector,
    state_manager: SlideStateManager,
    feedback: SlideFeedback,
    spectrum: ControlSpectrum,
    terminal_warning_issued: bool,
    point_of_no_return_issued: bool,
    arrest_cooldown: f32,
    arrest_held: bool,
    previous_slope: Option<f32>,
    nearest_exit: Option<(Vec3, f32)>,
    exit_lookup_age: f32,
    last_outcome: Option<SlideOutcome>,
}

impl fmt::Debug for SlideSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlideSystem")
            .field("sliding", &self.sliding)
            .field("has_terrain", &self.terrain.is_some())
            .field("state", &self.state)
            .field("last_outcome", &self.last_outcome)
            .finish_non_exhaustive()
    }
}

impl SlideSystem {
    #[must_use]
    pub fn new(config: &DescentConfig, rngs: Rc<RngBundle>) -> Self {
        Self {
            cfg: config.slide.clone(),
            exit_scan_distance: config.exit_zones.scan_distance,
            exit_scan_interval: config.exit_zones.scan_interval,
            terrain: None,
            rngs,
            state: SlideState::default(),
            sliding: false,
            controller: SlideController::new(config.controller.clone()),
            exit_detector: ExitZoneDetector::new(config.exit_zones.clone()),
            state_manager: SlideStateManager::new(config.spectrum.clone()),
            feedback: SlideFeedback::new(config.slide.terminal_speed),
            spectrum: ControlSpectrum::default(),
            terminal_warning_issued: false,
            point_of_no_return_issued: false,
            arrest_cooldown: 0.0,
            arrest_held: false,
            previous_slope: None,
            nearest_exit: None,
            exit_lookup_age: 0.0,
            last_outcome: None,
        }
    }

    /// Attach the terrain service; ticks are no-ops until this happens.
    pub fn attach_terrain(&mut self, terrain: Rc<dyn TerrainQuery>) {
        self.terrain = Some(terrain);
    }

    #[must_use]
    pub const fn has_terrain(&self) -> bool {
        self.terrain.is_some()
    }

    /// Start a slide from the player's current position and velocity.
    ///
    /// Returns `false` when already sliding or when no terrain is attached.
    pub fn begin_slide(&mut self, player: &mut Player, bus: &mut EventBus) -> bool {
        if self.sliding {
            log::warn!("begin_slide ignored: a slide is already active");
            return false;
        }
        let Some(terrain) = self.terrain.clone() else {
            log::warn!("begin_slide ignored: terrain not attached");
            return false;
        };

        self.state = SlideState::starting_at(player.position, finite_vec_or_zero(player.velocity));
        self.previous_slope = None;
        self.nearest_exit = None;
        self.exit_lookup_age = 0.0;
        self.refresh_terrain(terrain.as_ref());
        if self.state.speed < self.cfg.min_start_speed {
            let push = flatten(self.state.slope_direction).normalize_or(Vec3::Z);
            self.state.velocity = push * self.cfg.min_start_speed;
            self.state.speed = self.state.velocity.length();
        }

        self.controller.reset();
        self.exit_detector.reset();
        self.feedback.clear();
        self.terminal_warning_issued = false;
        self.point_of_no_return_issued = false;
        self.arrest_cooldown = 0.0;
        self.arrest_held = false;
        self.last_outcome = None;

        self.state.control = self.compute_control(player);
        self.state.control_level = ControlLevel::from_control(self.state.control);
        self.state_manager.reset(self.state.control);
        self.spectrum = self.state_manager.snapshot();

        self.sliding = true;
        player.velocity = self.state.velocity;
        player.change_state(MovementState::Sliding);
        log::debug!(
            "slide started at {:.1} m/s on {:.1} deg",
            self.state.speed,
            self.state.slope_angle
        );
        let tick_start = bus.len();
        bus.emit(EventKind::SlideStarted {
            entry_speed: self.state.speed,
            slope_angle: self.state.slope_angle,
        });
        self.publish_feedback(bus, tick_start);
        true
    }

    /// Advance the slide by one fixed physics step.
    pub fn physics_update(
        &mut self,
        dt: f32,
        player: &mut Player,
        input: &SlideInput,
        bus: &mut EventBus,
    ) {
        if !self.sliding {
            return;
        }
        let Some(terrain) = self.terrain.clone() else {
            log::debug!("slide tick skipped: terrain not attached");
            return;
        };
        let dt = finite_or_zero(dt);
        if dt <= 0.0 {
            return;
        }
        let tick_start = bus.len();

        self.arrest_cooldown = (self.arrest_cooldown - dt).max(0.0);
        let arrest_pressed = input.arrest && !self.arrest_held;
        self.arrest_held = input.arrest;
        if arrest_pressed && self.arrest_cooldown <= 0.0 {
            self.attempt_self_arrest(player, bus);
            if !self.sliding {
                self.publish_feedback(bus, tick_start);
                return;
            }
        }
        self.controller.update(input, dt);

        self.exit_lookup_age -= dt;
        self.refresh_terrain(terrain.as_ref());
        let forces = self.gravity_force()
            + self.controller.lateral_force(
                self.state.velocity,
                self.state.slope_direction,
                self.state.control,
            );
        self.state.velocity += forces * dt;
        self.apply_friction(dt);
        self.apply_drag(dt);
        self.clamp_to_terminal();
        self.state.velocity = finite_vec_or_zero(self.state.velocity);

        self.state.speed = self.state.velocity.length();
        self.state.position += self.state.velocity * dt;
        self.state.time += dt;
        self.state.distance += self.state.speed * dt;
        player.position = self.state.position;
        player.velocity = self.state.velocity;

        self.update_control(player, bus);
        self.state.risk = self.compute_risk();
        self.state.sanitize();

        self.exit_detector.update(dt, &self.state, terrain.as_ref(), bus);
        self.spectrum = self.state_manager.update(
            dt,
            self.state.control,
            self.state.exit_zone_distance,
            bus,
        );
        self.check_point_of_no_return(bus);

        if let Some(outcome) = self.check_auto_termination() {
            self.end_slide(outcome, player, bus);
        }
        bus.emit(EventKind::SlideUpdated {
            state: Box::new(self.state.clone()),
        });
        self.publish_feedback(bus, tick_start);
    }

    fn publish_feedback(&mut self, bus: &EventBus, tick_start: usize) {
        let events = bus.pending().get(tick_start..).unwrap_or(&[]);
        self.feedback.update(&self.state, &self.spectrum, events);
    }

    fn refresh_terrain(&mut self, terrain: &dyn TerrainQuery) {
        let Some(cell) = terrain.cell_at(self.state.position) else {
            log::debug!("no terrain under {:?}; keeping last values", self.state.position);
            return;
        };
        let slope = finite_or_zero(cell.slope_angle);
        if let Some(previous) = self.previous_slope {
            let delta = slope - previous;
            self.state.in_transition = delta.abs() > TRANSITION_SLOPE_DELTA;
            self.state.transition_danger = if self.state.in_transition {
                unit_clamp(delta.max(0.0) / TRANSITION_DANGER_RANGE)
            } else {
                0.0
            };
        }
        self.previous_slope = Some(slope);

        self.state.slope_angle = slope;
        self.state.slope_direction = flatten(cell.slope_direction)
            .try_normalize()
            .unwrap_or(self.state.slope_direction);
        self.state.surface_type = cell.surface_type;
        self.state.friction = finite_or_zero(cell.friction);
        self.state.cliff_distance = finite_or_zero(cell.distance_to_cliff);

        if cell.is_exit_zone {
            self.state.exit_zone_distance = 0.0;
            self.state.exit_zone_quality = cell.exit_zone_quality;
            return;
        }
        // Nearest-exit lookups share the exit detector's scan cadence.
        if self.exit_lookup_age <= 0.0 {
            self.exit_lookup_age = self.exit_scan_interval;
            self.nearest_exit = terrain
                .find_nearest_exit_zone(self.state.position, self.exit_scan_distance)
                .map(|exit| (exit.position, exit.exit_zone_quality));
        }
        if let Some((position, quality)) = self.nearest_exit {
            self.state.exit_zone_distance =
                flatten(position).distance(flatten(self.state.position));
            self.state.exit_zone_quality = quality;
        } else {
            self.state.exit_zone_distance = NO_EXIT_DISTANCE;
            self.state.exit_zone_quality = 0.0;
        }
    }

    fn gravity_force(&self) -> Vec3 {
        let slope = self.state.slope_angle.to_radians();
        let along = self.state.slope_direction * self.cfg.gravity * slope.sin();
        let into_slope = Vec3::NEG_Y * self.cfg.gravity * self.cfg.into_slope_factor;
        along + into_slope
    }

    fn apply_friction(&mut self, dt: f32) {
        let speed = self.state.velocity.length();
        if speed <= f32::EPSILON {
            return;
        }
        let normal = self.cfg.gravity * self.state.slope_angle.to_radians().cos();
        let decel = (self.state.friction * self.controller.friction_multiplier() * normal
            + self.controller.edge_friction_bonus())
            * dt;
        if decel >= speed {
            self.state.velocity = Vec3::ZERO;
        } else {
            self.state.velocity -= self.state.velocity / speed * decel;
        }
    }

    fn apply_drag(&mut self, dt: f32) {
        let speed = self.state.velocity.length();
        if speed <= f32::EPSILON {
            return;
        }
        let drag = self.cfg.air_resistance * speed * speed * dt;
        if drag >= speed {
            self.state.velocity *= 0.5;
        } else {
            self.state.velocity -= self.state.velocity / speed * drag;
        }
    }

    fn clamp_to_terminal(&mut self) {
        let speed = self.state.velocity.length();
        if speed > self.cfg.terminal_speed {
            self.state.velocity *= self.cfg.terminal_speed / speed;
        }
    }

    /// Control from first principles for the current state and body.
    fn compute_control(&self, player: &Player) -> f32 {
        let mut control = 1.0;
        if self.state.speed > CONTROL_SPEED_ONSET {
            control = (control - (self.state.speed - CONTROL_SPEED_ONSET) * CONTROL_SPEED_LOSS)
                .max(self.cfg.min_control);
        }
        control *= surface_control_factor(self.state.surface_type);
        control *= player.body.slide_control_modifier();
        control *= unit_clamp(player.stability);
        control += self.controller.control_bonus();
        unit_clamp(finite_or_zero(control))
    }

    fn update_control(&mut self, player: &Player, bus: &mut EventBus) {
        self.state.control = self.compute_control(player);
        let level = ControlLevel::from_control(self.state.control);
        if level != self.state.control_level {
            bus.emit(EventKind::SlideControlChanged {
                old_level: self.state.control_level,
                new_level: level,
            });
            self.state.control_level = level;
        }
        if !self.terminal_warning_issued
            && self.state.speed >= self.cfg.terminal_speed * TERMINAL_WARNING_RATIO
        {
            self.terminal_warning_issued = true;
            bus.emit(EventKind::TerminalVelocityWarning {
                speed: self.state.speed,
            });
        }
    }

    fn compute_risk(&self) -> f32 {
        let speed = unit_clamp(self.state.speed / self.cfg.terminal_speed) * RISK_SPEED_WEIGHT;
        let cliff =
            unit_clamp(1.0 - self.state.cliff_distance / RISK_CLIFF_RANGE) * RISK_CLIFF_WEIGHT;
        let control = unit_clamp(1.0 - self.state.control) * RISK_CONTROL_WEIGHT;
        let no_exit = if self.state.exit_zone_distance >= NO_EXIT_DISTANCE {
            RISK_NO_EXIT_WEIGHT
        } else {
            0.0
        };
        unit_clamp(speed + cliff + control + no_exit)
    }

    fn check_point_of_no_return(&mut self, bus: &mut EventBus) {
        if self.point_of_no_return_issued
            || self.state.control_level != ControlLevel::Lost
            || self.state.cliff_distance >= PONR_CLIFF_DISTANCE
            || self.exit_detector.has_viable_exit()
        {
            return;
        }
        self.point_of_no_return_issued = true;
        bus.emit(EventKind::SlidePointOfNoReturn {
            cliff_distance: self.state.cliff_distance,
        });
    }

    fn check_auto_termination(&self) -> Option<SlideOutcome> {
        let state = &self.state;
        if state.cliff_distance < CLIFF_TERMINAL_DISTANCE {
            return Some(SlideOutcome::TerminalRunout);
        }
        if state.speed < STOP_SPEED && state.slope_angle < STOP_SLOPE {
            return Some(SlideOutcome::CleanStop);
        }
        if state.exit_zone_distance < EXIT_ENTER_DISTANCE && state.speed < EXIT_STOP_SPEED {
            return Some(SlideOutcome::CleanStop);
        }
        if state.slope_angle < self.cfg.min_slide_angle && state.speed < RUNOUT_STOP_SPEED {
            return Some(SlideOutcome::CleanStop);
        }
        None
    }

    /// End the slide with an outcome and apply its consequences.
    ///
    /// A no-op when no slide is active. `CompoundSlide` keeps the slide going
    /// as a new segment.
    pub fn end_slide(&mut self, outcome: SlideOutcome, player: &mut Player, bus: &mut EventBus) {
        if !self.sliding {
            return;
        }
        if outcome == SlideOutcome::CompoundSlide {
            self.terminal_warning_issued = false;
            self.controller.restart_commitment_window();
            log::debug!("slide continues into a new segment at {:.1} m/s", self.state.speed);
            bus.emit(EventKind::SlideSegmentStarted {
                speed: self.state.speed,
            });
            return;
        }

        self.sliding = false;
        self.last_outcome = Some(outcome);
        let final_speed = self.state.speed;
        match outcome {
            SlideOutcome::CleanStop => {
                player.velocity = Vec3::ZERO;
                player.change_state(MovementState::Standing);
            }
            SlideOutcome::TumbleStop => {
                player.body.add_fatigue(TUMBLE_FATIGUE);
                player.reduce_stability(TUMBLE_STABILITY_LOSS);
                if self.rngs.injury().gen_bool(TUMBLE_INJURY_CHANCE) {
                    player.body.add_injury(TUMBLE_INJURY_SEVERITY);
                }
                player.velocity = Vec3::ZERO;
                player.change_state(MovementState::Standing);
            }
            SlideOutcome::TerrainCatch => {
                if self.rngs.gear().gen_bool(CATCH_GEAR_DAMAGE_CHANCE) {
                    let damaged = player
                        .gear
                        .damage_random_equipped(&mut *self.rngs.gear(), CATCH_GEAR_DAMAGE);
                    log::debug!("terrain catch damaged {damaged:?}");
                }
                player.body.add_fatigue(CATCH_FATIGUE);
                player.velocity = Vec3::ZERO;
                player.change_state(MovementState::Standing);
            }
            SlideOutcome::TerminalRunout => {
                let severity = self
                    .rngs
                    .injury()
                    .gen_range(RUNOUT_SEVERITY_MIN..=RUNOUT_SEVERITY_MAX);
                player.body.add_injury(severity);
                player.change_state(MovementState::Falling);
            }
            SlideOutcome::CompoundSlide => {}
        }
        log::debug!(
            "slide ended: {} at {:.1} m/s after {:.1} m",
            outcome.label(),
            final_speed,
            self.state.distance
        );
        bus.emit(EventKind::SlideEnded {
            outcome,
            final_speed,
        });
    }

    /// Try to dig the axe in and stop.
    pub fn attempt_self_arrest(&mut self, player: &mut Player, bus: &mut EventBus) -> ArrestResult {
        if !self.sliding {
            return ArrestResult::NotSliding;
        }
        let chance = self.arrest_chance(player);
        let success = self.rngs.arrest().r#gen::<f32>() < chance;
        self.arrest_cooldown = self.cfg.arrest_cooldown;
        bus.emit(EventKind::SelfArrestAttempted { chance, success });

        if success {
            self.state.velocity *= ARREST_SUCCESS_DAMPING;
            self.state.speed = self.state.velocity.length();
            player.velocity = self.state.velocity;
            self.end_slide(SlideOutcome::CleanStop, player, bus);
            player.change_state(MovementState::Arrested);
            return ArrestResult::Success;
        }

        self.state.control *= ARREST_FAIL_CONTROL_FACTOR;
        player.reduce_stability(ARREST_FAIL_STABILITY_LOSS);
        let tumbled = self.rngs.arrest().gen_bool(ARREST_FAIL_TUMBLE_CHANCE);
        if tumbled {
            self.end_slide(SlideOutcome::TumbleStop, player, bus);
        }
        ArrestResult::Failure { tumbled }
    }

    /// Current arrest odds for this player and slide.
    #[must_use]
    pub fn arrest_chance(&self, player: &Player) -> f32 {
        calculate_arrest_chance(
            player.gear.ice_axe_effectiveness(),
            self.state.speed,
            self.cfg.terminal_speed,
            self.state.surface_type,
            self.state.control,
        )
    }

    /// Drop the live slide without consequences, e.g. before a save.
    pub fn abort_slide(&mut self, player: &mut Player) -> bool {
        if !self.sliding {
            return false;
        }
        log::debug!("slide aborted after {:.1} s", self.state.time);
        self.sliding = false;
        player.velocity = Vec3::ZERO;
        player.change_state(MovementState::Standing);
        true
    }

    /// Hand the player over to a fatal sequence mid-slide.
    ///
    /// The slide stops integrating and applies no outcome; the player is left
    /// falling and queued feedback is dropped.
    pub fn interrupt_slide(&mut self, player: &mut Player) -> bool {
        if !self.sliding {
            return false;
        }
        log::debug!("slide interrupted after {:.1} s", self.state.time);
        self.sliding = false;
        self.feedback.clear();
        player.change_state(MovementState::Falling);
        true
    }

    #[must_use]
    pub const fn is_sliding(&self) -> bool {
        self.sliding
    }

    #[must_use]
    pub const fn state(&self) -> &SlideState {
        &self.state
    }

    #[must_use]
    pub const fn spectrum(&self) -> &ControlSpectrum {
        &self.spectrum
    }

    #[must_use]
    pub const fn controller(&self) -> &SlideController {
        &self.controller
    }

    #[must_use]
    pub const fn exit_detector(&self) -> &ExitZoneDetector {
        &self.exit_detector
    }

    #[must_use]
    pub const fn last_outcome(&self) -> Option<SlideOutcome> {
        self.last_outcome
    }

    /// Take queued presentation requests.
    pub fn drain_effects(&mut self) -> Vec<EffectRequest> {
        self.feedback.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{GridTerrain, TerrainCell};

    const DT: f32 = 1.0 / 60.0;

    fn system_on(terrain: GridTerrain, seed: u64) -> SlideSystem {
        let mut system = SlideSystem::new(
            &DescentConfig::default(),
            Rc::new(RngBundle::from_user_seed(seed)),
        );
        system.attach_terrain(Rc::new(terrain));
        system
    }

    fn steep_snow() -> GridTerrain {
        GridTerrain::uniform(20, 400, 1.0, 35.0, Vec3::Z, SurfaceType::SnowFirm)
    }

    #[test]
    fn arrest_chance_is_bounded() {
        let high = calculate_arrest_chance(10.0, 0.0, 25.0, SurfaceType::SnowFirm, 1.0);
        let low = calculate_arrest_chance(0.0, 1000.0, 25.0, SurfaceType::Scree, 0.0);
        let degenerate =
            calculate_arrest_chance(f32::NAN, f32::INFINITY, 0.0, SurfaceType::Ice, f32::NAN);
        assert!((high - 0.95).abs() < f32::EPSILON);
        assert!((low - 0.05).abs() < f32::EPSILON);
        assert!((0.05..=0.95).contains(&degenerate));
    }

    #[test]
    fn arrest_chance_prefers_firm_snow() {
        let firm = calculate_arrest_chance(0.5, 10.0, 25.0, SurfaceType::SnowFirm, 0.5);
        let ice = calculate_arrest_chance(0.5, 10.0, 25.0, SurfaceType::Ice, 0.5);
        assert!(firm > ice);
        assert!((firm - (0.5 + 0.2 - 0.2 + 0.3)).abs() < 1e-5);
    }

    #[test]
    fn stalled_start_gets_a_push() {
        let mut system = system_on(steep_snow(), 1);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        assert!(system.begin_slide(&mut player, &mut bus));
        assert!((system.state().speed - 2.0).abs() < 1e-5);
        assert_eq!(player.movement_state, MovementState::Sliding);
        assert!(!system.begin_slide(&mut player, &mut bus));
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::SlideStarted { .. })),
            1
        );
    }

    #[test]
    fn ticks_without_terrain_are_noops() {
        let mut system = SlideSystem::new(
            &DescentConfig::default(),
            Rc::new(RngBundle::from_user_seed(1)),
        );
        let mut player = Player::default();
        let mut bus = EventBus::new();
        assert!(!system.begin_slide(&mut player, &mut bus));
        system.physics_update(DT, &mut player, &SlideInput::idle(), &mut bus);
        assert!(bus.is_empty());
        assert!(!system.is_sliding());
    }

    #[test]
    fn speed_never_exceeds_terminal() {
        let terrain = GridTerrain::uniform(20, 4000, 1.0, 60.0, Vec3::Z, SurfaceType::Ice);
        let mut system = system_on(terrain, 2);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 1.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        let tuck = SlideInput {
            forward: true,
            ..SlideInput::idle()
        };
        for _ in 0..1200 {
            system.physics_update(DT, &mut player, &tuck, &mut bus);
            assert!(system.state().speed <= 25.0 + 1e-3);
        }
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::TerminalVelocityWarning { .. })),
            1
        );
    }

    #[test]
    fn end_slide_is_idempotent() {
        let mut system = system_on(steep_snow(), 3);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        system.end_slide(SlideOutcome::TumbleStop, &mut player, &mut bus);
        let after_first = player.clone();
        let events = bus.len();
        system.end_slide(SlideOutcome::TumbleStop, &mut player, &mut bus);
        assert_eq!(player, after_first);
        assert_eq!(bus.len(), events);
        assert_eq!(system.last_outcome(), Some(SlideOutcome::TumbleStop));
    }

    #[test]
    fn compound_slide_keeps_sliding() {
        let mut system = system_on(steep_snow(), 4);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        system.end_slide(SlideOutcome::CompoundSlide, &mut player, &mut bus);
        assert!(system.is_sliding());
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::SlideSegmentStarted { .. })),
            1
        );
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::SlideEnded { .. })),
            0
        );
    }

    #[test]
    fn arrest_input_fires_on_press_only() {
        let mut system = system_on(steep_snow(), 5);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        let hold = SlideInput {
            arrest: true,
            ..SlideInput::idle()
        };
        for _ in 0..30 {
            system.physics_update(DT, &mut player, &hold, &mut bus);
        }
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::SelfArrestAttempted { .. })),
            1
        );
    }

    #[test]
    fn abort_clears_without_consequences() {
        let mut system = system_on(steep_snow(), 6);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        assert!(system.abort_slide(&mut player));
        assert!(!system.abort_slide(&mut player));
        assert!(player.body.injuries.is_empty());
        assert_eq!(player.movement_state, MovementState::Standing);
    }

    #[test]
    fn control_falls_with_speed_and_rises_with_edge_time() {
        let mut system = system_on(steep_snow(), 8);
        let player = Player::default();
        let mut previous = f32::INFINITY;
        for speed in [6.0, 10.0, 15.0, 20.0, 25.0] {
            system.state.speed = speed;
            let control = system.compute_control(&player);
            assert!(control < previous, "speed {speed}");
            previous = control;
        }

        system.state.speed = 10.0;
        let edge = SlideInput {
            backward: true,
            ..SlideInput::idle()
        };
        let mut previous = system.compute_control(&player);
        for _ in 0..20 {
            system.controller.update(&edge, DT);
            let control = system.compute_control(&player);
            assert!(control > previous);
            previous = control;
        }
    }

    #[test]
    fn cliff_edge_ends_in_terminal_runout() {
        let terrain = GridTerrain::from_fn(20, 20, 1.0, |grid, position| {
            crate::terrain::TerrainCell::new(
                grid,
                position,
                38.0,
                Vec3::Z,
                SurfaceType::SnowFirm,
                1.5,
            )
        });
        let mut system = system_on(terrain, 9);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        system.physics_update(DT, &mut player, &SlideInput::idle(), &mut bus);

        assert!(!system.is_sliding());
        assert_eq!(system.last_outcome(), Some(SlideOutcome::TerminalRunout));
        assert_eq!(player.movement_state, MovementState::Falling);
        let injury = player.body.worst_injury().expect("runout injures");
        assert!((0.8..=1.0).contains(&injury.severity));
    }

    #[test]
    fn point_of_no_return_needs_lost_control_near_a_cliff_without_exits() {
        let mut system = system_on(steep_snow(), 10);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        let fired = |bus: &EventBus| {
            bus.count_where(|kind| matches!(kind, EventKind::SlidePointOfNoReturn { .. }))
        };

        system.state.control_level = ControlLevel::Unstable;
        system.state.cliff_distance = 10.0;
        system.check_point_of_no_return(&mut bus);
        assert_eq!(fired(&bus), 0);

        system.state.control_level = ControlLevel::Lost;
        system.state.cliff_distance = 25.0;
        system.check_point_of_no_return(&mut bus);
        assert_eq!(fired(&bus), 0);

        system.state.cliff_distance = 10.0;
        system.check_point_of_no_return(&mut bus);
        system.check_point_of_no_return(&mut bus);
        assert_eq!(fired(&bus), 1);
    }

    #[test]
    fn viable_exit_suppresses_point_of_no_return() {
        let terrain = GridTerrain::from_fn(20, 60, 1.0, |grid, position| {
            let slope = if grid == (10, 25) { 10.0 } else { 35.0 };
            crate::terrain::TerrainCell::new(
                grid,
                position,
                slope,
                Vec3::Z,
                SurfaceType::SnowFirm,
                1000.0,
            )
        });
        let mut system = system_on(terrain, 11);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        system.physics_update(DT, &mut player, &SlideInput::idle(), &mut bus);
        assert!(system.exit_detector().has_viable_exit());

        system.state.control_level = ControlLevel::Lost;
        system.state.cliff_distance = 5.0;
        system.check_point_of_no_return(&mut bus);
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::SlidePointOfNoReturn { .. })),
            0
        );
    }

    #[test]
    fn interrupted_slide_stops_integrating() {
        let mut system = system_on(steep_snow(), 12);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        for _ in 0..30 {
            system.physics_update(DT, &mut player, &SlideInput::idle(), &mut bus);
        }
        assert!(system.interrupt_slide(&mut player));
        assert!(!system.interrupt_slide(&mut player));
        assert_eq!(player.movement_state, MovementState::Falling);
        assert_eq!(system.last_outcome(), None);
        assert!(system.drain_effects().is_empty());

        let frozen = player.clone();
        let events = bus.len();
        for _ in 0..60 {
            system.physics_update(DT, &mut player, &SlideInput::idle(), &mut bus);
        }
        assert_eq!(player, frozen);
        assert_eq!(bus.len(), events);
    }

    struct CountingTerrain {
        inner: GridTerrain,
        exit_lookups: std::cell::Cell<u32>,
    }

    impl TerrainQuery for CountingTerrain {
        fn cell_at(&self, position: Vec3) -> Option<TerrainCell> {
            self.inner.cell_at(position)
        }

        fn find_nearest_exit_zone(&self, position: Vec3, radius: f32) -> Option<TerrainCell> {
            self.exit_lookups.set(self.exit_lookups.get() + 1);
            self.inner.find_nearest_exit_zone(position, radius)
        }

        fn cells_in_radius(&self, position: Vec3, radius: f32) -> Vec<TerrainCell> {
            self.inner.cells_in_radius(position, radius)
        }
    }

    #[test]
    fn nearest_exit_lookup_follows_scan_interval() {
        let terrain = Rc::new(CountingTerrain {
            inner: steep_snow(),
            exit_lookups: std::cell::Cell::new(0),
        });
        let mut system = SlideSystem::new(
            &DescentConfig::default(),
            Rc::new(RngBundle::from_user_seed(13)),
        );
        system.attach_terrain(Rc::clone(&terrain) as Rc<dyn TerrainQuery>);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 2.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        for _ in 0..60 {
            system.physics_update(DT, &mut player, &SlideInput::idle(), &mut bus);
        }
        assert!(system.is_sliding());
        let lookups = terrain.exit_lookups.get();
        assert!((2..=8).contains(&lookups), "{lookups} lookups in one second");
    }

    #[test]
    fn slope_steepening_flags_transition() {
        let terrain = GridTerrain::from_fn(20, 100, 1.0, |grid, position| {
            let slope = if grid.1 < 5 { 30.0 } else { 45.0 };
            crate::terrain::TerrainCell::new(
                grid,
                position,
                slope,
                Vec3::Z,
                SurfaceType::SnowFirm,
                1000.0,
            )
        });
        let mut system = system_on(terrain, 7);
        let mut player = Player::at(Vec3::new(10.5, 0.0, 4.5));
        let mut bus = EventBus::new();
        system.begin_slide(&mut player, &mut bus);
        let mut saw_transition = false;
        for _ in 0..120 {
            system.physics_update(DT, &mut player, &SlideInput::idle(), &mut bus);
            if system.state().in_transition {
                saw_transition = true;
                assert!((system.state().transition_danger - 0.75).abs() < 1e-4);
            }
        }
        assert!(saw_transition);
    }
}
