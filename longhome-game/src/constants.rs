//! Centralized balance and tuning constants for the Long-Home descent core.
//!
//! These values define the deterministic math for slides, control and the
//! fatal sequence. Config structs default to them, so tuning through JSON is
//! possible but the numbers reviewed here remain the source of truth.

// Physics ------------------------------------------------------------------
pub(crate) const GRAVITY: f32 = 9.8;
pub(crate) const TERMINAL_SPEED: f32 = 25.0;
pub(crate) const AIR_RESISTANCE: f32 = 0.008;
pub(crate) const INTO_SLOPE_FACTOR: f32 = 0.05;
pub(crate) const MIN_START_SPEED: f32 = 2.0;
pub(crate) const MIN_SLIDE_ANGLE: f32 = 25.0;
pub(crate) const TERMINAL_WARNING_RATIO: f32 = 0.9;

// Control ------------------------------------------------------------------
pub(crate) const CONTROL_SPEED_ONSET: f32 = 5.0;
pub(crate) const CONTROL_SPEED_LOSS: f32 = 0.04;
pub(crate) const MIN_CONTROL: f32 = 0.1;
pub(crate) const CONTROLLED_THRESHOLD: f32 = 0.8;
pub(crate) const MARGINAL_THRESHOLD: f32 = 0.5;
pub(crate) const UNSTABLE_THRESHOLD: f32 = 0.2;
pub(crate) const SURFACE_FACTOR_ICE: f32 = 0.4;
pub(crate) const SURFACE_FACTOR_POWDER: f32 = 0.7;
pub(crate) const SURFACE_FACTOR_SCREE: f32 = 0.6;

// Risk ---------------------------------------------------------------------
pub(crate) const RISK_SPEED_WEIGHT: f32 = 0.4;
pub(crate) const RISK_CLIFF_WEIGHT: f32 = 0.4;
pub(crate) const RISK_CONTROL_WEIGHT: f32 = 0.3;
pub(crate) const RISK_NO_EXIT_WEIGHT: f32 = 0.2;
pub(crate) const RISK_CLIFF_RANGE: f32 = 50.0;

// Automatic termination ----------------------------------------------------
pub(crate) const CLIFF_TERMINAL_DISTANCE: f32 = 2.0;
pub(crate) const STOP_SPEED: f32 = 0.5;
pub(crate) const STOP_SLOPE: f32 = 20.0;
pub(crate) const EXIT_ENTER_DISTANCE: f32 = 3.0;
pub(crate) const EXIT_STOP_SPEED: f32 = 3.0;
pub(crate) const RUNOUT_STOP_SPEED: f32 = 5.0;

// Transitions --------------------------------------------------------------
pub(crate) const TRANSITION_SLOPE_DELTA: f32 = 5.0;
pub(crate) const TRANSITION_DANGER_RANGE: f32 = 20.0;
pub(crate) const PONR_CLIFF_DISTANCE: f32 = 20.0;
/// Stand-in distance reported when no exit zone lies within scan range.
pub(crate) const NO_EXIT_DISTANCE: f32 = 1000.0;
/// Stand-in cliff distance for terrain without cliffs nearby.
pub(crate) const FAR_CLIFF_DISTANCE: f32 = 1000.0;

// Outcome consequences -----------------------------------------------------
pub(crate) const TUMBLE_FATIGUE: f32 = 0.1;
pub(crate) const TUMBLE_STABILITY_LOSS: f32 = 0.3;
pub(crate) const TUMBLE_INJURY_CHANCE: f64 = 0.3;
pub(crate) const TUMBLE_INJURY_SEVERITY: f32 = 0.2;
pub(crate) const CATCH_GEAR_DAMAGE_CHANCE: f64 = 0.2;
pub(crate) const CATCH_GEAR_DAMAGE: f32 = 0.3;
pub(crate) const CATCH_FATIGUE: f32 = 0.05;
pub(crate) const RUNOUT_SEVERITY_MIN: f32 = 0.8;
pub(crate) const RUNOUT_SEVERITY_MAX: f32 = 1.0;

// Self-arrest --------------------------------------------------------------
pub(crate) const ARREST_BASE_CHANCE: f32 = 0.5;
pub(crate) const ARREST_AXE_WEIGHT: f32 = 0.4;
pub(crate) const ARREST_SPEED_WEIGHT: f32 = 0.5;
pub(crate) const ARREST_CONTROL_WEIGHT: f32 = 0.3;
pub(crate) const ARREST_MIN_CHANCE: f32 = 0.05;
pub(crate) const ARREST_MAX_CHANCE: f32 = 0.95;
pub(crate) const ARREST_BONUS_FIRM_SNOW: f32 = 0.3;
pub(crate) const ARREST_BONUS_SOFT_SNOW: f32 = 0.2;
pub(crate) const ARREST_PENALTY_ICE: f32 = -0.2;
pub(crate) const ARREST_PENALTY_SCREE: f32 = -0.3;
pub(crate) const ARREST_SUCCESS_DAMPING: f32 = 0.3;
pub(crate) const ARREST_FAIL_CONTROL_FACTOR: f32 = 0.5;
pub(crate) const ARREST_FAIL_STABILITY_LOSS: f32 = 0.2;
pub(crate) const ARREST_FAIL_TUMBLE_CHANCE: f64 = 0.5;
pub(crate) const ARREST_COOLDOWN: f32 = 1.0;

// Controller ---------------------------------------------------------------
pub(crate) const LEAN_KEY_WEIGHT: f32 = 1.0;
pub(crate) const STRAFE_KEY_WEIGHT: f32 = 0.6;
pub(crate) const MAX_LEAN_FORCE: f32 = 8.0;
pub(crate) const LEAN_SPEED_FALLOFF: f32 = 0.02;
pub(crate) const MIN_LEAN_EFFECTIVENESS: f32 = 0.2;
pub(crate) const EDGE_BUILDUP_RATE: f32 = 2.0;
pub(crate) const EDGE_DECAY_RATE: f32 = 3.0;
pub(crate) const EDGE_FRICTION_BONUS: f32 = 2.0;
pub(crate) const EDGE_CONTROL_BONUS: f32 = 0.15;
pub(crate) const TUCK_FRICTION_MULTIPLIER: f32 = 0.8;
pub(crate) const COMMITMENT_WINDOW: f32 = 0.3;
pub(crate) const HESITATION_RATE: f32 = 0.5;
pub(crate) const HESITATION_RECOVERY: f32 = 0.25;
pub(crate) const MAX_HESITATION: f32 = 0.5;
pub(crate) const COMMITMENT_LEAN_THRESHOLD: f32 = 0.1;

// Exit zones ---------------------------------------------------------------
pub(crate) const EXIT_SCAN_INTERVAL: f32 = 0.2;
pub(crate) const EXIT_SCAN_DISTANCE: f32 = 50.0;
pub(crate) const EXIT_MIN_VIABLE_QUALITY: f32 = 0.3;
pub(crate) const EXIT_AHEAD_DOT: f32 = 0.3;
pub(crate) const EXIT_MAX_ANGLE: f32 = 45.0;
pub(crate) const EXIT_FAR_DISTANCE: f32 = 30.0;
pub(crate) const EXIT_FAR_MIN_CONTROL: f32 = 0.5;
pub(crate) const EXIT_PASSED_DISTANCE: f32 = 2.0;
pub(crate) const EXIT_APPROACH_DISTANCE: f32 = 15.0;
pub(crate) const EXIT_MISS_DISTANCE: f32 = 10.0;

// Spectrum -----------------------------------------------------------------
pub(crate) const CONTROL_SMOOTHING: f32 = 5.0;
pub(crate) const HISTORY_INTERVAL: f32 = 0.1;
pub(crate) const HISTORY_CAPACITY: usize = 50;
pub(crate) const TREND_DEADBAND: f32 = 0.05;
pub(crate) const TREND_NEGLIGIBLE: f32 = 0.001;
pub(crate) const WARNING_DELAY: f32 = 0.5;
pub(crate) const PANIC_THRESHOLD: f32 = 2.0;
pub(crate) const COMMITMENT_DURATION: f32 = 3.0;
pub(crate) const COMMITMENT_EXIT_MIN: f32 = 5.0;
pub(crate) const COMMITMENT_EXIT_MAX: f32 = 30.0;
pub(crate) const COMMITMENT_TREND: f32 = -0.3;
pub(crate) const TIME_TO_CHANGE_DEFAULT: f32 = 10.0;

// Fatality detection -------------------------------------------------------
pub(crate) const LETHAL_IMPACT_FORCE: f32 = 60.0;
pub(crate) const LETHAL_FALL_DISTANCE: f32 = 15.0;
pub(crate) const LETHAL_EXPOSURE: f32 = 1.0;
pub(crate) const LETHAL_INJURY_TOTAL: f32 = 1.5;
pub(crate) const PONR_FALL_RATIO: f32 = 0.6;
pub(crate) const PONR_EXPOSURE_RATIO: f32 = 0.85;
pub(crate) const PONR_INJURY_RATIO: f32 = 0.8;

// Fatal phases -------------------------------------------------------------
pub(crate) const PHASE_MOMENT_OF_ERROR: f32 = 1.5;
pub(crate) const PHASE_LOSS_OF_CONTROL: f32 = 2.5;
pub(crate) const PHASE_VANISHING: f32 = 3.0;
pub(crate) const PHASE_AFTERMATH: f32 = 4.0;
pub(crate) const PHASE_ACKNOWLEDGMENT: f32 = 5.0;
pub(crate) const PHASE_EPSILON: f32 = 1e-4;
