//! Tuning tables for the descent core.
//!
//! Every field defaults to the reviewed value in [`crate::constants`]; JSON
//! overrides may be partial.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    AIR_RESISTANCE, ARREST_COOLDOWN, COMMITMENT_DURATION, COMMITMENT_WINDOW, CONTROL_SMOOTHING,
    EDGE_BUILDUP_RATE, EDGE_CONTROL_BONUS, EDGE_DECAY_RATE, EDGE_FRICTION_BONUS,
    EXIT_APPROACH_DISTANCE, EXIT_ENTER_DISTANCE, EXIT_MAX_ANGLE, EXIT_MIN_VIABLE_QUALITY,
    EXIT_MISS_DISTANCE, EXIT_PASSED_DISTANCE, EXIT_SCAN_DISTANCE, EXIT_SCAN_INTERVAL, GRAVITY,
    HESITATION_RATE, HESITATION_RECOVERY, HISTORY_CAPACITY, HISTORY_INTERVAL, INTO_SLOPE_FACTOR,
    LEAN_SPEED_FALLOFF, LETHAL_EXPOSURE, LETHAL_FALL_DISTANCE, LETHAL_IMPACT_FORCE,
    LETHAL_INJURY_TOTAL, MAX_HESITATION, MAX_LEAN_FORCE, MIN_CONTROL, MIN_SLIDE_ANGLE,
    MIN_START_SPEED, PANIC_THRESHOLD, PHASE_ACKNOWLEDGMENT, PHASE_AFTERMATH,
    PHASE_LOSS_OF_CONTROL, PHASE_MOMENT_OF_ERROR, PHASE_VANISHING, PONR_EXPOSURE_RATIO,
    PONR_FALL_RATIO, PONR_INJURY_RATIO, TERMINAL_SPEED, TREND_DEADBAND, TUCK_FRICTION_MULTIPLIER,
    WARNING_DELAY,
};
use crate::fatal::FatalPhase;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("config parse error: {message}")]
    Parse { message: String },
    #[error("{field} must be greater than {min:.3} (got {value:.3})")]
    MinViolation {
        field: &'static str,
        min: f32,
        value: f32,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("history capacity must hold at least {min} samples (got {value})")]
    HistoryCapacity { min: usize, value: usize },
}

fn require_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::MinViolation {
            field,
            min: 0.0,
            value,
        })
    }
}

fn require_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        })
    }
}

/// Slide integrator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    pub gravity: f32,
    pub terminal_speed: f32,
    pub air_resistance: f32,
    pub min_control: f32,
    /// Slope (degrees) below which slow slides come to rest.
    pub min_slide_angle: f32,
    /// Entry speed floor; slower starts get a push downhill.
    pub min_start_speed: f32,
    pub into_slope_factor: f32,
    pub arrest_cooldown: f32,
}

impl Default for SlideConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            terminal_speed: TERMINAL_SPEED,
            air_resistance: AIR_RESISTANCE,
            min_control: MIN_CONTROL,
            min_slide_angle: MIN_SLIDE_ANGLE,
            min_start_speed: MIN_START_SPEED,
            into_slope_factor: INTO_SLOPE_FACTOR,
            arrest_cooldown: ARREST_COOLDOWN,
        }
    }
}

impl SlideConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("slide.gravity", self.gravity)?;
        require_positive("slide.terminal_speed", self.terminal_speed)?;
        require_range("slide.air_resistance", self.air_resistance, 0.0, 1.0)?;
        require_range("slide.min_control", self.min_control, 0.0, 1.0)?;
        require_range("slide.min_slide_angle", self.min_slide_angle, 0.0, 90.0)?;
        require_range("slide.into_slope_factor", self.into_slope_factor, 0.0, 1.0)?;
        Ok(())
    }
}

/// Player influence tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub max_lean_force: f32,
    pub lean_speed_falloff: f32,
    pub edge_buildup_rate: f32,
    pub edge_decay_rate: f32,
    pub edge_friction_bonus: f32,
    pub edge_control_bonus: f32,
    pub tuck_friction_multiplier: f32,
    pub commitment_window: f32,
    pub hesitation_rate: f32,
    pub hesitation_recovery: f32,
    pub max_hesitation: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_lean_force: MAX_LEAN_FORCE,
            lean_speed_falloff: LEAN_SPEED_FALLOFF,
            edge_buildup_rate: EDGE_BUILDUP_RATE,
            edge_decay_rate: EDGE_DECAY_RATE,
            edge_friction_bonus: EDGE_FRICTION_BONUS,
            edge_control_bonus: EDGE_CONTROL_BONUS,
            tuck_friction_multiplier: TUCK_FRICTION_MULTIPLIER,
            commitment_window: COMMITMENT_WINDOW,
            hesitation_rate: HESITATION_RATE,
            hesitation_recovery: HESITATION_RECOVERY,
            max_hesitation: MAX_HESITATION,
        }
    }
}

impl ControllerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("controller.edge_buildup_rate", self.edge_buildup_rate)?;
        require_positive("controller.edge_decay_rate", self.edge_decay_rate)?;
        require_positive("controller.commitment_window", self.commitment_window)?;
        require_range(
            "controller.tuck_friction_multiplier",
            self.tuck_friction_multiplier,
            0.0,
            1.0,
        )?;
        require_range("controller.max_hesitation", self.max_hesitation, 0.0, 1.0)?;
        Ok(())
    }
}

/// Exit-zone scan tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitZoneConfig {
    pub scan_interval: f32,
    pub scan_distance: f32,
    pub min_viable_quality: f32,
    /// Maximum off-axis angle (degrees) for a viable zone.
    pub max_angle: f32,
    pub approach_distance: f32,
    pub entered_distance: f32,
    pub missed_distance: f32,
    pub passed_distance: f32,
}

impl Default for ExitZoneConfig {
    fn default() -> Self {
        Self {
            scan_interval: EXIT_SCAN_INTERVAL,
            scan_distance: EXIT_SCAN_DISTANCE,
            min_viable_quality: EXIT_MIN_VIABLE_QUALITY,
            max_angle: EXIT_MAX_ANGLE,
            approach_distance: EXIT_APPROACH_DISTANCE,
            entered_distance: EXIT_ENTER_DISTANCE,
            missed_distance: EXIT_MISS_DISTANCE,
            passed_distance: EXIT_PASSED_DISTANCE,
        }
    }
}

impl ExitZoneConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("exit_zones.scan_interval", self.scan_interval)?;
        require_positive("exit_zones.scan_distance", self.scan_distance)?;
        require_range(
            "exit_zones.min_viable_quality",
            self.min_viable_quality,
            0.0,
            1.0,
        )?;
        require_range("exit_zones.max_angle", self.max_angle, 0.0, 90.0)?;
        Ok(())
    }
}

/// Control-spectrum classifier tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub control_smoothing: f32,
    pub history_interval: f32,
    pub history_capacity: usize,
    pub trend_deadband: f32,
    pub warning_delay: f32,
    pub panic_threshold: f32,
    pub commitment_duration: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            control_smoothing: CONTROL_SMOOTHING,
            history_interval: HISTORY_INTERVAL,
            history_capacity: HISTORY_CAPACITY,
            trend_deadband: TREND_DEADBAND,
            warning_delay: WARNING_DELAY,
            panic_threshold: PANIC_THRESHOLD,
            commitment_duration: COMMITMENT_DURATION,
        }
    }
}

impl SpectrumConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("spectrum.control_smoothing", self.control_smoothing)?;
        require_positive("spectrum.history_interval", self.history_interval)?;
        require_positive("spectrum.warning_delay", self.warning_delay)?;
        require_positive("spectrum.panic_threshold", self.panic_threshold)?;
        require_positive("spectrum.commitment_duration", self.commitment_duration)?;
        if self.history_capacity < 4 {
            return Err(ConfigError::HistoryCapacity {
                min: 4,
                value: self.history_capacity,
            });
        }
        Ok(())
    }
}

/// Lethal thresholds watched by the fatality detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub lethal_impact_force: f32,
    pub lethal_fall_distance: f32,
    pub lethal_exposure: f32,
    pub lethal_injury_total: f32,
    pub ponr_fall_ratio: f32,
    pub ponr_exposure_ratio: f32,
    pub ponr_injury_ratio: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lethal_impact_force: LETHAL_IMPACT_FORCE,
            lethal_fall_distance: LETHAL_FALL_DISTANCE,
            lethal_exposure: LETHAL_EXPOSURE,
            lethal_injury_total: LETHAL_INJURY_TOTAL,
            ponr_fall_ratio: PONR_FALL_RATIO,
            ponr_exposure_ratio: PONR_EXPOSURE_RATIO,
            ponr_injury_ratio: PONR_INJURY_RATIO,
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("detector.lethal_impact_force", self.lethal_impact_force)?;
        require_positive("detector.lethal_fall_distance", self.lethal_fall_distance)?;
        require_positive("detector.lethal_exposure", self.lethal_exposure)?;
        require_positive("detector.lethal_injury_total", self.lethal_injury_total)?;
        require_range("detector.ponr_fall_ratio", self.ponr_fall_ratio, 0.0, 1.0)?;
        require_range("detector.ponr_exposure_ratio", self.ponr_exposure_ratio, 0.0, 1.0)?;
        require_range("detector.ponr_injury_ratio", self.ponr_injury_ratio, 0.0, 1.0)?;
        Ok(())
    }
}

/// Fixed duration (seconds) of each fatal phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatalConfig {
    pub moment_of_error: f32,
    pub loss_of_control: f32,
    pub vanishing: f32,
    pub aftermath: f32,
    pub acknowledgment: f32,
}

impl Default for FatalConfig {
    fn default() -> Self {
        Self {
            moment_of_error: PHASE_MOMENT_OF_ERROR,
            loss_of_control: PHASE_LOSS_OF_CONTROL,
            vanishing: PHASE_VANISHING,
            aftermath: PHASE_AFTERMATH,
            acknowledgment: PHASE_ACKNOWLEDGMENT,
        }
    }
}

impl FatalConfig {
    /// Duration of a phase; zero for `None`.
    #[must_use]
    pub const fn duration(&self, phase: FatalPhase) -> f32 {
        match phase {
            FatalPhase::None => 0.0,
            FatalPhase::MomentOfError => self.moment_of_error,
            FatalPhase::LossOfControl => self.loss_of_control,
            FatalPhase::Vanishing => self.vanishing,
            FatalPhase::Aftermath => self.aftermath,
            FatalPhase::Acknowledgment => self.acknowledgment,
        }
    }

    /// Length of the whole sequence.
    #[must_use]
    pub fn total(&self) -> f32 {
        FatalPhase::SEQUENCE
            .iter()
            .map(|phase| self.duration(*phase))
            .sum()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require_positive("fatal.moment_of_error", self.moment_of_error)?;
        require_positive("fatal.loss_of_control", self.loss_of_control)?;
        require_positive("fatal.vanishing", self.vanishing)?;
        require_positive("fatal.aftermath", self.aftermath)?;
        require_positive("fatal.acknowledgment", self.acknowledgment)?;
        Ok(())
    }
}

/// Complete tuning for a descent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DescentConfig {
    pub slide: SlideConfig,
    pub controller: ControllerConfig,
    pub exit_zones: ExitZoneConfig,
    pub spectrum: SpectrumConfig,
    pub detector: DetectorConfig,
    pub fatal: FatalConfig,
}

impl DescentConfig {
    /// Parse (possibly partial) JSON and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or a value is out of range.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every table's invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.slide.validate()?;
        self.controller.validate()?;
        self.exit_zones.validate()?;
        self.spectrum.validate()?;
        self.detector.validate()?;
        self.fatal.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_match_constants() {
        let cfg = DescentConfig::default();
        assert!(cfg.validate().is_ok());
        assert!((cfg.slide.terminal_speed - 25.0).abs() < f32::EPSILON);
        assert!((cfg.exit_zones.scan_interval - 0.2).abs() < f32::EPSILON);
        assert_eq!(cfg.spectrum.history_capacity, 50);
        assert!((cfg.fatal.total() - 16.0).abs() < 1e-5);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = DescentConfig::from_json(r#"{"slide": {"terminal_speed": 30.0}}"#)
            .expect("valid override");
        assert!((cfg.slide.terminal_speed - 30.0).abs() < f32::EPSILON);
        assert!((cfg.slide.gravity - 9.8).abs() < f32::EPSILON);
        assert_eq!(cfg.fatal, FatalConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = DescentConfig::from_json(r#"{"fatal": {"vanishing": 0.0}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MinViolation {
                field: "fatal.vanishing",
                ..
            }
        ));
        let err = DescentConfig::from_json(r#"{"spectrum": {"history_capacity": 2}}"#).unwrap_err();
        assert_eq!(err, ConfigError::HistoryCapacity { min: 4, value: 2 });
        assert!(matches!(
            DescentConfig::from_json("not json"),
            Err(ConfigError::Parse { .. })
        ));
    }
}
