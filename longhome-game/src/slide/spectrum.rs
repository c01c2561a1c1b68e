//! Control-spectrum classifier: smoothing, trend, warning and panic timers,
//! commitment windows.
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::SpectrumConfig;
use crate::constants::{
    COMMITMENT_EXIT_MAX, COMMITMENT_EXIT_MIN, COMMITMENT_TREND, TIME_TO_CHANGE_DEFAULT,
    TREND_NEGLIGIBLE,
};
use crate::events::{EventBus, EventKind};
use crate::numbers::{finite_or_zero, mean, unit_clamp};
use crate::slide::ControlLevel;

/// Per-tick snapshot of the player's control, for feedback and UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSpectrum {
    pub raw: f32,
    pub smooth: f32,
    pub level: ControlLevel,
    pub time_in_level: f32,
    /// -1 deteriorating, 0 steady, 1 improving.
    pub trend: i8,
    pub trend_magnitude: f32,
    pub is_critical: bool,
    /// Position inside the current band, 0 at its lower edge.
    pub level_progress: f32,
    /// Seconds until the next band change at the current trend.
    pub time_to_change: f32,
    pub warning_active: bool,
    pub panic_active: bool,
}

impl Default for ControlSpectrum {
    fn default() -> Self {
        Self {
            raw: 1.0,
            smooth: 1.0,
            level: ControlLevel::Controlled,
            time_in_level: 0.0,
            trend: 0,
            trend_magnitude: 0.0,
            is_critical: false,
            level_progress: 1.0,
            time_to_change: TIME_TO_CHANGE_DEFAULT,
            warning_active: false,
            panic_active: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideStateManager {
    cfg: SpectrumConfig,
    raw: f32,
    smooth: f32,
    level: ControlLevel,
    time_in_level: f32,
    history: VecDeque<f32>,
    sample_timer: f32,
    trend: i8,
    trend_magnitude: f32,
    degraded_time: f32,
    unstable_time: f32,
    warning_active: bool,
    panic_active: bool,
    commitment_remaining: f32,
    commitment_active: bool,
}

impl SlideStateManager {
    #[must_use]
    pub fn new(cfg: SpectrumConfig) -> Self {
        let capacity = cfg.history_capacity;
        Self {
            cfg,
            raw: 1.0,
            smooth: 1.0,
            level: ControlLevel::Controlled,
            time_in_level: 0.0,
            history: VecDeque::with_capacity(capacity),
            sample_timer: 0.0,
            trend: 0,
            trend_magnitude: 0.0,
            degraded_time: 0.0,
            unstable_time: 0.0,
            warning_active: false,
            panic_active: false,
            commitment_remaining: 0.0,
            commitment_active: false,
        }
    }

    /// Start a new slide from an initial control value.
    pub fn reset(&mut self, control: f32) {
        let control = unit_clamp(control);
        self.raw = control;
        self.smooth = control;
        self.level = ControlLevel::from_control(control);
        self.time_in_level = 0.0;
        self.history.clear();
        self.sample_timer = 0.0;
        self.trend = 0;
        self.trend_magnitude = 0.0;
        self.degraded_time = 0.0;
        self.unstable_time = 0.0;
        self.warning_active = false;
        self.panic_active = false;
        self.commitment_remaining = 0.0;
        self.commitment_active = false;
    }

    /// Advance one tick with this tick's raw control and exit distance.
    pub fn update(
        &mut self,
        dt: f32,
        raw_control: f32,
        exit_zone_distance: f32,
        bus: &mut EventBus,
    ) -> ControlSpectrum {
        let dt = finite_or_zero(dt).max(0.0);
        self.raw = unit_clamp(raw_control);
        let blend = 1.0 - (-self.cfg.control_smoothing * dt).exp();
        self.smooth = unit_clamp(self.smooth + (self.raw - self.smooth) * blend);

        let level = ControlLevel::from_control(self.smooth);
        if level == self.level {
            self.time_in_level += dt;
        } else {
            bus.emit(EventKind::SpectrumLevelChanged {
                old_level: self.level,
                new_level: level,
            });
            self.level = level;
            self.time_in_level = 0.0;
        }

        self.sample_history(dt);
        self.update_trend();
        self.update_warning(dt, bus);
        self.update_panic(dt, bus);
        self.update_commitment(dt, exit_zone_distance, bus);
        self.snapshot()
    }

    fn sample_history(&mut self, dt: f32) {
        self.sample_timer += dt;
        if self.sample_timer < self.cfg.history_interval {
            return;
        }
        self.sample_timer -= self.cfg.history_interval;
        self.history.push_back(self.smooth);
        while self.history.len() > self.cfg.history_capacity {
            self.history.pop_front();
        }
    }

    fn update_trend(&mut self) {
        if self.history.len() < 4 {
            self.trend = 0;
            self.trend_magnitude = 0.0;
            return;
        }
        let samples = self.history.make_contiguous();
        let (older, recent) = samples.split_at(samples.len() / 2);
        self.trend_magnitude = finite_or_zero(mean(recent) - mean(older));
        self.trend = if self.trend_magnitude > self.cfg.trend_deadband {
            1
        } else if self.trend_magnitude < -self.cfg.trend_deadband {
            -1
        } else {
            0
        };
    }

    fn update_warning(&mut self, dt: f32, bus: &mut EventBus) {
        if self.level >= ControlLevel::Marginal {
            self.degraded_time += dt;
            if !self.warning_active && self.degraded_time > self.cfg.warning_delay {
                self.warning_active = true;
                bus.emit(EventKind::ControlWarningStarted);
            }
        } else {
            self.degraded_time = 0.0;
            if self.warning_active {
                self.warning_active = false;
                bus.emit(EventKind::ControlWarningEnded);
            }
        }
    }

    fn update_panic(&mut self, dt: f32, bus: &mut EventBus) {
        if self.level >= ControlLevel::Unstable {
            self.unstable_time += dt;
            if !self.panic_active && self.unstable_time >= self.cfg.panic_threshold {
                self.panic_active = true;
                bus.emit(EventKind::PanicStarted);
            }
        } else {
            self.unstable_time = 0.0;
            if self.panic_active {
                self.panic_active = false;
                bus.emit(EventKind::PanicEnded);
            }
        }
    }

    fn update_commitment(&mut self, dt: f32, exit_zone_distance: f32, bus: &mut EventBus) {
        let exit_in_range =
            exit_zone_distance > COMMITMENT_EXIT_MIN && exit_zone_distance < COMMITMENT_EXIT_MAX;
        let collapsing = self.trend_magnitude < COMMITMENT_TREND;
        if exit_in_range || collapsing {
            if !self.commitment_active {
                self.commitment_active = true;
                bus.emit(EventKind::CommitmentWindowOpened {
                    duration: self.cfg.commitment_duration,
                });
            }
            self.commitment_remaining = self.cfg.commitment_duration;
            return;
        }
        if self.commitment_active {
            self.commitment_remaining -= dt;
            if self.commitment_remaining <= 0.0 {
                self.commitment_active = false;
                self.commitment_remaining = 0.0;
                bus.emit(EventKind::CommitmentWindowClosed);
            }
        }
    }

    fn time_to_change(&self) -> f32 {
        if self.trend == 0 || self.trend_magnitude.abs() < TREND_NEGLIGIBLE {
            return TIME_TO_CHANGE_DEFAULT;
        }
        let (lower, upper) = self.level.bounds();
        let distance = match (self.trend, self.level) {
            (t, ControlLevel::Lost) if t < 0 => return TIME_TO_CHANGE_DEFAULT,
            (t, ControlLevel::Controlled) if t > 0 => return TIME_TO_CHANGE_DEFAULT,
            (t, _) if t < 0 => self.smooth - lower,
            _ => upper - self.smooth,
        };
        let rate = self.trend_magnitude.abs() / self.cfg.history_interval;
        finite_or_zero(distance.max(0.0) / rate)
    }

    /// Current classification without advancing time.
    #[must_use]
    pub fn snapshot(&self) -> ControlSpectrum {
        let (lower, upper) = self.level.bounds();
        let span = upper - lower;
        let level_progress = if span > 0.0 {
            unit_clamp((self.smooth - lower) / span)
        } else {
            0.0
        };
        ControlSpectrum {
            raw: self.raw,
            smooth: self.smooth,
            level: self.level,
            time_in_level: self.time_in_level,
            trend: self.trend,
            trend_magnitude: self.trend_magnitude,
            is_critical: self.level >= ControlLevel::Unstable,
            level_progress,
            time_to_change: self.time_to_change(),
            warning_active: self.warning_active,
            panic_active: self.panic_active,
        }
    }

    #[must_use]
    pub const fn commitment_active(&self) -> bool {
        self.commitment_active
    }

    #[must_use]
    pub const fn commitment_remaining(&self) -> f32 {
        self.commitment_remaining
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
