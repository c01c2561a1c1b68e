//! Watches physical signals for lethal thresholds.
use crate::config::DetectorConfig;
use crate::events::{EventBus, EventKind};
use crate::fatal::FatalTrigger;
use crate::numbers::finite_or_zero;
use crate::player::BodyState;
use crate::slide::SlideOutcome;

/// Latches the first lethal signal and predicts the point of no return.
///
/// Detection only reports; starting the sequence is the fatal manager's job.
#[derive(Debug, Clone, PartialEq)]
pub struct FatalityDetector {
    cfg: DetectorConfig,
    triggered: Option<FatalTrigger>,
    point_of_no_return: Option<FatalTrigger>,
}

impl FatalityDetector {
    #[must_use]
    pub const fn new(cfg: DetectorConfig) -> Self {
        Self {
            cfg,
            triggered: None,
            point_of_no_return: None,
        }
    }

    pub const fn reset(&mut self) {
        self.triggered = None;
        self.point_of_no_return = None;
    }

    #[must_use]
    pub const fn triggered(&self) -> Option<FatalTrigger> {
        self.triggered
    }

    #[must_use]
    pub const fn point_of_no_return(&self) -> Option<FatalTrigger> {
        self.point_of_no_return
    }

    fn fire(&mut self, trigger: FatalTrigger) -> Option<FatalTrigger> {
        if self.triggered.is_some() {
            return None;
        }
        log::debug!("lethal signal: {trigger}");
        self.triggered = Some(trigger);
        Some(trigger)
    }

    /// Withdraw a prediction once the danger it named has been survived.
    pub fn clear_prediction(&mut self, trigger: FatalTrigger) -> bool {
        if self.triggered.is_some() || self.point_of_no_return != Some(trigger) {
            return false;
        }
        log::debug!("point of no return for {trigger} withdrawn");
        self.point_of_no_return = None;
        true
    }

    /// Announce the point of no return once per episode.
    pub fn predict(&mut self, trigger: FatalTrigger, bus: &mut EventBus) -> bool {
        if self.triggered.is_some() || self.point_of_no_return.is_some() {
            return false;
        }
        self.point_of_no_return = Some(trigger);
        bus.emit(EventKind::PointOfNoReturnReached { trigger });
        true
    }

    pub fn report_impact(&mut self, force: f32) -> Option<FatalTrigger> {
        if finite_or_zero(force) >= self.cfg.lethal_impact_force {
            self.fire(FatalTrigger::Impact)
        } else {
            None
        }
    }

    /// Report the current height of an ongoing fall.
    pub fn report_fall(&mut self, distance: f32, bus: &mut EventBus) -> Option<FatalTrigger> {
        let distance = finite_or_zero(distance);
        if distance >= self.cfg.lethal_fall_distance {
            return self.fire(FatalTrigger::Fall);
        }
        if distance >= self.cfg.lethal_fall_distance * self.cfg.ponr_fall_ratio {
            self.predict(FatalTrigger::Fall, bus);
        }
        None
    }

    pub fn report_avalanche(&mut self) -> Option<FatalTrigger> {
        self.fire(FatalTrigger::Avalanche)
    }

    pub fn report_crevasse(&mut self) -> Option<FatalTrigger> {
        self.fire(FatalTrigger::Crevasse)
    }

    /// A terminal runout with nowhere to stop is fatal.
    pub fn report_slide_outcome(
        &mut self,
        outcome: SlideOutcome,
        had_viable_exit: bool,
    ) -> Option<FatalTrigger> {
        if outcome == SlideOutcome::TerminalRunout && !had_viable_exit {
            self.fire(FatalTrigger::TerminalSlide)
        } else {
            None
        }
    }

    /// Check exposure and injury load.
    pub fn evaluate_body(&mut self, body: &BodyState, bus: &mut EventBus) -> Option<FatalTrigger> {
        let exposure = finite_or_zero(body.cold_exposure);
        let injury = finite_or_zero(body.total_injury());
        if exposure >= self.cfg.lethal_exposure {
            return self.fire(FatalTrigger::Exposure);
        }
        if injury >= self.cfg.lethal_injury_total {
            return self.fire(FatalTrigger::AccumulatedInjury);
        }
        let exposure_warning =
            exposure >= self.cfg.lethal_exposure * self.cfg.ponr_exposure_ratio;
        let injury_warning =
            injury >= self.cfg.lethal_injury_total * self.cfg.ponr_injury_ratio;
        if exposure_warning {
            self.predict(FatalTrigger::Exposure, bus);
        } else if injury_warning {
            self.predict(FatalTrigger::AccumulatedInjury, bus);
        }
        // Recovery (warming up, treatment) lifts the warning.
        if !exposure_warning {
            self.clear_prediction(FatalTrigger::Exposure);
        }
        if !injury_warning {
            self.clear_prediction(FatalTrigger::AccumulatedInjury);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_trigger_latches() {
        let mut detector = FatalityDetector::new(DetectorConfig::default());
        assert_eq!(detector.report_impact(30.0), None);
        assert_eq!(detector.report_impact(60.0), Some(FatalTrigger::Impact));
        assert_eq!(detector.report_avalanche(), None);
        assert_eq!(detector.triggered(), Some(FatalTrigger::Impact));
        detector.reset();
        assert_eq!(detector.report_crevasse(), Some(FatalTrigger::Crevasse));
    }

    #[test]
    fn falls_predict_before_they_kill() {
        let mut detector = FatalityDetector::new(DetectorConfig::default());
        let mut bus = EventBus::new();
        assert_eq!(detector.report_fall(5.0, &mut bus), None);
        assert!(bus.is_empty());
        assert_eq!(detector.report_fall(10.0, &mut bus), None);
        assert_eq!(detector.report_fall(12.0, &mut bus), None);
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::PointOfNoReturnReached { .. })),
            1
        );
        assert_eq!(detector.report_fall(15.0, &mut bus), Some(FatalTrigger::Fall));
    }

    #[test]
    fn survived_danger_can_be_predicted_again() {
        let mut detector = FatalityDetector::new(DetectorConfig::default());
        let mut bus = EventBus::new();
        detector.report_fall(10.0, &mut bus);
        assert!(!detector.clear_prediction(FatalTrigger::TerminalSlide));
        assert!(detector.clear_prediction(FatalTrigger::Fall));
        assert_eq!(detector.point_of_no_return(), None);
        detector.report_fall(12.0, &mut bus);
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::PointOfNoReturnReached { .. })),
            2
        );

        let mut body = BodyState::default();
        body.add_cold_exposure(0.9);
        let mut detector = FatalityDetector::new(DetectorConfig::default());
        detector.evaluate_body(&body, &mut bus);
        assert_eq!(detector.point_of_no_return(), Some(FatalTrigger::Exposure));
        body.cold_exposure = 0.2;
        detector.evaluate_body(&body, &mut bus);
        assert_eq!(detector.point_of_no_return(), None);
    }

    #[test]
    fn runout_is_fatal_only_without_an_exit() {
        let mut detector = FatalityDetector::new(DetectorConfig::default());
        assert_eq!(detector.report_slide_outcome(SlideOutcome::TerminalRunout, true), None);
        assert_eq!(detector.report_slide_outcome(SlideOutcome::TumbleStop, false), None);
        assert_eq!(
            detector.report_slide_outcome(SlideOutcome::TerminalRunout, false),
            Some(FatalTrigger::TerminalSlide)
        );
    }

    #[test]
    fn body_thresholds() {
        let mut detector = FatalityDetector::new(DetectorConfig::default());
        let mut bus = EventBus::new();
        let mut body = BodyState::default();
        body.add_injury(0.7);
        body.add_injury(0.6);
        assert_eq!(detector.evaluate_body(&body, &mut bus), None);
        assert_eq!(detector.point_of_no_return(), Some(FatalTrigger::AccumulatedInjury));
        body.add_injury(0.3);
        assert_eq!(
            detector.evaluate_body(&body, &mut bus),
            Some(FatalTrigger::AccumulatedInjury)
        );

        let mut detector = FatalityDetector::new(DetectorConfig::default());
        body = BodyState::default();
        body.add_cold_exposure(1.2);
        assert_eq!(detector.evaluate_body(&body, &mut bus), Some(FatalTrigger::Exposure));
    }
}
