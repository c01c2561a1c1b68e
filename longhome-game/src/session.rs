use std::rc::Rc;

use crate::config::DescentConfig;
use crate::events::{Event, EventBus, EventKind};
use crate::fatal::{
    Behavior, FatalEventManager, FatalTrigger, FatalityDetector, PresentationInstruction,
};
use crate::player::Player;
use crate::progress::{MountainProgress, SaveError};
use crate::rng::RngBundle;
use crate::slide::{ArrestResult, EffectRequest, SlideInput, SlideSystem};
use crate::terrain::TerrainQuery;

/// One climber on one mountain: binds the player, slide system, fatality
/// detector and fatal manager to a single tick pipeline.
#[derive(Debug)]
pub struct DescentSession {
    rngs: Rc<RngBundle>,
    player: Player,
    slide: SlideSystem,
    detector: FatalityDetector,
    fatal: FatalEventManager,
    bus: EventBus,
    progress: MountainProgress,
    run_over: bool,
}

impl DescentSession {
    #[must_use]
    pub fn new(config: &DescentConfig, seed: u64, progress: MountainProgress) -> Self {
        let rngs = Rc::new(RngBundle::from_user_seed(seed));
        Self {
            slide: SlideSystem::new(config, Rc::clone(&rngs)),
            detector: FatalityDetector::new(config.detector.clone()),
            fatal: FatalEventManager::new(config.fatal.clone()),
            rngs,
            player: Player::default(),
            bus: EventBus::new(),
            progress,
            run_over: false,
        }
    }

    pub fn attach_terrain(&mut self, terrain: Rc<dyn TerrainQuery>) {
        self.slide.attach_terrain(terrain);
    }

    #[must_use]
    pub fn with_player(mut self, player: Player) -> Self {
        self.player = player;
        self
    }

    #[must_use]
    pub const fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable player access; unavailable while the slide owns kinematics.
    pub fn player_mut(&mut self) -> Option<&mut Player> {
        if self.slide.is_sliding() {
            None
        } else {
            Some(&mut self.player)
        }
    }

    pub fn begin_slide(&mut self) -> bool {
        if self.run_over || self.fatal.is_active() {
            log::warn!("begin_slide ignored: run is over or a fatal sequence is playing");
            return false;
        }
        self.bus.begin_tick();
        let start = self.bus.len();
        let started = self.slide.begin_slide(&mut self.player, &mut self.bus);
        self.record_since(start);
        started
    }

    pub fn attempt_self_arrest(&mut self) -> ArrestResult {
        let start = self.bus.len();
        let injuries_before = self.player.body.injuries.len();
        let was_sliding = self.slide.is_sliding();
        let result = self.slide.attempt_self_arrest(&mut self.player, &mut self.bus);
        self.after_slide_step(start, injuries_before, was_sliding && !self.slide.is_sliding());
        self.record_since(start);
        result
    }

    /// Advance everything by one fixed step.
    pub fn tick(&mut self, dt: f32, input: &SlideInput) {
        self.bus.begin_tick();
        let start = self.bus.len();
        let injuries_before = self.player.body.injuries.len();
        let was_sliding = self.slide.is_sliding();

        self.slide.physics_update(dt, &mut self.player, input, &mut self.bus);
        self.after_slide_step(start, injuries_before, was_sliding && !self.slide.is_sliding());

        if !self.fatal.is_active()
            && !self.run_over
            && let Some(trigger) = self.detector.evaluate_body(&self.player.body, &mut self.bus)
        {
            self.start_fatal(trigger);
        }
        if !self.run_over {
            match self.detector.point_of_no_return() {
                Some(trigger) => self.fatal.notify_point_of_no_return(trigger),
                None => {
                    self.fatal.clear_point_of_no_return();
                }
            }
        }
        self.fatal.update(dt, &mut self.bus);
        self.record_since(start);
    }

    fn after_slide_step(&mut self, start: usize, injuries_before: usize, slide_ended: bool) {
        let new_injuries = self.player.body.injuries.len().saturating_sub(injuries_before);
        self.progress.record_injuries(new_injuries);

        let slide_point_of_no_return = self
            .bus
            .pending()
            .get(start..)
            .unwrap_or(&[])
            .iter()
            .any(|event| matches!(event.kind, EventKind::SlidePointOfNoReturn { .. }));
        if slide_point_of_no_return {
            self.detector.predict(FatalTrigger::TerminalSlide, &mut self.bus);
        }

        if !slide_ended {
            return;
        }
        self.progress.record_slide_distance(self.slide.state().distance);
        let Some(outcome) = self.slide.last_outcome() else {
            return;
        };
        let had_exit = self.slide.exit_detector().has_viable_exit();
        match self.detector.report_slide_outcome(outcome, had_exit) {
            Some(trigger) => self.start_fatal(trigger),
            None => {
                self.detector.clear_prediction(FatalTrigger::TerminalSlide);
            }
        }
    }

    /// A sequence takes the player away from whatever the slide was doing.
    fn start_fatal(&mut self, trigger: FatalTrigger) {
        if self.fatal.trigger(trigger, &mut self.bus) {
            self.run_over = true;
            self.slide.interrupt_slide(&mut self.player);
        }
    }

    fn record_since(&mut self, start: usize) {
        for event in self.bus.pending().get(start..).unwrap_or(&[]) {
            self.progress.record_event(&event.kind);
        }
    }

    /// External collision report.
    pub fn report_impact(&mut self, force: f32) {
        if let Some(trigger) = self.detector.report_impact(force) {
            self.start_fatal(trigger);
        }
    }

    /// External fall-height report.
    pub fn report_fall(&mut self, distance: f32) {
        if let Some(trigger) = self.detector.report_fall(distance, &mut self.bus) {
            self.start_fatal(trigger);
        }
    }

    /// External report that a fall ended short of a lethal height.
    pub fn report_landing(&mut self) {
        self.detector.clear_prediction(FatalTrigger::Fall);
    }

    pub fn report_avalanche(&mut self) {
        if let Some(trigger) = self.detector.report_avalanche() {
            self.start_fatal(trigger);
        }
    }

    pub fn report_crevasse(&mut self) {
        if let Some(trigger) = self.detector.report_crevasse() {
            self.start_fatal(trigger);
        }
    }

    /// Gate a presentation action against the active fatal phase.
    pub fn request_behavior(&mut self, behavior: Behavior) -> bool {
        self.fatal.request_behavior(behavior, &mut self.bus)
    }

    /// Counters for persistence, refused while a slide or fatal sequence is live.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] when the session is not at a valid save point.
    pub fn progress_snapshot(&self) -> Result<MountainProgress, SaveError> {
        if self.slide.is_sliding() {
            log::warn!("save refused: slide in progress");
            return Err(SaveError::SlideInProgress);
        }
        if self.fatal.is_active() {
            log::warn!("save refused: fatal sequence active");
            return Err(SaveError::FatalSequenceActive);
        }
        Ok(self.progress.clone())
    }

    /// Abort any live slide or fatal sequence so a save can be taken.
    pub fn abort_for_save(&mut self) {
        self.slide.abort_slide(&mut self.player);
        self.fatal.abort();
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.bus.drain()
    }

    #[must_use]
    pub fn pending_events(&self) -> &[Event] {
        self.bus.pending()
    }

    pub fn drain_effects(&mut self) -> Vec<EffectRequest> {
        self.slide.drain_effects()
    }

    pub fn drain_instructions(&mut self) -> Vec<PresentationInstruction> {
        self.fatal.drain_instructions()
    }

    #[must_use]
    pub const fn slide(&self) -> &SlideSystem {
        &self.slide
    }

    #[must_use]
    pub const fn fatal(&self) -> &FatalEventManager {
        &self.fatal
    }

    #[must_use]
    pub const fn detector(&self) -> &FatalityDetector {
        &self.detector
    }

    #[must_use]
    pub const fn progress(&self) -> &MountainProgress {
        &self.progress
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.rngs.seed()
    }

    /// Whether the run has ended in a fatality.
    #[must_use]
    pub const fn is_run_over(&self) -> bool {
        self.run_over
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fatal::FatalPhase;
    use crate::fatal::ethics::CameraAction;
    use crate::terrain::{GridTerrain, SurfaceType};
    use glam::Vec3;

    const DT: f32 = 1.0 / 64.0;

    fn session_on(terrain: GridTerrain) -> DescentSession {
        let mut session =
            DescentSession::new(&DescentConfig::default(), 11, MountainProgress::new("test"));
        session.attach_terrain(Rc::new(terrain));
        session
    }

    #[test]
    fn saves_are_refused_mid_slide() {
        let terrain = GridTerrain::uniform(20, 200, 1.0, 35.0, Vec3::Z, SurfaceType::SnowFirm);
        let mut session = session_on(terrain).with_player(Player::at(Vec3::new(10.5, 0.0, 2.5)));
        assert!(session.begin_slide());
        assert_eq!(session.progress_snapshot(), Err(SaveError::SlideInProgress));
        assert!(session.player_mut().is_none());
        session.abort_for_save();
        let progress = session.progress_snapshot().expect("valid save point");
        assert_eq!(progress.slides_started, 1);
    }

    #[test]
    fn impact_starts_a_sequence_that_blocks_saves() {
        let terrain = GridTerrain::uniform(4, 4, 1.0, 10.0, Vec3::Z, SurfaceType::Rock);
        let mut session = session_on(terrain);
        session.report_impact(80.0);
        assert_eq!(session.fatal().phase(), FatalPhase::MomentOfError);
        assert_eq!(
            session.progress_snapshot(),
            Err(SaveError::FatalSequenceActive)
        );
        assert!(!session.request_behavior(Behavior::Camera(CameraAction::ZoomIn)));
        assert!(!session.begin_slide());
        for _ in 0..(16 * 64) {
            session.tick(DT, &SlideInput::idle());
        }
        assert_eq!(session.fatal().phase(), FatalPhase::None);
        assert!(session.is_run_over());
        let progress = session.progress_snapshot().expect("sequence finished");
        assert_eq!(progress.fatalities, 1);
    }

    fn warnings(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|event| matches!(event.kind, EventKind::PointOfNoReturnReached { .. }))
            .count()
    }

    #[test]
    fn every_near_miss_gets_its_own_warning() {
        let terrain = GridTerrain::uniform(4, 4, 1.0, 10.0, Vec3::Z, SurfaceType::Rock);
        let mut session = session_on(terrain);

        session.report_fall(10.0);
        session.tick(DT, &SlideInput::idle());
        assert_eq!(warnings(&session.drain_events()), 1);
        assert_eq!(session.drain_instructions().len(), 1);
        session.report_landing();
        for _ in 0..640 {
            session.tick(DT, &SlideInput::idle());
        }
        session.drain_events();
        assert_eq!(session.detector().point_of_no_return(), None);
        assert_eq!(session.fatal().point_of_no_return(), None);

        session.report_fall(12.0);
        session.tick(DT, &SlideInput::idle());
        assert_eq!(warnings(&session.drain_events()), 1);
        assert_eq!(session.drain_instructions().len(), 1);
        assert!(!session.is_run_over());
    }

    #[test]
    fn fatal_trigger_mid_slide_freezes_the_player() {
        let terrain = GridTerrain::uniform(20, 400, 1.0, 35.0, Vec3::Z, SurfaceType::SnowFirm);
        let mut session = session_on(terrain).with_player(Player::at(Vec3::new(10.5, 0.0, 2.5)));
        assert!(session.begin_slide());
        for _ in 0..32 {
            session.tick(DT, &SlideInput::idle());
        }
        assert!(session.slide().is_sliding());
        session.drain_effects();

        session.report_impact(80.0);
        assert_eq!(session.fatal().phase(), FatalPhase::MomentOfError);
        assert!(!session.slide().is_sliding());
        let frozen = session.player().clone();
        for _ in 0..(8 * 64) {
            session.tick(DT, &SlideInput::idle());
        }
        assert_eq!(session.player(), &frozen);
        assert_eq!(frozen.movement_state, crate::player::MovementState::Falling);
        assert_eq!(session.slide().last_outcome(), None);
        assert!(session.drain_effects().is_empty());
        assert!(session.fatal().ethics().violations().is_empty());
    }
}
