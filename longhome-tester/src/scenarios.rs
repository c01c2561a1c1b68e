use std::rc::Rc;

use glam::Vec3;
use longhome_game::fatal::ethics::ALWAYS_PROHIBITED;
use longhome_game::{
    DescentConfig, DescentSession, Event, EventKind, FatalTrigger, GridTerrain, MountainProgress,
    Player, SlideInput, SlideOutcome, SurfaceType, TerrainCell,
};

const DT: f32 = 1.0 / 64.0;
const TICKS_PER_SECOND: usize = 64;

/// What one scripted descent produced.
#[derive(Debug, Clone, Default)]
pub struct IterationSummary {
    pub seed: u64,
    pub ticks: usize,
    pub outcome: Option<SlideOutcome>,
    pub fatal_trigger: Option<FatalTrigger>,
    pub distance: f32,
    pub top_speed: f32,
    pub events: usize,
    pub denied_behaviors: usize,
}

impl IterationSummary {
    fn from_session(session: &DescentSession, seed: u64, ticks: usize, log: &[Event]) -> Self {
        let fatal_trigger = log.iter().find_map(|event| match event.kind {
            EventKind::FatalDetected { trigger } => Some(trigger),
            _ => None,
        });
        Self {
            seed,
            ticks,
            outcome: session.slide().last_outcome(),
            fatal_trigger,
            distance: session.progress().distance_slid,
            top_speed: session.progress().top_speed,
            events: log.len(),
            denied_behaviors: count(log, |kind| matches!(kind, EventKind::BehaviorDenied { .. })),
        }
    }

    /// Histogram label for the run's end state.
    pub fn outcome_label(&self) -> String {
        match (self.fatal_trigger, self.outcome) {
            (Some(trigger), _) => format!("fatal:{trigger}"),
            (None, Some(outcome)) => outcome.label().to_string(),
            (None, None) => "unresolved".to_string(),
        }
    }
}

pub type ScenarioFn = fn(&DescentConfig, u64) -> Result<IterationSummary, String>;

pub struct DescentScenario {
    pub key: &'static str,
    pub description: &'static str,
    pub run: ScenarioFn,
}

pub const SCENARIOS: [DescentScenario; 5] = [
    DescentScenario {
        key: "clean-stop",
        description: "Slow start on a gentle runout stops cleanly",
        run: clean_stop,
    },
    DescentScenario {
        key: "cliff-runout",
        description: "Uncontrolled ice slide into a cliff plays one fatal sequence",
        run: cliff_runout,
    },
    DescentScenario {
        key: "self-arrest",
        description: "Repeated self-arrest on firm snow ends the slide",
        run: self_arrest,
    },
    DescentScenario {
        key: "exit-zone",
        description: "An exit zone straight ahead is promoted and approached",
        run: exit_zone,
    },
    DescentScenario {
        key: "ethics-gate",
        description: "Prohibited presentation requests are denied through a fatal sequence",
        run: ethics_gate,
    },
];

pub fn get_scenario(key: &str) -> Option<&'static DescentScenario> {
    SCENARIOS.iter().find(|scenario| scenario.key == key)
}

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    SCENARIOS
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
}

fn count(log: &[Event], predicate: impl Fn(&EventKind) -> bool) -> usize {
    log.iter().filter(|event| predicate(&event.kind)).count()
}

fn new_session(
    config: &DescentConfig,
    seed: u64,
    terrain: GridTerrain,
    start: Vec3,
) -> DescentSession {
    let mut session = DescentSession::new(config, seed, MountainProgress::new("tester"))
        .with_player(Player::at(start));
    session.attach_terrain(Rc::new(terrain));
    session
}

/// Tick until `done` holds or `max_ticks` elapse; returns ticks run.
fn drive(
    session: &mut DescentSession,
    log: &mut Vec<Event>,
    max_ticks: usize,
    mut input: impl FnMut(usize) -> SlideInput,
    done: impl Fn(&DescentSession) -> bool,
) -> usize {
    let mut ticks = 0;
    while ticks < max_ticks && !done(session) {
        session.tick(DT, &input(ticks));
        log.extend(session.drain_events());
        ticks += 1;
    }
    ticks
}

fn settled(session: &DescentSession) -> bool {
    !session.slide().is_sliding() && !session.fatal().is_active()
}

fn clean_stop(config: &DescentConfig, seed: u64) -> Result<IterationSummary, String> {
    let terrain = GridTerrain::uniform(20, 60, 1.0, 15.0, Vec3::Z, SurfaceType::SnowFirm);
    let mut session = new_session(config, seed, terrain, Vec3::new(10.5, 0.0, 2.5));
    if let Some(player) = session.player_mut() {
        player.velocity = Vec3::new(0.0, 0.0, 0.3);
    }
    if !session.begin_slide() {
        return Err("slide refused to start".to_string());
    }
    let mut log = session.drain_events();
    let ticks = drive(
        &mut session,
        &mut log,
        5 * TICKS_PER_SECOND,
        |_| SlideInput::idle(),
        settled,
    );
    let summary = IterationSummary::from_session(&session, seed, ticks, &log);
    if summary.outcome != Some(SlideOutcome::CleanStop) {
        return Err(format!("expected clean stop, got {}", summary.outcome_label()));
    }
    if summary.fatal_trigger.is_some() {
        return Err("gentle runout triggered a fatality".to_string());
    }
    Ok(summary)
}

fn cliff_terrain() -> GridTerrain {
    GridTerrain::from_fn(20, 80, 1.0, |grid, position| {
        TerrainCell::new(
            grid,
            position,
            40.0,
            Vec3::Z,
            SurfaceType::Ice,
            (60.0 - position.z).max(0.0),
        )
    })
}

fn cliff_runout(config: &DescentConfig, seed: u64) -> Result<IterationSummary, String> {
    let mut session = new_session(config, seed, cliff_terrain(), Vec3::new(10.5, 0.0, 2.5));
    session.begin_slide();
    let mut log = session.drain_events();
    let ticks = drive(
        &mut session,
        &mut log,
        40 * TICKS_PER_SECOND,
        |_| SlideInput::idle(),
        |session| session.is_run_over() && !session.fatal().is_active(),
    );
    let summary = IterationSummary::from_session(&session, seed, ticks, &log);
    if summary.outcome != Some(SlideOutcome::TerminalRunout) {
        return Err(format!("expected terminal runout, got {}", summary.outcome_label()));
    }
    if summary.fatal_trigger != Some(FatalTrigger::TerminalSlide) {
        return Err(format!("expected terminal_slide fatality, got {:?}", summary.fatal_trigger));
    }
    let completed = count(&log, |kind| matches!(kind, EventKind::RunEndedWithFatality { .. }));
    if completed != 1 {
        return Err(format!("expected one completed sequence, saw {completed}"));
    }
    if !session.fatal().ethics().violations().is_empty() {
        return Err("scripted presentation tripped the ethics gate".to_string());
    }
    Ok(summary)
}

fn self_arrest(config: &DescentConfig, seed: u64) -> Result<IterationSummary, String> {
    let terrain = GridTerrain::uniform(20, 800, 1.0, 35.0, Vec3::Z, SurfaceType::SnowFirm);
    let mut session = new_session(config, seed, terrain, Vec3::new(10.5, 0.0, 2.5));
    session.begin_slide();
    let mut log = session.drain_events();
    // Press for one tick every 1.25 s, after a half-second run-up.
    let ticks = drive(
        &mut session,
        &mut log,
        30 * TICKS_PER_SECOND,
        |tick| SlideInput {
            arrest: tick >= TICKS_PER_SECOND / 2 && tick % 80 == 0,
            ..SlideInput::idle()
        },
        settled,
    );
    let summary = IterationSummary::from_session(&session, seed, ticks, &log);
    let out_of_bounds = log.iter().any(|event| match event.kind {
        EventKind::SelfArrestAttempted { chance, .. } => !(0.05..=0.95).contains(&chance),
        _ => false,
    });
    if out_of_bounds {
        return Err("arrest chance left [0.05, 0.95]".to_string());
    }
    match summary.outcome {
        Some(SlideOutcome::CleanStop | SlideOutcome::TumbleStop) => Ok(summary),
        _ => Err(format!(
            "arrest never ended the slide ({} attempts, {})",
            session.progress().self_arrests_attempted,
            summary.outcome_label()
        )),
    }
}

fn exit_zone(config: &DescentConfig, seed: u64) -> Result<IterationSummary, String> {
    let terrain = GridTerrain::from_fn(20, 60, 1.0, |grid, position| {
        let slope = if grid == (10, 25) { 10.0 } else { 35.0 };
        TerrainCell::new(grid, position, slope, Vec3::Z, SurfaceType::SnowFirm, 1000.0)
    });
    let mut session = new_session(config, seed, terrain, Vec3::new(10.5, 0.0, 2.5));
    session.begin_slide();
    let mut log = session.drain_events();
    let ticks = drive(
        &mut session,
        &mut log,
        3 * TICKS_PER_SECOND,
        |_| SlideInput::idle(),
        settled,
    );
    let summary = IterationSummary::from_session(&session, seed, ticks, &log);
    if count(&log, |kind| matches!(kind, EventKind::ExitZoneDetected { .. })) == 0 {
        return Err("exit zone ahead was never promoted".to_string());
    }
    if count(&log, |kind| matches!(kind, EventKind::ExitZoneApproached { .. })) != 1 {
        return Err("exit zone approach should be reported exactly once".to_string());
    }
    Ok(summary)
}

fn ethics_gate(config: &DescentConfig, seed: u64) -> Result<IterationSummary, String> {
    let terrain = GridTerrain::uniform(4, 4, 1.0, 10.0, Vec3::Z, SurfaceType::Rock);
    let mut session = new_session(config, seed, terrain, Vec3::new(1.5, 0.0, 1.5));
    session.report_fall(20.0);
    if !session.fatal().is_active() {
        return Err("lethal fall did not start a sequence".to_string());
    }
    let mut log = session.drain_events();
    let mut requested = 0;
    let mut ticks = 0;
    while session.fatal().is_active() && ticks < 20 * TICKS_PER_SECOND {
        for behavior in ALWAYS_PROHIBITED {
            requested += 1;
            if session.request_behavior(behavior) {
                return Err(format!(
                    "{behavior} allowed during {}",
                    session.fatal().phase()
                ));
            }
        }
        session.tick(DT, &SlideInput::idle());
        log.extend(session.drain_events());
        ticks += 1;
    }
    let summary = IterationSummary::from_session(&session, seed, ticks, &log);
    if summary.denied_behaviors != requested {
        return Err(format!(
            "{requested} prohibited requests but {} denials reported",
            summary.denied_behaviors
        ));
    }
    if session.fatal().ethics().violations().len() != requested {
        return Err("violation log does not match denials".to_string());
    }
    if count(&log, |kind| matches!(kind, EventKind::FatalSequenceComplete { .. })) != 1 {
        return Err("sequence did not complete exactly once".to_string());
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_passes_on_default_tuning() {
        let config = DescentConfig::default();
        for scenario in &SCENARIOS {
            for seed in [1, 1337] {
                let result = (scenario.run)(&config, seed);
                assert!(result.is_ok(), "{} seed {seed}: {:?}", scenario.key, result.err());
            }
        }
    }

    #[test]
    fn scenario_lookup_by_key() {
        assert!(get_scenario("cliff-runout").is_some());
        assert!(get_scenario("avalanche").is_none());
        assert_eq!(list_scenarios().count(), SCENARIOS.len());
    }
}
