//! Scans the terrain ahead of a slider for places to stop.
use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::ExitZoneConfig;
use crate::constants::{EXIT_AHEAD_DOT, EXIT_FAR_DISTANCE, EXIT_FAR_MIN_CONTROL};
use crate::events::{EventBus, EventKind};
use crate::numbers::flatten;
use crate::slide::SlideState;
use crate::terrain::{SurfaceType, TerrainCell, TerrainQuery};

/// A candidate stopping zone relative to the slider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitZone {
    /// Grid coordinates of the terrain cell.
    pub id: (i32, i32),
    pub position: Vec3,
    pub quality: f32,
    pub distance: f32,
    /// Degrees off the direction of travel.
    pub angle: f32,
    pub slope: f32,
    pub surface: SurfaceType,
    pub is_viable: bool,
    pub time_to_reach: f32,
    #[serde(skip)]
    heading_dot: f32,
}

impl ExitZone {
    fn from_cell(cell: &TerrainCell) -> Self {
        Self {
            id: cell.grid,
            position: cell.position,
            quality: cell.exit_zone_quality,
            distance: 0.0,
            angle: 0.0,
            slope: cell.slope_angle,
            surface: cell.surface_type,
            is_viable: false,
            time_to_reach: 0.0,
            heading_dot: 1.0,
        }
    }

    /// Ranking score: nearer and better zones first.
    #[must_use]
    pub fn score(&self) -> f32 {
        self.quality / (self.distance + 1.0)
    }

    fn recompute(
        &mut self,
        cfg: &ExitZoneConfig,
        origin: Vec3,
        heading: Vec3,
        speed: f32,
        control: f32,
    ) {
        let offset = flatten(self.position) - flatten(origin);
        self.distance = offset.length();
        self.heading_dot = if self.distance < 0.01 {
            1.0
        } else {
            (offset / self.distance).dot(heading)
        };
        self.angle = self.heading_dot.clamp(-1.0, 1.0).acos().to_degrees();
        self.time_to_reach = self.distance / speed.max(0.1);
        let off_axis = self.angle > cfg.max_angle;
        let too_far_for_control =
            self.distance > EXIT_FAR_DISTANCE && control < EXIT_FAR_MIN_CONTROL;
        self.is_viable = !off_axis && !too_far_for_control;
    }
}

/// Tracks the best reachable exit zone during a slide.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitZoneDetector {
    cfg: ExitZoneConfig,
    scan_timer: f32,
    scans: u32,
    tracked: SmallVec<[ExitZone; 8]>,
    best: Option<ExitZone>,
    approached: Option<(i32, i32)>,
    entered: Option<(i32, i32)>,
    announced_none: bool,
}

impl ExitZoneDetector {
    #[must_use]
    pub fn new(cfg: ExitZoneConfig) -> Self {
        Self {
            cfg,
            scan_timer: 0.0,
            scans: 0,
            tracked: SmallVec::new(),
            best: None,
            approached: None,
            entered: None,
            announced_none: false,
        }
    }

    pub fn reset(&mut self) {
        self.scan_timer = 0.0;
        self.scans = 0;
        self.tracked.clear();
        self.best = None;
        self.approached = None;
        self.entered = None;
        self.announced_none = false;
    }

    /// Advance one tick: rescan on the interval, otherwise refresh tracked zones.
    pub fn update(
        &mut self,
        dt: f32,
        state: &SlideState,
        terrain: &dyn TerrainQuery,
        bus: &mut EventBus,
    ) {
        self.scan_timer += dt.max(0.0);
        if self.scans == 0 || self.scan_timer >= self.cfg.scan_interval {
            self.scan_timer = 0.0;
            self.scan(state, terrain);
        } else {
            self.refresh(state);
        }
        self.emit_proximity(bus);
        self.prune();
        self.promote_best(bus);
    }

    fn scan(&mut self, state: &SlideState, terrain: &dyn TerrainQuery) {
        self.scans = self.scans.saturating_add(1);
        let heading = state.travel_direction();
        let mut candidates: SmallVec<[ExitZone; 8]> = terrain
            .cells_in_radius(state.position, self.cfg.scan_distance)
            .iter()
            .filter(|cell| {
                cell.is_exit_zone && cell.exit_zone_quality >= self.cfg.min_viable_quality
            })
            .map(|cell| {
                let mut zone = ExitZone::from_cell(cell);
                zone.recompute(&self.cfg, state.position, heading, state.speed, state.control);
                zone
            })
            .filter(|zone| zone.heading_dot > EXIT_AHEAD_DOT && zone.is_viable)
            .collect();
        candidates.sort_by(|a, b| b.score().total_cmp(&a.score()));
        self.tracked = candidates;
    }

    fn refresh(&mut self, state: &SlideState) {
        let heading = state.travel_direction();
        for zone in &mut self.tracked {
            zone.recompute(&self.cfg, state.position, heading, state.speed, state.control);
        }
    }

    fn emit_proximity(&mut self, bus: &mut EventBus) {
        let missed: SmallVec<[usize; 4]> = self
            .tracked
            .iter()
            .enumerate()
            .filter(|(_, zone)| {
                zone.distance < self.cfg.missed_distance
                    && zone.heading_dot < 0.0
                    && self.entered != Some(zone.id)
            })
            .map(|(index, _)| index)
            .collect();
        for index in missed.into_iter().rev() {
            let zone = self.tracked.remove(index);
            log::debug!("exit zone {:?} missed at {:.1} m", zone.id, zone.distance);
            bus.emit(EventKind::ExitZoneMissed {
                distance: zone.distance,
                quality: zone.quality,
            });
        }

        let Some(best_id) = self.best.as_ref().map(|zone| zone.id) else {
            return;
        };
        let Some(zone) = self.tracked.iter().find(|zone| zone.id == best_id) else {
            return;
        };
        if zone.distance < self.cfg.entered_distance {
            if self.entered != Some(zone.id) {
                self.entered = Some(zone.id);
                bus.emit(EventKind::ExitZoneEntered {
                    quality: zone.quality,
                });
            }
        } else if zone.distance < self.cfg.approach_distance && self.approached != Some(zone.id) {
            self.approached = Some(zone.id);
            bus.emit(EventKind::ExitZoneApproached {
                distance: zone.distance,
                quality: zone.quality,
            });
        }
    }

    fn prune(&mut self) {
        let passed = self.cfg.passed_distance;
        self.tracked.retain(|zone| zone.is_viable && zone.distance >= passed);
    }

    fn promote_best(&mut self, bus: &mut EventBus) {
        let top = self
            .tracked
            .iter()
            .max_by(|a, b| a.score().total_cmp(&b.score()))
            .cloned();
        let previous_id = self.best.as_ref().map(|zone| zone.id);
        match top {
            Some(zone) => {
                if previous_id != Some(zone.id) {
                    log::debug!(
                        "exit zone {:?} promoted (q {:.2}, {:.1} m)",
                        zone.id,
                        zone.quality,
                        zone.distance
                    );
                    bus.emit(EventKind::ExitZoneDetected {
                        distance: zone.distance,
                        quality: zone.quality,
                    });
                }
                self.announced_none = false;
                self.best = Some(zone);
            }
            None => {
                self.best = None;
                if !self.announced_none {
                    self.announced_none = true;
                    bus.emit(EventKind::NoExitsAhead);
                }
            }
        }
    }

    #[must_use]
    pub const fn best_zone(&self) -> Option<&ExitZone> {
        self.best.as_ref()
    }

    #[must_use]
    pub fn tracked_zones(&self) -> &[ExitZone] {
        &self.tracked
    }

    #[must_use]
    pub fn has_viable_exit(&self) -> bool {
        self.best.as_ref().is_some_and(|zone| zone.is_viable)
    }

    #[must_use]
    pub const fn scans(&self) -> u32 {
        self.scans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::GridTerrain;

    fn slope_with_zones(zones: &[((i32, i32), f32)]) -> GridTerrain {
        let mut grid = GridTerrain::uniform(21, 60, 1.0, 30.0, Vec3::Z, SurfaceType::SnowFirm);
        for (grid_coords, quality) in zones {
            let cell = TerrainCell::new(
                *grid_coords,
                Vec3::ZERO,
                10.0,
                Vec3::Z,
                SurfaceType::SnowSoft,
                200.0,
            )
            .with_exit_quality(*quality);
            grid.set_cell(*grid_coords, cell);
        }
        grid
    }

    fn sliding_state(position: Vec3, speed: f32) -> SlideState {
        let velocity = Vec3::Z * speed;
        SlideState {
            position,
            velocity,
            speed,
            slope_direction: Vec3::Z,
            control: 1.0,
            ..SlideState::default()
        }
    }

    #[test]
    fn farther_higher_quality_zone_wins() {
        // Slider at z = 0.5; zones at 10 m (q 0.4) and 20 m (q 0.9).
        let terrain = slope_with_zones(&[((10, 10), 0.4), ((10, 20), 0.9)]);
        let mut detector = ExitZoneDetector::new(ExitZoneConfig::default());
        let mut bus = EventBus::new();
        let state = sliding_state(Vec3::new(10.5, 0.0, 0.5), 8.0);
        detector.update(1.0 / 60.0, &state, &terrain, &mut bus);

        let best = detector.best_zone().expect("best zone");
        assert_eq!(best.id, (10, 20));
        assert!((best.distance - 20.0).abs() < 1e-4);
        assert!((best.score() - 0.9 / 21.0).abs() < 1e-4);
        assert_eq!(detector.tracked_zones().len(), 2);
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::ExitZoneDetected { .. })),
            1
        );
    }

    #[test]
    fn zones_behind_or_off_axis_are_ignored() {
        let terrain = slope_with_zones(&[((10, 0), 0.9), ((20, 5), 0.9)]);
        let mut detector = ExitZoneDetector::new(ExitZoneConfig::default());
        let mut bus = EventBus::new();
        let state = sliding_state(Vec3::new(10.5, 0.0, 10.5), 8.0);
        detector.update(1.0 / 60.0, &state, &terrain, &mut bus);
        assert!(detector.best_zone().is_none());
        assert_eq!(bus.count_where(|kind| matches!(kind, EventKind::NoExitsAhead)), 1);

        detector.update(1.0 / 60.0, &state, &terrain, &mut bus);
        assert_eq!(bus.count_where(|kind| matches!(kind, EventKind::NoExitsAhead)), 1);
    }

    #[test]
    fn distant_zones_need_control() {
        let terrain = slope_with_zones(&[((10, 40), 0.9)]);
        let mut detector = ExitZoneDetector::new(ExitZoneConfig::default());
        let mut bus = EventBus::new();
        let mut state = sliding_state(Vec3::new(10.5, 0.0, 0.5), 8.0);
        state.control = 0.3;
        detector.update(1.0 / 60.0, &state, &terrain, &mut bus);
        assert!(detector.best_zone().is_none());

        state.control = 0.9;
        detector.reset();
        detector.update(1.0 / 60.0, &state, &terrain, &mut bus);
        assert!(detector.has_viable_exit());
    }

    #[test]
    fn approach_and_entry_fire_once() {
        let terrain = slope_with_zones(&[((10, 20), 0.8)]);
        let mut detector = ExitZoneDetector::new(ExitZoneConfig::default());
        let mut bus = EventBus::new();
        let dt = 1.0 / 60.0;
        let mut z = 0.5;
        while z < 18.0 {
            let state = sliding_state(Vec3::new(10.5, 0.0, z), 6.0);
            detector.update(dt, &state, &terrain, &mut bus);
            z += 6.0 * dt;
        }
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::ExitZoneApproached { .. })),
            1
        );
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::ExitZoneEntered { .. })),
            1
        );
        // Passed within 2 m: pruned from tracking.
        let state = sliding_state(Vec3::new(10.5, 0.0, 19.5), 6.0);
        detector.update(dt, &state, &terrain, &mut bus);
        assert!(detector.tracked_zones().is_empty());
    }

    #[test]
    fn veering_past_a_zone_reports_a_miss() {
        let terrain = slope_with_zones(&[((10, 20), 0.8)]);
        let mut detector = ExitZoneDetector::new(ExitZoneConfig::default());
        let mut bus = EventBus::new();
        let state = sliding_state(Vec3::new(10.5, 0.0, 14.5), 6.0);
        detector.update(1.0 / 60.0, &state, &terrain, &mut bus);
        assert!(detector.best_zone().is_some());

        // Now alongside and past it, still heading +Z.
        let state = sliding_state(Vec3::new(14.5, 0.0, 24.5), 6.0);
        detector.update(1.0 / 60.0, &state, &terrain, &mut bus);
        assert_eq!(
            bus.count_where(|kind| matches!(kind, EventKind::ExitZoneMissed { .. })),
            1
        );
        assert!(detector.best_zone().is_none());
    }
}
