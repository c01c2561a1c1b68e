//! Terrain descriptors and the read-only spatial query interface.
//!
//! The descent core never owns terrain; it asks a [`TerrainQuery`] for the
//! cell under the slider each tick. [`GridTerrain`] is a uniform in-memory
//! grid used by tests and the headless tester.
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::FAR_CLIFF_DISTANCE;
use crate::numbers::flatten;

const WALKABLE_MAX: f32 = 20.0;
const SLIDE_MIN: f32 = 25.0;
const SLIDE_MAX: f32 = 40.0;
const DOWNCLIMB_MIN: f32 = 35.0;
const RAPPEL_MIN: f32 = 50.0;
const CLIFF_MIN: f32 = 70.0;
const EXIT_MAX_CURVATURE: f32 = 0.2;
const EXIT_MIN_CLIFF_DISTANCE: f32 = 10.0;
const EXIT_QUALITY_CLIFF_RANGE: f32 = 50.0;

/// Snow, ice and rock surfaces the slider can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceType {
    #[default]
    SnowFirm,
    SnowSoft,
    SnowPowder,
    Ice,
    Rock,
    RockDry,
    RockWet,
    Scree,
    Mixed,
}

impl SurfaceType {
    /// Base friction coefficient for the surface.
    #[must_use]
    pub const fn friction(self) -> f32 {
        match self {
            Self::SnowFirm => 0.3,
            Self::SnowSoft => 0.5,
            Self::SnowPowder | Self::Rock | Self::Scree => 0.6,
            Self::Ice => 0.1,
            Self::RockDry => 0.7,
            Self::RockWet => 0.2,
            Self::Mixed => 0.4,
        }
    }

    /// Surfaces a body can glissade down without tumbling.
    #[must_use]
    pub const fn supports_sliding(self) -> bool {
        matches!(
            self,
            Self::SnowFirm | Self::SnowSoft | Self::SnowPowder | Self::Scree
        )
    }
}

/// Navigation class derived from slope angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TerrainZone {
    #[default]
    Walkable,
    Steep,
    Slideable,
    Downclimb,
    RappelRequired,
    Cliff,
}

impl TerrainZone {
    #[must_use]
    pub fn from_slope(slope_angle: f32) -> Self {
        if slope_angle >= CLIFF_MIN {
            Self::Cliff
        } else if slope_angle >= RAPPEL_MIN {
            Self::RappelRequired
        } else if slope_angle >= DOWNCLIMB_MIN {
            Self::Downclimb
        } else if slope_angle >= SLIDE_MIN {
            Self::Slideable
        } else if slope_angle >= WALKABLE_MAX {
            Self::Steep
        } else {
            Self::Walkable
        }
    }
}

/// Descriptor for a single terrain sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainCell {
    /// Grid coordinates; the identity of the cell.
    pub grid: (i32, i32),
    /// World-space centre of the cell.
    pub position: Vec3,
    /// Degrees from horizontal.
    pub slope_angle: f32,
    /// Unit downhill direction in the XZ plane.
    pub slope_direction: Vec3,
    pub surface_type: SurfaceType,
    pub friction: f32,
    pub curvature: f32,
    pub distance_to_cliff: f32,
    pub zone: TerrainZone,
    pub is_cliff: bool,
    pub is_slideable: bool,
    pub is_exit_zone: bool,
    pub exit_zone_quality: f32,
}

impl TerrainCell {
    /// Build a cell and derive zone, friction and exit-zone properties.
    #[must_use]
    pub fn new(
        grid: (i32, i32),
        position: Vec3,
        slope_angle: f32,
        slope_direction: Vec3,
        surface_type: SurfaceType,
        distance_to_cliff: f32,
    ) -> Self {
        let mut cell = Self {
            grid,
            position,
            slope_angle,
            slope_direction: flatten(slope_direction).normalize_or_zero(),
            surface_type,
            friction: surface_type.friction(),
            curvature: 0.0,
            distance_to_cliff,
            zone: TerrainZone::Walkable,
            is_cliff: false,
            is_slideable: false,
            is_exit_zone: false,
            exit_zone_quality: 0.0,
        };
        cell.derive_properties();
        cell
    }

    /// Recompute every property that depends on slope, surface and cliff distance.
    pub fn derive_properties(&mut self) {
        self.zone = TerrainZone::from_slope(self.slope_angle);
        self.friction = self.surface_type.friction();
        self.is_cliff = self.slope_angle >= CLIFF_MIN;
        self.is_slideable = (SLIDE_MIN..=SLIDE_MAX).contains(&self.slope_angle)
            && self.surface_type.supports_sliding();
        self.is_exit_zone = self.slope_angle < SLIDE_MIN
            && self.curvature < EXIT_MAX_CURVATURE
            && !self.is_cliff
            && self.distance_to_cliff > EXIT_MIN_CLIFF_DISTANCE;
        self.exit_zone_quality = if self.is_exit_zone {
            (1.0 - self.slope_angle / SLIDE_MIN)
                * (self.distance_to_cliff / EXIT_QUALITY_CLIFF_RANGE).min(1.0)
        } else {
            0.0
        };
    }

    /// Override the derived exit-zone quality (hand-authored zones).
    #[must_use]
    pub fn with_exit_quality(mut self, quality: f32) -> Self {
        self.is_exit_zone = true;
        self.exit_zone_quality = quality.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub const fn with_curvature(mut self, curvature: f32) -> Self {
        self.curvature = curvature;
        self
    }

    /// Whether the zone demands a rope rather than a slide or walk.
    #[must_use]
    pub const fn requires_rope(&self) -> bool {
        matches!(self.zone, TerrainZone::RappelRequired | TerrainZone::Cliff)
    }
}

/// Read-only spatial terrain queries consumed by the slide core.
pub trait TerrainQuery {
    /// Cell under a world position, `None` when outside known terrain.
    fn cell_at(&self, position: Vec3) -> Option<TerrainCell>;

    /// Nearest exit-zone cell within `radius` (horizontal distance).
    fn find_nearest_exit_zone(&self, position: Vec3, radius: f32) -> Option<TerrainCell> {
        let origin = flatten(position);
        self.cells_in_radius(position, radius)
            .into_iter()
            .filter(|cell| cell.is_exit_zone)
            .min_by(|a, b| {
                let da = flatten(a.position).distance(origin);
                let db = flatten(b.position).distance(origin);
                da.total_cmp(&db)
            })
    }

    /// Every cell whose centre is within `radius` (horizontal distance).
    fn cells_in_radius(&self, position: Vec3, radius: f32) -> Vec<TerrainCell>;
}

/// Uniform square grid of terrain cells laid out on the XZ plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridTerrain {
    origin: Vec3,
    cell_size: f32,
    width: i32,
    depth: i32,
    cells: Vec<TerrainCell>,
}

impl GridTerrain {
    /// Grid where every cell shares the same slope and surface.
    #[must_use]
    pub fn uniform(
        width: i32,
        depth: i32,
        cell_size: f32,
        slope_angle: f32,
        slope_direction: Vec3,
        surface: SurfaceType,
    ) -> Self {
        Self::from_fn(width, depth, cell_size, |grid, position| {
            TerrainCell::new(
                grid,
                position,
                slope_angle,
                slope_direction,
                surface,
                FAR_CLIFF_DISTANCE,
            )
        })
    }

    /// Grid whose cells are produced by `build(grid_coords, world_centre)`.
    #[must_use]
    pub fn from_fn(
        width: i32,
        depth: i32,
        cell_size: f32,
        mut build: impl FnMut((i32, i32), Vec3) -> TerrainCell,
    ) -> Self {
        let width = width.max(1);
        let depth = depth.max(1);
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let origin = Vec3::ZERO;
        let mut cells = Vec::new();
        for z in 0..depth {
            for x in 0..width {
                let centre = Self::centre_of(origin, cell_size, x, z);
                let mut cell = build((x, z), centre);
                cell.grid = (x, z);
                cell.position = centre;
                cells.push(cell);
            }
        }
        Self {
            origin,
            cell_size,
            width,
            depth,
            cells,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn centre_of(origin: Vec3, cell_size: f32, x: i32, z: i32) -> Vec3 {
        origin + Vec3::new((x as f32 + 0.5) * cell_size, 0.0, (z as f32 + 0.5) * cell_size)
    }

    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[allow(clippy::cast_possible_truncation)]
    fn grid_of(&self, position: Vec3) -> Option<(i32, i32)> {
        let local = position - self.origin;
        if !local.is_finite() {
            return None;
        }
        let x = (local.x / self.cell_size).floor() as i32;
        let z = (local.z / self.cell_size).floor() as i32;
        if x < 0 || z < 0 || x >= self.width || z >= self.depth {
            return None;
        }
        Some((x, z))
    }

    fn index_of(&self, grid: (i32, i32)) -> Option<usize> {
        let (x, z) = grid;
        if x < 0 || z < 0 || x >= self.width || z >= self.depth {
            return None;
        }
        usize::try_from(z * self.width + x).ok()
    }

    /// Replace the cell at grid coordinates, keeping its identity and centre.
    pub fn set_cell(&mut self, grid: (i32, i32), mut cell: TerrainCell) {
        let Some(index) = self.index_of(grid) else {
            return;
        };
        let centre = Self::centre_of(self.origin, self.cell_size, grid.0, grid.1);
        cell.grid = grid;
        cell.position = centre;
        if let Some(slot) = self.cells.get_mut(index) {
            *slot = cell;
        }
    }

    /// Cell at grid coordinates.
    #[must_use]
    pub fn cell(&self, grid: (i32, i32)) -> Option<&TerrainCell> {
        self.index_of(grid).and_then(|index| self.cells.get(index))
    }

    /// World-space centre of a grid cell.
    #[must_use]
    pub fn centre(&self, grid: (i32, i32)) -> Vec3 {
        Self::centre_of(self.origin, self.cell_size, grid.0, grid.1)
    }
}

impl TerrainQuery for GridTerrain {
    fn cell_at(&self, position: Vec3) -> Option<TerrainCell> {
        let grid = self.grid_of(position)?;
        self.cell(grid).cloned()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cells_in_radius(&self, position: Vec3, radius: f32) -> Vec<TerrainCell> {
        let origin = flatten(position);
        let local = position - self.origin;
        if !local.is_finite() || !radius.is_finite() || radius < 0.0 {
            return Vec::new();
        }
        // Bounding box in grid space, clamped to the grid.
        let span = (radius / self.cell_size).ceil() as i32 + 1;
        let cx = (local.x / self.cell_size).floor() as i32;
        let cz = (local.z / self.cell_size).floor() as i32;
        let mut found = Vec::new();
        for z in (cz - span).max(0)..=(cz + span).min(self.depth - 1) {
            for x in (cx - span).max(0)..=(cx + span).min(self.width - 1) {
                if let Some(cell) = self.cell((x, z))
                    && flatten(cell.position).distance(origin) <= radius
                {
                    found.push(cell.clone());
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snow_slope_in_slide_band_is_slideable() {
        let cell = TerrainCell::new((0, 0), Vec3::ZERO, 32.0, Vec3::Z, SurfaceType::SnowFirm, 30.0);
        assert_eq!(cell.zone, TerrainZone::Slideable);
        assert!(cell.is_slideable);
        assert!(!cell.is_exit_zone);
        assert!((cell.friction - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn ice_is_never_slideable() {
        let cell = TerrainCell::new((0, 0), Vec3::ZERO, 32.0, Vec3::Z, SurfaceType::Ice, 30.0);
        assert!(!cell.is_slideable);
    }

    #[test]
    fn gentle_cell_far_from_cliff_is_exit_zone() {
        let cell =
            TerrainCell::new((0, 0), Vec3::ZERO, 10.0, Vec3::Z, SurfaceType::SnowSoft, 100.0);
        assert!(cell.is_exit_zone);
        assert!((cell.exit_zone_quality - 0.6).abs() < 1e-5);

        let near_cliff =
            TerrainCell::new((0, 0), Vec3::ZERO, 10.0, Vec3::Z, SurfaceType::SnowSoft, 8.0);
        assert!(!near_cliff.is_exit_zone);
        assert!(near_cliff.exit_zone_quality.abs() < f32::EPSILON);
    }

    #[test]
    fn steep_faces_require_rope() {
        let cliff = TerrainCell::new((0, 0), Vec3::ZERO, 75.0, Vec3::Z, SurfaceType::Rock, 0.0);
        assert!(cliff.is_cliff);
        assert!(cliff.requires_rope());
        assert_eq!(TerrainZone::from_slope(45.0), TerrainZone::Downclimb);
        assert_eq!(TerrainZone::from_slope(22.0), TerrainZone::Steep);
    }

    #[test]
    fn grid_lookup_and_radius_queries() {
        let mut grid = GridTerrain::uniform(10, 10, 2.0, 30.0, Vec3::Z, SurfaceType::SnowFirm);
        assert!(grid.cell_at(Vec3::new(-1.0, 0.0, 0.0)).is_none());
        let cell = grid.cell_at(Vec3::new(3.0, 0.0, 5.0)).expect("inside grid");
        assert_eq!(cell.grid, (1, 2));

        let flat = TerrainCell::new((0, 0), Vec3::ZERO, 5.0, Vec3::Z, SurfaceType::SnowSoft, 100.0);
        grid.set_cell((1, 6), flat);
        let nearest = grid
            .find_nearest_exit_zone(Vec3::new(3.0, 0.0, 5.0), 20.0)
            .expect("exit zone in range");
        assert_eq!(nearest.grid, (1, 6));
        assert!(grid.find_nearest_exit_zone(Vec3::new(3.0, 0.0, 5.0), 4.0).is_none());
        assert!(!grid.cells_in_radius(Vec3::new(3.0, 0.0, 5.0), 3.0).is_empty());
    }
}
