//! Player kinematics, body condition and carried gear.
use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::numbers::unit_clamp;

/// High-level locomotion state of the climber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovementState {
    #[default]
    Standing,
    Walking,
    Downclimbing,
    Sliding,
    Arrested,
    Falling,
    Incapacitated,
}

/// Where an injury landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryKind {
    Bruise,
    Sprain,
    Fracture,
    Trauma,
}

impl InjuryKind {
    #[must_use]
    pub fn from_severity(severity: f32) -> Self {
        if severity >= 0.8 {
            Self::Trauma
        } else if severity >= 0.5 {
            Self::Fracture
        } else if severity >= 0.25 {
            Self::Sprain
        } else {
            Self::Bruise
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Injury {
    pub kind: InjuryKind,
    /// Severity in `[0, 1]`.
    pub severity: f32,
}

/// Fatigue, cold and accumulated injuries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BodyState {
    #[serde(default)]
    pub fatigue: f32,
    #[serde(default)]
    pub cold_exposure: f32,
    #[serde(default)]
    pub injuries: Vec<Injury>,
}

impl BodyState {
    pub fn add_fatigue(&mut self, amount: f32) {
        self.fatigue = unit_clamp(self.fatigue + amount);
    }

    pub fn add_cold_exposure(&mut self, amount: f32) {
        self.cold_exposure = (self.cold_exposure + amount).max(0.0);
    }

    /// Record an injury and return it.
    pub fn add_injury(&mut self, severity: f32) -> Injury {
        let severity = unit_clamp(severity);
        let injury = Injury {
            kind: InjuryKind::from_severity(severity),
            severity,
        };
        self.injuries.push(injury);
        injury
    }

    /// Sum of injury severities; may exceed 1.0.
    #[must_use]
    pub fn total_injury(&self) -> f32 {
        self.injuries.iter().map(|injury| injury.severity).sum()
    }

    #[must_use]
    pub fn worst_injury(&self) -> Option<Injury> {
        self.injuries
            .iter()
            .copied()
            .max_by(|a, b| a.severity.total_cmp(&b.severity))
    }

    #[must_use]
    pub fn movement_modifier(&self) -> f32 {
        unit_clamp((1.0 - self.fatigue * 0.5) * (1.0 - self.total_injury().min(1.0) * 0.6))
    }

    #[must_use]
    pub fn stability_modifier(&self) -> f32 {
        unit_clamp(1.0 - self.fatigue * 0.3 - self.total_injury().min(1.0) * 0.4)
    }

    /// Multiplier on slide control from fatigue, cold and injuries.
    #[must_use]
    pub fn slide_control_modifier(&self) -> f32 {
        let fatigue = 1.0 - self.fatigue * 0.3;
        let injury = 1.0 - self.total_injury().min(1.0) * 0.3;
        let cold = 1.0 - self.cold_exposure.min(1.0) * 0.2;
        unit_clamp(fatigue * injury * cold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GearKind {
    IceAxe,
    Crampons,
    Rope,
    Harness,
    Helmet,
    Pack,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GearItem {
    pub kind: GearKind,
    /// Condition in `[0, 1]`; broken at zero.
    pub condition: f32,
    pub equipped: bool,
}

impl GearItem {
    #[must_use]
    pub const fn new(kind: GearKind) -> Self {
        Self {
            kind,
            condition: 1.0,
            equipped: true,
        }
    }

    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.equipped && self.condition > 0.0
    }
}

/// Carried equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GearState {
    #[serde(default)]
    pub items: SmallVec<[GearItem; 6]>,
}

impl GearState {
    /// Standard alpine kit: axe, crampons, helmet and pack.
    #[must_use]
    pub fn alpine_kit() -> Self {
        let mut items = SmallVec::new();
        for kind in [
            GearKind::IceAxe,
            GearKind::Crampons,
            GearKind::Helmet,
            GearKind::Pack,
        ] {
            items.push(GearItem::new(kind));
        }
        Self { items }
    }

    fn usable(&self, kind: GearKind) -> Option<&GearItem> {
        self.items
            .iter()
            .find(|item| item.kind == kind && item.is_usable())
    }

    #[must_use]
    pub fn has_ice_axe(&self) -> bool {
        self.usable(GearKind::IceAxe).is_some()
    }

    /// Axe effectiveness in `[0, 1]`, zero without a usable axe.
    #[must_use]
    pub fn ice_axe_effectiveness(&self) -> f32 {
        self.usable(GearKind::IceAxe)
            .map_or(0.0, |item| unit_clamp(item.condition))
    }

    #[must_use]
    pub fn has_crampons(&self) -> bool {
        self.usable(GearKind::Crampons).is_some()
    }

    /// Damage one random equipped item, returning its kind.
    pub fn damage_random_equipped<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        amount: f32,
    ) -> Option<GearKind> {
        let equipped: SmallVec<[usize; 6]> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_usable())
            .map(|(index, _)| index)
            .collect();
        if equipped.is_empty() {
            return None;
        }
        let pick = equipped.get(rng.gen_range(0..equipped.len())).copied()?;
        let item = self.items.get_mut(pick)?;
        item.condition = (item.condition - amount.max(0.0)).max(0.0);
        Some(item.kind)
    }
}

/// Mutable player record the slide system drives while a slide is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Balance in `[0, 1]`.
    pub stability: f32,
    pub movement_state: MovementState,
    pub body: BodyState,
    pub gear: GearState,
    #[serde(default)]
    state_changes: u32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            stability: 1.0,
            movement_state: MovementState::Standing,
            body: BodyState::default(),
            gear: GearState::alpine_kit(),
            state_changes: 0,
        }
    }
}

impl Player {
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Transition entry point for locomotion state changes.
    pub fn change_state(&mut self, next: MovementState) {
        if self.movement_state == next {
            return;
        }
        log::debug!("player state {:?} -> {:?}", self.movement_state, next);
        self.movement_state = next;
        self.state_changes = self.state_changes.saturating_add(1);
    }

    #[must_use]
    pub const fn state_changes(&self) -> u32 {
        self.state_changes
    }

    pub fn reduce_stability(&mut self, amount: f32) {
        self.stability = unit_clamp(self.stability - amount);
    }

    /// Stability scaled by body condition.
    #[must_use]
    pub fn effective_stability(&self) -> f32 {
        unit_clamp(self.stability * self.body.stability_modifier())
    }
}
