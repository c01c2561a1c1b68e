//! Long-Home Descent Core
//!
//! Platform-agnostic simulation of uncontrolled snow slides and the fatal
//! sequence that follows a lethal outcome. Rendering, audio playback and UI
//! live elsewhere; this crate only emits events and presentation requests.

pub mod config;
pub mod constants;
pub mod events;
pub mod fatal;
pub mod numbers;
pub mod player;
pub mod progress;
pub mod rng;
pub mod session;
pub mod slide;
pub mod terrain;

use std::rc::Rc;

// Re-export commonly used types
pub use config::{
    ConfigError, ControllerConfig, DescentConfig, DetectorConfig, ExitZoneConfig, FatalConfig,
    SlideConfig, SpectrumConfig,
};
pub use events::{Event, EventBus, EventId, EventKind, EventSeverity};
pub use fatal::{
    Behavior, EthicalConstraints, FatalEventManager, FatalPhase, FatalPhaseHandler, FatalTrigger,
    FatalityDetector, InstructionTarget, PresentationInstruction, Violation,
    is_behavior_permitted,
};
pub use player::{BodyState, GearState, MovementState, Player};
pub use progress::{MountainProgress, SaveError};
pub use rng::RngBundle;
pub use session::DescentSession;
pub use slide::{
    ArrestResult, ControlLevel, ControlSpectrum, EffectRequest, ExitZone, ExitZoneDetector,
    SlideController, SlideInput, SlideOutcome, SlideState, SlideSystem, calculate_arrest_chance,
};
pub use terrain::{GridTerrain, SurfaceType, TerrainCell, TerrainQuery, TerrainZone};

/// Trait for abstracting progress persistence
/// Platform-specific implementations should provide this
pub trait ProgressStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save mountain progress
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be saved.
    fn save_progress(&self, slot: &str, progress: &MountainProgress) -> Result<(), Self::Error>;

    /// Load mountain progress
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be loaded.
    fn load_progress(&self, slot: &str) -> Result<Option<MountainProgress>, Self::Error>;

    /// Delete saved progress
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be deleted.
    fn delete_progress(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Session factory bound to one tuning table and one storage backend
pub struct DescentEngine<S>
where
    S: ProgressStorage,
{
    config: DescentConfig,
    storage: S,
}

impl<S> DescentEngine<S>
where
    S: ProgressStorage,
{
    /// Create a new engine with the provided tuning and storage
    pub const fn new(config: DescentConfig, storage: S) -> Self {
        Self { config, storage }
    }

    #[must_use]
    pub const fn config(&self) -> &DescentConfig {
        &self.config
    }

    /// Construct a fresh session on the given terrain.
    #[must_use]
    pub fn create_session(
        &self,
        seed: u64,
        mountain: &str,
        terrain: Rc<dyn TerrainQuery>,
    ) -> DescentSession {
        let mut session = DescentSession::new(&self.config, seed, MountainProgress::new(mountain));
        session.attach_terrain(terrain);
        session
    }

    /// Construct a session that continues the counters stored in `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored progress cannot be loaded.
    pub fn resume_session(
        &self,
        slot: &str,
        seed: u64,
        mountain: &str,
        terrain: Rc<dyn TerrainQuery>,
    ) -> Result<DescentSession, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let progress = self
            .load_progress(slot)?
            .unwrap_or_else(|| MountainProgress::new(mountain));
        let mut session = DescentSession::new(&self.config, seed, progress);
        session.attach_terrain(terrain);
        Ok(session)
    }

    /// Persist the session's counters
    ///
    /// # Errors
    ///
    /// Returns an error if the session is mid-slide or mid-sequence, or if
    /// storage fails.
    pub fn save_progress(&self, slot: &str, session: &DescentSession) -> Result<(), SaveError> {
        let progress = session.progress_snapshot()?;
        self.storage
            .save_progress(slot, &progress)
            .map_err(|err| SaveError::Storage {
                message: err.to_string(),
            })
    }

    /// Load stored counters
    ///
    /// # Errors
    ///
    /// Returns an error if the progress cannot be loaded.
    pub fn load_progress(&self, slot: &str) -> Result<Option<MountainProgress>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        self.storage.load_progress(slot).map_err(Into::into)
    }

    /// Delete stored counters
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be deleted.
    pub fn delete_progress(&self, slot: &str) -> Result<(), S::Error> {
        self.storage.delete_progress(slot)
    }
}
