// Stacking game rules
//
// This module contains everything above the physics engine:
// - Cut geometry between the moving layer and the one below
// - The tower of layers and the falling overhangs
// - The autopilot used in attract mode and assisted play
// - The session state machine, scoring and best-score storage

pub mod autopilot;
pub mod config;
pub mod error;
pub mod geometry;
pub mod overhang;
pub mod score;
pub mod session;
pub mod stack;

// Re-export commonly used types
pub use autopilot::{Autopilot, AutopilotDecision};
pub use config::{AttractMissPolicy, AutopilotAnchor, ConfigError, GameConfig, OverhangPolicy};
pub use error::GameError;
pub use geometry::{compute_cut, Axis, Cut, CutResult, OverhangCut};
pub use overhang::{Overhang, OverhangSet};
pub use score::{JsonFileStore, MemoryStore, PersistenceError, ScoreStore};
pub use session::{GameEvent, GameSession, SessionPhase, SessionSnapshot};
pub use stack::{Layer, LayerStack, SEEDED_LAYERS};
