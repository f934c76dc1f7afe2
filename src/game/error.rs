// Game error taxonomy

use crate::engine::physics::PhysicsError;

use super::config::ConfigError;
use super::score::PersistenceError;

/// Errors surfaced by the game core
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A core logic bug: the stack or session reached a state that correct
    /// operation never produces
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Physics failure: {0}")]
    Physics(#[from] PhysicsError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Best score storage failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl GameError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Whether the error came from the physics backend
    pub fn is_physics(&self) -> bool {
        matches!(self, Self::Physics(_))
    }
}
