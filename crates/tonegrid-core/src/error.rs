//! Error types shared by every part of the puzzle core

use crate::catalog::{GameKey, ModeKey};

/// Error type for puzzle-core operations.
///
/// Every variant is recoverable. Rejected taps are reported as events
/// rather than errors, so `InvalidMove` only shows up when a caller asks
/// for something structurally impossible (such as a cell outside the grid).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// No level table entry exists for this game and level
    #[error("no level {level} for game {game}")]
    ConfigNotFound { game: GameKey, level: u32 },

    /// The game exists in the catalog but cannot be played yet
    #[error("game {0} is not active")]
    InactiveGame(GameKey),

    /// The game does not offer the requested mode
    #[error("game {game} does not support mode {mode}")]
    UnsupportedMode { game: GameKey, mode: ModeKey },

    /// The theme source returned nothing for the requested theme
    #[error("theme '{0}' is unavailable")]
    ThemeUnavailable(String),

    /// The theme does not contain enough distinct clips for the grid
    #[error("theme has {available} distinct clips, level needs {needed}")]
    NotEnoughAssets { needed: usize, available: usize },

    /// A cost-bearing action was attempted without enough tokens
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Structurally invalid move request
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// Storage read or write failure
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<serde_json::Error> for GameError {
    fn from(e: serde_json::Error) -> Self {
        GameError::Persistence(e.to_string())
    }
}

/// Result type for puzzle-core operations
pub type Result<T> = std::result::Result<T, GameError>;
