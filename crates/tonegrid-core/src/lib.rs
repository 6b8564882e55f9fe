//! Core logic for the Tonegrid audio grid games.
//!
//! Three games are playable: Seek pairs identical clips, Sequencer repeats
//! a played-back sequence of cells, and Sync rearranges a scrambled grid
//! back into its target layout. Everything here is platform-agnostic;
//! shells supply storage, audio playback and theme assets through the
//! traits in [`store`] and [`theme`].

pub mod catalog;
pub mod display;
pub mod engine;
pub mod error;
pub mod events;
pub mod grid;
pub mod ledger;
pub mod levels;
pub mod rng;
pub mod scramble;
pub mod session;
pub mod settings;
pub mod store;
pub mod theme;
pub mod timeline;

pub use catalog::{GameInfo, GameKey, ModeKey, LEVELS_PER_GAME};
pub use display::DisplayMap;
pub use engine::{
    find_optimal_swap, solving_swap, PuzzleEngine, SeekEngine, SeekPhase, SequencerEngine,
    SequencerPhase, SyncEngine,
};
pub use error::{GameError, Result};
pub use events::{Event, Hint, Rejection};
pub use grid::{Cell, GridShape};
pub use ledger::{GameProgress, ProgressLedger, ProgressRecord};
pub use levels::{level_config, levels, LevelConfig, LevelExtra};
pub use rng::GameRng;
pub use scramble::{scramble, scramble_grid};
pub use session::{Command, Engine, EngineSnapshot, GameSession, ResumePoint, SessionSnapshot};
pub use settings::{Pricing, Settings, Timing};
pub use store::{KeyValueStore, MemoryStore};
pub use theme::{
    AssetId, AudioPlayback, AudioThemeSource, SilentPlayback, ThemeLibrary, DEFAULT_THEME,
};
pub use timeline::{Timeline, TimerId};
