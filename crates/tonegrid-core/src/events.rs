use crate::grid::Cell;
use crate::theme::AssetId;
use serde::Serialize;

/// Why a tap had no effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Input is locked while an evaluation or playback is pending
    Locked,
    /// The puzzle is finished or the engine was torn down
    Finished,
    /// The cell is outside the grid
    OutOfBounds,
    /// Seek: the cell is already part of a found pair
    AlreadyMatched,
    /// Sync: the two cells are not neighbours
    NotAdjacent,
}

/// What a purchased hint revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Hint {
    /// Seek: two cells holding the same clip
    Pair { first: usize, second: usize },
    /// Sequencer: the next cell to tap
    NextStep { cell: Cell },
    /// Sync: a swap that lowers the mismatch count
    Swap { a: usize, b: usize },
}

/// Observable outcome of a command. Cell indices are logical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Play this clip for this cell
    Cue { cell: usize, asset: AssetId },
    Selected { cell: usize },
    Deselected { cell: usize },
    Rejected { cell: usize, reason: Rejection },
    Matched { first: usize, second: usize },
    Mismatched { first: usize, second: usize },
    PlaybackStarted { length: usize },
    AwaitingInput,
    StepAccepted { step: usize, cell: Cell },
    SequenceFailed { expected: Cell, got: Cell },
    /// Sequencer: a fresh sequence replaced the failed one
    SequenceRestarted,
    Swapped { a: usize, b: usize },
    HintShown { hint: Hint },
    /// The puzzle is solved
    Completed,
    /// Tokens and progress were credited for the solved level
    LevelRewarded { tokens: u64, unlocked: u32 },
    /// The level was skipped for tokens
    Skipped { unlocked: u32 },
    Reset,
    DisplayShuffled,
}

impl Event {
    pub fn is_completion(&self) -> bool {
        matches!(self, Event::Completed)
    }
}
