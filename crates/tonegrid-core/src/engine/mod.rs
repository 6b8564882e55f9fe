//! Puzzle engines, one per game.
//!
//! Each engine owns its grid state and its pending timers. Commands come
//! in as method calls and come back out as [`Event`] lists; nothing here
//! renders, plays audio or touches storage directly. Cost-bearing hints
//! charge the [`ProgressLedger`] only once a hint is known to exist.

mod seek;
mod sequencer;
mod sync;

pub use seek::{SeekEngine, SeekPhase, SeekSnapshot};
pub use sequencer::{SequencerEngine, SequencerPhase, SequencerSnapshot};
pub use sync::{find_optimal_swap, solving_swap, SyncEngine, SyncSnapshot};

use crate::error::Result;
use crate::events::Event;
use crate::grid::GridShape;
use crate::ledger::ProgressLedger;
use std::time::Duration;

/// Command surface shared by every engine
pub trait PuzzleEngine {
    fn shape(&self) -> GridShape;

    /// Handle a tap on a logical cell
    fn tap(&mut self, cell: usize) -> Vec<Event>;

    /// Buy a hint for `cost` tokens. Nothing is charged when no hint is
    /// available; an unaffordable hint leaves the grid untouched.
    fn hint(&mut self, ledger: &mut ProgressLedger, cost: u64) -> Result<Vec<Event>>;

    /// Restart the level with a fresh layout
    fn reset(&mut self) -> Vec<Event>;

    /// Run callbacks that came due
    fn advance(&mut self, dt: Duration) -> Vec<Event>;

    /// Cancel pending callbacks and refuse further input
    fn teardown(&mut self);

    fn is_complete(&self) -> bool;

    /// Whether taps are currently being refused
    fn is_locked(&self) -> bool;
}
