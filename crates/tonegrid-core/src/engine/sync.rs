use super::PuzzleEngine;
use crate::error::{GameError, Result};
use crate::events::{Event, Hint, Rejection};
use crate::grid::{mismatch_count, GridShape};
use crate::ledger::ProgressLedger;
use crate::levels::LevelConfig;
use crate::rng::GameRng;
use crate::scramble::scramble_grid;
use crate::theme::{distinct, AssetId};
use log::debug;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::time::Duration;

/// Attempts at drawing a scramble that differs from the target
const SCRAMBLE_ATTEMPTS: usize = 8;

/// Read-only view of a sync board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    pub given_grid: Vec<AssetId>,
    pub user_grid: Vec<AssetId>,
    pub selected: Option<usize>,
    pub mismatches: usize,
    pub swaps: u32,
    pub complete: bool,
}

/// Grid-rearrangement engine
#[derive(Debug, Clone)]
pub struct SyncEngine {
    shape: GridShape,
    given: Vec<AssetId>,
    user: Vec<AssetId>,
    selected: Option<usize>,
    steps: usize,
    swaps: u32,
    complete: bool,
    torn_down: bool,
    rng: GameRng,
}

impl SyncEngine {
    /// Lay out the target grid from the theme and scramble a copy of it
    pub fn new(config: &LevelConfig, theme: &[AssetId], mut rng: GameRng) -> Result<Self> {
        let Some(steps) = config.scramble_steps() else {
            return Err(GameError::ConfigNotFound {
                game: config.game,
                level: config.level,
            });
        };
        let shape = config.shape();
        let mut pool = distinct(theme);
        if pool.len() < 2 {
            return Err(GameError::NotEnoughAssets {
                needed: 2,
                available: pool.len(),
            });
        }
        pool.shuffle(&mut rng);
        let mut given: Vec<AssetId> = shape.indices().map(|i| pool[i % pool.len()].clone()).collect();
        given.shuffle(&mut rng);

        let mut engine = Self {
            shape,
            user: given.clone(),
            given,
            selected: None,
            steps,
            swaps: 0,
            complete: false,
            torn_down: false,
            rng,
        };
        engine.rescramble();
        Ok(engine)
    }

    /// Build a board from an explicit target and starting arrangement
    pub fn from_grids(
        shape: GridShape,
        given: Vec<AssetId>,
        user: Vec<AssetId>,
        rng: GameRng,
    ) -> Result<Self> {
        if given.len() != shape.len() || user.len() != shape.len() {
            return Err(GameError::InvalidMove(format!(
                "grids must have {} cells",
                shape.len()
            )));
        }
        let complete = given == user;
        Ok(Self {
            shape,
            given,
            user,
            selected: None,
            steps: 0,
            swaps: 0,
            complete,
            torn_down: false,
            rng,
        })
    }

    pub fn given_grid(&self) -> &[AssetId] {
        &self.given
    }

    pub fn user_grid(&self) -> &[AssetId] {
        &self.user
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn mismatches(&self) -> usize {
        mismatch_count(&self.given, &self.user)
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            given_grid: self.given.clone(),
            user_grid: self.user.clone(),
            selected: self.selected,
            mismatches: self.mismatches(),
            swaps: self.swaps,
            complete: self.complete,
        }
    }

    /// First swap found that strictly lowers the mismatch count
    pub fn find_optimal_swap(&self) -> Option<(usize, usize)> {
        find_optimal_swap(self.shape, &self.given, &self.user)
    }

    /// A swap that always makes progress, even when no single swap
    /// lowers the mismatch count
    pub fn solving_swap(&self) -> Option<(usize, usize)> {
        solving_swap(self.shape, &self.given, &self.user)
    }

    fn rescramble(&mut self) {
        for _ in 0..SCRAMBLE_ATTEMPTS {
            self.user = scramble_grid(&self.given, self.shape, self.steps, &mut self.rng);
            if self.user != self.given {
                break;
            }
        }
        if self.user == self.given {
            // Connected grid with two clips always has differing neighbours
            let forced = self.shape.indices().find_map(|i| {
                self.shape
                    .neighbors(i)
                    .into_iter()
                    .find(|&j| self.given[i] != self.given[j])
                    .map(|j| (i, j))
            });
            if let Some((a, b)) = forced {
                self.user.swap(a, b);
            }
        }
        self.complete = self.user == self.given;
        debug!(
            "sync: scrambled with {} steps, {} cells out of place",
            self.steps,
            self.mismatches()
        );
    }

    fn swap(&mut self, a: usize, b: usize) -> Vec<Event> {
        self.user.swap(a, b);
        self.swaps += 1;
        self.selected = None;
        let mut events = vec![Event::Swapped { a, b }];
        if self.user == self.given {
            self.complete = true;
            debug!("sync: solved after {} swaps", self.swaps);
            events.push(Event::Completed);
        }
        events
    }
}

impl PuzzleEngine for SyncEngine {
    fn shape(&self) -> GridShape {
        self.shape
    }

    fn tap(&mut self, cell: usize) -> Vec<Event> {
        let reject = |reason| vec![Event::Rejected { cell, reason }];
        if !self.shape.contains(cell) {
            return reject(Rejection::OutOfBounds);
        }
        if self.torn_down || self.complete {
            return reject(Rejection::Finished);
        }
        match self.selected {
            None => {
                self.selected = Some(cell);
                vec![
                    Event::Selected { cell },
                    Event::Cue {
                        cell,
                        asset: self.user[cell].clone(),
                    },
                ]
            }
            Some(current) if current == cell => {
                self.selected = None;
                vec![Event::Deselected { cell }]
            }
            Some(current) if self.shape.are_adjacent(current, cell) => self.swap(current, cell),
            Some(_) => reject(Rejection::NotAdjacent),
        }
    }

    fn hint(&mut self, ledger: &mut ProgressLedger, cost: u64) -> Result<Vec<Event>> {
        if self.torn_down || self.complete {
            return Ok(Vec::new());
        }
        let Some((a, b)) = self.find_optimal_swap() else {
            debug!("sync: no improving swap, hint not charged");
            return Ok(Vec::new());
        };
        ledger.charge(cost)?;
        let mut events = Vec::new();
        if let Some(cell) = self.selected.take() {
            events.push(Event::Deselected { cell });
        }
        events.push(Event::HintShown {
            hint: Hint::Swap { a, b },
        });
        events.extend(self.swap(a, b));
        Ok(events)
    }

    fn reset(&mut self) -> Vec<Event> {
        self.torn_down = false;
        self.selected = None;
        self.swaps = 0;
        self.rescramble();
        vec![Event::Reset]
    }

    fn advance(&mut self, _dt: Duration) -> Vec<Event> {
        Vec::new()
    }

    fn teardown(&mut self) {
        self.torn_down = true;
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn is_locked(&self) -> bool {
        self.torn_down
    }
}

/// Scan mismatched positions in order and, for each, its neighbours;
/// return the first swap that strictly lowers the mismatch count.
pub fn find_optimal_swap<T: PartialEq>(
    shape: GridShape,
    given: &[T],
    user: &[T],
) -> Option<(usize, usize)> {
    let current = mismatch_count(given, user);
    if current == 0 {
        return None;
    }
    for i in shape.indices().filter(|&i| user[i] != given[i]) {
        for j in shape.neighbors(i) {
            // Only positions i and j change, so compare their local contribution
            let before = (user[i] != given[i]) as usize + (user[j] != given[j]) as usize;
            let after = (user[j] != given[i]) as usize + (user[i] != given[j]) as usize;
            if after < before {
                return Some((i, j));
            }
        }
    }
    None
}

/// Walk the nearest copy of the clip that belongs at the first wrong
/// position one step toward it: along its row, then up the target column.
/// The route stays on cells after that position, so the solved prefix is
/// never disturbed, and the nearest distance shrinks on every call.
pub fn solving_swap<T: PartialEq>(
    shape: GridShape,
    given: &[T],
    user: &[T],
) -> Option<(usize, usize)> {
    let target = shape.indices().find(|&i| user[i] != given[i])?;
    let goal = shape.cell_at(target);
    let distance = |k: usize| {
        let c = shape.cell_at(k);
        c.row.abs_diff(goal.row) + c.col.abs_diff(goal.col)
    };
    let source = (target + 1..shape.len())
        .filter(|&k| user[k] == given[target])
        .min_by_key(|&k| distance(k))?;

    let at = shape.cell_at(source);
    let next = if at.row == goal.row {
        source - 1
    } else if at.col < goal.col {
        source + 1
    } else if at.col > goal.col {
        source - 1
    } else {
        source - shape.columns
    };
    Some((source, next))
}
