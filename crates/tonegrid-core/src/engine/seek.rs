use super::PuzzleEngine;
use crate::error::{GameError, Result};
use crate::events::{Event, Hint, Rejection};
use crate::grid::GridShape;
use crate::ledger::ProgressLedger;
use crate::levels::LevelConfig;
use crate::rng::GameRng;
use crate::theme::{distinct, AssetId};
use crate::timeline::Timeline;
use log::debug;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Where a seek round stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekPhase {
    Idle,
    OneSelected,
    /// Two cells are revealed and waiting to be compared
    Evaluating,
    Complete,
}

/// Read-only view of a seek board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeekSnapshot {
    pub phase: SeekPhase,
    pub pairs: Vec<AssetId>,
    pub matched: Vec<usize>,
    pub selected: Vec<usize>,
    pub mismatches: u32,
}

#[derive(Debug, Clone, Copy)]
enum SeekAction {
    Evaluate,
}

/// Pair-matching engine
#[derive(Debug, Clone)]
pub struct SeekEngine {
    shape: GridShape,
    theme: Vec<AssetId>,
    pairs: Vec<AssetId>,
    matched: BTreeSet<usize>,
    selected: Vec<usize>,
    locked: bool,
    torn_down: bool,
    reveal: Duration,
    mismatches: u32,
    timeline: Timeline<SeekAction>,
    rng: GameRng,
}

impl SeekEngine {
    /// Build a board for `config` from the clips of a theme.
    ///
    /// `reveal` is how long a completed selection stays visible before it
    /// is evaluated; zero evaluates on the second tap.
    pub fn new(
        config: &LevelConfig,
        theme: &[AssetId],
        reveal: Duration,
        mut rng: GameRng,
    ) -> Result<Self> {
        let shape = config.shape();
        let theme = distinct(theme);
        let pairs = deal_pairs(shape.len(), &theme, &mut rng)?;
        let mut engine = Self {
            shape,
            theme,
            pairs,
            matched: BTreeSet::new(),
            selected: Vec::with_capacity(2),
            locked: false,
            torn_down: false,
            reveal,
            mismatches: 0,
            timeline: Timeline::new(),
            rng,
        };
        engine.match_singleton();
        Ok(engine)
    }

    pub fn pairs(&self) -> &[AssetId] {
        &self.pairs
    }

    pub fn matched(&self) -> &BTreeSet<usize> {
        &self.matched
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn phase(&self) -> SeekPhase {
        if self.is_complete() {
            SeekPhase::Complete
        } else if self.selected.len() == 2 {
            SeekPhase::Evaluating
        } else if self.selected.len() == 1 {
            SeekPhase::OneSelected
        } else {
            SeekPhase::Idle
        }
    }

    pub fn snapshot(&self) -> SeekSnapshot {
        SeekSnapshot {
            phase: self.phase(),
            pairs: self.pairs.clone(),
            matched: self.matched.iter().copied().collect(),
            selected: self.selected.clone(),
            mismatches: self.mismatches,
        }
    }

    /// First unmatched cell and the other unmatched cell sharing its clip
    pub fn find_pair(&self) -> Option<(usize, usize)> {
        let first = self.shape.indices().find(|i| !self.matched.contains(i))?;
        let second = self
            .shape
            .indices()
            .find(|&j| j != first && !self.matched.contains(&j) && self.pairs[j] == self.pairs[first])?;
        Some((first, second))
    }

    /// An odd board has one clip without a partner. It starts out matched
    /// so that a board is complete exactly when every cell is matched.
    fn match_singleton(&mut self) {
        if self.pairs.len() % 2 == 0 {
            return;
        }
        let lone = self
            .shape
            .indices()
            .find(|&i| self.pairs.iter().filter(|a| **a == self.pairs[i]).count() == 1);
        if let Some(i) = lone {
            self.matched.insert(i);
        }
    }

    fn evaluate(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        self.locked = false;
        if self.selected.len() != 2 {
            self.selected.clear();
            return events;
        }
        let (first, second) = (self.selected[0], self.selected[1]);
        self.selected.clear();

        if self.pairs[first] == self.pairs[second] {
            self.matched.insert(first);
            self.matched.insert(second);
            debug!("seek: matched {} and {}", first, second);
            events.push(Event::Matched { first, second });
            if self.is_complete() {
                debug!("seek: board complete");
                events.push(Event::Completed);
            }
        } else {
            self.mismatches += 1;
            debug!("seek: mismatch {} / {}", first, second);
            events.push(Event::Mismatched { first, second });
        }
        events
    }
}

impl PuzzleEngine for SeekEngine {
    fn shape(&self) -> GridShape {
        self.shape
    }

    fn tap(&mut self, cell: usize) -> Vec<Event> {
        let reject = |reason| vec![Event::Rejected { cell, reason }];
        if !self.shape.contains(cell) {
            return reject(Rejection::OutOfBounds);
        }
        if self.torn_down || self.is_complete() {
            return reject(Rejection::Finished);
        }
        if self.locked {
            return reject(Rejection::Locked);
        }
        if self.matched.contains(&cell) {
            return reject(Rejection::AlreadyMatched);
        }
        if let Some(pos) = self.selected.iter().position(|&c| c == cell) {
            self.selected.remove(pos);
            return vec![Event::Deselected { cell }];
        }

        self.selected.push(cell);
        let mut events = vec![
            Event::Selected { cell },
            Event::Cue {
                cell,
                asset: self.pairs[cell].clone(),
            },
        ];
        if self.selected.len() == 2 {
            self.locked = true;
            if self.reveal.is_zero() {
                events.extend(self.evaluate());
            } else {
                self.timeline.schedule(self.reveal, SeekAction::Evaluate);
            }
        }
        events
    }

    fn hint(&mut self, ledger: &mut ProgressLedger, cost: u64) -> Result<Vec<Event>> {
        if self.torn_down || self.locked || self.is_complete() {
            return Ok(Vec::new());
        }
        let Some((first, second)) = self.find_pair() else {
            return Ok(Vec::new());
        };
        ledger.charge(cost)?;

        let mut events: Vec<Event> = self
            .selected
            .drain(..)
            .map(|cell| Event::Deselected { cell })
            .collect();
        events.push(Event::HintShown {
            hint: Hint::Pair { first, second },
        });
        events.extend(self.tap(first));
        events.extend(self.tap(second));
        Ok(events)
    }

    fn reset(&mut self) -> Vec<Event> {
        self.timeline.cancel_all();
        match deal_pairs(self.shape.len(), &self.theme, &mut self.rng) {
            Ok(pairs) => self.pairs = pairs,
            // Same theme as construction, so dealing cannot fail; keep the old deal
            Err(_) => self.pairs.shuffle(&mut self.rng),
        }
        self.matched.clear();
        self.selected.clear();
        self.locked = false;
        self.torn_down = false;
        self.mismatches = 0;
        self.match_singleton();
        vec![Event::Reset]
    }

    fn advance(&mut self, dt: Duration) -> Vec<Event> {
        if self.torn_down {
            return Vec::new();
        }
        let mut events = Vec::new();
        for action in self.timeline.advance(dt) {
            match action {
                SeekAction::Evaluate => events.extend(self.evaluate()),
            }
        }
        events
    }

    fn teardown(&mut self) {
        self.timeline.cancel_all();
        self.torn_down = true;
    }

    fn is_complete(&self) -> bool {
        self.matched.len() == self.pairs.len()
    }

    fn is_locked(&self) -> bool {
        self.locked || self.torn_down
    }
}

/// Shuffle the theme, take `cells / 2` clips twice each plus one lone clip
/// for an odd board, then shuffle the whole deal
fn deal_pairs(cells: usize, theme: &[AssetId], rng: &mut GameRng) -> Result<Vec<AssetId>> {
    let pair_count = cells / 2;
    let needed = pair_count + cells % 2;
    if theme.len() < needed {
        return Err(GameError::NotEnoughAssets {
            needed,
            available: theme.len(),
        });
    }
    let mut pool = theme.to_vec();
    pool.shuffle(rng);

    let mut pairs = Vec::with_capacity(cells);
    for asset in &pool[..pair_count] {
        pairs.push(asset.clone());
        pairs.push(asset.clone());
    }
    if cells % 2 == 1 {
        pairs.push(pool[pair_count].clone());
    }
    pairs.shuffle(rng);
    Ok(pairs)
}
