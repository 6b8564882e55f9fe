use super::PuzzleEngine;
use crate::error::{GameError, Result};
use crate::events::{Event, Hint, Rejection};
use crate::grid::{Cell, GridShape};
use crate::ledger::ProgressLedger;
use crate::levels::LevelConfig;
use crate::rng::GameRng;
use crate::theme::{distinct, AssetId};
use crate::timeline::Timeline;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

/// Where a sequencer round stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerPhase {
    /// Cues are being played; input is refused
    PlayingBack,
    AwaitingInput,
    /// A wrong tap cleared both sequences; a new one follows shortly
    Failed,
    Complete,
}

/// Read-only view of a sequencer round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencerSnapshot {
    pub phase: SequencerPhase,
    pub computer_sequence: Vec<Cell>,
    pub user_sequence: Vec<Cell>,
    pub failures: u32,
}

#[derive(Debug, Clone, Copy)]
enum Playback {
    Cue(usize),
    Done,
    Restart,
}

/// Simon-says engine
#[derive(Debug, Clone)]
pub struct SequencerEngine {
    shape: GridShape,
    cell_assets: Vec<AssetId>,
    length: usize,
    delay: Duration,
    lead_in: Duration,
    computer: Vec<Cell>,
    user: Vec<Cell>,
    phase: SequencerPhase,
    failures: u32,
    torn_down: bool,
    timeline: Timeline<Playback>,
    rng: GameRng,
}

impl SequencerEngine {
    /// Generate a sequence for `config` and schedule its playback
    pub fn new(
        config: &LevelConfig,
        theme: &[AssetId],
        lead_in: Duration,
        mut rng: GameRng,
    ) -> Result<Self> {
        let (Some(length), Some(delay)) = (config.sequence_length(), config.sequence_delay()) else {
            return Err(GameError::ConfigNotFound {
                game: config.game,
                level: config.level,
            });
        };
        let shape = config.shape();
        let mut pool = distinct(theme);
        if pool.is_empty() {
            return Err(GameError::NotEnoughAssets {
                needed: 1,
                available: 0,
            });
        }
        pool.shuffle(&mut rng);
        let cell_assets = shape.indices().map(|i| pool[i % pool.len()].clone()).collect();

        let mut engine = Self {
            shape,
            cell_assets,
            length,
            delay,
            lead_in,
            computer: Vec::with_capacity(length),
            user: Vec::with_capacity(length),
            phase: SequencerPhase::PlayingBack,
            failures: 0,
            torn_down: false,
            timeline: Timeline::new(),
            rng,
        };
        engine.generate_sequence();
        engine.start_playback();
        Ok(engine)
    }

    pub fn phase(&self) -> SequencerPhase {
        self.phase
    }

    pub fn computer_sequence(&self) -> &[Cell] {
        &self.computer
    }

    pub fn user_sequence(&self) -> &[Cell] {
        &self.user
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Clip played for a cell
    pub fn asset_at(&self, cell: usize) -> Option<&AssetId> {
        self.cell_assets.get(cell)
    }

    /// Time from the start of playback until input opens
    pub fn playback_duration(&self) -> Duration {
        self.lead_in + self.delay * self.length as u32
    }

    /// The cell the player must tap next, if input is open
    pub fn next_expected(&self) -> Option<Cell> {
        if self.phase != SequencerPhase::AwaitingInput {
            return None;
        }
        self.computer.get(self.user.len()).copied()
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            phase: self.phase,
            computer_sequence: self.computer.clone(),
            user_sequence: self.user.clone(),
            failures: self.failures,
        }
    }

    /// Tap by row and column
    pub fn submit_tap(&mut self, row: usize, col: usize) -> Vec<Event> {
        let cell = Cell::new(row, col);
        if !self.shape.contains_cell(cell) {
            return vec![Event::Rejected {
                cell: self.shape.len(),
                reason: Rejection::OutOfBounds,
            }];
        }
        self.tap(self.shape.index_of(cell))
    }

    /// Independent draws, repeats allowed
    fn generate_sequence(&mut self) {
        let (rows, columns) = (self.shape.rows, self.shape.columns);
        let rng = &mut self.rng;
        self.computer = (0..self.length)
            .map(|_| Cell::new(rng.gen_range(0..rows), rng.gen_range(0..columns)))
            .collect();
        self.user.clear();
    }

    fn start_playback(&mut self) -> Vec<Event> {
        self.timeline.cancel_all();
        self.phase = SequencerPhase::PlayingBack;
        for step in 0..self.computer.len() {
            self.timeline
                .schedule(self.lead_in + self.delay * step as u32, Playback::Cue(step));
        }
        self.timeline.schedule(self.playback_duration(), Playback::Done);
        debug!("sequencer: playback of {} cues", self.computer.len());
        vec![Event::PlaybackStarted {
            length: self.computer.len(),
        }]
    }

    fn cue(&self, cell: Cell) -> Event {
        let index = self.shape.index_of(cell);
        Event::Cue {
            cell: index,
            asset: self.cell_assets[index].clone(),
        }
    }

    fn fail(&mut self, expected: Cell, got: Cell) -> Vec<Event> {
        self.failures += 1;
        debug!("sequencer: expected {} got {}, restarting", expected, got);
        self.computer.clear();
        self.user.clear();
        self.phase = SequencerPhase::Failed;
        self.timeline.cancel_all();
        self.timeline.schedule(self.lead_in, Playback::Restart);
        vec![Event::SequenceFailed { expected, got }]
    }
}

impl PuzzleEngine for SequencerEngine {
    fn shape(&self) -> GridShape {
        self.shape
    }

    fn tap(&mut self, cell: usize) -> Vec<Event> {
        let reject = |reason| vec![Event::Rejected { cell, reason }];
        if !self.shape.contains(cell) {
            return reject(Rejection::OutOfBounds);
        }
        if self.torn_down || self.phase == SequencerPhase::Complete {
            return reject(Rejection::Finished);
        }
        let Some(expected) = self.next_expected() else {
            return reject(Rejection::Locked);
        };

        let got = self.shape.cell_at(cell);
        let mut events = vec![self.cue(got)];
        if got != expected {
            events.extend(self.fail(expected, got));
            return events;
        }

        self.user.push(got);
        events.push(Event::StepAccepted {
            step: self.user.len() - 1,
            cell: got,
        });
        if self.user.len() == self.computer.len() && self.user == self.computer {
            self.phase = SequencerPhase::Complete;
            debug!("sequencer: sequence complete");
            events.push(Event::Completed);
        }
        events
    }

    fn hint(&mut self, ledger: &mut ProgressLedger, cost: u64) -> Result<Vec<Event>> {
        if self.torn_down {
            return Ok(Vec::new());
        }
        let Some(cell) = self.next_expected() else {
            return Ok(Vec::new());
        };
        ledger.charge(cost)?;
        Ok(vec![Event::HintShown {
            hint: Hint::NextStep { cell },
        }, self.cue(cell)])
    }

    fn reset(&mut self) -> Vec<Event> {
        self.torn_down = false;
        self.generate_sequence();
        let mut events = vec![Event::Reset];
        events.extend(self.start_playback());
        events
    }

    fn advance(&mut self, dt: Duration) -> Vec<Event> {
        if self.torn_down {
            return Vec::new();
        }
        let mut events = Vec::new();
        for step in self.timeline.advance(dt) {
            match step {
                Playback::Cue(i) => {
                    if let Some(&cell) = self.computer.get(i) {
                        events.push(self.cue(cell));
                    }
                }
                Playback::Done => {
                    self.phase = SequencerPhase::AwaitingInput;
                    events.push(Event::AwaitingInput);
                }
                Playback::Restart => {
                    self.generate_sequence();
                    events.push(Event::SequenceRestarted);
                    events.extend(self.start_playback());
                }
            }
        }
        events
    }

    fn teardown(&mut self) {
        self.timeline.cancel_all();
        self.torn_down = true;
    }

    fn is_complete(&self) -> bool {
        self.phase == SequencerPhase::Complete
    }

    fn is_locked(&self) -> bool {
        self.torn_down || self.phase != SequencerPhase::AwaitingInput
    }
}
