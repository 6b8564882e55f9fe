//! Headless solver that plays a level through the public command surface.

use log::{debug, trace};
use serde::Serialize;
use std::time::Duration;
use tonegrid_core::{
    Command, Engine, Event, GameSession, ProgressLedger, PuzzleEngine, SilentPlayback,
};

/// Upper bound on commands so a broken level cannot spin forever
const MAX_COMMANDS: usize = 20_000;

/// Frame length used when waiting on timers
const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Default, Clone, Serialize)]
pub struct AutoplayReport {
    pub commands: usize,
    pub taps: usize,
    pub hints: usize,
    pub mistakes: usize,
    pub completed: bool,
    pub tokens_earned: u64,
    pub unlocked: Option<u32>,
    pub elapsed_ms: u64,
}

/// Plays `session` to completion.
///
/// With `use_hints` set, hints are bought whenever the ledger can afford
/// them; otherwise the solver works from the engine state directly.
pub struct Autoplayer<'a> {
    session: &'a mut GameSession,
    ledger: &'a mut ProgressLedger,
    use_hints: bool,
    report: AutoplayReport,
    on_event: Box<dyn FnMut(&Event) + 'a>,
}

impl<'a> Autoplayer<'a> {
    pub fn new(session: &'a mut GameSession, ledger: &'a mut ProgressLedger) -> Self {
        Self {
            session,
            ledger,
            use_hints: false,
            report: AutoplayReport::default(),
            on_event: Box::new(|_| {}),
        }
    }

    pub fn use_hints(mut self, yes: bool) -> Self {
        self.use_hints = yes;
        self
    }

    /// Observe every event as it is produced
    pub fn on_event(mut self, f: impl FnMut(&Event) + 'a) -> Self {
        self.on_event = Box::new(f);
        self
    }

    pub fn run(mut self) -> anyhow::Result<AutoplayReport> {
        while !self.session.is_finished() {
            if self.report.commands >= MAX_COMMANDS {
                anyhow::bail!("gave up after {} commands", MAX_COMMANDS);
            }
            self.step()?;
        }
        debug!("autoplay finished: {:?}", self.report);
        Ok(self.report)
    }

    fn step(&mut self) -> anyhow::Result<()> {
        if self.session.engine().as_puzzle().is_locked() {
            self.send(Command::Advance(TICK))?;
            return Ok(());
        }
        if self.use_hints && self.ledger.can_afford(self.session.settings().pricing.hint_cost) {
            if !self.send(Command::Hint)?.is_empty() {
                self.report.hints += 1;
                return Ok(());
            }
            // Greedy hints stall on some boards and would fight the solver
            self.use_hints = false;
        }
        match self.next_taps() {
            Some(cells) => {
                for cell in cells {
                    let position = self
                        .session
                        .display()
                        .to_display(cell)
                        .ok_or_else(|| anyhow::anyhow!("cell {} is not on screen", cell))?;
                    self.send(Command::Tap(position))?;
                    self.report.taps += 1;
                }
                Ok(())
            }
            None => {
                self.send(Command::Advance(TICK))?;
                Ok(())
            }
        }
    }

    /// Logical cells to tap next, if the engine is taking input
    fn next_taps(&self) -> Option<Vec<usize>> {
        match self.session.engine() {
            Engine::Seek(seek) => {
                let (a, b) = seek.find_pair()?;
                // Finish a half-made selection before starting a new pair
                match seek.selected() {
                    [only] if *only == a => Some(vec![b]),
                    [only] if *only == b => Some(vec![a]),
                    [only] => Some(vec![*only]),
                    _ => Some(vec![a, b]),
                }
            }
            Engine::Sequencer(seq) => {
                let cell = seq.next_expected()?;
                Some(vec![seq.shape().index_of(cell)])
            }
            Engine::Sync(sync) => {
                if let Some(selected) = sync.selected() {
                    return Some(vec![selected]);
                }
                let (a, b) = sync.solving_swap()?;
                Some(vec![a, b])
            }
        }
    }

    fn send(&mut self, command: Command) -> anyhow::Result<Vec<Event>> {
        let events = self
            .session
            .apply(command, self.ledger, &mut SilentPlayback)?;
        self.report.commands += 1;
        if let Command::Advance(dt) = command {
            self.report.elapsed_ms += dt.as_millis() as u64;
        }
        for event in &events {
            trace!("{:?}", event);
            match event {
                Event::Mismatched { .. } | Event::SequenceFailed { .. } => {
                    self.report.mistakes += 1
                }
                Event::Completed => self.report.completed = true,
                Event::LevelRewarded { tokens, unlocked } => {
                    self.report.tokens_earned += tokens;
                    self.report.unlocked = Some(*unlocked);
                }
                Event::Skipped { unlocked } => self.report.unlocked = Some(*unlocked),
                _ => {}
            }
            (self.on_event)(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonegrid_core::{GameKey, GameRng, MemoryStore, ModeKey, Settings, ThemeLibrary};

    fn session(game: GameKey, mode: ModeKey, level: u32, seed: u64) -> GameSession {
        GameSession::start(
            game,
            mode,
            level,
            "instruments",
            &ThemeLibrary::builtin(),
            Settings::default(),
            GameRng::with_seed(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_solves_every_active_game() {
        for game in GameKey::active() {
            for level in [1, 9, 25] {
                let mut ledger = ProgressLedger::open(MemoryStore::new());
                let mut s = session(game, ModeKey::Classic, level, level as u64);
                let report = Autoplayer::new(&mut s, &mut ledger).run().unwrap();
                assert!(report.completed, "{} level {}", game, level);
                assert_eq!(report.mistakes, 0);
                assert_eq!(ledger.total_wins(), 1);
            }
        }
    }

    #[test]
    fn test_shuffle_mode_is_solved_through_display() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        let mut s = session(GameKey::Sync, ModeKey::Shuffle, 7, 3);
        let report = Autoplayer::new(&mut s, &mut ledger).run().unwrap();
        assert!(report.completed);
        assert_eq!(report.unlocked, Some(8));
    }

    #[test]
    fn test_hints_are_paid_for() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        ledger.award_cash(1_000);
        let mut s = session(GameKey::Seek, ModeKey::Classic, 4, 8);
        let mut seen = 0;
        let report = Autoplayer::new(&mut s, &mut ledger)
            .use_hints(true)
            .on_event(|_| seen += 1)
            .run()
            .unwrap();
        assert!(report.completed);
        assert!(report.hints > 0);
        assert!(seen > 0);
        assert_eq!(
            ledger.total_tokens(),
            1_000 - 10 * report.hints as u64 + report.tokens_earned
        );
    }
}
