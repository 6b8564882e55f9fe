//! One level being played: engine, display mapping and rewards.
//!
//! The session is the command surface a shell talks to. It picks the
//! engine for the game, turns display taps into logical ones, forwards
//! cues to the playback collaborator and credits the ledger once when the
//! level is solved or skipped.

use crate::catalog::{GameKey, ModeKey};
use crate::display::DisplayMap;
use crate::engine::{
    PuzzleEngine, SeekEngine, SeekSnapshot, SequencerEngine, SequencerSnapshot, SyncEngine,
    SyncSnapshot,
};
use crate::error::{GameError, Result};
use crate::events::{Event, Rejection};
use crate::ledger::ProgressLedger;
use crate::levels::{level_config, LevelConfig};
use crate::rng::GameRng;
use crate::settings::Settings;
use crate::theme::{AudioPlayback, AudioThemeSource, DEFAULT_THEME};
use crate::timeline::Timeline;
use log::{debug, info};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Input to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Tap the tile shown at this display position
    Tap(usize),
    Hint,
    /// Start the level over, free of charge
    Reset,
    /// Pay to move on to the next level
    Skip,
    /// Let time pass
    Advance(Duration),
}

/// The engine behind a session
#[derive(Debug, Clone)]
pub enum Engine {
    Seek(SeekEngine),
    Sequencer(SequencerEngine),
    Sync(SyncEngine),
}

impl Engine {
    pub fn as_puzzle(&self) -> &dyn PuzzleEngine {
        match self {
            Engine::Seek(e) => e,
            Engine::Sequencer(e) => e,
            Engine::Sync(e) => e,
        }
    }

    pub fn as_puzzle_mut(&mut self) -> &mut dyn PuzzleEngine {
        match self {
            Engine::Seek(e) => e,
            Engine::Sequencer(e) => e,
            Engine::Sync(e) => e,
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        match self {
            Engine::Seek(e) => EngineSnapshot::Seek(e.snapshot()),
            Engine::Sequencer(e) => EngineSnapshot::Sequencer(e.snapshot()),
            Engine::Sync(e) => EngineSnapshot::Sync(e.snapshot()),
        }
    }
}

/// Per-game board state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum EngineSnapshot {
    Seek(SeekSnapshot),
    Sequencer(SequencerSnapshot),
    Sync(SyncSnapshot),
}

/// Everything a shell needs to draw the level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub game: GameKey,
    pub mode: ModeKey,
    pub level: u32,
    pub rows: usize,
    pub columns: usize,
    /// Logical cell for each display position
    pub display: Vec<usize>,
    pub locked: bool,
    pub complete: bool,
    pub skipped: bool,
    pub board: EngineSnapshot,
}

/// Which level to offer when the player comes back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub game: GameKey,
    pub mode: ModeKey,
    pub level: u32,
    /// Points saved before themes were recorded read back as the default
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

impl ResumePoint {
    pub fn load(ledger: &ProgressLedger) -> Option<Self> {
        let json = ledger.session_state()?;
        serde_json::from_str(&json).ok()
    }
}

#[derive(Debug, Clone, Copy)]
enum Cosmetic {
    Reshuffle,
}

/// A level in play
#[derive(Debug, Clone)]
pub struct GameSession {
    config: LevelConfig,
    mode: ModeKey,
    theme: String,
    settings: Settings,
    engine: Engine,
    display: DisplayMap,
    cosmetic: Timeline<Cosmetic>,
    rng: GameRng,
    rewarded: bool,
    skipped: bool,
}

impl GameSession {
    /// Set up `level` of `game` in `mode` with clips from `theme`
    pub fn start(
        game: GameKey,
        mode: ModeKey,
        level: u32,
        theme: &str,
        themes: &dyn AudioThemeSource,
        settings: Settings,
        mut rng: GameRng,
    ) -> Result<Self> {
        if !game.is_active() {
            return Err(GameError::InactiveGame(game));
        }
        if !game.supports(mode) {
            return Err(GameError::UnsupportedMode { game, mode });
        }
        let config = level_config(game, level)?;
        let assets = themes
            .themed_audio_files(theme)
            .ok_or_else(|| GameError::ThemeUnavailable(theme.to_string()))?;

        let engine_rng = GameRng::with_seed(rng.next_u64());
        let engine = match game {
            GameKey::Seek => Engine::Seek(SeekEngine::new(
                &config,
                &assets,
                settings.timing.match_reveal,
                engine_rng,
            )?),
            GameKey::Sequencer => Engine::Sequencer(SequencerEngine::new(
                &config,
                &assets,
                settings.timing.playback_lead_in,
                engine_rng,
            )?),
            GameKey::Sync => Engine::Sync(SyncEngine::new(&config, &assets, engine_rng)?),
            _ => return Err(GameError::InactiveGame(game)),
        };

        let mut session = Self {
            display: DisplayMap::identity(config.total_cells()),
            config,
            mode,
            theme: theme.to_string(),
            settings,
            engine,
            cosmetic: Timeline::new(),
            rng,
            rewarded: false,
            skipped: false,
        };
        session.start_cosmetics();
        info!("session started: {} {} level {}", game, mode, level);
        Ok(session)
    }

    pub fn game(&self) -> GameKey {
        self.config.game
    }

    pub fn mode(&self) -> ModeKey {
        self.mode
    }

    pub fn level(&self) -> u32 {
        self.config.level
    }

    /// Name of the theme the clips were drawn from
    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn display(&self) -> &DisplayMap {
        &self.display
    }

    pub fn is_complete(&self) -> bool {
        self.engine.as_puzzle().is_complete()
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Solved or skipped
    pub fn is_finished(&self) -> bool {
        self.is_complete() || self.skipped
    }

    /// Level unlocked by finishing this one
    pub fn next_level(&self) -> u32 {
        (self.config.level + 1).min(self.config.game.level_count())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            game: self.config.game,
            mode: self.mode,
            level: self.config.level,
            rows: self.config.rows,
            columns: self.config.columns,
            display: self.display.as_slice().to_vec(),
            locked: self.engine.as_puzzle().is_locked(),
            complete: self.is_complete(),
            skipped: self.skipped,
            board: self.engine.snapshot(),
        }
    }

    /// Remember this level as the one to resume
    pub fn remember(&self, ledger: &mut ProgressLedger) {
        let point = ResumePoint {
            game: self.config.game,
            mode: self.mode,
            level: self.config.level,
            theme: self.theme.clone(),
        };
        match serde_json::to_string(&point) {
            Ok(json) => ledger.save_session_state(json),
            Err(e) => debug!("resume point not saved: {}", e),
        }
    }

    /// Run one command. Errors leave the board untouched.
    pub fn apply(
        &mut self,
        command: Command,
        ledger: &mut ProgressLedger,
        audio: &mut dyn AudioPlayback,
    ) -> Result<Vec<Event>> {
        let mut events = match command {
            Command::Tap(display) => match self.display.to_logical(display) {
                Some(cell) => self.engine.as_puzzle_mut().tap(cell),
                None => vec![Event::Rejected {
                    cell: display,
                    reason: Rejection::OutOfBounds,
                }],
            },
            Command::Hint => {
                let cost = self.settings.pricing.hint_cost;
                self.engine.as_puzzle_mut().hint(ledger, cost)?
            }
            Command::Reset => self.reset(),
            Command::Skip => self.skip(ledger)?,
            Command::Advance(dt) => self.advance(dt),
        };
        self.settle(&mut events, ledger);
        play_cues(&events, audio);
        Ok(events)
    }

    /// Cancel every pending callback; the session accepts no more input
    pub fn teardown(&mut self) {
        self.engine.as_puzzle_mut().teardown();
        self.cosmetic.cancel_all();
    }

    fn reset(&mut self) -> Vec<Event> {
        self.skipped = false;
        self.rewarded = false;
        let events = self.engine.as_puzzle_mut().reset();
        self.start_cosmetics();
        events
    }

    fn skip(&mut self, ledger: &mut ProgressLedger) -> Result<Vec<Event>> {
        if self.is_finished() {
            return Ok(Vec::new());
        }
        ledger.charge(self.settings.pricing.skip_cost)?;
        self.skipped = true;
        self.teardown();
        let unlocked = self.next_level();
        ledger.update_game_progress(self.config.game, self.mode, unlocked);
        info!(
            "skipped {} level {}, unlocked {}",
            self.config.game, self.config.level, unlocked
        );
        Ok(vec![Event::Skipped { unlocked }])
    }

    fn advance(&mut self, dt: Duration) -> Vec<Event> {
        let mut events = self.engine.as_puzzle_mut().advance(dt);
        for tick in self.cosmetic.advance(dt) {
            match tick {
                Cosmetic::Reshuffle => {
                    self.display.shuffle(&mut self.rng);
                    self.cosmetic
                        .schedule(self.settings.timing.shuffle_interval, Cosmetic::Reshuffle);
                    events.push(Event::DisplayShuffled);
                }
            }
        }
        events
    }

    fn start_cosmetics(&mut self) {
        self.cosmetic.cancel_all();
        self.display = DisplayMap::identity(self.config.total_cells());
        if self.mode.permutes_display() {
            self.display.shuffle(&mut self.rng);
            self.cosmetic
                .schedule(self.settings.timing.shuffle_interval, Cosmetic::Reshuffle);
        }
    }

    /// Credit a solved level exactly once
    fn settle(&mut self, events: &mut Vec<Event>, ledger: &mut ProgressLedger) {
        if self.rewarded || !events.iter().any(Event::is_completion) {
            return;
        }
        self.rewarded = true;
        self.cosmetic.cancel_all();
        let tokens = self.settings.pricing.level_reward;
        let unlocked = self.next_level();
        ledger.increment_wins();
        ledger.award_cash(tokens);
        ledger.update_game_progress(self.config.game, self.mode, unlocked);
        info!(
            "{} level {} solved, +{} tokens",
            self.config.game, self.config.level, tokens
        );
        events.push(Event::LevelRewarded { tokens, unlocked });
    }
}

fn play_cues(events: &[Event], audio: &mut dyn AudioPlayback) {
    for event in events {
        if let Event::Cue { asset, .. } = event {
            audio.load(asset);
            audio.play();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Timing;
    use crate::store::MemoryStore;
    use crate::theme::{AssetId, SilentPlayback, ThemeLibrary};

    #[derive(Default)]
    struct RecordingPlayback {
        loaded: Vec<AssetId>,
        plays: usize,
    }

    impl AudioPlayback for RecordingPlayback {
        fn load(&mut self, asset: &AssetId) {
            self.loaded.push(asset.clone());
        }
        fn play(&mut self) {
            self.plays += 1;
        }
        fn stop(&mut self) {}
        fn set_volume(&mut self, _volume: f32) {}
    }

    fn instant() -> Settings {
        Settings {
            timing: Timing::instant(),
            ..Settings::default()
        }
    }

    fn start(game: GameKey, mode: ModeKey, level: u32) -> GameSession {
        GameSession::start(
            game,
            mode,
            level,
            "animals",
            &ThemeLibrary::builtin(),
            instant(),
            GameRng::with_seed(21),
        )
        .unwrap()
    }

    fn solve_seek(session: &mut GameSession, ledger: &mut ProgressLedger) -> Vec<Event> {
        let mut all = Vec::new();
        while let Engine::Seek(seek) = session.engine() {
            let Some((a, b)) = seek.find_pair() else { break };
            let (da, db) = (
                session.display().to_display(a).unwrap(),
                session.display().to_display(b).unwrap(),
            );
            for position in [da, db] {
                let events = session
                    .apply(Command::Tap(position), ledger, &mut SilentPlayback)
                    .unwrap();
                all.extend(events);
            }
        }
        all
    }

    #[test]
    fn test_rejects_inactive_and_unsupported() {
        let themes = ThemeLibrary::builtin();
        let err = GameSession::start(
            GameKey::Relay,
            ModeKey::Classic,
            1,
            "animals",
            &themes,
            instant(),
            GameRng::with_seed(1),
        )
        .unwrap_err();
        assert_eq!(err, GameError::InactiveGame(GameKey::Relay));

        let err = GameSession::start(
            GameKey::Sequencer,
            ModeKey::Shuffle,
            1,
            "animals",
            &themes,
            instant(),
            GameRng::with_seed(1),
        )
        .unwrap_err();
        assert!(matches!(err, GameError::UnsupportedMode { .. }));

        let err = GameSession::start(
            GameKey::Seek,
            ModeKey::Classic,
            1,
            "jazz",
            &themes,
            instant(),
            GameRng::with_seed(1),
        )
        .unwrap_err();
        assert_eq!(err, GameError::ThemeUnavailable("jazz".into()));
    }

    #[test]
    fn test_completion_rewards_once() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        let mut session = start(GameKey::Seek, ModeKey::Classic, 2);
        let events = solve_seek(&mut session, &mut ledger);
        assert!(session.is_complete());
        let rewards: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::LevelRewarded { .. }))
            .collect();
        assert_eq!(rewards, vec![&Event::LevelRewarded { tokens: 5, unlocked: 3 }]);
        assert_eq!(ledger.total_wins(), 1);
        assert_eq!(ledger.total_tokens(), 5);
        assert_eq!(ledger.level_reached(GameKey::Seek, ModeKey::Classic), 3);

        // Further input changes nothing
        session
            .apply(Command::Tap(0), &mut ledger, &mut SilentPlayback)
            .unwrap();
        assert_eq!(ledger.total_wins(), 1);
    }

    #[test]
    fn test_cues_reach_playback() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        let mut audio = RecordingPlayback::default();
        let mut session = start(GameKey::Seek, ModeKey::Classic, 1);
        session.apply(Command::Tap(0), &mut ledger, &mut audio).unwrap();
        let Engine::Seek(seek) = session.engine() else {
            panic!("expected seek");
        };
        assert_eq!(audio.loaded, vec![seek.pairs()[0].clone()]);
        assert_eq!(audio.plays, 1);
    }

    #[test]
    fn test_skip_requires_tokens() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        let mut session = start(GameKey::Sync, ModeKey::Classic, 4);
        let err = session
            .apply(Command::Skip, &mut ledger, &mut SilentPlayback)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientFunds {
                required: 40,
                available: 0
            }
        );
        assert!(!session.is_skipped());

        ledger.award_cash(100);
        let events = session
            .apply(Command::Skip, &mut ledger, &mut SilentPlayback)
            .unwrap();
        assert_eq!(events, vec![Event::Skipped { unlocked: 5 }]);
        assert_eq!(ledger.total_tokens(), 60);
        assert_eq!(ledger.total_wins(), 0);
        assert_eq!(ledger.level_reached(GameKey::Sync, ModeKey::Classic), 5);
        assert!(session.snapshot().locked);
    }

    #[test]
    fn test_last_level_unlock_is_clamped() {
        let session = start(GameKey::Sync, ModeKey::Classic, 25);
        assert_eq!(session.next_level(), 25);
    }

    #[test]
    fn test_shuffle_mode_remaps_taps() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        let mut session = start(GameKey::Seek, ModeKey::Shuffle, 5);
        let Engine::Seek(seek) = session.engine() else {
            panic!("expected seek");
        };
        let logical = (0..seek.pairs().len())
            .find(|c| !seek.matched().contains(c))
            .unwrap();
        let shown_at = session.display().to_display(logical).unwrap();
        let events = session
            .apply(Command::Tap(shown_at), &mut ledger, &mut SilentPlayback)
            .unwrap();
        assert_eq!(events[0], Event::Selected { cell: logical });

        let events = session
            .apply(
                Command::Advance(Duration::from_secs(4)),
                &mut ledger,
                &mut SilentPlayback,
            )
            .unwrap();
        assert!(events.contains(&Event::DisplayShuffled));
        // Puzzle truth is untouched by reshuffles
        let Engine::Seek(seek) = session.engine() else {
            panic!("expected seek");
        };
        assert_eq!(seek.selected(), &[logical]);
    }

    #[test]
    fn test_classic_mode_never_reshuffles() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        let mut session = start(GameKey::Sync, ModeKey::Classic, 3);
        let events = session
            .apply(
                Command::Advance(Duration::from_secs(60)),
                &mut ledger,
                &mut SilentPlayback,
            )
            .unwrap();
        assert!(events.is_empty());
        assert!(session.display().is_identity());
    }

    #[test]
    fn test_reset_after_skip_reopens_level() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        ledger.award_cash(40);
        let mut session = start(GameKey::Sync, ModeKey::Classic, 2);
        session
            .apply(Command::Skip, &mut ledger, &mut SilentPlayback)
            .unwrap();
        let events = session
            .apply(Command::Reset, &mut ledger, &mut SilentPlayback)
            .unwrap();
        assert_eq!(events, vec![Event::Reset]);
        assert!(!session.is_finished());
        assert!(!session.snapshot().locked);
    }

    #[test]
    fn test_resume_point_round_trip() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        let session = start(GameKey::Sequencer, ModeKey::Rotate, 7);
        session.remember(&mut ledger);
        assert_eq!(
            ResumePoint::load(&ledger),
            Some(ResumePoint {
                game: GameKey::Sequencer,
                mode: ModeKey::Rotate,
                level: 7,
                theme: "animals".to_string(),
            })
        );
        ledger.reset_progress();
        assert_eq!(ResumePoint::load(&ledger), None);
    }

    #[test]
    fn test_resume_point_keeps_theme() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        let session = GameSession::start(
            GameKey::Seek,
            ModeKey::Classic,
            22,
            "retro",
            &ThemeLibrary::builtin(),
            Settings::default(),
            GameRng::with_seed(5),
        )
        .unwrap();
        assert_eq!(session.theme(), "retro");
        session.remember(&mut ledger);
        assert_eq!(ResumePoint::load(&ledger).unwrap().theme, "retro");

        ledger.save_session_state(r#"{"game":"seek","mode":"classic","level":3}"#.to_string());
        assert_eq!(ResumePoint::load(&ledger).unwrap().theme, DEFAULT_THEME);
    }
}
