use log::warn;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonegrid_core::{
    level_config as core_level_config, AssetId, AudioPlayback, AudioThemeSource, Cell, Command,
    Event, GameError, GameKey, GameRng, GameSession, Hint, KeyValueStore, LevelConfig,
    MemoryStore, ModeKey, ProgressLedger, Rejection, ResumePoint, Settings, ThemeLibrary,
};

uniffi::setup_scaffolding!();

/// Errors surfaced to the host app
#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum TonegridError {
    /// No such game, level or theme
    #[error("{0}")]
    NotFound(String),
    /// The game or mode cannot be played
    #[error("{0}")]
    Unavailable(String),
    /// Not enough tokens for a hint or skip
    #[error("{0}")]
    InsufficientFunds(String),
    /// Malformed input such as bad settings JSON
    #[error("{0}")]
    Invalid(String),
}

impl From<GameError> for TonegridError {
    fn from(e: GameError) -> Self {
        let message = e.to_string();
        match e {
            GameError::ConfigNotFound { .. } | GameError::ThemeUnavailable(_) => {
                TonegridError::NotFound(message)
            }
            GameError::InactiveGame(_)
            | GameError::UnsupportedMode { .. }
            | GameError::NotEnoughAssets { .. } => TonegridError::Unavailable(message),
            GameError::InsufficientFunds { .. } => TonegridError::InsufficientFunds(message),
            GameError::InvalidMove(_) | GameError::Persistence(_) => {
                TonegridError::Invalid(message)
            }
        }
    }
}

/// The mini-games in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum GameId {
    Seek,
    Sequencer,
    Sync,
    Tempo,
    Pitch,
    Chorus,
    Relay,
}

impl From<GameId> for GameKey {
    fn from(g: GameId) -> Self {
        match g {
            GameId::Seek => GameKey::Seek,
            GameId::Sequencer => GameKey::Sequencer,
            GameId::Sync => GameKey::Sync,
            GameId::Tempo => GameKey::Tempo,
            GameId::Pitch => GameKey::Pitch,
            GameId::Chorus => GameKey::Chorus,
            GameId::Relay => GameKey::Relay,
        }
    }
}

impl From<GameKey> for GameId {
    fn from(g: GameKey) -> Self {
        match g {
            GameKey::Seek => GameId::Seek,
            GameKey::Sequencer => GameId::Sequencer,
            GameKey::Sync => GameId::Sync,
            GameKey::Tempo => GameId::Tempo,
            GameKey::Pitch => GameId::Pitch,
            GameKey::Chorus => GameId::Chorus,
            GameKey::Relay => GameId::Relay,
        }
    }
}

/// Visual variants a game can be played in
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ModeId {
    Classic,
    Shapes,
    Recolor,
    Resize,
    Rotate,
    Translate,
    Dilate,
    Shuffle,
    Ghost,
}

impl From<ModeId> for ModeKey {
    fn from(m: ModeId) -> Self {
        match m {
            ModeId::Classic => ModeKey::Classic,
            ModeId::Shapes => ModeKey::Shapes,
            ModeId::Recolor => ModeKey::Recolor,
            ModeId::Resize => ModeKey::Resize,
            ModeId::Rotate => ModeKey::Rotate,
            ModeId::Translate => ModeKey::Translate,
            ModeId::Dilate => ModeKey::Dilate,
            ModeId::Shuffle => ModeKey::Shuffle,
            ModeId::Ghost => ModeKey::Ghost,
        }
    }
}

impl From<ModeKey> for ModeId {
    fn from(m: ModeKey) -> Self {
        match m {
            ModeKey::Classic => ModeId::Classic,
            ModeKey::Shapes => ModeId::Shapes,
            ModeKey::Recolor => ModeId::Recolor,
            ModeKey::Resize => ModeId::Resize,
            ModeKey::Rotate => ModeId::Rotate,
            ModeKey::Translate => ModeId::Translate,
            ModeKey::Dilate => ModeId::Dilate,
            ModeKey::Shuffle => ModeId::Shuffle,
            ModeKey::Ghost => ModeId::Ghost,
        }
    }
}

/// A catalog entry for the game picker
#[derive(Debug, Clone, uniffi::Record)]
pub struct GameEntry {
    pub id: GameId,
    pub title: String,
    pub description: String,
    pub modes: Vec<ModeId>,
    pub level_count: u32,
    pub is_active: bool,
}

/// Layout and difficulty of one level
#[derive(Debug, Clone, uniffi::Record)]
pub struct LevelInfo {
    pub game: GameId,
    pub level: u32,
    pub rows: u32,
    pub columns: u32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub cell_spacing: f32,
    /// Sequencer only
    pub sequence_length: Option<u32>,
    /// Sequencer only, milliseconds between cues
    pub sequence_delay_ms: Option<u64>,
    /// Sync only
    pub scramble_steps: Option<u32>,
}

impl From<LevelConfig> for LevelInfo {
    fn from(c: LevelConfig) -> Self {
        LevelInfo {
            game: c.game.into(),
            level: c.level,
            rows: c.rows as u32,
            columns: c.columns as u32,
            cell_width: c.cell_width,
            cell_height: c.cell_height,
            cell_spacing: c.cell_spacing,
            sequence_length: c.sequence_length().map(|n| n as u32),
            sequence_delay_ms: c.sequence_delay().map(|d| d.as_millis() as u64),
            scramble_steps: c.scramble_steps().map(|n| n as u32),
        }
    }
}

/// A grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct CellPos {
    pub row: u32,
    pub col: u32,
}

impl From<Cell> for CellPos {
    fn from(c: Cell) -> Self {
        CellPos {
            row: c.row as u32,
            col: c.col as u32,
        }
    }
}

/// Why a tap was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum TapRejection {
    Locked,
    Finished,
    OutOfBounds,
    AlreadyMatched,
    NotAdjacent,
}

impl From<Rejection> for TapRejection {
    fn from(r: Rejection) -> Self {
        match r {
            Rejection::Locked => TapRejection::Locked,
            Rejection::Finished => TapRejection::Finished,
            Rejection::OutOfBounds => TapRejection::OutOfBounds,
            Rejection::AlreadyMatched => TapRejection::AlreadyMatched,
            Rejection::NotAdjacent => TapRejection::NotAdjacent,
        }
    }
}

/// What a hint revealed. Cell indices are logical.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum GameHint {
    Pair { first: u32, second: u32 },
    NextStep { cell: CellPos },
    Swap { a: u32, b: u32 },
}

impl From<Hint> for GameHint {
    fn from(h: Hint) -> Self {
        match h {
            Hint::Pair { first, second } => GameHint::Pair {
                first: first as u32,
                second: second as u32,
            },
            Hint::NextStep { cell } => GameHint::NextStep { cell: cell.into() },
            Hint::Swap { a, b } => GameHint::Swap {
                a: a as u32,
                b: b as u32,
            },
        }
    }
}

/// Something the UI should react to. Cell indices are logical; use
/// `PuzzleGame::display_order` to find where a cell is drawn.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum GameEvent {
    Cue { cell: u32, asset: String },
    Selected { cell: u32 },
    Deselected { cell: u32 },
    Rejected { cell: u32, reason: TapRejection },
    Matched { first: u32, second: u32 },
    Mismatched { first: u32, second: u32 },
    PlaybackStarted { length: u32 },
    AwaitingInput,
    StepAccepted { step: u32, cell: CellPos },
    SequenceFailed { expected: CellPos, got: CellPos },
    SequenceRestarted,
    Swapped { a: u32, b: u32 },
    HintShown { hint: GameHint },
    Completed,
    LevelRewarded { tokens: u64, unlocked: u32 },
    Skipped { unlocked: u32 },
    Reset,
    DisplayShuffled,
}

impl From<Event> for GameEvent {
    fn from(e: Event) -> Self {
        let idx = |i: usize| i as u32;
        match e {
            Event::Cue { cell, asset } => GameEvent::Cue {
                cell: idx(cell),
                asset: asset.as_str().to_string(),
            },
            Event::Selected { cell } => GameEvent::Selected { cell: idx(cell) },
            Event::Deselected { cell } => GameEvent::Deselected { cell: idx(cell) },
            Event::Rejected { cell, reason } => GameEvent::Rejected {
                cell: idx(cell),
                reason: reason.into(),
            },
            Event::Matched { first, second } => GameEvent::Matched {
                first: idx(first),
                second: idx(second),
            },
            Event::Mismatched { first, second } => GameEvent::Mismatched {
                first: idx(first),
                second: idx(second),
            },
            Event::PlaybackStarted { length } => GameEvent::PlaybackStarted {
                length: idx(length),
            },
            Event::AwaitingInput => GameEvent::AwaitingInput,
            Event::StepAccepted { step, cell } => GameEvent::StepAccepted {
                step: idx(step),
                cell: cell.into(),
            },
            Event::SequenceFailed { expected, got } => GameEvent::SequenceFailed {
                expected: expected.into(),
                got: got.into(),
            },
            Event::SequenceRestarted => GameEvent::SequenceRestarted,
            Event::Swapped { a, b } => GameEvent::Swapped {
                a: idx(a),
                b: idx(b),
            },
            Event::HintShown { hint } => GameEvent::HintShown { hint: hint.into() },
            Event::Completed => GameEvent::Completed,
            Event::LevelRewarded { tokens, unlocked } => {
                GameEvent::LevelRewarded { tokens, unlocked }
            }
            Event::Skipped { unlocked } => GameEvent::Skipped { unlocked },
            Event::Reset => GameEvent::Reset,
            Event::DisplayShuffled => GameEvent::DisplayShuffled,
        }
    }
}

/// Key-value persistence supplied by the host (UserDefaults, SharedPreferences, ...)
#[uniffi::export(callback_interface)]
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: String) -> Option<String>;
    /// Returns false if the write failed
    fn set(&self, key: String, value: String) -> bool;
    fn remove(&self, key: String) -> bool;
}

/// Audio playback supplied by the host
#[uniffi::export(callback_interface)]
pub trait AudioBackend: Send + Sync {
    fn load(&self, asset: String);
    fn play(&self);
    fn stop(&self);
    fn set_volume(&self, volume: f32);
}

/// Clip lists for the themes the host has installed
#[uniffi::export(callback_interface)]
pub trait ThemeProvider: Send + Sync {
    fn themed_audio_files(&self, theme: String) -> Option<Vec<String>>;
}

struct HostStore(Box<dyn StorageBackend>);

impl KeyValueStore for HostStore {
    fn get(&self, key: &str) -> tonegrid_core::Result<Option<String>> {
        Ok(self.0.get(key.to_string()))
    }

    fn set(&mut self, key: &str, value: String) -> tonegrid_core::Result<()> {
        if self.0.set(key.to_string(), value) {
            Ok(())
        } else {
            Err(GameError::Persistence(format!("host refused write of {key}")))
        }
    }

    fn remove(&mut self, key: &str) -> tonegrid_core::Result<()> {
        if self.0.remove(key.to_string()) {
            Ok(())
        } else {
            Err(GameError::Persistence(format!("host refused removal of {key}")))
        }
    }
}

struct HostAudio(Box<dyn AudioBackend>);

impl AudioPlayback for HostAudio {
    fn load(&mut self, asset: &AssetId) {
        self.0.load(asset.as_str().to_string());
    }

    fn play(&mut self) {
        self.0.play();
    }

    fn stop(&mut self) {
        self.0.stop();
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.set_volume(volume);
    }
}

struct HostThemes(Box<dyn ThemeProvider>);

impl AudioThemeSource for HostThemes {
    fn themed_audio_files(&self, theme: &str) -> Option<Vec<AssetId>> {
        self.0
            .themed_audio_files(theme.to_string())
            .map(|ids| ids.into_iter().map(AssetId::new).collect())
    }
}

/// Tokens, wins and unlocked levels, written through to host storage
#[derive(uniffi::Object)]
pub struct ProgressBook {
    ledger: Mutex<ProgressLedger>,
}

#[uniffi::export]
impl ProgressBook {
    /// Load progress from host storage
    #[uniffi::constructor]
    pub fn new(storage: Box<dyn StorageBackend>) -> Arc<Self> {
        Arc::new(Self {
            ledger: Mutex::new(ProgressLedger::open(HostStore(storage))),
        })
    }

    /// Progress that lives only as long as this object
    #[uniffi::constructor]
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            ledger: Mutex::new(ProgressLedger::open(MemoryStore::new())),
        })
    }

    pub fn total_tokens(&self) -> u64 {
        self.ledger.lock().unwrap().total_tokens()
    }

    pub fn total_wins(&self) -> u64 {
        self.ledger.lock().unwrap().total_wins()
    }

    pub fn can_afford(&self, cost: u64) -> bool {
        self.ledger.lock().unwrap().can_afford(cost)
    }

    pub fn award_cash(&self, amount: u64) {
        self.ledger.lock().unwrap().award_cash(amount);
    }

    /// Returns false and leaves the balance alone if it is too low
    pub fn deduct_cash(&self, amount: u64) -> bool {
        self.ledger.lock().unwrap().deduct_cash(amount)
    }

    pub fn increment_wins(&self) {
        self.ledger.lock().unwrap().increment_wins();
    }

    pub fn update_game_progress(&self, game: GameId, mode: ModeId, level: u32) {
        self.ledger
            .lock()
            .unwrap()
            .update_game_progress(game.into(), mode.into(), level);
    }

    /// Highest unlocked level, 1 if never played
    pub fn level_reached(&self, game: GameId, mode: ModeId) -> u32 {
        self.ledger
            .lock()
            .unwrap()
            .level_reached(game.into(), mode.into())
    }

    /// Clear wins and unlocks; tokens are kept
    pub fn reset_progress(&self) {
        self.ledger.lock().unwrap().reset_progress();
    }

    pub fn can_collect_daily_reward(&self) -> bool {
        self.ledger.lock().unwrap().can_collect_daily_reward()
    }

    pub fn mark_reward_as_collected(&self) {
        self.ledger.lock().unwrap().mark_reward_as_collected();
    }

    /// Credit the daily reward if it has not been taken yet today
    pub fn collect_daily_reward(&self, amount: u64) -> bool {
        self.ledger.lock().unwrap().collect_daily_reward(amount)
    }

    /// Called by the host at local midnight
    pub fn start_new_day(&self) {
        self.ledger.lock().unwrap().start_new_day();
    }

    /// Last level the player was in, ready to pass back to `PuzzleGame::new`
    pub fn resume_point(&self) -> Option<GameRequest> {
        let ledger = self.ledger.lock().unwrap();
        let point = ResumePoint::load(&ledger)?;
        Some(GameRequest {
            game: point.game.into(),
            mode: point.mode.into(),
            level: point.level,
            theme: point.theme,
            seed: None,
            settings_json: None,
        })
    }

    /// The whole record as JSON, for debugging screens
    pub fn serialize(&self) -> String {
        let ledger = self.ledger.lock().unwrap();
        serde_json::to_string(ledger.record()).unwrap_or_else(|e| {
            warn!("progress record did not serialize: {}", e);
            String::new()
        })
    }
}

/// What to start
#[derive(Debug, Clone, uniffi::Record)]
pub struct GameRequest {
    pub game: GameId,
    pub mode: ModeId,
    pub level: u32,
    pub theme: String,
    /// Fixed seed for reproducible boards
    pub seed: Option<u64>,
    /// Settings JSON; defaults apply to anything missing
    pub settings_json: Option<String>,
}

/// A level in progress
#[derive(uniffi::Object)]
pub struct PuzzleGame {
    session: Mutex<GameSession>,
    book: Arc<ProgressBook>,
    audio: Mutex<HostAudio>,
}

#[uniffi::export]
impl PuzzleGame {
    #[uniffi::constructor]
    pub fn new(
        book: Arc<ProgressBook>,
        request: GameRequest,
        themes: Box<dyn ThemeProvider>,
        audio: Box<dyn AudioBackend>,
    ) -> Result<Arc<Self>, TonegridError> {
        let settings = match request.settings_json.as_deref() {
            Some(json) => serde_json::from_str::<Settings>(json).map_err(|e| {
                warn!("rejecting settings json: {}", e);
                TonegridError::Invalid(e.to_string())
            })?,
            None => Settings::default(),
        };
        let rng = match request.seed {
            Some(seed) => GameRng::with_seed(seed),
            None => GameRng::from_entropy(),
        };
        let session = GameSession::start(
            request.game.into(),
            request.mode.into(),
            request.level,
            &request.theme,
            &HostThemes(themes),
            settings,
            rng,
        )?;
        session.remember(&mut book.ledger.lock().unwrap());
        Ok(Arc::new(Self {
            session: Mutex::new(session),
            book,
            audio: Mutex::new(HostAudio(audio)),
        }))
    }

    /// Tap the tile drawn at `position` (row-major display order)
    pub fn tap(&self, position: u32) -> Result<Vec<GameEvent>, TonegridError> {
        self.run(Command::Tap(position as usize))
    }

    /// Tap the tile drawn at a row and column
    pub fn tap_cell(&self, row: u32, col: u32) -> Result<Vec<GameEvent>, TonegridError> {
        let columns = self.session.lock().unwrap().config().columns as u32;
        self.tap(row * columns + col)
    }

    /// Buy a hint. An empty list means no hint was available and nothing was charged.
    pub fn hint(&self) -> Result<Vec<GameEvent>, TonegridError> {
        self.run(Command::Hint)
    }

    pub fn reset(&self) -> Result<Vec<GameEvent>, TonegridError> {
        self.run(Command::Reset)
    }

    /// Pay the skip cost and unlock the next level
    pub fn skip(&self) -> Result<Vec<GameEvent>, TonegridError> {
        self.run(Command::Skip)
    }

    /// Drive timers; the host calls this from its frame or timer loop
    pub fn advance(&self, elapsed_ms: u64) -> Result<Vec<GameEvent>, TonegridError> {
        self.run(Command::Advance(Duration::from_millis(elapsed_ms)))
    }

    /// Stop all pending callbacks, e.g. when the screen is dismissed
    pub fn teardown(&self) {
        self.session.lock().unwrap().teardown();
        self.audio.lock().unwrap().stop();
    }

    pub fn level_info(&self) -> LevelInfo {
        (*self.session.lock().unwrap().config()).into()
    }

    pub fn next_level(&self) -> u32 {
        self.session.lock().unwrap().next_level()
    }

    pub fn is_complete(&self) -> bool {
        self.session.lock().unwrap().is_complete()
    }

    pub fn is_locked(&self) -> bool {
        self.session.lock().unwrap().snapshot().locked
    }

    /// Logical cell drawn at each display position
    pub fn display_order(&self) -> Vec<u32> {
        let session = self.session.lock().unwrap();
        session.display().as_slice().iter().map(|&c| c as u32).collect()
    }

    /// Board state as JSON for rendering
    pub fn snapshot_json(&self) -> String {
        let session = self.session.lock().unwrap();
        serde_json::to_string(&session.snapshot()).unwrap_or_else(|e| {
            warn!("snapshot did not serialize: {}", e);
            String::new()
        })
    }

    pub fn set_volume(&self, volume: f32) {
        self.audio.lock().unwrap().set_volume(volume.clamp(0.0, 1.0));
    }
}

impl PuzzleGame {
    fn run(&self, command: Command) -> Result<Vec<GameEvent>, TonegridError> {
        let mut session = self.session.lock().unwrap();
        let mut ledger = self.book.ledger.lock().unwrap();
        let mut audio = self.audio.lock().unwrap();
        let events = session.apply(command, &mut ledger, &mut *audio)?;
        Ok(events.into_iter().map(GameEvent::from).collect())
    }
}

/// Every game in the catalog, active or not
#[uniffi::export]
pub fn game_catalog() -> Vec<GameEntry> {
    GameKey::all()
        .iter()
        .map(|key| {
            let info = key.info();
            GameEntry {
                id: info.key.into(),
                title: info.title.to_string(),
                description: info.description.to_string(),
                modes: info.supported_modes.iter().map(|&m| m.into()).collect(),
                level_count: info.level_count,
                is_active: info.is_active,
            }
        })
        .collect()
}

/// Layout of a level, without starting it
#[uniffi::export]
pub fn level_info(game: GameId, level: u32) -> Result<LevelInfo, TonegridError> {
    Ok(core_level_config(game.into(), level)?.into())
}

/// Theme names bundled with the core
#[uniffi::export]
pub fn builtin_themes() -> Vec<String> {
    ThemeLibrary::builtin()
        .theme_names()
        .map(str::to_string)
        .collect()
}
