use serde::{Deserialize, Serialize};

/// Number of levels every active game ships with
pub const LEVELS_PER_GAME: u32 = 25;

/// Identifier of a mini-game in the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKey {
    /// Pair-matching with audio cues
    Seek,
    /// Repeat a played-back sequence of cells
    Sequencer,
    /// Rearrange a scrambled grid back into the target
    Sync,
    Tempo,
    Pitch,
    Chorus,
    Relay,
}

/// Cosmetic or interaction variant a game can be played in.
///
/// Only `Shuffle` touches the way taps reach the engine (through a
/// [`crate::DisplayMap`]); every other mode is rendering-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKey {
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

/// Static description of a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub key: GameKey,
    pub title: &'static str,
    pub description: &'static str,
    pub supported_modes: &'static [ModeKey],
    pub level_count: u32,
    pub is_active: bool,
}

impl GameKey {
    /// Every game, active or not, in menu order
    pub fn all() -> &'static [GameKey] {
        &[
            GameKey::Seek,
            GameKey::Sequencer,
            GameKey::Sync,
            GameKey::Tempo,
            GameKey::Pitch,
            GameKey::Chorus,
            GameKey::Relay,
        ]
    }

    /// Games that can currently be played
    pub fn active() -> impl Iterator<Item = GameKey> {
        Self::all().iter().copied().filter(|g| g.is_active())
    }

    pub fn info(&self) -> GameInfo {
        GameInfo {
            key: *self,
            title: self.title(),
            description: self.description(),
            supported_modes: self.supported_modes(),
            level_count: self.level_count(),
            is_active: self.is_active(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameKey::Seek => "Seek",
            GameKey::Sequencer => "Sequencer",
            GameKey::Sync => "Sync",
            GameKey::Tempo => "Tempo",
            GameKey::Pitch => "Pitch",
            GameKey::Chorus => "Chorus",
            GameKey::Relay => "Relay",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GameKey::Seek => "Flip tiles and find the pairs that sound alike",
            GameKey::Sequencer => "Listen to the pattern, then play it back",
            GameKey::Sync => "Swap neighbouring tiles until the grid matches the reference",
            GameKey::Tempo => "Tap along with the beat",
            GameKey::Pitch => "Order the tones from low to high",
            GameKey::Chorus => "Pick the odd voice out",
            GameKey::Relay => "Pass the melody along the chain",
        }
    }

    pub fn supported_modes(&self) -> &'static [ModeKey] {
        match self {
            GameKey::Seek => &[
                ModeKey::Classic,
                ModeKey::Shapes,
                ModeKey::Recolor,
                ModeKey::Shuffle,
                ModeKey::Ghost,
            ],
            GameKey::Sequencer => &[
                ModeKey::Classic,
                ModeKey::Shapes,
                ModeKey::Recolor,
                ModeKey::Resize,
                ModeKey::Rotate,
            ],
            GameKey::Sync => &[
                ModeKey::Classic,
                ModeKey::Shapes,
                ModeKey::Recolor,
                ModeKey::Translate,
                ModeKey::Dilate,
                ModeKey::Shuffle,
            ],
            GameKey::Tempo | GameKey::Pitch | GameKey::Chorus | GameKey::Relay => {
                &[ModeKey::Classic]
            }
        }
    }

    pub fn supports(&self, mode: ModeKey) -> bool {
        self.supported_modes().contains(&mode)
    }

    pub fn level_count(&self) -> u32 {
        if self.is_active() {
            LEVELS_PER_GAME
        } else {
            0
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, GameKey::Seek | GameKey::Sequencer | GameKey::Sync)
    }

    /// Parse the lowercase identifier used in storage and on the command line
    pub fn from_id(id: &str) -> Option<GameKey> {
        Self::all().iter().copied().find(|g| g.id() == id)
    }

    /// Lowercase identifier used in storage
    pub fn id(&self) -> &'static str {
        match self {
            GameKey::Seek => "seek",
            GameKey::Sequencer => "sequencer",
            GameKey::Sync => "sync",
            GameKey::Tempo => "tempo",
            GameKey::Pitch => "pitch",
            GameKey::Chorus => "chorus",
            GameKey::Relay => "relay",
        }
    }
}

impl std::fmt::Display for GameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl ModeKey {
    pub fn all() -> &'static [ModeKey] {
        &[
            ModeKey::Classic,
            ModeKey::Shapes,
            ModeKey::Recolor,
            ModeKey::Resize,
            ModeKey::Rotate,
            ModeKey::Translate,
            ModeKey::Dilate,
            ModeKey::Shuffle,
            ModeKey::Ghost,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            ModeKey::Classic => "classic",
            ModeKey::Shapes => "shapes",
            ModeKey::Recolor => "recolor",
            ModeKey::Resize => "resize",
            ModeKey::Rotate => "rotate",
            ModeKey::Translate => "translate",
            ModeKey::Dilate => "dilate",
            ModeKey::Shuffle => "shuffle",
            ModeKey::Ghost => "ghost",
        }
    }

    pub fn from_id(id: &str) -> Option<ModeKey> {
        Self::all().iter().copied().find(|m| m.id() == id)
    }

    /// Whether the mode remaps display positions onto logical cells
    pub fn permutes_display(&self) -> bool {
        matches!(self, ModeKey::Shuffle)
    }
}

impl std::fmt::Display for ModeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}
