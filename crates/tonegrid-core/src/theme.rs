//! Audio collaborators: where clip ids come from and where cues go.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque identifier of an audio clip
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supplies the clips belonging to a theme. The core only reads from it.
pub trait AudioThemeSource {
    fn themed_audio_files(&self, theme: &str) -> Option<Vec<AssetId>>;
}

/// Plays cues. Calls are fire-and-forget; puzzle logic never waits on them.
pub trait AudioPlayback {
    fn load(&mut self, asset: &AssetId);
    fn play(&mut self);
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
}

/// Playback sink that ignores everything, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayback;

impl AudioPlayback for SilentPlayback {
    fn load(&mut self, _asset: &AssetId) {}
    fn play(&mut self) {}
    fn stop(&mut self) {}
    fn set_volume(&mut self, _volume: f32) {}
}

/// Theme offered when the player has not picked one
pub const DEFAULT_THEME: &str = "animals";

/// Theme source backed by an in-memory map
#[derive(Debug, Clone, Default)]
pub struct ThemeLibrary {
    themes: BTreeMap<String, Vec<AssetId>>,
}

impl ThemeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The themes bundled with the app, named `<theme>/<nn>` per clip
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        for (name, count) in [("animals", 32), ("instruments", 32), ("nature", 32), ("retro", 32)] {
            lib.insert(
                name,
                (1..=count).map(|n| AssetId::new(format!("{name}/{n:02}"))).collect(),
            );
        }
        lib
    }

    pub fn insert(&mut self, theme: impl Into<String>, assets: Vec<AssetId>) {
        self.themes.insert(theme.into(), assets);
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }
}

impl AudioThemeSource for ThemeLibrary {
    fn themed_audio_files(&self, theme: &str) -> Option<Vec<AssetId>> {
        self.themes.get(theme).cloned()
    }
}

/// Distinct clips of a theme, in first-seen order
pub(crate) fn distinct(assets: &[AssetId]) -> Vec<AssetId> {
    let mut out: Vec<AssetId> = Vec::with_capacity(assets.len());
    for a in assets {
        if !out.contains(a) {
            out.push(a.clone());
        }
    }
    out
}
