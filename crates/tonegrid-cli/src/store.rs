use anyhow::Context;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tonegrid_core::{GameError, KeyValueStore};

const FILE_NAME: &str = "progress.json";

/// Key-value store kept as one JSON object on disk
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Default data directory, `<local data>/tonegrid`
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tonegrid")
    }

    /// Open the store in `dir`, creating the directory if needed.
    /// A missing or unparsable file starts an empty store; the next write
    /// replaces it.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
        let path = dir.join(FILE_NAME);
        let entries = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("discarding unreadable {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        debug!("opened {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> tonegrid_core::Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json).map_err(|e| GameError::Persistence(e.to_string()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> tonegrid_core::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> tonegrid_core::Result<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> tonegrid_core::Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonegrid_core::{GameKey, ModeKey, ProgressLedger};

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("nested")).unwrap();
        assert_eq!(store.get("totalTokens").unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_ledger_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut ledger = ProgressLedger::open(JsonFileStore::open(dir.path()).unwrap());
            ledger.award_cash(75);
            ledger.increment_wins();
            ledger.update_game_progress(GameKey::Seek, ModeKey::Ghost, 9);
        }
        let ledger = ProgressLedger::open(JsonFileStore::open(dir.path()).unwrap());
        assert_eq!(ledger.total_tokens(), 75);
        assert_eq!(ledger.total_wins(), 1);
        assert_eq!(ledger.level_reached(GameKey::Seek, ModeKey::Ghost), 9);
    }

    #[test]
    fn test_corrupt_file_starts_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE_NAME), "{oops").unwrap();
        let mut ledger = ProgressLedger::open(JsonFileStore::open(dir.path()).unwrap());
        assert_eq!(ledger.total_tokens(), 0);
        assert_eq!(ledger.total_wins(), 0);
        assert_eq!(ledger.level_reached(GameKey::Sync, ModeKey::Classic), 1);

        ledger.award_cash(5);
        let json = fs::read_to_string(dir.path().join(FILE_NAME)).unwrap();
        assert!(serde_json::from_str::<BTreeMap<String, String>>(&json).is_ok());
    }
}
