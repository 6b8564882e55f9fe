//! Player currency, wins and per-mode level progress.
//!
//! The ledger is the only owner of the [`ProgressRecord`]. Every mutation
//! is written through to the storage collaborator immediately; a failed
//! write is logged and play continues with the in-memory state.

use crate::catalog::{GameKey, ModeKey};
use crate::error::{GameError, Result};
use crate::store::KeyValueStore;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const KEY_TOTAL_TOKENS: &str = "totalTokens";
pub const KEY_TOTAL_WINS: &str = "totalWins";
pub const KEY_GAME_PROGRESS: &str = "gameProgress";
pub const KEY_REWARD_COLLECTED: &str = "rewardCollected";
pub const KEY_SESSION_STATE: &str = "sessionState";

/// Highest level reached, per game and mode
pub type GameProgress = BTreeMap<GameKey, BTreeMap<ModeKey, u32>>;

/// Everything the player has earned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub total_tokens: u64,
    pub total_wins: u64,
    pub progress: GameProgress,
    pub reward_collected_today: bool,
}

/// Owner of the [`ProgressRecord`], persisting write-through
pub struct ProgressLedger {
    record: ProgressRecord,
    store: Box<dyn KeyValueStore + Send>,
}

impl std::fmt::Debug for ProgressLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressLedger")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl ProgressLedger {
    /// Load the record from `store`, falling back to defaults for any key
    /// that is missing or unreadable
    pub fn open(store: impl KeyValueStore + Send + 'static) -> Self {
        let store: Box<dyn KeyValueStore + Send> = Box::new(store);
        let record = ProgressRecord {
            total_tokens: load_or_default(&*store, KEY_TOTAL_TOKENS),
            total_wins: load_or_default(&*store, KEY_TOTAL_WINS),
            progress: load_or_default(&*store, KEY_GAME_PROGRESS),
            reward_collected_today: load_or_default(&*store, KEY_REWARD_COLLECTED),
        };
        debug!(
            "ledger opened: tokens={} wins={}",
            record.total_tokens, record.total_wins
        );
        Self { record, store }
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn total_tokens(&self) -> u64 {
        self.record.total_tokens
    }

    pub fn total_wins(&self) -> u64 {
        self.record.total_wins
    }

    pub fn can_afford(&self, cost: u64) -> bool {
        self.record.total_tokens >= cost
    }

    pub fn award_cash(&mut self, amount: u64) {
        self.record.total_tokens = self.record.total_tokens.saturating_add(amount);
        write_through(&mut *self.store, KEY_TOTAL_TOKENS, &self.record.total_tokens);
    }

    /// Remove tokens. Leaves the balance untouched and returns false when
    /// it is too low.
    pub fn deduct_cash(&mut self, amount: u64) -> bool {
        if !self.can_afford(amount) {
            debug!(
                "deduct of {} refused, balance {}",
                amount, self.record.total_tokens
            );
            return false;
        }
        self.record.total_tokens -= amount;
        write_through(&mut *self.store, KEY_TOTAL_TOKENS, &self.record.total_tokens);
        true
    }

    /// Deduct `cost` or report why not
    pub fn charge(&mut self, cost: u64) -> Result<()> {
        if self.deduct_cash(cost) {
            Ok(())
        } else {
            Err(GameError::InsufficientFunds {
                required: cost,
                available: self.record.total_tokens,
            })
        }
    }

    pub fn increment_wins(&mut self) {
        self.record.total_wins += 1;
        write_through(&mut *self.store, KEY_TOTAL_WINS, &self.record.total_wins);
    }

    /// Record that `level` is reached in `game`/`mode`. The level is clamped
    /// to the game's range and never lowers what is already stored.
    pub fn update_game_progress(&mut self, game: GameKey, mode: ModeKey, level: u32) {
        let count = game.level_count();
        if count == 0 {
            debug!("ignoring progress for inactive game {}", game);
            return;
        }
        let level = level.clamp(1, count);
        let slot = self
            .record
            .progress
            .entry(game)
            .or_default()
            .entry(mode)
            .or_insert(0);
        if level <= *slot {
            return;
        }
        *slot = level;
        info!("progress {}/{} -> level {}", game, mode, level);
        write_through(&mut *self.store, KEY_GAME_PROGRESS, &self.record.progress);
    }

    /// Highest level reached in `game`/`mode`; level 1 is always open
    pub fn level_reached(&self, game: GameKey, mode: ModeKey) -> u32 {
        self.record
            .progress
            .get(&game)
            .and_then(|modes| modes.get(&mode))
            .copied()
            .unwrap_or(1)
            .max(1)
    }

    /// Zero wins and clear per-mode progress and the saved session.
    /// Tokens are kept.
    pub fn reset_progress(&mut self) {
        self.record.total_wins = 0;
        self.record.progress.clear();
        write_through(&mut *self.store, KEY_TOTAL_WINS, &self.record.total_wins);
        write_through(&mut *self.store, KEY_GAME_PROGRESS, &self.record.progress);
        if let Err(e) = self.store.remove(KEY_SESSION_STATE) {
            warn!("failed to clear session state: {}", e);
        }
        info!("progress reset, {} tokens kept", self.record.total_tokens);
    }

    pub fn can_collect_daily_reward(&self) -> bool {
        !self.record.reward_collected_today
    }

    pub fn mark_reward_as_collected(&mut self) {
        self.record.reward_collected_today = true;
        write_through(&mut *self.store, KEY_REWARD_COLLECTED, &true);
    }

    /// Award `amount` and close the gate, if today's reward is still open
    pub fn collect_daily_reward(&mut self, amount: u64) -> bool {
        if !self.can_collect_daily_reward() {
            return false;
        }
        self.award_cash(amount);
        self.mark_reward_as_collected();
        info!("daily reward of {} collected", amount);
        true
    }

    /// Reopen the daily reward; called by the day-boundary detector
    pub fn start_new_day(&mut self) {
        if self.record.reward_collected_today {
            self.record.reward_collected_today = false;
            write_through(&mut *self.store, KEY_REWARD_COLLECTED, &false);
        }
    }

    /// Stash an opaque snapshot of the session in progress
    pub fn save_session_state(&mut self, json: String) {
        if let Err(e) = self.store.set(KEY_SESSION_STATE, json) {
            warn!("failed to persist {}: {}", KEY_SESSION_STATE, e);
        }
    }

    pub fn session_state(&self) -> Option<String> {
        match self.store.get(KEY_SESSION_STATE) {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to read {}: {}", KEY_SESSION_STATE, e);
                None
            }
        }
    }
}

fn write_through<T: Serialize>(store: &mut (dyn KeyValueStore + Send), key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(GameError::from)
        .and_then(|json| store.set(key, json));
    if let Err(e) = result {
        warn!("failed to persist {}: {}", key, e);
    }
}

fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match store.get(key) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("discarding unreadable {}: {}", key, e);
            T::default()
        }),
        Ok(None) => T::default(),
        Err(e) => {
            warn!("failed to read {}: {}", key, e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::{Arc, Mutex};

    /// Memory store whose contents stay observable after the ledger takes it
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryStore>>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.lock().unwrap().get(key)
        }
        fn set(&mut self, key: &str, value: String) -> Result<()> {
            self.0.lock().unwrap().set(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<()> {
            self.0.lock().unwrap().remove(key)
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(GameError::Persistence("disk gone".into()))
        }
        fn set(&mut self, _key: &str, _value: String) -> Result<()> {
            Err(GameError::Persistence("disk gone".into()))
        }
        fn remove(&mut self, _key: &str) -> Result<()> {
            Err(GameError::Persistence("disk gone".into()))
        }
    }

    #[test]
    fn test_deduct_more_than_balance_is_refused() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        ledger.award_cash(20);
        assert!(!ledger.deduct_cash(21));
        assert_eq!(ledger.total_tokens(), 20);
        assert!(ledger.deduct_cash(20));
        assert_eq!(ledger.total_tokens(), 0);
    }

    #[test]
    fn test_charge_reports_insufficient_funds() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        ledger.award_cash(4);
        assert_eq!(
            ledger.charge(10),
            Err(GameError::InsufficientFunds {
                required: 10,
                available: 4
            })
        );
        assert_eq!(ledger.total_tokens(), 4);
    }

    #[test]
    fn test_progress_clamps_to_level_count() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        ledger.update_game_progress(GameKey::Seek, ModeKey::Classic, 999);
        assert_eq!(ledger.level_reached(GameKey::Seek, ModeKey::Classic), 25);
        ledger.update_game_progress(GameKey::Sync, ModeKey::Classic, 0);
        assert_eq!(ledger.level_reached(GameKey::Sync, ModeKey::Classic), 1);
    }

    #[test]
    fn test_progress_never_goes_backwards() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        ledger.update_game_progress(GameKey::Sequencer, ModeKey::Shapes, 7);
        ledger.update_game_progress(GameKey::Sequencer, ModeKey::Shapes, 3);
        assert_eq!(ledger.level_reached(GameKey::Sequencer, ModeKey::Shapes), 7);
        assert_eq!(ledger.level_reached(GameKey::Sequencer, ModeKey::Classic), 1);
    }

    #[test]
    fn test_inactive_game_progress_is_ignored() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        ledger.update_game_progress(GameKey::Tempo, ModeKey::Classic, 3);
        assert!(ledger.record().progress.is_empty());
    }

    #[test]
    fn test_reset_keeps_tokens() {
        let store = SharedStore::default();
        let mut ledger = ProgressLedger::open(store.clone());
        ledger.award_cash(50);
        ledger.increment_wins();
        ledger.update_game_progress(GameKey::Seek, ModeKey::Classic, 4);
        ledger.save_session_state("{}".into());

        ledger.reset_progress();
        assert_eq!(ledger.total_tokens(), 50);
        assert_eq!(ledger.total_wins(), 0);
        assert!(ledger.record().progress.is_empty());
        assert_eq!(ledger.session_state(), None);
        assert_eq!(store.get(KEY_TOTAL_WINS).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn test_write_through_and_reload() {
        let store = SharedStore::default();
        {
            let mut ledger = ProgressLedger::open(store.clone());
            ledger.award_cash(30);
            ledger.increment_wins();
            ledger.update_game_progress(GameKey::Seek, ModeKey::Classic, 3);
            ledger.mark_reward_as_collected();
        }
        assert_eq!(
            store.get(KEY_GAME_PROGRESS).unwrap().as_deref(),
            Some(r#"{"seek":{"classic":3}}"#)
        );

        let reopened = ProgressLedger::open(store);
        assert_eq!(reopened.total_tokens(), 30);
        assert_eq!(reopened.total_wins(), 1);
        assert_eq!(reopened.level_reached(GameKey::Seek, ModeKey::Classic), 3);
        assert!(!reopened.can_collect_daily_reward());
    }

    #[test]
    fn test_daily_reward_gate() {
        let mut ledger = ProgressLedger::open(MemoryStore::new());
        assert!(ledger.can_collect_daily_reward());
        assert!(ledger.collect_daily_reward(25));
        assert!(!ledger.collect_daily_reward(25));
        assert_eq!(ledger.total_tokens(), 25);
        ledger.start_new_day();
        assert!(ledger.can_collect_daily_reward());
    }

    #[test]
    fn test_broken_store_falls_back_to_memory() {
        let mut ledger = ProgressLedger::open(BrokenStore);
        assert_eq!(ledger.record(), &ProgressRecord::default());
        ledger.award_cash(10);
        ledger.increment_wins();
        assert_eq!(ledger.total_tokens(), 10);
        assert_eq!(ledger.total_wins(), 1);
        assert_eq!(ledger.session_state(), None);
    }

    #[test]
    fn test_corrupt_value_is_discarded() {
        let mut store = MemoryStore::new();
        store.set(KEY_TOTAL_TOKENS, "\"lots\"".into()).unwrap();
        store.set(KEY_TOTAL_WINS, "4".into()).unwrap();
        let ledger = ProgressLedger::open(store);
        assert_eq!(ledger.total_tokens(), 0);
        assert_eq!(ledger.total_wins(), 4);
    }
}
