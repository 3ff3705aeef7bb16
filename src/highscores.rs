//! Best scores and tallies
//!
//! Each game keeps a single integer best under its own key. Values that do
//! not parse are treated as absent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// String key-value storage (LocalStorage in the browser)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store for native runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Best score for one game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestScore {
    key: &'static str,
    pub value: u64,
}

impl BestScore {
    /// Read the stored best; missing or corrupt values read as zero
    pub fn load(key: &'static str, store: &dyn KeyValueStore) -> Self {
        let value = match store.get(key) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(v) => v,
                Err(_) => {
                    log::warn!("Ignoring corrupt best score under {}: {:?}", key, raw);
                    0
                }
            },
            None => 0,
        };
        Self { key, value }
    }

    /// Record `score`; only writes when it beats the stored best.
    /// Returns true for a new best.
    pub fn submit(&mut self, score: u64, store: &mut dyn KeyValueStore) -> bool {
        if score <= self.value {
            return false;
        }
        self.value = score;
        store.set(self.key, &score.to_string());
        log::info!("New best for {}: {}", self.key, score);
        true
    }
}

/// Win/loss/tie counts for tic-tac-toe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicTacToeTally {
    pub player: u32,
    pub ai: u32,
    pub ties: u32,
}

impl TicTacToeTally {
    pub const STORAGE_KEY: &'static str = "ttt-scores";

    pub fn load(store: &dyn KeyValueStore) -> Self {
        store
            .get(Self::STORAGE_KEY)
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(tally) => Some(tally),
                Err(e) => {
                    log::warn!("Ignoring corrupt tic-tac-toe tallies: {}", e);
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        if let Ok(json) = serde_json::to_string(self) {
            store.set(Self::STORAGE_KEY, &json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_best_is_zero() {
        let store = MemoryStore::default();
        assert_eq!(BestScore::load("flappy-best", &store).value, 0);
    }

    #[test]
    fn test_corrupt_best_is_zero() {
        let mut store = MemoryStore::default();
        store.set("runner-best", "NaN-ish");
        assert_eq!(BestScore::load("runner-best", &store).value, 0);
    }

    #[test]
    fn test_submit_only_writes_higher() {
        let mut store = MemoryStore::default();
        store.set("snake-best", "50");
        let mut best = BestScore::load("snake-best", &store);
        assert_eq!(best.value, 50);

        assert!(!best.submit(50, &mut store));
        assert!(!best.submit(20, &mut store));
        assert_eq!(store.get("snake-best").as_deref(), Some("50"));

        assert!(best.submit(70, &mut store));
        assert_eq!(store.get("snake-best").as_deref(), Some("70"));
    }

    #[test]
    fn test_tally_roundtrip_and_partial() {
        let mut store = MemoryStore::default();
        store.set(TicTacToeTally::STORAGE_KEY, r#"{"player":2}"#);
        let tally = TicTacToeTally::load(&store);
        assert_eq!(tally, TicTacToeTally { player: 2, ai: 0, ties: 0 });

        store.set(TicTacToeTally::STORAGE_KEY, "garbage");
        assert_eq!(TicTacToeTally::load(&store), TicTacToeTally::default());
    }
}
