use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::sync::RwLock;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

const INITIAL_DIFFICULTY_KEY: &str = "INITIAL_DIFFICULTY";
const MINING_ADDRESS_KEY: &str = "MINING_ADDRESS";

const DEFAULT_INITIAL_DIFFICULTY: u32 = 1;

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let mut map = HashMap::new();

        if let Ok(difficulty) = env::var(INITIAL_DIFFICULTY_KEY) {
            map.insert(String::from(INITIAL_DIFFICULTY_KEY), difficulty);
        }

        if let Ok(addr) = env::var(MINING_ADDRESS_KEY) {
            map.insert(String::from(MINING_ADDRESS_KEY), addr);
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    /// Initial mining difficulty for a freshly created chain.
    /// Falls back to the default when unset or unparsable.
    pub fn get_initial_difficulty(&self) -> u32 {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner
            .get(INITIAL_DIFFICULTY_KEY)
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_INITIAL_DIFFICULTY)
    }

    pub fn set_initial_difficulty(&self, difficulty: u32) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(INITIAL_DIFFICULTY_KEY), difficulty.to_string());
    }

    pub fn set_mining_addr(&self, addr: String) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        let _ = inner.insert(String::from(MINING_ADDRESS_KEY), addr);
    }

    pub fn get_mining_addr(&self) -> Option<String> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner.get(MINING_ADDRESS_KEY).cloned()
    }

    pub fn is_miner(&self) -> bool {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner.contains_key(MINING_ADDRESS_KEY)
    }
}
