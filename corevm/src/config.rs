//! Process-wide properties map.
//!
//! Backs the `GET_SYS_PROP`/`SET_SYS_PROP` traps and the `precision`
//! property consulted by numeric-to-string conversion. Seeded at startup
//! from an optional `obr.conf` file (`name=value` per line) sitting next to
//! the image, then from any environment/CLI overrides, then left mutable
//! through the traps for the remainder of the run. A single `Mutex` backs
//! every read/write.

use std::collections::HashMap;
use std::sync::Mutex;

pub const DEFAULT_PRECISION: &str = "6";

pub struct Properties {
    inner: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for Properties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Properties").finish_non_exhaustive()
    }
}

impl Default for Properties {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert("precision".to_string(), DEFAULT_PRECISION.to_string());
        map.insert("lib.path".to_string(), String::new());
        Self {
            inner: Mutex::new(map),
        }
    }
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: String) {
        self.inner.lock().unwrap().insert(key.to_string(), value);
    }

    /// The `precision` property used for decimal formatting in `I2S`/`F2S`.
    pub fn precision(&self) -> usize {
        self.get("precision")
            .and_then(|s| s.parse().ok())
            .unwrap_or(6)
    }

    /// Load `name=value` lines from an `obr.conf`-style config file,
    /// merging into the current map. Blank lines and lines starting with
    /// `#` are ignored.
    pub fn load_conf_str(&self, contents: &str) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                self.set(key.trim(), value.trim().to_string());
            }
        }
    }

    /// Load `obr.conf` from disk if it exists next to `image_path`; silent
    /// no-op if absent.
    pub fn load_conf_near(&self, image_path: &std::path::Path) {
        let conf_path = image_path
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join("obr.conf");
        if let Ok(contents) = std::fs::read_to_string(conf_path) {
            self.load_conf_str(&contents);
        }
    }

    /// Colon/semicolon-separated library search path entries.
    pub fn lib_search_path(&self) -> Vec<String> {
        self.get("lib.path")
            .unwrap_or_default()
            .split([':', ';'])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
