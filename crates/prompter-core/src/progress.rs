//! Reading progress persistence
//!
//! Keeps the last reading depth per script in a JSON file in the data
//! directory so a reopened script resumes where the reader left off.
//! Storage problems are logged and swallowed; losing progress must never
//! interrupt playback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;

/// Saved position within one script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingProgress {
    /// Depth ratio, 0.0 - 1.0
    pub depth: f64,
    /// Offset in pixels at the time of saving (informational; depth is authoritative)
    pub position: f64,
    /// Font size the position was measured with
    pub font_size: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgressFile {
    #[serde(default)]
    scripts: HashMap<String, ReadingProgress>,
}

/// File-backed map of script key to reading progress
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    entries: HashMap<String, ReadingProgress>,
}

impl ProgressStore {
    /// Load the store, starting empty if the file is missing or unreadable
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<ProgressFile>(&content) {
                Ok(file) => file.scripts,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable progress file");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read progress file");
                HashMap::new()
            }
        };
        debug!(path = %path.display(), scripts = entries.len(), "Progress store loaded");
        Self { path, entries }
    }

    /// Stable key for a script file
    pub fn key_for(script: &Path) -> String {
        std::fs::canonicalize(script)
            .unwrap_or_else(|_| script.to_path_buf())
            .to_string_lossy()
            .into_owned()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&ReadingProgress> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record(&mut self, key: &str, depth: f64, position: f64, font_size: f64) {
        let depth = if depth.is_finite() { depth.clamp(0.0, 1.0) } else { 0.0 };
        self.entries.insert(
            key.to_string(),
            ReadingProgress {
                depth,
                position: if position.is_finite() { position.max(0.0) } else { 0.0 },
                font_size,
                updated_at: Utc::now(),
            },
        );
    }

    /// Forget a script; returns whether it had saved progress
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Write the store to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = ProgressFile {
            scripts: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        // Write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Debounced writer for one script's progress
pub struct ProgressSaver {
    store: ProgressStore,
    key: String,
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
}

impl ProgressSaver {
    pub fn new(store: ProgressStore, key: impl Into<String>, interval: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            interval,
            last_save: None,
            dirty: false,
        }
    }

    /// Previously saved progress for this script
    pub fn saved(&self) -> Option<&ReadingProgress> {
        self.store.get(&self.key)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record a new snapshot, writing to disk at most once per interval
    ///
    /// # Returns
    /// `true` if the store was written
    pub fn update(&mut self, depth: f64, position: f64, font_size: f64, now: Instant) -> bool {
        if let Some(current) = self.store.get(&self.key) {
            if current.depth == depth && current.font_size == font_size && !self.dirty {
                return false;
            }
        }
        self.store.record(&self.key, depth, position, font_size);
        self.dirty = true;

        let due = match self.last_save {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };
        if due {
            self.last_save = Some(now);
            return self.write();
        }
        false
    }

    /// Write any pending snapshot (e.g. on exit)
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.write()
    }

    fn write(&mut self) -> bool {
        match self.store.save() {
            Ok(()) => {
                self.dirty = false;
                debug!(key = %self.key, "Reading progress saved");
                true
            }
            Err(e) => {
                // Keep the snapshot dirty so the next attempt retries
                warn!(path = %self.store.path().display(), error = %e, "Failed to save reading progress");
                false
            }
        }
    }
}
