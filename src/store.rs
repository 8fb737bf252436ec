//! Best-score persistence.
//!
//! The best score is the only state that outlives a session. Where it lives
//! is up to the front end; the session only reads it at start and writes it
//! whenever the current score beats it.

use crate::error::Result;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Fixed name the best score is stored under.
pub const BEST_SCORE_KEY: &str = "hiscore";

pub trait ScoreStore {
    /// Stored value for `key`, 0 when nothing was stored yet.
    fn best_score(&self, key: &str) -> u32;

    fn set_best_score(&mut self, key: &str, score: u32);
}

impl<T: ScoreStore + ?Sized> ScoreStore for Box<T> {
    fn best_score(&self, key: &str) -> u32 {
        (**self).best_score(key)
    }

    fn set_best_score(&mut self, key: &str, score: u32) {
        (**self).set_best_score(key, score)
    }
}

/// Keeps scores for the lifetime of the process only.
#[derive(Clone, Debug, Default)]
pub struct MemoryScoreStore {
    scores: BTreeMap<String, u32>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn best_score(&self, key: &str) -> u32 {
        self.scores.get(key).copied().unwrap_or(0)
    }

    fn set_best_score(&mut self, key: &str, score: u32) {
        self.scores.insert(key.to_string(), score);
    }
}

/// Scores kept in a JSON object on disk, rewritten on every update.
///
/// Write failures are logged and otherwise ignored; the in-memory value stays
/// current either way.
#[derive(Clone, Debug)]
pub struct JsonFileScoreStore {
    path: PathBuf,
    scores: BTreeMap<String, u32>,
}

impl JsonFileScoreStore {
    /// Loads `path`, starting empty if the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let scores = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(JsonFileScoreStore {
            path: path.to_path_buf(),
            scores,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.scores)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl ScoreStore for JsonFileScoreStore {
    fn best_score(&self, key: &str) -> u32 {
        self.scores.get(key).copied().unwrap_or(0)
    }

    fn set_best_score(&mut self, key: &str, score: u32) {
        self.scores.insert(key.to_string(), score);
        if let Err(err) = self.save() {
            log::warn!("Failed to save scores to {}: {}", self.path.display(), err);
        }
    }
}
