use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::domain::models::{ListStatus, ResolvedEntry};

const CACHE_VERSION: u32 = 1;

/// How long a resolution is trusted before the catalog is asked again.
pub fn cache_ttl() -> Duration {
    Duration::hours(24)
}

/// Last resolution for one release folder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub guessed_name: String,
    pub anime_id: u64,
    pub anime_name: String,
    pub current_progress: Option<u32>,
    pub total_episodes: Option<u32>,
    pub current_status: Option<ListStatus>,
    /// Episode number as written in the file when this entry was stored.
    pub absolute_episode: u32,
    /// The same episode in `anime_id`'s numbering.
    pub relative_episode: u32,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        guessed_name: &str,
        absolute_episode: u32,
        resolved: &ResolvedEntry,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            guessed_name: guessed_name.to_string(),
            anime_id: resolved.anime_id,
            anime_name: resolved.anime_name.clone(),
            current_progress: resolved.current_progress,
            total_episodes: resolved.total_episodes,
            current_status: resolved.current_status,
            absolute_episode,
            relative_episode: resolved.file_progress,
            expires_at: now + cache_ttl(),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.absolute_episode) - i64::from(self.relative_episode)
    }

    /// Maps a file episode through the stored offset. `None` when the result
    /// falls outside `1..=total_episodes`.
    pub fn relative_for(&self, file_episode: u32) -> Option<u32> {
        let relative = i64::from(file_episode) - self.offset();
        let total = i64::from(self.total_episodes.unwrap_or(0));
        if (1..=total).contains(&relative) {
            u32::try_from(relative).ok()
        } else {
            None
        }
    }

    /// Rebuilds the resolved identity for `file_episode` without the catalog.
    pub fn resolve(&self, file_episode: u32) -> Option<ResolvedEntry> {
        let relative = self.relative_for(file_episode)?;
        Some(ResolvedEntry {
            anime_id: self.anime_id,
            anime_name: self.anime_name.clone(),
            current_progress: self.current_progress,
            total_episodes: self.total_episodes,
            file_progress: relative,
            current_status: self.current_status,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

impl Default for CacheDocument {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: HashMap::new(),
        }
    }
}

impl CacheDocument {
    fn purge_expired(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at >= now);
        before != self.entries.len()
    }
}

/// Directory-keyed resolution cache backed by a single JSON file.
#[derive(Debug)]
pub struct CacheStore {
    path: PathBuf,
    document: Option<CacheDocument>,
}

impl CacheStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            document: None,
        }
    }

    fn load(&self) -> CacheDocument {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return CacheDocument::default();
        };
        match serde_json::from_str::<CacheDocument>(&content) {
            Ok(document) if document.version == CACHE_VERSION => document,
            _ => {
                warn!(path = %self.path.display(), "discarding unreadable or legacy cache file");
                CacheDocument::default()
            }
        }
    }

    fn save(&self, document: &CacheDocument) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Runs one read-modify-write cycle. Expired entries are purged first and
    /// the file is rewritten whenever anything changed.
    fn with_document<T>(
        &mut self,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut CacheDocument) -> (T, bool),
    ) -> Result<T> {
        let mut document = match self.document.take() {
            Some(document) => document,
            None => self.load(),
        };

        let purged = document.purge_expired(now);
        let (value, changed) = f(&mut document);

        let saved = if purged || changed {
            self.save(&document)
        } else {
            Ok(())
        };
        self.document = Some(document);
        saved.map(|_| value)
    }

    /// Entry for `directory`, only if it was stored under the same guessed name.
    pub fn lookup(
        &mut self,
        directory: &str,
        guessed_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>> {
        let key = hash_directory(directory);
        self.with_document(now, |document| {
            let entry = document
                .entries
                .get(&key)
                .filter(|entry| entry.guessed_name == guessed_name)
                .cloned();
            (entry, false)
        })
    }

    pub fn store(&mut self, directory: &str, entry: CacheEntry, now: DateTime<Utc>) -> Result<()> {
        let key = hash_directory(directory);
        debug!(key = %key, anime_id = entry.anime_id, "caching resolution");
        self.with_document(now, |document| {
            document.entries.insert(key, entry);
            ((), true)
        })
    }

    pub fn remove(&mut self, directory: &str, now: DateTime<Utc>) -> Result<()> {
        let key = hash_directory(directory);
        self.with_document(now, |document| {
            let removed = document.entries.remove(&key).is_some();
            ((), removed)
        })
    }
}

pub fn hash_directory(directory: &str) -> String {
    format!("{:x}", Sha256::digest(directory.as_bytes()))
}

/// Folder part of `path`, with separators normalized.
pub fn containing_directory(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    match normalized.rsplit_once('/') {
        Some((directory, _)) => directory.to_string(),
        None => String::new(),
    }
}
