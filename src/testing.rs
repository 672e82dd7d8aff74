//! In-memory stand-ins for the guesser and the catalog.

use serde_json::Value;
use std::collections::HashMap;

use crate::domain::error::UpdateError;
use crate::domain::models::{AiringStatus, CatalogEntry, ListStatus, MediaFormat, MediaSeason};
use crate::infra::anilist::{Catalog, SaveEntry, SavedEntry, SearchQuery, Viewer};
use crate::infra::guessit::{Guess, Guesser};
use crate::workflows::resolver::{filter_valid_seasons, find_season_and_episode, SeasonMatch};

/// Answers from a fixed table. A fragment without an entry falls back to the
/// entry whose key only differs by extension, then to an empty guess.
#[derive(Debug, Default)]
pub struct FakeGuesser {
    guesses: HashMap<String, Value>,
}

impl FakeGuesser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fragment: &str, guess: Value) -> Self {
        self.guesses.insert(fragment.to_string(), guess);
        self
    }
}

impl Guesser for FakeGuesser {
    fn guess(&self, fragment: &str) -> Result<Guess, UpdateError> {
        let value = self.guesses.get(fragment).or_else(|| {
            self.guesses
                .iter()
                .find(|(key, _)| key.rsplit_once('.').map(|(stem, _)| stem) == Some(fragment))
                .map(|(_, value)| value)
        });
        Ok(value.cloned().map(Guess::from_value).unwrap_or_default())
    }
}

pub fn tv_season(
    id: u64,
    title: &str,
    year: u32,
    season: MediaSeason,
    episodes: Option<u32>,
) -> CatalogEntry {
    CatalogEntry {
        id,
        title: title.to_string(),
        season: Some(season),
        season_year: Some(year),
        episodes,
        duration_minutes: Some(24),
        format: Some(MediaFormat::Tv),
        airing_status: Some(AiringStatus::Finished),
        user_progress: None,
        user_status: None,
    }
}

/// Filter, sort and walk in one step.
pub fn resolve_absolute(
    entries: &[CatalogEntry],
    absolute_episode: u32,
) -> Option<SeasonMatch<'_>> {
    let seasons = filter_valid_seasons(entries);
    find_season_and_episode(&seasons, absolute_episode)
}

/// Records every call and keeps list state like the real service, including
/// progress being reset when an entry leaves COMPLETED.
#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub on_list: Vec<CatalogEntry>,
    pub everywhere: Vec<CatalogEntry>,
    pub searches: Vec<SearchQuery>,
    pub saves: Vec<SaveEntry>,
    pub viewer_calls: usize,
    /// Number of upcoming saves that fail with HTTP 500.
    pub failing_saves: usize,
    state: HashMap<u64, (Option<u32>, Option<ListStatus>)>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_list_state(&mut self, id: u64, progress: u32, status: ListStatus) {
        self.state.insert(id, (Some(progress), Some(status)));
    }

    pub fn list_state(&self, id: u64) -> (Option<u32>, Option<ListStatus>) {
        self.state.get(&id).copied().unwrap_or((None, None))
    }
}

impl Catalog for FakeCatalog {
    fn search(&mut self, query: &SearchQuery) -> Result<Vec<CatalogEntry>, UpdateError> {
        self.searches.push(query.clone());
        Ok(if query.on_list {
            self.on_list.clone()
        } else {
            self.everywhere.clone()
        })
    }

    fn viewer(&mut self) -> Result<Viewer, UpdateError> {
        self.viewer_calls += 1;
        Ok(Viewer {
            id: 1,
            name: "tester".to_string(),
        })
    }

    fn save_entry(&mut self, entry: &SaveEntry) -> Result<SavedEntry, UpdateError> {
        self.saves.push(entry.clone());
        if self.failing_saves > 0 {
            self.failing_saves -= 1;
            return Err(UpdateError::Http {
                status: 500,
                body: "Internal Server Error".to_string(),
            });
        }

        let (old_progress, old_status) = self.list_state(entry.media_id);
        let status = entry.status.or(old_status);
        let mut progress = entry.progress.or(old_progress);
        if old_status == Some(ListStatus::Completed) && status != Some(ListStatus::Completed) {
            progress = Some(0);
        }
        self.state.insert(entry.media_id, (progress, status));

        Ok(SavedEntry {
            media_id: entry.media_id,
            progress,
            status,
        })
    }
}
