use serde::{Deserialize, Serialize};
use std::fmt;

/// What the file path told us, after all filename heuristics ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileInfo {
    /// Search key sent to the catalog, e.g. "Show Name Season 2 Part 1".
    pub name: String,
    /// Episode number as written in the file, possibly absolute.
    pub episode: u32,
    pub year: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaSeason {
    Winter,
    Spring,
    Summer,
    Fall,
    #[serde(other)]
    Unknown,
}

impl MediaSeason {
    /// Calendar order within a year. Unknown seasons sort after FALL.
    pub fn order(self) -> u8 {
        match self {
            MediaSeason::Winter => 1,
            MediaSeason::Spring => 2,
            MediaSeason::Summer => 3,
            MediaSeason::Fall => 4,
            MediaSeason::Unknown => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiringStatus {
    Finished,
    Releasing,
    NotYetReleased,
    Cancelled,
    Hiatus,
    #[serde(other)]
    Unknown,
}

/// Status of an entry on the user's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListStatus {
    Current,
    Planning,
    Completed,
    Repeating,
    Paused,
    Dropped,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListStatus::Current => "CURRENT",
            ListStatus::Planning => "PLANNING",
            ListStatus::Completed => "COMPLETED",
            ListStatus::Repeating => "REPEATING",
            ListStatus::Paused => "PAUSED",
            ListStatus::Dropped => "DROPPED",
            ListStatus::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// One season/cour of a franchise as returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: u64,
    pub title: String,
    pub season: Option<MediaSeason>,
    pub season_year: Option<u32>,
    pub episodes: Option<u32>,
    pub duration_minutes: Option<u32>,
    pub format: Option<MediaFormat>,
    pub airing_status: Option<AiringStatus>,
    pub user_progress: Option<u32>,
    pub user_status: Option<ListStatus>,
}

/// The identity a file resolved to, together with the user's state for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub anime_id: u64,
    pub anime_name: String,
    pub current_progress: Option<u32>,
    pub total_episodes: Option<u32>,
    /// Episode relative to `anime_id`'s own numbering.
    pub file_progress: u32,
    pub current_status: Option<ListStatus>,
}

impl ResolvedEntry {
    pub fn from_entry(entry: &CatalogEntry, file_progress: u32) -> Self {
        Self {
            anime_id: entry.id,
            anime_name: entry.title.clone(),
            current_progress: entry.user_progress,
            total_episodes: entry.episodes,
            file_progress,
            current_status: entry.user_status,
        }
    }

    /// Catalog page for this entry.
    pub fn page_url(&self) -> String {
        format!("https://anilist.co/anime/{}", self.anime_id)
    }
}
