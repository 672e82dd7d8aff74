use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::error::UpdateError;
use crate::domain::models::{AiringStatus, CatalogEntry, ListStatus, MediaFormat, MediaSeason};

const ANILIST_API_URL: &str = "https://graphql.anilist.co";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const SEARCH_ANIME: &str = r#"
    query($search: String, $year: FuzzyDateInt, $page: Int, $onList: Boolean) {
        Page(page: $page) {
            media (search: $search, type: ANIME, startDate_greater: $year, onList: $onList) {
                id
                title { romaji }
                season
                seasonYear
                episodes
                duration
                format
                status
                mediaListEntry {
                    status
                    progress
                }
            }
        }
    }
"#;

const SAVE_MEDIA_LIST_ENTRY: &str = r#"
    mutation ($mediaId: Int, $progress: Int, $status: MediaListStatus) {
        SaveMediaListEntry (mediaId: $mediaId, progress: $progress, status: $status) {
            status
            progress
            mediaId
        }
    }
"#;

const VIEWER: &str = r#"
    query {
        Viewer {
            id
            name
        }
    }
"#;

/// Remote catalog and progress tracker.
pub trait Catalog {
    /// Ranked candidates for `query`, best match first.
    fn search(&mut self, query: &SearchQuery) -> Result<Vec<CatalogEntry>, UpdateError>;

    /// The authenticated user. Fetched once per client.
    fn viewer(&mut self) -> Result<Viewer, UpdateError>;

    /// Upserts a list entry. The returned values are what the service applied.
    fn save_entry(&mut self, entry: &SaveEntry) -> Result<SavedEntry, UpdateError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub search: String,
    pub year: Option<u32>,
    pub on_list: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Viewer {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveEntry {
    #[serde(rename = "mediaId")]
    pub media_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SavedEntry {
    #[serde(rename = "mediaId")]
    pub media_id: u64,
    pub progress: Option<u32>,
    pub status: Option<ListStatus>,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "Page")]
    page: Page,
}

#[derive(Debug, Deserialize)]
struct Page {
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct Media {
    id: u64,
    title: MediaTitle,
    season: Option<MediaSeason>,
    #[serde(rename = "seasonYear")]
    season_year: Option<u32>,
    episodes: Option<u32>,
    duration: Option<u32>,
    format: Option<MediaFormat>,
    status: Option<AiringStatus>,
    #[serde(rename = "mediaListEntry")]
    media_list_entry: Option<MediaListEntry>,
}

#[derive(Debug, Deserialize)]
struct MediaTitle {
    romaji: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaListEntry {
    status: Option<ListStatus>,
    progress: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SaveData {
    #[serde(rename = "SaveMediaListEntry")]
    save_media_list_entry: SavedEntry,
}

#[derive(Debug, Deserialize)]
struct ViewerData {
    #[serde(rename = "Viewer")]
    viewer: Viewer,
}

impl From<Media> for CatalogEntry {
    fn from(media: Media) -> Self {
        let (user_progress, user_status) = match media.media_list_entry {
            Some(entry) => (entry.progress, entry.status),
            None => (None, None),
        };
        CatalogEntry {
            id: media.id,
            title: media.title.romaji.unwrap_or_default(),
            season: media.season,
            season_year: media.season_year,
            episodes: media.episodes,
            duration_minutes: media.duration,
            format: media.format,
            airing_status: media.status,
            user_progress,
            user_status,
        }
    }
}

#[derive(Debug)]
pub struct AniListClient {
    http: reqwest::blocking::Client,
    token: Option<String>,
    viewer: Option<Viewer>,
}

impl AniListClient {
    pub fn new(token: Option<String>) -> Result<Self, UpdateError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            token,
            viewer: None,
        })
    }

    fn ensure_authenticated(&self) -> Result<(), UpdateError> {
        if self.token.is_none() {
            return Err(UpdateError::NotAuthenticated);
        }
        Ok(())
    }

    fn request<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, UpdateError> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });
        let mut request = self
            .http
            .post(ANILIST_API_URL)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body.to_string());
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request.send()?;
        let status = response.status();
        decode_response(status.as_u16(), &response.text()?)
    }
}

fn decode_response<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, UpdateError> {
    if status != 200 {
        return Err(UpdateError::Http {
            status,
            body: text.to_string(),
        });
    }

    let response: GraphqlResponse<T> = serde_json::from_str(text)?;
    if !response.errors.is_empty() {
        let messages: Vec<String> = response
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect();
        return Err(UpdateError::Api(messages.join("; ")));
    }
    response
        .data
        .ok_or_else(|| UpdateError::Api("response carried no data".to_string()))
}

impl Catalog for AniListClient {
    fn search(&mut self, query: &SearchQuery) -> Result<Vec<CatalogEntry>, UpdateError> {
        let variables = serde_json::json!({
            "search": query.search,
            "year": query.year.unwrap_or(1),
            "page": 1,
            "onList": query.on_list,
        });
        debug!(search = %query.search, on_list = query.on_list, "searching catalog");
        let data: PageData = self.request(SEARCH_ANIME, variables)?;
        Ok(data.page.media.into_iter().map(CatalogEntry::from).collect())
    }

    fn viewer(&mut self) -> Result<Viewer, UpdateError> {
        if let Some(viewer) = &self.viewer {
            return Ok(viewer.clone());
        }
        self.ensure_authenticated()?;
        let data: ViewerData = self.request(VIEWER, serde_json::json!({}))?;
        self.viewer = Some(data.viewer.clone());
        Ok(data.viewer)
    }

    fn save_entry(&mut self, entry: &SaveEntry) -> Result<SavedEntry, UpdateError> {
        self.ensure_authenticated()?;
        let variables = serde_json::to_value(entry)?;
        debug!(variables = %variables, "saving list entry");
        let data: SaveData = self.request(SAVE_MEDIA_LIST_ENTRY, variables)?;
        Ok(data.save_media_list_entry)
    }
}
