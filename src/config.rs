use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::infra::token::load_access_token;

/// Behaviour toggles for progress updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    /// Watching episode 1 of a completed anime starts a rewatch.
    pub set_completed_to_rewatching_on_first_episode: bool,
    pub update_progress_when_rewatching: bool,
    pub set_to_completed_after_last_episode_current: bool,
    pub set_to_completed_after_last_episode_rewatching: bool,
    /// Anime missing from the list are added as CURRENT.
    pub add_entry_if_missing: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            set_completed_to_rewatching_on_first_episode: false,
            update_progress_when_rewatching: true,
            set_to_completed_after_last_episode_current: false,
            set_to_completed_after_last_episode_rewatching: true,
            add_entry_if_missing: false,
        }
    }
}

/// Overrides passed on the command line by the player script.
#[derive(Debug, Default, Deserialize)]
struct OptionOverrides {
    #[serde(rename = "SET_COMPLETED_TO_REWATCHING_ON_FIRST_EPISODE")]
    set_completed_to_rewatching_on_first_episode: Option<bool>,
    #[serde(rename = "UPDATE_PROGRESS_WHEN_REWATCHING")]
    update_progress_when_rewatching: Option<bool>,
    #[serde(rename = "SET_TO_COMPLETED_AFTER_LAST_EPISODE_CURRENT")]
    set_to_completed_after_last_episode_current: Option<bool>,
    #[serde(rename = "SET_TO_COMPLETED_AFTER_LAST_EPISODE_REWATCHING")]
    set_to_completed_after_last_episode_rewatching: Option<bool>,
    #[serde(rename = "ADD_ENTRY_IF_MISSING")]
    add_entry_if_missing: Option<bool>,
}

impl UpdateOptions {
    pub fn with_overrides(mut self, json: &str) -> Result<Self> {
        let overrides: OptionOverrides =
            serde_json::from_str(json).context("Invalid --options JSON")?;
        if let Some(v) = overrides.set_completed_to_rewatching_on_first_episode {
            self.set_completed_to_rewatching_on_first_episode = v;
        }
        if let Some(v) = overrides.update_progress_when_rewatching {
            self.update_progress_when_rewatching = v;
        }
        if let Some(v) = overrides.set_to_completed_after_last_episode_current {
            self.set_to_completed_after_last_episode_current = v;
        }
        if let Some(v) = overrides.set_to_completed_after_last_episode_rewatching {
            self.set_to_completed_after_last_episode_rewatching = v;
        }
        if let Some(v) = overrides.add_entry_if_missing {
            self.add_entry_if_missing = v;
        }
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    token: Option<String>,
    /// Path or name of the guessit executable.
    guessit: Option<String>,
    #[serde(default)]
    options: UpdateOptions,
}

#[derive(Debug)]
pub struct Settings {
    pub token: Option<String>,
    pub guessit: String,
    pub options: UpdateOptions,
    pub cache_path: PathBuf,
}

pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);
    let config = read_config_file(&config_path)?;

    let token = resolve_token(
        env::var("ANILIST_TOKEN").ok(),
        &get_token_path(),
        config.token,
    );

    Ok(Settings {
        token,
        guessit: config.guessit.unwrap_or_else(|| "guessit".to_string()),
        options: config.options,
        cache_path: get_cache_path(),
    })
}

/// Environment first, then the token file, then config.toml. An unreadable
/// token file counts as missing.
fn resolve_token(
    env_token: Option<String>,
    token_path: &Path,
    config_token: Option<String>,
) -> Option<String> {
    if let Some(token) = env_token.filter(|token| !token.trim().is_empty()) {
        return Some(token.trim().to_string());
    }
    let file_token = match load_access_token(token_path) {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "ignoring token file");
            None
        }
    };
    file_token.or(config_token)
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

fn parse_config(content: &str) -> Result<ConfigFile> {
    Ok(toml::from_str(content)?)
}

pub fn get_cache_path() -> PathBuf {
    get_config_dir_path().join("cache.json")
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("anilist-updater"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

fn get_config_path() -> PathBuf {
    get_config_dir_path().join("config.toml")
}

fn get_token_path() -> PathBuf {
    get_config_dir_path().join("anilistToken.txt")
}
