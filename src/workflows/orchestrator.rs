use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::Action;
use crate::config::UpdateOptions;
use crate::domain::error::UpdateError;
use crate::domain::models::{ParsedFileInfo, ResolvedEntry};
use crate::infra::anilist::{Catalog, SearchQuery};
use crate::infra::cache::{containing_directory, CacheEntry, CacheStore};
use crate::infra::guessit::Guesser;
use crate::workflows::progress::{self, DecisionKind};
use crate::workflows::{extractor, resolver};

/// Result of handling one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The identity after any update, with server-applied progress and status.
    pub entry: ResolvedEntry,
    pub kind: DecisionKind,
    pub from_cache: bool,
}

impl Outcome {
    /// Short message for the player's on-screen display.
    pub fn osd_message(&self) -> String {
        let name = &self.entry.anime_name;
        let progress = self
            .entry
            .current_progress
            .map_or_else(|| "?".to_string(), |p| p.to_string());
        match self.kind {
            DecisionKind::Skip => format!("Opening AniList for \"{name}\""),
            DecisionKind::AddToList => {
                format!("Added \"{name}\" to your list with progress: {progress}")
            }
            DecisionKind::Restart => {
                format!("Updated \"{name}\" to REPEATING with progress: {progress}")
            }
            DecisionKind::Update => format!("Updated \"{name}\" to: {progress}"),
        }
    }
}

/// Handles watched files: guess, resolve, decide, write, remember.
pub struct Updater<G: Guesser, C: Catalog> {
    guesser: G,
    catalog: C,
    cache: CacheStore,
    options: UpdateOptions,
    action: Action,
}

impl<G: Guesser, C: Catalog> Updater<G, C> {
    pub fn new(
        guesser: G,
        catalog: C,
        cache: CacheStore,
        options: UpdateOptions,
        action: Action,
    ) -> Self {
        Self {
            guesser,
            catalog,
            cache,
            options,
            action,
        }
    }

    pub fn handle_file(&mut self, path: &str) -> Result<Outcome, UpdateError> {
        let parsed = extractor::parse_file(&self.guesser, path)?;
        let directory = containing_directory(path);
        let cached = self.cached_entry(&directory, &parsed.name);

        if self.action == Action::Launch {
            if let Some(cached) = &cached {
                info!(name = %parsed.name, anime_id = cached.anime_id, "opening cached anime");
                let entry = cached.resolve(parsed.episode).unwrap_or_else(|| ResolvedEntry {
                    anime_id: cached.anime_id,
                    anime_name: cached.anime_name.clone(),
                    current_progress: cached.current_progress,
                    total_episodes: cached.total_episodes,
                    file_progress: parsed.episode,
                    current_status: cached.current_status,
                });
                return Ok(Outcome {
                    entry,
                    kind: DecisionKind::Skip,
                    from_cache: true,
                });
            }
        }

        if let Some(resolved) = cached.and_then(|entry| entry.resolve(parsed.episode)) {
            info!(name = %parsed.name, "using cached data");
            match self.apply(resolved, true) {
                Ok(outcome) => {
                    self.remember(&directory, &parsed, &outcome);
                    return Ok(outcome);
                }
                // Refusals are final and the entry stays valid for the folder.
                Err(err) if err.is_policy_refusal() => return Err(err),
                Err(err) => {
                    warn!(error = %err, "update from cached data failed, resolving again");
                    if let Err(e) = self.cache.remove(&directory, Utc::now()) {
                        warn!(error = %e, "failed to drop cache entry");
                    }
                }
            }
        }

        let resolved = self.resolve(&parsed)?;
        let outcome = self.apply(resolved, false)?;
        self.remember(&directory, &parsed, &outcome);
        Ok(outcome)
    }

    fn cached_entry(&mut self, directory: &str, guessed_name: &str) -> Option<CacheEntry> {
        match self.cache.lookup(directory, guessed_name, Utc::now()) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "failed to read cache, treating as a miss");
                None
            }
        }
    }

    fn remember(&mut self, directory: &str, parsed: &ParsedFileInfo, outcome: &Outcome) {
        if outcome.entry.current_progress.is_none() {
            return;
        }
        let now = Utc::now();
        let entry = CacheEntry::new(&parsed.name, parsed.episode, &outcome.entry, now);
        if let Err(e) = self.cache.store(directory, entry, now) {
            warn!(error = %e, "failed to write cache");
        }
    }

    /// Looks the guessed name up in the catalog, following absolute
    /// numbering into later seasons when needed.
    fn resolve(&mut self, parsed: &ParsedFileInfo) -> Result<ResolvedEntry, UpdateError> {
        let mut query = SearchQuery {
            search: parsed.name.clone(),
            year: parsed.year,
            on_list: true,
        };
        let mut entries = self.catalog.search(&query)?;

        if entries.is_empty() {
            let add_if_missing = self.action == Action::Update && self.options.add_entry_if_missing;
            if self.action != Action::Launch && !add_if_missing {
                return Err(UpdateError::NotFound {
                    name: parsed.name.clone(),
                    hint: ". Is it in your list?",
                });
            }

            info!(name = %parsed.name, "not found in your list, searching all anime");
            query.on_list = false;
            entries = self.catalog.search(&query)?;
            let Some(first) = entries.first() else {
                return Err(UpdateError::NotFound {
                    name: parsed.name.clone(),
                    hint: "",
                });
            };

            if add_if_missing {
                // Not on the list yet, so there is no progress to compare against.
                return Ok(ResolvedEntry {
                    current_progress: None,
                    current_status: None,
                    ..ResolvedEntry::from_entry(first, parsed.episode)
                });
            }
        }

        let primary = &entries[0];
        if !resolver::uses_absolute_numbering(primary, parsed.episode) {
            debug!(anime_id = primary.id, title = %primary.title, "final guessed anime");
            return Ok(ResolvedEntry::from_entry(primary, parsed.episode));
        }

        let seasons = resolver::filter_valid_seasons(&entries);
        let titles: Vec<&str> = seasons.iter().map(|s| s.title.as_str()).collect();
        debug!(related = ?titles, "related seasons");

        let found = resolver::find_season_and_episode(&seasons, parsed.episode).ok_or(
            UpdateError::ResolutionExhausted {
                episode: parsed.episode,
                seasons: seasons.len(),
            },
        )?;
        info!(
            absolute = parsed.episode,
            anime = %found.entry.title,
            episode = found.relative_episode,
            "resolved absolute episode"
        );
        Ok(ResolvedEntry::from_entry(found.entry, found.relative_episode))
    }

    fn apply(&mut self, resolved: ResolvedEntry, from_cache: bool) -> Result<Outcome, UpdateError> {
        let decision = progress::decide(self.action, &self.options, &resolved)?;
        if decision.mutations.is_empty() {
            return Ok(Outcome {
                entry: resolved,
                kind: decision.kind,
                from_cache,
            });
        }

        let viewer = self.catalog.viewer()?;
        debug!(viewer_id = viewer.id, viewer = %viewer.name, "authenticated");

        let saved = progress::execute(&mut self.catalog, &decision)?;
        let entry = match saved {
            Some(saved) => ResolvedEntry {
                current_progress: saved.progress.or(decision.new_progress()),
                current_status: saved.status.or(decision.new_status()),
                ..resolved
            },
            None => resolved,
        };
        Ok(Outcome {
            entry,
            kind: decision.kind,
            from_cache,
        })
    }
}
