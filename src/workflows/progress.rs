use tracing::info;

use crate::cli::Action;
use crate::config::UpdateOptions;
use crate::domain::error::UpdateError;
use crate::domain::models::{ListStatus, ResolvedEntry};
use crate::infra::anilist::{Catalog, SaveEntry, SavedEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    /// Nothing to write (view-only action).
    Skip,
    Update,
    AddToList,
    /// COMPLETED → REPEATING on the first episode.
    Restart,
}

/// One save call: progress plus an optional status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub progress: u32,
    pub status: Option<ListStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDecision {
    pub catalog_id: u64,
    pub kind: DecisionKind,
    /// Issued in order. Empty for `Skip`.
    pub mutations: Vec<Mutation>,
}

impl UpdateDecision {
    pub fn new_progress(&self) -> Option<u32> {
        self.mutations.last().map(|m| m.progress)
    }

    pub fn new_status(&self) -> Option<ListStatus> {
        self.mutations.iter().rev().find_map(|m| m.status)
    }
}

/// Decides what to write for `entry`. Refusals come back as errors and
/// nothing is sent in that case.
pub fn decide(
    action: Action,
    options: &UpdateOptions,
    entry: &ResolvedEntry,
) -> Result<UpdateDecision, UpdateError> {
    let episode = entry.file_progress;
    let decision = |kind, mutations| UpdateDecision {
        catalog_id: entry.anime_id,
        kind,
        mutations,
    };

    if action == Action::Launch {
        return Ok(decision(DecisionKind::Skip, Vec::new()));
    }

    let Some(status) = entry.current_status else {
        if entry.current_progress.is_none() && options.add_entry_if_missing {
            return Ok(decision(
                DecisionKind::AddToList,
                vec![Mutation {
                    progress: episode,
                    status: Some(ListStatus::Current),
                }],
            ));
        }
        return Err(UpdateError::NotOnList {
            name: entry.anime_name.clone(),
        });
    };
    let progress = entry.current_progress.unwrap_or(0);

    if status == ListStatus::Completed
        && episode == 1
        && options.set_completed_to_rewatching_on_first_episode
    {
        // The service drops progress to 0 when leaving COMPLETED, so the
        // status change and the progress go in separate calls.
        return Ok(decision(
            DecisionKind::Restart,
            vec![
                Mutation {
                    progress: 0,
                    status: Some(ListStatus::Repeating),
                },
                Mutation {
                    progress: 1,
                    status: Some(ListStatus::Repeating),
                },
            ],
        ));
    }

    let mut new_status = match status {
        ListStatus::Repeating if options.update_progress_when_rewatching => {
            if episode < progress {
                return Err(UpdateError::NotNew { episode, progress });
            }
            ListStatus::Repeating
        }
        ListStatus::Current | ListStatus::Planning => {
            if entry.current_progress.is_some() && episode <= progress {
                return Err(UpdateError::NotNew { episode, progress });
            }
            ListStatus::Current
        }
        other => {
            return Err(UpdateError::NotModifiable {
                status: other.to_string(),
            })
        }
    };

    let completes = match status {
        ListStatus::Current => options.set_to_completed_after_last_episode_current,
        ListStatus::Repeating => options.set_to_completed_after_last_episode_rewatching,
        _ => false,
    };
    if completes && entry.total_episodes == Some(episode) {
        new_status = ListStatus::Completed;
    }

    Ok(decision(
        DecisionKind::Update,
        vec![Mutation {
            progress: episode,
            status: Some(new_status),
        }],
    ))
}

/// Sends the decision's mutations in order and returns the last server reply.
pub fn execute<C: Catalog>(
    catalog: &mut C,
    decision: &UpdateDecision,
) -> Result<Option<SavedEntry>, UpdateError> {
    let mut saved = None;
    for mutation in &decision.mutations {
        let reply = catalog.save_entry(&SaveEntry {
            media_id: decision.catalog_id,
            progress: Some(mutation.progress),
            status: mutation.status,
        })?;
        info!(
            anime_id = decision.catalog_id,
            progress = ?reply.progress,
            status = ?reply.status,
            "list entry saved"
        );
        saved = Some(reply);
    }
    Ok(saved)
}
