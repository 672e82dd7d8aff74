use crate::domain::models::{AiringStatus, CatalogEntry, MediaFormat, MediaSeason};

/// Assumed length of a season whose episode count the catalog doesn't know
/// yet. A guess, so resolutions relying on it can land in the wrong season.
pub const DEFAULT_SEASON_LENGTH: u32 = 12;

/// Entries at or below this runtime are shorts and aren't counted.
const MIN_EPISODE_MINUTES: u32 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonMatch<'a> {
    pub entry: &'a CatalogEntry,
    pub relative_episode: u32,
}

/// A file episode past the primary entry's known length means the release
/// counts episodes across the whole franchise.
pub fn uses_absolute_numbering(primary: &CatalogEntry, episode: u32) -> bool {
    primary.episodes.is_some_and(|total| episode > total)
}

/// Keeps full-length TV seasons and sorts them by air date.
pub fn filter_valid_seasons(entries: &[CatalogEntry]) -> Vec<&CatalogEntry> {
    let mut seasons: Vec<&CatalogEntry> = entries
        .iter()
        .filter(|entry| entry.format == Some(MediaFormat::Tv))
        .filter(|entry| match entry.duration_minutes {
            Some(minutes) => minutes > MIN_EPISODE_MINUTES,
            // Newly announced seasons have no duration yet.
            None => entry.airing_status == Some(AiringStatus::Releasing),
        })
        .collect();

    seasons.sort_by_key(|entry| {
        (
            entry.season_year.unwrap_or(u32::MAX),
            entry.season.unwrap_or(MediaSeason::Unknown).order(),
        )
    });
    seasons
}

/// Walks `seasons` in order until `absolute_episode` fits. `None` when the
/// number is past every known season.
pub fn find_season_and_episode<'a>(
    seasons: &[&'a CatalogEntry],
    absolute_episode: u32,
) -> Option<SeasonMatch<'a>> {
    let mut accumulated = 0;
    for &entry in seasons {
        let length = entry
            .episodes
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SEASON_LENGTH);

        if accumulated + length >= absolute_episode {
            return Some(SeasonMatch {
                entry,
                relative_episode: absolute_episode - accumulated,
            });
        }
        accumulated += length;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resolve_absolute, tv_season};

    fn franchise() -> Vec<CatalogEntry> {
        vec![
            tv_season(10, "Show", 2020, MediaSeason::Winter, Some(12)),
            tv_season(30, "Show Season 3", 2022, MediaSeason::Spring, Some(10)),
            tv_season(20, "Show Season 2", 2021, MediaSeason::Fall, Some(12)),
        ]
    }

    #[test]
    fn test_uses_absolute_numbering() {
        let entry = tv_season(1, "Show", 2020, MediaSeason::Winter, Some(12));
        assert!(!uses_absolute_numbering(&entry, 12));
        assert!(uses_absolute_numbering(&entry, 13));

        let airing = tv_season(1, "Show", 2020, MediaSeason::Winter, None);
        assert!(!uses_absolute_numbering(&airing, 500));
    }

    #[test]
    fn test_second_season_relative_episode() {
        let entries = franchise();
        let found = resolve_absolute(&entries, 18).unwrap();
        assert_eq!(found.entry.id, 20);
        assert_eq!(found.relative_episode, 6);
    }

    #[test]
    fn test_boundary_stays_in_earlier_season() {
        let entries = franchise();
        let found = resolve_absolute(&entries, 12).unwrap();
        assert_eq!(found.entry.id, 10);
        assert_eq!(found.relative_episode, 12);

        let found = resolve_absolute(&entries, 24).unwrap();
        assert_eq!(found.entry.id, 20);
        assert_eq!(found.relative_episode, 12);

        let found = resolve_absolute(&entries, 25).unwrap();
        assert_eq!(found.entry.id, 30);
        assert_eq!(found.relative_episode, 1);
    }

    #[test]
    fn test_past_every_season_is_unresolved() {
        let entries = franchise();
        assert!(resolve_absolute(&entries, 34).is_some());
        assert!(resolve_absolute(&entries, 35).is_none());
        assert!(resolve_absolute(&[], 1).is_none());
    }

    #[test]
    fn test_resolution_is_stable() {
        let entries = franchise();
        for episode in 1..=34 {
            let first = resolve_absolute(&entries, episode).unwrap();
            let second = resolve_absolute(&entries, episode).unwrap();
            assert_eq!(first.entry.id, second.entry.id);
            assert_eq!(first.relative_episode, second.relative_episode);
        }
    }

    #[test]
    fn test_shorts_and_specials_are_excluded() {
        let mut short = tv_season(40, "Show Minis", 2020, MediaSeason::Spring, Some(24));
        short.duration_minutes = Some(3);
        let mut ona = tv_season(50, "Show ONA", 2020, MediaSeason::Summer, Some(6));
        ona.format = Some(MediaFormat::Ona);
        let mut entries = franchise();
        entries.push(short);
        entries.push(ona);

        let ids: Vec<u64> = filter_valid_seasons(&entries).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_releasing_without_duration_is_kept() {
        let mut upcoming = tv_season(60, "Show Season 4", 2023, MediaSeason::Summer, None);
        upcoming.duration_minutes = None;
        upcoming.airing_status = Some(AiringStatus::Releasing);
        let mut announced = tv_season(70, "Show Season 5", 2024, MediaSeason::Summer, None);
        announced.duration_minutes = None;
        announced.airing_status = Some(AiringStatus::NotYetReleased);
        let mut entries = franchise();
        entries.push(upcoming);
        entries.push(announced);

        let ids: Vec<u64> = filter_valid_seasons(&entries).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 20, 30, 60]);

        // Unknown length counts as a standard season.
        let found = resolve_absolute(&entries, 34 + DEFAULT_SEASON_LENGTH).unwrap();
        assert_eq!(found.entry.id, 60);
        assert_eq!(found.relative_episode, DEFAULT_SEASON_LENGTH);
    }

    #[test]
    fn test_unknown_year_and_season_sort_last() {
        let mut undated = tv_season(80, "Show Sequel", 2020, MediaSeason::Winter, Some(12));
        undated.season_year = None;
        let mut unseasoned = tv_season(90, "Show Recap", 2021, MediaSeason::Winter, Some(12));
        unseasoned.season = None;
        let mut entries = vec![undated, unseasoned];
        entries.extend(franchise());

        let ids: Vec<u64> = filter_valid_seasons(&entries).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 20, 90, 30, 80]);
    }
}
