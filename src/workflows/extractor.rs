use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::domain::error::UpdateError;
use crate::domain::models::ParsedFileInfo;
use crate::infra::guessit::{Guess, Guesser, Numbers};

/// Punctuation that some releases use instead of spaces.
static SEPARATOR_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:!*?"<>|._-]"#).expect("valid regex"));

/// `E05v2` style version markers.
static VERSION_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(E\d+)v\d").expect("valid regex"));

/// Titles whose punctuation trips the guesser unless flattened to spaces.
const PUNCTUATED_TITLES: [&str; 4] = ["Ranma", "Chi", "Bleach", "Link Click"];

/// How many ancestor folders may supply the title.
const MAX_FOLDER_DEPTH: usize = 3;

/// Path component a fix rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixTarget {
    /// The file name, or the folder the title was found in.
    TitleComponent,
    Filename,
}

/// A known mis-detection and its textual workaround. `applies` sees the
/// title the first guess produced (from the file or a folder, empty when
/// there was none) and the filename guess itself.
struct TitleFix {
    name: &'static str,
    target: FixTarget,
    applies: fn(&str, &Guess) -> bool,
    apply: fn(&str) -> String,
}

static TITLE_FIXES: &[TitleFix] = &[
    TitleFix {
        name: "flatten punctuation",
        target: FixTarget::TitleComponent,
        applies: |title, _| PUNCTUATED_TITLES.iter().any(|t| title.contains(t)),
        apply: |part| {
            let spaced = SEPARATOR_CHARS_RE.replace_all(part, " ");
            spaced.split_whitespace().collect::<Vec<_>>().join(" ")
        },
    },
    TitleFix {
        // The film is split in three on the catalog and "5" reads as an episode.
        name: "centimeters per second",
        target: FixTarget::TitleComponent,
        applies: |title, guess| {
            title == "Centimeters per Second" && guess.episode() == Some(Numbers::One(5))
        },
        apply: |part| part.replace(" 5 ", " Five ").replace("per Second", "per Second 3"),
    },
    TitleFix {
        name: "strip version marker",
        target: FixTarget::Filename,
        applies: |_, _| true,
        apply: |part| VERSION_MARKER_RE.replace(part, "$1").into_owned(),
    },
];

/// Splits a path on either separator convention, dropping empty components.
pub fn split_path(path: &str) -> Vec<String> {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}

/// Applies the fix table to the filename and to the folder the title was found in.
fn fix_path_parts<G: Guesser>(guesser: &G, parts: &mut [String]) -> Result<(), UpdateError> {
    let Some(last) = parts.len().checked_sub(1) else {
        return Ok(());
    };

    let guess = guesser.guess(&parts[last])?;
    parts[last] = strip_extension(&parts[last]).to_string();

    let mut title_index = last;
    let mut title = guess.title().map(str::to_string);

    if title.is_none() {
        for depth in 2..MAX_FOLDER_DEPTH.min(parts.len()) + 1 {
            let index = parts.len() - depth;
            if let Some(folder_title) = guesser.guess(&parts[index])?.title() {
                title = Some(folder_title.to_string());
                title_index = index;
                break;
            }
        }
    }

    let title = title.unwrap_or_default();
    for fix in TITLE_FIXES {
        if !(fix.applies)(&title, &guess) {
            continue;
        }
        let index = match fix.target {
            FixTarget::TitleComponent => title_index,
            FixTarget::Filename => last,
        };
        let fixed = (fix.apply)(&parts[index]);
        if fixed != parts[index] {
            debug!(
                fix = fix.name,
                from = %parts[index],
                to = %fixed,
                "applied title fix"
            );
            parts[index] = fixed;
        }
    }

    Ok(())
}

/// Builds the catalog search key. Season 1 is only spelled out when a part
/// accompanies it.
pub fn compose_search_name(
    title: &str,
    remaining: &[u32],
    season: Option<u32>,
    part: Option<u32>,
) -> String {
    let mut name = title.to_string();

    if !remaining.is_empty() {
        let numbers: Vec<String> = remaining.iter().map(u32::to_string).collect();
        name.push(' ');
        name.push_str(&numbers.join(" "));
    }

    if let Some(season) = season {
        if season > 1 || part.is_some() {
            name.push_str(&format!(" Season {season}"));
        }
    }

    if let Some(part) = part {
        name.push_str(&format!(" Part {part}"));
    }

    name
}

/// Infers the search name and episode for a watched file.
pub fn parse_file<G: Guesser>(guesser: &G, path: &str) -> Result<ParsedFileInfo, UpdateError> {
    let mut parts = split_path(path);
    if parts.is_empty() {
        return Err(UpdateError::Parse {
            path: path.to_string(),
        });
    }
    fix_path_parts(guesser, &mut parts)?;

    let filename = &parts[parts.len() - 1];
    let guess = guesser.guess(filename)?;
    debug!(filename = %filename, guess = ?guess, "file name guess");

    let mut remaining = Vec::new();
    let mut episode = match guess.episode() {
        Some(Numbers::One(n)) => Some(n),
        Some(Numbers::Many(mut list)) => {
            debug!(episodes = ?list, "multiple episodes detected, picking the last one");
            let last = list.pop();
            remaining = list;
            last
        }
        None => None,
    };

    // "S2 02" often lands in episode_title.
    if episode.is_none() {
        if let Some(text) = guess.episode_title() {
            if text.chars().all(|c| c.is_ascii_digit()) {
                episode = text.parse().ok();
                debug!(episode = ?episode, "episode taken from episode_title");
            }
        }
    }

    let mut season = match guess.season() {
        Some(Numbers::Many(list)) => {
            debug!(seasons = ?list, "multiple seasons detected, picking the first one");
            if episode.is_none() && list.len() > 1 {
                episode = list.last().copied();
            }
            list.first().copied()
        }
        Some(Numbers::One(n)) => Some(n),
        None => None,
    };
    let mut part = guess.part();
    let mut year = guess.year();

    let episode = episode.filter(|n| *n > 0).unwrap_or(1);

    let episode_index = guess.position("episode").unwrap_or(1);
    let season_index = guess.position("season");
    let title_in_filename = guess.title().is_some()
        && episode_index > 0
        && season_index.map_or(true, |index| index > 0);

    let title = if title_in_filename {
        guess.title().unwrap_or_default().to_string()
    } else {
        let mut title = String::new();
        for depth in 2..=MAX_FOLDER_DEPTH {
            let Some(index) = parts.len().checked_sub(depth) else {
                break;
            };
            let folder_guess = guesser.guess(&parts[index])?;
            debug!(
                folder = %parts[index],
                guess = ?folder_guess,
                depth = depth - 1,
                "folder guess"
            );

            season = season.or_else(|| folder_guess.season().and_then(|s| s.first()));
            part = part.or_else(|| folder_guess.part());
            year = year.or_else(|| folder_guess.year());

            if let Some(folder_title) = folder_guess.title() {
                title = folder_title.to_string();
                break;
            }
        }
        title
    };

    if title.is_empty() {
        return Err(UpdateError::Parse {
            path: path.to_string(),
        });
    }

    let name = compose_search_name(&title, &remaining, season, part);
    info!(name = %name, episode, "guessed name");

    Ok(ParsedFileInfo {
        name,
        episode,
        year,
    })
}
