use serde_json::{Map, Value};
use std::process::Command;

use crate::domain::error::UpdateError;

/// Options passed on every call: no country/language tokens, episode-shaped parsing.
const GUESSIT_OPTIONS: [&str; 6] = [
    "--excludes",
    "country",
    "--excludes",
    "language",
    "--type",
    "episode",
];

/// Maps a filename or folder name to a structured best-effort guess.
pub trait Guesser {
    fn guess(&self, fragment: &str) -> Result<Guess, UpdateError>;
}

/// A numeric field that may have been detected more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Numbers {
    One(u32),
    Many(Vec<u32>),
}

impl Numbers {
    pub fn first(&self) -> Option<u32> {
        match self {
            Numbers::One(n) => Some(*n),
            Numbers::Many(list) => list.first().copied(),
        }
    }
}

/// Guess result. Field order is the order in which the guesser recognized
/// them, which the title heuristics depend on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Guess(Map<String, Value>);

impl Guess {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Guess(map),
            _ => Guess::default(),
        }
    }

    /// Index of `field` in discovery order.
    pub fn position(&self, field: &str) -> Option<usize> {
        self.0.keys().position(|key| key == field)
    }

    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    pub fn episode_title(&self) -> Option<&str> {
        self.text("episode_title")
    }

    pub fn episode(&self) -> Option<Numbers> {
        self.0.get("episode").and_then(numbers)
    }

    pub fn season(&self) -> Option<Numbers> {
        self.0.get("season").and_then(numbers)
    }

    pub fn part(&self) -> Option<u32> {
        self.0.get("part").and_then(numbers).and_then(|n| n.first())
    }

    pub fn year(&self) -> Option<u32> {
        self.0.get("year").and_then(numbers).and_then(|n| n.first())
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    }
}

fn numbers(value: &Value) -> Option<Numbers> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Numbers::One),
        Value::String(s) => s.trim().parse().ok().map(Numbers::One),
        Value::Array(items) => {
            let list: Vec<u32> = items
                .iter()
                .filter_map(|item| item.as_u64())
                .filter_map(|n| u32::try_from(n).ok())
                .collect();
            match list.len() {
                0 => None,
                1 => Some(Numbers::One(list[0])),
                _ => Some(Numbers::Many(list)),
            }
        }
        _ => None,
    }
}

/// Runs the `guessit` executable and reads its JSON output.
#[derive(Debug, Clone)]
pub struct GuessitCli {
    program: String,
}

impl GuessitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Guesser for GuessitCli {
    fn guess(&self, fragment: &str) -> Result<Guess, UpdateError> {
        let output = Command::new(&self.program)
            .arg("--json")
            .args(GUESSIT_OPTIONS)
            .arg("--")
            .arg(fragment)
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UpdateError::Guess(format!(
                    "'{}' not found. Please install guessit and ensure it's in your PATH.",
                    self.program
                )));
            }
            Err(e) => {
                return Err(UpdateError::Guess(format!(
                    "failed to execute {}: {e}",
                    self.program
                )));
            }
        };

        if !output.status.success() {
            return Err(UpdateError::Guess(format!(
                "{} failed: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_output(&output.stdout)
    }
}

fn parse_output(stdout: &[u8]) -> Result<Guess, UpdateError> {
    let map: Map<String, Value> = serde_json::from_slice(stdout)
        .map_err(|e| UpdateError::Guess(format!("unreadable guessit output: {e}")))?;
    Ok(Guess(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_position_follows_discovery_order() {
        let guess = parse_output(
            br#"{"episode": 1, "season": 1, "title": "Title", "container": "mkv"}"#,
        )
        .unwrap();
        assert_eq!(guess.position("episode"), Some(0));
        assert_eq!(guess.position("season"), Some(1));
        assert_eq!(guess.position("title"), Some(2));
        assert_eq!(guess.position("year"), None);
    }

    #[test]
    fn test_numbers_single_and_list() {
        let guess = Guess::from_value(json!({
            "title": "Eighty Six",
            "episode": [86, 13],
            "season": 2,
            "part": 1,
            "year": 2021,
        }));
        assert_eq!(guess.episode(), Some(Numbers::Many(vec![86, 13])));
        assert_eq!(guess.season(), Some(Numbers::One(2)));
        assert_eq!(guess.part(), Some(1));
        assert_eq!(guess.year(), Some(2021));
        assert_eq!(guess.episode().and_then(|n| n.first()), Some(86));
    }

    #[test]
    fn test_empty_title_is_absent() {
        let guess = Guess::from_value(json!({"title": "", "episode_title": "02"}));
        assert_eq!(guess.title(), None);
        assert_eq!(guess.episode_title(), Some("02"));
        assert_eq!(guess.position("title"), Some(0));
    }

    #[test]
    fn test_non_object_value_is_empty_guess() {
        assert_eq!(Guess::from_value(json!([1, 2])), Guess::default());
    }

    #[test]
    fn test_unreadable_output() {
        let err = parse_output(b"For: file.mkv").unwrap_err();
        assert!(matches!(err, UpdateError::Guess(_)));
    }

    #[test]
    fn test_missing_program() {
        let guesser = GuessitCli::new("guessit-binary-that-does-not-exist");
        let err = guesser.guess("Show - 01.mkv").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
