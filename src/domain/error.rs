use thiserror::Error;

/// Everything that can stop a single file from being tracked.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("couldn't find a title in '{path}' or its parent folders")]
    Parse { path: String },

    #[error("couldn't find an anime from this title ({name}){hint}")]
    NotFound { name: String, hint: &'static str },

    #[error("\"{name}\" is not on your list")]
    NotOnList { name: String },

    #[error("anime is not in a modifiable state (status: {status}), not updating")]
    NotModifiable { status: String },

    #[error("episode was not new, not updating ({episode} <= {progress})")]
    NotNew { episode: u32, progress: u32 },

    #[error("absolute episode {episode} is past the end of all {seasons} known seasons")]
    ResolutionExhausted { episode: u32, seasons: usize },

    #[error("no access token configured")]
    NotAuthenticated,

    #[error("API request failed: HTTP {status} - {body}")]
    Http { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("filename guess failed: {0}")]
    Guess(String),
}

impl UpdateError {
    /// Refusals decided by the update policy rather than by a failing lookup.
    pub fn is_policy_refusal(&self) -> bool {
        matches!(
            self,
            UpdateError::NotOnList { .. }
                | UpdateError::NotModifiable { .. }
                | UpdateError::NotNew { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_descriptive() {
        let err = UpdateError::NotNew {
            episode: 3,
            progress: 5,
        };
        assert_eq!(err.to_string(), "episode was not new, not updating (3 <= 5)");

        let err = UpdateError::NotFound {
            name: "Show".to_string(),
            hint: ". Is it in your list?",
        };
        assert_eq!(
            err.to_string(),
            "couldn't find an anime from this title (Show). Is it in your list?"
        );
    }

    #[test]
    fn test_policy_refusals() {
        assert!(UpdateError::NotNew {
            episode: 1,
            progress: 1
        }
        .is_policy_refusal());
        assert!(!UpdateError::NotAuthenticated.is_policy_refusal());
    }
}
