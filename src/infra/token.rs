use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Reads the access token from the first line of `path`.
///
/// Older versions stored `user_id:token` on the first line and appended
/// cache rows containing `;;`. Either layout is rewritten to the bare token.
pub fn load_access_token(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file {}", path.display()))?;
    let lines: Vec<&str> = content.lines().collect();
    let Some(header) = lines.first() else {
        return Ok(None);
    };

    let has_legacy_cache = lines.iter().any(|line| line.contains(";;"));
    let legacy_user_id = header
        .split_once(':')
        .filter(|(user_id, _)| {
            !user_id.is_empty() && user_id.chars().all(|c| c.is_ascii_digit())
        });

    let token = match legacy_user_id {
        Some((_, token)) => token.trim().to_string(),
        None => header.trim().to_string(),
    };

    if has_legacy_cache || legacy_user_id.is_some() {
        let rewritten = if token.is_empty() {
            String::new()
        } else {
            format!("{token}\n")
        };
        fs::write(path, rewritten)
            .with_context(|| format!("Failed to rewrite token file {}", path.display()))?;
        if legacy_user_id.is_some() {
            info!("cleaned up legacy user_id from token file");
        }
        if has_legacy_cache {
            info!("cleaned up legacy cache entries from token file");
        }
    }

    Ok(Some(token).filter(|token| !token.is_empty()))
}
