mod cli;
mod config;
mod domain;
mod infra;
#[cfg(test)]
mod testing;
mod workflows;

use anyhow::Result;
use clap::Parser;
use std::process::Command;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Action, Cli};
use infra::anilist::AniListClient;
use infra::cache::CacheStore;
use infra::guessit::GuessitCli;
use workflows::orchestrator::Updater;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = config::load_settings(cli.config.as_deref())?;
    let options = match &cli.options {
        Some(json) => settings.options.with_overrides(json)?,
        None => settings.options,
    };

    let client = AniListClient::new(settings.token)?;
    let cache = CacheStore::new(settings.cache_path);
    let guesser = GuessitCli::new(settings.guessit);
    let mut updater = Updater::new(guesser, client, cache, options, cli.action);

    let outcome = updater.handle_file(&cli.path)?;
    info!(
        anime_id = outcome.entry.anime_id,
        from_cache = outcome.from_cache,
        "handled file"
    );

    if cli.action == Action::Launch {
        let url = outcome.entry.page_url();
        info!(url = %url, "opening AniList");
        open_in_browser(&url);
    }
    // Picked up by the player script and shown on screen.
    println!("OSD:{}", outcome.osd_message());

    Ok(())
}

fn open_in_browser(url: &str) {
    let result = if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", "", url]).status()
    } else if cfg!(target_os = "macos") {
        Command::new("open").arg(url).status()
    } else {
        Command::new("xdg-open").arg(url).status()
    };

    match result {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(%status, "browser launcher exited with an error"),
        Err(e) => warn!(error = %e, "failed to launch browser"),
    }
}
