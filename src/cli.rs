use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Action {
    /// Record the watched episode on the list
    Update,
    /// Only open the anime's page
    Launch,
}

#[derive(Parser)]
#[command(name = "anilist-updater")]
#[command(about = "Guess the anime episode behind a video file and update AniList progress")]
pub struct Cli {
    /// Path of the video file that was watched
    pub path: String,

    /// What to do with the guessed anime
    #[arg(long, default_value = "update")]
    pub action: Action,

    /// JSON object overriding behaviour options, e.g. '{"ADD_ENTRY_IF_MISSING": true}'
    #[arg(long)]
    pub options: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
}
