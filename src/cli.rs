use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::speedrun::leaderboard::Top;

#[derive(Debug, Parser, Serialize)]
#[command(name = "runboard", about = "Midnight Club speedrun leaderboards from the command line")]
pub struct Cli {
    /// Base URL of the speedrun.com API (overrides SPEEDRUN_BASE_URL)
    #[arg(long, global = true)]
    #[serde(rename = "speedrun_base_url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    #[serde(skip)]
    pub action: Action,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Action {
    /// List the supported games
    Games,
    /// List available categories for a game
    Categories { game: String },
    /// World record or top 5 runs of a category
    Speedrun {
        category: String,
        game: String,
        #[arg(default_value = "wr")]
        top: Top,
    },
    /// Every registered runner with a run in the game
    Runners { game: String },
    /// All runs submitted by a runner
    Profile { name: String },
}
