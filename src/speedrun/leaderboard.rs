use crate::{
    error::BotResult,
    speedrun::{
        client::{Endpoint, Fetcher},
        games::Game,
        models::{ApiLeaderboard, ApiPlacedRun, ApiPlayer, Envelope},
    },
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use strum::{Display, EnumString};
use tracing::debug;

pub const UNKNOWN_RUNNER: &str = "Unknown";
pub const NO_VIDEO: &str = "No video";

/// How many runs to show for a category: the world record or the top 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum Top {
    #[strum(to_string = "wr", serialize = "1", serialize = "top1")]
    One,
    #[strum(to_string = "top5", serialize = "5")]
    Five,
}

impl Top {
    pub fn count(&self) -> usize {
        match self {
            Top::One => 1,
            Top::Five => 5,
        }
    }
}

// Leaderboard entry normalized for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub rank: u32,
    pub runner: String,
    // primary timing, in seconds
    pub time: f64,
    pub video: String,
}

#[derive(Debug, Clone)]
pub struct RankedRuns {
    pub timestamp: DateTime<Utc>,
    pub runs: Vec<Run>,
}

/// Top ranked runs of a category, best first. Empty when nobody submitted a
/// run yet.
pub async fn top_runs(
    fetcher: &Fetcher,
    game: &Game,
    category_id: &str,
    top: Top,
) -> BotResult<RankedRuns> {
    let endpoint = Endpoint::Leaderboard {
        game: game.id,
        category: category_id,
        top: Some(top.count()),
    };
    let response: Envelope<ApiLeaderboard> = fetcher.get(&endpoint).await?;
    let runs = normalize(response.data, top.count());
    debug!("{} runs on {} category {}", runs.len(), game.key, category_id);

    Ok(RankedRuns {
        timestamp: Utc::now(),
        runs,
    })
}

/// Identifiers of every registered runner on the full leaderboard of a
/// category. Guest runs are skipped.
pub async fn runner_ids(fetcher: &Fetcher, game: &Game, category_id: &str) -> BotResult<HashSet<String>> {
    let endpoint = Endpoint::Leaderboard {
        game: game.id,
        category: category_id,
        top: None,
    };
    let response: Envelope<ApiLeaderboard> = fetcher.get(&endpoint).await?;
    Ok(registered_players(&response.data.runs))
}

fn registered_players(runs: &[ApiPlacedRun]) -> HashSet<String> {
    runs.iter()
        .flat_map(|placed| placed.run.players.iter())
        .filter(|player| player.is_user())
        .filter_map(|player| player.id.clone())
        .collect()
}

fn normalize(leaderboard: ApiLeaderboard, count: usize) -> Vec<Run> {
    let names = leaderboard
        .players
        .map(|players| players.data)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|player| {
            let name = player.display_name()?.to_string();
            Some((player.id?, name))
        })
        .collect::<HashMap<String, String>>();

    let mut runs = leaderboard
        .runs
        .into_iter()
        .map(|placed| Run {
            rank: placed.place,
            runner: placed
                .run
                .players
                .first()
                .and_then(|player| runner_name(player, &names))
                .unwrap_or(UNKNOWN_RUNNER)
                .to_string(),
            time: placed.run.times.primary_t,
            video: placed.run.video().unwrap_or(NO_VIDEO).to_string(),
        })
        .collect::<Vec<Run>>();

    // Ties upstream can yield more than `top` runs. Unplaced runs come last.
    runs.sort_by_key(|run| match run.rank {
        0 => u32::MAX,
        rank => rank,
    });
    runs.truncate(count);
    runs
}

fn runner_name<'a>(player: &'a ApiPlayer, names: &'a HashMap<String, String>) -> Option<&'a str> {
    match player.is_user() {
        true => player
            .id
            .as_ref()
            .and_then(|id| names.get(id))
            .map(String::as_str),
        false => player.display_name(),
    }
}
