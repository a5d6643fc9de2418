pub mod categories;
pub mod client;
pub mod games;
pub mod leaderboard;
pub mod models;
pub mod profile;
pub mod roster;

use crate::{
    config::Settings,
    error::{BotError, BotResult},
};
use categories::{Categories, CategoryCache};
use client::Fetcher;
use games::Game;
use leaderboard::{RankedRuns, Top};
use profile::{ProfileResolver, RunnerProfile};
use roster::{Roster, RunnerAggregator};
use std::sync::Arc;
use tracing::info;

/// Client for the speedrun.com leaderboards of the tracked games. Owns the
/// category and roster caches; independent instances share nothing.
pub struct Speedrun {
    fetcher: Fetcher,
    categories: CategoryCache,
    rosters: RunnerAggregator,
    profiles: ProfileResolver,
}

impl Speedrun {
    pub fn new(settings: &Settings) -> BotResult<Self> {
        info!("Speedrun client targeting {}", settings.speedrun_base_url);
        Ok(Self {
            fetcher: Fetcher::new(settings)?,
            categories: CategoryCache::new(),
            rosters: RunnerAggregator::new(settings.max_concurrent_requests),
            profiles: ProfileResolver::new(settings.max_concurrent_requests, settings.max_run_pages),
        })
    }

    pub fn games(&self) -> &'static [Game] {
        &games::GAMES
    }

    /// Categories of a game, lowercased name => identifier.
    pub async fn categories(&self, game_key: &str) -> BotResult<Arc<Categories>> {
        let game = games::lookup(game_key)?;
        let categories = self.categories.categories_for(&self.fetcher, game).await?;
        match categories.is_empty() {
            true => Err(BotError::NoDataFound(format!("no categories listed for {}", game.key))),
            false => Ok(categories),
        }
    }

    /// World record or top 5 of a category.
    pub async fn speedrun(&self, game_key: &str, category: &str, top: Top) -> BotResult<RankedRuns> {
        let game = games::lookup(game_key)?;
        let category_id = self.categories.category_id(&self.fetcher, game, category).await?;
        let ranked = leaderboard::top_runs(&self.fetcher, game, &category_id, top).await?;
        match ranked.runs.is_empty() {
            true => Err(BotError::NoDataFound(format!(
                "no runs yet for {} in {}",
                category, game.key
            ))),
            false => Ok(ranked),
        }
    }

    /// Registered runners with at least one run in the game.
    pub async fn runners(&self, game_key: &str) -> BotResult<Arc<Roster>> {
        let game = games::lookup(game_key)?;
        self.rosters
            .roster_for(&self.fetcher, &self.categories, game)
            .await
    }

    pub async fn profile(&self, name: &str) -> BotResult<RunnerProfile> {
        self.profiles.profile_for(&self.fetcher, name.trim()).await
    }

    /// (cached category listings, cached rosters)
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.categories.len(), self.rosters.len())
    }
}
