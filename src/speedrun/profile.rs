use crate::{
    error::{BotError, BotResult},
    speedrun::{
        client::{Endpoint, Fetcher},
        games::{self, UNKNOWN_GAME},
        leaderboard::NO_VIDEO,
        models::{ApiCategory, ApiRun, ApiUser, Envelope},
    },
};
use futures::{stream, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub const UNKNOWN_CATEGORY: &str = "Unknown Category";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRun {
    pub game: String,
    pub category: String,
    // primary timing, in seconds
    pub time: f64,
    pub video: String,
    pub date: Option<String>,
    pub weblink: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerProfile {
    pub id: String,
    pub name: String,
    pub weblink: String,
    pub runs: Vec<ProfileRun>,
}

pub struct ProfileResolver {
    concurrency: usize,
    max_pages: usize,
}

impl ProfileResolver {
    pub fn new(concurrency: usize, max_pages: usize) -> Self {
        ProfileResolver {
            concurrency: concurrency.max(1),
            max_pages: max_pages.max(1),
        }
    }

    /// Full run history of a runner, with game and category names resolved.
    /// Never cached.
    pub async fn profile_for(&self, fetcher: &Fetcher, name: &str) -> BotResult<RunnerProfile> {
        let user = self.lookup_user(fetcher, name).await?;
        let runs = self.runs_of(fetcher, &user.id).await?;
        let category_names = self.category_names(fetcher, &runs).await;
        info!(
            "Resolved {} runs in {} categories for {}",
            runs.len(),
            category_names.len(),
            user.names.international
        );

        let runs = runs
            .iter()
            .map(|run| ProfileRun {
                game: run
                    .game
                    .as_ref()
                    .and_then(|game| {
                        game.identifiers()
                            .into_iter()
                            .find_map(games::by_upstream_id)
                    })
                    .map_or(UNKNOWN_GAME, |game| game.title)
                    .to_string(),
                category: run
                    .category
                    .as_ref()
                    .and_then(|id| category_names.get(id))
                    .map_or(UNKNOWN_CATEGORY, String::as_str)
                    .to_string(),
                time: run.times.primary_t,
                video: run.video().unwrap_or(NO_VIDEO).to_string(),
                date: run.date.clone(),
                weblink: run.weblink.clone(),
            })
            .collect();

        let weblink = user.weblink.unwrap_or_else(|| {
            format!("https://www.speedrun.com/user/{}", user.names.international)
        });
        Ok(RunnerProfile {
            id: user.id,
            name: user.names.international,
            weblink,
            runs,
        })
    }

    async fn lookup_user(&self, fetcher: &Fetcher, name: &str) -> BotResult<ApiUser> {
        let response: Envelope<Vec<ApiUser>> = fetcher.get(&Endpoint::UserLookup(name)).await?;
        let mut users = response.data;

        // Prefer an exact match, then a case-insensitive one, then whatever
        // upstream ranked first.
        let position = users
            .iter()
            .position(|user| user.names.international == name)
            .or_else(|| {
                users
                    .iter()
                    .position(|user| user.names.international.eq_ignore_ascii_case(name))
            });
        match (position, users.is_empty()) {
            (Some(position), _) => Ok(users.swap_remove(position)),
            (None, false) => Ok(users.swap_remove(0)),
            (None, true) => Err(BotError::NotFound(name.to_string())),
        }
    }

    async fn runs_of(&self, fetcher: &Fetcher, user_id: &str) -> BotResult<Vec<ApiRun>> {
        let mut page: Envelope<Vec<ApiRun>> = fetcher.get(&Endpoint::UserRuns(user_id)).await?;
        let mut runs = Vec::new();
        let mut pages = 1;

        loop {
            let next = page.next_page().map(str::to_string);
            runs.append(&mut page.data);
            match next {
                Some(url) if pages < self.max_pages => {
                    debug!("Following runs page {} for {user_id}", pages + 1);
                    page = fetcher.fetch(&url).await?;
                    pages += 1;
                }
                Some(_) => {
                    warn!("Stopped after {pages} pages of runs for {user_id}");
                    break;
                }
                None => break,
            }
        }

        Ok(runs)
    }

    // One lookup per distinct category. Failed lookups are left out and
    // rendered as unknown.
    async fn category_names(&self, fetcher: &Fetcher, runs: &[ApiRun]) -> HashMap<String, String> {
        let ids = runs
            .iter()
            .filter_map(|run| run.category.clone())
            .collect::<HashSet<String>>();

        stream::iter(ids)
            .map(move |id| async move {
                let category = fetcher.get::<Envelope<ApiCategory>>(&Endpoint::Category(&id)).await;
                (id, category)
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|(id, category)| async move {
                match category {
                    Ok(category) => Some((id, category.data.name)),
                    Err(e) => {
                        warn!("Could not resolve category {id}: {e}");
                        None
                    }
                }
            })
            .collect()
            .await
    }
}
