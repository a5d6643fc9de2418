use crate::{
    error::{BotError, BotResult},
    speedrun::{
        categories::CategoryCache,
        client::{Endpoint, Fetcher},
        games::Game,
        leaderboard,
        models::{ApiUser, Envelope},
    },
    storage::MemoryCache,
};
use futures::{stream, StreamExt};
use serde::Serialize;
use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};
use tracing::{debug, info, warn};

/// Display names of the registered runners with at least one run in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roster {
    pub names: BTreeSet<String>,
    // false when some category or runner could not be fetched
    pub complete: bool,
}

// Roster along with whether a failure behind it may clear up on retry.
struct Aggregate {
    roster: Roster,
    transient_failure: bool,
}

// Outcome of an aggregation that must not be published in the cache.
enum Uncommitted {
    Failed(BotError),
    Partial(Roster),
}

pub struct RunnerAggregator {
    cache: MemoryCache<Roster>,
    concurrency: usize,
}

impl RunnerAggregator {
    pub fn new(concurrency: usize) -> Self {
        RunnerAggregator {
            cache: MemoryCache::new(),
            concurrency: concurrency.max(1),
        }
    }

    /// Roster of a game, computed once and then served from memory. A roster
    /// missing data because of a transient failure (transport error, 5xx,
    /// throttling) is returned but not cached, so the next call tries again.
    /// Rejected requests (4xx) are final and do not prevent caching.
    pub async fn roster_for(
        &self,
        fetcher: &Fetcher,
        categories: &CategoryCache,
        game: &Game,
    ) -> BotResult<Arc<Roster>> {
        if let Some(roster) = self.cache.get(game.id) {
            debug!("Roster cache hit for {}", game.key);
            return Ok(roster);
        }

        let concurrency = self.concurrency;
        let result = self
            .cache
            .get_or_try_insert_with(game.id, move || async move {
                let aggregate = aggregate(fetcher, categories, game, concurrency)
                    .await
                    .map_err(Uncommitted::Failed)?;
                match aggregate.transient_failure {
                    false => Ok(aggregate.roster),
                    true => Err(Uncommitted::Partial(aggregate.roster)),
                }
            })
            .await;

        match result {
            Ok(roster) => Ok(roster),
            Err(Uncommitted::Partial(roster)) => {
                warn!("Partial roster for {}, not caching it.", game.key);
                Ok(Arc::new(roster))
            }
            Err(Uncommitted::Failed(e)) => Err(e),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

async fn aggregate(
    fetcher: &Fetcher,
    categories: &CategoryCache,
    game: &Game,
    concurrency: usize,
) -> BotResult<Aggregate> {
    let categories = categories.categories_for(fetcher, game).await?;
    let mut complete = true;
    let mut transient_failure = false;

    // Leaderboards are independent, so fetch them concurrently and merge
    // runner identifiers into a set.
    let leaderboards = stream::iter(categories.iter())
        .map(move |(name, id)| async move { (name, leaderboard::runner_ids(fetcher, game, id).await) })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

    let mut runner_ids = HashSet::new();
    for (name, result) in leaderboards {
        match result {
            Ok(ids) => runner_ids.extend(ids),
            Err(e) => {
                warn!("Skipping category '{name}' of {}: {e}", game.key);
                complete = false;
                transient_failure |= e.is_transient();
            }
        }
    }
    info!(
        "Found {} distinct runners across {} categories of {}",
        runner_ids.len(),
        categories.len(),
        game.key
    );

    // One profile lookup per distinct runner.
    let profiles = stream::iter(runner_ids)
        .map(move |id| async move {
            let profile = fetcher.get::<Envelope<ApiUser>>(&Endpoint::User(&id)).await;
            (id, profile)
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

    let mut names = BTreeSet::new();
    for (id, profile) in profiles {
        match profile {
            Ok(user) => {
                names.insert(user.data.names.international);
            }
            Err(e) => {
                warn!("Could not resolve runner {id}: {e}");
                complete = false;
                transient_failure |= e.is_transient();
            }
        }
    }

    Ok(Aggregate {
        roster: Roster { names, complete },
        transient_failure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Settings, speedrun::games};
    use httpmock::prelude::*;

    fn fetcher(server: &MockServer) -> Fetcher {
        Fetcher::new(&Settings {
            speedrun_base_url: server.url("/api/v1"),
            max_transient_retries: 0,
            ..Settings::default()
        })
        .unwrap()
    }

    async fn mock_user<'a>(server: &'a MockServer, id: &str, name: &str) -> httpmock::Mock<'a> {
        let path = format!("/api/v1/users/{id}");
        let body = format!(r#"{{"data": {{"id": "{id}", "names": {{"international": "{name}"}}}}}}"#);
        server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200).body(body);
            })
            .await
    }

    #[tokio::test]
    async fn failed_category_yields_uncached_partial_roster() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/games/mc2/categories");
                then.status(200).body(
                    r#"{"data": [{"id": "ok", "name": "Any%"}, {"id": "broken", "name": "100%"}]}"#,
                );
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/leaderboards/mc2/category/ok");
                then.status(200).body(
                    r#"{"data": {"runs": [{"place": 1, "run": {"id": "r", "players": [{"rel": "user", "id": "u1"}], "times": {"primary_t": 1}}}]}}"#,
                );
            })
            .await;
        let broken = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/leaderboards/mc2/category/broken");
                then.status(500);
            })
            .await;
        mock_user(&server, "u1", "Alice").await;

        let fetcher = fetcher(&server);
        let categories = CategoryCache::new();
        let aggregator = RunnerAggregator::new(2);
        let game = games::lookup("mc2").unwrap();

        let roster = aggregator.roster_for(&fetcher, &categories, game).await.unwrap();
        assert!(!roster.complete);
        assert_eq!(roster.names, BTreeSet::from(["Alice".to_string()]));
        assert!(aggregator.is_empty());

        aggregator.roster_for(&fetcher, &categories, game).await.unwrap();
        broken.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn deleted_runner_is_left_out_and_roster_cached() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/games/mc2/categories");
                then.status(200).body(r#"{"data": [{"id": "any", "name": "Any%"}]}"#);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/leaderboards/mc2/category/any");
                then.status(200).body(
                    r#"{"data": {"runs": [
                        {"place": 1, "run": {"id": "a", "players": [{"rel": "user", "id": "u1"}], "times": {"primary_t": 1}}},
                        {"place": 2, "run": {"id": "b", "players": [{"rel": "user", "id": "gone"}], "times": {"primary_t": 2}}}
                    ]}}"#,
                );
            })
            .await;
        let alice = mock_user(&server, "u1", "Alice").await;
        let gone = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/users/gone");
                then.status(404);
            })
            .await;

        let fetcher = fetcher(&server);
        let categories = CategoryCache::new();
        let aggregator = RunnerAggregator::new(4);
        let game = games::lookup("mc2").unwrap();

        let roster = aggregator.roster_for(&fetcher, &categories, game).await.unwrap();
        assert_eq!(roster.names.len(), 1);
        assert!(!roster.complete);
        assert_eq!(aggregator.len(), 1);

        let again = aggregator.roster_for(&fetcher, &categories, game).await.unwrap();
        assert_eq!(roster, again);
        alice.assert_hits_async(1).await;
        gone.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn rejected_category_does_not_prevent_caching() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/games/mc2/categories");
                then.status(200).body(
                    r#"{"data": [{"id": "ok", "name": "Any%"}, {"id": "bad", "name": "Odd"}]}"#,
                );
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/leaderboards/mc2/category/ok");
                then.status(200).body(
                    r#"{"data": {"runs": [{"place": 1, "run": {"id": "r", "players": [{"rel": "user", "id": "u1"}], "times": {"primary_t": 1}}}]}}"#,
                );
            })
            .await;
        let bad = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/leaderboards/mc2/category/bad");
                then.status(400);
            })
            .await;
        mock_user(&server, "u1", "Alice").await;

        let fetcher = fetcher(&server);
        let categories = CategoryCache::new();
        let aggregator = RunnerAggregator::new(2);
        let game = games::lookup("mc2").unwrap();

        let roster = aggregator.roster_for(&fetcher, &categories, game).await.unwrap();
        assert!(!roster.complete);
        assert_eq!(aggregator.len(), 1);

        aggregator.roster_for(&fetcher, &categories, game).await.unwrap();
        bad.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn category_listing_failure_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/games/mc2/categories");
                then.status(200).body("{\"data\": ");
            })
            .await;

        let fetcher = fetcher(&server);
        let aggregator = RunnerAggregator::new(4);
        let result = aggregator
            .roster_for(&fetcher, &CategoryCache::new(), games::lookup("mc2").unwrap())
            .await;

        assert!(matches!(result, Err(BotError::MalformedResponse(_))));
        assert!(aggregator.is_empty());
    }
}
