use crate::{
    error::{BotError, BotResult},
    speedrun::{
        client::{Endpoint, Fetcher},
        games::Game,
        models::{ApiCategory, Envelope},
    },
    storage::MemoryCache,
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info};

/// Lowercased category name => upstream category identifier.
pub type Categories = BTreeMap<String, String>;

/// Category listings, fetched once per game for the lifetime of the client.
#[derive(Default)]
pub struct CategoryCache {
    cache: MemoryCache<Categories>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty mapping means upstream lists no full game category for the
    /// game. Fetch failures are returned as errors and leave the cache
    /// untouched. Per-level categories are left out.
    pub async fn categories_for(&self, fetcher: &Fetcher, game: &Game) -> BotResult<Arc<Categories>> {
        if let Some(categories) = self.cache.get(game.id) {
            debug!("Category cache hit for {}", game.key);
            return Ok(categories);
        }

        self.cache
            .get_or_try_insert_with(game.id, move || async move {
                debug!("Category cache miss for {}", game.key);
                let response: Envelope<Vec<ApiCategory>> =
                    fetcher.get(&Endpoint::GameCategories(game.id)).await?;
                let (per_level, per_game): (Vec<_>, Vec<_>) = response
                    .data
                    .into_iter()
                    .partition(ApiCategory::is_per_level);
                if !per_level.is_empty() {
                    debug!("Ignoring {} per-level categories of {}", per_level.len(), game.key);
                }
                let categories = per_game
                    .into_iter()
                    .map(|category| (category.name.to_lowercase(), category.id))
                    .collect::<Categories>();
                info!("Cached {} categories for {}", categories.len(), game.key);
                Ok(categories)
            })
            .await
    }

    /// Resolve a category name (case-insensitive) to its identifier.
    pub async fn category_id(&self, fetcher: &Fetcher, game: &Game, name: &str) -> BotResult<String> {
        let categories = self.categories_for(fetcher, game).await?;
        categories
            .get(&name.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| BotError::InvalidCategoryName {
                game: game.key.to_string(),
                category: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Settings, speedrun::games};
    use httpmock::prelude::*;
    use std::time::Duration;

    const CATEGORIES: &str = r#"{"data": [
        {"id": "wk6jd3ed", "name": "Any%", "type": "per-game"},
        {"id": "n2y1y72o", "name": "Single Race", "type": "per-game"}
    ]}"#;

    fn fetcher(server: &MockServer) -> Fetcher {
        Fetcher::new(&Settings {
            speedrun_base_url: server.url("/api/v1"),
            max_transient_retries: 0,
            ..Settings::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_fetch() {
        let server = MockServer::start_async().await;
        let listing = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/games/midnight_club_street_racing/categories");
                then.status(200)
                    .delay(Duration::from_millis(200))
                    .body(CATEGORIES);
            })
            .await;

        let fetcher = fetcher(&server);
        let cache = CategoryCache::new();
        let game = games::lookup("mc1").unwrap();

        let results = futures::future::join_all(
            (0..5).map(|_| cache.categories_for(&fetcher, game)),
        )
        .await;

        for categories in results {
            let categories = categories.unwrap();
            assert_eq!(categories.get("single race").map(String::as_str), Some("n2y1y72o"));
            assert_eq!(categories.get("any%").map(String::as_str), Some("wk6jd3ed"));
        }
        listing.assert_hits_async(1).await;

        // later calls are served from memory
        cache.categories_for(&fetcher, game).await.unwrap();
        listing.assert_hits_async(1).await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn category_names_are_case_insensitive() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/games/midnight_club_street_racing/categories");
                then.status(200).body(CATEGORIES);
            })
            .await;

        let fetcher = fetcher(&server);
        let cache = CategoryCache::new();
        let game = games::lookup("mc1").unwrap();

        let id = cache.category_id(&fetcher, game, "SINGLE race").await.unwrap();
        assert_eq!(id, "n2y1y72o");

        match cache.category_id(&fetcher, game, "glitchless").await {
            Err(BotError::InvalidCategoryName { game, category }) => {
                assert_eq!((game.as_str(), category.as_str()), ("mc1", "glitchless"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn per_level_categories_are_left_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/games/mc2/categories");
                then.status(200).body(
                    r#"{"data": [
                        {"id": "any", "name": "Any%", "type": "per-game"},
                        {"id": "il", "name": "Race IL", "type": "per-level"},
                        {"id": "old", "name": "Legacy"}
                    ]}"#,
                );
            })
            .await;

        let fetcher = fetcher(&server);
        let cache = CategoryCache::new();
        let game = games::lookup("mc2").unwrap();

        let categories = cache.categories_for(&fetcher, game).await.unwrap();
        assert_eq!(
            categories.keys().collect::<Vec<_>>(),
            vec!["any%", "legacy"]
        );
        assert!(matches!(
            cache.category_id(&fetcher, game, "race il").await,
            Err(BotError::InvalidCategoryName { .. })
        ));
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let server = MockServer::start_async().await;
        let mut failing = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/games/mc2/categories");
                then.status(404);
            })
            .await;

        let fetcher = fetcher(&server);
        let cache = CategoryCache::new();
        let game = games::lookup("mc2").unwrap();

        let result = cache.categories_for(&fetcher, game).await;
        assert!(matches!(result, Err(BotError::UpstreamRejected(_))));
        assert!(cache.is_empty());

        failing.delete_async().await;
        let listing = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/games/mc2/categories");
                then.status(200).body(r#"{"data": []}"#);
            })
            .await;

        let categories = cache.categories_for(&fetcher, game).await.unwrap();
        assert!(categories.is_empty());
        listing.assert_hits_async(1).await;
        assert_eq!(cache.len(), 1);
    }
}
