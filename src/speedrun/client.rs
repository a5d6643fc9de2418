use crate::{
    config::Settings,
    error::{BotError, BotResult},
};
use reqwest::{header::HeaderMap, header::RETRY_AFTER, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::{fmt, time::Duration};
use tracing::{debug, warn};

const MAX_TRANSIENT_BACKOFF: Duration = Duration::from_secs(30);

pub enum Endpoint<'a> {
    GameCategories(&'a str),
    Leaderboard {
        game: &'a str,
        category: &'a str,
        top: Option<usize>,
    },
    UserLookup(&'a str),
    User(&'a str),
    UserRuns(&'a str),
    Category(&'a str),
}

impl fmt::Display for Endpoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endpoint::GameCategories(game) => write!(f, "/games/{}/categories", game),
            Endpoint::Leaderboard {
                game,
                category,
                top: Some(top),
            } => write!(
                f,
                "/leaderboards/{}/category/{}?top={}&embed=players",
                game, category, top
            ),
            Endpoint::Leaderboard {
                game,
                category,
                top: None,
            } => write!(f, "/leaderboards/{}/category/{}", game, category),
            Endpoint::UserLookup(name) => {
                write!(f, "/users?lookup={}", urlencoding::encode(name))
            }
            Endpoint::User(id) => write!(f, "/users/{}", id),
            Endpoint::UserRuns(id) => write!(f, "/runs?user={}&max=200&embed=game", id),
            Endpoint::Category(id) => write!(f, "/categories/{}", id),
        }
    }
}

/// Retry budget of the fetcher. Throttling (429) and transient failures
/// (transport errors, 5xx) are counted separately and both are capped.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub default_retry_after: Duration,
    pub max_throttle_retries: u32,
    pub max_transient_retries: u32,
    pub transient_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        RetryPolicy {
            default_retry_after: Duration::from_secs(settings.default_retry_after_sec),
            max_throttle_retries: settings.max_throttle_retries,
            max_transient_retries: settings.max_transient_retries,
            transient_backoff: Duration::from_millis(settings.transient_backoff_ms),
        }
    }

    /// Exponential backoff for the n-th transient retry (0-based), capped.
    pub fn transient_delay(&self, attempt: u32) -> Duration {
        self.transient_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_TRANSIENT_BACKOFF)
    }

    /// Wait requested by the server, or the default when absent or unusable.
    pub fn throttle_delay(&self, headers: &HeaderMap) -> Duration {
        retry_after(headers).unwrap_or(self.default_retry_after)
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds = value.trim().parse::<f64>().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Rate limit aware JSON client for the speedrun.com API. Every upstream
/// call of the bot goes through `fetch`.
pub struct Fetcher {
    http_client: Client,
    base_url: String,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> BotResult<Self> {
        let http_client = Client::builder()
            .timeout(settings.api_timeout())
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            http_client,
            base_url: settings.speedrun_base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::from_settings(settings),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &Endpoint<'_>) -> BotResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.fetch(&url).await
    }

    /// GET an absolute URL and decode its JSON body. 429 responses are waited
    /// out and retried; transport errors and 5xx are retried with backoff.
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str) -> BotResult<T> {
        let url = Url::parse(url).map_err(|e| BotError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BotError::InvalidUrl(format!("{url}: unsupported scheme")));
        }

        let mut throttled = 0;
        let mut transient = 0;

        loop {
            debug!("GET {url}");
            let failure = match self.http_client.get(url.clone()).send().await {
                Ok(response) => match response.status() {
                    StatusCode::OK => {
                        let body = response.text().await?;
                        return serde_json::from_str(&body)
                            .map_err(|e| BotError::MalformedResponse(format!("{url}: {e}")));
                    }
                    StatusCode::TOO_MANY_REQUESTS => {
                        if throttled >= self.policy.max_throttle_retries {
                            return Err(BotError::UpstreamUnavailable(format!(
                                "{url} still rate limited after {throttled} retries"
                            )));
                        }
                        throttled += 1;
                        let wait = self.policy.throttle_delay(response.headers());
                        warn!(
                            "Rate-limited on {url}, retrying in {wait:?} ({throttled}/{}).",
                            self.policy.max_throttle_retries
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    status if status.is_server_error() => format!("{url} returned {status}"),
                    status => {
                        return Err(BotError::UpstreamRejected(format!(
                            "{url} returned {status}"
                        )))
                    }
                },
                Err(e) => format!("{url}: {e}"),
            };

            if transient >= self.policy.max_transient_retries {
                return Err(BotError::UpstreamUnavailable(failure));
            }
            let wait = self.policy.transient_delay(transient);
            transient += 1;
            warn!(
                "{failure}. Retrying in {wait:?} ({transient}/{}).",
                self.policy.max_transient_retries
            );
            tokio::time::sleep(wait).await;
        }
    }
}
