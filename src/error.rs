/// Custom Error and Result types to unify errors from all sources.
pub type BotResult<T> = Result<T, BotError>;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Invalid game key '{0}'")]
    InvalidGameKey(String),
    #[error("Invalid category '{category}' for game '{game}'")]
    InvalidCategoryName { game: String, category: String },
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    // Non-retryable 4xx; asking again yields the same answer
    #[error("Upstream rejected the request: {0}")]
    UpstreamRejected(String),
    #[error("No data found: {0}")]
    NoDataFound(String),
    #[error("No runner found with name '{0}'")]
    NotFound(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Configuration Error: {0}")]
    Config(String),
    #[error("Template Error: {0}")]
    Template(String),
}

impl BotError {
    /// Whether the same request may succeed if tried again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, BotError::UpstreamUnavailable(_))
    }
}

impl From<reqwest::Error> for BotError {
    fn from(error: reqwest::Error) -> Self {
        BotError::UpstreamUnavailable(error.to_string())
    }
}

impl From<figment::Error> for BotError {
    fn from(error: figment::Error) -> Self {
        BotError::Config(error.to_string())
    }
}

impl From<minijinja::Error> for BotError {
    fn from(error: minijinja::Error) -> Self {
        BotError::Template(error.to_string())
    }
}
