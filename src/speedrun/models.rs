// Responses from the speedrun.com REST API (v1). Only the fields the bot
// reads are declared; serde ignores everything else.
use serde::Deserialize;

/// Every endpoint wraps its payload in `{"data": ..., "pagination": ...}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    pub fn next_page(&self) -> Option<&str> {
        self.pagination
            .as_ref()?
            .links
            .iter()
            .find(|link| link.rel == "next")
            .map(|link| link.uri.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: String,
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiCategory {
    pub id: String,
    pub name: String,
    // "per-game" or "per-level"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ApiCategory {
    /// Per-level categories have no full game leaderboard.
    pub fn is_per_level(&self) -> bool {
        self.kind.as_deref() == Some("per-level")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiLeaderboard {
    #[serde(default)]
    pub runs: Vec<ApiPlacedRun>,
    // Present when requested with `embed=players`
    #[serde(default)]
    pub players: Option<Envelope<Vec<ApiPlayer>>>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPlacedRun {
    pub place: u32,
    pub run: ApiRun,
}

#[derive(Debug, Deserialize)]
pub struct ApiRun {
    pub id: String,
    #[serde(default)]
    pub weblink: Option<String>,
    #[serde(default)]
    pub game: Option<GameRef>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub players: Vec<ApiPlayer>,
    #[serde(default)]
    pub date: Option<String>,
    pub times: ApiTimes,
    #[serde(default)]
    pub videos: Option<ApiVideos>,
}

impl ApiRun {
    pub fn video(&self) -> Option<&str> {
        self.videos
            .as_ref()?
            .links
            .iter()
            .find_map(|link| link.uri.as_deref())
    }
}

/// A run's game: a bare identifier, or the full record with `embed=game`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GameRef {
    Id(String),
    Embedded { data: ApiGame },
}

impl GameRef {
    /// Identifiers under which the game may appear in the static table.
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            GameRef::Id(id) => vec![id.as_str()],
            GameRef::Embedded { data } => {
                let mut ids = vec![data.id.as_str()];
                ids.extend(data.abbreviation.as_deref());
                ids
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiGame {
    pub id: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

/// Player reference on a run, or an embedded player record. Registered
/// accounts carry `rel: "user"` and an `id`; guests carry `rel: "guest"`
/// and an inline `name`.
#[derive(Debug, Deserialize)]
pub struct ApiPlayer {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub names: Option<ApiNames>,
}

impl ApiPlayer {
    pub fn is_user(&self) -> bool {
        self.rel == "user"
    }

    pub fn display_name(&self) -> Option<&str> {
        self.names
            .as_ref()
            .map(|names| names.international.as_str())
            .or(self.name.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiTimes {
    pub primary_t: f64,
}

#[derive(Debug, Deserialize)]
pub struct ApiVideos {
    #[serde(default)]
    pub links: Vec<ApiVideoLink>,
}

#[derive(Debug, Deserialize)]
pub struct ApiVideoLink {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiUser {
    pub id: String,
    pub names: ApiNames,
    #[serde(default)]
    pub weblink: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiNames {
    pub international: String,
}
