use crate::error::{BotError, BotResult};
use serde::Serialize;

/// A game tracked by the bot: a short key typed by users, mapped to the
/// speedrun.com game identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Game {
    pub key: &'static str,
    pub id: &'static str,
    pub title: &'static str,
}

pub const UNKNOWN_GAME: &str = "Unknown Game";

// Midnight Club games. Extend by adding entries.
pub static GAMES: [Game; 6] = [
    Game {
        key: "mc3remix",
        id: "midnight_club_3_dub_edition_remix",
        title: "Midnight Club 3: DUB Edition Remix",
    },
    Game {
        key: "mc3dub",
        id: "midnight_club_3_dub_edition",
        title: "Midnight Club 3: DUB Edition",
    },
    Game {
        key: "mc2",
        id: "mc2",
        title: "Midnight Club II",
    },
    Game {
        key: "mc1",
        id: "midnight_club_street_racing",
        title: "Midnight Club: Street Racing",
    },
    Game {
        key: "mcla",
        id: "midnight_club_los_angeles",
        title: "Midnight Club: Los Angeles",
    },
    Game {
        key: "mcla_remix",
        id: "midnight_club_los_angeles_remix",
        title: "Midnight Club: Los Angeles Remix",
    },
];

/// Resolve a user supplied game key, case-insensitively.
pub fn lookup(key: &str) -> BotResult<&'static Game> {
    GAMES
        .iter()
        .find(|game| game.key.eq_ignore_ascii_case(key.trim()))
        .ok_or_else(|| BotError::InvalidGameKey(key.to_string()))
}

/// Resolve a game from an upstream identifier or abbreviation, as found on runs.
pub fn by_upstream_id(id: &str) -> Option<&'static Game> {
    GAMES.iter().find(|game| game.id.eq_ignore_ascii_case(id))
}

pub fn keys() -> Vec<&'static str> {
    GAMES.iter().map(|game| game.key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        assert_eq!(lookup("MC2").unwrap().id, "mc2");
        assert_eq!(lookup(" mcla_remix ").unwrap().key, "mcla_remix");
    }

    #[test]
    fn unknown_key_is_invalid_game_key() {
        match lookup("mc4") {
            Err(BotError::InvalidGameKey(key)) => assert_eq!(key, "mc4"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn upstream_ids_map_back_to_games() {
        assert_eq!(
            by_upstream_id("midnight_club_street_racing").map(|g| g.key),
            Some("mc1")
        );
        assert!(by_upstream_id("o1y9wo6q").is_none());
    }

    #[test]
    fn keys_are_unique() {
        let mut keys = keys();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), GAMES.len());
    }
}
