use crate::{
    core::templates::MessageTemplate,
    error::{BotError, BotResult},
    speedrun::{
        categories::Categories,
        games::{self, Game},
        leaderboard::{RankedRuns, Top},
        profile::RunnerProfile,
        roster::Roster,
    },
    utils::format_run_time,
};
use chrono::Local;
use itertools::Itertools;
use minijinja::context;
use tracing::error;

pub fn games(games: &[Game]) -> BotResult<String> {
    Ok(MessageTemplate::Games
        .get()?
        .render(context! { games => games })?)
}

pub fn categories(game: &str, categories: &Categories) -> BotResult<String> {
    // BTreeMap keys are already sorted
    let names = categories.keys().collect::<Vec<&String>>();
    Ok(MessageTemplate::Categories
        .get()?
        .render(context! { game => game, categories => names })?)
}

pub fn runs(game: &str, category: &str, top: Top, ranked: &RankedRuns) -> BotResult<String> {
    let runs = ranked
        .runs
        .iter()
        .map(|run| {
            context! {
                rank => run.rank,
                runner => run.runner,
                time => format_run_time(run.time),
                video => run.video,
            }
        })
        .collect::<Vec<_>>();

    Ok(MessageTemplate::Runs.get()?.render(context! {
        game => game,
        category => category,
        count => top.count(),
        timestamp => ranked.timestamp.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S").to_string(),
        runs => runs,
    })?)
}

pub fn roster(game: &str, roster: &Roster) -> BotResult<String> {
    // Case-insensitive order for presentation only
    let names = roster
        .names
        .iter()
        .sorted_by_key(|name| name.to_lowercase())
        .collect::<Vec<&String>>();
    Ok(MessageTemplate::Roster.get()?.render(context! {
        game => game,
        names => names,
        complete => roster.complete,
    })?)
}

pub fn profile(profile: &RunnerProfile) -> BotResult<String> {
    let runs = profile
        .runs
        .iter()
        .map(|run| {
            context! {
                game => run.game,
                category => run.category,
                time => format_run_time(run.time),
                date => run.date,
                video => run.video,
            }
        })
        .collect::<Vec<_>>();

    Ok(MessageTemplate::Profile.get()?.render(context! {
        name => profile.name,
        weblink => profile.weblink,
        runs => runs,
    })?)
}

/// User facing message for a failed command. Transport details stay in the logs.
pub fn failure(err: &BotError) -> String {
    let message = match err {
        BotError::InvalidGameKey(_) => format!(
            "Invalid game name! Use: {}",
            games::keys().join(", ")
        ),
        BotError::InvalidCategoryName { game, .. } => format!(
            "Invalid category! Use `runboard categories {game}` to see valid options."
        ),
        BotError::NoDataFound(what) => format!("Nothing to show: {what}."),
        BotError::NotFound(name) => format!("No runner named '{name}' on speedrun.com."),
        BotError::UpstreamUnavailable(_)
        | BotError::UpstreamRejected(_)
        | BotError::InvalidUrl(_) => {
            "speedrun.com is unavailable right now, try again later.".to_string()
        }
        BotError::MalformedResponse(_) => {
            "speedrun.com sent a response that could not be read.".to_string()
        }
        BotError::Config(_) | BotError::Template(_) => "Something went wrong on our side.".to_string(),
    };

    match MessageTemplate::Failure
        .get()
        .and_then(|template| Ok(template.render(context! { message => message })?))
    {
        Ok(rendered) => rendered,
        Err(e) => {
            error!("{e}");
            message
        }
    }
}
