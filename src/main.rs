use clap::Parser;
use runboard::{
    cli::{Action, Cli},
    config::Settings,
    core::display,
    error::{BotError, BotResult},
    speedrun::Speedrun,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::new(&cli)?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(settings.get_trace_level())
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let speedrun = Speedrun::new(&settings)?;

    info!("Running {:?}", cli.action);
    let reply = match tokio::time::timeout(settings.command_timeout(), execute(&speedrun, &cli.action)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            error!("{e}");
            display::failure(&e)
        }
        Err(_) => {
            let e = BotError::UpstreamUnavailable(format!(
                "command did not complete within {}s",
                settings.command_timeout_sec
            ));
            error!("{e}");
            display::failure(&e)
        }
    };
    println!("{reply}");

    let (categories, rosters) = speedrun.cache_stats();
    info!("Cached {categories} category listing(s) and {rosters} roster(s).");

    Ok(())
}

async fn execute(speedrun: &Speedrun, action: &Action) -> BotResult<String> {
    match action {
        Action::Games => display::games(speedrun.games()),
        Action::Categories { game } => {
            let categories = speedrun.categories(game).await?;
            display::categories(game, &categories)
        }
        Action::Speedrun {
            category,
            game,
            top,
        } => {
            let ranked = speedrun.speedrun(game, category, *top).await?;
            display::runs(game, category, *top, &ranked)
        }
        Action::Runners { game } => {
            let roster = speedrun.runners(game).await?;
            display::roster(game, &roster)
        }
        Action::Profile { name } => {
            let profile = speedrun.profile(name).await?;
            display::profile(&profile)
        }
    }
}
