use crate::error::BotResult;
use minijinja::{Environment, Template};
use once_cell::sync::Lazy;
use strum::{EnumIter, IntoEnumIterator};
use tracing::{error, info};

static TEMPLATES_ENVIRONMENT: Lazy<Environment> = Lazy::new(|| {
    info!("Initializing templating engine environment.");
    let mut env = Environment::new();

    // Use strum to iterate over the variants of the enum.
    for template in MessageTemplate::iter() {
        if let Err(e) = env.add_template(template.name(), template.template()) {
            error!("Could not load template '{}': {e}", template.name());
        }
    }

    info!("Templates loaded in templating engine environment.");

    env
});

#[derive(Debug, Clone, Copy, EnumIter)]
pub enum MessageTemplate {
    Games,
    Categories,
    Runs,
    Roster,
    Profile,
    Failure,
}

impl MessageTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            MessageTemplate::Games => "games.txt",
            MessageTemplate::Categories => "categories.txt",
            MessageTemplate::Runs => "runs.txt",
            MessageTemplate::Roster => "roster.txt",
            MessageTemplate::Profile => "profile.txt",
            MessageTemplate::Failure => "failure.txt",
        }
    }

    pub fn get(&self) -> BotResult<Template<'static, 'static>> {
        Ok(TEMPLATES_ENVIRONMENT.get_template(self.name())?)
    }

    pub fn template(&self) -> &'static str {
        // \n\ at each code line end creates a line break at the proper position and discards further spaces in this line of code.
        // \x20 (hex; 32 in decimal) is an ASCII space and an indicator for the first space to be preserved in this line of the string.
        match self {
            MessageTemplate::Games => {
                "🎮 *Tracked games*:\
                {%- for game in games %}\n\
                    \x20 🔹 {{ game.key }} ({{ game.title }})\
                {%- endfor %}"
            }
            MessageTemplate::Categories => {
                "📂 *Available Categories for {{ game|upper }}*:\
                {%- for name in categories %}\n\
                    \x20 🔹 {{ name }}\
                {%- endfor %}"
            }
            MessageTemplate::Runs => {
                "🏁 *Top {{ count }} {{ category|upper }} Runs for {{ game|upper }}* (as of {{ timestamp }})\
                {%- for run in runs %}\n\n\
                    *#{{ run.rank }} - {{ run.runner }}*\n\
                    \x20 ⏱️ Time: {{ run.time }}\n\
                    \x20 🎥 Video: {{ run.video }}\
                {%- endfor %}"
            }
            MessageTemplate::Roster => {
                "🏎️ *{{ names|length }} runner{{ 's' if names|length != 1 }} for {{ game|upper }}*\
                {{- ' (partial, some leaderboards were unavailable)' if not complete }}:\
                {%- for name in names %}\n\
                    \x20 🔹 {{ name }}\
                {%- endfor %}"
            }
            MessageTemplate::Profile => {
                "🧑 *{{ name }}* ({{ weblink }}), {{ runs|length }} run{{ 's' if runs|length != 1 }}:\
                {%- for run in runs %}\n\
                    \x20 🔹 {{ run.game }} / {{ run.category }}: {{ run.time }}\
                    {{- ' (' ~ run.date ~ ')' if run.date }} 🎥 {{ run.video }}\
                {%- endfor %}"
            }
            MessageTemplate::Failure => "❌ {{ message }}",
        }
    }
}
