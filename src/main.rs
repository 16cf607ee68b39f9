use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use serenity::{ActivityData, FullEvent, GatewayIntents};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use dotenvy::dotenv;

mod broadcast;
mod chooser;
mod command;
mod config;
mod corpus;
mod greet;
mod nonsense;
mod random;
mod reply;
mod theme;

use chooser::ChooserRegistry;
use command::*;
use config::Config;
use corpus::Corpus;
use theme::ThemeTable;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Everything the handlers need, built once at startup.
pub struct Data {
    pub config: Config,
    pub themes: ThemeTable,
    pub corpus: Corpus,
    pub choosers: ChooserRegistry,
}

impl Data {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let themes = config.theme_table()?;
        if themes.is_empty() {
            warn!("No theme rules configured, every reply will be generated");
        } else {
            info!("Loaded {} theme rules", themes.len());
        }

        let corpus = Corpus::load(&config.corpus_dir)
            .with_context(|| format!("Failed to load corpus from {:?}", config.corpus_dir))?;

        let choosers = config.chooser_registry()?;
        info!("Configured {} role choosers", choosers.len());

        Ok(Self {
            config,
            themes,
            corpus,
            choosers,
        })
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => panic!("Failed to start bot: {:?}", error),
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e)
            }
        }
    }
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
            info!("Connected to {} guilds", data_about_bot.guilds.len());

            if let Some(activity) = &data.config.activity {
                ctx.set_activity(Some(ActivityData::playing(activity)));
            }
            if !data.choosers.is_empty() {
                data.choosers.enable_all(ctx).await;
            }
        }
        FullEvent::Message { new_message } => {
            reply::handle_message(ctx, data, new_message).await;
        }
        FullEvent::ReactionAdd { add_reaction } => {
            chooser::handler::handle_reaction_add(ctx, &data.choosers, add_reaction).await;
        }
        FullEvent::ReactionRemove { removed_reaction } => {
            chooser::handler::handle_reaction_remove(ctx, &data.choosers, removed_reaction).await;
        }
        FullEvent::ReactionRemoveAll {
            channel_id,
            removed_from_message_id,
        } => {
            chooser::handler::handle_reaction_remove_all(
                ctx,
                &data.choosers,
                *channel_id,
                *removed_from_message_id,
            )
            .await;
        }
        FullEvent::GuildMemberAddition { new_member } => {
            if let Some(welcome) = &data.config.welcome {
                greet::handle_member_addition(ctx, welcome, new_member).await;
            }
        }
        FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            if let Some(farewell) = &data.config.farewell {
                greet::handle_member_removal(ctx, farewell, *guild_id, user).await;
            }
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let token = config.discord_token.clone();
    let guild_id = config.guild_id;
    let command_prefix = config.command_prefix.clone();
    let data = Data::new(config)?;

    let options = poise::FrameworkOptions {
        commands: vec![nonsense(), theme()],
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(command_prefix),
            edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
                Duration::from_secs(3600),
            ))),
            ..Default::default()
        },
        on_error: |error| Box::pin(on_error(error)),
        pre_command: |ctx| {
            Box::pin(async move {
                info!("Executing command {}...", ctx.command().qualified_name);
            })
        },
        event_handler: |ctx, event, framework, data| {
            Box::pin(event_handler(ctx, event, framework, data))
        },
        ..Default::default()
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGES;

    let framework = poise::Framework::builder()
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                if let Some(guild_id) = guild_id {
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id).await?;
                    info!("Registered commands for guild {}", guild_id);
                } else {
                    warn!("GUILD_ID not set, commands registered globally only");
                }

                Ok(data)
            })
        })
        .options(options)
        .build();

    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .context("Failed to create Discord client")?;

    client.start().await?;
    Ok(())
}
