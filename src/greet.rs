use poise::serenity_prelude::{self as serenity, GuildId, Member, User};
use tracing::{error, info, warn};

use crate::config::{FarewellConfig, WelcomeConfig};
use crate::corpus::fill_placeholders;

/// Gives a new member the welcome role and greets them in the welcome channel.
pub async fn handle_member_addition(ctx: &serenity::Context, welcome: &WelcomeConfig, member: &Member) {
    if member.user.bot {
        return;
    }

    if let Some(role_name) = &welcome.role_name {
        let role_id = ctx
            .cache
            .guild(member.guild_id)
            .and_then(|guild| guild.role_by_name(role_name).map(|role| role.id));

        match role_id {
            Some(role_id) => {
                if let Err(e) = member.add_role(&ctx.http, role_id).await {
                    error!("Failed to give role {} to {}: {}", role_name, member.user.name, e);
                }
            }
            None => warn!("Welcome role '{}' not found in guild {}", role_name, member.guild_id),
        }
    }

    let text = fill_placeholders(&welcome.message, &[("user", member.user.name.as_str())]);
    match welcome.channel_id.say(&ctx.http, text).await {
        Ok(_) => info!("Welcomed {} to guild {}", member.user.name, member.guild_id),
        Err(e) => error!("Failed to post welcome for {}: {}", member.user.name, e),
    }
}

/// Announces that a member left.
pub async fn handle_member_removal(
    ctx: &serenity::Context,
    farewell: &FarewellConfig,
    guild_id: GuildId,
    user: &User,
) {
    if user.bot {
        return;
    }

    let text = fill_placeholders(&farewell.message, &[("user", user.name.as_str())]);
    match farewell.channel_id.say(&ctx.http, text).await {
        Ok(_) => info!("{} left guild {}", user.name, guild_id),
        Err(e) => error!("Failed to post farewell for {}: {}", user.name, e),
    }
}
