//! Reaction events on chooser messages.

use poise::serenity_prelude::{self as serenity, ChannelId, Member, MessageId, Reaction};
use tracing::{debug, error, info, warn};

use super::{role_action, Choice, ChooserRegistry, RoleAction};
use crate::broadcast::{DirectMessenger, DiscordMessenger};
use crate::Error;

pub async fn handle_reaction_add(ctx: &serenity::Context, registry: &ChooserRegistry, reaction: &Reaction) {
    if let Err(e) = reaction_add(ctx, registry, reaction).await {
        error!(
            "Failed to handle reaction {} on message {}: {}",
            reaction.emoji, reaction.message_id, e
        );
    }
}

pub async fn handle_reaction_remove(
    ctx: &serenity::Context,
    registry: &ChooserRegistry,
    reaction: &Reaction,
) {
    if let Err(e) = reaction_remove(ctx, registry, reaction).await {
        error!(
            "Failed to handle reaction removal {} on message {}: {}",
            reaction.emoji, reaction.message_id, e
        );
    }
}

/// Someone cleared every reaction on a chooser message: put the choices back.
pub async fn handle_reaction_remove_all(
    ctx: &serenity::Context,
    registry: &ChooserRegistry,
    channel_id: ChannelId,
    message_id: MessageId,
) {
    let Some(chooser) = registry.by_message(message_id) else {
        return;
    };
    info!("Reactions cleared on chooser in {}, restoring", channel_id);
    if let Err(e) = chooser.add_reactions(ctx, message_id).await {
        error!("Failed to restore chooser reactions: {}", e);
    }
}

async fn reaction_add(ctx: &serenity::Context, registry: &ChooserRegistry, reaction: &Reaction) -> Result<(), Error> {
    let Some(chooser) = registry.by_message(reaction.message_id) else {
        return Ok(());
    };
    let Some(user_id) = reaction.user_id else {
        return Ok(());
    };
    if user_id == ctx.cache.current_user().id {
        return Ok(());
    }

    let Some(choice) = chooser.find_choice(&reaction.emoji) else {
        debug!("Removing unrelated reaction {} from {}", reaction.emoji, user_id);
        reaction.delete(ctx).await?;
        return Ok(());
    };

    let member = match reaction_member(ctx, reaction).await {
        Some(member) => member,
        None => {
            reaction.delete(ctx).await?;
            return Ok(());
        }
    };

    let has_role = member.roles.contains(&choice.role_id);
    apply(ctx, &member, choice, role_action(true, has_role)).await
}

async fn reaction_remove(
    ctx: &serenity::Context,
    registry: &ChooserRegistry,
    reaction: &Reaction,
) -> Result<(), Error> {
    let Some(chooser) = registry.by_message(reaction.message_id) else {
        return Ok(());
    };
    let Some(user_id) = reaction.user_id else {
        return Ok(());
    };
    if user_id == ctx.cache.current_user().id {
        return Ok(());
    }
    let Some(choice) = chooser.find_choice(&reaction.emoji) else {
        return Ok(());
    };
    let Some(member) = reaction_member(ctx, reaction).await else {
        return Ok(());
    };

    let has_role = member.roles.contains(&choice.role_id);
    apply(ctx, &member, choice, role_action(false, has_role)).await
}

/// The reacting member, from the cache when present, else over HTTP. The
/// cached role list is kept current by `GUILD_MEMBERS` updates.
async fn reaction_member(ctx: &serenity::Context, reaction: &Reaction) -> Option<Member> {
    let guild_id = reaction.guild_id?;
    let user_id = reaction.user_id?;
    match guild_id.member(ctx, user_id).await {
        Ok(member) => Some(member),
        Err(e) => {
            warn!("Member {} not found in guild {}: {}", user_id, guild_id, e);
            None
        }
    }
}

async fn apply(ctx: &serenity::Context, member: &Member, choice: &Choice, action: RoleAction) -> Result<(), Error> {
    let text = match action {
        RoleAction::Add => {
            member.add_role(&ctx.http, choice.role_id).await?;
            info!("Gave role {} to {}", choice.role_id, member.user.name);
            &choice.add_message
        }
        RoleAction::Remove => {
            member.remove_role(&ctx.http, choice.role_id).await?;
            info!("Took role {} from {}", choice.role_id, member.user.name);
            &choice.remove_message
        }
        RoleAction::None => return Ok(()),
    };

    // The role change stands even if the member does not accept DMs.
    if let Err(e) = DiscordMessenger::new(ctx).send_direct(member.user.id, text).await {
        warn!("Failed to notify {} about role {}: {}", member.user.name, choice.role_id, e);
    }
    Ok(())
}
