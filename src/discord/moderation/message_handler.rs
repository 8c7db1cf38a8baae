// Discord-specific moderation handling - translates a gateway message into
// the core's `InboundMessage` and hands it to the pipeline.

use super::effects::SerenityEffects;
use crate::core::moderation::{InboundMessage, Moderator};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use std::collections::{HashMap, HashSet};

/// What the adapter needs from a guild to judge the author.
struct GuildFacts {
    name: String,
    owner_id: serenity::UserId,
    author_is_admin: bool,
}

/// True if the combined permissions grant ADMINISTRATOR or MANAGE_GUILD.
fn grants_admin(permissions: serenity::Permissions) -> bool {
    permissions.administrator() || permissions.manage_guild()
}

/// Permissions from @everyone plus every role the member holds.
fn role_permissions(
    guild_id: serenity::GuildId,
    roles: &HashMap<serenity::RoleId, serenity::Role>,
    member_roles: &[serenity::RoleId],
) -> serenity::Permissions {
    // The @everyone role shares the guild's id
    let everyone = serenity::RoleId::new(guild_id.get());
    std::iter::once(&everyone)
        .chain(member_roles.iter())
        .filter_map(|id| roles.get(id))
        .fold(serenity::Permissions::empty(), |acc, role| {
            acc | role.permissions
        })
}

async fn guild_facts(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    member_roles: &[serenity::RoleId],
) -> Option<GuildFacts> {
    // The cache guard is not Send, so it must be gone before any await
    let cached = ctx.cache.guild(guild_id).map(|guild| GuildFacts {
        name: guild.name.clone(),
        owner_id: guild.owner_id,
        author_is_admin: grants_admin(role_permissions(guild_id, &guild.roles, member_roles)),
    });
    if cached.is_some() {
        return cached;
    }

    match guild_id.to_partial_guild(&ctx.http).await {
        Ok(guild) => Some(GuildFacts {
            name: guild.name.clone(),
            owner_id: guild.owner_id,
            author_is_admin: grants_admin(role_permissions(guild_id, &guild.roles, member_roles)),
        }),
        Err(e) => {
            tracing::debug!(guild_id = guild_id.get(), "Guild lookup failed: {}", e);
            None
        }
    }
}

/// Run one gateway message through automated moderation.
pub async fn handle_message_for_moderation(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    bot_owners: &HashSet<serenity::UserId>,
    data: &Data,
) -> Result<(), Error> {
    // Cheap exits before touching the cache or HTTP
    if msg.author.bot || msg.webhook_id.is_some() {
        return Ok(());
    }
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };

    let member_roles: Vec<serenity::RoleId> = msg
        .member
        .as_ref()
        .map(|m| m.roles.clone())
        .unwrap_or_default();

    let Some(facts) = guild_facts(ctx, guild_id, &member_roles).await else {
        tracing::debug!(
            guild_id = guild_id.get(),
            "Guild unknown, skipping moderation for message {}",
            msg.id
        );
        return Ok(());
    };

    let inbound = InboundMessage {
        message_id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        guild_id: Some(guild_id.get()),
        guild_name: facts.name,
        author_id: msg.author.id.get(),
        author_name: msg.author.name.clone(),
        author_avatar: msg.author.avatar_url(),
        content: msg.content.clone(),
        author_is_bot: msg.author.bot,
        is_webhook: msg.webhook_id.is_some(),
        author_is_guild_owner: facts.owner_id == msg.author.id,
        author_is_bot_owner: bot_owners.contains(&msg.author.id),
        author_is_admin: facts.author_is_admin,
    };

    let moderator = {
        let me = ctx.cache.current_user();
        Moderator {
            id: me.id.get(),
            name: me.name.clone(),
        }
    };
    let effects = SerenityEffects::new(ctx.http.clone(), moderator);

    if let Some((violation, _sanction)) = data
        .moderation
        .handle_message(inbound, effects)
        .await?
    {
        tracing::info!(
            guild_id = guild_id.get(),
            user_id = msg.author.id.get(),
            reason = violation.reason(),
            "Message flagged"
        );
    }

    Ok(())
}
