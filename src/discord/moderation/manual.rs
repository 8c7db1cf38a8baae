// Manual moderation commands. Each action goes through the same effects
// adapter as the automated pipeline and lands in the guild's mod log.

use super::effects::SerenityEffects;
use crate::core::moderation::{EffectError, ModerationEffects, ModerationLogEntry, Moderator};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

const NO_REASON: &str = "No reason given";

fn log_entry(
    ctx: Context<'_>,
    user: &serenity::User,
    action: &str,
    reason: &str,
) -> ModerationLogEntry {
    ModerationLogEntry {
        user_id: user.id.get(),
        user_name: user.name.clone(),
        user_avatar: user.avatar_url(),
        moderator: Moderator {
            id: ctx.author().id.get(),
            name: ctx.author().name.clone(),
        },
        action: action.to_string(),
        reason: reason.to_string(),
    }
}

/// Turn an effect failure into a reply the moderator can act on.
fn failure_reply(action: &str, err: &EffectError) -> String {
    match err {
        EffectError::PermissionDenied(_) => {
            format!("❌ I don't have permission to {} that user.", action)
        }
        EffectError::NotFound(_) => "❌ User not found.".to_string(),
        other => format!("❌ Could not {}: {}", action, other),
    }
}

/// Kick a member from the server.
#[poise::command(slash_command, guild_only, required_permissions = "KICK_MEMBERS")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
    let effects = SerenityEffects::for_command(ctx);

    if let Err(e) = effects.remove_user(guild_id, user.id.get(), &reason).await {
        tracing::warn!(guild_id, user_id = user.id.get(), "Kick failed: {}", e);
        ctx.say(failure_reply("kick", &e)).await?;
        return Ok(());
    }

    ctx.data()
        .moderation
        .log_manual_action(guild_id, &effects, log_entry(ctx, &user, "Kicked", &reason))
        .await?;

    ctx.say(format!("✅ **{}** was kicked.\nReason: {}", user.name, reason))
        .await?;
    Ok(())
}

/// Ban a user from the server.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let reason = reason.unwrap_or_else(|| NO_REASON.to_string());
    let effects = SerenityEffects::for_command(ctx);

    if let Err(e) = effects.ban_user(guild_id, user.id.get(), &reason).await {
        tracing::warn!(guild_id, user_id = user.id.get(), "Ban failed: {}", e);
        ctx.say(failure_reply("ban", &e)).await?;
        return Ok(());
    }

    ctx.data()
        .moderation
        .log_manual_action(guild_id, &effects, log_entry(ctx, &user, "Banned", &reason))
        .await?;

    ctx.say(format!("✅ **{}** was banned.\nReason: {}", user.name, reason))
        .await?;
    Ok(())
}

/// Lift a ban by user id.
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "ID of the banned user"] user_id: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    let Some(user_id) = user_id.trim().parse::<u64>().ok().filter(|id| *id != 0) else {
        ctx.say("❌ That is not a valid user id.").await?;
        return Ok(());
    };

    let user = match serenity::UserId::new(user_id)
        .to_user(ctx.serenity_context())
        .await
    {
        Ok(user) => user,
        Err(_) => {
            ctx.say("❌ User not found.").await?;
            return Ok(());
        }
    };

    let effects = SerenityEffects::for_command(ctx);
    if let Err(e) = effects.unban_user(guild_id, user_id).await {
        tracing::warn!(guild_id, user_id, "Unban failed: {}", e);
        ctx.say(failure_reply("unban", &e)).await?;
        return Ok(());
    }

    ctx.data()
        .moderation
        .log_manual_action(guild_id, &effects, log_entry(ctx, &user, "Unbanned", NO_REASON))
        .await?;

    ctx.say(format!("✅ **{}** was unbanned.", user.name)).await?;
    Ok(())
}

/// Delete the latest messages in this channel.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many messages (1-100)"]
    #[min = 1]
    #[max = 100]
    amount: u8,
) -> Result<(), Error> {
    if !(1..=100).contains(&amount) {
        ctx.say("❌ Pick between 1 and 100 messages.").await?;
        return Ok(());
    }

    ctx.defer_ephemeral().await?;
    let effects = SerenityEffects::for_command(ctx);

    match effects.purge(ctx.channel_id().get(), amount).await {
        Ok(deleted) => {
            tracing::info!(
                channel_id = ctx.channel_id().get(),
                deleted,
                "Channel purged"
            );
            ctx.say(format!("🗑️ Deleted **{}** messages.", deleted))
                .await?;
        }
        Err(e) => {
            tracing::warn!(channel_id = ctx.channel_id().get(), "Purge failed: {}", e);
            ctx.say(format!("❌ Could not purge messages: {}", e)).await?;
        }
    }
    Ok(())
}

/// Recreate this channel empty, keeping its settings.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn nuke(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let channel_id = ctx.channel_id().get();

    // The reply has to go out before the channel disappears
    ctx.defer_ephemeral().await?;
    ctx.say("☢️ Nuking this channel...").await?;

    let effects = SerenityEffects::for_command(ctx);
    let fresh_id = match effects
        .recreate_channel(channel_id, "Nuke command used")
        .await
    {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(guild_id, channel_id, "Nuke failed: {}", e);
            ctx.say(format!("❌ Could not nuke this channel: {}", e))
                .await?;
            return Ok(());
        }
    };
    tracing::info!(guild_id, channel_id, fresh_id, "Channel nuked");

    let author = ctx.author().clone();
    ctx.data()
        .moderation
        .log_manual_action(
            guild_id,
            &effects,
            log_entry(
                ctx,
                &author,
                "Channel nuked",
                &format!("<#{}> recreated", fresh_id),
            ),
        )
        .await?;
    Ok(())
}
