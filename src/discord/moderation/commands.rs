// Moderation slash commands - configuration and warn ledger access.

use super::effects::SerenityEffects;
use crate::core::guild_config::ModerationField;
use crate::core::moderation::{LedgerState, ModerationLogEntry, Moderator};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "✅ Enabled"
    } else {
        "❌ Disabled"
    }
}

/// Moderation and security settings.
#[poise::command(
    slash_command,
    rename = "mod",
    subcommands("status", "setup", "badword", "spam", "links", "scan_admins"),
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn moderation(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - subcommands do the work
    Ok(())
}

/// Show the current moderation configuration.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let service = &ctx.data().moderation;
    let config = service.get_config(guild_id).await?;
    let global = service.global_words();

    let mut embed = serenity::CreateEmbed::default()
        .title("🛡️ Moderation Status")
        .color(if config.enabled {
            serenity::Color::DARK_GREEN
        } else {
            serenity::Color::RED
        })
        .field("Status", on_off(config.enabled), true)
        .field("Global Word List", format!("{} words", global.len()), true)
        .field(
            "Custom Word List",
            format!("{} words", config.bad_words.len()),
            true,
        )
        .field("Spam Protection", on_off(config.spam_protection), true)
        .field("Link Protection", on_off(config.link_protection), true)
        .field(
            "Log Channel",
            config
                .log_channel
                .map(|id| format!("<#{}>", id))
                .unwrap_or_else(|| "Not set".to_string()),
            true,
        )
        .field(
            "Whitelisted Links",
            if config.whitelist_links.is_empty() {
                "None".to_string()
            } else {
                config.whitelist_links.join(", ")
            },
            false,
        );

    if !global.is_empty() {
        embed = embed.field(
            "Sample Banned Words",
            format!("||{}||...", global.sample(5).join(", ")),
            false,
        );
    }

    let footer = if config.scan_admins {
        "Administrators are scanned too"
    } else {
        "Administrators are exempt from moderation"
    };
    embed = embed
        .footer(serenity::CreateEmbedFooter::new(footer))
        .timestamp(serenity::Timestamp::now());

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Turn moderation on or off and choose the log channel.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Enable the moderation module"] enabled: bool,
    #[description = "Channel for moderation logs"] channel: serenity::Channel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let channel_id = channel.id().get();
    let service = &ctx.data().moderation;

    service
        .set_field(guild_id, ModerationField::Enabled(enabled))
        .await?;
    service
        .set_field(guild_id, ModerationField::LogChannel(Some(channel_id)))
        .await?;

    tracing::info!(guild_id, enabled, channel_id, "Moderation setup changed");
    ctx.say(format!(
        "Moderation is now **{}**.\nLog channel: <#{}>",
        on_off(enabled),
        channel_id
    ))
    .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum BadWordAction {
    #[name = "Add"]
    Add,
    #[name = "Remove"]
    Remove,
    #[name = "List"]
    List,
}

/// Add, remove or list this server's banned words.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn badword(
    ctx: Context<'_>,
    #[description = "What to do"] action: BadWordAction,
    #[description = "The word (not needed for list)"] word: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let service = &ctx.data().moderation;

    if let BadWordAction::List = action {
        let words = service.get_config(guild_id).await?.bad_words;
        if words.is_empty() {
            ctx.say("No custom banned words yet.").await?;
        } else {
            let embed = serenity::CreateEmbed::default()
                .title("🚫 Banned Words")
                .description(format!("||{}||", words.join(", ")))
                .color(serenity::Color::RED);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
        }
        return Ok(());
    }

    let Some(word) = word.filter(|w| !w.trim().is_empty()) else {
        ctx.say("❌ Please give a word.").await?;
        return Ok(());
    };
    let word = word.trim().to_lowercase();

    let reply = if let BadWordAction::Add = action {
        if service.add_bad_word(guild_id, &word).await? {
            format!("✅ Banned word added: ||{}||", word)
        } else {
            "That word is already on the list.".to_string()
        }
    } else if service.remove_bad_word(guild_id, &word).await? {
        format!("✅ Banned word removed: ||{}||", word)
    } else {
        "❌ That word is not on the list.".to_string()
    };

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

/// Toggle message-rate flood protection.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn spam(
    ctx: Context<'_>,
    #[description = "Enable spam protection"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    ctx.data()
        .moderation
        .set_field(guild_id, ModerationField::SpamProtection(enabled))
        .await?;

    ctx.say(format!("Spam protection: **{}**", on_off(enabled)))
        .await?;
    Ok(())
}

/// Toggle link protection and set the allowed links.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn links(
    ctx: Context<'_>,
    #[description = "Enable link protection"] enabled: bool,
    #[description = "Comma separated allowed domains (e.g. youtube.com,github.com)"]
    whitelist: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let service = &ctx.data().moderation;

    service
        .set_field(guild_id, ModerationField::LinkProtection(enabled))
        .await?;

    let mut reply = format!("Link protection: **{}**", on_off(enabled));

    if let Some(raw) = whitelist {
        let allowed: Vec<String> = raw.split(',').map(|d| d.trim().to_string()).collect();
        service
            .set_field(guild_id, ModerationField::WhitelistLinks(allowed))
            .await?;
        let stored = service.get_config(guild_id).await?.whitelist_links;
        reply.push_str(&format!("\nWhitelist updated: {}", stored.join(", ")));
    }

    ctx.say(reply).await?;
    Ok(())
}

/// Choose whether administrators are moderated too.
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn scan_admins(
    ctx: Context<'_>,
    #[description = "Scan messages from administrators"] enabled: bool,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();

    ctx.data()
        .moderation
        .set_field(guild_id, ModerationField::ScanAdmins(enabled))
        .await?;

    ctx.say(format!("Administrator scanning: **{}**", on_off(enabled)))
        .await?;
    Ok(())
}

/// Show a user's warning record.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_MESSAGES")]
pub async fn warnings(
    ctx: Context<'_>,
    #[description = "User to look up"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let warns = ctx.data().moderation.warnings(guild_id, user.id.get()).await?;

    let history = if warns.is_empty() {
        "Clean record.".to_string()
    } else {
        warns
            .iter()
            .enumerate()
            .map(|(i, w)| {
                format!(
                    "**{}.** `{}` <t:{}:R>",
                    i + 1,
                    w.reason,
                    w.timestamp.timestamp()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = serenity::CreateEmbed::default()
        .title(format!("📋 Record of {}", user.name))
        .color(serenity::Color::ORANGE)
        .thumbnail(user.face())
        .field("Warnings", warns.len().to_string(), true)
        .field(
            "State",
            LedgerState::from_count(warns.len() as u32).to_string(),
            true,
        )
        .field("History", history, false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Wipe a user's warning record. Server owner or bot owner only.
#[poise::command(slash_command, guild_only)]
pub async fn clearwarns(
    ctx: Context<'_>,
    #[description = "User whose record is cleared"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let author_id = ctx.author().id;

    let is_bot_owner = ctx.framework().options().owners.contains(&author_id);
    let is_guild_owner = ctx
        .partial_guild()
        .await
        .map(|g| g.owner_id == author_id)
        .unwrap_or(false);

    if !(is_guild_owner || is_bot_owner) {
        ctx.send(
            poise::CreateReply::default()
                .content("❌ Only the **server owner** can use this command.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let service = &ctx.data().moderation;
    if !service.clear_warnings(guild_id, user.id.get()).await? {
        ctx.say(format!("ℹ️ **{}** already has a clean record.", user.name))
            .await?;
        return Ok(());
    }

    let effects = SerenityEffects::for_command(ctx);
    service
        .log_manual_action(
            guild_id,
            &effects,
            ModerationLogEntry {
                user_id: user.id.get(),
                user_name: user.name.clone(),
                user_avatar: user.avatar_url(),
                moderator: Moderator {
                    id: author_id.get(),
                    name: ctx.author().name.clone(),
                },
                action: "Record cleared".to_string(),
                reason: "History reset".to_string(),
            },
        )
        .await?;

    ctx.say(format!("✨ The record of **{}** has been cleared.", user.name))
        .await?;
    Ok(())
}
