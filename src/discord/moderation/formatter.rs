use crate::core::moderation::{ModerationLogEntry, Notice};
use poise::serenity_prelude::{self as serenity, CreateEmbed, CreateEmbedFooter, CreateMessage};

const FOOTER: &str = "Guardian Security";

pub fn format_notice(notice: &Notice) -> CreateEmbed {
    match notice {
        Notice::Warning {
            guild_name,
            reason,
            warn_count,
        } => CreateEmbed::default()
            .title("⚠️ Warning")
            .description(format!("You received a warning in **{}**.", guild_name))
            .color(serenity::Color::ORANGE)
            .field("Reason", reason, false)
            .field("Total Warnings", warn_count.to_string(), true)
            .field("Next Step", next_step(*warn_count), true)
            .footer(CreateEmbedFooter::new(FOOTER))
            .timestamp(serenity::Timestamp::now()),

        Notice::ModLog(entry) => format_log_entry(entry),

        Notice::ActionTaken {
            user_id,
            action,
            reason,
        } => CreateEmbed::default()
            .title("🛡️ Moderation")
            .description(format!("<@{}> - {}", user_id, action))
            .color(serenity::Color::RED)
            .field("Reason", reason, false)
            .footer(CreateEmbedFooter::new(FOOTER)),
    }
}

fn format_log_entry(entry: &ModerationLogEntry) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(format!("🛡️ Moderation: {}", entry.action))
        .color(serenity::Color::RED)
        .field(
            "User",
            format!("{} ({})", entry.user_name, entry.user_id),
            true,
        )
        .field(
            "Moderator",
            format!("{} ({})", entry.moderator.name, entry.moderator.id),
            true,
        )
        .field("Reason", &entry.reason, false)
        .footer(CreateEmbedFooter::new(FOOTER))
        .timestamp(serenity::Timestamp::now());

    if let Some(url) = &entry.user_avatar {
        embed = embed.thumbnail(url);
    }
    embed
}

/// Full outbound message. The in-channel notice also mentions the user so
/// they get pinged.
pub fn notice_message(notice: &Notice) -> CreateMessage {
    let message = CreateMessage::new().embed(format_notice(notice));
    match notice {
        Notice::ActionTaken { user_id, .. } => message.content(format!("<@{}>", user_id)),
        _ => message,
    }
}

/// Posted in a channel right after it was recreated.
pub fn nuke_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("☢️ Channel Nuked")
        .description("This channel has been wiped clean.")
        .color(serenity::Color::RED)
        .footer(CreateEmbedFooter::new(FOOTER))
        .timestamp(serenity::Timestamp::now())
}

fn next_step(warn_count: u32) -> &'static str {
    match warn_count {
        0 | 1 => "15 minute timeout",
        _ => "Removal from the server",
    }
}
