// Serenity implementation of the moderation effects port.
//
// Every HTTP failure is folded into an `EffectError` so the Sanction Engine
// can decide what to do with it. Nothing here retries.

use super::formatter::{notice_message, nuke_embed};
use crate::core::moderation::{EffectError, MessageRef, ModerationEffects, Moderator, Notice};
use crate::discord::Context;
use ::serenity::http::HttpError;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

pub struct SerenityEffects {
    http: Arc<serenity::Http>,
    moderator: Moderator,
}

impl SerenityEffects {
    pub fn new(http: Arc<serenity::Http>, moderator: Moderator) -> Self {
        Self { http, moderator }
    }

    /// Effects for a slash command, with the invoking user as moderator of record.
    pub fn for_command(ctx: Context<'_>) -> Self {
        let author = ctx.author();
        Self::new(
            Arc::clone(&ctx.serenity_context().http),
            Moderator {
                id: author.id.get(),
                name: author.name.clone(),
            },
        )
    }

    pub async fn ban_user(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), EffectError> {
        serenity::GuildId::new(guild_id)
            .ban_with_reason(&self.http, serenity::UserId::new(user_id), 0, reason)
            .await
            .map_err(map_error)
    }

    pub async fn unban_user(&self, guild_id: u64, user_id: u64) -> Result<(), EffectError> {
        serenity::GuildId::new(guild_id)
            .unban(&self.http, serenity::UserId::new(user_id))
            .await
            .map_err(map_error)
    }

    /// Delete up to `amount` of the latest messages in a channel.
    /// Returns how many were actually removed.
    ///
    /// Recent messages go through one bulk delete. Discord refuses bulk
    /// deletes for messages older than 14 days, so those are removed one by one.
    pub async fn purge(&self, channel_id: u64, amount: u8) -> Result<usize, EffectError> {
        let channel = serenity::ChannelId::new(channel_id);
        let messages = channel
            .messages(&self.http, serenity::GetMessages::new().limit(amount))
            .await
            .map_err(map_error)?;

        let (recent, old) = split_by_bulk_age(
            messages
                .iter()
                .map(|m| (m.id, m.timestamp.unix_timestamp())),
            chrono::Utc::now().timestamp(),
        );

        let mut deleted = 0;
        if recent.len() >= 2 {
            channel
                .delete_messages(&self.http, &recent)
                .await
                .map_err(map_error)?;
            deleted += recent.len();
        }

        let singles = if recent.len() == 1 { recent } else { Vec::new() };
        for id in singles.into_iter().chain(old) {
            match channel.delete_message(&self.http, id).await {
                Ok(()) => deleted += 1,
                Err(e) => match map_error(e) {
                    // Someone else got there first
                    EffectError::NotFound(_) => {}
                    other => return Err(other),
                },
            }
        }
        Ok(deleted)
    }

    /// Replace a channel with a fresh copy: same name, type, topic, category,
    /// position and permission overwrites, but no history. Returns the new
    /// channel's id.
    pub async fn recreate_channel(
        &self,
        channel_id: u64,
        reason: &str,
    ) -> Result<u64, EffectError> {
        let old = serenity::ChannelId::new(channel_id)
            .to_channel(&*self.http)
            .await
            .map_err(map_error)?
            .guild()
            .ok_or_else(|| EffectError::Other("not a server channel".to_string()))?;

        if !can_recreate(old.kind) {
            return Err(EffectError::Other(format!(
                "{:?} channels cannot be recreated",
                old.kind
            )));
        }

        let mut builder = serenity::CreateChannel::new(old.name.clone())
            .kind(old.kind)
            .position(old.position)
            .nsfw(old.nsfw)
            .permissions(old.permission_overwrites.clone())
            .audit_log_reason(reason);
        if let Some(topic) = &old.topic {
            builder = builder.topic(topic.clone());
        }
        if let Some(parent) = old.parent_id {
            builder = builder.category(parent);
        }

        let fresh = old
            .guild_id
            .create_channel(&*self.http, builder)
            .await
            .map_err(map_error)?;

        if let Err(e) = old.id.delete(&*self.http).await {
            // Do not leave two copies behind
            if let Err(cleanup) = fresh.id.delete(&*self.http).await {
                tracing::error!(
                    channel_id = fresh.id.get(),
                    "Failed to remove copy after aborted recreate: {}",
                    cleanup
                );
            }
            return Err(map_error(e));
        }

        if let Err(e) = fresh
            .id
            .send_message(&self.http, serenity::CreateMessage::new().embed(nuke_embed()))
            .await
        {
            tracing::warn!(channel_id = fresh.id.get(), "Nuke confirmation not sent: {}", e);
        }

        Ok(fresh.id.get())
    }
}

/// Channel kinds a guild channel builder can recreate. Threads and DMs can't.
fn can_recreate(kind: serenity::ChannelType) -> bool {
    matches!(
        kind,
        serenity::ChannelType::Text
            | serenity::ChannelType::News
            | serenity::ChannelType::Voice
            | serenity::ChannelType::Stage
            | serenity::ChannelType::Forum
    )
}

/// Oldest message age (seconds) still accepted by a bulk delete, with a
/// minute of slack for clock drift.
const BULK_DELETE_MAX_AGE: i64 = 14 * 24 * 60 * 60 - 60;

/// Split `(id, unix timestamp)` pairs into bulk-deletable and too-old ids.
fn split_by_bulk_age<T>(
    messages: impl IntoIterator<Item = (T, i64)>,
    now: i64,
) -> (Vec<T>, Vec<T>) {
    let mut recent = Vec::new();
    let mut old = Vec::new();
    for (id, sent_at) in messages {
        if now - sent_at < BULK_DELETE_MAX_AGE {
            recent.push(id);
        } else {
            old.push(id);
        }
    }
    (recent, old)
}

/// Fold a serenity error into the port's error type.
pub fn map_error(err: serenity::Error) -> EffectError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &err {
        return match response.status_code.as_u16() {
            403 => EffectError::PermissionDenied(response.error.message.clone()),
            404 => EffectError::NotFound(response.error.message.clone()),
            _ => EffectError::Other(err.to_string()),
        };
    }
    EffectError::Other(err.to_string())
}

#[async_trait]
impl ModerationEffects for SerenityEffects {
    fn moderator(&self) -> Moderator {
        self.moderator.clone()
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), EffectError> {
        serenity::ChannelId::new(message.channel_id)
            .delete_message(&self.http, serenity::MessageId::new(message.message_id))
            .await
            .map_err(map_error)
    }

    async fn send_direct(&self, user_id: u64, notice: &Notice) -> Result<(), EffectError> {
        serenity::UserId::new(user_id)
            .direct_message(&self.http, notice_message(notice))
            .await
            .map(|_| ())
            .map_err(|e| match map_error(e) {
                // Closed DMs and blocked bots both surface as 403
                EffectError::PermissionDenied(msg) | EffectError::NotFound(msg) => {
                    EffectError::Unreachable(msg)
                }
                other => other,
            })
    }

    async fn timeout_user(
        &self,
        guild_id: u64,
        user_id: u64,
        duration: Duration,
        reason: &str,
    ) -> Result<(), EffectError> {
        let until = serenity::Timestamp::from_unix_timestamp(
            chrono::Utc::now().timestamp() + duration.as_secs() as i64,
        )
        .map_err(|e| EffectError::Other(e.to_string()))?;

        serenity::GuildId::new(guild_id)
            .edit_member(
                &self.http,
                serenity::UserId::new(user_id),
                serenity::EditMember::new()
                    .disable_communication_until_datetime(until)
                    .audit_log_reason(reason),
            )
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn remove_user(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
    ) -> Result<(), EffectError> {
        serenity::GuildId::new(guild_id)
            .kick_with_reason(&self.http, serenity::UserId::new(user_id), reason)
            .await
            .map_err(map_error)
    }

    async fn post_to_channel(
        &self,
        channel_id: u64,
        notice: &Notice,
        ttl: Option<Duration>,
    ) -> Result<(), EffectError> {
        let channel = serenity::ChannelId::new(channel_id);
        let sent = channel
            .send_message(&self.http, notice_message(notice))
            .await
            .map_err(|e| match map_error(e) {
                EffectError::PermissionDenied(msg) | EffectError::NotFound(msg) => {
                    EffectError::ChannelUnavailable(msg)
                }
                other => other,
            })?;

        if let Some(ttl) = ttl {
            let http = Arc::clone(&self.http);
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                if let Err(e) = channel.delete_message(&http, sent.id).await {
                    tracing::debug!(channel_id = channel.get(), "Expired notice not deleted: {}", e);
                }
            });
        }

        Ok(())
    }
}
