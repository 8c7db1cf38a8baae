// Ports the moderation core talks through.
//
// - WarnStore: the durable warn ledger
// - ModerationEffects: delete / DM / timeout / kick / post primitives
//
// Implementations live in infra/ (storage) and discord/ (effects).

use super::moderation_models::{MessageRef, Moderator, Notice, WarnEntry};
use crate::core::guild_config::StoreError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Failure of a platform side effect. Never propagated past the Sanction Engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The user cannot be messaged directly (closed DMs, blocked bot).
    #[error("User unreachable: {0}")]
    Unreachable(String),

    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("Platform error: {0}")]
    Other(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Durable per-(guild, user) warn ledger.
///
/// Implementations must serialize mutations for a given key so that the
/// count returned by `add_warn` reflects exactly one append.
#[async_trait]
pub trait WarnStore: Send + Sync {
    /// Append a warning. Returns the new total for this user in this guild.
    async fn add_warn(&self, guild_id: u64, user_id: u64, reason: &str)
        -> Result<u32, StoreError>;

    /// Ledger entries in append order.
    async fn get_warns(&self, guild_id: u64, user_id: u64) -> Result<Vec<WarnEntry>, StoreError>;

    /// Remove every entry. Returns `false` when there was nothing to clear.
    async fn clear_warns(&self, guild_id: u64, user_id: u64) -> Result<bool, StoreError>;
}

// ============================================================================
// EFFECTS TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait ModerationEffects: Send + Sync {
    /// Who gets recorded as moderator for automated actions.
    fn moderator(&self) -> Moderator;

    async fn delete_message(&self, message: MessageRef) -> Result<(), EffectError>;

    async fn send_direct(&self, user_id: u64, notice: &Notice) -> Result<(), EffectError>;

    async fn timeout_user(
        &self,
        guild_id: u64,
        user_id: u64,
        duration: Duration,
        reason: &str,
    ) -> Result<(), EffectError>;

    async fn remove_user(&self, guild_id: u64, user_id: u64, reason: &str)
        -> Result<(), EffectError>;

    /// Post to a channel. With a `ttl` the message removes itself afterwards.
    async fn post_to_channel(
        &self,
        channel_id: u64,
        notice: &Notice,
        ttl: Option<Duration>,
    ) -> Result<(), EffectError>;
}
