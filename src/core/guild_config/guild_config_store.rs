use super::guild_config_models::{GuildConfig, GuildModerationConfig, ModerationField};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(String),
}

/// Per-guild configuration storage.
///
/// Reads never fail because a guild is unknown: absent guilds, sections and
/// keys all materialize as their defaults.
#[async_trait]
pub trait GuildConfigStore: Send + Sync {
    async fn get_guild_config(&self, guild_id: u64) -> Result<GuildConfig, StoreError>;

    async fn get_moderation_config(
        &self,
        guild_id: u64,
    ) -> Result<GuildModerationConfig, StoreError> {
        Ok(self.get_guild_config(guild_id).await?.moderation)
    }

    /// Apply one field under the store's write lock. Returns whether the
    /// stored value changed.
    async fn set_moderation_field(
        &self,
        guild_id: u64,
        field: ModerationField,
    ) -> Result<bool, StoreError>;
}
