// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "guild_config/json_store.rs"]
pub mod guild_config;

#[path = "moderation/mod.rs"]
pub mod moderation;
