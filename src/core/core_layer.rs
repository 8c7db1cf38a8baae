// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "guild_config/mod.rs"]
pub mod guild_config;

#[path = "moderation/mod.rs"]
pub mod moderation;
