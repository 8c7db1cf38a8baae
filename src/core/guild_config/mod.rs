// Guild configuration - typed sections with defaults for every module.

pub mod guild_config_models;
pub mod guild_config_store;

pub use guild_config_models::*;
pub use guild_config_store::{GuildConfigStore, StoreError};
