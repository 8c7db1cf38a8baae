// Discord layer - commands, event handlers and the effects adapter.

#[path = "moderation/mod.rs"]
pub mod moderation;

use crate::core::moderation::ModerationService;
use std::sync::Arc;

/// Shared state handed to every command and event handler.
pub struct Data {
    pub moderation: Arc<ModerationService>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
