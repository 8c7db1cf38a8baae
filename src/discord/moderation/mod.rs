// Discord side of moderation - event adapter, effects and slash commands.

pub mod commands;
pub mod effects;
pub mod formatter;
pub mod manual;
pub mod message_handler;

pub use message_handler::handle_message_for_moderation;
