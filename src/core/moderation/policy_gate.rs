// Policy Gate - decides whether a message is scanned at all.
//
// Runs strictly before classification. No side effects.

use super::moderation_models::InboundMessage;
use crate::core::guild_config::GuildModerationConfig;

/// Why a message was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exemption {
    BotAuthor,
    Webhook,
    DirectMessage,
    ModerationDisabled,
    GuildOwner,
    BotOwner,
    Administrator,
}

/// Returns the first exemption that applies, or `None` if the message must be scanned.
pub fn exemption(message: &InboundMessage, config: &GuildModerationConfig) -> Option<Exemption> {
    if message.author_is_bot {
        return Some(Exemption::BotAuthor);
    }
    if message.is_webhook {
        return Some(Exemption::Webhook);
    }
    if message.guild_id.is_none() {
        return Some(Exemption::DirectMessage);
    }
    if !config.enabled {
        return Some(Exemption::ModerationDisabled);
    }
    if message.author_is_guild_owner {
        return Some(Exemption::GuildOwner);
    }
    if message.author_is_bot_owner {
        return Some(Exemption::BotOwner);
    }
    if !config.scan_admins && message.author_is_admin {
        return Some(Exemption::Administrator);
    }
    None
}

pub fn should_evaluate(message: &InboundMessage, config: &GuildModerationConfig) -> bool {
    exemption(message, config).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_message() -> InboundMessage {
        InboundMessage {
            guild_id: Some(1),
            author_id: 10,
            content: "hello".to_string(),
            ..Default::default()
        }
    }

    fn enabled() -> GuildModerationConfig {
        GuildModerationConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_regular_member_is_scanned() {
        assert!(should_evaluate(&member_message(), &enabled()));
    }

    #[test]
    fn test_unconditional_exemptions() {
        let config = enabled();

        let mut msg = member_message();
        msg.author_is_bot = true;
        assert_eq!(exemption(&msg, &config), Some(Exemption::BotAuthor));

        let mut msg = member_message();
        msg.is_webhook = true;
        assert_eq!(exemption(&msg, &config), Some(Exemption::Webhook));

        let mut msg = member_message();
        msg.guild_id = None;
        assert_eq!(exemption(&msg, &config), Some(Exemption::DirectMessage));

        let mut msg = member_message();
        msg.author_is_guild_owner = true;
        assert_eq!(exemption(&msg, &config), Some(Exemption::GuildOwner));

        let mut msg = member_message();
        msg.author_is_bot_owner = true;
        assert_eq!(exemption(&msg, &config), Some(Exemption::BotOwner));
    }

    #[test]
    fn test_disabled_guild_is_never_scanned() {
        let config = GuildModerationConfig::default();
        assert_eq!(
            exemption(&member_message(), &config),
            Some(Exemption::ModerationDisabled)
        );
    }

    #[test]
    fn test_admins_depend_on_scan_admins() {
        let mut msg = member_message();
        msg.author_is_admin = true;

        assert!(!should_evaluate(&msg, &enabled()));

        let config = GuildModerationConfig {
            enabled: true,
            scan_admins: true,
            ..Default::default()
        };
        assert!(should_evaluate(&msg, &config));
    }

    #[test]
    fn test_owner_exempt_even_when_scanning_admins() {
        let mut msg = member_message();
        msg.author_is_guild_owner = true;
        let config = GuildModerationConfig {
            enabled: true,
            scan_admins: true,
            ..Default::default()
        };
        assert!(!should_evaluate(&msg, &config));
    }
}
