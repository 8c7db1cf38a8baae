// Content Classifier - one verdict per message, fixed precedence.
//
// Order (first match wins, later checks are skipped):
// 1. character repetition
// 2. bad word
// 3. invite / link (only with link protection)
// 4. message-rate flood (only with spam protection)

use super::flood_detector::{is_repetition_flood, SpamWindows};
use super::moderation_models::{InboundMessage, Violation};
use super::rule_registry::RuleRegistry;
use crate::core::guild_config::GuildModerationConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(https?://\S+|www\.\S+)").expect("Invalid URL regex"));

static INVITE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(discord(?:app)?\.com/invite/|discord\.gg/)[a-z0-9]+")
        .expect("Invalid invite regex")
});

/// Link rule on its own.
///
/// Invites are always advertising, whitelist or not. Any other link is
/// allowed only if some whitelist entry appears in the raw message.
pub fn detect_link(content: &str, whitelist: &[String]) -> Option<Violation> {
    if INVITE_PATTERN.is_match(content) {
        return Some(Violation::AdvertisingInvite);
    }

    if URL_PATTERN.is_match(content) {
        let allowed = whitelist
            .iter()
            .filter(|entry| !entry.is_empty())
            .any(|entry| content.contains(entry.as_str()));
        if !allowed {
            return Some(Violation::AdvertisingLink);
        }
    }

    None
}

pub struct ContentClassifier {
    registry: RuleRegistry,
    windows: Arc<SpamWindows>,
}

impl ContentClassifier {
    pub fn new(registry: RuleRegistry, windows: Arc<SpamWindows>) -> Self {
        Self { registry, windows }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Classify a message that already passed the Policy Gate.
    ///
    /// Only the rate-flood step touches state, and only if every earlier
    /// check passed.
    pub fn classify(
        &self,
        message: &InboundMessage,
        config: &GuildModerationConfig,
        now: Instant,
    ) -> Option<Violation> {
        let content = message.content.as_str();

        if is_repetition_flood(content) {
            return Some(Violation::CharacterRepetition);
        }

        if self.registry.is_bad_word(content, config) {
            return Some(Violation::BadWord);
        }

        if config.link_protection {
            if let Some(violation) = detect_link(content, &config.whitelist_links) {
                return Some(violation);
            }
        }

        if config.spam_protection {
            if let Some(guild_id) = message.guild_id {
                if self.windows.record(guild_id, message.author_id, now) {
                    return Some(Violation::Flood);
                }
            }
        }

        None
    }
}
