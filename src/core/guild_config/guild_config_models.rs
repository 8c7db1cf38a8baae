// Guild configuration models.
//
// Every section is a plain struct with `#[serde(default)]`, so a stored
// document that predates a field (or misses a whole section) deserializes
// with the defaults filled in. Writing the document back persists the
// reconciled shape.

use serde::{Deserialize, Serialize};

/// Full configuration document for one guild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfig {
    pub moderation: GuildModerationConfig,
    pub welcome: WelcomeConfig,
    pub greeting: GreetingConfig,
    pub social: SocialConfig,
    pub auto_role: AutoRoleConfig,
    pub feature_channel: FeatureChannelConfig,
}

/// Settings read by the automated moderation pipeline on every message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildModerationConfig {
    pub enabled: bool,
    /// When false, administrators and manage-guild holders are never scanned.
    pub scan_admins: bool,
    /// Guild-specific keywords, stored lower-cased.
    pub bad_words: Vec<String>,
    pub link_protection: bool,
    /// Substrings that exempt a non-invite link from the advertising rule.
    pub whitelist_links: Vec<String>,
    pub spam_protection: bool,
    pub log_channel: Option<u64>,
}

/// A single moderation setting, as written by commands or the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum ModerationField {
    Enabled(bool),
    ScanAdmins(bool),
    BadWords(Vec<String>),
    AddBadWord(String),
    RemoveBadWord(String),
    LinkProtection(bool),
    WhitelistLinks(Vec<String>),
    SpamProtection(bool),
    LogChannel(Option<u64>),
}

impl GuildModerationConfig {
    /// Apply one field update in place. Returns false when nothing changed.
    pub fn apply(&mut self, field: ModerationField) -> bool {
        let before = self.clone();
        match field {
            ModerationField::Enabled(v) => self.enabled = v,
            ModerationField::ScanAdmins(v) => self.scan_admins = v,
            ModerationField::BadWords(words) => {
                self.bad_words = normalize_list(words, true);
            }
            ModerationField::AddBadWord(word) => {
                let word = word.trim().to_lowercase();
                if !word.is_empty() && !self.bad_words.contains(&word) {
                    self.bad_words.push(word);
                }
            }
            ModerationField::RemoveBadWord(word) => {
                let word = word.trim().to_lowercase();
                self.bad_words.retain(|w| *w != word);
            }
            ModerationField::LinkProtection(v) => self.link_protection = v,
            ModerationField::WhitelistLinks(links) => {
                self.whitelist_links = normalize_list(links, false);
            }
            ModerationField::SpamProtection(v) => self.spam_protection = v,
            ModerationField::LogChannel(v) => self.log_channel = v,
        }
        *self != before
    }
}

fn normalize_list(items: Vec<String>, lowercase: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let item = if lowercase {
            item.to_lowercase()
        } else {
            item.to_string()
        };
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelcomeConfig {
    pub enabled: bool,
    pub channel_id: Option<u64>,
    pub rules_channel_id: Option<u64>,
    pub message: String,
    pub leave_enabled: bool,
    pub leave_message: String,
    pub member_target: u32,
}

impl Default for WelcomeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_id: None,
            rules_channel_id: None,
            message: "Welcome {user}! We are {count} members now. Our goal is {target}! ✨"
                .to_string(),
            leave_enabled: false,
            leave_message: "Goodbye {user}! {count} of us remain. 😢".to_string(),
            member_target: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreetingConfig {
    pub enabled: bool,
    pub channel_id: Option<u64>,
    pub morning_msg: String,
    pub evening_msg: String,
    pub morning_hour: u8,
    pub morning_minute: u8,
    pub evening_hour: u8,
    pub evening_minute: u8,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_id: None,
            morning_msg: "Good morning! ☀️".to_string(),
            evening_msg: "Good evening! 🌙".to_string(),
            morning_hour: 10,
            morning_minute: 0,
            evening_hour: 22,
            evening_minute: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialConfig {
    pub youtube: Vec<String>,
    pub tiktok: Vec<String>,
    pub kick: Vec<String>,
    pub instagram: Vec<String>,
    pub notification_channel: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoRoleConfig {
    pub enabled: bool,
    pub role_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureChannelConfig {
    pub enabled: bool,
    pub channel_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_fills_defaults() {
        let raw = r#"{ "moderation": { "enabled": true, "bad_words": ["foo"] } }"#;
        let config: GuildConfig = serde_json::from_str(raw).unwrap();

        assert!(config.moderation.enabled);
        assert_eq!(config.moderation.bad_words, vec!["foo".to_string()]);
        assert!(!config.moderation.spam_protection);
        assert!(!config.moderation.scan_admins);
        assert_eq!(config.moderation.log_channel, None);
        assert_eq!(config.greeting.morning_hour, 10);
        assert_eq!(config.greeting.evening_hour, 22);
        assert_eq!(config.welcome.member_target, 100);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config: GuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GuildConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let raw = r#"{ "moderation": { "legacy_flag": 3 }, "music": {} }"#;
        let config: GuildConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.moderation, GuildModerationConfig::default());
    }

    #[test]
    fn test_bad_words_are_lowercased_and_deduplicated() {
        let mut config = GuildModerationConfig::default();
        config.apply(ModerationField::BadWords(vec![
            "Spam".to_string(),
            "spam".to_string(),
            "  ".to_string(),
            " Scam ".to_string(),
        ]));

        assert_eq!(config.bad_words, vec!["spam".to_string(), "scam".to_string()]);
    }

    #[test]
    fn test_whitelist_keeps_case_but_trims() {
        let mut config = GuildModerationConfig::default();
        config.apply(ModerationField::WhitelistLinks(vec![
            " YouTube.com".to_string(),
            String::new(),
        ]));

        assert_eq!(config.whitelist_links, vec!["YouTube.com".to_string()]);
    }

    #[test]
    fn test_single_word_edits_report_changes() {
        let mut config = GuildModerationConfig::default();

        assert!(config.apply(ModerationField::AddBadWord(" Scam ".to_string())));
        assert!(!config.apply(ModerationField::AddBadWord("scam".to_string())));
        assert!(!config.apply(ModerationField::AddBadWord("   ".to_string())));
        assert!(config.apply(ModerationField::AddBadWord("spam".to_string())));
        assert_eq!(config.bad_words, vec!["scam".to_string(), "spam".to_string()]);

        assert!(config.apply(ModerationField::RemoveBadWord("SCAM".to_string())));
        assert!(!config.apply(ModerationField::RemoveBadWord("scam".to_string())));
        assert_eq!(config.bad_words, vec!["spam".to_string()]);
    }
}
