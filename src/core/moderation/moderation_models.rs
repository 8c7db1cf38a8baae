// Moderation domain models - data structures for the automated pipeline.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts incoming messages into `InboundMessage`
// and renders `Notice` values back into embeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the pipeline needs to know about one incoming message.
///
/// Author flags are resolved by the platform adapter before the message
/// reaches the core, so the Policy Gate stays a pure predicate.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub message_id: u64,
    pub channel_id: u64,
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub guild_name: String,
    pub author_id: u64,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub author_is_bot: bool,
    pub is_webhook: bool,
    pub author_is_guild_owner: bool,
    pub author_is_bot_owner: bool,
    /// Holds ADMINISTRATOR or MANAGE_GUILD.
    pub author_is_admin: bool,
}

impl InboundMessage {
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            channel_id: self.channel_id,
            message_id: self.message_id,
        }
    }
}

/// Address of a message that can be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: u64,
    pub message_id: u64,
}

/// Which rule a message broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Violation {
    CharacterRepetition,
    BadWord,
    AdvertisingInvite,
    AdvertisingLink,
    Flood,
}

impl Violation {
    /// Stable reason code, stored in the warn ledger.
    pub fn reason(&self) -> &'static str {
        match self {
            Violation::CharacterRepetition => "character-repetition",
            Violation::BadWord => "bad-word",
            Violation::AdvertisingInvite => "advertising-invite",
            Violation::AdvertisingLink => "advertising-link",
            Violation::Flood => "flood",
        }
    }

    /// Human-readable explanation shown to users and moderators.
    pub fn description(&self) -> &'static str {
        match self {
            Violation::CharacterRepetition => "Excessive character repetition (spam)",
            Violation::BadWord => "Banned word / profanity",
            Violation::AdvertisingInvite => "Advertising (Discord invite)",
            Violation::AdvertisingLink => "Advertising / disallowed link",
            Violation::Flood => "Spam / message flood",
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// One durable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarnEntry {
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl WarnEntry {
    pub fn now(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Punishment level derived from the cumulative warn count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SanctionTier {
    Warn,
    Timeout,
    Removal,
}

impl SanctionTier {
    /// 1 → warn, 2 → timeout, 3 and beyond → removal. `None` for a clean record.
    pub fn for_count(warn_count: u32) -> Option<Self> {
        match warn_count {
            0 => None,
            1 => Some(SanctionTier::Warn),
            2 => Some(SanctionTier::Timeout),
            _ => Some(SanctionTier::Removal),
        }
    }
}

/// Ledger state of a (guild, user) pair. Only moves forward until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LedgerState {
    Clean,
    Warned,
    TimedOut,
    Removed,
}

impl LedgerState {
    pub fn from_count(warn_count: u32) -> Self {
        match SanctionTier::for_count(warn_count) {
            None => LedgerState::Clean,
            Some(SanctionTier::Warn) => LedgerState::Warned,
            Some(SanctionTier::Timeout) => LedgerState::TimedOut,
            Some(SanctionTier::Removal) => LedgerState::Removed,
        }
    }
}

impl std::fmt::Display for LedgerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerState::Clean => write!(f, "Clean"),
            LedgerState::Warned => write!(f, "Warned"),
            LedgerState::TimedOut => write!(f, "Timed out"),
            LedgerState::Removed => write!(f, "Removed"),
        }
    }
}

/// What was actually done, after the platform had its say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanctionAction {
    Warned,
    TimedOut,
    /// Timeout was due but the platform refused.
    TimeoutDenied,
    Removed,
    /// Removal was due but the platform refused.
    RemovalDenied,
}

impl SanctionAction {
    pub fn label(&self) -> &'static str {
        match self {
            SanctionAction::Warned => "Warning issued",
            SanctionAction::TimedOut => "15 minute timeout",
            SanctionAction::TimeoutDenied => "Timeout (insufficient permission)",
            SanctionAction::Removed => "Removed from server",
            SanctionAction::RemovalDenied => "Removal (insufficient permission)",
        }
    }
}

impl std::fmt::Display for SanctionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of one automated punishment.
#[derive(Debug, Clone, PartialEq)]
pub struct SanctionOutcome {
    pub violation: Violation,
    pub warn_count: u32,
    pub action: SanctionAction,
}

/// The account recorded as having taken an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Moderator {
    pub id: u64,
    pub name: String,
}

/// A moderation log line, posted to the guild's log channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationLogEntry {
    pub user_id: u64,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub moderator: Moderator,
    pub action: String,
    pub reason: String,
}

/// Outbound content. The platform adapter decides how it looks.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Direct message to the offender.
    Warning {
        guild_name: String,
        reason: String,
        warn_count: u32,
    },
    ModLog(ModerationLogEntry),
    /// Short-lived in-channel notice.
    ActionTaken {
        user_id: u64,
        action: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ladder() {
        assert_eq!(SanctionTier::for_count(0), None);
        assert_eq!(SanctionTier::for_count(1), Some(SanctionTier::Warn));
        assert_eq!(SanctionTier::for_count(2), Some(SanctionTier::Timeout));
        assert_eq!(SanctionTier::for_count(3), Some(SanctionTier::Removal));
        assert_eq!(SanctionTier::for_count(42), Some(SanctionTier::Removal));
    }

    #[test]
    fn test_ledger_state_is_monotonic_in_count() {
        let states: Vec<LedgerState> = (0..6).map(LedgerState::from_count).collect();
        assert!(states.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(states[0], LedgerState::Clean);
        assert_eq!(states[5], LedgerState::Removed);
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(Violation::CharacterRepetition.reason(), "character-repetition");
        assert_eq!(Violation::BadWord.to_string(), "bad-word");
        assert_eq!(Violation::AdvertisingInvite.reason(), "advertising-invite");
        assert_eq!(Violation::AdvertisingLink.reason(), "advertising-link");
        assert_eq!(Violation::Flood.reason(), "flood");
    }
}
