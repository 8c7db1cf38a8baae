// Sanction Engine - turns a violation into a ledger entry and platform effects.
//
// Ladder, keyed on the durable warn count for (guild, user):
//   1st -> warning, 2nd -> 15 minute timeout, 3rd and later -> kick.
//
// Every platform effect is best-effort: failures are logged and, for
// timeout/kick, folded into the recorded action. Only a ledger failure
// stops a sanction.

use super::moderation_models::{
    InboundMessage, ModerationLogEntry, Notice, SanctionAction, SanctionOutcome, SanctionTier,
    Violation, WarnEntry,
};
use super::moderation_ports::{EffectError, ModerationEffects, ModerationError, WarnStore};
use crate::core::guild_config::GuildModerationConfig;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Timeout applied on the second offense.
pub const TIMEOUT_DURATION: Duration = Duration::from_secs(15 * 60);
/// Lifetime of the in-channel notice.
pub const NOTICE_TTL: Duration = Duration::from_secs(10);

pub struct SanctionEngine {
    ledger: Arc<dyn WarnStore>,
    // One lock per (guild, user) so the count read and the tier decision
    // for a user never interleave.
    locks: DashMap<(u64, u64), Arc<Mutex<()>>>,
}

impl SanctionEngine {
    pub fn new(ledger: Arc<dyn WarnStore>) -> Self {
        Self {
            ledger,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, guild_id: u64, user_id: u64) -> Arc<Mutex<()>> {
        self.locks
            .entry((guild_id, user_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn release(&self, guild_id: u64, user_id: u64) {
        // Drop the lock entry once nobody else is waiting on it.
        self.locks
            .remove_if(&(guild_id, user_id), |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Punish the author of `message` for `violation`.
    ///
    /// The offending message is deleted first. Returns what was done.
    pub async fn apply_punishment<E: ModerationEffects + ?Sized>(
        &self,
        message: &InboundMessage,
        violation: Violation,
        config: &GuildModerationConfig,
        effects: &E,
    ) -> Result<SanctionOutcome, ModerationError> {
        // Messages reaching here have passed the gate, which requires a guild.
        let guild_id = message.guild_id.unwrap_or_default();
        let user_id = message.author_id;

        if let Err(e) = effects.delete_message(message.reference()).await {
            tracing::warn!(
                guild_id,
                user_id,
                message_id = message.message_id,
                "Failed to delete offending message: {}",
                e
            );
        }

        let lock = self.lock_for(guild_id, user_id);
        let outcome = {
            let _held = lock.lock().await;
            self.sanction_locked(message, guild_id, violation, config, effects)
                .await
        };
        drop(lock);
        self.release(guild_id, user_id);

        outcome
    }

    async fn sanction_locked<E: ModerationEffects + ?Sized>(
        &self,
        message: &InboundMessage,
        guild_id: u64,
        violation: Violation,
        config: &GuildModerationConfig,
        effects: &E,
    ) -> Result<SanctionOutcome, ModerationError> {
        let user_id = message.author_id;
        let warn_count = self
            .ledger
            .add_warn(guild_id, user_id, violation.reason())
            .await?;

        let warning = Notice::Warning {
            guild_name: message.guild_name.clone(),
            reason: violation.description().to_string(),
            warn_count,
        };
        match effects.send_direct(user_id, &warning).await {
            Ok(()) => {}
            Err(EffectError::Unreachable(_)) => {
                tracing::debug!(guild_id, user_id, "User has direct messages closed");
            }
            Err(e) => tracing::debug!(guild_id, user_id, "Warning DM failed: {}", e),
        }

        let action = match SanctionTier::for_count(warn_count) {
            Some(SanctionTier::Timeout) => {
                match effects
                    .timeout_user(guild_id, user_id, TIMEOUT_DURATION, violation.description())
                    .await
                {
                    Ok(()) => SanctionAction::TimedOut,
                    Err(e) => {
                        tracing::warn!(guild_id, user_id, "Failed to time out user: {}", e);
                        SanctionAction::TimeoutDenied
                    }
                }
            }
            Some(SanctionTier::Removal) => {
                let reason = format!(
                    "Automatic sanction: {} ({} warnings)",
                    violation.description(),
                    warn_count
                );
                match effects.remove_user(guild_id, user_id, &reason).await {
                    Ok(()) => SanctionAction::Removed,
                    Err(e) => {
                        tracing::warn!(guild_id, user_id, "Failed to remove user: {}", e);
                        SanctionAction::RemovalDenied
                    }
                }
            }
            Some(SanctionTier::Warn) | None => SanctionAction::Warned,
        };

        tracing::info!(
            guild_id,
            user_id,
            reason = violation.reason(),
            warn_count,
            action = action.label(),
            "Automated sanction applied"
        );

        if let Some(log_channel) = config.log_channel {
            let entry = ModerationLogEntry {
                user_id,
                user_name: message.author_name.clone(),
                user_avatar: message.author_avatar.clone(),
                moderator: effects.moderator(),
                action: action.label().to_string(),
                reason: violation.description().to_string(),
            };
            if let Err(e) = effects
                .post_to_channel(log_channel, &Notice::ModLog(entry), None)
                .await
            {
                tracing::debug!(guild_id, log_channel, "Moderation log skipped: {}", e);
            }
        }

        let notice = Notice::ActionTaken {
            user_id,
            action: action.label().to_string(),
            reason: violation.description().to_string(),
        };
        if let Err(e) = effects
            .post_to_channel(message.channel_id, &notice, Some(NOTICE_TTL))
            .await
        {
            tracing::debug!(guild_id, channel_id = message.channel_id, "Action notice failed: {}", e);
        }

        Ok(SanctionOutcome {
            violation,
            warn_count,
            action,
        })
    }

    /// Ledger for a user, oldest first.
    pub async fn warnings(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<WarnEntry>, ModerationError> {
        Ok(self.ledger.get_warns(guild_id, user_id).await?)
    }

    /// Privileged reset back to a clean record. `false` if already clean.
    pub async fn clear(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        let lock = self.lock_for(guild_id, user_id);
        let cleared = {
            let _held = lock.lock().await;
            self.ledger.clear_warns(guild_id, user_id).await
        };
        drop(lock);
        self.release(guild_id, user_id);
        Ok(cleared?)
    }

    /// Post a manual moderation action to the log channel, if one is configured.
    pub async fn log_manual_action<E: ModerationEffects + ?Sized>(
        &self,
        config: &GuildModerationConfig,
        effects: &E,
        entry: ModerationLogEntry,
    ) {
        let Some(log_channel) = config.log_channel else {
            return;
        };
        if let Err(e) = effects
            .post_to_channel(log_channel, &Notice::ModLog(entry), None)
            .await
        {
            tracing::debug!(log_channel, "Moderation log skipped: {}", e);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::guild_config::StoreError;
    use crate::core::moderation::moderation_models::{MessageRef, Moderator};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// In-memory ledger for testing
    #[derive(Default)]
    pub(crate) struct MockWarnStore {
        ledgers: DashMap<(u64, u64), Vec<WarnEntry>>,
    }

    #[async_trait]
    impl WarnStore for MockWarnStore {
        async fn add_warn(
            &self,
            guild_id: u64,
            user_id: u64,
            reason: &str,
        ) -> Result<u32, StoreError> {
            let mut ledger = self.ledgers.entry((guild_id, user_id)).or_default();
            ledger.push(WarnEntry::now(reason));
            Ok(ledger.len() as u32)
        }

        async fn get_warns(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<Vec<WarnEntry>, StoreError> {
            Ok(self
                .ledgers
                .get(&(guild_id, user_id))
                .map(|l| l.clone())
                .unwrap_or_default())
        }

        async fn clear_warns(&self, guild_id: u64, user_id: u64) -> Result<bool, StoreError> {
            Ok(self
                .ledgers
                .remove(&(guild_id, user_id))
                .map(|(_, l)| !l.is_empty())
                .unwrap_or(false))
        }
    }

    /// Records every effect; individual primitives can be told to fail.
    #[derive(Default)]
    pub(crate) struct RecordingEffects {
        pub calls: StdMutex<Vec<String>>,
        pub posted: StdMutex<Vec<(u64, Notice, Option<Duration>)>>,
        pub deny_timeout: bool,
        pub deny_remove: bool,
        pub dm_closed: bool,
        pub delete_fails: bool,
    }

    impl RecordingEffects {
        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModerationEffects for RecordingEffects {
        fn moderator(&self) -> Moderator {
            Moderator {
                id: 999,
                name: "guardian".to_string(),
            }
        }

        async fn delete_message(&self, message: MessageRef) -> Result<(), EffectError> {
            self.push(format!("delete:{}", message.message_id));
            if self.delete_fails {
                return Err(EffectError::NotFound("already gone".to_string()));
            }
            Ok(())
        }

        async fn send_direct(&self, user_id: u64, _notice: &Notice) -> Result<(), EffectError> {
            self.push(format!("dm:{}", user_id));
            if self.dm_closed {
                return Err(EffectError::Unreachable("dms closed".to_string()));
            }
            Ok(())
        }

        async fn timeout_user(
            &self,
            _guild_id: u64,
            user_id: u64,
            duration: Duration,
            _reason: &str,
        ) -> Result<(), EffectError> {
            self.push(format!("timeout:{}:{}", user_id, duration.as_secs()));
            if self.deny_timeout {
                return Err(EffectError::PermissionDenied("missing MODERATE_MEMBERS".into()));
            }
            Ok(())
        }

        async fn remove_user(
            &self,
            _guild_id: u64,
            user_id: u64,
            _reason: &str,
        ) -> Result<(), EffectError> {
            self.push(format!("kick:{}", user_id));
            if self.deny_remove {
                return Err(EffectError::PermissionDenied("missing KICK_MEMBERS".into()));
            }
            Ok(())
        }

        async fn post_to_channel(
            &self,
            channel_id: u64,
            notice: &Notice,
            ttl: Option<Duration>,
        ) -> Result<(), EffectError> {
            self.push(format!("post:{}", channel_id));
            self.posted
                .lock()
                .unwrap()
                .push((channel_id, notice.clone(), ttl));
            Ok(())
        }
    }

    fn offending_message() -> InboundMessage {
        InboundMessage {
            message_id: 7,
            channel_id: 50,
            guild_id: Some(1),
            guild_name: "Test Guild".to_string(),
            author_id: 42,
            author_name: "spammer".to_string(),
            content: "darn".to_string(),
            ..Default::default()
        }
    }

    fn config_with_log() -> GuildModerationConfig {
        GuildModerationConfig {
            enabled: true,
            log_channel: Some(77),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ladder_warn_timeout_removal() {
        let engine = SanctionEngine::new(Arc::new(MockWarnStore::default()));
        let effects = RecordingEffects::default();
        let msg = offending_message();
        let config = config_with_log();

        let first = engine
            .apply_punishment(&msg, Violation::BadWord, &config, &effects)
            .await
            .unwrap();
        assert_eq!(first.warn_count, 1);
        assert_eq!(first.action, SanctionAction::Warned);

        let second = engine
            .apply_punishment(&msg, Violation::Flood, &config, &effects)
            .await
            .unwrap();
        assert_eq!(second.warn_count, 2);
        assert_eq!(second.action, SanctionAction::TimedOut);

        let third = engine
            .apply_punishment(&msg, Violation::BadWord, &config, &effects)
            .await
            .unwrap();
        assert_eq!(third.action, SanctionAction::Removed);

        let fourth = engine
            .apply_punishment(&msg, Violation::BadWord, &config, &effects)
            .await
            .unwrap();
        assert_eq!(fourth.warn_count, 4);
        assert_eq!(fourth.action, SanctionAction::Removed);

        let calls = effects.calls();
        assert!(calls.contains(&"timeout:42:900".to_string()));
        assert_eq!(calls.iter().filter(|c| *c == "kick:42").count(), 2);
    }

    #[tokio::test]
    async fn test_effects_run_in_order() {
        let engine = SanctionEngine::new(Arc::new(MockWarnStore::default()));
        let effects = RecordingEffects::default();

        engine
            .apply_punishment(
                &offending_message(),
                Violation::BadWord,
                &config_with_log(),
                &effects,
            )
            .await
            .unwrap();

        assert_eq!(
            effects.calls(),
            vec!["delete:7", "dm:42", "post:77", "post:50"]
        );

        let posted = effects.posted.lock().unwrap().clone();
        assert!(matches!(&posted[0].1, Notice::ModLog(entry) if entry.moderator.id == 999));
        assert_eq!(posted[0].2, None);
        assert_eq!(posted[1].2, Some(NOTICE_TTL));
    }

    #[tokio::test]
    async fn test_permission_denied_degrades_action() {
        let engine = SanctionEngine::new(Arc::new(MockWarnStore::default()));
        let effects = RecordingEffects {
            deny_timeout: true,
            deny_remove: true,
            ..Default::default()
        };
        let msg = offending_message();
        let config = config_with_log();

        engine
            .apply_punishment(&msg, Violation::BadWord, &config, &effects)
            .await
            .unwrap();
        let second = engine
            .apply_punishment(&msg, Violation::BadWord, &config, &effects)
            .await
            .unwrap();
        let third = engine
            .apply_punishment(&msg, Violation::BadWord, &config, &effects)
            .await
            .unwrap();

        assert_eq!(second.action, SanctionAction::TimeoutDenied);
        assert_eq!(third.action, SanctionAction::RemovalDenied);
        assert_eq!(engine.warnings(1, 42).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_closed_dms_and_failed_delete_are_ignored() {
        let engine = SanctionEngine::new(Arc::new(MockWarnStore::default()));
        let effects = RecordingEffects {
            dm_closed: true,
            delete_fails: true,
            ..Default::default()
        };

        let outcome = engine
            .apply_punishment(
                &offending_message(),
                Violation::Flood,
                &config_with_log(),
                &effects,
            )
            .await
            .unwrap();

        assert_eq!(outcome.action, SanctionAction::Warned);
        assert_eq!(engine.warnings(1, 42).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_log_channel_skips_log() {
        let engine = SanctionEngine::new(Arc::new(MockWarnStore::default()));
        let effects = RecordingEffects::default();
        let config = GuildModerationConfig {
            enabled: true,
            ..Default::default()
        };

        engine
            .apply_punishment(&offending_message(), Violation::BadWord, &config, &effects)
            .await
            .unwrap();

        assert_eq!(effects.calls(), vec!["delete:7", "dm:42", "post:50"]);
    }

    #[tokio::test]
    async fn test_clear_resets_ladder() {
        let engine = SanctionEngine::new(Arc::new(MockWarnStore::default()));
        let effects = RecordingEffects::default();
        let msg = offending_message();
        let config = config_with_log();

        for _ in 0..2 {
            engine
                .apply_punishment(&msg, Violation::BadWord, &config, &effects)
                .await
                .unwrap();
        }

        assert!(engine.clear(1, 42).await.unwrap());
        // Second clear is a no-op, not an error
        assert!(!engine.clear(1, 42).await.unwrap());

        let next = engine
            .apply_punishment(&msg, Violation::BadWord, &config, &effects)
            .await
            .unwrap();
        assert_eq!(next.warn_count, 1);
        assert_eq!(next.action, SanctionAction::Warned);
    }

    #[tokio::test]
    async fn test_ledger_keeps_reasons_in_order() {
        let engine = SanctionEngine::new(Arc::new(MockWarnStore::default()));
        let effects = RecordingEffects::default();
        let msg = offending_message();
        let config = config_with_log();
        let violations = [
            Violation::Flood,
            Violation::BadWord,
            Violation::AdvertisingInvite,
        ];

        for v in violations {
            engine
                .apply_punishment(&msg, v, &config, &effects)
                .await
                .unwrap();
        }

        let reasons: Vec<String> = engine
            .warnings(1, 42)
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.reason)
            .collect();
        assert_eq!(reasons, vec!["flood", "bad-word", "advertising-invite"]);
    }

    #[tokio::test]
    async fn test_concurrent_violations_get_distinct_counts() {
        let engine = Arc::new(SanctionEngine::new(Arc::new(MockWarnStore::default())));
        let effects = Arc::new(RecordingEffects::default());
        let config = config_with_log();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let engine = Arc::clone(&engine);
            let effects = Arc::clone(&effects);
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .apply_punishment(
                        &offending_message(),
                        Violation::Flood,
                        &config,
                        effects.as_ref(),
                    )
                    .await
                    .unwrap()
                    .warn_count
            }));
        }

        let mut counts = Vec::new();
        for h in handles {
            counts.push(h.await.unwrap());
        }
        counts.sort();
        assert_eq!(counts, vec![1, 2, 3, 4, 5]);
        assert!(engine.locks.is_empty());
    }
}
