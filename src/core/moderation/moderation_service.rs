// Moderation service - the per-message pipeline.
//
// Policy Gate -> Content Classifier -> Sanction Engine.
//
// Sanctions run on their own task so that cancelling the event task never
// leaves a half-applied punishment. `drain` waits for those tasks at shutdown.
//
// NO Discord dependencies here - just pure domain logic.

use super::classifier::ContentClassifier;
use super::flood_detector::SpamWindows;
use super::moderation_models::{InboundMessage, ModerationLogEntry, SanctionOutcome, Violation, WarnEntry};
use super::moderation_ports::{ModerationEffects, ModerationError, WarnStore};
use super::policy_gate;
use super::rule_registry::{GlobalBadWordList, RuleRegistry};
use super::sanction_engine::SanctionEngine;
use crate::core::guild_config::{GuildConfigStore, GuildModerationConfig, ModerationField};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Counts sanctions that are still running.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

struct InFlightGuard(Arc<InFlight>);

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct ModerationService {
    config_store: Arc<dyn GuildConfigStore>,
    classifier: ContentClassifier,
    windows: Arc<SpamWindows>,
    sanctions: Arc<SanctionEngine>,
    in_flight: Arc<InFlight>,
}

impl ModerationService {
    pub fn new(
        config_store: Arc<dyn GuildConfigStore>,
        warn_store: Arc<dyn WarnStore>,
        global_words: Arc<GlobalBadWordList>,
    ) -> Self {
        let windows = Arc::new(SpamWindows::default());
        Self {
            config_store,
            classifier: ContentClassifier::new(
                RuleRegistry::new(global_words),
                Arc::clone(&windows),
            ),
            windows,
            sanctions: Arc::new(SanctionEngine::new(warn_store)),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Shared handle to the rate-flood windows, for the sweeper task.
    pub fn spam_windows(&self) -> Arc<SpamWindows> {
        Arc::clone(&self.windows)
    }

    pub fn global_words(&self) -> &GlobalBadWordList {
        self.classifier.registry().global()
    }

    /// Run one message through the pipeline.
    ///
    /// Returns the violation found, if any. The sanction itself runs in the
    /// background; the returned handle resolves to its outcome.
    pub async fn handle_message<E>(
        &self,
        message: InboundMessage,
        effects: E,
    ) -> Result<Option<(Violation, JoinHandle<Option<SanctionOutcome>>)>, ModerationError>
    where
        E: ModerationEffects + 'static,
    {
        let Some(guild_id) = message.guild_id else {
            return Ok(None);
        };

        let config = self.config_store.get_moderation_config(guild_id).await?;

        if !policy_gate::should_evaluate(&message, &config) {
            tracing::trace!(
                guild_id,
                user_id = message.author_id,
                exemption = ?policy_gate::exemption(&message, &config),
                "Message exempt"
            );
            return Ok(None);
        }

        let Some(violation) = self.classifier.classify(&message, &config, Instant::now()) else {
            return Ok(None);
        };

        tracing::debug!(
            guild_id,
            user_id = message.author_id,
            reason = violation.reason(),
            "Violation detected"
        );

        let guard = self.in_flight.enter();
        let sanctions = Arc::clone(&self.sanctions);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            match sanctions
                .apply_punishment(&message, violation, &config, &effects)
                .await
            {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!(
                        guild_id,
                        user_id = message.author_id,
                        "Failed to record sanction: {}",
                        e
                    );
                    None
                }
            }
        });

        Ok(Some((violation, handle)))
    }

    /// Wait for running sanctions to finish. Returns `false` on timeout.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let idle = self.in_flight.idle.notified();
                if self.in_flight.count.load(Ordering::SeqCst) == 0 {
                    return;
                }
                idle.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    pub async fn get_config(&self, guild_id: u64) -> Result<GuildModerationConfig, ModerationError> {
        Ok(self.config_store.get_moderation_config(guild_id).await?)
    }

    /// Returns whether the stored value changed.
    pub async fn set_field(
        &self,
        guild_id: u64,
        field: ModerationField,
    ) -> Result<bool, ModerationError> {
        Ok(self.config_store.set_moderation_field(guild_id, field).await?)
    }

    /// Add a guild keyword. Returns `false` if it was already listed.
    pub async fn add_bad_word(&self, guild_id: u64, word: &str) -> Result<bool, ModerationError> {
        self.set_field(guild_id, ModerationField::AddBadWord(word.to_string()))
            .await
    }

    /// Remove a guild keyword. Returns `false` if it was not listed.
    pub async fn remove_bad_word(
        &self,
        guild_id: u64,
        word: &str,
    ) -> Result<bool, ModerationError> {
        self.set_field(guild_id, ModerationField::RemoveBadWord(word.to_string()))
            .await
    }

    pub async fn warnings(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<WarnEntry>, ModerationError> {
        self.sanctions.warnings(guild_id, user_id).await
    }

    /// Privileged clear. Callers check authorization first.
    pub async fn clear_warnings(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        let cleared = self.sanctions.clear(guild_id, user_id).await?;
        if cleared {
            tracing::info!(guild_id, user_id, "Warn ledger cleared");
        }
        Ok(cleared)
    }

    /// Log a manual action (kick, ban, clear...) to the guild's log channel.
    pub async fn log_manual_action<E: ModerationEffects + ?Sized>(
        &self,
        guild_id: u64,
        effects: &E,
        entry: ModerationLogEntry,
    ) -> Result<(), ModerationError> {
        let config = self.get_config(guild_id).await?;
        self.sanctions
            .log_manual_action(&config, effects, entry)
            .await;
        Ok(())
    }
}
