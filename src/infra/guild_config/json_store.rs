use crate::core::guild_config::{GuildConfig, GuildConfigStore, ModerationField, StoreError};
use crate::core::moderation::{WarnEntry, WarnStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

/// Everything stored for one guild: its configuration sections plus the
/// warn ledgers of its members.
/// { "moderation": {...}, "welcome": {...}, ..., "users": { user_id: { "warns": [...] } } }
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GuildDocument {
    #[serde(flatten)]
    config: GuildConfig,
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserRecord {
    #[serde(default)]
    warns: Vec<WarnEntry>,
}

/// JSON file store for guild configuration and warn ledgers.
///
/// The whole document is cached in memory and rewritten after every change.
/// A failed write is logged and the in-memory state is kept, so the change
/// is visible for the rest of the process even if it did not reach disk.
///
/// Writes are serialized by `persist_lock` and land through a temp file plus
/// rename, so the file on disk is always a complete snapshot and never older
/// than one already written.
pub struct JsonGuildStore {
    path: PathBuf,
    cache: RwLock<HashMap<u64, GuildDocument>>,
    persist_lock: Mutex<()>,
}

impl JsonGuildStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let cache = if fs::try_exists(&path).await? {
            let text = fs::read_to_string(&path).await?;
            if text.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            tracing::warn!("Guild store {} not found, starting empty", path.display());
            HashMap::new()
        };

        Ok(Self::with_cache(path, cache))
    }

    fn with_cache(path: PathBuf, cache: HashMap<u64, GuildDocument>) -> Self {
        Self {
            path,
            cache: RwLock::new(cache),
            persist_lock: Mutex::new(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn persist(&self) -> Result<(), StoreError> {
        // Held across snapshot and write so snapshots reach disk in order
        let _persist = self.persist_lock.lock().await;

        let text = {
            let cache = self.cache.read().await;
            serde_json::to_string_pretty(&*cache)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let temp = self.temp_path();
        fs::write(&temp, text).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn persist_best_effort(&self) {
        if let Err(e) = self.persist().await {
            tracing::error!(
                "Failed to persist guild store to {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[async_trait]
impl GuildConfigStore for JsonGuildStore {
    async fn get_guild_config(&self, guild_id: u64) -> Result<GuildConfig, StoreError> {
        let cache = self.cache.read().await;
        Ok(cache
            .get(&guild_id)
            .map(|doc| doc.config.clone())
            .unwrap_or_default())
    }

    async fn set_moderation_field(
        &self,
        guild_id: u64,
        field: ModerationField,
    ) -> Result<bool, StoreError> {
        let mut cache = self.cache.write().await;
        let changed = cache
            .entry(guild_id)
            .or_default()
            .config
            .moderation
            .apply(field);
        drop(cache); // Release lock before persisting

        if changed {
            self.persist_best_effort().await;
        }
        Ok(changed)
    }
}

#[async_trait]
impl WarnStore for JsonGuildStore {
    async fn add_warn(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<u32, StoreError> {
        let mut cache = self.cache.write().await;
        let record = cache
            .entry(guild_id)
            .or_default()
            .users
            .entry(user_id.to_string())
            .or_default();
        record.warns.push(WarnEntry::now(reason));
        let total = record.warns.len() as u32;
        drop(cache);

        self.persist_best_effort().await;
        Ok(total)
    }

    async fn get_warns(&self, guild_id: u64, user_id: u64) -> Result<Vec<WarnEntry>, StoreError> {
        let cache = self.cache.read().await;
        Ok(cache
            .get(&guild_id)
            .and_then(|doc| doc.users.get(&user_id.to_string()))
            .map(|record| record.warns.clone())
            .unwrap_or_default())
    }

    async fn clear_warns(&self, guild_id: u64, user_id: u64) -> Result<bool, StoreError> {
        let mut cache = self.cache.write().await;
        let cleared = match cache
            .get_mut(&guild_id)
            .and_then(|doc| doc.users.get_mut(&user_id.to_string()))
        {
            Some(record) if !record.warns.is_empty() => {
                record.warns.clear();
                true
            }
            _ => false,
        };
        drop(cache);

        if cleared {
            self.persist_best_effort().await;
        }
        Ok(cleared)
    }
}
