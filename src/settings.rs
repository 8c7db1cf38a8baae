// Process settings, read once from the environment at startup.

use anyhow::{bail, Context as _};
use std::path::PathBuf;

/// Where warn ledgers are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnBackend {
    /// Same JSON document as the guild configuration.
    Json,
    /// Dedicated SQLite database.
    Sqlite,
}

impl std::str::FromStr for WarnBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => bail!("Unknown WARN_STORE '{}' (expected json or sqlite)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub token: String,
    /// Extra bot owner allowed to use privileged commands.
    pub owner_id: Option<u64>,
    pub data_dir: PathBuf,
    pub bad_words_path: PathBuf,
    pub warn_backend: WarnBackend,
}

impl BotSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let token = get("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .context("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")?;

        let owner_id = match get("OWNER_ID") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("OWNER_ID '{}' is not a user id", raw))?,
            ),
            _ => None,
        };

        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let bad_words_path = get("BAD_WORDS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("bad_words.json"));
        let warn_backend = get("WARN_STORE")
            .map(|raw| raw.parse())
            .transpose()?
            .unwrap_or(WarnBackend::Json);

        Ok(Self {
            token,
            owner_id,
            data_dir,
            bad_words_path,
            warn_backend,
        })
    }

    pub fn guild_store_path(&self) -> PathBuf {
        self.data_dir.join("guilds.json")
    }

    pub fn warn_db_url(&self) -> String {
        format!(
            "sqlite://{}?mode=rwc",
            self.data_dir.join("moderation.db").display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> anyhow::Result<BotSettings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(s.owner_id, None);
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert_eq!(s.bad_words_path, PathBuf::from("data").join("bad_words.json"));
        assert_eq!(s.warn_backend, WarnBackend::Json);
        assert_eq!(s.guild_store_path(), PathBuf::from("data").join("guilds.json"));
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("DISCORD_TOKEN", "abc"),
            ("OWNER_ID", " 1234 "),
            ("DATA_DIR", "/srv/bot"),
            ("BAD_WORDS_PATH", "/etc/words.json"),
            ("WARN_STORE", "SQLite"),
        ])
        .unwrap();
        assert_eq!(s.owner_id, Some(1234));
        assert_eq!(s.bad_words_path, PathBuf::from("/etc/words.json"));
        assert_eq!(s.warn_backend, WarnBackend::Sqlite);
        assert!(s.warn_db_url().ends_with("moderation.db?mode=rwc"));
    }

    #[test]
    fn test_missing_token_is_an_error() {
        assert!(settings(&[]).is_err());
        assert!(settings(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(settings(&[("DISCORD_TOKEN", "abc"), ("OWNER_ID", "me")]).is_err());
        assert!(settings(&[("DISCORD_TOKEN", "abc"), ("WARN_STORE", "redis")]).is_err());
    }
}
