use crate::core::moderation::GlobalBadWordList;
use std::path::Path;
use tokio::fs;

/// Load the global keyword file (`{ "<language>": ["word", ...], ... }`).
///
/// A missing or unreadable file is not fatal: moderation then runs with
/// guild keywords only.
pub async fn load_global_bad_words(path: impl AsRef<Path>) -> GlobalBadWordList {
    let path = path.as_ref();

    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                "Could not read bad word list {}: {}. Using guild lists only.",
                path.display(),
                e
            );
            return GlobalBadWordList::default();
        }
    };

    match GlobalBadWordList::from_json_str(&text) {
        Ok(list) => {
            tracing::info!("Loaded {} global bad words from {}", list.len(), path.display());
            list
        }
        Err(e) => {
            tracing::warn!(
                "Invalid bad word list {}: {}. Using guild lists only.",
                path.display(),
                e
            );
            GlobalBadWordList::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_and_merges_languages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_words.json");
        std::fs::write(&path, r#"{ "en": ["Darn", "heck"], "de": ["mist", "darn"] }"#).unwrap();

        let list = load_global_bad_words(&path).await;
        assert_eq!(list.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_gives_empty_list() {
        let dir = TempDir::new().unwrap();
        let list = load_global_bad_words(dir.path().join("nope.json")).await;
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_gives_empty_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_words.json");
        std::fs::write(&path, "[not json").unwrap();

        assert!(load_global_bad_words(&path).await.is_empty());
    }
}
