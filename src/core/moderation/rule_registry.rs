// Rule Registry - global and per-guild keyword lists.

use crate::core::guild_config::GuildModerationConfig;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Process-wide keyword list, built once at startup and never mutated.
#[derive(Debug, Clone, Default)]
pub struct GlobalBadWordList {
    words: Vec<String>,
}

impl GlobalBadWordList {
    /// Build from any word source. Words are trimmed, lower-cased and deduplicated.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        out.sort();
        out.dedup();
        Self { words: out }
    }

    /// Parse the multi-language source document: `{ "en": [...], "tr": [...] }`.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let by_language: BTreeMap<String, Vec<String>> = serde_json::from_str(raw)?;
        Ok(Self::from_words(by_language.into_values().flatten()))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn sample(&self, n: usize) -> &[String] {
        &self.words[..n.min(self.words.len())]
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// Keyword matcher combining the global list with a guild's own words.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    global: Arc<GlobalBadWordList>,
}

impl RuleRegistry {
    pub fn new(global: Arc<GlobalBadWordList>) -> Self {
        Self { global }
    }

    pub fn global(&self) -> &GlobalBadWordList {
        &self.global
    }

    /// Case-insensitive substring match against the message as written and
    /// with all whitespace removed, so "b a d" still hits "bad".
    pub fn is_bad_word(&self, text: &str, config: &GuildModerationConfig) -> bool {
        let lowered = text.to_lowercase();
        let stripped: String = lowered.chars().filter(|c| !c.is_whitespace()).collect();

        let hits =
            |word: &str| !word.is_empty() && (lowered.contains(word) || stripped.contains(word));

        config.bad_words.iter().any(|w| hits(&w.to_lowercase())) || self.global.iter().any(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(words: &[&str]) -> RuleRegistry {
        RuleRegistry::new(Arc::new(GlobalBadWordList::from_words(words)))
    }

    #[test]
    fn test_global_word_matches_case_insensitive() {
        let reg = registry(&["darn"]);
        let config = GuildModerationConfig::default();

        assert!(reg.is_bad_word("Well DARN it", &config));
        assert!(!reg.is_bad_word("Well done", &config));
    }

    #[test]
    fn test_spaced_out_evasion_is_caught() {
        let reg = registry(&["küfür"]);
        let config = GuildModerationConfig::default();

        assert!(reg.is_bad_word("k ü f ü r", &config));
        assert!(reg.is_bad_word("K Ü\tF Ü R", &config));
    }

    #[test]
    fn test_guild_words_are_combined_with_global() {
        let reg = registry(&["darn"]);
        let config = GuildModerationConfig {
            bad_words: vec!["heck".to_string()],
            ..Default::default()
        };

        assert!(reg.is_bad_word("what the heck", &config));
        assert!(reg.is_bad_word("darn", &config));
        assert!(!reg.is_bad_word("fine message", &config));
    }

    #[test]
    fn test_empty_keywords_never_match() {
        let reg = registry(&["", "   "]);
        let config = GuildModerationConfig {
            bad_words: vec![String::new()],
            ..Default::default()
        };

        assert!(reg.global().is_empty());
        assert!(!reg.is_bad_word("anything at all", &config));
    }

    #[test]
    fn test_json_source_merges_languages() {
        let raw = r#"{ "en": ["Darn", "heck"], "tr": ["küfür", "darn"] }"#;
        let list = GlobalBadWordList::from_json_str(raw).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.sample(10).len(), 3);
        assert_eq!(list.sample(1).len(), 1);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(GlobalBadWordList::from_json_str("[1, 2]").is_err());
    }
}
