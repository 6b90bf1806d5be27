//! Celebration message templates.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::TranslateError;

pub const MESSAGES_KEY: &str = "MESSAGES";

pub const DEFAULT_MESSAGES: [&str; 3] = [
    "🎉 Happy Birthday, {name}! 🎂",
    "🎈 Best wishes on your special day, {name}! 🎁",
    "🌟 Have a fantastic birthday, {name}! 🎊",
];

const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Translation {
    Text(String),
    List(Vec<String>),
}

pub trait Translate {
    fn translate(&self, key: &str) -> Result<Translation, TranslateError>;
}

/// Translations from the config's `[translations.<language>]` tables. A key
/// missing from both the configured language and English translates to
/// itself.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    language: String,
    tables: BTreeMap<String, BTreeMap<String, Translation>>,
}

impl Catalog {
    pub fn new(
        language: impl Into<String>,
        tables: BTreeMap<String, BTreeMap<String, Translation>>,
    ) -> Self {
        Self {
            language: language.into(),
            tables,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.language.clone(), config.translations.clone())
    }
}

impl Translate for Catalog {
    fn translate(&self, key: &str) -> Result<Translation, TranslateError> {
        let primary = self.tables.get(&self.language);
        let fallback = self.tables.get(FALLBACK_LANGUAGE);
        if primary.is_none() && fallback.is_none() {
            return Err(TranslateError::UnknownLanguage(self.language.clone()));
        }
        Ok([primary, fallback]
            .into_iter()
            .flatten()
            .find_map(|table| table.get(key).cloned())
            .unwrap_or_else(|| Translation::Text(key.to_string())))
    }
}

fn defaults() -> Vec<String> {
    DEFAULT_MESSAGES.iter().map(|s| s.to_string()).collect()
}

/// Message templates for the current language, or the built-in ones when the
/// translation is missing, broken or empty.
pub fn message_templates(translator: &dyn Translate) -> Vec<String> {
    match translator.translate(MESSAGES_KEY) {
        Ok(Translation::List(list)) if !list.is_empty() => list,
        Ok(Translation::List(_)) => {
            warn!("translated message list is empty, using default messages");
            defaults()
        }
        Ok(Translation::Text(text)) if text == MESSAGES_KEY => {
            debug!("using default messages (translation not found)");
            defaults()
        }
        Ok(Translation::Text(_)) => {
            warn!("invalid translation format, using default messages");
            defaults()
        }
        Err(err) => {
            debug!(error = %err, "translation failed, using default messages");
            defaults()
        }
    }
}

/// A random template with the first `{name}` filled in.
pub fn pick_message(translator: &dyn Translate, name: &str, rng: &mut fastrand::Rng) -> String {
    let templates = message_templates(translator);
    let template = &templates[rng.usize(..templates.len())];
    template.replacen("{name}", name, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Translate for Broken {
        fn translate(&self, _key: &str) -> Result<Translation, TranslateError> {
            Err(TranslateError::UnknownLanguage("xx".into()))
        }
    }

    fn catalog(language: &str, entries: &[(&str, &str, Translation)]) -> Catalog {
        let mut tables: BTreeMap<String, BTreeMap<String, Translation>> = BTreeMap::new();
        for (lang, key, value) in entries {
            tables
                .entry(lang.to_string())
                .or_default()
                .insert(key.to_string(), value.clone());
        }
        Catalog::new(language, tables)
    }

    #[test]
    fn uses_translated_list() {
        let sv = catalog("sv", &[("sv", MESSAGES_KEY, Translation::List(vec!["Grattis {name}!".into()]))]);
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(pick_message(&sv, "Alice", &mut rng), "Grattis Alice!");
    }

    #[test]
    fn falls_back_to_english_table() {
        let cat = catalog("de", &[("en", MESSAGES_KEY, Translation::List(vec!["Yay {name}".into()]))]);
        assert_eq!(message_templates(&cat), vec!["Yay {name}".to_string()]);
    }

    #[test]
    fn missing_key_echoes_and_falls_back_to_defaults() {
        let cat = catalog("sv", &[("sv", "OTHER", Translation::Text("x".into()))]);
        assert_eq!(cat.translate(MESSAGES_KEY), Ok(Translation::Text(MESSAGES_KEY.into())));
        assert_eq!(message_templates(&cat), defaults());
    }

    #[test]
    fn wrong_shape_errors_and_empty_lists_fall_back() {
        let text = catalog("en", &[("en", MESSAGES_KEY, Translation::Text("Hi {name}".into()))]);
        assert_eq!(message_templates(&text), defaults());

        let empty = catalog("en", &[("en", MESSAGES_KEY, Translation::List(vec![]))]);
        assert_eq!(message_templates(&empty), defaults());

        assert_eq!(message_templates(&Broken), defaults());
        assert!(Catalog::default().translate(MESSAGES_KEY).is_err());
    }

    #[test]
    fn only_the_first_placeholder_is_filled() {
        let cat = catalog("en", &[("en", MESSAGES_KEY, Translation::List(vec!["{name} and {name}".into()]))]);
        let mut rng = fastrand::Rng::with_seed(7);
        assert_eq!(pick_message(&cat, "Bo", &mut rng), "Bo and {name}");
    }

    #[test]
    fn default_messages_mention_the_name() {
        let mut rng = fastrand::Rng::with_seed(3);
        for _ in 0..10 {
            assert!(pick_message(&Broken, "Alice", &mut rng).contains("Alice"));
        }
    }
}
