//! Translations

use std::collections::HashMap;
use std::sync::Arc;

use elgg_config::Config;
use parking_lot::RwLock;

const FALLBACK_LANGUAGE: &str = "en";

/// Language-keyed message catalogue.
///
/// Lookups try the requested language, then English, then give back the
/// key itself. `%s` placeholders are replaced by `args` in order.
pub struct Translator {
    pub config: Arc<Config>,
    catalogues: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl Translator {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            catalogues: RwLock::new(HashMap::new()),
        }
    }

    pub fn current_language(&self) -> &str {
        if self.config.language.is_empty() {
            FALLBACK_LANGUAGE
        } else {
            &self.config.language
        }
    }

    /// Merge `messages` into the catalogue of `language`
    pub fn add_translation<I, K, V>(&self, language: &str, messages: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut catalogues = self.catalogues.write();
        let catalogue = catalogues.entry(language.to_string()).or_default();
        for (key, message) in messages {
            catalogue.insert(key.into(), message.into());
        }
    }

    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.catalogues.read().keys().cloned().collect();
        languages.sort();
        languages
    }

    pub fn language_key_exists(&self, key: &str, language: &str) -> bool {
        self.catalogues
            .read()
            .get(language)
            .map(|catalogue| catalogue.contains_key(key))
            .unwrap_or(false)
    }

    pub fn translate(&self, key: &str, args: &[&str], language: Option<&str>) -> String {
        let language = language.unwrap_or_else(|| self.current_language());
        let catalogues = self.catalogues.read();
        let template = [language, FALLBACK_LANGUAGE]
            .iter()
            .find_map(|lang| catalogues.get(*lang).and_then(|c| c.get(key)))
            .map(String::as_str)
            .unwrap_or(key);

        let mut args = args.iter();
        let mut parts = template.split("%s");
        let mut translated = parts.next().unwrap_or_default().to_string();
        for part in parts {
            translated.push_str(args.next().copied().unwrap_or("%s"));
            translated.push_str(part);
        }
        translated
    }
}
