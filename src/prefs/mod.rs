//! Theme and language preferences, persisted next to the session in `SessionStorage`.

mod messages;

pub use messages::{translate, MessageKey};

use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::storage::SessionStorage;

pub const THEME_KEY: &str = "theme";
pub const LANGUAGE_KEY: &str = "language";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Fr,
    En,
    Ar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDirection { Ltr, Rtl }

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self { Theme::Light => "light", Theme::Dark => "dark" }
    }
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() { "light" => Some(Theme::Light), "dark" => Some(Theme::Dark), _ => None }
    }
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self { Language::Fr => "fr", Language::En => "en", Language::Ar => "ar" }
    }
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() { "fr" => Some(Language::Fr), "en" => Some(Language::En), "ar" => Some(Language::Ar), _ => None }
    }
    pub fn direction(&self) -> TextDirection {
        match self { Language::Ar => TextDirection::Rtl, _ => TextDirection::Ltr }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
    pub language: Language,
}

impl Preferences {
    /// Unknown or unreadable stored values fall back to the defaults (light, French).
    pub fn load(storage: &dyn SessionStorage) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "camwatch::prefs", "could not read '{}': {e}", key);
                None
            }
        };
        let theme = read(THEME_KEY).as_deref().and_then(Theme::parse).unwrap_or_default();
        let language = read(LANGUAGE_KEY).as_deref().and_then(Language::parse).unwrap_or_default();
        Self { theme, language }
    }

    pub fn save(&self, storage: &dyn SessionStorage) -> anyhow::Result<()> {
        storage.set(THEME_KEY, self.theme.as_str())?;
        storage.set(LANGUAGE_KEY, self.language.as_str())?;
        Ok(())
    }

    pub fn t(&self, key: MessageKey) -> &'static str { translate(key, self.language) }
}
