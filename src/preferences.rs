//! Visitor preferences
//!
//! Language and theme are request scoped: read from the `ministry_prefs`
//! cookie and written back with `Set-Cookie`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const PREFERENCES_COOKIE: &str = "ministry_prefs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Telugu,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Telugu => "telugu",
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "telugu" | "te" => Ok(Language::Telugu),
            _ => Err(Error::Validation(format!("Unknown language: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(Error::Validation(format!("Unknown theme: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
}

impl Preferences {
    /// Read preferences from a `Cookie` header; unknown values fall back to defaults
    pub fn from_cookie_header(header: &str) -> Self {
        let mut prefs = Self::default();
        let Some(value) = header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == PREFERENCES_COOKIE)
            .map(|(_, value)| value.trim())
        else {
            return prefs;
        };

        for part in value.split('.') {
            if let Ok(language) = part.parse::<Language>() {
                prefs.language = language;
            } else if let Ok(theme) = part.parse::<Theme>() {
                prefs.theme = theme;
            }
        }
        prefs
    }

    /// Apply submitted `language`/`theme` values; blank values keep the current setting
    pub fn apply(&mut self, language: Option<&str>, theme: Option<&str>) -> Result<()> {
        if let Some(language) = language.filter(|v| !v.trim().is_empty()) {
            self.language = language.parse()?;
        }
        if let Some(theme) = theme.filter(|v| !v.trim().is_empty()) {
            self.theme = theme.parse()?;
        }
        Ok(())
    }

    /// `Set-Cookie` value persisting these preferences for a year
    pub fn to_set_cookie(&self) -> String {
        format!(
            "{}={}.{}; Path=/; Max-Age=31536000; SameSite=Lax",
            PREFERENCES_COOKIE,
            self.language.as_str(),
            self.theme.as_str()
        )
    }
}
