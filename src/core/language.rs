//! Supported interface languages

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl Display for TextDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TextDirection::Ltr => "ltr",
                TextDirection::Rtl => "rtl",
            }
        )
    }
}

impl FromStr for TextDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ltr" => Ok(TextDirection::Ltr),
            "rtl" => Ok(TextDirection::Rtl),
            _ => Err(anyhow::anyhow!("Invalid text direction: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageProfile {
    pub code: &'static str,
    pub display_name: &'static str,
    pub native_name: &'static str,
    pub text_direction: TextDirection,
    pub locale: &'static str,
    pub font_family: &'static str,
}

const PROFILES: [LanguageProfile; 6] = [
    LanguageProfile {
        code: "en",
        display_name: "English",
        native_name: "English",
        text_direction: TextDirection::Ltr,
        locale: "en-US",
        font_family: "Inter, sans-serif",
    },
    LanguageProfile {
        code: "ar",
        display_name: "Arabic",
        native_name: "العربية",
        text_direction: TextDirection::Rtl,
        locale: "ar-SA",
        font_family: "Noto Naskh Arabic, serif",
    },
    LanguageProfile {
        code: "fr",
        display_name: "French",
        native_name: "Français",
        text_direction: TextDirection::Ltr,
        locale: "fr-FR",
        font_family: "Inter, sans-serif",
    },
    LanguageProfile {
        code: "es",
        display_name: "Spanish",
        native_name: "Español",
        text_direction: TextDirection::Ltr,
        locale: "es-ES",
        font_family: "Inter, sans-serif",
    },
    LanguageProfile {
        code: "hi",
        display_name: "Hindi",
        native_name: "हिन्दी",
        text_direction: TextDirection::Ltr,
        locale: "hi-IN",
        font_family: "Noto Sans Devanagari, sans-serif",
    },
    LanguageProfile {
        code: "sw",
        display_name: "Swahili",
        native_name: "Kiswahili",
        text_direction: TextDirection::Ltr,
        locale: "sw-KE",
        font_family: "Inter, sans-serif",
    },
];

pub fn profiles() -> &'static [LanguageProfile] {
    &PROFILES
}

/// Looks up a profile by code, ignoring case and any region suffix (`ar-SA` -> `ar`).
pub fn profile(code: &str) -> Option<&'static LanguageProfile> {
    let normalized = code.trim().to_ascii_lowercase();
    let lang = normalized.split(['-', '_']).next().unwrap_or("");
    PROFILES.iter().find(|p| p.code == lang)
}
