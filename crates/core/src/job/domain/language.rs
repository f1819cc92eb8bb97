use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown language '{0}'")]
pub struct UnknownLanguage(pub String);

/// Spoken-language hint for a job. `Auto` lets the model detect the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    English,
    Japanese,
    Chinese,
    Korean,
    Spanish,
    French,
    German,
    Italian,
    Russian,
    Portuguese,
}

impl Language {
    pub const ALL: &[Language] = &[
        Language::Auto,
        Language::English,
        Language::Japanese,
        Language::Chinese,
        Language::Korean,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Russian,
        Language::Portuguese,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Language::Auto => "Auto",
            Language::English => "English",
            Language::Japanese => "Japanese",
            Language::Chinese => "Chinese",
            Language::Korean => "Korean",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Russian => "Russian",
            Language::Portuguese => "Portuguese",
        }
    }

    /// ISO 639-1 code passed to the model; `None` means auto-detect.
    pub fn code(self) -> Option<&'static str> {
        match self {
            Language::Auto => None,
            Language::English => Some("en"),
            Language::Japanese => Some("ja"),
            Language::Chinese => Some("zh"),
            Language::Korean => Some("ko"),
            Language::Spanish => Some("es"),
            Language::French => Some("fr"),
            Language::German => Some("de"),
            Language::Italian => Some("it"),
            Language::Russian => Some("ru"),
            Language::Portuguese => Some("pt"),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Accepts a language name or code, case-insensitively.
impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .iter()
            .copied()
            .find(|lang| {
                lang.name().eq_ignore_ascii_case(wanted)
                    || lang.code().is_some_and(|code| code.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Language::Japanese, Some("ja"))]
    #[case(Language::English, Some("en"))]
    #[case(Language::Portuguese, Some("pt"))]
    #[case(Language::Auto, None)]
    fn test_code(#[case] language: Language, #[case] expected: Option<&str>) {
        assert_eq!(language.code(), expected);
    }

    #[rstest]
    #[case("Japanese", Language::Japanese)]
    #[case("japanese", Language::Japanese)]
    #[case("ja", Language::Japanese)]
    #[case("AUTO", Language::Auto)]
    #[case(" de ", Language::German)]
    fn test_from_str(#[case] input: &str, #[case] expected: Language) {
        assert_eq!(input.parse::<Language>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "Klingon".parse::<Language>().unwrap_err();
        assert_eq!(err, UnknownLanguage("Klingon".into()));
    }

    #[test]
    fn test_default_is_auto() {
        assert_eq!(Language::default(), Language::Auto);
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for &language in Language::ALL {
            assert_eq!(language.to_string().parse::<Language>().unwrap(), language);
        }
    }
}
