//! Target languages understood by the XTTS engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Language codes accepted by XTTS v2.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh-cn", "ja", "hu",
    "ko", "hi",
];

/// Language used when neither the config nor the caller picks one.
pub const DEFAULT_LANGUAGE: &str = "de";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LanguageError {
    #[error("Unsupported language: {0}")]
    Unsupported(String),
}

/// A validated XTTS language code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Parse a user supplied code, accepting `zh` for `zh-cn`.
    pub fn parse(input: &str) -> Result<Self, LanguageError> {
        let code = input.trim().to_ascii_lowercase();
        let code = match code.as_str() {
            "zh" | "zh_cn" => "zh-cn".to_string(),
            _ => code,
        };

        if SUPPORTED_LANGUAGES.contains(&code.as_str()) {
            Ok(Self(code))
        } else {
            Err(LanguageError::Unsupported(input.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// All supported languages in display order.
    pub fn all() -> Vec<Language> {
        SUPPORTED_LANGUAGES
            .iter()
            .map(|code| Language(code.to_string()))
            .collect()
    }
}

impl Default for Language {
    fn default() -> Self {
        Self(DEFAULT_LANGUAGE.to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Language {
    type Error = LanguageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_language() {
        let language = Language::parse("en").unwrap();
        assert_eq!(language.as_str(), "en");
    }

    #[test]
    fn test_parse_is_case_insensitive_and_trims() {
        let language = Language::parse("  FR ").unwrap();
        assert_eq!(language.as_str(), "fr");
    }

    #[test]
    fn test_parse_chinese_alias() {
        assert_eq!(Language::parse("zh").unwrap().as_str(), "zh-cn");
        assert_eq!(Language::parse("zh-CN").unwrap().as_str(), "zh-cn");
    }

    #[test]
    fn test_parse_unsupported() {
        let result = Language::parse("xx");
        assert_eq!(result, Err(LanguageError::Unsupported("xx".to_string())));
    }

    #[test]
    fn test_default_is_german() {
        assert_eq!(Language::default().as_str(), "de");
    }

    #[test]
    fn test_serde_rejects_unknown_code() {
        let ok: Language = serde_json::from_str("\"es\"").unwrap();
        assert_eq!(ok.as_str(), "es");
        assert!(serde_json::from_str::<Language>("\"klingon\"").is_err());
    }
}
