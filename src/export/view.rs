//! Read model produced by the export query.
//!
//! One [`TranslationView`] exists per (key, language) pair. Rows for the same
//! key share `key_id`, `key_name`, `namespace` and the plural settings; the
//! text, state and plural forms are language specific.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Workflow state of a single translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslationState {
    Untranslated,
    Translated,
    Reviewed,
}

impl TranslationState {
    /// Name used in the database and in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Untranslated => "UNTRANSLATED",
            Self::Translated => "TRANSLATED",
            Self::Reviewed => "REVIEWED",
        }
    }
}

impl fmt::Display for TranslationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranslationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UNTRANSLATED" => Ok(Self::Untranslated),
            "TRANSLATED" => Ok(Self::Translated),
            "REVIEWED" => Ok(Self::Reviewed),
            other => Err(format!("Unknown translation state: '{}'", other)),
        }
    }
}

/// A project language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub id: i64,
    /// BCP 47 tag, unique within the project (e.g. "en", "pt-BR")
    pub tag: String,
    pub name: String,
    /// Whether this is the project's base language
    pub base: bool,
}

/// One exported (key, language) row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationView {
    pub key_id: i64,
    pub key_name: String,
    /// `None` for keys in the default namespace
    pub namespace: Option<String>,
    /// Key description, written as a note or comment by formats that have one
    pub description: Option<String>,
    pub is_plural: bool,
    /// Argument name used in ICU plural syntax
    pub plural_arg_name: Option<String>,
    pub language_tag: String,
    /// `None` when the key has no translation in this language
    pub text: Option<String>,
    pub state: TranslationState,
    /// Raw plural forms keyed by category name, only set for plural keys
    pub plural_forms: Option<BTreeMap<String, String>>,
}

impl TranslationView {
    /// Whether the row carries anything worth exporting
    pub fn has_content(&self) -> bool {
        self.text.is_some() || self.plural_forms.is_some()
    }
}
