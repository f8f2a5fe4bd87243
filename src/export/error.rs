use std::fmt;

use thiserror::Error;

use super::params::{ExportFormat, FileLayout};

/// Errors that abort an export call
#[derive(Error, Debug)]
pub enum ExportError {
    /// Project or base language could not be resolved
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// No exporter is registered for the requested format
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// The exporter cannot produce the requested file layout
    #[error("Format {format} does not support the {layout} layout")]
    UnsupportedLayout {
        format: ExportFormat,
        layout: FileLayout,
    },

    #[error("Invalid export parameters: {0}")]
    InvalidParams(String),

    /// A single item failed and the strict item policy is active
    #[error("Export item failed: {0}")]
    ItemFailed(ExportItemError),

    /// Every exportable item failed
    #[error("All {count} export items failed")]
    AllItemsFailed {
        count: usize,
        errors: Vec<ExportItemError>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExportError {
    pub fn project_not_found(project_id: i64) -> Self {
        Self::NotFound {
            entity: "Project",
            id: project_id.to_string(),
        }
    }

    pub fn base_language_not_found(project_id: i64) -> Self {
        Self::NotFound {
            entity: "Base language of project",
            id: project_id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Why a single key could not be represented in the target format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemErrorKind {
    /// Plural data was present but had no forms
    EmptyPluralForms,
    /// A plural form used a category name outside the CLDR set
    UnknownPluralCategory(String),
    /// Plural data lacked the mandatory `other` form
    MissingOtherPluralForm,
    /// The key path collides with another key in a nested structure
    KeyPathConflict { conflicting_key: String },
    /// The key name is empty after splitting or trimming
    EmptyKeyName,
    /// Two raw category names resolve to the same category
    DuplicatePluralCategory(String),
    /// The text holds a character the output format cannot encode
    UnrepresentableCharacter(char),
}

impl fmt::Display for ItemErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPluralForms => write!(f, "plural data has no forms"),
            Self::UnknownPluralCategory(category) => {
                write!(f, "unknown plural category '{}'", category)
            }
            Self::MissingOtherPluralForm => write!(f, "plural data has no 'other' form"),
            Self::KeyPathConflict { conflicting_key } => {
                write!(f, "key path conflicts with key '{}'", conflicting_key)
            }
            Self::EmptyKeyName => write!(f, "key name is empty"),
            Self::DuplicatePluralCategory(category) => {
                write!(f, "plural category '{}' is defined more than once", category)
            }
            Self::UnrepresentableCharacter(c) => {
                write!(f, "character U+{:04X} cannot be written in this format", *c as u32)
            }
        }
    }
}

/// A recoverable failure for one (key, language) entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{key_name} [{language_tag}]: {kind}")]
pub struct ExportItemError {
    pub key_name: String,
    pub language_tag: String,
    pub kind: ItemErrorKind,
}

impl ExportItemError {
    pub fn new(key_name: &str, language_tag: &str, kind: ItemErrorKind) -> Self {
        Self {
            key_name: key_name.to_string(),
            language_tag: language_tag.to_string(),
            kind,
        }
    }
}
