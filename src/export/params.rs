//! Options that control a single export call.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::error::ExportError;
use super::view::TranslationState;

/// Default output path template
pub const DEFAULT_FILE_TEMPLATE: &str = "{namespace}/{languageTag}.{extension}";

/// Default character sequence splitting key names into tree paths
pub const DEFAULT_STRUCTURE_DELIMITER: &str = ".";

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Json,
    Properties,
    Xliff,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Properties,
        ExportFormat::Xliff,
        ExportFormat::Csv,
    ];

    /// Format identifier used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Properties => "properties",
            Self::Xliff => "xliff",
            Self::Csv => "csv",
        }
    }

    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Properties => "properties",
            Self::Xliff => "xlf",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted || format.extension() == wanted)
            .ok_or_else(|| ExportError::UnsupportedFormat(s.to_string()))
    }
}

/// How plural forms are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    /// `{count, plural, one {...} other {...}}`
    #[default]
    Icu,
    /// One entry per category, named `<key>_<category>`
    PerCategoryKeys,
    /// Only the `other` form
    Plain,
}

impl FromStr for MessageFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "icu" => Ok(Self::Icu),
            "per-category-keys" | "per_category_keys" => Ok(Self::PerCategoryKeys),
            "plain" => Ok(Self::Plain),
            other => Err(ExportError::InvalidParams(format!(
                "Unknown message format: '{}'",
                other
            ))),
        }
    }
}

/// How output is split into files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileLayout {
    /// One file per namespace and language
    #[default]
    PerLanguage,
    /// One file per namespace holding every exported language
    SingleFile,
}

impl fmt::Display for FileLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerLanguage => f.write_str("per-language"),
            Self::SingleFile => f.write_str("single-file"),
        }
    }
}

impl FromStr for FileLayout {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-language" | "per_language" => Ok(Self::PerLanguage),
            "single-file" | "single_file" => Ok(Self::SingleFile),
            other => Err(ExportError::InvalidParams(format!(
                "Unknown file layout: '{}'",
                other
            ))),
        }
    }
}

/// What to do when a single entry cannot be exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemErrorPolicy {
    /// Collect the error and keep exporting
    #[default]
    Skip,
    /// Abort the export on the first item error
    Fail,
}

/// Export configuration, fixed for the duration of one export call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportParams {
    pub format: ExportFormat,
    /// Language tags to export, `None` for every project language
    pub languages: Option<BTreeSet<String>>,
    /// Namespaces to export, `None` for all; `""` selects the default namespace
    pub namespaces: Option<BTreeSet<String>>,
    /// Effective translation states to export, `None` for all
    pub states: Option<BTreeSet<TranslationState>>,
    /// Only keys whose name starts with this prefix
    pub key_prefix: Option<String>,
    /// Only these key ids
    pub key_ids: Option<BTreeSet<i64>>,
    /// Splits key names into nested paths; empty keeps keys flat
    pub structure_delimiter: String,
    pub layout: FileLayout,
    pub file_structure_template: String,
    pub message_format: MessageFormat,
    pub pretty: bool,
    pub item_error_policy: ItemErrorPolicy,
}

impl ExportParams {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            languages: None,
            namespaces: None,
            states: None,
            key_prefix: None,
            key_ids: None,
            structure_delimiter: DEFAULT_STRUCTURE_DELIMITER.to_string(),
            layout: FileLayout::default(),
            file_structure_template: DEFAULT_FILE_TEMPLATE.to_string(),
            message_format: MessageFormat::default(),
            pretty: true,
            item_error_policy: ItemErrorPolicy::default(),
        }
    }

    pub fn with_languages<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = Some(namespaces.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_states<I>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = TranslationState>,
    {
        self.states = Some(states.into_iter().collect());
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_key_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        self.key_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn with_structure_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.structure_delimiter = delimiter.into();
        self
    }

    pub fn with_layout(mut self, layout: FileLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_file_structure_template(mut self, template: impl Into<String>) -> Self {
        self.file_structure_template = template.into();
        self
    }

    pub fn with_message_format(mut self, message_format: MessageFormat) -> Self {
        self.message_format = message_format;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_item_error_policy(mut self, policy: ItemErrorPolicy) -> Self {
        self.item_error_policy = policy;
        self
    }
}

impl Default for ExportParams {
    fn default() -> Self {
        Self::new(ExportFormat::Json)
    }
}
