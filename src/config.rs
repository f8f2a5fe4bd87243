use std::collections::BTreeSet;

use anyhow::{Context, Result};

use crate::export::{
    ExportFormat, ExportParams, FileLayout, ItemErrorPolicy, MessageFormat, TranslationState,
    DEFAULT_FILE_TEMPLATE, DEFAULT_STRUCTURE_DELIMITER,
};

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,

    // Export target
    pub project_id: i64,
    pub output_dir: String,

    // Export options
    pub format: ExportFormat,
    pub languages: Option<BTreeSet<String>>,
    pub namespaces: Option<BTreeSet<String>>,
    pub states: Option<BTreeSet<TranslationState>>,
    pub key_prefix: Option<String>,
    pub structure_delimiter: String,
    pub message_format: MessageFormat,
    pub layout: FileLayout,
    pub file_structure_template: String,
    pub pretty: bool,
    pub strict: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Storage
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://translations.db".to_string()),

            // Export target
            project_id: std::env::var("EXPORT_PROJECT_ID")
                .context("EXPORT_PROJECT_ID not set")?
                .parse()
                .context("EXPORT_PROJECT_ID must be a number")?,
            output_dir: std::env::var("EXPORT_OUTPUT_DIR").unwrap_or_else(|_| "export".to_string()),

            // Export options
            format: std::env::var("EXPORT_FORMAT")
                .unwrap_or_else(|_| "json".to_string())
                .parse()?,
            languages: list_var("EXPORT_LANGUAGES"),
            namespaces: list_var("EXPORT_NAMESPACES"),
            states: list_var("EXPORT_STATES")
                .map(|states| {
                    states
                        .iter()
                        .map(|s| s.parse::<TranslationState>().map_err(anyhow::Error::msg))
                        .collect::<Result<BTreeSet<_>>>()
                })
                .transpose()?,
            key_prefix: std::env::var("EXPORT_KEY_PREFIX").ok().filter(|p| !p.is_empty()),
            // empty is meaningful here: it keeps keys flat
            structure_delimiter: std::env::var("EXPORT_STRUCTURE_DELIMITER")
                .unwrap_or_else(|_| DEFAULT_STRUCTURE_DELIMITER.to_string()),
            message_format: std::env::var("EXPORT_MESSAGE_FORMAT")
                .ok()
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or_default(),
            layout: std::env::var("EXPORT_LAYOUT")
                .ok()
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or_default(),
            file_structure_template: std::env::var("EXPORT_FILE_TEMPLATE")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILE_TEMPLATE.to_string()),
            pretty: bool_var("EXPORT_PRETTY", true),
            strict: bool_var("EXPORT_STRICT", false),
        })
    }

    /// Export parameters described by this configuration
    pub fn export_params(&self) -> ExportParams {
        ExportParams {
            format: self.format,
            languages: self.languages.clone(),
            namespaces: self.namespaces.clone(),
            states: self.states.clone(),
            key_prefix: self.key_prefix.clone(),
            key_ids: None,
            structure_delimiter: self.structure_delimiter.clone(),
            layout: self.layout,
            file_structure_template: self.file_structure_template.clone(),
            message_format: self.message_format,
            pretty: self.pretty,
            item_error_policy: if self.strict {
                ItemErrorPolicy::Fail
            } else {
                ItemErrorPolicy::Skip
            },
        }
    }
}

/// Comma-separated list; unset means no filter
fn list_var(name: &str) -> Option<BTreeSet<String>> {
    std::env::var(name).ok().map(|value| {
        value
            .split(',')
            .map(str::trim)
            .map(str::to_string)
            .collect()
    })
}

fn bool_var(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
