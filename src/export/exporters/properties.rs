//! Java `.properties` exporter.
//!
//! Keys stay flat. Files are written as UTF-8; untranslated keys are omitted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use super::{
    expand_entries, group_by_namespace_and_language, insert_file, render_row, ExportInput,
    ExportOutput, FileExporter, ItemErrors,
};
use crate::export::error::{ExportError, Result};
use crate::export::file_path::FilePathTemplate;
use crate::export::params::{ExportFormat, FileLayout};

pub struct PropertiesExporter {
    input: ExportInput,
}

impl PropertiesExporter {
    pub fn new(input: ExportInput) -> Self {
        Self { input }
    }
}

#[async_trait]
impl FileExporter for PropertiesExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Properties
    }

    async fn produce_files(&self) -> Result<ExportOutput> {
        let params = &self.input.params;
        if params.layout != FileLayout::PerLanguage {
            return Err(ExportError::UnsupportedLayout {
                format: ExportFormat::Properties,
                layout: params.layout,
            });
        }

        let template = FilePathTemplate::for_params(params)?;
        let mut errors = ItemErrors::new(params.item_error_policy);
        let mut files = BTreeMap::new();

        for ((namespace, tag), rows) in group_by_namespace_and_language(&self.input.data) {
            let mut content = String::new();
            for row in rows {
                let Some(rendered) = errors
                    .check(row, render_row(row, params.message_format))?
                    .flatten()
                else {
                    continue;
                };

                if let Some(description) = row.description.as_deref().filter(|d| !d.is_empty()) {
                    // a lone '\r' also ends a line for properties readers
                    for line in description.lines().flat_map(|line| line.split('\r')) {
                        content.push_str("# ");
                        content.push_str(line);
                        content.push('\n');
                    }
                }
                for (name, text) in expand_entries(&row.key_name, rendered) {
                    content.push_str(&escape_key(&name));
                    content.push('=');
                    content.push_str(&escape_value(&text));
                    content.push('\n');
                    errors.succeed_entry();
                }
            }
            let path = template.render(namespace, Some(tag));
            insert_file(&mut files, path, content.into_bytes())?;
        }

        debug!("Properties exporter produced {} files", files.len());
        errors.finish(files)
    }
}

fn escape_char(c: char, out: &mut String) -> bool {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{000C}' => out.push_str("\\f"),
        _ => return false,
    }
    true
}

/// Escape a key: separators, comment markers and spaces are backslashed
pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if escape_char(c, &mut out) {
            continue;
        }
        if matches!(c, ' ' | '=' | ':' | '#' | '!') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a value: leading whitespace would otherwise be dropped by readers
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut leading = true;
    for c in value.chars() {
        if escape_char(c, &mut out) {
            leading = false;
            continue;
        }
        if leading && c == ' ' {
            out.push_str("\\ ");
            continue;
        }
        leading = false;
        out.push(c);
    }
    out
}
