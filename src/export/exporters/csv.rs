//! CSV exporter.
//!
//! The per-language layout writes bilingual `key,<base>,<target>` files using
//! the base-language rows. The single-file layout writes one column per
//! exported language, base language first.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tracing::debug;

use super::{
    any_text, bilingual_entries, expand_entries, group_by_namespace,
    group_by_namespace_and_language, insert_file, render_base_entries, render_row, ExportInput,
    ExportOutput, FileExporter, ItemErrors,
};
use crate::export::error::Result;
use crate::export::file_path::FilePathTemplate;
use crate::export::params::{ExportFormat, FileLayout};
use crate::export::view::TranslationView;

pub struct CsvExporter {
    input: ExportInput,
}

impl CsvExporter {
    pub fn new(input: ExportInput) -> Self {
        Self { input }
    }

    async fn per_language(
        &self,
        template: &FilePathTemplate,
        errors: &mut ItemErrors,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let params = &self.input.params;
        let base_tag = self.input.base_language.tag.as_str();
        let base_rows = self.input.base_translations.get().await?;
        let base_entries = render_base_entries(base_rows, params.message_format, errors)?;

        let mut files = BTreeMap::new();
        for ((namespace, tag), rows) in group_by_namespace_and_language(&self.input.data) {
            let mut content = String::new();
            push_record(&mut content, ["key", base_tag, tag]);
            for entry in bilingual_entries(
                &rows,
                &base_entries,
                params.message_format,
                any_text,
                errors,
            )? {
                push_record(
                    &mut content,
                    [
                        entry.name.as_str(),
                        entry.source.as_deref().unwrap_or_default(),
                        entry.target.as_deref().unwrap_or_default(),
                    ],
                );
            }
            let path = template.render(namespace, Some(tag));
            insert_file(&mut files, path, content.into_bytes())?;
        }
        Ok(files)
    }

    fn single_file(
        &self,
        template: &FilePathTemplate,
        errors: &mut ItemErrors,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        let params = &self.input.params;
        let base_tag = self.input.base_language.tag.as_str();

        let mut files = BTreeMap::new();
        for (namespace, rows) in group_by_namespace(&self.input.data) {
            let mut tags: Vec<&str> = rows.iter().map(|row| row.language_tag.as_str()).collect();
            tags.sort_by_key(|tag| (*tag != base_tag, *tag));
            tags.dedup();

            // rows arrive ordered by key id, so consecutive rows share a key
            let mut keys: Vec<(&TranslationView, HashMap<&str, Vec<(String, String)>>)> =
                Vec::new();
            for row in rows {
                let rendered = errors
                    .check(row, render_row(row, params.message_format))?
                    .flatten();
                let entries = rendered
                    .map(|rendered| expand_entries(&row.key_name, rendered))
                    .unwrap_or_default();
                match keys.last_mut() {
                    Some((first, per_language)) if first.key_id == row.key_id => {
                        per_language.insert(row.language_tag.as_str(), entries);
                    }
                    _ => keys.push((row, HashMap::from([(row.language_tag.as_str(), entries)]))),
                }
            }

            let mut content = String::new();
            push_record(&mut content, std::iter::once("key").chain(tags.iter().copied()));
            for (key, per_language) in &keys {
                let mut names: Vec<&str> = Vec::new();
                for tag in &tags {
                    for (name, _) in per_language.get(tag).into_iter().flatten() {
                        if !names.contains(&name.as_str()) {
                            names.push(name);
                        }
                    }
                }
                if names.is_empty() {
                    names.push(&key.key_name);
                }

                for name in names {
                    let cells = tags.iter().map(|tag| {
                        per_language
                            .get(tag)
                            .and_then(|entries| entries.iter().find(|(n, _)| n == name))
                            .map(|(_, text)| text.as_str())
                            .unwrap_or_default()
                    });
                    push_record(&mut content, std::iter::once(name).chain(cells));
                    errors.succeed_entry();
                }
            }
            let path = template.render(namespace, None);
            insert_file(&mut files, path, content.into_bytes())?;
        }
        Ok(files)
    }
}

#[async_trait]
impl FileExporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    async fn produce_files(&self) -> Result<ExportOutput> {
        let params = &self.input.params;
        let template = FilePathTemplate::for_params(params)?;
        if self.input.data.is_empty() {
            return Ok(ExportOutput::default());
        }
        let mut errors = ItemErrors::new(params.item_error_policy);

        let files = match params.layout {
            FileLayout::PerLanguage => self.per_language(&template, &mut errors).await?,
            FileLayout::SingleFile => self.single_file(&template, &mut errors)?,
        };

        debug!("CSV exporter produced {} files", files.len());
        errors.finish(files)
    }
}

fn push_record<'a>(content: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    let line = cells
        .into_iter()
        .map(escape_csv_value)
        .collect::<Vec<_>>()
        .join(",");
    content.push_str(&line);
    content.push('\n');
}

/// Quote a value when it contains a separator, quote or line break
pub fn escape_csv_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
