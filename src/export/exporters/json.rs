//! Nested JSON exporter.
//!
//! Key names are split on the structure delimiter into nested objects.
//! Untranslated keys are omitted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{
    expand_entries, group_by_namespace, group_by_namespace_and_language, insert_file, render_row,
    ExportInput, ExportOutput, FileExporter, ItemErrors,
};
use crate::export::error::Result;
use crate::export::file_path::FilePathTemplate;
use crate::export::params::{ExportFormat, FileLayout};
use crate::export::tree::KeyTree;
use crate::export::view::TranslationView;

pub struct JsonExporter {
    input: ExportInput,
}

impl JsonExporter {
    pub fn new(input: ExportInput) -> Self {
        Self { input }
    }

    /// Add every translated row to `tree`
    fn fill_tree<'a>(
        &self,
        tree: &mut KeyTree,
        rows: impl IntoIterator<Item = &'a TranslationView>,
        errors: &mut ItemErrors,
    ) -> Result<()> {
        let message_format = self.input.params.message_format;
        for row in rows {
            let Some(rendered) = errors.check(row, render_row(row, message_format))?.flatten()
            else {
                continue;
            };
            for (name, text) in expand_entries(&row.key_name, rendered) {
                match tree.insert(&name, Value::String(text)) {
                    Ok(()) => errors.succeed_entry(),
                    Err(kind) => errors.fail_entry(row, &name, kind)?,
                }
            }
        }
        Ok(())
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        let bytes = if self.input.params.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }
}

#[async_trait]
impl FileExporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    async fn produce_files(&self) -> Result<ExportOutput> {
        let params = &self.input.params;
        let template = FilePathTemplate::for_params(params)?;
        let mut errors = ItemErrors::new(params.item_error_policy);
        let mut files = BTreeMap::new();

        match params.layout {
            FileLayout::PerLanguage => {
                for ((namespace, tag), rows) in group_by_namespace_and_language(&self.input.data) {
                    let mut tree = KeyTree::new(&params.structure_delimiter);
                    self.fill_tree(&mut tree, rows, &mut errors)?;
                    let path = template.render(namespace, Some(tag));
                    insert_file(&mut files, path, self.serialize(&tree.into_value())?)?;
                }
            }
            FileLayout::SingleFile => {
                for (namespace, rows) in group_by_namespace(&self.input.data) {
                    let mut per_language: BTreeMap<&str, Vec<&TranslationView>> = BTreeMap::new();
                    for row in rows {
                        per_language.entry(row.language_tag.as_str()).or_default().push(row);
                    }

                    let mut bundle = serde_json::Map::new();
                    for (tag, rows) in per_language {
                        let mut tree = KeyTree::new(&params.structure_delimiter);
                        self.fill_tree(&mut tree, rows, &mut errors)?;
                        bundle.insert(tag.to_string(), tree.into_value());
                    }
                    let path = template.render(namespace, None);
                    insert_file(&mut files, path, self.serialize(&Value::Object(bundle))?)?;
                }
            }
        }

        debug!("JSON exporter produced {} files", files.len());
        errors.finish(files)
    }
}
