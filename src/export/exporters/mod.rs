//! File exporters, one per output format.
//!
//! Every exporter consumes the rows of one export call and produces a map
//! from file name to file bytes. Shared pieces live here: grouping rows into
//! files, plural rendering into output entries, and item error bookkeeping.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use super::base_provider::BaseTranslationsProvider;
use super::error::{ExportError, ExportItemError, ItemErrorKind, Result};
use super::params::{ExportFormat, ExportParams, ItemErrorPolicy, MessageFormat};
use super::plural::{render_plural, RenderedText};
use super::view::{Language, TranslationView};

pub mod csv;
pub mod json;
pub mod properties;
pub mod xliff;

pub use self::csv::CsvExporter;
pub use self::json::JsonExporter;
pub use self::properties::PropertiesExporter;
pub use self::xliff::XliffExporter;

/// Files produced by one export plus the items that could not be exported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOutput {
    pub files: BTreeMap<String, Vec<u8>>,
    pub item_errors: Vec<ExportItemError>,
}

/// Everything an exporter needs to produce its files
#[derive(Debug, Clone)]
pub struct ExportInput {
    pub data: Vec<TranslationView>,
    pub params: Arc<ExportParams>,
    pub base_translations: Arc<BaseTranslationsProvider>,
    pub base_language: Language,
}

/// Strategy for one output format
#[async_trait]
pub trait FileExporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    /// Produce the output files
    ///
    /// Calling this repeatedly on the same exporter yields identical bytes.
    async fn produce_files(&self) -> Result<ExportOutput>;
}

/// Rows of one output file: namespace, then language tag
pub(crate) type FileGroups<'a> = BTreeMap<(Option<&'a str>, &'a str), Vec<&'a TranslationView>>;

/// Group rows per (namespace, language), keeping row order inside each group
pub(crate) fn group_by_namespace_and_language(rows: &[TranslationView]) -> FileGroups<'_> {
    let mut groups: FileGroups<'_> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.namespace.as_deref(), row.language_tag.as_str()))
            .or_default()
            .push(row);
    }
    groups
}

/// Group rows per namespace, keeping row order inside each group
pub(crate) fn group_by_namespace(
    rows: &[TranslationView],
) -> BTreeMap<Option<&str>, Vec<&TranslationView>> {
    let mut groups: BTreeMap<Option<&str>, Vec<&TranslationView>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.namespace.as_deref()).or_default().push(row);
    }
    groups
}

/// Add an output file, failing when the template maps two groups to one name
pub(crate) fn insert_file(
    files: &mut BTreeMap<String, Vec<u8>>,
    path: String,
    content: Vec<u8>,
) -> Result<()> {
    match files.entry(path) {
        Entry::Occupied(entry) => Err(ExportError::InvalidParams(format!(
            "File structure template maps more than one file to '{}'",
            entry.key()
        ))),
        Entry::Vacant(entry) => {
            entry.insert(content);
            Ok(())
        }
    }
}

/// Text check for formats that can encode any text
pub(crate) fn any_text(_: &str) -> std::result::Result<(), ItemErrorKind> {
    Ok(())
}

/// Render a row's content, `Ok(None)` when the row is untranslated
pub(crate) fn render_row(
    row: &TranslationView,
    message_format: MessageFormat,
) -> std::result::Result<Option<RenderedText>, ItemErrorKind> {
    match (&row.plural_forms, &row.text) {
        (Some(forms), _) if row.is_plural => {
            render_plural(forms, row.plural_arg_name.as_deref(), message_format).map(Some)
        }
        (_, Some(text)) => Ok(Some(RenderedText::Single(text.clone()))),
        _ => Ok(None),
    }
}

/// Output entries for a rendered row as (entry name, text)
pub(crate) fn expand_entries(key_name: &str, rendered: RenderedText) -> Vec<(String, String)> {
    match rendered {
        RenderedText::Single(text) => vec![(key_name.to_string(), text)],
        RenderedText::PerCategory(forms) => forms
            .into_iter()
            .map(|(category, text)| (format!("{}_{}", key_name, category), text))
            .collect(),
    }
}

/// Pair source and target entries by entry name, source order first
pub(crate) fn pair_entries(
    key_name: &str,
    source: Vec<(String, String)>,
    target: Vec<(String, String)>,
) -> Vec<(String, Option<String>, Option<String>)> {
    if source.is_empty() && target.is_empty() {
        return vec![(key_name.to_string(), None, None)];
    }

    let mut target: Vec<(String, Option<String>)> =
        target.into_iter().map(|(name, text)| (name, Some(text))).collect();
    let mut pairs = Vec::with_capacity(source.len().max(target.len()));

    for (name, source_text) in source {
        let target_text = target
            .iter_mut()
            .find(|(target_name, _)| *target_name == name)
            .and_then(|(_, text)| text.take());
        pairs.push((name, Some(source_text), target_text));
    }
    for (name, text) in target {
        if let Some(text) = text {
            pairs.push((name, None, Some(text)));
        }
    }
    pairs
}

/// One row of a bilingual file
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BilingualEntry<'a> {
    pub(crate) name: String,
    pub(crate) source: Option<String>,
    pub(crate) target: Option<String>,
    pub(crate) description: Option<&'a str>,
}

/// Render base rows once, keyed by key id
pub(crate) fn render_base_entries(
    base_rows: &[TranslationView],
    message_format: MessageFormat,
    errors: &mut ItemErrors,
) -> Result<HashMap<i64, Vec<(String, String)>>> {
    let mut entries = HashMap::with_capacity(base_rows.len());
    for row in base_rows {
        let rendered = errors.check(row, render_row(row, message_format))?.flatten();
        let expanded = rendered
            .map(|rendered| expand_entries(&row.key_name, rendered))
            .unwrap_or_default();
        entries.insert(row.key_id, expanded);
    }
    Ok(entries)
}

/// Join target rows with base entries, one entry per key (or plural category)
///
/// Every target row is kept; a missing translation leaves `target` empty.
/// Entries whose texts fail `check_text` are reported instead of written.
pub(crate) fn bilingual_entries<'a>(
    rows: &[&'a TranslationView],
    base_entries: &HashMap<i64, Vec<(String, String)>>,
    message_format: MessageFormat,
    check_text: fn(&str) -> std::result::Result<(), ItemErrorKind>,
    errors: &mut ItemErrors,
) -> Result<Vec<BilingualEntry<'a>>> {
    let mut entries = Vec::with_capacity(rows.len());
    for &row in rows {
        let Some(rendered) = errors.check(row, render_row(row, message_format))? else {
            continue;
        };
        let target = rendered
            .map(|rendered| expand_entries(&row.key_name, rendered))
            .unwrap_or_default();
        let source = base_entries.get(&row.key_id).cloned().unwrap_or_default();

        for (name, source, target) in pair_entries(&row.key_name, source, target) {
            let checked = [
                Some(name.as_str()),
                source.as_deref(),
                target.as_deref(),
                row.description.as_deref(),
            ]
            .into_iter()
            .flatten()
            .try_for_each(check_text);
            if let Err(kind) = checked {
                errors.fail_entry(row, &name, kind)?;
                continue;
            }

            errors.succeed_entry();
            entries.push(BilingualEntry {
                name,
                source,
                target,
                description: row.description.as_deref(),
            });
        }
    }
    Ok(entries)
}

/// Collects item errors according to the configured policy
#[derive(Debug)]
pub(crate) struct ItemErrors {
    policy: ItemErrorPolicy,
    succeeded: usize,
    errors: Vec<ExportItemError>,
}

impl ItemErrors {
    pub(crate) fn new(policy: ItemErrorPolicy) -> Self {
        Self {
            policy,
            succeeded: 0,
            errors: Vec::new(),
        }
    }

    /// Unwrap a row-level outcome, recording the error if there is one
    pub(crate) fn check<T>(
        &mut self,
        row: &TranslationView,
        outcome: std::result::Result<T, ItemErrorKind>,
    ) -> Result<Option<T>> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(kind) => {
                self.fail_entry(row, &row.key_name, kind)?;
                Ok(None)
            }
        }
    }

    /// Record an error for an entry name derived from `row`
    pub(crate) fn fail_entry(
        &mut self,
        row: &TranslationView,
        entry_name: &str,
        kind: ItemErrorKind,
    ) -> Result<()> {
        let error = ExportItemError::new(entry_name, &row.language_tag, kind);
        tracing::debug!("Skipping export item: {}", error);
        match self.policy {
            ItemErrorPolicy::Fail => Err(ExportError::ItemFailed(error)),
            // base rows are rendered again for the base-language file
            ItemErrorPolicy::Skip if self.errors.contains(&error) => Ok(()),
            ItemErrorPolicy::Skip => {
                self.errors.push(error);
                Ok(())
            }
        }
    }

    /// Count an entry that was written
    pub(crate) fn succeed_entry(&mut self) {
        self.succeeded += 1;
    }

    /// Build the output, failing when nothing could be exported
    pub(crate) fn finish(self, files: BTreeMap<String, Vec<u8>>) -> Result<ExportOutput> {
        let failed = self.errors.len();
        if failed > 0 && self.succeeded == 0 {
            return Err(ExportError::AllItemsFailed {
                count: failed,
                errors: self.errors,
            });
        }
        Ok(ExportOutput {
            files,
            item_errors: self.errors,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::export::view::TranslationState;

    pub(crate) fn language(tag: &str, base: bool) -> Language {
        Language {
            id: 0,
            tag: tag.to_string(),
            name: tag.to_string(),
            base,
        }
    }

    pub(crate) fn view(key_id: i64, key: &str, tag: &str, text: Option<&str>) -> TranslationView {
        TranslationView {
            key_id,
            key_name: key.to_string(),
            namespace: None,
            description: None,
            is_plural: false,
            plural_arg_name: None,
            language_tag: tag.to_string(),
            text: text.map(str::to_string),
            state: if text.is_some() {
                TranslationState::Translated
            } else {
                TranslationState::Untranslated
            },
            plural_forms: None,
        }
    }

    pub(crate) fn plural_view(
        key_id: i64,
        key: &str,
        tag: &str,
        forms: &[(&str, &str)],
    ) -> TranslationView {
        TranslationView {
            is_plural: true,
            plural_arg_name: Some("count".to_string()),
            plural_forms: Some(
                forms
                    .iter()
                    .map(|(c, t)| (c.to_string(), t.to_string()))
                    .collect(),
            ),
            ..view(key_id, key, tag, None)
        }
    }

    /// Greeting fixture: hello translated everywhere, bye missing in French
    pub(crate) fn greeting_rows() -> Vec<TranslationView> {
        vec![
            view(1, "greeting.hello", "en", Some("Hello")),
            view(1, "greeting.hello", "fr", Some("Bonjour")),
            view(2, "greeting.bye", "en", Some("Bye")),
            view(2, "greeting.bye", "fr", None),
        ]
    }

    pub(crate) fn input(data: Vec<TranslationView>, params: ExportParams) -> ExportInput {
        let base_rows: Vec<TranslationView> = data
            .iter()
            .filter(|row| row.language_tag == "en")
            .cloned()
            .collect();
        ExportInput {
            data,
            params: Arc::new(params),
            base_translations: Arc::new(BaseTranslationsProvider::from_rows(base_rows)),
            base_language: language("en", true),
        }
    }

    pub(crate) fn file_text(output: &ExportOutput, name: &str) -> String {
        let bytes = output
            .files
            .get(name)
            .unwrap_or_else(|| panic!("Missing file {}: {:?}", name, output.files.keys()));
        String::from_utf8(bytes.clone()).expect("Output should be UTF-8")
    }
}
