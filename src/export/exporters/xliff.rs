//! XLIFF 1.2 exporter.
//!
//! Every key of the target language becomes a `trans-unit`. The source text
//! comes from the base language; untranslated keys keep their source and get
//! no `<target>`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::debug;

use super::{
    bilingual_entries, group_by_namespace, group_by_namespace_and_language, insert_file,
    render_base_entries, BilingualEntry, ExportInput, ExportOutput, FileExporter, ItemErrors,
};
use crate::export::error::{ItemErrorKind, Result};
use crate::export::file_path::FilePathTemplate;
use crate::export::params::{ExportFormat, FileLayout};
use crate::export::view::TranslationView;

const XLIFF_NAMESPACE: &str = "urn:oasis:names:tc:xliff:document:1.2";

/// `original` attribute for keys without a namespace
const DEFAULT_ORIGINAL: &str = "translations";

pub struct XliffExporter {
    input: ExportInput,
}

/// One `<file>` element
struct XliffFile<'a> {
    original: &'a str,
    target_language: &'a str,
    units: Vec<BilingualEntry<'a>>,
}

impl XliffExporter {
    pub fn new(input: ExportInput) -> Self {
        Self { input }
    }

    fn render_document(&self, files: &[XliffFile<'_>]) -> String {
        let source_language = escape_xml(&self.input.base_language.tag);
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(out, "<xliff xmlns=\"{}\" version=\"1.2\">", XLIFF_NAMESPACE);

        for file in files {
            let _ = writeln!(
                out,
                "  <file original=\"{}\" datatype=\"plaintext\" source-language=\"{}\" target-language=\"{}\">",
                escape_xml(file.original),
                source_language,
                escape_xml(file.target_language)
            );
            out.push_str("    <body>\n");
            for unit in &file.units {
                let _ = writeln!(out, "      <trans-unit id=\"{}\">", escape_xml(&unit.name));
                let _ = writeln!(
                    out,
                    "        <source xml:space=\"preserve\">{}</source>",
                    escape_xml(unit.source.as_deref().unwrap_or_default())
                );
                if let Some(target) = &unit.target {
                    let _ = writeln!(
                        out,
                        "        <target xml:space=\"preserve\">{}</target>",
                        escape_xml(target)
                    );
                }
                if let Some(note) = unit.description.filter(|d| !d.is_empty()) {
                    let _ = writeln!(out, "        <note>{}</note>", escape_xml(note));
                }
                out.push_str("      </trans-unit>\n");
            }
            out.push_str("    </body>\n");
            out.push_str("  </file>\n");
        }

        out.push_str("</xliff>\n");
        out
    }
}

#[async_trait]
impl FileExporter for XliffExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xliff
    }

    async fn produce_files(&self) -> Result<ExportOutput> {
        let params = &self.input.params;
        let template = FilePathTemplate::for_params(params)?;
        if self.input.data.is_empty() {
            return Ok(ExportOutput::default());
        }
        let mut errors = ItemErrors::new(params.item_error_policy);

        let base_rows = self.input.base_translations.get().await?;
        let base_entries = render_base_entries(base_rows, params.message_format, &mut errors)?;

        let mut files = BTreeMap::new();
        match params.layout {
            FileLayout::PerLanguage => {
                for ((namespace, tag), rows) in group_by_namespace_and_language(&self.input.data) {
                    let units = bilingual_entries(
                        &rows,
                        &base_entries,
                        params.message_format,
                        check_xml_text,
                        &mut errors,
                    )?;
                    let document = self.render_document(&[XliffFile {
                        original: namespace.unwrap_or(DEFAULT_ORIGINAL),
                        target_language: tag,
                        units,
                    }]);
                    let path = template.render(namespace, Some(tag));
                    insert_file(&mut files, path, document.into_bytes())?;
                }
            }
            FileLayout::SingleFile => {
                for (namespace, rows) in group_by_namespace(&self.input.data) {
                    let mut per_language: BTreeMap<&str, Vec<&TranslationView>> = BTreeMap::new();
                    for row in rows {
                        per_language.entry(row.language_tag.as_str()).or_default().push(row);
                    }

                    let mut xliff_files = Vec::with_capacity(per_language.len());
                    for (tag, rows) in per_language {
                        xliff_files.push(XliffFile {
                            original: namespace.unwrap_or(DEFAULT_ORIGINAL),
                            target_language: tag,
                            units: bilingual_entries(
                                &rows,
                                &base_entries,
                                params.message_format,
                                check_xml_text,
                                &mut errors,
                            )?,
                        });
                    }
                    let document = self.render_document(&xliff_files);
                    let path = template.render(namespace, None);
                    insert_file(&mut files, path, document.into_bytes())?;
                }
            }
        }

        debug!("XLIFF exporter produced {} files", files.len());
        errors.finish(files)
    }
}

/// Reject characters outside the XML 1.0 `Char` production
fn check_xml_text(text: &str) -> std::result::Result<(), ItemErrorKind> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(ItemErrorKind::UnrepresentableCharacter(c)),
        None => Ok(()),
    }
}

pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Escape text for XML content and attribute values
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            // parsers normalize a literal carriage return to a line feed
            '\r' => out.push_str("&#13;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
