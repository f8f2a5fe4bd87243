//! Exporter selection.

use std::sync::Arc;

use super::base_provider::BaseTranslationsProvider;
use super::error::{ExportError, Result};
use super::exporters::{
    CsvExporter, ExportInput, FileExporter, JsonExporter, PropertiesExporter, XliffExporter,
};
use super::params::{ExportFormat, ExportParams};
use super::view::{Language, TranslationView};

type ExporterConstructor = fn(ExportInput) -> Box<dyn FileExporter>;

fn json(input: ExportInput) -> Box<dyn FileExporter> {
    Box::new(JsonExporter::new(input))
}

fn properties(input: ExportInput) -> Box<dyn FileExporter> {
    Box::new(PropertiesExporter::new(input))
}

fn xliff(input: ExportInput) -> Box<dyn FileExporter> {
    Box::new(XliffExporter::new(input))
}

fn csv(input: ExportInput) -> Box<dyn FileExporter> {
    Box::new(CsvExporter::new(input))
}

/// Registered exporters keyed by format
static EXPORTERS: &[(ExportFormat, ExporterConstructor)] = &[
    (ExportFormat::Json, json),
    (ExportFormat::Properties, properties),
    (ExportFormat::Xliff, xliff),
    (ExportFormat::Csv, csv),
];

/// Builds the exporter for an export's format
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExporterFactory;

impl FileExporterFactory {
    pub fn create(
        &self,
        data: Vec<TranslationView>,
        params: Arc<ExportParams>,
        base_translations: Arc<BaseTranslationsProvider>,
        base_language: Language,
    ) -> Result<Box<dyn FileExporter>> {
        let constructor = EXPORTERS
            .iter()
            .find(|(format, _)| *format == params.format)
            .map(|(_, constructor)| *constructor)
            .ok_or_else(|| ExportError::UnsupportedFormat(params.format.to_string()))?;

        Ok(constructor(ExportInput {
            data,
            params,
            base_translations,
            base_language,
        }))
    }
}
