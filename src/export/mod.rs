//! Translation export pipeline.
//!
//! # Architecture
//!
//! - `view`: the row model returned by the export query
//! - `params`: options fixed for one export call
//! - `data_provider`: builds and runs the filtered query against a store
//! - `base_provider`: lazy, memoized base-language rows
//! - `exporters`: one file exporter per output format
//! - `factory`: picks the exporter for a format
//! - `service`: the `export` entry point
//!
//! Data flows service -> data provider -> factory -> exporter -> files.

mod base_provider;
mod data_provider;
mod error;
pub mod exporters;
mod factory;
mod file_path;
mod params;
mod plural;
mod service;
mod tree;
mod view;

pub use base_provider::BaseTranslationsProvider;
pub use data_provider::{ExportDataProvider, TranslationQuery, TranslationStore};
pub use error::{ExportError, ExportItemError, ItemErrorKind, Result};
pub use exporters::{ExportOutput, FileExporter};
pub use factory::FileExporterFactory;
pub use file_path::{android_language_tag, FilePathTemplate};
pub use params::{
    ExportFormat, ExportParams, FileLayout, ItemErrorPolicy, MessageFormat,
    DEFAULT_FILE_TEMPLATE, DEFAULT_STRUCTURE_DELIMITER,
};
pub use plural::{PluralCategory, PluralForms};
pub use service::{ExportService, EXPORT_EVENT, EXPORT_EVENT_INTERVAL};
pub use view::{Language, TranslationState, TranslationView};
