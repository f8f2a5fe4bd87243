//! Translation export pipeline: turns a project's translation records into
//! JSON, properties, XLIFF or CSV files.

pub mod config;
pub mod db;
pub mod export;
pub mod output;
pub mod telemetry;

pub use export::{ExportOutput, ExportParams, ExportService};
