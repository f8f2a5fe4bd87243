//! Property tests for exporter output.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;

use translation_export::export::{
    BaseTranslationsProvider, ExportFormat, ExportOutput, ExportParams, FileExporterFactory,
    Language, TranslationState, TranslationView,
};

fn english() -> Language {
    Language {
        id: 1,
        tag: "en".to_string(),
        name: "English".to_string(),
        base: true,
    }
}

fn rows_for(entries: &BTreeMap<String, String>) -> Vec<TranslationView> {
    entries
        .iter()
        .enumerate()
        .map(|(index, (key, text))| TranslationView {
            key_id: index as i64 + 1,
            key_name: key.clone(),
            namespace: None,
            description: None,
            is_plural: false,
            plural_arg_name: None,
            language_tag: "en".to_string(),
            text: Some(text.clone()),
            state: TranslationState::Translated,
            plural_forms: None,
        })
        .collect()
}

fn export(rows: Vec<TranslationView>, params: ExportParams) -> ExportOutput {
    let base = Arc::new(BaseTranslationsProvider::from_rows(rows.clone()));
    let exporter = FileExporterFactory
        .create(rows, Arc::new(params), base, english())
        .expect("Exporter should exist");
    tokio_test::block_on(exporter.produce_files()).expect("Export should succeed")
}

/// Collapse a nested JSON object back into delimited keys
fn flatten_json(value: &Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_json(child, &path, out);
            }
        }
        Value::String(text) => {
            out.insert(prefix.to_string(), text.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

/// Two-segment keys, so no key is a prefix of another
fn key_set() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,6}\\.[a-z]{1,6}", "[ -~]{0,20}", 1..20)
}

proptest! {
    #[test]
    fn nested_json_flattens_back_to_keys(entries in key_set()) {
        let output = export(rows_for(&entries), ExportParams::new(ExportFormat::Json));
        let document: Value = serde_json::from_slice(&output.files["en.json"]).unwrap();

        let mut flattened = BTreeMap::new();
        flatten_json(&document, "", &mut flattened);
        prop_assert_eq!(flattened, entries);
        prop_assert!(output.item_errors.is_empty());
    }

    #[test]
    fn export_output_is_deterministic(entries in key_set()) {
        for format in ExportFormat::ALL {
            let params = ExportParams::new(format);
            let first = export(rows_for(&entries), params.clone());
            let second = export(rows_for(&entries), params);
            prop_assert!(!first.files.is_empty());
            prop_assert_eq!(first, second);
        }
    }
}
