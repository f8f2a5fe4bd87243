//! End-to-end tests for the export pipeline against an in-memory database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use translation_export::db::Database;
use translation_export::export::{
    ExportError, ExportFormat, ExportParams, ExportService, FileLayout, Language, MessageFormat,
    TranslationQuery, TranslationState, TranslationStore, TranslationView,
};
use translation_export::telemetry::{
    BusinessEvent, BusinessEventPublisher, OnceInTimePublisher, TelemetryError,
};

// ==================== Test Helpers ====================

/// Store wrapper counting translation queries
struct CountingStore {
    inner: Database,
    fetches: AtomicUsize,
}

#[async_trait]
impl TranslationStore for CountingStore {
    async fn fetch_translations(
        &self,
        query: &TranslationQuery,
    ) -> Result<Vec<TranslationView>, ExportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_translations(query).await
    }

    async fn get_or_assign_base_language(&self, project_id: i64) -> Result<Language, ExportError> {
        self.inner.get_or_assign_base_language(project_id).await
    }
}

#[derive(Default)]
struct RecordingPublisher {
    events: std::sync::Mutex<Vec<BusinessEvent>>,
}

impl BusinessEventPublisher for RecordingPublisher {
    fn publish(&self, event: &BusinessEvent) -> Result<(), TelemetryError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct BrokenPublisher;

impl BusinessEventPublisher for BrokenPublisher {
    fn publish(&self, event: &BusinessEvent) -> Result<(), TelemetryError> {
        Err(TelemetryError::Publish {
            event: event.name.clone(),
            reason: "collector unavailable".to_string(),
        })
    }
}

struct Fixture {
    store: Arc<CountingStore>,
    publisher: Arc<RecordingPublisher>,
    service: ExportService,
    project: i64,
}

impl Fixture {
    fn fetches(&self) -> usize {
        self.store.fetches.load(Ordering::SeqCst)
    }

    fn events(&self) -> usize {
        self.publisher.events.lock().unwrap().len()
    }
}

/// greeting.hello = {en: Hello, fr: Bonjour}, greeting.bye = {en: Bye, fr: missing}
async fn greeting_fixture() -> Fixture {
    let db = Database::in_memory().await.expect("Failed to create database");
    let project = db.create_project("greetings").await.unwrap();
    let en = db.add_language(project, "en", "English").await.unwrap();
    let fr = db.add_language(project, "fr", "French").await.unwrap();

    let hello = db.add_key(project, None, "greeting.hello").await.unwrap();
    let bye = db.add_key(project, None, "greeting.bye").await.unwrap();
    db.set_translation(hello, en, "Hello", TranslationState::Translated)
        .await
        .unwrap();
    db.set_translation(hello, fr, "Bonjour", TranslationState::Translated)
        .await
        .unwrap();
    db.set_translation(bye, en, "Bye", TranslationState::Translated)
        .await
        .unwrap();

    let store = Arc::new(CountingStore {
        inner: db,
        fetches: AtomicUsize::new(0),
    });
    let publisher = Arc::new(RecordingPublisher::default());
    let events = Arc::new(OnceInTimePublisher::new(publisher.clone()));
    let service = ExportService::new(store.clone(), events);

    Fixture {
        store,
        publisher,
        service,
        project,
    }
}

fn json_file(files: &BTreeMap<String, Vec<u8>>, name: &str) -> Value {
    serde_json::from_slice(files.get(name).expect("File should exist")).expect("Valid JSON")
}

fn text_file(files: &BTreeMap<String, Vec<u8>>, name: &str) -> String {
    String::from_utf8(files.get(name).expect("File should exist").clone()).unwrap()
}

// ==================== Scenario Tests ====================

#[tokio::test]
async fn test_json_per_language_omits_untranslated() {
    let fixture = greeting_fixture().await;

    let output = fixture
        .service
        .export(fixture.project, &ExportParams::new(ExportFormat::Json))
        .await
        .expect("Export should succeed");

    assert_eq!(
        json_file(&output.files, "fr.json"),
        json!({"greeting": {"hello": "Bonjour"}})
    );
    assert_eq!(
        json_file(&output.files, "en.json"),
        json!({"greeting": {"hello": "Hello", "bye": "Bye"}})
    );
    assert_eq!(fixture.fetches(), 1, "JSON never loads base translations");
}

#[tokio::test]
async fn test_csv_uses_base_translations_once() {
    let fixture = greeting_fixture().await;
    let params = ExportParams::new(ExportFormat::Csv).with_languages(["fr"]);

    let output = fixture
        .service
        .export(fixture.project, &params)
        .await
        .expect("Export should succeed");

    assert_eq!(
        output.files.keys().cloned().collect::<Vec<_>>(),
        vec!["fr.csv"]
    );
    let csv = text_file(&output.files, "fr.csv");
    assert!(csv.contains("greeting.bye,Bye,\n"), "got: {}", csv);
    assert_eq!(fixture.fetches(), 2, "One primary and one base query");
}

#[tokio::test]
async fn test_xliff_sources_from_base_language() {
    let fixture = greeting_fixture().await;
    let params = ExportParams::new(ExportFormat::Xliff)
        .with_languages(["en", "fr"])
        .with_layout(FileLayout::SingleFile);

    let output = fixture
        .service
        .export(fixture.project, &params)
        .await
        .expect("Export should succeed");

    let document = text_file(&output.files, "translations.xlf");
    assert!(document.contains("source-language=\"en\" target-language=\"fr\""));
    assert!(document.contains("<source xml:space=\"preserve\">Bye</source>"));
    assert_eq!(fixture.fetches(), 2);
}

#[tokio::test]
async fn test_unknown_language_yields_empty_export() {
    let fixture = greeting_fixture().await;
    let params = ExportParams::new(ExportFormat::Json).with_languages(["xx"]);

    let output = fixture
        .service
        .export(fixture.project, &params)
        .await
        .expect("Unknown language is not an error");

    assert!(output.files.is_empty());
    assert!(output.item_errors.is_empty());
}

#[tokio::test]
async fn test_unknown_language_ignores_broken_base_plurals() {
    let fixture = greeting_fixture().await;
    let db = &fixture.store.inner;
    let en = db.get_or_assign_base_language(fixture.project).await.unwrap().id;
    let items = db
        .add_plural_key(fixture.project, None, "items", "count")
        .await
        .unwrap();
    db.set_plural_translation(
        items,
        en,
        &BTreeMap::from([("one".to_string(), "# item".to_string())]),
        TranslationState::Translated,
    )
    .await
    .unwrap();

    for format in [ExportFormat::Csv, ExportFormat::Xliff] {
        let params = ExportParams::new(format).with_languages(["xx"]);
        let output = fixture
            .service
            .export(fixture.project, &params)
            .await
            .expect("Unknown language is not an error");
        assert!(output.files.is_empty(), "{} export should be empty", format);
        assert!(output.item_errors.is_empty());
    }
}

#[tokio::test]
async fn test_template_without_namespace_cannot_merge_namespaces() {
    let fixture = greeting_fixture().await;
    let db = &fixture.store.inner;
    let en = db.get_or_assign_base_language(fixture.project).await.unwrap().id;
    let cart = db
        .add_key(fixture.project, Some("shop"), "cart")
        .await
        .unwrap();
    db.set_translation(cart, en, "Cart", TranslationState::Translated)
        .await
        .unwrap();

    let params = ExportParams::new(ExportFormat::Json)
        .with_languages(["en"])
        .with_file_structure_template("{languageTag}.{extension}");
    let result = fixture.service.export(fixture.project, &params).await;
    assert!(matches!(result, Err(ExportError::InvalidParams(_))));

    let params = ExportParams::new(ExportFormat::Csv)
        .with_layout(FileLayout::SingleFile)
        .with_file_structure_template("translations.{extension}");
    let result = fixture.service.export(fixture.project, &params).await;
    assert!(matches!(result, Err(ExportError::InvalidParams(_))));
}

#[tokio::test]
async fn test_missing_project_is_not_found() {
    let fixture = greeting_fixture().await;

    let result = fixture
        .service
        .export(404, &ExportParams::new(ExportFormat::Json))
        .await;

    assert!(matches!(result, Err(ExportError::NotFound { .. })));
    assert_eq!(fixture.events(), 0, "Failed exports emit no event");
}

#[tokio::test]
async fn test_properties_single_file_layout_fails() {
    let fixture = greeting_fixture().await;
    let params = ExportParams::new(ExportFormat::Properties).with_layout(FileLayout::SingleFile);

    let result = fixture.service.export(fixture.project, &params).await;
    assert!(matches!(result, Err(ExportError::UnsupportedLayout { .. })));
}

#[tokio::test]
async fn test_plural_key_with_invalid_forms_is_reported() {
    let fixture = greeting_fixture().await;
    let db = &fixture.store.inner;
    let en = db.get_or_assign_base_language(fixture.project).await.unwrap().id;
    let items = db
        .add_plural_key(fixture.project, Some("shop"), "items", "count")
        .await
        .unwrap();
    let broken = db
        .add_plural_key(fixture.project, Some("shop"), "broken", "count")
        .await
        .unwrap();
    db.set_plural_translation(
        items,
        en,
        &BTreeMap::from([
            ("one".to_string(), "# item".to_string()),
            ("other".to_string(), "# items".to_string()),
        ]),
        TranslationState::Reviewed,
    )
    .await
    .unwrap();
    db.set_plural_translation(
        broken,
        en,
        &BTreeMap::from([("one".to_string(), "# thing".to_string())]),
        TranslationState::Reviewed,
    )
    .await
    .unwrap();

    let params = ExportParams::new(ExportFormat::Json)
        .with_namespaces(["shop"])
        .with_languages(["en"])
        .with_message_format(MessageFormat::Icu);
    let output = fixture
        .service
        .export(fixture.project, &params)
        .await
        .expect("Partial export should succeed");

    assert_eq!(
        json_file(&output.files, "shop/en.json"),
        json!({"items": "{count, plural, one {# item} other {# items}}"})
    );
    assert_eq!(output.item_errors.len(), 1);
    assert_eq!(output.item_errors[0].key_name, "broken");
}

// ==================== Telemetry Tests ====================

#[tokio::test]
async fn test_export_event_once_per_day() {
    let fixture = greeting_fixture().await;
    let params = ExportParams::new(ExportFormat::Json);

    for _ in 0..3 {
        fixture
            .service
            .export(fixture.project, &params)
            .await
            .expect("Export should succeed");
    }

    let events = fixture.publisher.events.lock().unwrap().clone();
    assert_eq!(events, vec![BusinessEvent::new("EXPORT", fixture.project)]);
}

#[tokio::test]
async fn test_telemetry_failure_does_not_fail_export() {
    let db = Database::in_memory().await.unwrap();
    let project = db.create_project("p").await.unwrap();
    let en = db.add_language(project, "en", "English").await.unwrap();
    let key = db.add_key(project, None, "title").await.unwrap();
    db.set_translation(key, en, "Title", TranslationState::Translated)
        .await
        .unwrap();

    let events = Arc::new(OnceInTimePublisher::new(Arc::new(BrokenPublisher)));
    let service = ExportService::new(Arc::new(db), events);

    let output = service
        .export(project, &ExportParams::new(ExportFormat::Properties))
        .await
        .expect("Telemetry errors are swallowed");
    assert_eq!(text_file(&output.files, "en.properties"), "title=Title\n");
}

// ==================== Determinism Tests ====================

#[tokio::test]
async fn test_repeated_exports_are_byte_identical() {
    let fixture = greeting_fixture().await;

    for format in ExportFormat::ALL {
        let params = ExportParams::new(format);
        let first = fixture.service.export(fixture.project, &params).await.unwrap();
        let second = fixture.service.export(fixture.project, &params).await.unwrap();
        assert_eq!(first, second, "{} export should be deterministic", format);
    }
}
