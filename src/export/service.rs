use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::base_provider::BaseTranslationsProvider;
use super::data_provider::{ExportDataProvider, TranslationStore};
use super::error::Result;
use super::exporters::ExportOutput;
use super::factory::FileExporterFactory;
use super::params::ExportParams;
use super::view::Language;
use crate::telemetry::{BusinessEvent, OnceInTimePublisher};

/// Business event emitted after a successful export
pub const EXPORT_EVENT: &str = "EXPORT";

/// Minimum time between two export events for the same project
pub const EXPORT_EVENT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Entry point of the export pipeline
pub struct ExportService {
    store: Arc<dyn TranslationStore>,
    factory: FileExporterFactory,
    events: Arc<OnceInTimePublisher>,
}

impl ExportService {
    pub fn new(store: Arc<dyn TranslationStore>, events: Arc<OnceInTimePublisher>) -> Self {
        Self {
            store,
            factory: FileExporterFactory,
            events,
        }
    }

    /// Export a project's translations as files keyed by file name
    pub async fn export(&self, project_id: i64, params: &ExportParams) -> Result<ExportOutput> {
        let started = Instant::now();
        let params = Arc::new(params.clone());
        info!(
            "Exporting project {} as {} ({} layout)",
            project_id, params.format, params.layout
        );

        let base_language = self.store.get_or_assign_base_language(project_id).await?;
        let data = ExportDataProvider::new(self.store.as_ref(), project_id, &params)
            .get_data()
            .await?;
        let row_count = data.len();

        let base_translations = self.base_translations_provider(project_id, &params, &base_language);
        let exporter = self.factory.create(
            data,
            params.clone(),
            Arc::new(base_translations),
            base_language,
        )?;
        let output = exporter.produce_files().await?;

        self.publish_export_event(project_id);

        if !output.item_errors.is_empty() {
            warn!(
                "Export of project {} skipped {} items",
                project_id,
                output.item_errors.len()
            );
        }
        info!(
            "Exported {} rows of project {} into {} files in {:?}",
            row_count,
            project_id,
            output.files.len(),
            started.elapsed()
        );
        Ok(output)
    }

    /// Deferred query for base-language rows, using the same filters as the export
    fn base_translations_provider(
        &self,
        project_id: i64,
        params: &Arc<ExportParams>,
        base_language: &Language,
    ) -> BaseTranslationsProvider {
        let store = self.store.clone();
        let params = params.clone();
        let base_tag = base_language.tag.clone();

        BaseTranslationsProvider::new(move || {
            let store = store.clone();
            let params = params.clone();
            let base_tag = base_tag.clone();
            async move {
                debug!("Loading base translations ({}) for project {}", base_tag, project_id);
                ExportDataProvider::new(store.as_ref(), project_id, &params)
                    .with_language_override([base_tag])
                    .get_data()
                    .await
            }
        })
    }

    fn publish_export_event(&self, project_id: i64) {
        let event = BusinessEvent::new(EXPORT_EVENT, project_id);
        match self
            .events
            .publish_once_in_time(&event, EXPORT_EVENT_INTERVAL)
        {
            Ok(true) => debug!("Published {} event for project {}", EXPORT_EVENT, project_id),
            Ok(false) => {}
            Err(e) => warn!("Telemetry failed for project {}: {}", project_id, e),
        }
    }
}
