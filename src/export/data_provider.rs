//! Retrieval of the rows an export works on.
//!
//! [`ExportDataProvider`] turns [`ExportParams`] into a [`TranslationQuery`]
//! and runs it against a [`TranslationStore`]. Stores must return one row per
//! (key, language) for every matching key in every selected language, ordered
//! by key id and then language tag. Keys without a stored translation come
//! back with `text: None` and state `Untranslated`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::debug;

use super::error::Result;
use super::params::ExportParams;
use super::view::{Language, TranslationState, TranslationView};

/// Filters for one translation query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationQuery {
    pub project_id: i64,
    pub languages: Option<BTreeSet<String>>,
    /// `""` stands for the default namespace
    pub namespaces: Option<BTreeSet<String>>,
    pub states: Option<BTreeSet<TranslationState>>,
    pub key_prefix: Option<String>,
    pub key_ids: Option<BTreeSet<i64>>,
}

impl TranslationQuery {
    /// Whether any filter is guaranteed to match nothing
    pub fn matches_nothing(&self) -> bool {
        self.languages.as_ref().is_some_and(BTreeSet::is_empty)
            || self.namespaces.as_ref().is_some_and(BTreeSet::is_empty)
            || self.states.as_ref().is_some_and(BTreeSet::is_empty)
            || self.key_ids.as_ref().is_some_and(BTreeSet::is_empty)
    }
}

/// Storage collaborator used by the export pipeline
#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Run a filtered translation query
    async fn fetch_translations(&self, query: &TranslationQuery) -> Result<Vec<TranslationView>>;

    /// Resolve the project's base language, assigning one if the project has none
    async fn get_or_assign_base_language(&self, project_id: i64) -> Result<Language>;
}

/// Runs the export query for one project
pub struct ExportDataProvider<'a> {
    store: &'a dyn TranslationStore,
    project_id: i64,
    params: &'a ExportParams,
    language_override: Option<BTreeSet<String>>,
}

impl<'a> ExportDataProvider<'a> {
    pub fn new(store: &'a dyn TranslationStore, project_id: i64, params: &'a ExportParams) -> Self {
        Self {
            store,
            project_id,
            params,
            language_override: None,
        }
    }

    /// Replace the language filter from the params entirely
    pub fn with_language_override<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.language_override = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Build the query for the current params and override
    pub fn query(&self) -> TranslationQuery {
        let languages = match &self.language_override {
            Some(tags) => Some(tags.clone()),
            None => self.params.languages.clone(),
        };

        TranslationQuery {
            project_id: self.project_id,
            languages,
            namespaces: self.params.namespaces.clone(),
            states: self.params.states.clone(),
            key_prefix: self.params.key_prefix.clone().filter(|p| !p.is_empty()),
            key_ids: self.params.key_ids.clone(),
        }
    }

    /// Fetch the rows for export
    pub async fn get_data(&self) -> Result<Vec<TranslationView>> {
        let query = self.query();
        if query.matches_nothing() {
            debug!(
                "Export query for project {} has an empty filter, skipping",
                self.project_id
            );
            return Ok(Vec::new());
        }

        let rows = self.store.fetch_translations(&query).await?;
        debug!(
            "Fetched {} translation rows for project {} (languages: {:?})",
            rows.len(),
            self.project_id,
            query.languages
        );
        Ok(rows)
    }
}
