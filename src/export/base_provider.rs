//! Lazy access to base-language rows.
//!
//! Only bilingual formats need the base text for every key, so the query is
//! deferred until an exporter asks for it and runs at most once per provider.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::OnceCell;

use super::error::Result;
use super::view::TranslationView;

type FetchFn = Box<dyn Fn() -> BoxFuture<'static, Result<Vec<TranslationView>>> + Send + Sync>;

/// Memoizing thunk over the base-language query
pub struct BaseTranslationsProvider {
    fetch: FetchFn,
    rows: OnceCell<Vec<TranslationView>>,
}

impl BaseTranslationsProvider {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<TranslationView>>> + Send + 'static,
    {
        Self {
            fetch: Box::new(move || fetch().boxed()),
            rows: OnceCell::new(),
        }
    }

    /// Provider over rows that are already loaded
    pub fn from_rows(rows: Vec<TranslationView>) -> Self {
        Self {
            fetch: Box::new(|| async { Ok(Vec::new()) }.boxed()),
            rows: OnceCell::new_with(Some(rows)),
        }
    }

    /// Base rows, running the query on first use
    ///
    /// A failed query is not cached, so a later call retries it.
    pub async fn get(&self) -> Result<&[TranslationView]> {
        let rows = self.rows.get_or_try_init(|| (self.fetch)()).await?;
        Ok(rows.as_slice())
    }

    /// Whether the query has already run
    pub fn is_loaded(&self) -> bool {
        self.rows.initialized()
    }
}

impl std::fmt::Debug for BaseTranslationsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseTranslationsProvider")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
