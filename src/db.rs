use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info, warn};

use crate::export::{
    ExportError, Language, TranslationQuery, TranslationState, TranslationStore, TranslationView,
};

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        base_language_id INTEGER,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS languages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id),
        tag TEXT NOT NULL,
        name TEXT NOT NULL,
        UNIQUE (project_id, tag)
    )",
    "CREATE TABLE IF NOT EXISTS namespaces (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id),
        name TEXT NOT NULL,
        UNIQUE (project_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS translation_keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES projects(id),
        namespace_id INTEGER REFERENCES namespaces(id),
        name TEXT NOT NULL,
        description TEXT,
        is_plural INTEGER NOT NULL DEFAULT 0,
        plural_arg_name TEXT,
        UNIQUE (project_id, namespace_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS translations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key_id INTEGER NOT NULL REFERENCES translation_keys(id),
        language_id INTEGER NOT NULL REFERENCES languages(id),
        text TEXT,
        plural_forms TEXT,
        state TEXT NOT NULL DEFAULT 'TRANSLATED',
        UNIQUE (key_id, language_id)
    )",
];

const SELECT_TRANSLATIONS: &str = "SELECT k.id, k.name, ns.name, k.description, k.is_plural, \
     k.plural_arg_name, l.tag, t.text, t.plural_forms, \
     COALESCE(t.state, 'UNTRANSLATED') \
     FROM translation_keys k \
     JOIN languages l ON l.project_id = k.project_id \
     LEFT JOIN namespaces ns ON ns.id = k.namespace_id \
     LEFT JOIN translations t ON t.key_id = k.id AND t.language_id = l.id \
     WHERE k.project_id = ";

/// SQLite-backed translation store
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and create the schema if it does not exist yet
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context(format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);

        // every connection to an in-memory database opens a separate database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context(format!("Failed to open database at {}", database_url))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .context("Failed to create schema")?;
        }

        info!("Connected to translation database");
        Ok(Self { pool })
    }

    /// Fresh in-memory database
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn create_project(&self, name: &str) -> Result<i64> {
        let id = sqlx::query("INSERT INTO projects (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to create project")?
            .last_insert_rowid();
        Ok(id)
    }

    pub async fn add_language(&self, project_id: i64, tag: &str, name: &str) -> Result<i64> {
        let id = sqlx::query("INSERT INTO languages (project_id, tag, name) VALUES (?, ?, ?)")
            .bind(project_id)
            .bind(tag)
            .bind(name)
            .execute(&self.pool)
            .await
            .context(format!("Failed to add language {}", tag))?
            .last_insert_rowid();
        Ok(id)
    }

    pub async fn set_base_language(&self, project_id: i64, language_id: i64) -> Result<()> {
        sqlx::query("UPDATE projects SET base_language_id = ? WHERE id = ?")
            .bind(language_id)
            .bind(project_id)
            .execute(&self.pool)
            .await
            .context("Failed to set base language")?;
        Ok(())
    }

    async fn namespace_id(&self, project_id: i64, namespace: Option<&str>) -> Result<Option<i64>> {
        let Some(name) = namespace.filter(|n| !n.is_empty()) else {
            return Ok(None);
        };

        sqlx::query("INSERT OR IGNORE INTO namespaces (project_id, name) VALUES (?, ?)")
            .bind(project_id)
            .bind(name)
            .execute(&self.pool)
            .await
            .context("Failed to create namespace")?;

        let id: i64 = sqlx::query_scalar("SELECT id FROM namespaces WHERE project_id = ? AND name = ?")
            .bind(project_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .context("Failed to look up namespace")?;
        Ok(Some(id))
    }

    /// Add a key, creating its namespace on first use
    pub async fn add_key(&self, project_id: i64, namespace: Option<&str>, name: &str) -> Result<i64> {
        let namespace_id = self.namespace_id(project_id, namespace).await?;
        let id = sqlx::query(
            "INSERT INTO translation_keys (project_id, namespace_id, name) VALUES (?, ?, ?)",
        )
        .bind(project_id)
        .bind(namespace_id)
        .bind(name)
        .execute(&self.pool)
        .await
        .context(format!("Failed to add key {}", name))?
        .last_insert_rowid();
        Ok(id)
    }

    pub async fn add_plural_key(
        &self,
        project_id: i64,
        namespace: Option<&str>,
        name: &str,
        arg_name: &str,
    ) -> Result<i64> {
        let id = self.add_key(project_id, namespace, name).await?;
        sqlx::query("UPDATE translation_keys SET is_plural = 1, plural_arg_name = ? WHERE id = ?")
            .bind(arg_name)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to mark key as plural")?;
        Ok(id)
    }

    pub async fn set_key_description(&self, key_id: i64, description: &str) -> Result<()> {
        sqlx::query("UPDATE translation_keys SET description = ? WHERE id = ?")
            .bind(description)
            .bind(key_id)
            .execute(&self.pool)
            .await
            .context("Failed to set key description")?;
        Ok(())
    }

    /// Insert or replace the text of a key in one language
    pub async fn set_translation(
        &self,
        key_id: i64,
        language_id: i64,
        text: &str,
        state: TranslationState,
    ) -> Result<()> {
        self.upsert_translation(key_id, language_id, Some(text), None, state)
            .await
    }

    /// Insert or replace the plural forms of a key in one language
    pub async fn set_plural_translation(
        &self,
        key_id: i64,
        language_id: i64,
        forms: &BTreeMap<String, String>,
        state: TranslationState,
    ) -> Result<()> {
        let forms = serde_json::to_string(forms).context("Failed to encode plural forms")?;
        self.upsert_translation(key_id, language_id, None, Some(&forms), state)
            .await
    }

    async fn upsert_translation(
        &self,
        key_id: i64,
        language_id: i64,
        text: Option<&str>,
        plural_forms: Option<&str>,
        state: TranslationState,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO translations (key_id, language_id, text, plural_forms, state)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (key_id, language_id)
             DO UPDATE SET text = excluded.text, plural_forms = excluded.plural_forms, state = excluded.state",
        )
        .bind(key_id)
        .bind(language_id)
        .bind(text)
        .bind(plural_forms)
        .bind(state.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to save translation")?;
        Ok(())
    }

    fn build_query(query: &TranslationQuery) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(SELECT_TRANSLATIONS);
        builder.push_bind(query.project_id);

        if let Some(tags) = &query.languages {
            builder.push(" AND l.tag IN (");
            let mut list = builder.separated(", ");
            for tag in tags {
                list.push_bind(tag.clone());
            }
            builder.push(")");
        }

        if let Some(namespaces) = &query.namespaces {
            let named: Vec<&String> = namespaces.iter().filter(|n| !n.is_empty()).collect();
            let include_default = namespaces.contains("");
            builder.push(" AND (");
            if named.is_empty() {
                builder.push("0");
            } else {
                builder.push("ns.name IN (");
                let mut list = builder.separated(", ");
                for name in named {
                    list.push_bind(name.clone());
                }
                builder.push(")");
            }
            if include_default {
                builder.push(" OR k.namespace_id IS NULL");
            }
            builder.push(")");
        }

        if let Some(states) = &query.states {
            builder.push(" AND COALESCE(t.state, 'UNTRANSLATED') IN (");
            let mut list = builder.separated(", ");
            for state in states {
                list.push_bind(state.as_str());
            }
            builder.push(")");
        }

        if let Some(prefix) = &query.key_prefix {
            builder.push(" AND substr(k.name, 1, length(");
            builder.push_bind(prefix.clone());
            builder.push(")) = ");
            builder.push_bind(prefix.clone());
        }

        if let Some(ids) = &query.key_ids {
            builder.push(" AND k.id IN (");
            let mut list = builder.separated(", ");
            for id in ids {
                list.push_bind(*id);
            }
            builder.push(")");
        }

        builder.push(" ORDER BY k.id, l.tag");
        builder
    }

    fn view_from_row(row: &SqliteRow) -> Result<TranslationView, ExportError> {
        let is_plural: bool = row.try_get(4)?;
        let state: String = row.try_get(9)?;
        let state = TranslationState::from_str(&state)
            .map_err(|e| ExportError::Storage(sqlx::Error::Decode(e.into())))?;

        let key_id: i64 = row.try_get(0)?;
        let key_name: String = row.try_get(1)?;

        // undecodable forms become an empty set, reported per item by the exporters
        let plural_forms = match row.try_get::<Option<String>, _>(8)? {
            Some(raw) if is_plural => Some(serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Stored plural forms of key {} are invalid: {}", key_name, e);
                BTreeMap::new()
            })),
            _ => None,
        };

        Ok(TranslationView {
            key_id,
            key_name,
            namespace: row.try_get(2)?,
            description: row.try_get(3)?,
            is_plural,
            plural_arg_name: row.try_get(5)?,
            language_tag: row.try_get(6)?,
            text: row.try_get(7)?,
            state,
            plural_forms,
        })
    }

    async fn language_by_id(&self, language_id: i64) -> Result<Option<Language>, ExportError> {
        let language = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, tag, name FROM languages WHERE id = ?",
        )
        .bind(language_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|(id, tag, name)| Language {
            id,
            tag,
            name,
            base: true,
        });
        Ok(language)
    }
}

#[async_trait]
impl TranslationStore for Database {
    async fn fetch_translations(
        &self,
        query: &TranslationQuery,
    ) -> Result<Vec<TranslationView>, ExportError> {
        let rows = Self::build_query(query)
            .build()
            .fetch_all(&self.pool)
            .await?;
        debug!("Translation query returned {} rows", rows.len());
        rows.iter().map(Self::view_from_row).collect()
    }

    async fn get_or_assign_base_language(&self, project_id: i64) -> Result<Language, ExportError> {
        let base_language_id: Option<i64> =
            sqlx::query_scalar("SELECT base_language_id FROM projects WHERE id = ?")
                .bind(project_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| ExportError::project_not_found(project_id))?;

        if let Some(id) = base_language_id {
            if let Some(language) = self.language_by_id(id).await? {
                return Ok(language);
            }
        }

        let first: Option<i64> =
            sqlx::query_scalar("SELECT id FROM languages WHERE project_id = ? ORDER BY id LIMIT 1")
                .bind(project_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(first) = first else {
            return Err(ExportError::base_language_not_found(project_id));
        };

        // a concurrent caller may have assigned one in the meantime
        sqlx::query(
            "UPDATE projects SET base_language_id = ?
             WHERE id = ? AND (base_language_id IS NULL
                OR base_language_id NOT IN (SELECT id FROM languages))",
        )
        .bind(first)
        .bind(project_id)
        .execute(&self.pool)
        .await?;

        let assigned: Option<i64> =
            sqlx::query_scalar("SELECT base_language_id FROM projects WHERE id = ?")
                .bind(project_id)
                .fetch_one(&self.pool)
                .await?;
        info!("Assigned base language {:?} to project {}", assigned, project_id);

        match assigned {
            Some(id) => self
                .language_by_id(id)
                .await?
                .ok_or_else(|| ExportError::base_language_not_found(project_id)),
            None => Err(ExportError::base_language_not_found(project_id)),
        }
    }
}
