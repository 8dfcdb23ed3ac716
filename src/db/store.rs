//! SQLite-backed hierarchical document store.
//!
//! Exposes the primitive operations every feed component is built on:
//! `read`, `write`, `patch`, `delete` and `subscribe`, plus child listing
//! and atomic counter adjustment.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};

use super::paths;
use super::subscription::{Listener, ListenerRegistry, Subscription};
use crate::errors::AppError;

/// A direct child of a collection path.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

/// Document store for all feed data.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    registry: Arc<ListenerRegistry>,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            registry: Arc::new(ListenerRegistry::default()),
        }
    }

    /// Close the underlying pool. Every later call fails with a store error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Generate a fresh key for a new child.
    pub fn push_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    // ==================== READS ====================

    /// Read the document stored exactly at `path`.
    pub async fn read(&self, path: &str) -> Result<Option<Value>, AppError> {
        check_valid(path)?;

        let row = sqlx::query("SELECT value FROM documents WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| parse_value(path, r.get("value"))).transpose()
    }

    /// Read and deserialize the document at `path`.
    pub async fn read_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, AppError> {
        match self.read(path).await? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                AppError::Internal(format!("Malformed document at {}: {}", path, e))
            }),
            None => Ok(None),
        }
    }

    /// Whether a document exists at `path`.
    pub async fn exists(&self, path: &str) -> Result<bool, AppError> {
        check_valid(path)?;

        let row = sqlx::query("SELECT 1 AS present FROM documents WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// List the direct children of a collection path, ordered by key.
    pub async fn list(&self, path: &str) -> Result<Vec<Entry>, AppError> {
        check_valid(path)?;

        let rows = sqlx::query("SELECT key, value FROM documents WHERE parent = ? ORDER BY key")
            .bind(path)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let key: String = row.get("key");
                let value = parse_value(path, row.get("value"))?;
                Ok(Entry { key, value })
            })
            .collect()
    }

    /// List and deserialize the direct children of `path`.
    ///
    /// Children that do not deserialize are skipped with a warning.
    pub async fn list_as<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<(String, T)>, AppError> {
        let entries = self.list(path).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry.value) {
                Ok(item) => Some((entry.key, item)),
                Err(e) => {
                    tracing::warn!("Skipping malformed document {}/{}: {}", path, entry.key, e);
                    None
                }
            })
            .collect())
    }

    /// Every document below `root` whose last segment is `key`, as `(path, value)`.
    pub async fn find_by_key(&self, root: &str, key: &str) -> Result<Vec<(String, Value)>, AppError> {
        check_valid(root)?;
        let (lower, upper) = paths::subtree_bounds(root);

        let rows = sqlx::query(
            "SELECT path, value FROM documents WHERE key = ? AND path > ? AND path < ? ORDER BY path",
        )
        .bind(key)
        .bind(&lower)
        .bind(&upper)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let path: String = row.get("path");
                let value = parse_value(&path, row.get("value"))?;
                Ok((path, value))
            })
            .collect()
    }

    /// Snapshot of `path`: the document itself, or an object assembled from
    /// everything stored below it. `None` when nothing exists.
    pub async fn read_tree(&self, path: &str) -> Result<Option<Value>, AppError> {
        if let Some(value) = self.read(path).await? {
            return Ok(Some(value));
        }

        let (lower, upper) = paths::subtree_bounds(path);
        let rows = sqlx::query(
            "SELECT path, value FROM documents WHERE path > ? AND path < ? ORDER BY path",
        )
        .bind(&lower)
        .bind(&upper)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut root = Map::new();
        for row in &rows {
            let full: String = row.get("path");
            let value = parse_value(&full, row.get("value"))?;
            let relative = &full[lower.len()..];
            insert_at(&mut root, relative, value);
        }

        Ok(Some(Value::Object(root)))
    }

    // ==================== WRITES ====================

    /// Overwrite the document at `path`.
    pub async fn write<T: Serialize>(&self, path: &str, value: &T) -> Result<(), AppError> {
        let (parent, key) = check_path(path)?;
        let raw = serde_json::to_string(value)?;

        sqlx::query(
            r#"INSERT INTO documents (path, parent, key, value, updated_at) VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(path) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(path)
        .bind(parent)
        .bind(key)
        .bind(&raw)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        tracing::debug!(path, "Document written");
        self.notify(path).await;
        Ok(())
    }

    /// Merge `fields` into the document at `path`, creating it when absent.
    ///
    /// A `null` field removes that field from the stored document.
    pub async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError> {
        let (parent, key) = check_path(path)?;

        let patch_raw = serde_json::to_string(&fields)?;
        let initial: Map<String, Value> = fields
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .collect();
        let initial_raw = serde_json::to_string(&initial)?;

        sqlx::query(
            r#"INSERT INTO documents (path, parent, key, value, updated_at) VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(path) DO UPDATE SET value = json_patch(documents.value, ?), updated_at = excluded.updated_at"#,
        )
        .bind(path)
        .bind(parent)
        .bind(key)
        .bind(&initial_raw)
        .bind(Utc::now().timestamp_millis())
        .bind(&patch_raw)
        .execute(&self.pool)
        .await?;

        tracing::debug!(path, "Document patched");
        self.notify(path).await;
        Ok(())
    }

    /// Delete the document at `path` and everything below it.
    ///
    /// Returns the number of documents removed.
    pub async fn delete(&self, path: &str) -> Result<u64, AppError> {
        check_valid(path)?;
        let (lower, upper) = paths::subtree_bounds(path);

        let result =
            sqlx::query("DELETE FROM documents WHERE path = ? OR (path > ? AND path < ?)")
                .bind(path)
                .bind(&lower)
                .bind(&upper)
                .execute(&self.pool)
                .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            tracing::debug!(path, removed, "Documents deleted");
            self.notify(path).await;
        }
        Ok(removed)
    }

    /// Atomically add `delta` to the numeric `field` of the document at `path`,
    /// clamping at zero. A missing field counts as zero.
    ///
    /// Returns `None` without writing anything when the document is absent.
    pub async fn adjust_counter(
        &self,
        path: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<u64>, AppError> {
        check_valid(path)?;
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AppError::Validation(format!("Invalid counter field: {}", field)));
        }
        let json_path = format!("$.{}", field);

        // Single statement, so concurrent adjustments serialize in SQLite.
        let row = sqlx::query(
            r#"UPDATE documents
               SET value = json_set(value, ?, MAX(0, COALESCE(json_extract(value, ?), 0) + ?)),
                   updated_at = ?
               WHERE path = ?
               RETURNING json_extract(value, ?) AS count"#,
        )
        .bind(&json_path)
        .bind(&json_path)
        .bind(delta)
        .bind(Utc::now().timestamp_millis())
        .bind(path)
        .bind(&json_path)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let count: i64 = row.try_get("count")?;
        tracing::debug!(path, field, delta, count, "Counter adjusted");
        self.notify(path).await;
        Ok(Some(count.max(0) as u64))
    }

    // ==================== SUBSCRIPTIONS ====================

    /// Watch `path`. `on_change` receives the current snapshot immediately and
    /// again after every change at, above or below `path`.
    pub async fn subscribe<C, E>(
        &self,
        path: &str,
        on_change: C,
        on_error: E,
    ) -> Result<Subscription, AppError>
    where
        C: Fn(Option<Value>) + Send + Sync + 'static,
        E: Fn(AppError) + Send + Sync + 'static,
    {
        check_valid(path)?;

        let listener = Listener {
            path: path.to_string(),
            on_change: Arc::new(on_change),
            on_error: Arc::new(on_error),
        };
        let id = self.registry.register(listener.clone());
        tracing::debug!(id, path, "Subscription registered");

        match self.read_tree(path).await {
            Ok(snapshot) => (listener.on_change)(snapshot),
            Err(e) => (listener.on_error)(e),
        }

        Ok(Subscription::new(id, path.to_string(), &self.registry))
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    async fn notify(&self, changed: &str) {
        let listeners = self.registry.matching(changed);
        if listeners.is_empty() {
            return;
        }

        let mut snapshots: HashMap<String, Result<Option<Value>, AppError>> = HashMap::new();
        for listener in listeners {
            if !snapshots.contains_key(&listener.path) {
                let snapshot = self.read_tree(&listener.path).await;
                snapshots.insert(listener.path.clone(), snapshot);
            }
            match &snapshots[&listener.path] {
                Ok(snapshot) => (listener.on_change)(snapshot.clone()),
                Err(e) => (listener.on_error)(e.clone()),
            }
        }
    }
}

fn check_valid(path: &str) -> Result<(), AppError> {
    if paths::is_valid(path) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid store path: {}", path)))
    }
}

fn check_path(path: &str) -> Result<(&str, &str), AppError> {
    paths::split(path).ok_or_else(|| AppError::Validation(format!("Invalid store path: {}", path)))
}

fn parse_value(path: &str, raw: String) -> Result<Value, AppError> {
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("Corrupt document at {}: {}", path, e)))
}

fn insert_at(root: &mut Map<String, Value>, relative: &str, value: Value) {
    let mut segments = relative.split('/').peekable();
    let mut node = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            node.insert(segment.to_string(), value);
            return;
        }
        let child = node
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        node = match child {
            Value::Object(map) => map,
            _ => return,
        };
    }
}
