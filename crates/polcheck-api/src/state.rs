//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Policy storage
//!
//! [`PolicyStore`] keeps every policy in an in-memory map ordered by
//! filename. When a Postgres pool is attached, writes go to the database
//! first (in one transaction per batch) and are mirrored into memory only
//! after commit; reads take a fresh snapshot from the database so several
//! replicas see the same policy set.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use polcheck_core::Policy;
use polcheck_extract::{PdfTextExtractor, TextExtractor};
use polcheck_llm::LlmClient;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db;
use crate::middleware::metrics::ApiMetrics;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory store keyed by string, iterated in key
/// order.
///
/// The lock is `parking_lot` and never held across `.await`.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<BTreeMap<String, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: impl Into<String>, value: T) -> Option<T> {
        self.data.write().insert(key.into(), value)
    }

    /// Retrieve a record by key.
    pub fn get(&self, key: &str) -> Option<T> {
        self.data.read().get(key).cloned()
    }

    /// List all records in key order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Run `f` against the map under a single write lock, so a batch of
    /// changes is observed all at once or not at all.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut BTreeMap<String, T>) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Replace the entire contents.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (String, T)>) {
        *self.data.write() = entries.into_iter().collect();
    }

    /// Remove a record by key.
    pub fn remove(&self, key: &str) -> Option<T> {
        self.data.write().remove(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Policy Records -----------------------------------------------------------

/// A stored policy with bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub filename: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolicyRecord {
    pub fn to_policy(&self) -> Policy {
        Policy::new(self.filename.clone(), self.text.clone())
    }
}

/// Policy persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Policy storage: in-memory map, optionally backed by Postgres.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    memory: Store<PolicyRecord>,
    pool: Option<PgPool>,
}

impl PolicyStore {
    /// In-memory only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backed by `pool`. Call [`PolicyStore::hydrate`] to pull existing rows.
    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            memory: Store::new(),
            pool: Some(pool),
        }
    }

    /// Insert or replace one policy.
    pub async fn upsert_policy(
        &self,
        filename: &str,
        text: &str,
    ) -> Result<PolicyRecord, StoreError> {
        let mut records = self
            .upsert_policies(vec![Policy::new(filename, text)])
            .await?;
        // One policy in, one record out.
        Ok(records.remove(0))
    }

    /// Insert or replace a batch of policies atomically.
    ///
    /// Later entries win when the batch repeats a filename.
    pub async fn upsert_policies(
        &self,
        policies: Vec<Policy>,
    ) -> Result<Vec<PolicyRecord>, StoreError> {
        let now = Utc::now();

        if let Some(pool) = &self.pool {
            let mut tx = pool.begin().await?;
            let mut records = Vec::with_capacity(policies.len());
            for policy in &policies {
                records.push(
                    db::policies::upsert(&mut *tx, &policy.filename, &policy.text, now).await?,
                );
            }
            tx.commit().await?;

            self.memory.with_write(|map| {
                for record in &records {
                    map.insert(record.filename.clone(), record.clone());
                }
            });
            return Ok(records);
        }

        let records = self.memory.with_write(|map| {
            policies
                .into_iter()
                .map(|policy| {
                    let created_at = map
                        .get(&policy.filename)
                        .map(|existing| existing.created_at)
                        .unwrap_or(now);
                    let record = PolicyRecord {
                        filename: policy.filename,
                        text: policy.text,
                        created_at,
                        updated_at: now,
                    };
                    map.insert(record.filename.clone(), record.clone());
                    record
                })
                .collect()
        });
        Ok(records)
    }

    /// Snapshot of every stored policy, ordered by filename.
    pub async fn list_policies(&self) -> Result<Vec<PolicyRecord>, StoreError> {
        match &self.pool {
            Some(pool) => Ok(db::policies::list_all(pool).await?),
            None => Ok(self.memory.list()),
        }
    }

    /// Snapshot in the form the evaluators take.
    pub async fn snapshot(&self) -> Result<Vec<Policy>, StoreError> {
        Ok(self
            .list_policies()
            .await?
            .iter()
            .map(PolicyRecord::to_policy)
            .collect())
    }

    /// Delete a policy. Returns whether it existed.
    pub async fn delete_policy(&self, filename: &str) -> Result<bool, StoreError> {
        let in_memory = self.memory.remove(filename).is_some();
        match &self.pool {
            Some(pool) => Ok(db::policies::delete(pool, filename).await?),
            None => Ok(in_memory),
        }
    }

    /// Load every persisted policy into memory. No-op without a pool.
    pub async fn hydrate(&self) -> Result<usize, StoreError> {
        let Some(pool) = &self.pool else {
            return Ok(0);
        };
        let records = db::policies::list_all(pool).await?;
        let count = records.len();
        self.memory
            .replace_all(records.into_iter().map(|r| (r.filename.clone(), r)));
        tracing::info!(count, "hydrated policies from database");
        Ok(count)
    }

    /// Number of policies currently held in memory.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub policies: PolicyStore,
    /// Converts uploaded bytes to policy text.
    pub extractor: Arc<dyn TextExtractor>,
    /// Hosted model client. `None` makes prompt-mode checks return 503.
    pub llm_client: Option<LlmClient>,
    pub db_pool: Option<PgPool>,
    pub metrics: ApiMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("policies", &self.policies.len())
            .field("extractor", &self.extractor.name())
            .field("llm_client", &self.llm_client.as_ref().map(|c| c.model()))
            .field("db_pool", &self.db_pool.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Default configuration, PDF extraction, no model client, no database.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Build state from configuration and an optional model client.
    pub fn with_config(config: AppConfig, llm_client: Option<LlmClient>) -> Self {
        Self {
            config,
            policies: PolicyStore::new(),
            extractor: Arc::new(PdfTextExtractor::new()),
            llm_client,
            db_pool: None,
            metrics: ApiMetrics::new(),
        }
    }

    /// Attach a Postgres pool; policy storage becomes database-backed.
    pub fn with_db_pool(mut self, pool: Option<PgPool>) -> Self {
        if let Some(pool) = &pool {
            self.policies = PolicyStore::with_pool(pool.clone());
        }
        self.db_pool = pool;
        self
    }

    /// Swap the text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_lists_in_key_order() {
        let store: Store<u32> = Store::new();
        store.insert("b.pdf", 2);
        store.insert("a.pdf", 1);
        store.insert("c.pdf", 3);
        assert_eq!(store.list(), vec![1, 2, 3]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.remove("b.pdf"), Some(2));
        assert!(store.get("b.pdf").is_none());
    }

    #[test]
    fn store_clone_shares_data() {
        let a: Store<u32> = Store::new();
        let b = a.clone();
        a.insert("x", 1);
        assert_eq!(b.get("x"), Some(1));
    }

    #[tokio::test]
    async fn upsert_replaces_text_and_keeps_created_at() {
        let store = PolicyStore::new();
        let first = store.upsert_policy("p1.pdf", "old").await.unwrap();
        let second = store.upsert_policy("p1.pdf", "new").await.unwrap();
        assert_eq!(second.text, "new");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn batch_with_repeated_filename_keeps_last() {
        let store = PolicyStore::new();
        let records = store
            .upsert_policies(vec![Policy::new("a.pdf", "one"), Policy::new("a.pdf", "two")])
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot, vec![Policy::new("a.pdf", "two")]);
    }

    #[tokio::test]
    async fn snapshot_is_ordered_by_filename() {
        let store = PolicyStore::new();
        store
            .upsert_policies(vec![Policy::new("z.pdf", "z"), Policy::new("m.pdf", "m")])
            .await
            .unwrap();
        let names: Vec<String> = store
            .snapshot()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.filename)
            .collect();
        assert_eq!(names, vec!["m.pdf", "z.pdf"]);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = PolicyStore::new();
        store.upsert_policy("p.pdf", "text").await.unwrap();
        assert!(store.delete_policy("p.pdf").await.unwrap());
        assert!(!store.delete_policy("p.pdf").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn hydrate_without_pool_is_noop() {
        assert_eq!(PolicyStore::new().hydrate().await.unwrap(), 0);
    }

    #[test]
    fn app_state_debug_omits_secrets() {
        let debug = format!("{:?}", AppState::new());
        assert!(debug.contains("pdf-extract"));
        assert!(debug.contains("llm_client: None"));
    }
}
