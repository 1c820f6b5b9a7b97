// Copyright 2026 Rankrelay Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-category record buffers that outlive a page view.
//!
//! Records are kept as JSON arrays in a namespaced key-value backend. A merge
//! reads the current array, appends the new batch and writes the whole array
//! back. Merges on the same category are serialized through a per-category
//! lock, which a [`Drain`] also holds from reading the buffer until it is
//! emptied. Writers in other processes sharing the same data directory are
//! not coordinated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use crate::types::{Category, CoreError, CoreResult, RankRecord};

/// Asynchronous key-value persistence backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> CoreResult<Option<Value>>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: Value) -> CoreResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> CoreResult<()>;
}

/// One JSON file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> CoreResult<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(CoreError::Storage(format!("invalid key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> CoreResult<Option<Value>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    CoreError::Storage(format!("corrupt value in {}: {e}", path.display()))
                })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Value) -> CoreResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write-then-rename so a crash never leaves a half-written array.
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(&value)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> CoreResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory backend, used by tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> CoreResult<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> CoreResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CoreResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Result of a merge: the full stored sequence and the batch just appended.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome<R> {
    pub merged: Vec<R>,
    pub inserted: Vec<R>,
}

/// A category buffer taken out under its lock.
///
/// No merge on the category can land while the drain is alive. [`Drain::commit`]
/// empties the buffer; dropping the drain instead leaves it untouched.
pub struct Drain<'a, R> {
    store: &'a AccumulationStore,
    records: Vec<R>,
    _guard: MutexGuard<'a, ()>,
}

impl<R: RankRecord> Drain<'_, R> {
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Empty the buffer, releasing the lock afterwards.
    pub async fn commit(self) -> CoreResult<Vec<R>> {
        self.store.backend.remove(R::CATEGORY.storage_key()).await?;
        tracing::debug!(category = %R::CATEGORY, rows = self.records.len(), "drained records");
        Ok(self.records)
    }
}

/// Category-keyed record buffers over a [`KeyValueStore`].
pub struct AccumulationStore {
    backend: Arc<dyn KeyValueStore>,
    note_lock: Mutex<()>,
    account_lock: Mutex<()>,
}

impl AccumulationStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            note_lock: Mutex::new(()),
            account_lock: Mutex::new(()),
        }
    }

    /// Store backed by JSON files under `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileKeyValueStore::new(dir)))
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    fn lock_for(&self, category: Category) -> &Mutex<()> {
        match category {
            Category::Note => &self.note_lock,
            Category::Account => &self.account_lock,
        }
    }

    /// Append `new_records` to the category buffer, preserving arrival order.
    pub async fn merge<R: RankRecord>(&self, new_records: Vec<R>) -> CoreResult<MergeOutcome<R>> {
        let category = R::CATEGORY;
        let _guard = self.lock_for(category).lock().await;

        let mut merged: Vec<R> = self.read_unlocked(category).await?;
        merged.extend(new_records.iter().cloned());

        self.backend
            .set(category.storage_key(), serde_json::to_value(&merged)?)
            .await?;

        tracing::debug!(
            category = %category,
            inserted = new_records.len(),
            total = merged.len(),
            "merged records"
        );

        Ok(MergeOutcome {
            merged,
            inserted: new_records,
        })
    }

    /// All records of the category, oldest first. Absent buffer reads empty.
    pub async fn read<R: RankRecord>(&self) -> CoreResult<Vec<R>> {
        let category = R::CATEGORY;
        let _guard = self.lock_for(category).lock().await;
        self.read_unlocked(category).await
    }

    /// Raw JSON rows of the category, as they would be transmitted.
    pub async fn read_raw(&self, category: Category) -> CoreResult<Vec<Value>> {
        let _guard = self.lock_for(category).lock().await;
        match self.backend.get(category.storage_key()).await? {
            Some(Value::Array(rows)) => Ok(rows),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(CoreError::Storage(format!(
                "{} buffer is not an array (found {})",
                category,
                json_kind(&other)
            ))),
        }
    }

    /// Number of buffered records in the category.
    pub async fn count(&self, category: Category) -> CoreResult<usize> {
        Ok(self.read_raw(category).await?.len())
    }

    /// Take the category buffer under its lock until the drain is committed
    /// or dropped.
    pub async fn drain<R: RankRecord>(&self) -> CoreResult<Drain<'_, R>> {
        let guard = self.lock_for(R::CATEGORY).lock().await;
        let records = self.read_unlocked(R::CATEGORY).await?;
        Ok(Drain {
            store: self,
            records,
            _guard: guard,
        })
    }

    /// Empty the category buffer.
    pub async fn clear(&self, category: Category) -> CoreResult<()> {
        let _guard = self.lock_for(category).lock().await;
        self.backend.remove(category.storage_key()).await?;
        tracing::debug!(category = %category, "cleared records");
        Ok(())
    }

    async fn read_unlocked<R: RankRecord>(&self, category: Category) -> CoreResult<Vec<R>> {
        match self.backend.get(category.storage_key()).await? {
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                CoreError::Storage(format!("{category} buffer is unreadable: {e}"))
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountRecord, NoteRecord};

    fn note(title: &str) -> NoteRecord {
        NoteRecord {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn titles(records: &[NoteRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_read_absent_is_empty() {
        let store = AccumulationStore::in_memory();
        assert!(store.read::<NoteRecord>().await.unwrap().is_empty());
        assert_eq!(store.count(Category::Account).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_merge_appends_in_order() {
        let store = AccumulationStore::in_memory();
        let first = store.merge(vec![note("a"), note("b")]).await.unwrap();
        assert_eq!(titles(&first.merged), ["a", "b"]);
        assert_eq!(titles(&first.inserted), ["a", "b"]);

        let second = store.merge(vec![note("c")]).await.unwrap();
        assert_eq!(titles(&second.merged), ["a", "b", "c"]);
        assert_eq!(titles(&second.inserted), ["c"]);
    }

    #[tokio::test]
    async fn test_merge_is_associative() {
        let split = AccumulationStore::in_memory();
        split.merge(vec![note("a")]).await.unwrap();
        split.merge(vec![note("b")]).await.unwrap();

        let once = AccumulationStore::in_memory();
        once.merge(vec![note("a"), note("b")]).await.unwrap();

        assert_eq!(
            split.read::<NoteRecord>().await.unwrap(),
            once.read::<NoteRecord>().await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_categories_are_independent() {
        let store = AccumulationStore::in_memory();
        store.merge(vec![note("n")]).await.unwrap();
        store
            .merge(vec![AccountRecord {
                shop_name: "s".into(),
                ..Default::default()
            }])
            .await
            .unwrap();

        store.clear(Category::Note).await.unwrap();
        assert_eq!(store.count(Category::Note).await.unwrap(), 0);
        assert_eq!(store.count(Category::Account).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_merges_lose_nothing() {
        let store = Arc::new(AccumulationStore::in_memory());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.merge(vec![note(&format!("r{i}"))]).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.count(Category::Note).await.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_merge_waits_for_open_drain() {
        let store = Arc::new(AccumulationStore::in_memory());
        store.merge(vec![note("a")]).await.unwrap();

        let drain = store.drain::<NoteRecord>().await.unwrap();
        let merging = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.merge(vec![note("b")]).await.unwrap() }
        });
        tokio::task::yield_now().await;
        assert!(!merging.is_finished());

        assert_eq!(titles(drain.records()), ["a"]);
        drain.commit().await.unwrap();

        let outcome = merging.await.unwrap();
        assert_eq!(titles(&outcome.merged), ["b"]);
        assert_eq!(titles(&store.read::<NoteRecord>().await.unwrap()), ["b"]);
    }

    #[tokio::test]
    async fn test_dropped_drain_keeps_buffer() {
        let store = AccumulationStore::in_memory();
        store.merge(vec![note("a")]).await.unwrap();
        drop(store.drain::<NoteRecord>().await.unwrap());
        assert_eq!(store.count(Category::Note).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = AccumulationStore::open(dir.path());
            store.merge(vec![note("persisted")]).await.unwrap();
        }
        let reopened = AccumulationStore::open(dir.path());
        let records = reopened.read::<NoteRecord>().await.unwrap();
        assert_eq!(titles(&records), ["persisted"]);
        assert!(dir.path().join("xhsNoteRankRows.json").exists());

        reopened.clear(Category::Note).await.unwrap();
        assert!(!dir.path().join("xhsNoteRankRows.json").exists());
        reopened.clear(Category::Note).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_array_buffer_is_a_storage_error() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend
            .set("xhsNoteRankRows", serde_json::json!({"oops": true}))
            .await
            .unwrap();
        let store = AccumulationStore::new(backend);
        assert!(matches!(
            store.read_raw(Category::Note).await,
            Err(CoreError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::new(dir.path());
        assert!(kv.get("../escape").await.is_err());
    }
}
