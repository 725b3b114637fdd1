//! Seams to the persistent stores the decoded data is written into.
//!
//! The stores themselves live outside this crate; the in-memory versions here
//! back the CLI and the tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::TensorDescriptor;
use crate::record::NormalizedRecord;

/// Keyed record storage with upsert semantics.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts `record`, replacing any record with the same `fiction_id`.
    async fn put(&self, record: NormalizedRecord) -> Result<(), StoreError>;
}

/// Integer-keyed storage for decoded tensors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn put(&self, key: u64, tensor: TensorDescriptor) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn put(&self, record: NormalizedRecord) -> Result<(), StoreError> {
        (**self).put(record).await
    }
}

#[async_trait]
impl<S: VectorStore + ?Sized> VectorStore for std::sync::Arc<S> {
    async fn put(&self, key: u64, tensor: TensorDescriptor) -> Result<(), StoreError> {
        (**self).put(key, tensor).await
    }
}

/// In-memory [`RecordStore`] with the secondary lookups a real store indexes.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, NormalizedRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, fiction_id: &str) -> Option<NormalizedRecord> {
        self.records.read().await.get(fiction_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All records, ordered by key.
    pub async fn snapshot(&self) -> Vec<NormalizedRecord> {
        self.records.read().await.values().cloned().collect()
    }

    async fn filter<F>(&self, pred: F) -> Vec<NormalizedRecord>
    where
        F: Fn(&NormalizedRecord) -> bool,
    {
        self.records
            .read()
            .await
            .values()
            .filter(|r| pred(*r))
            .cloned()
            .collect()
    }

    pub async fn find_by_tag(&self, tag: &str) -> Vec<NormalizedRecord> {
        self.filter(|r| r.tags.iter().any(|t| t == tag)).await
    }

    /// Matches against the derived `title_words`, case-insensitively.
    pub async fn find_by_title_word(&self, word: &str) -> Vec<NormalizedRecord> {
        let word = word.to_lowercase();
        self.filter(|r| r.title_words.contains(&word)).await
    }

    pub async fn find_by_label(&self, label: &str) -> Vec<NormalizedRecord> {
        self.filter(|r| r.label == label).await
    }

    /// Records with `min <= rating <= max`.
    pub async fn find_by_rating_range(&self, min: f64, max: f64) -> Vec<NormalizedRecord> {
        self.filter(|r| r.rating >= min && r.rating <= max).await
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: NormalizedRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.fiction_id.clone(), record);
        Ok(())
    }
}

/// In-memory [`VectorStore`].
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    tensors: RwLock<BTreeMap<u64, TensorDescriptor>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: u64) -> Option<TensorDescriptor> {
        self.tensors.read().await.get(&key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tensors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tensors.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn put(&self, key: u64, tensor: TensorDescriptor) -> Result<(), StoreError> {
        self.tensors.write().await.insert(key, tensor);
        Ok(())
    }
}
