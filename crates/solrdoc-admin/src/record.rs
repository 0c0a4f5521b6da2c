//! Bookkeeping rows and the store they live in. There is one row per
//! document, holding its index's hit count and last rebuild time.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AdminError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub guid: Uuid,
    /// Document declaration name.
    pub document: String,
    /// Model label (`app.Model`).
    pub model: String,
    /// Last time the index was updated; `None` after a clear.
    pub updated_at: Option<DateTime<Utc>>,
    /// Documents currently in the index for the model.
    pub hints: u64,
}

impl IndexRecord {
    pub fn new(document: impl Into<String>, model: impl Into<String>, hints: u64) -> Self {
        Self {
            guid: Uuid::new_v4(),
            document: document.into(),
            model: model.into(),
            updated_at: None,
            hints,
        }
    }
}

impl std::fmt::Display for IndexRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}: {}>", self.document, self.hints)
    }
}

/// Persistence of [`IndexRecord`]s, keyed by document name.
pub trait IndexRecordStore: Send + Sync {
    /// Fetch the row for `document`, creating it from `model`/`hints` when
    /// absent. The flag is `true` when the row was created.
    fn get_or_create(&self, document: &str, model: &str, hints: u64) -> Result<(IndexRecord, bool)>;

    /// Overwrite an existing row. Rows only come into being through
    /// [`get_or_create`](Self::get_or_create).
    fn save(&self, record: &IndexRecord) -> Result<()>;

    fn bulk_update(&self, records: &[IndexRecord]) -> Result<()> {
        records.iter().try_for_each(|r| self.save(r))
    }

    /// All rows, ordered by document name.
    fn list(&self) -> Result<Vec<IndexRecord>>;

    /// Rows for the given document names; unknown names are skipped.
    fn select(&self, documents: &[String]) -> Result<Vec<IndexRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| documents.contains(&r.document))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    rows: Mutex<BTreeMap<String, IndexRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, IndexRecord>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl IndexRecordStore for MemoryRecordStore {
    fn get_or_create(&self, document: &str, model: &str, hints: u64) -> Result<(IndexRecord, bool)> {
        let mut rows = self.rows();
        if let Some(existing) = rows.get(document) {
            return Ok((existing.clone(), false));
        }
        let record = IndexRecord::new(document, model, hints);
        rows.insert(document.to_string(), record.clone());
        Ok((record, true))
    }

    fn save(&self, record: &IndexRecord) -> Result<()> {
        match self.rows().get_mut(&record.document) {
            Some(row) => {
                *row = record.clone();
                Ok(())
            }
            None => Err(AdminError::Store(format!("no row for document {:?}", record.document))),
        }
    }

    fn list(&self) -> Result<Vec<IndexRecord>> {
        Ok(self.rows().values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
