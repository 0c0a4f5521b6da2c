//! Admin actions over selected bookkeeping rows: clear, rebuild, update.
//!
//! Every action swallows its error into an [`ActionMessage`] so the caller
//! (the HTTP layer, a CLI) can show it; nothing is retried.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use solrdoc_core::{IndexRegistry, ModelMeta, SearchBackend, SearchQuery};
use tracing::{error, info};

use crate::error::{AdminError, Result};
use crate::record::{IndexRecord, IndexRecordStore};
use crate::source::RecordSource;

/// Columns shown for bookkeeping rows.
pub const LIST_DISPLAY: [&str; 4] = ["document", "model", "hints", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Error,
}

/// Outcome of one admin action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl ActionMessage {
    fn info(text: &str) -> Self {
        Self {
            level: MessageLevel::Info,
            text: text.to_string(),
        }
    }

    fn error(prefix: &str, err: &AdminError) -> Self {
        Self {
            level: MessageLevel::Error,
            text: format!("{prefix}: {err}"),
        }
    }
}

pub struct IndexAdmin<'a> {
    registry: &'a IndexRegistry,
    backends: &'a [Arc<dyn SearchBackend>],
    source: &'a dyn RecordSource,
    store: &'a dyn IndexRecordStore,
}

impl<'a> IndexAdmin<'a> {
    pub fn new(
        registry: &'a IndexRegistry,
        backends: &'a [Arc<dyn SearchBackend>],
        source: &'a dyn RecordSource,
        store: &'a dyn IndexRecordStore,
    ) -> Self {
        Self {
            registry,
            backends,
            source,
            store,
        }
    }

    /// Rows for the given document names.
    pub fn select(&self, documents: &[String]) -> Result<Vec<IndexRecord>> {
        self.store.select(documents)
    }

    pub fn clear_indexes(&self, mut selected: Vec<IndexRecord>) -> ActionMessage {
        match self.clear(&mut selected) {
            Ok(()) => ActionMessage::info("Successfully cleared"),
            Err(err) => {
                error!(%err, "clearing indexes failed");
                ActionMessage::error("Clearing error occured", &err)
            }
        }
    }

    pub fn rebuild_indexes(&self, mut selected: Vec<IndexRecord>) -> ActionMessage {
        match self.clear(&mut selected).and_then(|()| self.update(&mut selected)) {
            Ok(()) => ActionMessage::info("Successfully rebuilt"),
            Err(err) => {
                error!(%err, "rebuilding indexes failed");
                ActionMessage::error("Rebuilding error occured", &err)
            }
        }
    }

    pub fn update_indexes(&self, mut selected: Vec<IndexRecord>) -> ActionMessage {
        match self.update(&mut selected) {
            Ok(()) => ActionMessage::info("Successfully updated"),
            Err(err) => {
                error!(%err, "updating indexes failed");
                ActionMessage::error("Update error occured", &err)
            }
        }
    }

    fn model_of(&self, record: &IndexRecord) -> Result<&'a ModelMeta> {
        if ModelMeta::split_label(&record.model).is_none() {
            return Err(AdminError::MalformedLabel(record.model.clone()));
        }
        Ok(self.registry.model(&record.model)?)
    }

    fn clear(&self, records: &mut [IndexRecord]) -> Result<()> {
        let mut content_types = Vec::with_capacity(records.len());
        for record in records.iter_mut() {
            content_types.push(self.model_of(record)?.content_type());
            record.hints = 0;
            record.updated_at = None;
        }
        if !content_types.is_empty() {
            for backend in self.backends {
                info!(alias = backend.alias(), models = ?content_types, "clearing");
                backend.clear(&content_types)?;
            }
        }
        self.store.bulk_update(records)
    }

    fn update(&self, records: &mut [IndexRecord]) -> Result<()> {
        for backend in self.backends {
            for record in records.iter_mut() {
                self.update_one(backend.as_ref(), record)?;
            }
            self.store.bulk_update(records)?;
        }
        Ok(())
    }

    fn update_one(&self, backend: &dyn SearchBackend, record: &mut IndexRecord) -> Result<()> {
        let model = self.model_of(record)?;
        let document = self.registry.get_index(&record.model)?;
        let rows = self.source.records(&record.model)?;
        let total = rows.len();
        let batch_size = backend.batch_size().max(1);
        for (n, chunk) in rows.chunks(batch_size).enumerate() {
            let start = n * batch_size;
            info!(
                alias = backend.alias(),
                document = %document.name,
                "indexing {} - {} of {}",
                start + 1,
                start + chunk.len(),
                total
            );
            let docs = chunk
                .iter()
                .map(|r| document.prepare(model, r))
                .collect::<solrdoc_core::Result<Vec<_>>>()?;
            backend.update(document, docs)?;
        }
        record.hints = SearchQuery::for_model(model).count(backend)?;
        record.updated_at = Some(Utc::now());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
