//! Fetch: bring the bookkeeping rows in line with what the engine holds.

use std::sync::Arc;

use serde::Serialize;
use solrdoc_core::{IndexRegistry, SearchBackend, SearchQuery};
use tracing::info;

use crate::error::Result;
use crate::record::IndexRecordStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub created: usize,
    pub updated: usize,
}

/// For every backend and registered document, count the model's hits and
/// upsert the document's bookkeeping row.
pub fn fetch_indexes(
    registry: &IndexRegistry,
    backends: &[Arc<dyn SearchBackend>],
    store: &dyn IndexRecordStore,
) -> Result<FetchSummary> {
    let mut summary = FetchSummary::default();
    for backend in backends {
        for document in registry.documents() {
            let model = registry.model(&document.model)?;
            let hints = SearchQuery::for_model(model).count(backend.as_ref())?;
            let (mut record, created) = store.get_or_create(&document.name, &document.model, hints)?;
            if created {
                summary.created += 1;
            } else {
                record.hints = hints;
                store.save(&record)?;
                summary.updated += 1;
            }
            info!(alias = backend.alias(), document = %document.name, hints, created, "fetched index");
        }
    }
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
