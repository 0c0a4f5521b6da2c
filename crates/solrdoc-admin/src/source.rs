//! Where rebuilds read application records from.

use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use solrdoc_core::Record;

use crate::error::{AdminError, Result};

/// Supplies the records of a model to index, in a stable order.
pub trait RecordSource: Send + Sync {
    fn records(&self, model_label: &str) -> Result<Vec<Record>>;
}

/// Records held in memory, keyed by model label. Deserializes from
/// `{"app.Model": [{"values": {..}, "relations": {..}}, ..]}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MemoryRecordSource {
    records: BTreeMap<String, Vec<Record>>,
}

impl MemoryRecordSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, model_label: impl Into<String>, records: Vec<Record>) -> Self {
        self.records.entry(model_label.into()).or_default().extend(records);
        self
    }

    /// Load records from a JSON file in the shape described above.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let source_err = |err: &dyn std::fmt::Display| AdminError::Source(format!("{}: {err}", path.display()));
        let file = std::fs::File::open(path).map_err(|e| source_err(&e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| source_err(&e))
    }
}

impl RecordSource for MemoryRecordSource {
    fn records(&self, model_label: &str) -> Result<Vec<Record>> {
        Ok(self.records.get(model_label).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
