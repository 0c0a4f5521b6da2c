//! Declarative schema files: model metadata plus document declarations,
//! read with the `config` crate (TOML, YAML or JSON by extension).
//!
//! ```toml
//! [[models]]
//! label = "shop.Order"
//! fields = [{ name = "id", primary_key = true }, { name = "status" }]
//!
//! [[documents]]
//! name = "OrderDocument"
//! model = "shop.Order"
//! fields = [{ name = "status" }]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::document::DocumentDecl;
use crate::error::Result;
use crate::registry::IndexRegistry;
use crate::types::ModelMeta;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub models: Vec<ModelMeta>,
    #[serde(default)]
    pub documents: Vec<DocumentDecl>,
}

impl Schema {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }

    /// Register every model, then bind and register every document.
    pub fn into_registry(self) -> Result<IndexRegistry> {
        let mut registry = IndexRegistry::new();
        for model in self.models {
            registry.register_model(model);
        }
        for document in self.documents {
            registry.register_document(document)?;
        }
        Ok(registry)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
