//! Index registry: the explicit model ↔ document lookup built at startup
//! and handed by reference to anything that needs it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::document::DocumentDecl;
use crate::error::{Error, Result};
use crate::types::ModelMeta;

#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    models: BTreeMap<String, ModelMeta>,
    /// Bound documents keyed by model label.
    documents: BTreeMap<String, DocumentDecl>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register model metadata. Models must be registered before any
    /// document referencing them (directly or through a relation).
    pub fn register_model(&mut self, model: ModelMeta) {
        self.models.insert(model.label.clone(), model);
    }

    /// Bind `document` against its model and register it.
    pub fn register_document(&mut self, mut document: DocumentDecl) -> Result<()> {
        if let Some(existing) = self.documents.get(&document.model) {
            return Err(Error::DuplicateDocument {
                model: document.model.clone(),
                existing: existing.name.clone(),
            });
        }
        let model = self
            .models
            .get(&document.model)
            .ok_or_else(|| Error::UnknownModel(document.model.clone()))?;
        document.bind(model, &self.models)?;
        debug!(document = %document.name, model = %document.model, "registered document");
        self.documents.insert(document.model.clone(), document);
        Ok(())
    }

    /// Document handling `model_label`.
    pub fn get_index(&self, model_label: &str) -> Result<&DocumentDecl> {
        self.documents
            .get(model_label)
            .ok_or_else(|| Error::NotHandled(model_label.to_string()))
    }

    /// Document declared under `name`.
    pub fn get_document(&self, name: &str) -> Option<&DocumentDecl> {
        self.documents.values().find(|d| d.name == name)
    }

    pub fn model(&self, label: &str) -> Result<&ModelMeta> {
        self.models
            .get(label)
            .ok_or_else(|| Error::UnknownModel(label.to_string()))
    }

    /// Model whose content type (`app.model`) equals `content_type`.
    pub fn model_by_content_type(&self, content_type: &str) -> Option<&ModelMeta> {
        self.models
            .values()
            .find(|m| m.content_type().eq_ignore_ascii_case(content_type))
    }

    /// Registered documents, ordered by model label.
    pub fn documents(&self) -> impl Iterator<Item = &DocumentDecl> {
        self.documents.values()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldDescriptor;
    use crate::types::ModelField;

    fn registry() -> IndexRegistry {
        let mut registry = IndexRegistry::new();
        registry.register_model(
            ModelMeta::new("blog.Post")
                .field(ModelField::new("id").primary_key())
                .field(ModelField::new("title")),
        );
        registry
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = registry();
        registry
            .register_document(
                DocumentDecl::new("PostDocument", "blog.Post").field(FieldDescriptor::char("title")),
            )
            .unwrap();
        assert_eq!(registry.get_index("blog.Post").unwrap().name, "PostDocument");
        assert!(registry.get_document("PostDocument").is_some());
        assert_eq!(registry.model_by_content_type("blog.post").unwrap().label, "blog.Post");
        assert!(matches!(registry.get_index("blog.Tag"), Err(Error::NotHandled(_))));
    }

    #[test]
    fn duplicate_and_unknown_are_rejected() {
        let mut registry = registry();
        registry
            .register_document(DocumentDecl::new("PostDocument", "blog.Post"))
            .unwrap();
        assert!(matches!(
            registry.register_document(DocumentDecl::new("Other", "blog.Post")),
            Err(Error::DuplicateDocument { .. })
        ));
        assert!(matches!(
            registry.register_document(DocumentDecl::new("TagDocument", "blog.Tag")),
            Err(Error::UnknownModel(_))
        ));
    }
}
