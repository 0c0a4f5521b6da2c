//! solrdoc-core: document projection and nested query fragments for a
//! Solr-style search engine.
//!
//! # Architecture
//!
//! ```text
//! Schema ──► IndexRegistry ──► SearchQuery ──► SearchBackend
//!                 │                                 │
//!                 └──────► Projector ◄── SearchResultRow
//! ```
//!
//! Declarations are bound once, when registered. Everything downstream of
//! the registry is a synchronous transformation over borrowed data.

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod fields;
pub mod projector;
pub mod query;
pub mod registry;
pub mod result;
pub mod schema;
pub mod types;

pub use backend::{MemoryBackend, SearchBackend, SearchResponse};
pub use document::{DocumentDecl, IndexedDocument, Record, Related};
pub use error::{Error, Result};
pub use fields::{FieldDescriptor, RelationAccessor};
pub use projector::{project, Projector};
pub use query::{FilterValue, Lookup, NestedPath, ParentFilter, SearchQuery};
pub use registry::IndexRegistry;
pub use result::SearchResultRow;
pub use schema::Schema;
pub use types::{FieldType, ModelField, ModelMeta, PkKind, RelationKind};
