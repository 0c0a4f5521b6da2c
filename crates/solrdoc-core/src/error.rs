//! Error type shared by every solrdoc-core operation.

/// Failures raised while binding declarations, projecting hits or building
/// queries. All of them are local to a single call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A nested field held something other than a mapping, a list of
    /// mappings, or null.
    #[error("nested field {field:?} must be a mapping or a list of mappings, got {found}")]
    InvalidNestedValue { field: String, found: &'static str },

    /// A dotted nested path could not be turned into a nest path and key.
    #[error("invalid nested path {path:?}: {reason}")]
    InvalidNestedPath { path: String, reason: &'static str },

    /// No document is registered for the model.
    #[error("model {0} is not handled by any registered document")]
    NotHandled(String),

    #[error("model {0} is not registered")]
    UnknownModel(String),

    #[error("model {model} already has a registered document ({existing})")]
    DuplicateDocument { model: String, existing: String },

    /// The composite identifier does not end in a valid natural primary key.
    #[error("cannot coerce primary key {value:?} of {id:?}: {reason}")]
    InvalidPrimaryKey {
        id: String,
        value: String,
        reason: String,
    },

    /// A raw hit is missing a mandatory engine field.
    #[error("search hit is missing {0:?}")]
    MissingHitField(&'static str),

    #[error("one of the lookup keys must be given: {0}")]
    MissingLookup(String),

    #[error("no items found")]
    NotFound,

    #[error("multiple records found ({0}), expected only one")]
    MultipleResults(u64),

    /// Reported by a [`SearchBackend`](crate::backend::SearchBackend)
    /// implementation.
    #[error("search backend {alias}: {message}")]
    Backend { alias: String, message: String },

    #[error("schema: {0}")]
    Schema(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
