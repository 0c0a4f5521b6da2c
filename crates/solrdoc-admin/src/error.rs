//! Error type for admin actions and synchronisation.

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Core(#[from] solrdoc_core::Error),

    /// A bookkeeping row carries a model label that is not `app.Model`.
    #[error("malformed model label {0:?}, expected app_label.ModelName")]
    MalformedLabel(String),

    #[error("record source: {0}")]
    Source(String),

    #[error("record store: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, AdminError>;
