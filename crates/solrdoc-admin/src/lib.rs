//! solrdoc-admin: index bookkeeping for solrdoc.
//!
//! Each registered document has one [`IndexRecord`] telling how many hits
//! its index holds and when it was last rebuilt. [`IndexAdmin`] runs the
//! clear / rebuild / update actions over selected rows; [`fetch_indexes`]
//! refreshes hint counts from the engine.

pub mod actions;
pub mod error;
pub mod record;
pub mod source;
pub mod sync;

pub use actions::{ActionMessage, IndexAdmin, MessageLevel, LIST_DISPLAY};
pub use error::{AdminError, Result};
pub use record::{IndexRecord, IndexRecordStore, MemoryRecordStore};
pub use source::{MemoryRecordSource, RecordSource};
pub use sync::{fetch_indexes, FetchSummary};
