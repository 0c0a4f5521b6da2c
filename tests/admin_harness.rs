//! Index bookkeeping integration harness.
//!
//! # What this covers
//!
//! - **Fetch**: one row per registered document, created on first sight and
//!   refreshed afterwards, for every configured backend.
//! - **Actions**: clear, update and rebuild across several backends with
//!   different batch sizes, and the messages they report.
//! - **Failure reporting**: relation shape mismatches and backend outages
//!   come back as error messages instead of panics or partial rows.
//! - **Record sources**: records deserialized from JSON index the same way
//!   as hand-built ones.
//!
//! # Running
//!
//! ```sh
//! cargo test --test admin_harness
//! ```

mod common;
use common::*;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use solrdoc::admin::{
    fetch_indexes, ActionMessage, FetchSummary, IndexAdmin, IndexRecord, IndexRecordStore, MemoryRecordSource,
    MemoryRecordStore, MessageLevel, RecordSource,
};
use solrdoc::core::query::QueryParams;
use solrdoc::core::{IndexRegistry, IndexedDocument, MemoryBackend, Record, SearchBackend, SearchQuery};

struct Harness {
    registry: IndexRegistry,
    primary: Arc<MemoryBackend>,
    replica: Arc<MemoryBackend>,
    backends: Vec<Arc<dyn SearchBackend>>,
    source: MemoryRecordSource,
    store: MemoryRecordStore,
}

impl Harness {
    fn new() -> Self {
        Self::with_source(MemoryRecordSource::new().with_records("blog.Post", blog_posts(5)))
    }

    fn with_source(source: MemoryRecordSource) -> Self {
        let primary = Arc::new(MemoryBackend::new("default", 2));
        let replica = Arc::new(MemoryBackend::new("replica", 10));
        Self {
            registry: blog_registry(),
            backends: vec![
                primary.clone() as Arc<dyn SearchBackend>,
                replica.clone() as Arc<dyn SearchBackend>,
            ],
            primary,
            replica,
            source,
            store: MemoryRecordStore::new(),
        }
    }

    fn admin(&self) -> IndexAdmin<'_> {
        IndexAdmin::new(&self.registry, &self.backends, &self.source, &self.store)
    }

    fn fetch(&self) -> FetchSummary {
        fetch_indexes(&self.registry, &self.backends, &self.store).unwrap()
    }

    fn rows(&self) -> Vec<IndexRecord> {
        self.store.list().unwrap()
    }

    fn selected(&self) -> Vec<IndexRecord> {
        self.admin().select(&["PostDocument".to_string()]).unwrap()
    }

    fn stored_post(&self, backend: &MemoryBackend, pk: u64) -> Value {
        let post = self.registry.model("blog.Post").unwrap();
        let params: QueryParams = SearchQuery::for_model(post)
            .filter("django_id", pk.to_string())
            .build_params();
        let mut docs = backend.search(&params).unwrap().docs;
        assert_eq!(docs.len(), 1, "expected one stored post {pk}");
        Value::Object(docs.remove(0))
    }
}

fn author_doc(pk: u64) -> IndexedDocument {
    let mut fields = serde_json::Map::new();
    fields.insert("name".into(), json!("Ann"));
    IndexedDocument {
        id: format!("blog.author.{pk}"),
        django_ct: "blog.author".into(),
        django_id: pk.to_string(),
        fields,
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

#[test]
fn fetch_creates_one_row_per_document() {
    let h = Harness::new();
    let summary = h.fetch();
    // The second backend finds the row the first one created.
    assert_eq!(summary, FetchSummary { created: 1, updated: 1 });

    let rows = h.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].document, "PostDocument");
    assert_eq!(rows[0].model, "blog.Post");
    assert_eq!(rows[0].hints, 0);
    assert_eq!(rows[0].updated_at, None);
}

#[test]
fn fetch_refreshes_hints_without_touching_update_time() {
    let h = Harness::new();
    h.fetch();
    h.replica.insert(author_doc(1));
    for pk in 1..=3 {
        let doc = h
            .registry
            .get_index("blog.Post")
            .unwrap()
            .prepare(h.registry.model("blog.Post").unwrap(), &blog_posts(3)[pk - 1])
            .unwrap();
        h.replica.insert(doc);
    }

    let summary = h.fetch();
    assert_eq!(summary, FetchSummary { created: 0, updated: 2 });
    let row = &h.rows()[0];
    // Rows are keyed by document, so the last backend's count wins.
    assert_eq!(row.hints, 3);
    assert_eq!(row.updated_at, None);
    assert_eq!(row.to_string(), "<PostDocument: 3>");
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[test]
fn update_indexes_every_backend_in_batches() {
    let h = Harness::new();
    h.fetch();
    let msg = h.admin().update_indexes(h.selected());

    assert_eq!(msg.level, MessageLevel::Info);
    assert_eq!(msg.text, "Successfully updated");
    assert_eq!(h.primary.len(), 5);
    assert_eq!(h.replica.len(), 5);

    let row = &h.rows()[0];
    assert_eq!(row.hints, 5);
    assert!(row.updated_at.is_some());

    let stored = h.stored_post(&h.primary, 2);
    assert_eq!(stored["id"], json!("blog.post.2"));
    assert_eq!(stored["django_ct"], json!("blog.post"));
    assert_eq!(stored["published"], json!("2024-03-05"));
    assert_eq!(stored["author"], json!({"name": "Ann"}));
    assert_eq!(
        stored["comments"],
        json!([
            {"id": 200, "body": "comment 0 on post 2", "author": {"name": "reader0"}},
            {"id": 201, "body": "comment 1 on post 2", "author": {"name": "reader1"}},
        ])
    );
    assert_eq!(h.stored_post(&h.replica, 3)["comments"], Value::Null);
}

#[test]
fn clear_only_removes_selected_models() {
    let h = Harness::new();
    h.fetch();
    h.admin().update_indexes(h.selected());
    h.primary.insert(author_doc(7));

    let msg = h.admin().clear_indexes(h.selected());
    assert_eq!(msg.text, "Successfully cleared");
    assert_eq!(h.primary.len(), 1);
    assert!(h.replica.is_empty());

    let row = &h.rows()[0];
    assert_eq!(row.hints, 0);
    assert_eq!(row.updated_at, None);
}

#[test]
fn rebuild_drops_stale_documents() {
    let h = Harness::new();
    h.fetch();
    h.admin().update_indexes(h.selected());
    h.primary.insert(
        h.registry
            .get_index("blog.Post")
            .unwrap()
            .prepare(
                h.registry.model("blog.Post").unwrap(),
                &Record::new().value("id", 99).value("title", "gone"),
            )
            .unwrap(),
    );
    assert_eq!(h.primary.len(), 6);

    let msg = h.admin().rebuild_indexes(h.selected());
    assert_eq!(msg, ActionMessage { level: MessageLevel::Info, text: "Successfully rebuilt".into() });
    assert_eq!(h.primary.len(), 5);
    assert_eq!(h.rows()[0].hints, 5);
}

#[test]
fn empty_selection_is_a_no_op() {
    let h = Harness::new();
    h.fetch();
    h.admin().update_indexes(h.selected());

    let selected = h.admin().select(&["MissingDocument".to_string()]).unwrap();
    assert!(selected.is_empty());
    assert_eq!(h.admin().clear_indexes(selected).level, MessageLevel::Info);
    assert_eq!(h.primary.len(), 5);
}

// ---------------------------------------------------------------------------
// Failure reporting
// ---------------------------------------------------------------------------

#[test]
fn relation_shape_mismatch_reports_update_error() {
    let broken = Record::new()
        .value("id", 1)
        .one("comments", Record::new().value("id", 1).value("body", "lonely"));
    let h = Harness::with_source(MemoryRecordSource::new().with_records("blog.Post", vec![broken]));
    h.fetch();

    let msg = h.admin().update_indexes(h.selected());
    assert_eq!(msg.level, MessageLevel::Error);
    assert_eq!(
        msg.text,
        r#"Update error occured: nested field "comments" must be a mapping or a list of mappings, got a single related record"#
    );
    assert!(h.primary.is_empty());
}

#[test]
fn backend_outage_reports_rebuild_error() {
    let h = Harness::new();
    h.fetch();
    h.replica.set_failure(Some("connection refused".into()));

    let msg = h.admin().rebuild_indexes(h.selected());
    assert_eq!(msg.level, MessageLevel::Error);
    assert_eq!(msg.text, "Rebuilding error occured: search backend replica: connection refused");
}

// ---------------------------------------------------------------------------
// Record sources
// ---------------------------------------------------------------------------

#[test]
fn json_record_source_indexes_like_built_records() {
    let source: MemoryRecordSource = serde_json::from_value(json!({
        "blog.Post": [{
            "values": {"id": 1, "title": "from json", "published": "2024-01-02 08:00:00"},
            "relations": {
                "author": {"values": {"id": 3, "name": "Dee"}},
                "comments": [{"values": {"id": 10, "body": "hi"}, "relations": {"author": null}}],
            },
        }],
    }))
    .unwrap();
    assert_eq!(source.records("blog.Post").unwrap().len(), 1);
    assert!(source.records("blog.Author").unwrap().is_empty());

    let h = Harness::with_source(source);
    h.fetch();
    assert_eq!(h.admin().update_indexes(h.selected()).level, MessageLevel::Info);

    let stored = h.stored_post(&h.primary, 1);
    assert_eq!(stored["title"], json!("from json"));
    assert_eq!(stored["published"], json!("2024-01-02"));
    assert_eq!(stored["author"], json!({"name": "Dee"}));
    assert_eq!(stored["comments"], json!([{"id": 10, "body": "hi", "author": null}]));
}
