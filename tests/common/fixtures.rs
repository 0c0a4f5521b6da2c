#![allow(unused)]
//! Fixture schemas and pre-built registries.
//!
//! Two schemas are used across the harnesses:
//!
//! - [`MINIMAL_SCHEMA`]: `app.Model` with one to-one nested field `x`.
//! - [`BLOG_SCHEMA`]: posts with a to-one `author`, a to-many `comments`
//!   collection (each comment nesting its own author) and a few typed
//!   scalar fields.

use solrdoc::core::{IndexRegistry, Record, Schema};

pub const MINIMAL_SCHEMA: &str = r#"
[[models]]
label = "app.Model"
fields = [
    { name = "id", primary_key = true },
    { name = "x", relation = { kind = "one_to_one", target = "app.X" } },
]

[[models]]
label = "app.X"
fields = [{ name = "id", primary_key = true }, { name = "y" }]

[[documents]]
name = "ModelDocument"
model = "app.Model"

[[documents.fields]]
name = "x"
type = "nested"
properties = [{ name = "y", type = "date" }]
"#;

pub const BLOG_SCHEMA: &str = r#"
[[models]]
label = "blog.Post"
fields = [
    { name = "id", primary_key = true },
    { name = "title", default = "untitled" },
    { name = "published" },
    { name = "rating" },
    { name = "author", relation = { kind = "foreign_key", target = "blog.Author" } },
    { name = "comments", relation = { kind = "reverse_many", target = "blog.Comment" } },
]

[[models]]
label = "blog.Author"
fields = [{ name = "id", primary_key = true }, { name = "name" }]

[[models]]
label = "blog.Comment"
fields = [
    { name = "id", primary_key = true },
    { name = "body" },
    { name = "author", relation = { kind = "foreign_key", target = "blog.Author" } },
]

[[documents]]
name = "PostDocument"
model = "blog.Post"

[[documents.fields]]
name = "title"

[[documents.fields]]
name = "published"
type = "date"

[[documents.fields]]
name = "rating"
type = "integer"

[[documents.fields]]
name = "author"
type = "nested"
properties = [{ name = "name" }]

[[documents.fields]]
name = "comments"
type = "nested"

[[documents.fields.properties]]
name = "id"
type = "integer"

[[documents.fields.properties]]
name = "body"

[[documents.fields.properties]]
name = "author"
type = "nested"
properties = [{ name = "name" }]
"#;

pub fn minimal_registry() -> IndexRegistry {
    Schema::from_toml(MINIMAL_SCHEMA)
        .expect("minimal schema parses")
        .into_registry()
        .expect("minimal schema binds")
}

pub fn blog_registry() -> IndexRegistry {
    Schema::from_toml(BLOG_SCHEMA)
        .expect("blog schema parses")
        .into_registry()
        .expect("blog schema binds")
}

/// `n` posts, each with an author and `i % 3` comments.
pub fn blog_posts(n: u64) -> Vec<Record> {
    (1..=n)
        .map(|i| {
            let comments = (0..i % 3)
                .map(|c| {
                    Record::new()
                        .value("id", i * 100 + c)
                        .value("body", format!("comment {c} on post {i}"))
                        .one("author", Record::new().value("id", c + 1).value("name", format!("reader{c}")))
                })
                .collect();
            Record::new()
                .value("id", i)
                .value("title", format!("post {i}"))
                .value("published", "2024-03-05T10:00:00")
                .value("rating", i % 5)
                .one("author", Record::new().value("id", 1).value("name", "Ann"))
                .many("comments", comments)
        })
        .collect()
}
