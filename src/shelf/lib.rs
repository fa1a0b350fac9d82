//! # Shelf Architecture
//!
//! Shelf turns a **directory of files into a typed, queryable collection**.
//! Each file is one record: a Markdown note with YAML frontmatter, a JSON
//! object, or a YAML mapping. There is no database and no index. The files
//! are the data, and anything else (an editor, `git`, another process) may
//! read and write them too.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Query (query.rs, filter.rs)                                │
//! │  - Immutable pipeline: filter → order_by → head/tail        │
//! │  - Nothing is read until the query is materialized          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Collection (collection.rs)                                 │
//! │  - CRUD on records, path cache, file naming (slug.rs)       │
//! │  - Knows which file each record came from (tracker.rs)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Handlers (handlers/, registry.rs)                          │
//! │  - File bytes ⇄ Payload, one closed enum variant per format │
//! │  - Format names, extensions and inference                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Records
//!
//! A record is any type implementing serde's `Serialize` and
//! `DeserializeOwned`. Serializing it gives the [`Payload`] that is written;
//! deserializing a payload read from disk is what validates a file. Dates
//! travel as ISO-8601 strings, so `chrono` types round-trip exactly through
//! every format.
//!
//! ## Identity, not ids
//!
//! Records need no id field. Callers hold records through [`Entry`] handles,
//! and the collection remembers which file each handle belongs to. Two
//! records with identical fields are still two records. The association is
//! weak: dropping every handle to a record makes the collection forget it.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Post { title: String, date: NaiveDate, draft: bool, content: String }
//!
//! let mut posts: Collection<Post> =
//!     Collection::open("blog", &CollectionConfig::new().with_format("markdown"))?;
//!
//! let post = Entry::new(Post { title: "Hello".into(), /* ... */ });
//! posts.add(&post)?;                       // writes blog/hello.md
//! post.borrow_mut().draft = false;
//! posts.update(&post)?;                    // rewrites blog/hello.md
//!
//! let latest = posts.filter(|p| !p.draft).order_by("-date").head(5).to_list()?;
//! ```
//!
//! ## Module Overview
//!
//! - [`collection`]: [`Collection`], the entry point
//! - [`query`]: the lazy [`Query`] pipeline
//! - [`filter`]: field-based filters usable on any record type
//! - [`handlers`]: [`Format`] and the per-format readers/writers
//! - [`registry`]: format names, extensions and directory inference
//! - [`slug`]: file naming for new records
//! - [`tracker`]: [`Entry`] handles and the identity tracker
//! - [`config`]: [`CollectionConfig`]
//! - [`error`]: error types
//!
//! Nothing in this crate writes to stdout/stderr; diagnostics go through
//! `tracing` and are only visible if the application installs a subscriber.

pub mod collection;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod query;
pub mod registry;
pub mod slug;
pub mod tracker;

pub use collection::{Collection, Target};
pub use config::CollectionConfig;
pub use error::{Result, ShelfError};
pub use filter::{FieldFilter, FilterOp};
pub use handlers::{Format, Payload};
pub use query::{Query, SortInstruction};
pub use tracker::Entry;
