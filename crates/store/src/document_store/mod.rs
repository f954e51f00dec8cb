//! Document store boundary.
//!
//! Collections of JSON documents addressed by string keys, with point lookups,
//! filtered/ordered queries, and multi-document transactions. No storage technology
//! is assumed by the trait; [`InMemoryDocumentStore`] backs tests and the demo binary.

pub mod in_memory;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use query::{Filter, Query, SortOrder};
pub use r#trait::{DocumentStore, RawDocument, StoreError, Transaction};
