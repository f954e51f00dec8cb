//! Infrastructure layer: the document store boundary the bank core runs on.
//!
//! - [`document_store`]: object-safe store/transaction traits, queries, and the
//!   in-memory serializable implementation.
//! - [`document`]: typed records on top of raw JSON documents.
//! - [`atomic`]: the retrying unit of work (`run_atomic`).
//! - [`config`]: store tuning loaded from the environment.

pub mod atomic;
pub mod config;
pub mod document;
pub mod document_store;

pub use atomic::{run_atomic, RetryPolicy, Tx};
pub use config::StoreConfig;
pub use document::{Document, DocumentStoreExt};
pub use document_store::{
    DocumentStore, Filter, InMemoryDocumentStore, Query, RawDocument, SortOrder, StoreError,
    Transaction,
};
