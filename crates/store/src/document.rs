//! Typed records on top of raw JSON documents.

use serde::Serialize;
use serde::de::DeserializeOwned;

use bankcore_core::Entity;

use crate::document_store::{DocumentStore, Query, RawDocument, StoreError};

/// A record type stored in one collection, keyed by its entity id.
pub trait Document: Entity + Serialize + DeserializeOwned {
    /// Collection the record lives in.
    const COLLECTION: &'static str;

    /// Storage key for this record.
    fn key(&self) -> String {
        self.id().to_string()
    }
}

/// Decode a raw document into its typed record.
pub fn decode<D: Document>(raw: &RawDocument) -> Result<D, StoreError> {
    serde_json::from_value(raw.body.clone()).map_err(|e| {
        StoreError::Serialization(format!(
            "{}/{} is not a valid record: {e}",
            raw.collection, raw.key
        ))
    })
}

/// Typed reads against committed data, available on every [`DocumentStore`].
pub trait DocumentStoreExt: DocumentStore {
    fn fetch<D: Document>(&self, id: &D::Id) -> Result<Option<D>, StoreError> {
        self.get(D::COLLECTION, &id.to_string())?
            .map(|raw| decode(&raw))
            .transpose()
    }

    /// Run a query and decode every result; one malformed record fails the call.
    fn find<D: Document>(&self, query: &Query) -> Result<Vec<D>, StoreError> {
        self.query(query)?.iter().map(decode).collect()
    }

    /// Run a query and decode the results, skipping malformed records with a warning.
    fn find_lenient<D: Document>(&self, query: &Query) -> Result<Vec<D>, StoreError> {
        Ok(self
            .query(query)?
            .iter()
            .filter_map(|raw| match decode::<D>(raw) {
                Ok(doc) => Some(doc),
                Err(err) => {
                    tracing::warn!(
                        collection = %raw.collection,
                        key = %raw.key,
                        error = %err,
                        "skipping malformed document"
                    );
                    None
                }
            })
            .collect())
    }
}

impl<S> DocumentStoreExt for S where S: DocumentStore + ?Sized {}
