//! Filtered, ordered, paginated document queries.
//!
//! Filters and sort keys address top-level fields of the JSON body. Numbers compare
//! numerically, strings lexicographically, booleans false-before-true; values of
//! different kinds never match a filter.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::document::Document;

use super::r#trait::RawDocument;

/// Sort direction for an `order_by` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A single field predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, JsonValue),
    Lt(String, JsonValue),
    Lte(String, JsonValue),
    Gt(String, JsonValue),
    Gte(String, JsonValue),
}

impl Filter {
    pub fn matches(&self, body: &JsonValue) -> bool {
        let (field, expected) = match self {
            Filter::Eq(f, v)
            | Filter::Lt(f, v)
            | Filter::Lte(f, v)
            | Filter::Gt(f, v)
            | Filter::Gte(f, v) => (f, v),
        };

        let Some(ordering) = body
            .get(field.as_str())
            .and_then(|actual| compare_values(actual, expected))
        else {
            return false;
        };

        match self {
            Filter::Eq(..) => ordering.is_eq(),
            Filter::Lt(..) => ordering.is_lt(),
            Filter::Lte(..) => ordering.is_le(),
            Filter::Gt(..) => ordering.is_gt(),
            Filter::Gte(..) => ordering.is_ge(),
        }
    }
}

/// Query over one collection.
///
/// Results are filtered, sorted by the `order_by` keys in sequence (ties broken by
/// document key, in the direction of the first key), then `offset` documents are skipped and at most `limit`
/// returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<Filter>,
    order_by: Vec<(String, SortOrder)>,
    offset: usize,
    limit: Option<usize>,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            offset: 0,
            limit: None,
        }
    }

    /// Query the collection a typed document lives in.
    pub fn of<D: Document>() -> Self {
        Self::new(D::COLLECTION)
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filter(Filter::Eq(field.into(), value.into()))
    }

    pub fn where_lt(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filter(Filter::Lt(field.into(), value.into()))
    }

    pub fn where_lte(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filter(Filter::Lte(field.into(), value.into()))
    }

    pub fn where_gt(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filter(Filter::Gt(field.into(), value.into()))
    }

    pub fn where_gte(self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filter(Filter::Gte(field.into(), value.into()))
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((field.into(), order));
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn matches(&self, doc: &RawDocument) -> bool {
        doc.collection == self.collection && self.filters.iter().all(|f| f.matches(&doc.body))
    }

    /// Evaluate the query over a candidate set (typically a whole collection).
    pub fn apply(&self, docs: impl IntoIterator<Item = RawDocument>) -> Vec<RawDocument> {
        let mut matched: Vec<RawDocument> = docs.into_iter().filter(|d| self.matches(d)).collect();

        matched.sort_by(|a, b| {
            for (field, order) in &self.order_by {
                let ordering = compare_fields(a.body.get(field), b.body.get(field));
                let ordering = match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            match self.order_by.first() {
                Some((_, SortOrder::Descending)) => b.key.cmp(&a.key),
                _ => a.key.cmp(&b.key),
            }
        });

        let window = matched.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => window.take(limit).collect(),
            None => window.collect(),
        }
    }
}

/// Compare two JSON scalars of the same kind; `None` when they are not comparable.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        (JsonValue::Null, JsonValue::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

// Missing fields sort first; incomparable values keep their relative order.
fn compare_fields(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}
