//! In-process document store.
//!
//! Understands the subset of MongoDB the backend issues: equality filters, inclusion
//! projections and the `$set`, `$push`, `$pull` and `$inc` update operators. Writes to a
//! collection can be switched off with [`MemoryStore::reject_writes`] to reproduce
//! partial failures, reads with [`MemoryStore::reject_reads`].

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bson::oid::ObjectId;
use bson::{doc, Bson, Document};

use super::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome, UpdateWrite};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Vec<Document>>,
    rejecting: HashSet<String>,
    unreadable: HashSet<String>,
}

impl State {
    fn check_writable(&self, collection: &str) -> Result<(), StoreError> {
        if self.rejecting.contains(collection) {
            return Err(StoreError::Rejected(collection.to_string()));
        }
        Ok(())
    }

    fn check_readable(&self, collection: &str) -> Result<(), StoreError> {
        if self.unreadable.contains(collection) {
            return Err(StoreError::Unreadable(collection.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Every following write to `collection` fails until [`MemoryStore::accept_writes`].
    pub fn reject_writes(&self, collection: impl ToString) {
        self.lock().rejecting.insert(collection.to_string());
    }

    pub fn accept_writes(&self, collection: &str) {
        self.lock().rejecting.remove(collection);
    }

    /// Every following read of `collection` fails until [`MemoryStore::accept_reads`].
    pub fn reject_reads(&self, collection: impl ToString) {
        self.lock().unreadable.insert(collection.to_string());
    }

    pub fn accept_reads(&self, collection: &str) {
        self.lock().unreadable.remove(collection);
    }

    /// Snapshot of every document in `collection`, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // state is only mutated after a write fully succeeded, so it's consistent even if
        // a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_operator(key: &str) -> bool {
    key.starts_with('$')
}

fn matches(document: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, expected) in filter {
        if is_operator(key) {
            return Err(StoreError::Unsupported {
                kind: "query operator",
                operator: key.clone(),
            });
        }
        if let Bson::Document(inner) = expected {
            if let Some(op) = inner.keys().find(|k| is_operator(k)) {
                return Err(StoreError::Unsupported {
                    kind: "query operator",
                    operator: op.clone(),
                });
            }
        }
        if document.get(key) != Some(expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn included(flag: Option<&Bson>) -> bool {
    match flag {
        Some(Bson::Int32(v)) => *v != 0,
        Some(Bson::Int64(v)) => *v != 0,
        Some(Bson::Double(v)) => *v != 0.0,
        Some(Bson::Boolean(v)) => *v,
        _ => false,
    }
}

fn project(document: &Document, projection: &Document) -> Document {
    let keep_id = projection.get("_id").map_or(true, |it| included(Some(it)));

    document
        .iter()
        .filter(|(key, _)| {
            if key.as_str() == "_id" {
                keep_id
            } else {
                included(projection.get(key.as_str()))
            }
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn as_f64(field: &str, value: &Bson) -> Result<f64, StoreError> {
    match value {
        Bson::Int32(v) => Ok(*v as f64),
        Bson::Int64(v) => Ok(*v as f64),
        Bson::Double(v) => Ok(*v),
        _ => Err(StoreError::NotNumeric(field.to_string())),
    }
}

fn increment(field: &str, current: Option<&Bson>, by: &Bson) -> Result<Bson, StoreError> {
    let current = current.unwrap_or(&Bson::Int32(0));

    Ok(match (current, by) {
        (Bson::Int32(a), Bson::Int32(b)) => a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(*a as i64 + *b as i64)),
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(*a as i64 + b),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a + *b as i64),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a + b),
        (Bson::Double(a), b) => Bson::Double(a + as_f64(field, b)?),
        (a, Bson::Double(b)) => Bson::Double(as_f64(field, a)? + b),
        _ => return Err(StoreError::NotNumeric(field.to_string())),
    })
}

fn operator_fields<'a>(operator: &str, fields: &'a Bson) -> Result<&'a Document, StoreError> {
    match fields {
        Bson::Document(fields) => Ok(fields),
        _ => Err(StoreError::Unsupported {
            kind: "update operand for",
            operator: operator.to_string(),
        }),
    }
}

/// Applies `update` to `document`, returning whether anything changed. The document is
/// left untouched when the update fails.
fn apply_update(document: &mut Document, update: &Document) -> Result<bool, StoreError> {
    let mut updated = document.clone();

    for (operator, fields) in update {
        let fields = operator_fields(operator, fields)?;

        match operator.as_str() {
            "$set" => {
                for (key, value) in fields {
                    updated.insert(key.clone(), value.clone());
                }
            }
            "$push" => {
                for (key, value) in fields {
                    match updated.get_mut(key) {
                        Some(Bson::Array(items)) => items.push(value.clone()),
                        Some(_) => return Err(StoreError::NotAnArray(key.clone())),
                        None => {
                            updated.insert(key.clone(), Bson::Array(vec![value.clone()]));
                        }
                    }
                }
            }
            "$pull" => {
                for (key, value) in fields {
                    match updated.get_mut(key) {
                        Some(Bson::Array(items)) => items.retain(|it| it != value),
                        Some(_) => return Err(StoreError::NotAnArray(key.clone())),
                        None => {}
                    }
                }
            }
            "$inc" => {
                for (key, by) in fields {
                    let value = increment(key, updated.get(key), by)?;
                    updated.insert(key.clone(), value);
                }
            }
            other => {
                return Err(StoreError::Unsupported {
                    kind: "update operator",
                    operator: other.to_string(),
                })
            }
        }
    }

    let modified = updated != *document;
    *document = updated;
    Ok(modified)
}

fn update_first(
    documents: &mut [Document],
    filter: &Document,
    update: &Document,
) -> Result<UpdateOutcome, StoreError> {
    let mut outcome = UpdateOutcome {
        acknowledged: true,
        matched_count: 0,
        modified_count: 0,
        upserted_id: None,
    };

    for document in documents.iter_mut() {
        if matches(document, filter)? {
            outcome.matched_count = 1;
            if apply_update(document, update)? {
                outcome.modified_count = 1;
            }
            break;
        }
    }

    Ok(outcome)
}

#[rocket::async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .find(collection, filter, projection)
            .await?
            .into_iter()
            .next())
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        let state = self.lock();
        state.check_readable(collection)?;
        let documents = match state.collections.get(collection) {
            Some(it) => it,
            None => return Ok(vec![]),
        };

        let mut found = vec![];
        for document in documents {
            if matches(document, &filter)? {
                found.push(match &projection {
                    Some(projection) => project(document, projection),
                    None => document.clone(),
                });
            }
        }

        Ok(found)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOutcome, StoreError> {
        let mut state = self.lock();
        state.check_writable(collection)?;

        let (id, document) = match document.get("_id") {
            Some(id) => (id.clone(), document),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                let mut with_id = doc! { "_id": id.clone() };
                for (key, value) in document {
                    with_id.insert(key, value);
                }
                (id, with_id)
            }
        };

        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document);

        Ok(InsertOutcome {
            acknowledged: true,
            inserted_id: super::id_string(id),
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut state = self.lock();
        state.check_writable(collection)?;

        let documents = state.collections.entry(collection.to_string()).or_default();
        update_first(documents, &filter, &update)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut state = self.lock();
        state.check_writable(collection)?;

        let documents = state.collections.entry(collection.to_string()).or_default();
        let mut position = None;
        for (i, document) in documents.iter().enumerate() {
            if matches(document, &filter)? {
                position = Some(i);
                break;
            }
        }

        let deleted_count = match position {
            Some(i) => {
                documents.remove(i);
                1
            }
            None => 0,
        };

        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count,
        })
    }

    async fn update_all_or_none(
        &self,
        writes: Vec<UpdateWrite>,
    ) -> Result<Vec<UpdateOutcome>, StoreError> {
        let mut state = self.lock();
        let mut staged = state.collections.clone();

        let mut outcomes = Vec::with_capacity(writes.len());
        for write in writes {
            state.check_writable(&write.collection)?;

            let documents = staged.entry(write.collection.clone()).or_default();
            let outcome = update_first(documents, &write.filter, &write.update)?;
            if outcome.matched_count == 0 {
                return Err(StoreError::Unmatched(write.collection));
            }
            outcomes.push(outcome);
        }

        state.collections = staged;
        Ok(outcomes)
    }
}
