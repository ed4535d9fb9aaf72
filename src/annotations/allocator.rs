//! Per-collection annotation identifiers.
//!
//! Identifiers look like `<collection>/annotation/<n>`. Every reservation
//! starts above both the largest `n` typed as an annotation in the graph and
//! the collection's recorded high-water mark, so identifiers handed out by an
//! earlier process, or loaded by a later attach, are never reissued.

use std::path::Path;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::{CatalogError, Result};
use crate::namespaces::terms;
use crate::store::{ChangeSet, Literal, Term, Triple, TriplePattern, TripleStore, write_triples};

pub fn annotation_prefix(collection_uri: &str) -> String {
    format!("{}/annotation/", collection_uri.trim_end_matches('/'))
}

/// Node carrying the collection's high-water mark.
pub fn counter_node(collection_uri: &str) -> String {
    format!("{}/annotation_counter", collection_uri.trim_end_matches('/'))
}

#[derive(Debug, Default)]
pub struct AnnotationIdAllocator {
    counters: Mutex<AHashMap<String, u64>>,
}

impl AnnotationIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues one identifier and records it as the high-water mark in the store.
    pub fn next_id<S: TripleStore + ?Sized>(&self, store: &S, collection_uri: &str) -> Result<String> {
        self.next_id_recorded(store, collection_uri, None)
    }

    /// Like [`next_id`](Self::next_id), also writing the mark to `mark_file`
    /// so it survives a reload of the graph from disk.
    pub fn next_id_recorded<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        collection_uri: &str,
        mark_file: Option<&Path>,
    ) -> Result<String> {
        let key = collection_uri.trim_end_matches('/');
        let prefix = annotation_prefix(key);
        self.reserve(store, key, 1, |ids| {
            let id = ids
                .into_iter()
                .next()
                .ok_or_else(|| CatalogError::query("allocator produced no identifier"))?;
            let issued = id
                .strip_prefix(&prefix)
                .and_then(|n| n.parse::<u64>().ok())
                .ok_or_else(|| CatalogError::query(format!("allocator produced {id}")))?;
            record_high_water(store, key, issued, mark_file)?;
            Ok(id)
        })
    }

    /// Reserves `count` consecutive identifiers and hands them to `persist`.
    ///
    /// The allocator lock is held until `persist` returns. When `persist`
    /// fails the counter is restored, so no caller ever observes a gap or a
    /// duplicate.
    pub fn reserve<S, T, F>(&self, store: &S, collection_uri: &str, count: usize, persist: F) -> Result<T>
    where
        S: TripleStore + ?Sized,
        F: FnOnce(Vec<String>) -> Result<T>,
    {
        let key = collection_uri.trim_end_matches('/');
        let prefix = annotation_prefix(key);
        let mut counters = self.counters.lock();
        let cached = counters.get(key).copied();
        let stored = highest_recorded(store, key, &prefix)?;
        let last = cached.unwrap_or(0).max(stored);
        if cached.is_none_or(|cached| cached < stored) {
            debug!(collection = key, seeded = stored, "seeded annotation counter");
        }
        let next = last.checked_add(count as u64).ok_or_else(|| {
            CatalogError::conflict(format!("annotation identifiers exhausted for {key}"))
        })?;
        let ids = (1..=count as u64)
            .map(|offset| format!("{prefix}{}", last + offset))
            .collect();
        counters.insert(key.to_string(), next);
        match persist(ids) {
            Ok(value) => Ok(value),
            Err(err) => {
                counters.insert(key.to_string(), last);
                Err(err)
            }
        }
    }
}

/// Replaces the collection's high-water mark with `last`, in `mark_file`
/// first when given and then in the store.
pub fn record_high_water<S: TripleStore + ?Sized>(
    store: &S,
    collection_uri: &str,
    last: u64,
    mark_file: Option<&Path>,
) -> Result<()> {
    let node = Term::iri(counter_node(collection_uri));
    let mark = Triple::new(
        node.clone(),
        terms::LOCALTERMS_LAST_ANNOTATION_ID,
        Term::Literal(Literal::typed(last.to_string(), terms::XSD_INTEGER)),
    );
    if let Some(path) = mark_file {
        write_triples(path, std::slice::from_ref(&mark))?;
    }
    store.apply(
        &ChangeSet::new(Some(collection_uri))
            .remove(
                TriplePattern::any()
                    .subject(node)
                    .predicate(terms::LOCALTERMS_LAST_ANNOTATION_ID),
            )
            .insert(mark),
    )?;
    Ok(())
}

/// Largest of the typed annotation numbers under `prefix` and any recorded
/// high-water mark, 0 if there are neither.
fn highest_recorded<S: TripleStore + ?Sized>(store: &S, collection_uri: &str, prefix: &str) -> Result<u64> {
    let annotations = store.subjects(terms::RDF_TYPE, &Term::iri(terms::DADA_ANNOTATION))?;
    let typed = annotations
        .iter()
        .filter_map(|node| node.as_iri()?.strip_prefix(prefix)?.parse::<u64>().ok());
    let marks = store.objects(
        &Term::iri(counter_node(collection_uri)),
        terms::LOCALTERMS_LAST_ANNOTATION_ID,
    )?;
    let marked = marks.iter().filter_map(|mark| mark.value().parse::<u64>().ok());
    Ok(typed.chain(marked).max().unwrap_or(0))
}
