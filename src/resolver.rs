//! Navigation between catalog entities along fixed join templates.
//!
//! Every supported `(target, source)` pair maps to a chain of predicate hops,
//! each walked forwards or backwards. A chain is compiled into a single graph
//! pattern with the source bound up front, so one resolution is one query.

use std::fmt;

use ahash::AHashSet;
use tracing::debug;

use crate::errors::Result;
use crate::namespaces::terms;
use crate::store::{Bindings, GraphPattern, PatternTerm, Term, TripleStore};

const SOURCE_VAR: &str = "source";
const TARGET_VAR: &str = "target";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Collection,
    Item,
    Document,
    AnnotationCollection,
    Annotation,
    ItemList,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Collection => "collection",
            EntityKind::Item => "item",
            EntityKind::Document => "document",
            EntityKind::AnnotationCollection => "annotation_collection",
            EntityKind::Annotation => "annotation",
            EntityKind::ItemList => "item_list",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// `current predicate next`
    Outgoing,
    /// `next predicate current`
    Incoming,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hop {
    pub direction: Direction,
    pub predicate: &'static str,
}

const fn out(predicate: &'static str) -> Hop {
    Hop {
        direction: Direction::Outgoing,
        predicate,
    }
}

const fn inc(predicate: &'static str) -> Hop {
    Hop {
        direction: Direction::Incoming,
        predicate,
    }
}

const ITEM_TO_COLLECTION: &[Hop] = &[out(terms::DCTERMS_IS_PART_OF)];
const COLLECTION_TO_ITEM: &[Hop] = &[inc(terms::DCTERMS_IS_PART_OF)];
const ITEM_TO_DOCUMENT: &[Hop] = &[out(terms::AUSNC_DOCUMENT)];
const DOCUMENT_TO_ITEM: &[Hop] = &[inc(terms::AUSNC_DOCUMENT)];
const DOCUMENT_TO_COLLECTION: &[Hop] = &[
    inc(terms::AUSNC_DOCUMENT),
    out(terms::DCTERMS_IS_PART_OF),
];
const COLLECTION_TO_DOCUMENT: &[Hop] = &[
    inc(terms::DCTERMS_IS_PART_OF),
    out(terms::AUSNC_DOCUMENT),
];
const ITEM_TO_ANNOTATION_COLLECTION: &[Hop] = &[inc(terms::DADA_ANNOTATES)];
const ANNOTATION_COLLECTION_TO_ITEM: &[Hop] = &[out(terms::DADA_ANNOTATES)];
const ANNOTATION_COLLECTION_TO_ANNOTATION: &[Hop] = &[inc(terms::DADA_PART_OF)];
const ANNOTATION_TO_ANNOTATION_COLLECTION: &[Hop] = &[out(terms::DADA_PART_OF)];
const ITEM_TO_ANNOTATION: &[Hop] = &[inc(terms::DADA_ANNOTATES), inc(terms::DADA_PART_OF)];
const ANNOTATION_TO_ITEM: &[Hop] = &[out(terms::DADA_PART_OF), out(terms::DADA_ANNOTATES)];
const ANNOTATION_COLLECTION_TO_COLLECTION: &[Hop] = &[
    out(terms::DADA_ANNOTATES),
    out(terms::DCTERMS_IS_PART_OF),
];
const ANNOTATION_TO_COLLECTION: &[Hop] = &[
    out(terms::DADA_PART_OF),
    out(terms::DADA_ANNOTATES),
    out(terms::DCTERMS_IS_PART_OF),
];
const COLLECTION_TO_ANNOTATION_COLLECTION: &[Hop] = &[
    inc(terms::DCTERMS_IS_PART_OF),
    inc(terms::DADA_ANNOTATES),
];
const ITEM_TO_ITEM_LIST: &[Hop] = &[out(terms::DCTERMS_IS_PART_OF)];
const ITEM_LIST_TO_ITEM: &[Hop] = &[inc(terms::DCTERMS_IS_PART_OF)];

/// A fixed hop chain from a source entity to a target entity, with an optional
/// `rdf:type` the target must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinTemplate {
    pub hops: &'static [Hop],
    pub target_type: Option<&'static str>,
}

impl JoinTemplate {
    /// Template for `(target, source)`; `None` for pairs the catalog never navigates.
    pub fn lookup(target: EntityKind, source: EntityKind) -> Option<Self> {
        use EntityKind::*;
        let (hops, target_type) = match (target, source) {
            (Collection, Item) => (ITEM_TO_COLLECTION, Some(terms::DCMITYPE_COLLECTION)),
            (Collection, Document) => (DOCUMENT_TO_COLLECTION, Some(terms::DCMITYPE_COLLECTION)),
            (Collection, AnnotationCollection) => (
                ANNOTATION_COLLECTION_TO_COLLECTION,
                Some(terms::DCMITYPE_COLLECTION),
            ),
            (Collection, Annotation) => (ANNOTATION_TO_COLLECTION, Some(terms::DCMITYPE_COLLECTION)),
            (Item, Collection) => (COLLECTION_TO_ITEM, None),
            (Item, Document) => (DOCUMENT_TO_ITEM, None),
            (Item, AnnotationCollection) => (ANNOTATION_COLLECTION_TO_ITEM, None),
            (Item, Annotation) => (ANNOTATION_TO_ITEM, None),
            (Item, ItemList) => (ITEM_LIST_TO_ITEM, None),
            (Document, Item) => (ITEM_TO_DOCUMENT, None),
            (Document, Collection) => (COLLECTION_TO_DOCUMENT, None),
            (AnnotationCollection, Item) => (
                ITEM_TO_ANNOTATION_COLLECTION,
                Some(terms::DADA_ANNOTATION_COLLECTION),
            ),
            (AnnotationCollection, Annotation) => (ANNOTATION_TO_ANNOTATION_COLLECTION, None),
            (AnnotationCollection, Collection) => (
                COLLECTION_TO_ANNOTATION_COLLECTION,
                Some(terms::DADA_ANNOTATION_COLLECTION),
            ),
            (Annotation, AnnotationCollection) => (ANNOTATION_COLLECTION_TO_ANNOTATION, None),
            (Annotation, Item) => (ITEM_TO_ANNOTATION, None),
            (ItemList, Item) => (ITEM_TO_ITEM_LIST, Some(terms::LOCALTERMS_ITEM_LIST)),
            _ => return None,
        };
        Some(Self { hops, target_type })
    }

    /// Compiles the chain into one pattern from `?source` to `?target`.
    pub fn pattern(&self) -> GraphPattern {
        let mut pattern = GraphPattern::new();
        let last = self.hops.len();
        for (index, hop) in self.hops.iter().enumerate() {
            let from = hop_var(index, last);
            let to = hop_var(index + 1, last);
            let predicate = PatternTerm::iri(hop.predicate);
            pattern = match hop.direction {
                Direction::Outgoing => pattern.triple(from, predicate, to),
                Direction::Incoming => pattern.triple(to, predicate, from),
            };
        }
        if let Some(target_type) = self.target_type {
            pattern = pattern.triple(
                PatternTerm::var(TARGET_VAR),
                PatternTerm::iri(terms::RDF_TYPE),
                PatternTerm::iri(target_type),
            );
        }
        pattern
    }
}

fn hop_var(index: usize, last: usize) -> PatternTerm {
    if index == 0 {
        PatternTerm::var(SOURCE_VAR)
    } else if index == last {
        PatternTerm::var(TARGET_VAR)
    } else {
        PatternTerm::Var(format!("hop{index}"))
    }
}

/// Resolves entity URIs against a triple store.
pub struct EntityResolver<'a, S: TripleStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TripleStore + ?Sized> EntityResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// URIs of `target` entities reachable from `source_uri`, de-duplicated in
    /// first-seen order. Unsupported pairs yield an empty list.
    pub fn resolve(&self, target: EntityKind, source: EntityKind, source_uri: &str) -> Result<Vec<String>> {
        let Some(template) = JoinTemplate::lookup(target, source) else {
            debug!(%target, %source, "no join template for pair");
            return Ok(Vec::new());
        };
        let mut bindings = Bindings::new();
        bindings.insert(SOURCE_VAR.to_string(), Term::iri(source_uri));
        let rows = self.store.query(&template.pattern(), &bindings, None)?;
        let mut seen = AHashSet::new();
        let mut resolved = Vec::new();
        for row in rows {
            if let Some(term) = row.get(TARGET_VAR) {
                let uri = term.to_plain_string();
                if seen.insert(uri.clone()) {
                    resolved.push(uri);
                }
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_hop_binds_source_to_target() {
        let template = JoinTemplate::lookup(EntityKind::Document, EntityKind::Item).unwrap();
        let pattern = template.pattern();
        assert_eq!(pattern.triples.len(), 1);
        assert_eq!(pattern.triples[0].subject, PatternTerm::var(SOURCE_VAR));
        assert_eq!(pattern.triples[0].object, PatternTerm::var(TARGET_VAR));
    }

    #[test]
    fn incoming_hops_reverse_the_triple() {
        let template = JoinTemplate::lookup(EntityKind::Annotation, EntityKind::Item).unwrap();
        let pattern = template.pattern();
        assert_eq!(pattern.triples.len(), 2);
        assert_eq!(pattern.triples[0].subject, PatternTerm::var("hop1"));
        assert_eq!(pattern.triples[0].object, PatternTerm::var(SOURCE_VAR));
        assert_eq!(pattern.triples[1].subject, PatternTerm::var(TARGET_VAR));
        assert_eq!(pattern.triples[1].object, PatternTerm::var("hop1"));
    }

    #[test]
    fn collection_target_carries_type_constraint() {
        let template = JoinTemplate::lookup(EntityKind::Collection, EntityKind::Item).unwrap();
        let pattern = template.pattern();
        assert_eq!(pattern.triples.len(), 2);
        assert_eq!(pattern.triples[1].object, PatternTerm::iri(terms::DCMITYPE_COLLECTION));
    }

    #[test]
    fn unsupported_pairs_have_no_template() {
        assert!(JoinTemplate::lookup(EntityKind::ItemList, EntityKind::Annotation).is_none());
        assert!(JoinTemplate::lookup(EntityKind::Item, EntityKind::Item).is_none());
    }
}
