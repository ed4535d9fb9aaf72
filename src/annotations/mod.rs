//! Annotation retrieval, identifier allocation and recording.
//!
//! Annotations hang off an item through an annotation collection:
//!
//! ```text
//! ?batch dada:annotates <item> .
//! ?ann   dada:partof    ?batch ;
//!        dada:targets   ?region .
//! ?region a dada:UTF8Region | dada:SecondRegion ; dada:start ?s ; dada:end ?e .
//! ```

pub mod allocator;
pub mod filter;
pub mod recorder;

use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use allocator::{AnnotationIdAllocator, annotation_prefix};
pub use filter::{AnnotationFilter, BatchProvenance};
pub use recorder::{AnnotationReceipt, AnnotationRecorder, AnnotationUpload, NewAnnotation};

use crate::errors::Result;
use crate::metadata::{JSONLD_CONTEXT, display_document_url};
use crate::namespaces::{DADA, PrefixTable, terms};
use crate::provenance::IdentityRegistry;
use crate::store::{Term, TriplePattern, TripleStore};
use crate::value::Value;

/// Predicates mapped onto named record fields; everything else on an
/// annotation node is copied through.
const CONSUMED_PREDICATES: [&str; 5] = [
    terms::DADA_LABEL,
    terms::DADA_TYPE,
    terms::DADA_TARGETS,
    terms::RDF_TYPE,
    terms::DADA_PART_OF,
];

/// What an annotation's region measures, derived from the region's `rdf:type`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Character offsets (`dada:UTF8Region`).
    #[default]
    Text,
    /// Time offsets in seconds (`dada:SecondRegion`).
    Second,
    Unknown,
}

impl RegionKind {
    pub fn tag(self) -> &'static str {
        match self {
            RegionKind::Text => "dada:TextAnnotation",
            RegionKind::Second => "dada:SecondAnnotation",
            RegionKind::Unknown => "",
        }
    }

    /// Accepts `dada:TextAnnotation`, `TextAnnotation` or the full IRI.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let local = tag
            .strip_prefix(DADA)
            .or_else(|| tag.strip_prefix("dada:"))
            .unwrap_or(tag);
        match local {
            "TextAnnotation" => Some(RegionKind::Text),
            "SecondAnnotation" => Some(RegionKind::Second),
            _ => None,
        }
    }

    pub fn from_region_types(types: &[Term]) -> Self {
        for region_type in types.iter().filter_map(Term::as_iri) {
            match region_type {
                terms::DADA_UTF8_REGION => return RegionKind::Text,
                terms::DADA_SECOND_REGION => return RegionKind::Second,
                _ => {}
            }
        }
        RegionKind::Unknown
    }

    pub fn region_type(self) -> Option<&'static str> {
        match self {
            RegionKind::Text => Some(terms::DADA_UTF8_REGION),
            RegionKind::Second => Some(terms::DADA_SECOND_REGION),
            RegionKind::Unknown => None,
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for RegionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for RegionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        RegionKind::from_tag(&tag)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown annotation type tag '{tag}'")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotationRecord {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: RegionKind,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub annotation_type: String,
    pub start: Option<Value>,
    pub end: Option<Value>,
    /// Remaining annotation properties keyed by qualified name.
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CommonProperties {
    /// Display document URL of the annotated item.
    #[serde(rename = "alveo:annotates")]
    pub annotates: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotationSet {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "commonProperties")]
    pub common_properties: CommonProperties,
    #[serde(rename = "alveo:annotations")]
    pub annotations: Vec<AnnotationRecord>,
}

impl AnnotationSet {
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Read side of the annotation graph.
pub struct AnnotationQuery<'a, S: TripleStore + ?Sized> {
    store: &'a S,
    prefixes: &'a PrefixTable,
    registry: &'a dyn IdentityRegistry,
}

impl<'a, S: TripleStore + ?Sized> AnnotationQuery<'a, S> {
    pub fn new(store: &'a S, prefixes: &'a PrefixTable, registry: &'a dyn IdentityRegistry) -> Self {
        Self {
            store,
            prefixes,
            registry,
        }
    }

    fn batches(&self, item_uri: &str) -> Result<Vec<Term>> {
        self.store
            .subjects(terms::DADA_ANNOTATES, &Term::iri(item_uri))
    }

    fn members(&self, batch: &Term) -> Result<Vec<Term>> {
        self.store.subjects(terms::DADA_PART_OF, batch)
    }

    /// Annotations of `item_uri` passing every criterion in `filter`.
    pub fn get_annotations(&self, item_uri: &str, filter: &AnnotationFilter) -> Result<AnnotationSet> {
        let compiled = filter.compile(self.prefixes, self.registry)?;
        let mut annotations = Vec::new();
        for batch in self.batches(item_uri)? {
            if compiled.needs_provenance() {
                let provenance = BatchProvenance::lookup(self.store, &batch)?;
                if !compiled.accepts_batch(&provenance) {
                    continue;
                }
            }
            for annotation in self.members(&batch)? {
                let record = self.record(&annotation)?;
                if compiled.accepts(&record.annotation_type, record.label.as_deref()) {
                    annotations.push(record);
                }
            }
        }
        Ok(AnnotationSet {
            context: JSONLD_CONTEXT.to_string(),
            common_properties: CommonProperties {
                annotates: display_document_url(self.store, item_uri)?,
            },
            annotations,
        })
    }

    /// Distinct annotation types of `item_uri` in first-seen order.
    pub fn annotation_types(&self, item_uri: &str) -> Result<Vec<String>> {
        let mut seen = AHashSet::new();
        let mut types = Vec::new();
        for batch in self.batches(item_uri)? {
            for annotation in self.members(&batch)? {
                if let Some(annotation_type) = self.store.value(&annotation, terms::DADA_TYPE)? {
                    let annotation_type = annotation_type.to_plain_string();
                    if seen.insert(annotation_type.clone()) {
                        types.push(annotation_type);
                    }
                }
            }
        }
        Ok(types)
    }

    fn record(&self, annotation: &Term) -> Result<AnnotationRecord> {
        let mut label = None;
        let mut annotation_type = None;
        let mut region = None;
        let mut properties = BTreeMap::new();
        for triple in self
            .store
            .triples(&TriplePattern::any().subject(annotation.clone()))?
        {
            match triple.predicate.as_str() {
                terms::DADA_LABEL => {
                    label.get_or_insert_with(|| triple.object.value().to_string());
                }
                terms::DADA_TYPE => {
                    annotation_type.get_or_insert_with(|| triple.object.to_plain_string());
                }
                terms::DADA_TARGETS => {
                    region.get_or_insert(triple.object);
                }
                predicate if CONSUMED_PREDICATES.contains(&predicate) => {}
                predicate => {
                    properties
                        .entry(self.prefixes.compact(predicate))
                        .or_insert_with(|| Value::from(&triple.object));
                }
            }
        }

        let (kind, start, end) = match region.filter(|r| !matches!(r, Term::Literal(_))) {
            Some(region) => (
                RegionKind::from_region_types(&self.store.objects(&region, terms::RDF_TYPE)?),
                self.store
                    .value(&region, terms::DADA_START)?
                    .map(|t| Value::from(&t)),
                self.store
                    .value(&region, terms::DADA_END)?
                    .map(|t| Value::from(&t)),
            ),
            None => (RegionKind::Unknown, None, None),
        };

        Ok(AnnotationRecord {
            id: annotation.to_plain_string(),
            kind,
            label,
            annotation_type: annotation_type.unwrap_or_default(),
            start,
            end,
            properties,
        })
    }
}
