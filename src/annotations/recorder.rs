//! Recording uploaded annotation batches with their provenance.
//!
//! A batch becomes one annotation collection linked to the item, an activity
//! associated with the recording software and the submitting user, and one
//! annotation plus region per uploaded annotation. The batch is written to its
//! own file under the collection's annotation directory and inserted into the
//! collection graph; if either step fails nothing of the batch remains.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{AnnotationIdAllocator, RegionKind};
use crate::errors::{CatalogError, Result};
use crate::layout::StorageLayout;
use crate::namespaces::{PrefixTable, terms};
use crate::provenance::IdentityRegistry;
use crate::resolver::{EntityKind, EntityResolver};
use crate::store::{Literal, Term, Triple, TripleStore, write_triples};

/// Text offsets at or above this do not fit the stored integer bounds.
const TEXT_OFFSET_LIMIT: f64 = i64::MAX as f64;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewAnnotation {
    #[serde(rename = "@type", default)]
    pub kind: RegionKind,
    /// Qualified name or IRI; a bare word is stored as a plain literal.
    #[serde(rename = "type")]
    pub annotation_type: String,
    #[serde(default)]
    pub label: Option<String>,
    pub start: f64,
    pub end: f64,
}

impl NewAnnotation {
    pub fn text(annotation_type: &str, label: Option<&str>, start: u64, end: u64) -> Self {
        Self {
            kind: RegionKind::Text,
            annotation_type: annotation_type.to_string(),
            label: label.map(str::to_string),
            start: start as f64,
            end: end as f64,
        }
    }

    pub fn seconds(annotation_type: &str, label: Option<&str>, start: f64, end: f64) -> Self {
        Self {
            kind: RegionKind::Second,
            annotation_type: annotation_type.to_string(),
            label: label.map(str::to_string),
            start,
            end,
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        let problem = if self.annotation_type.trim().is_empty() {
            Some("missing type".to_string())
        } else if self.kind == RegionKind::Unknown {
            Some("unknown region kind".to_string())
        } else if !self.start.is_finite() || !self.end.is_finite() || self.start < 0.0 {
            Some(format!("invalid bounds {}..{}", self.start, self.end))
        } else if self.end < self.start {
            Some(format!("end {} before start {}", self.end, self.start))
        } else if self.kind == RegionKind::Text
            && (self.start.fract() != 0.0 || self.end.fract() != 0.0)
        {
            Some("text offsets must be whole numbers".to_string())
        } else if self.kind == RegionKind::Text && self.end >= TEXT_OFFSET_LIMIT {
            Some(format!("text offset {} out of range", self.end))
        } else {
            None
        };
        match problem {
            Some(problem) => Err(CatalogError::malformed(format!(
                "annotation {index}: {problem}"
            ))),
            None => Ok(()),
        }
    }

    fn bound(&self, value: f64) -> Literal {
        match self.kind {
            RegionKind::Text => Literal::integer(value as i64),
            _ => Literal::double(value),
        }
    }
}

/// An upload: the annotated item, who submitted it, and the annotations in
/// the `@graph` array of the JSON-LD payload.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnnotationUpload {
    pub item: String,
    pub user: String,
    /// Software identifier; the configured agent when absent.
    #[serde(default)]
    pub software: Option<String>,
    #[serde(rename = "@graph", alias = "annotations")]
    pub annotations: Vec<NewAnnotation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnnotationReceipt {
    pub success: String,
    pub annotation_collection: String,
    pub annotations: Vec<String>,
    #[serde(skip)]
    pub file: PathBuf,
}

pub struct AnnotationRecorder<'a, S: TripleStore + ?Sized> {
    store: &'a S,
    prefixes: &'a PrefixTable,
    layout: &'a StorageLayout,
    registry: &'a dyn IdentityRegistry,
    allocator: &'a AnnotationIdAllocator,
    software_agent: &'a str,
}

impl<'a, S: TripleStore + ?Sized> AnnotationRecorder<'a, S> {
    pub fn new(
        store: &'a S,
        prefixes: &'a PrefixTable,
        layout: &'a StorageLayout,
        registry: &'a dyn IdentityRegistry,
        allocator: &'a AnnotationIdAllocator,
        software_agent: &'a str,
    ) -> Self {
        Self {
            store,
            prefixes,
            layout,
            registry,
            allocator,
            software_agent,
        }
    }

    pub fn add_annotation(&self, collection_uri: &str, upload: &AnnotationUpload) -> Result<AnnotationReceipt> {
        let collection_uri = collection_uri.trim_end_matches('/');
        if upload.annotations.is_empty() {
            return Err(CatalogError::malformed("annotation upload contains no annotations"));
        }
        for (index, annotation) in upload.annotations.iter().enumerate() {
            annotation.validate(index)?;
        }
        let types = upload
            .annotations
            .iter()
            .map(|a| self.type_term(&a.annotation_type))
            .collect::<Result<Vec<_>>>()?;

        let owners = EntityResolver::new(self.store).resolve(
            EntityKind::Collection,
            EntityKind::Item,
            &upload.item,
        )?;
        if !owners.iter().any(|owner| owner == collection_uri) {
            return Err(CatalogError::not_found(format!(
                "item {} is not part of collection {collection_uri}",
                upload.item
            )));
        }

        let user = self.registry.lookup_user(&upload.user)?;
        let software = self
            .registry
            .lookup_software(upload.software.as_deref().unwrap_or(self.software_agent))?;

        let batch_id = Uuid::new_v4().to_string();
        let batch = Term::iri(format!("{collection_uri}/annotation_collection/{batch_id}"));
        let activity = Term::iri(format!("{collection_uri}/activity/{batch_id}"));
        let path = self.layout.annotation_file(collection_uri, &batch_id)?;
        let now = Literal::date_time(Utc::now());

        let mut header = vec![
            Triple::new(batch.clone(), terms::RDF_TYPE, Term::iri(terms::DADA_ANNOTATION_COLLECTION)),
            Triple::new(batch.clone(), terms::DADA_ANNOTATES, Term::iri(upload.item.as_str())),
            Triple::new(batch.clone(), terms::PROV_GENERATED_AT_TIME, Term::Literal(now.clone())),
            Triple::new(batch.clone(), terms::PROV_WAS_GENERATED_BY, activity.clone()),
            Triple::new(activity.clone(), terms::RDF_TYPE, Term::iri(terms::PROV_ACTIVITY)),
            Triple::new(activity.clone(), terms::PROV_STARTED_AT_TIME, Term::Literal(now)),
            Triple::new(activity.clone(), terms::PROV_WAS_ASSOCIATED_WITH, Term::iri(software.id.as_str())),
            Triple::new(activity.clone(), terms::PROV_WAS_ASSOCIATED_WITH, Term::iri(user.id.as_str())),
            Triple::new(Term::iri(software.id.as_str()), terms::RDF_TYPE, Term::iri(terms::PROV_SOFTWARE_AGENT)),
            Triple::new(Term::iri(software.id.as_str()), terms::RDFS_LABEL, Term::literal(software.label.as_str())),
            Triple::new(Term::iri(software.id.as_str()), terms::DCTERMS_SOURCE, Term::iri(software.source_uri.as_str())),
            Triple::new(Term::iri(user.id.as_str()), terms::RDF_TYPE, Term::iri(terms::PROV_PERSON)),
            Triple::new(Term::iri(user.id.as_str()), terms::FOAF_NAME, Term::literal(user.display_name.as_str())),
        ];

        let count = upload.annotations.len();
        self.allocator
            .reserve(self.store, collection_uri, count, |ids| {
                for ((id, annotation), annotation_type) in ids.iter().zip(&upload.annotations).zip(types) {
                    header.extend(annotation_triples(id, &batch, annotation, annotation_type));
                }
                let triples = header;
                write_triples(&path, &triples)?;
                if let Err(err) = self.store.insert_all(Some(collection_uri), &triples) {
                    if let Err(cleanup) = fs::remove_file(&path) {
                        warn!(file = %path.display(), error = %cleanup, "could not remove annotation file");
                    }
                    return Err(err);
                }
                info!(
                    collection = collection_uri,
                    item = upload.item.as_str(),
                    annotations = count,
                    file = %path.display(),
                    "recorded annotation batch"
                );
                Ok(AnnotationReceipt {
                    success: format!("{count} annotations added to {}", upload.item),
                    annotation_collection: batch.to_plain_string(),
                    annotations: ids,
                    file: path.clone(),
                })
            })
    }

    fn type_term(&self, annotation_type: &str) -> Result<Term> {
        let annotation_type = annotation_type.trim();
        if annotation_type.contains(':') {
            Ok(Term::Iri(self.prefixes.expand(annotation_type)?))
        } else {
            Ok(Term::literal(annotation_type))
        }
    }
}

fn annotation_triples(id: &str, batch: &Term, annotation: &NewAnnotation, annotation_type: Term) -> Vec<Triple> {
    let node = Term::iri(id);
    let region = Term::iri(format!("{id}/region"));
    let mut triples = vec![
        Triple::new(node.clone(), terms::RDF_TYPE, Term::iri(terms::DADA_ANNOTATION)),
        Triple::new(node.clone(), terms::DADA_PART_OF, batch.clone()),
        Triple::new(node.clone(), terms::DADA_TYPE, annotation_type),
        Triple::new(node.clone(), terms::DADA_TARGETS, region.clone()),
    ];
    if let Some(label) = &annotation.label {
        triples.push(Triple::new(node, terms::DADA_LABEL, Term::literal(label.as_str())));
    }
    if let Some(region_type) = annotation.kind.region_type() {
        triples.push(Triple::new(region.clone(), terms::RDF_TYPE, Term::iri(region_type)));
    }
    triples.push(Triple::new(
        region.clone(),
        terms::DADA_START,
        Term::Literal(annotation.bound(annotation.start)),
    ));
    triples.push(Triple::new(
        region,
        terms::DADA_END,
        Term::Literal(annotation.bound(annotation.end)),
    ));
    triples
}
