//! Item, document and collection records assembled from the triple graph.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::Result;
use crate::layout::StorageLayout;
use crate::namespaces::{PrefixTable, terms};
use crate::store::{Term, TriplePattern, TripleStore};
use crate::value::Value;

pub const UNSPECIFIED: &str = "unspecified";

pub const JSONLD_CONTEXT: &str = "https://app.alveo.edu.au/schema/json-ld";

/// Descriptive fields every item record carries, `"unspecified"` when the graph has no value.
pub const REQUIRED_FIELDS: [&str; 18] = [
    "ausnc:speech_style",
    "ausnc:interactivity",
    "olac:discourse_type",
    "ausnc:communication_medium",
    "ausnc:communication_context",
    "ausnc:communication_setting",
    "ausnc:audience",
    "ausnc:plaintextversion",
    "ausnc:written_mode",
    "ausnc:publication_status",
    "alveo:display_document",
    "alveo:handle",
    "ausnc:mode",
    "alveo:date_group",
    "alveo:full_text",
    "dcterms:extent",
    "alveo:indexable_document",
    "alveo:sparqlEndpoint",
];

/// Fixed keys of a document record, in record order.
pub const DOCUMENT_FIELDS: [&str; 7] = [
    "alveo:size",
    "alveo:url",
    "dcterms:extent",
    "dcterms:identifier",
    "dcterms:title",
    "dcterms:type",
    "rdf:type",
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentRecord {
    #[serde(rename = "@id")]
    pub uri: String,
    #[serde(rename = "alveo:size")]
    pub size: Value,
    /// Filled from the document's `dcterms:source`.
    #[serde(rename = "alveo:url")]
    pub url: String,
    #[serde(rename = "dcterms:extent")]
    pub extent: Value,
    #[serde(rename = "dcterms:identifier")]
    pub identifier: Value,
    #[serde(rename = "dcterms:title")]
    pub title: Value,
    #[serde(rename = "dcterms:type")]
    pub doc_type: Value,
    #[serde(rename = "rdf:type")]
    pub rdf_type: Value,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DocumentRecord {
    fn empty(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            size: Value::text(""),
            url: String::new(),
            extent: Value::text(""),
            identifier: Value::text(""),
            title: Value::text(""),
            doc_type: Value::text(""),
            rdf_type: Value::text(terms::FOAF_DOCUMENT),
            extra: BTreeMap::new(),
        }
    }

    fn assign(&mut self, key: &str, value: Value) {
        match key {
            "alveo:size" => self.size = value,
            "alveo:url" => self.url = value.to_string(),
            "dcterms:extent" => self.extent = value,
            "dcterms:identifier" => self.identifier = value,
            "dcterms:title" => self.title = value,
            "dcterms:type" => self.doc_type = value,
            "rdf:type" => self.rdf_type = value,
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemMetadata {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "alveo:catalog_url")]
    pub catalog_url: String,
    #[serde(rename = "alveo:annotations_url")]
    pub annotations_url: String,
    #[serde(rename = "alveo:primary_text_url")]
    pub primary_text_url: String,
    #[serde(rename = "alveo:metadata")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(rename = "alveo:documents")]
    pub documents: Vec<DocumentRecord>,
}

impl ItemMetadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectionRecord {
    pub collection_url: String,
    pub collection_name: Option<String>,
    pub metadata: BTreeMap<String, Value>,
}

/// Builds records from the graph; holds no state beyond its borrowed inputs.
pub struct MetadataAssembler<'a, S: TripleStore + ?Sized> {
    store: &'a S,
    prefixes: &'a PrefixTable,
    layout: &'a StorageLayout,
}

impl<'a, S: TripleStore + ?Sized> MetadataAssembler<'a, S> {
    pub fn new(store: &'a S, prefixes: &'a PrefixTable, layout: &'a StorageLayout) -> Self {
        Self {
            store,
            prefixes,
            layout,
        }
    }

    /// Every `(predicate, value)` of `subject`, keyed by qualified name. The
    /// first value wins for repeated predicates.
    fn properties(&self, subject: &Term) -> Result<BTreeMap<String, Value>> {
        let mut properties = BTreeMap::new();
        for triple in self
            .store
            .triples(&TriplePattern::any().subject(subject.clone()))?
        {
            properties
                .entry(self.prefixes.compact(&triple.predicate))
                .or_insert_with(|| Value::from(&triple.object));
        }
        Ok(properties)
    }

    /// `None` when the graph holds nothing about `item_uri`.
    pub fn item_metadata(&self, item_uri: &str) -> Result<Option<ItemMetadata>> {
        let item = Term::iri(item_uri);
        let mut metadata = self.properties(&item)?;
        if metadata.is_empty() {
            return Ok(None);
        }
        for key in REQUIRED_FIELDS {
            metadata
                .entry(key.to_string())
                .or_insert_with(|| Value::text(UNSPECIFIED));
        }

        let mut documents = Vec::new();
        let mut types = Vec::new();
        let mut titles = Vec::new();
        for document in self.store.objects(&item, terms::AUSNC_DOCUMENT)? {
            let record = self.document(&document)?;
            types.push(record.doc_type.to_string());
            titles.push(record.title.to_string());
            documents.push(record);
        }
        metadata.insert("dcterms:type".to_string(), Value::Text(types.join(", ")));
        metadata.insert("ausnc:document".to_string(), Value::Text(titles.join(", ")));

        let catalog_url = self.catalog_url(&item)?;
        Ok(Some(ItemMetadata {
            context: JSONLD_CONTEXT.to_string(),
            annotations_url: format!("{catalog_url}/annotations.json"),
            primary_text_url: format!("{catalog_url}/primary_text.json"),
            catalog_url,
            metadata,
            documents,
        }))
    }

    fn document(&self, document: &Term) -> Result<DocumentRecord> {
        let mut record = DocumentRecord::empty(&document.to_plain_string());
        for triple in self
            .store
            .triples(&TriplePattern::any().subject(document.clone()))?
        {
            if triple.predicate == terms::DCTERMS_SOURCE {
                record.url = triple.object.to_plain_string();
            } else {
                record.assign(&self.prefixes.compact(&triple.predicate), Value::from(&triple.object));
            }
        }
        Ok(record)
    }

    fn catalog_url(&self, item: &Term) -> Result<String> {
        let collection = match self.store.value(item, terms::DCTERMS_IS_PART_OF)? {
            Some(uri) => {
                let uri = uri.to_plain_string();
                self.layout
                    .collection_name(&uri)
                    .map(str::to_string)
                    .unwrap_or_else(|| last_segment(&uri).to_string())
            }
            None => String::new(),
        };
        let identifier = match self.store.value(item, terms::DCTERMS_IDENTIFIER)? {
            Some(id) => id.value().to_string(),
            None => last_segment(item.value()).to_string(),
        };
        Ok(self.layout.item_catalog_url(&collection, &identifier))
    }

    pub fn display_document_url(&self, item_uri: &str) -> Result<Option<String>> {
        display_document_url(self.store, item_uri)
    }

    /// `None` unless `collection_uri` is typed as a collection.
    pub fn collection(&self, collection_uri: &str) -> Result<Option<CollectionRecord>> {
        let collection = Term::iri(collection_uri);
        let is_collection = self
            .store
            .objects(&collection, terms::RDF_TYPE)?
            .iter()
            .any(|t| t.as_iri() == Some(terms::DCMITYPE_COLLECTION));
        if !is_collection {
            return Ok(None);
        }
        let collection_name = self
            .store
            .value(&collection, terms::DCTERMS_ALTERNATIVE)?
            .map(|name| name.value().to_string());
        Ok(Some(CollectionRecord {
            collection_url: collection_uri.to_string(),
            collection_name,
            metadata: self.properties(&collection)?,
        }))
    }
}

/// `source` URL of the item's indexable document, found by a single hop
/// from the item to its `alveo:indexable_document`.
pub fn display_document_url<S: TripleStore + ?Sized>(store: &S, item_uri: &str) -> Result<Option<String>> {
    let Some(document) = store.value(&Term::iri(item_uri), terms::ALVEO_INDEXABLE_DOCUMENT)? else {
        return Ok(None);
    };
    if matches!(document, Term::Literal(_)) {
        return Ok(None);
    }
    Ok(store
        .value(&document, terms::DCTERMS_SOURCE)?
        .map(|source| source.to_plain_string()))
}

fn last_segment(uri: &str) -> &str {
    uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri)
}
