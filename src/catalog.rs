//! The catalog facade: one attached corpus graph plus the services built on it.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use ahash::AHashSet;
use tracing::{debug, info};

use crate::annotations::{
    AnnotationFilter, AnnotationIdAllocator, AnnotationQuery, AnnotationReceipt, AnnotationRecorder,
    AnnotationSet, AnnotationUpload,
};
use crate::config::CatalogConfig;
use crate::errors::{CatalogError, Result};
use crate::itemlist::ItemListStore;
use crate::layout::StorageLayout;
use crate::metadata::{CollectionRecord, ItemMetadata, MetadataAssembler};
use crate::namespaces::{PrefixTable, terms};
use crate::provenance::{IdentityRegistry, StubRegistry};
use crate::resolver::{EntityKind, EntityResolver};
use crate::store::{
    SelectQuery, SparqlResults, SqliteTripleStore, Term, TripleStore, attach_directory,
};

/// Version string reported by [`Catalog::version`].
pub const API_VERSION: &str = "V2.0";

pub struct Catalog {
    config: CatalogConfig,
    layout: StorageLayout,
    prefixes: PrefixTable,
    store: Box<dyn TripleStore>,
    registry: Box<dyn IdentityRegistry>,
    allocator: AnnotationIdAllocator,
    item_lists: ItemListStore,
}

impl Catalog {
    /// Creates an empty catalog over an in-memory graph. Nothing is loaded
    /// until [`Catalog::attach`] is called.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let store = SqliteTripleStore::open_in_memory()?;
        Self::with_store(config, Box::new(store))
    }

    pub fn with_store(config: CatalogConfig, store: Box<dyn TripleStore>) -> Result<Self> {
        let layout = StorageLayout::new(config.base_url.as_str(), config.data_dir.as_path());
        let prefixes = config.prefix_table();
        let registry = Box::new(StubRegistry::new(config.base_url.as_str()));
        let item_lists = ItemListStore::open(&config.item_lists)?;
        Ok(Self {
            config,
            layout,
            prefixes,
            store,
            registry,
            allocator: AnnotationIdAllocator::new(),
            item_lists,
        })
    }

    /// Creates the catalog and attaches its configured data directory.
    pub fn open(config: CatalogConfig) -> Result<Self> {
        let catalog = Self::new(config)?;
        catalog.attach_data_dir()?;
        Ok(catalog)
    }

    pub fn with_registry(mut self, registry: Box<dyn IdentityRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn prefixes(&self) -> &PrefixTable {
        &self.prefixes
    }

    pub fn store(&self) -> &dyn TripleStore {
        self.store.as_ref()
    }

    pub fn item_lists(&self) -> &ItemListStore {
        &self.item_lists
    }

    pub fn version(&self) -> &'static str {
        API_VERSION
    }

    /// Loads every graph file under `dir`; files inside a top-level
    /// directory land in the graph of the collection of that name. Returns
    /// the total number of triples held afterwards.
    pub fn attach<P: AsRef<Path>>(&self, dir: P) -> Result<usize> {
        let root = dir.as_ref();
        let stats = attach_directory(self.store.as_ref(), root, |file| {
            self.layout.graph_for_file(root, file)
        })?;
        let total = self.store.len()?;
        info!(dir = %root.display(), files = stats.files, inserted = stats.inserted, total, "catalog attached");
        Ok(total)
    }

    pub fn attach_data_dir(&self) -> Result<usize> {
        self.attach(self.layout.data_dir())
    }

    /// URIs of every collection in the graph.
    pub fn get_collections(&self) -> Result<Vec<String>> {
        let collections = self
            .store
            .subjects(terms::RDF_TYPE, &Term::iri(terms::DCMITYPE_COLLECTION))?;
        Ok(collections
            .iter()
            .filter_map(Term::as_iri)
            .map(str::to_string)
            .collect())
    }

    /// Collection by name or URI.
    pub fn get_collection(&self, id: &str) -> Result<Option<CollectionRecord>> {
        let uri = self.layout.collection_uri_for(id);
        self.assembler().collection(&uri)
    }

    pub fn get_item_metadata(&self, item_uri: &str) -> Result<Option<ItemMetadata>> {
        self.assembler().item_metadata(item_uri)
    }

    /// Text of the item's display document, when it maps to a readable local file.
    pub fn get_primary_text(&self, item_uri: &str) -> Result<Option<String>> {
        let Some(url) = self.assembler().display_document_url(item_uri)? else {
            return Ok(None);
        };
        let Some(path) = self.layout.uri_to_path(&url) else {
            debug!(item = item_uri, url = %url, "display document lies outside the data directory");
            return Ok(None);
        };
        read_optional(&path)
    }

    pub fn get_document(&self, collection: &str, filename: &str) -> Result<Option<String>> {
        let path = self.layout.document_path(collection, filename)?;
        read_optional(&path)
    }

    pub fn get_annotations(&self, item_uri: &str, filter: &AnnotationFilter) -> Result<AnnotationSet> {
        AnnotationQuery::new(self.store.as_ref(), &self.prefixes, self.registry.as_ref())
            .get_annotations(item_uri, filter)
    }

    pub fn get_annotation_types(&self, item_uri: &str) -> Result<Vec<String>> {
        AnnotationQuery::new(self.store.as_ref(), &self.prefixes, self.registry.as_ref())
            .annotation_types(item_uri)
    }

    /// Subjects carrying every `(qualified predicate, literal value)` pair.
    /// An empty term list matches nothing.
    pub fn search(&self, query: &[(&str, &str)]) -> Result<Vec<String>> {
        let mut result: Option<Vec<String>> = None;
        for (predicate, value) in query {
            let predicate = self.prefixes.expand(predicate)?;
            let mut seen = AHashSet::new();
            let matches: Vec<String> = self
                .store
                .subjects(&predicate, &Term::literal(*value))?
                .iter()
                .map(Term::to_plain_string)
                .filter(|subject| seen.insert(subject.clone()))
                .collect();
            result = Some(match result {
                None => matches,
                Some(previous) => {
                    let keep: AHashSet<&String> = matches.iter().collect();
                    previous
                        .into_iter()
                        .filter(|subject| keep.contains(subject))
                        .collect()
                }
            });
            if result.as_ref().is_some_and(Vec::is_empty) {
                break;
            }
        }
        Ok(result.unwrap_or_default())
    }

    /// Runs a SPARQL SELECT against one collection's graph. `None` when the
    /// collection is unknown.
    pub fn search_graph(&self, collection: &str, query: &str) -> Result<Option<SparqlResults>> {
        let uri = self.layout.collection_uri_for(collection);
        if !self.is_collection(&uri)? {
            return Ok(None);
        }
        let query = SelectQuery::parse(query)?;
        query.evaluate(self.store.as_ref(), Some(uri.as_str())).map(Some)
    }

    /// Records an upload in the collection's graph and on disk.
    pub fn add_annotation(&self, collection: &str, upload: &AnnotationUpload) -> Result<AnnotationReceipt> {
        let uri = self.layout.collection_uri_for(collection);
        if !self.is_collection(&uri)? {
            return Err(CatalogError::not_found(format!("collection {collection}")));
        }
        AnnotationRecorder::new(
            self.store.as_ref(),
            &self.prefixes,
            &self.layout,
            self.registry.as_ref(),
            &self.allocator,
            &self.config.software_agent,
        )
        .add_annotation(&uri, upload)
    }

    /// Issues the collection's next annotation id. The id is recorded in the
    /// collection's allocator file, so a catalog reopened over the same data
    /// directory continues above it.
    pub fn next_annotation_id(&self, collection: &str) -> Result<String> {
        let uri = self.layout.collection_uri_for(collection);
        let mark_file = self.layout.annotation_counter_file(&uri)?;
        self.allocator
            .next_id_recorded(self.store.as_ref(), &uri, Some(&mark_file))
    }

    pub fn resolve(&self, target: EntityKind, source: EntityKind, uri: &str) -> Result<Vec<String>> {
        EntityResolver::new(self.store.as_ref()).resolve(target, source, uri)
    }

    fn assembler(&self) -> MetadataAssembler<'_, dyn TripleStore> {
        MetadataAssembler::new(self.store.as_ref(), &self.prefixes, &self.layout)
    }

    fn is_collection(&self, uri: &str) -> Result<bool> {
        Ok(self
            .store
            .objects(&Term::iri(uri), terms::RDF_TYPE)?
            .iter()
            .any(|t| t.as_iri() == Some(terms::DCMITYPE_COLLECTION)))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CatalogError::io(format!("{}: {e}", path.display()))),
    }
}
