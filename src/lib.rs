//! Graph-backed catalog for linguistic corpora.
//!
//! The catalog attaches a directory of RDF graph files (one top-level
//! directory per collection) into a SQLite-backed triple store and answers
//! catalog questions from it: collections, item metadata, primary text,
//! annotations, literal search and SPARQL SELECT. Annotation uploads are
//! recorded back into the graph and onto disk with provenance. Item lists
//! live behind a separate store with volatile, relational and graph backends.
//!
//! ```no_run
//! use alveograph::{AnnotationFilter, Catalog, CatalogConfig};
//!
//! let catalog = Catalog::open(CatalogConfig::new("tests/data"))?;
//! for uri in catalog.get_collections()? {
//!     println!("{uri}");
//! }
//! let item = "http://localhost:3000/catalog/cooee/items/1-012";
//! let annotations = catalog.get_annotations(item, &AnnotationFilter::new())?;
//! println!("{} annotations", annotations.len());
//! # Ok::<(), alveograph::CatalogError>(())
//! ```

pub mod annotations;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod itemlist;
pub mod layout;
pub mod metadata;
pub mod namespaces;
pub mod provenance;
pub mod resolver;
pub mod store;
pub mod value;

pub use crate::annotations::{
    AnnotationFilter, AnnotationIdAllocator, AnnotationReceipt, AnnotationRecord, AnnotationSet,
    AnnotationUpload, NewAnnotation, RegionKind,
};
pub use crate::catalog::{API_VERSION, Catalog};
pub use crate::config::{CatalogConfig, ItemListConfig, ListBackendKind};
pub use crate::errors::{CatalogError, Result};
pub use crate::itemlist::{
    Confirmation, ItemListBackend, ItemListIndex, ItemListStore, ItemListSummary, ItemListView,
};
pub use crate::layout::StorageLayout;
pub use crate::metadata::{CollectionRecord, DocumentRecord, ItemMetadata};
pub use crate::namespaces::PrefixTable;
pub use crate::provenance::{IdentityRegistry, SoftwareRecord, StubRegistry, UserRecord};
pub use crate::resolver::{EntityKind, EntityResolver};
pub use crate::store::{SparqlResults, SqliteTripleStore, Term, Triple, TriplePattern, TripleStore};
pub use crate::value::Value;
