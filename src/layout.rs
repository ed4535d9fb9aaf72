//! Mapping between catalog URIs and locations under the data directory.
//!
//! ```text
//! <base>catalog/<collection>                  collection URI, graph name of <data_dir>/<collection>/**
//! <base>catalog/<collection>/<identifier>     item catalog URL
//! <base><relative path>                       document URIs -> <data_dir>/<relative path>
//! <data_dir>/documents/<collection>/<file>    raw documents
//! <data_dir>/<collection>/annotations/<id>.n3 persisted annotation batches
//! ```

use std::path::{Component, Path, PathBuf};

use crate::errors::{CatalogError, Result};

pub const CATALOG_SEGMENT: &str = "catalog/";
pub const DOCUMENTS_DIR: &str = "documents";
const ANNOTATIONS_DIR: &str = "annotations";
const COUNTER_FILE_STEM: &str = "allocator";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLayout {
    base_url: String,
    data_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            data_dir: data_dir.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn collection_uri(&self, name: &str) -> String {
        format!("{}{}{}", self.base_url, CATALOG_SEGMENT, name)
    }

    /// Collection name of a collection URI, or of any URI nested under one.
    pub fn collection_name<'a>(&self, uri: &'a str) -> Option<&'a str> {
        let rest = uri
            .strip_prefix(self.base_url.as_str())?
            .strip_prefix(CATALOG_SEGMENT)?;
        let name = rest.split('/').next()?;
        (!name.is_empty()).then_some(name)
    }

    /// Accepts either a bare collection name or a collection URI.
    pub fn collection_uri_for(&self, id: &str) -> String {
        match self.collection_name(id) {
            Some(_) => id.to_string(),
            None => self.collection_uri(id),
        }
    }

    pub fn item_catalog_url(&self, collection: &str, identifier: &str) -> String {
        format!("{}/{}", self.collection_uri(collection), identifier)
    }

    /// Graph name for a file found while attaching `root`: files inside a
    /// top-level directory belong to the collection of that name.
    pub fn graph_for_file(&self, root: &Path, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(root).ok()?;
        let mut components = relative.components();
        let first = components.next()?;
        components.next()?;
        match first {
            Component::Normal(name) => name.to_str().map(|n| self.collection_uri(n)),
            _ => None,
        }
    }

    /// Local path for a URI under the base URL, if the URI maps into the data directory.
    pub fn uri_to_path(&self, uri: &str) -> Option<PathBuf> {
        let suffix = uri.strip_prefix(self.base_url.as_str())?;
        let relative = Path::new(suffix);
        if suffix.is_empty() || !is_plain_relative(relative) {
            return None;
        }
        Some(self.data_dir.join(relative))
    }

    pub fn document_path(&self, collection: &str, filename: &str) -> Result<PathBuf> {
        check_segment(collection)?;
        check_segment(filename)?;
        Ok(self
            .data_dir
            .join(DOCUMENTS_DIR)
            .join(collection)
            .join(filename))
    }

    pub fn annotation_file(&self, collection_uri: &str, batch_id: &str) -> Result<PathBuf> {
        let collection = self.collection_name(collection_uri).ok_or_else(|| {
            CatalogError::malformed(format!("{collection_uri} is not a collection URI"))
        })?;
        check_segment(collection)?;
        check_segment(batch_id)?;
        Ok(self
            .data_dir
            .join(collection)
            .join(ANNOTATIONS_DIR)
            .join(format!("{batch_id}.n3")))
    }

    /// File holding the collection's annotation id high-water mark.
    pub fn annotation_counter_file(&self, collection_uri: &str) -> Result<PathBuf> {
        self.annotation_file(collection_uri, COUNTER_FILE_STEM)
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn check_segment(segment: &str) -> Result<()> {
    let plain = !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\');
    if plain {
        Ok(())
    } else {
        Err(CatalogError::malformed(format!(
            "'{segment}' is not a plain file name"
        )))
    }
}
