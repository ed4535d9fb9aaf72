//! Configuration for the catalog and for item-list backend selection.
//!
//! Configuration is an immutable value handed to [`crate::Catalog::new`] and
//! [`crate::ItemListStore::open`]; nothing reads it from global state afterwards.
//!
//! ```rust
//! use alveograph::{CatalogConfig, ItemListConfig, ListBackendKind};
//!
//! let cfg = CatalogConfig::new("tests/data");
//! assert_eq!(cfg.base_url, "http://localhost:3000/");
//!
//! let lists = ItemListConfig::relational("/tmp/lists");
//! assert_eq!(lists.backend, ListBackendKind::Relational);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{CatalogError, Result};
use crate::namespaces::PrefixTable;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/";
pub const DEFAULT_SOFTWARE_AGENT: &str = "alveograph";

/// Storage substrate for item lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListBackendKind {
    /// In-process ordered lists; contents do not survive the process.
    #[default]
    Volatile,
    /// SQLite tables `itemlist` and `item` in `<directory>/itemlists.db`.
    Relational,
    /// One graph file per list under `<directory>`.
    Graph,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ItemListConfig {
    pub backend: ListBackendKind,
    /// Directory holding the backend's durable state; unused by the volatile backend.
    pub directory: PathBuf,
}

impl Default for ItemListConfig {
    fn default() -> Self {
        Self {
            backend: ListBackendKind::Volatile,
            directory: PathBuf::from("itemlists"),
        }
    }
}

impl ItemListConfig {
    pub fn new(backend: ListBackendKind, directory: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            directory: directory.into(),
        }
    }

    pub fn volatile() -> Self {
        Self::default()
    }

    pub fn relational(directory: impl Into<PathBuf>) -> Self {
        Self::new(ListBackendKind::Relational, directory)
    }

    pub fn graph(directory: impl Into<PathBuf>) -> Self {
        Self::new(ListBackendKind::Graph, directory)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Public URL prefix of every catalog URI; always ends with `/`.
    pub base_url: String,
    /// Root of the attached corpus: collection graphs, documents and annotation files.
    pub data_dir: PathBuf,
    /// Extra `prefix -> namespace` bindings layered over the built-in table.
    pub prefixes: BTreeMap<String, String>,
    /// Identifier passed to the provenance registry for the recording software.
    pub software_agent: String,
    pub item_lists: ItemListConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("data"),
            prefixes: BTreeMap::new(),
            software_agent: DEFAULT_SOFTWARE_AGENT.to_string(),
            item_lists: ItemListConfig::default(),
        }
    }
}

impl CatalogConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.normalized()
    }

    pub fn with_item_lists(mut self, item_lists: ItemListConfig) -> Self {
        self.item_lists = item_lists;
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: CatalogConfig =
            toml::from_str(text).map_err(|e| CatalogError::malformed(e.to_string()))?;
        Ok(cfg.normalized())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            CatalogError::io(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Built-in prefixes with the configured extras applied.
    pub fn prefix_table(&self) -> PrefixTable {
        let mut table = PrefixTable::default();
        for (prefix, namespace) in &self.prefixes {
            table.register(prefix, namespace);
        }
        table
    }

    fn normalized(mut self) -> Self {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        self
    }
}
