//! Item lists: named, shareable sets of item URIs.
//!
//! One contract ([`ItemListBackend`]) over three storage substrates, chosen
//! once from [`ItemListConfig`]:
//!
//! | backend      | storage                                  | member order        |
//! |--------------|------------------------------------------|---------------------|
//! | `volatile`   | one in-process record per list           | insertion order     |
//! | `relational` | SQLite `itemlist` + `item` tables        | sorted by item URI  |
//! | `graph`      | triple graph, one N3 file per list       | insertion order     |
//!
//! Relational membership is a set keyed on `(item, list)`; it has no notion
//! of insertion order, so its items come back sorted.
//!
//! [`ItemListStore`] is the facade the catalog exposes: it serializes every
//! mutation and adds the shared/own partitioning and summary views.

mod graph;
mod relational;
mod volatile;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

pub use graph::GraphListStore;
pub use relational::RelationalListStore;
pub use volatile::VolatileListStore;

use crate::config::{ItemListConfig, ListBackendKind};
use crate::errors::{CatalogError, Result};

pub const SHARED: &str = "shared";
pub const OWN: &str = "own";

pub(crate) fn visibility(shared: bool) -> &'static str {
    if shared { SHARED } else { OWN }
}

pub(crate) fn parse_visibility(text: &str) -> Result<bool> {
    match text {
        SHARED => Ok(true),
        OWN => Ok(false),
        other => Err(CatalogError::parse(format!("unknown shared status '{other}'"))),
    }
}

/// Behaviour every list backend provides.
///
/// Reads on an unknown list return `None` or an empty list. Mutations on an
/// unknown list fail with `NotFound`. Adding an item that is already a member
/// is a no-op. List names are unique within a store. List ids and items
/// must be absolute IRIs.
pub trait ItemListBackend: Send + Sync {
    fn create(&self, id: &str, name: &str, shared: bool) -> Result<()>;
    fn add_item(&self, id: &str, item: &str) -> Result<()>;
    fn remove_item(&self, id: &str, item: &str) -> Result<()>;
    fn clear(&self, id: &str) -> Result<()>;
    fn delete(&self, id: &str) -> Result<()>;
    fn rename(&self, id: &str, new_name: &str) -> Result<()>;
    fn set_shared(&self, id: &str, shared: bool) -> Result<()>;
    fn get_items(&self, id: &str) -> Result<Vec<String>>;
    fn get_name(&self, id: &str) -> Result<Option<String>>;
    fn get_shared(&self, id: &str) -> Result<Option<bool>>;
    /// Every list identifier, in creation order.
    fn list_ids(&self) -> Result<Vec<String>>;

    fn find_by_name(&self, name: &str) -> Result<Option<String>> {
        for id in self.list_ids()? {
            if self.get_name(&id)?.as_deref() == Some(name) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

pub(crate) fn missing(id: &str) -> CatalogError {
    CatalogError::not_found(format!("item list {id} does not exist"))
}

/// List ids and members are IRIs on every backend, whether or not the
/// backend itself stores them as graph nodes.
pub(crate) fn check_iri(what: &str, value: &str) -> Result<()> {
    oxrdf::NamedNode::new(value)
        .map(|_| ())
        .map_err(|e| CatalogError::malformed(format!("{what} '{value}' is not an absolute IRI: {e}")))
}

pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::malformed("item list name must not be empty"));
    }
    Ok(())
}

pub enum ListBackend {
    Volatile(VolatileListStore),
    Relational(RelationalListStore),
    Graph(GraphListStore),
}

impl ListBackend {
    pub fn open(config: &ItemListConfig) -> Result<Self> {
        let backend = match config.backend {
            ListBackendKind::Volatile => ListBackend::Volatile(VolatileListStore::new()),
            ListBackendKind::Relational => {
                ListBackend::Relational(RelationalListStore::open(&config.directory)?)
            }
            ListBackendKind::Graph => ListBackend::Graph(GraphListStore::open(&config.directory)?),
        };
        info!(backend = ?config.backend, directory = %config.directory.display(), "opened item list backend");
        Ok(backend)
    }

    pub fn kind(&self) -> ListBackendKind {
        match self {
            ListBackend::Volatile(_) => ListBackendKind::Volatile,
            ListBackend::Relational(_) => ListBackendKind::Relational,
            ListBackend::Graph(_) => ListBackendKind::Graph,
        }
    }

    fn as_backend(&self) -> &dyn ItemListBackend {
        match self {
            ListBackend::Volatile(store) => store,
            ListBackend::Relational(store) => store,
            ListBackend::Graph(store) => store,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemListSummary {
    pub name: String,
    pub shared: bool,
    pub item_list_url: String,
    pub num_items: usize,
}

/// `listAll` result, partitioned by visibility.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ItemListIndex {
    pub shared: Vec<ItemListSummary>,
    pub own: Vec<ItemListSummary>,
}

impl ItemListIndex {
    pub fn len(&self) -> usize {
        self.shared.len() + self.own.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemListSummary> {
        self.shared.iter().chain(self.own.iter())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemListView {
    pub name: String,
    pub shared: bool,
    pub num_items: usize,
    pub items: Vec<String>,
}

/// Human-readable outcome of a list operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub success: String,
}

impl Confirmation {
    fn new(message: String) -> Self {
        Self { success: message }
    }
}

/// Facade over the configured backend. Mutations run one at a time.
pub struct ItemListStore {
    backend: ListBackend,
    write_lock: Mutex<()>,
}

impl ItemListStore {
    pub fn open(config: &ItemListConfig) -> Result<Self> {
        Ok(Self::with_backend(ListBackend::open(config)?))
    }

    pub fn with_backend(backend: ListBackend) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn kind(&self) -> ListBackendKind {
        self.backend.kind()
    }

    fn db(&self) -> &dyn ItemListBackend {
        self.backend.as_backend()
    }

    fn name_of(&self, id: &str) -> Result<String> {
        self.db().get_name(id)?.ok_or_else(|| missing(id))
    }

    pub fn create(&self, id: &str, name: &str, shared: bool) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.db().create(id, name, shared)?;
        debug!(id, name, shared, "created item list");
        Ok(())
    }

    pub fn add_item(&self, id: &str, item: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.db().add_item(id, item)
    }

    pub fn remove_item(&self, id: &str, item: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.db().remove_item(id, item)
    }

    pub fn clear(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.db().clear(id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.db().delete(id)?;
        debug!(id, "deleted item list");
        Ok(())
    }

    pub fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.db().rename(id, new_name)
    }

    pub fn set_shared(&self, id: &str, shared: bool) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.db().set_shared(id, shared)
    }

    pub fn get_items(&self, id: &str) -> Result<Vec<String>> {
        self.db().get_items(id)
    }

    pub fn get_name(&self, id: &str) -> Result<Option<String>> {
        self.db().get_name(id)
    }

    pub fn get_shared(&self, id: &str) -> Result<Option<bool>> {
        self.db().get_shared(id)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<String>> {
        self.db().find_by_name(name)
    }

    pub fn list_all(&self) -> Result<ItemListIndex> {
        let mut index = ItemListIndex::default();
        for id in self.db().list_ids()? {
            let (Some(name), Some(shared)) = (self.db().get_name(&id)?, self.db().get_shared(&id)?)
            else {
                continue;
            };
            let summary = ItemListSummary {
                name,
                shared,
                num_items: self.db().get_items(&id)?.len(),
                item_list_url: id,
            };
            if shared {
                index.shared.push(summary);
            } else {
                index.own.push(summary);
            }
        }
        Ok(index)
    }

    pub fn get_item_list(&self, id: &str) -> Result<Option<ItemListView>> {
        let (Some(name), Some(shared)) = (self.db().get_name(id)?, self.db().get_shared(id)?) else {
            return Ok(None);
        };
        let items = self.db().get_items(id)?;
        Ok(Some(ItemListView {
            name,
            shared,
            num_items: items.len(),
            items,
        }))
    }

    /// Adds `items` to the existing list called `name`.
    pub fn add_items(&self, name: &str, items: &[String]) -> Result<Confirmation> {
        check_name(name)?;
        let _guard = self.write_lock.lock();
        let id = self
            .db()
            .find_by_name(name)?
            .ok_or_else(|| CatalogError::not_found(format!("no item list named '{name}'")))?;
        for item in items {
            self.db().add_item(&id, item)?;
        }
        Ok(Confirmation::new(format!(
            "{} items added to existing item list {name}",
            items.len()
        )))
    }

    pub fn share(&self, id: &str) -> Result<Confirmation> {
        self.set_shared(id, true)?;
        Ok(Confirmation::new(format!(
            "Item list {} is shared. Any user in the application will be able to see it.",
            self.name_of(id)?
        )))
    }

    pub fn unshare(&self, id: &str) -> Result<Confirmation> {
        self.set_shared(id, false)?;
        Ok(Confirmation::new(format!(
            "Item list {} is not being shared anymore.",
            self.name_of(id)?
        )))
    }

    pub fn delete_list(&self, id: &str) -> Result<Confirmation> {
        let _guard = self.write_lock.lock();
        let name = self.name_of(id)?;
        self.db().delete(id)?;
        Ok(Confirmation::new(format!("item list {name} deleted successfully")))
    }

    pub fn clear_list(&self, id: &str) -> Result<Confirmation> {
        let _guard = self.write_lock.lock();
        let removed = self.db().get_items(id)?.len();
        self.db().clear(id)?;
        Ok(Confirmation::new(format!(
            "{removed} cleared from item list {}",
            self.name_of(id)?
        )))
    }
}
