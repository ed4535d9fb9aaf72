//! Item lists as triples, persisted one N3 file per list.
//!
//! ```text
//! <list> a localterms:itemList ;
//!        localterms:itemListName "name" ;
//!        localterms:sharedStatus "shared" | "own" .
//! <item> dcterms:isPartOf <list> .
//! ```
//!
//! The file is named after the list's display name. Every mutation rewrites
//! the list's file before touching the in-memory graph, so the two never
//! disagree after a failed write.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{ItemListBackend, check_iri, check_name, missing, parse_visibility, visibility};
use crate::errors::{CatalogError, Result};
use crate::namespaces::terms;
use crate::store::{
    ChangeSet, SqliteTripleStore, Term, Triple, TriplePattern, TripleStore, attach_directory,
    write_triples,
};

pub struct GraphListStore {
    directory: PathBuf,
    store: SqliteTripleStore,
}

/// File name for a list: ASCII letters, digits, `-`, `_` and spaces are kept,
/// every other byte is percent-encoded.
pub fn list_file_name(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len() + 3);
    for byte in name.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b' ' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded.push_str(".n3");
    encoded
}

impl GraphListStore {
    /// Opens `directory`, loading every list file already in it.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)
            .map_err(|e| CatalogError::unavailable(format!("{}: {e}", directory.display())))?;
        let store = SqliteTripleStore::open_in_memory()?;
        let stats = attach_directory(&store, &directory, |_| None)?;
        debug!(directory = %directory.display(), files = stats.files, "loaded item list graphs");
        Ok(Self { directory, store })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(list_file_name(name))
    }

    fn node(id: &str) -> Term {
        Term::iri(id)
    }

    fn scope(id: &str) -> [TriplePattern; 2] {
        [
            TriplePattern::any().subject(Self::node(id)),
            TriplePattern::any()
                .predicate(terms::DCTERMS_IS_PART_OF)
                .object(Self::node(id)),
        ]
    }

    /// Every triple describing the list, header first, members in insertion order.
    fn list_triples(&self, id: &str) -> Result<Vec<Triple>> {
        let mut triples = Vec::new();
        for pattern in Self::scope(id) {
            triples.extend(self.store.triples(&pattern)?);
        }
        Ok(triples)
    }

    fn exists(&self, id: &str) -> Result<bool> {
        let typed = self.store.triples(
            &TriplePattern::any()
                .subject(Self::node(id))
                .predicate(terms::RDF_TYPE)
                .object(Term::iri(terms::LOCALTERMS_ITEM_LIST)),
        )?;
        Ok(!typed.is_empty())
    }

    fn require_name(&self, id: &str) -> Result<String> {
        self.get_name(id)?.ok_or_else(|| missing(id))
    }

    fn name_taken(&self, name: &str, except: Option<&str>) -> Result<bool> {
        let holders = self.store.subjects(
            terms::LOCALTERMS_ITEM_LIST_NAME,
            &Term::literal(name),
        )?;
        Ok(holders
            .iter()
            .any(|holder| Some(holder.value()) != except))
    }

    /// Writes the list as it will look after `changes`, then applies them.
    fn commit(&self, id: &str, path: &Path, changes: ChangeSet) -> Result<()> {
        let mut next: Vec<Triple> = self
            .list_triples(id)?
            .into_iter()
            .filter(|triple| !changes.removals.iter().any(|p| p.matches(triple)))
            .collect();
        for triple in &changes.insertions {
            if !next.contains(triple) {
                next.push(triple.clone());
            }
        }
        write_triples(path, &next)?;
        self.store.apply(&changes)?;
        Ok(())
    }
}

impl ItemListBackend for GraphListStore {
    fn create(&self, id: &str, name: &str, shared: bool) -> Result<()> {
        check_name(name)?;
        check_iri("item list id", id)?;
        if self.exists(id)? {
            return Err(CatalogError::conflict(format!("item list {id} already exists")));
        }
        if self.name_taken(name, None)? {
            return Err(CatalogError::conflict(format!("an item list named '{name}' already exists")));
        }
        let node = Self::node(id);
        let changes = ChangeSet::new(None).insert_all([
            Triple::new(node.clone(), terms::RDF_TYPE, Term::iri(terms::LOCALTERMS_ITEM_LIST)),
            Triple::new(node.clone(), terms::LOCALTERMS_ITEM_LIST_NAME, Term::literal(name)),
            Triple::new(node, terms::LOCALTERMS_SHARED_STATUS, Term::literal(visibility(shared))),
        ]);
        self.commit(id, &self.path_for(name), changes)
    }

    fn add_item(&self, id: &str, item: &str) -> Result<()> {
        check_iri("item", item)?;
        let name = self.require_name(id)?;
        let changes = ChangeSet::new(None).insert(Triple::new(
            Term::iri(item),
            terms::DCTERMS_IS_PART_OF,
            Self::node(id),
        ));
        self.commit(id, &self.path_for(&name), changes)
    }

    fn remove_item(&self, id: &str, item: &str) -> Result<()> {
        let name = self.require_name(id)?;
        let changes = ChangeSet::new(None).remove(
            TriplePattern::any()
                .subject(Term::iri(item))
                .predicate(terms::DCTERMS_IS_PART_OF)
                .object(Self::node(id)),
        );
        self.commit(id, &self.path_for(&name), changes)
    }

    fn clear(&self, id: &str) -> Result<()> {
        let name = self.require_name(id)?;
        let changes = ChangeSet::new(None).remove(
            TriplePattern::any()
                .predicate(terms::DCTERMS_IS_PART_OF)
                .object(Self::node(id)),
        );
        self.commit(id, &self.path_for(&name), changes)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let name = self.require_name(id)?;
        let path = self.path_for(&name);
        let current = self.list_triples(id)?;
        let [about, members] = Self::scope(id);
        self.store
            .apply(&ChangeSet::new(None).remove(about).remove(members))?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                if let Err(restore) = self.store.insert_all(None, &current) {
                    warn!(list = id, error = %restore, "could not restore item list after failed delete");
                }
                Err(CatalogError::io(format!("{}: {e}", path.display())))
            }
        }
    }

    fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        check_name(new_name)?;
        let old_name = self.require_name(id)?;
        if self.name_taken(new_name, Some(id))? {
            return Err(CatalogError::conflict(format!(
                "an item list named '{new_name}' already exists"
            )));
        }
        let old_path = self.path_for(&old_name);
        let current = self.list_triples(id)?;
        fs::remove_file(&old_path)
            .map_err(|e| CatalogError::io(format!("{}: {e}", old_path.display())))?;
        let changes = ChangeSet::new(None)
            .remove(
                TriplePattern::any()
                    .subject(Self::node(id))
                    .predicate(terms::LOCALTERMS_ITEM_LIST_NAME),
            )
            .insert(Triple::new(
                Self::node(id),
                terms::LOCALTERMS_ITEM_LIST_NAME,
                Term::literal(new_name),
            ));
        if let Err(err) = self.commit(id, &self.path_for(new_name), changes) {
            if let Err(restore) = write_triples(&old_path, &current) {
                warn!(list = id, error = %restore, "could not restore item list file after failed rename");
            }
            return Err(err);
        }
        Ok(())
    }

    fn set_shared(&self, id: &str, shared: bool) -> Result<()> {
        let name = self.require_name(id)?;
        let changes = ChangeSet::new(None)
            .remove(
                TriplePattern::any()
                    .subject(Self::node(id))
                    .predicate(terms::LOCALTERMS_SHARED_STATUS),
            )
            .insert(Triple::new(
                Self::node(id),
                terms::LOCALTERMS_SHARED_STATUS,
                Term::literal(visibility(shared)),
            ));
        self.commit(id, &self.path_for(&name), changes)
    }

    fn get_items(&self, id: &str) -> Result<Vec<String>> {
        let members = self
            .store
            .subjects(terms::DCTERMS_IS_PART_OF, &Self::node(id))?;
        Ok(members.iter().map(Term::to_plain_string).collect())
    }

    fn get_name(&self, id: &str) -> Result<Option<String>> {
        if !self.exists(id)? {
            return Ok(None);
        }
        Ok(self
            .store
            .value(&Self::node(id), terms::LOCALTERMS_ITEM_LIST_NAME)?
            .map(|name| name.value().to_string()))
    }

    fn get_shared(&self, id: &str) -> Result<Option<bool>> {
        if !self.exists(id)? {
            return Ok(None);
        }
        match self
            .store
            .value(&Self::node(id), terms::LOCALTERMS_SHARED_STATUS)?
        {
            Some(status) => parse_visibility(status.value()).map(Some),
            None => Ok(Some(false)),
        }
    }

    fn list_ids(&self) -> Result<Vec<String>> {
        let lists = self
            .store
            .subjects(terms::RDF_TYPE, &Term::iri(terms::LOCALTERMS_ITEM_LIST))?;
        Ok(lists.iter().map(Term::to_plain_string).collect())
    }
}
