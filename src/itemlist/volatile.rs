//! In-process item lists.
//!
//! Each list is one record: position 0 holds the name, position 1 the shared
//! status (`shared` / `own`), the rest are item URIs in insertion order.

use ahash::AHashMap;
use parking_lot::RwLock;

use super::{ItemListBackend, check_iri, check_name, missing, parse_visibility, visibility};
use crate::errors::{CatalogError, Result};

const NAME_SLOT: usize = 0;
const SHARED_SLOT: usize = 1;
const FIRST_ITEM: usize = 2;

#[derive(Debug, Default)]
struct Lists {
    order: Vec<String>,
    records: AHashMap<String, Vec<String>>,
}

impl Lists {
    fn record_mut(&mut self, id: &str) -> Result<&mut Vec<String>> {
        self.records.get_mut(id).ok_or_else(|| missing(id))
    }

    fn name_taken(&self, name: &str, except: Option<&str>) -> bool {
        self.records
            .iter()
            .any(|(id, record)| Some(id.as_str()) != except && record[NAME_SLOT] == name)
    }
}

#[derive(Debug, Default)]
pub struct VolatileListStore {
    lists: RwLock<Lists>,
}

impl VolatileListStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemListBackend for VolatileListStore {
    fn create(&self, id: &str, name: &str, shared: bool) -> Result<()> {
        check_name(name)?;
        check_iri("item list id", id)?;
        let mut lists = self.lists.write();
        if lists.records.contains_key(id) {
            return Err(CatalogError::conflict(format!("item list {id} already exists")));
        }
        if lists.name_taken(name, None) {
            return Err(CatalogError::conflict(format!("an item list named '{name}' already exists")));
        }
        lists
            .records
            .insert(id.to_string(), vec![name.to_string(), visibility(shared).to_string()]);
        lists.order.push(id.to_string());
        Ok(())
    }

    fn add_item(&self, id: &str, item: &str) -> Result<()> {
        check_iri("item", item)?;
        let mut lists = self.lists.write();
        let record = lists.record_mut(id)?;
        if !record[FIRST_ITEM..].iter().any(|existing| existing == item) {
            record.push(item.to_string());
        }
        Ok(())
    }

    fn remove_item(&self, id: &str, item: &str) -> Result<()> {
        let mut lists = self.lists.write();
        let record = lists.record_mut(id)?;
        if let Some(offset) = record[FIRST_ITEM..].iter().position(|existing| existing == item) {
            record.remove(FIRST_ITEM + offset);
        }
        Ok(())
    }

    fn clear(&self, id: &str) -> Result<()> {
        let mut lists = self.lists.write();
        lists.record_mut(id)?.truncate(FIRST_ITEM);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut lists = self.lists.write();
        if lists.records.remove(id).is_none() {
            return Err(missing(id));
        }
        lists.order.retain(|existing| existing != id);
        Ok(())
    }

    fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        check_name(new_name)?;
        let mut lists = self.lists.write();
        if lists.name_taken(new_name, Some(id)) {
            return Err(CatalogError::conflict(format!(
                "an item list named '{new_name}' already exists"
            )));
        }
        lists.record_mut(id)?[NAME_SLOT] = new_name.to_string();
        Ok(())
    }

    fn set_shared(&self, id: &str, shared: bool) -> Result<()> {
        let mut lists = self.lists.write();
        lists.record_mut(id)?[SHARED_SLOT] = visibility(shared).to_string();
        Ok(())
    }

    fn get_items(&self, id: &str) -> Result<Vec<String>> {
        let lists = self.lists.read();
        Ok(lists
            .records
            .get(id)
            .map(|record| record[FIRST_ITEM..].to_vec())
            .unwrap_or_default())
    }

    fn get_name(&self, id: &str) -> Result<Option<String>> {
        let lists = self.lists.read();
        Ok(lists.records.get(id).map(|record| record[NAME_SLOT].clone()))
    }

    fn get_shared(&self, id: &str) -> Result<Option<bool>> {
        let lists = self.lists.read();
        lists
            .records
            .get(id)
            .map(|record| parse_visibility(&record[SHARED_SLOT]))
            .transpose()
    }

    fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.lists.read().order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L1: &str = "http://localhost:3000/item_lists/1";
    const L2: &str = "http://localhost:3000/item_lists/2";

    #[test]
    fn items_keep_insertion_order_without_duplicates() {
        let store = VolatileListStore::new();
        store.create(L1, "first", false).unwrap();
        store.add_item(L1, "http://x/b").unwrap();
        store.add_item(L1, "http://x/a").unwrap();
        store.add_item(L1, "http://x/b").unwrap();
        assert_eq!(store.get_items(L1).unwrap(), vec!["http://x/b", "http://x/a"]);
        store.remove_item(L1, "http://x/b").unwrap();
        assert_eq!(store.get_items(L1).unwrap(), vec!["http://x/a"]);
    }

    #[test]
    fn record_layout_keeps_name_and_status_out_of_items() {
        let store = VolatileListStore::new();
        store.create(L1, "first", true).unwrap();
        store.clear(L1).unwrap();
        assert!(store.get_items(L1).unwrap().is_empty());
        assert_eq!(store.get_name(L1).unwrap().as_deref(), Some("first"));
        assert_eq!(store.get_shared(L1).unwrap(), Some(true));
    }

    #[test]
    fn duplicate_ids_and_names_conflict() {
        let store = VolatileListStore::new();
        store.create(L1, "first", false).unwrap();
        assert!(matches!(
            store.create(L1, "other", false).unwrap_err(),
            CatalogError::Conflict(_)
        ));
        assert!(matches!(
            store.create(L2, "first", false).unwrap_err(),
            CatalogError::Conflict(_)
        ));
        store.rename(L1, "first").unwrap();
    }
}
