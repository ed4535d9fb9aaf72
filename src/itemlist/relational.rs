//! Item lists in SQLite.
//!
//! Membership rows are keyed on `(item_id, list_id)`, so a list is a set:
//! items come back sorted by URI, not in the order they were added.

use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use super::{ItemListBackend, check_iri, check_name, missing, parse_visibility, visibility};
use crate::errors::{CatalogError, Result};

pub const DATABASE_FILE: &str = "itemlists.db";

fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS itemlist (
            id     TEXT PRIMARY KEY,
            name   TEXT NOT NULL UNIQUE,
            shared TEXT NOT NULL CHECK (shared IN ('shared', 'own'))
        );
        CREATE TABLE IF NOT EXISTS item (
            item_id TEXT NOT NULL,
            list_id TEXT NOT NULL REFERENCES itemlist(id) ON DELETE CASCADE,
            PRIMARY KEY (item_id, list_id)
        );
        CREATE INDEX IF NOT EXISTS idx_item_list ON item(list_id);
        "#,
    )
    .map_err(|e| CatalogError::unavailable(e.to_string()))
}

fn query_err(e: rusqlite::Error) -> CatalogError {
    CatalogError::query(e.to_string())
}

pub struct RelationalListStore {
    conn: Mutex<Connection>,
}

impl RelationalListStore {
    /// Opens (creating if needed) `<directory>/itemlists.db`.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory)
            .map_err(|e| CatalogError::unavailable(format!("{}: {e}", directory.display())))?;
        let path = directory.join(DATABASE_FILE);
        let conn = Connection::open(&path)
            .map_err(|e| CatalogError::unavailable(format!("{}: {e}", path.display())))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::unavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn exists(conn: &Connection, id: &str) -> Result<bool> {
        conn.query_row("SELECT 1 FROM itemlist WHERE id = ?1", params![id], |_| Ok(()))
            .optional()
            .map(|row| row.is_some())
            .map_err(query_err)
    }

    fn require(conn: &Connection, id: &str) -> Result<()> {
        if Self::exists(conn, id)? {
            Ok(())
        } else {
            Err(missing(id))
        }
    }

    fn name_taken(conn: &Connection, name: &str, except: &str) -> Result<bool> {
        conn.query_row(
            "SELECT 1 FROM itemlist WHERE name = ?1 AND id <> ?2",
            params![name, except],
            |_| Ok(()),
        )
        .optional()
        .map(|row| row.is_some())
        .map_err(query_err)
    }
}

impl ItemListBackend for RelationalListStore {
    fn create(&self, id: &str, name: &str, shared: bool) -> Result<()> {
        check_name(name)?;
        check_iri("item list id", id)?;
        let conn = self.conn.lock();
        if Self::exists(&conn, id)? {
            return Err(CatalogError::conflict(format!("item list {id} already exists")));
        }
        if Self::name_taken(&conn, name, id)? {
            return Err(CatalogError::conflict(format!("an item list named '{name}' already exists")));
        }
        conn.execute(
            "INSERT INTO itemlist(id, name, shared) VALUES(?1, ?2, ?3)",
            params![id, name, visibility(shared)],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn add_item(&self, id: &str, item: &str) -> Result<()> {
        check_iri("item", item)?;
        let conn = self.conn.lock();
        Self::require(&conn, id)?;
        conn.execute(
            "INSERT OR IGNORE INTO item(item_id, list_id) VALUES(?1, ?2)",
            params![item, id],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn remove_item(&self, id: &str, item: &str) -> Result<()> {
        let conn = self.conn.lock();
        Self::require(&conn, id)?;
        conn.execute(
            "DELETE FROM item WHERE item_id = ?1 AND list_id = ?2",
            params![item, id],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn clear(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        Self::require(&conn, id)?;
        conn.execute("DELETE FROM item WHERE list_id = ?1", params![id])
            .map_err(query_err)?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock();
        let removed = conn
            .execute("DELETE FROM itemlist WHERE id = ?1", params![id])
            .map_err(query_err)?;
        if removed == 0 {
            return Err(missing(id));
        }
        Ok(())
    }

    fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        check_name(new_name)?;
        let conn = self.conn.lock();
        Self::require(&conn, id)?;
        if Self::name_taken(&conn, new_name, id)? {
            return Err(CatalogError::conflict(format!(
                "an item list named '{new_name}' already exists"
            )));
        }
        conn.execute(
            "UPDATE itemlist SET name = ?1 WHERE id = ?2",
            params![new_name, id],
        )
        .map_err(query_err)?;
        Ok(())
    }

    fn set_shared(&self, id: &str, shared: bool) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn
            .execute(
                "UPDATE itemlist SET shared = ?1 WHERE id = ?2",
                params![visibility(shared), id],
            )
            .map_err(query_err)?;
        if updated == 0 {
            return Err(missing(id));
        }
        Ok(())
    }

    fn get_items(&self, id: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT item_id FROM item WHERE list_id = ?1 ORDER BY item_id")
            .map_err(query_err)?;
        let rows = stmt
            .query_map(params![id], |row| row.get(0))
            .map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(query_err)
    }

    fn get_name(&self, id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT name FROM itemlist WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()
        .map_err(query_err)
    }

    fn get_shared(&self, id: &str) -> Result<Option<bool>> {
        let conn = self.conn.lock();
        let status: Option<String> = conn
            .query_row("SELECT shared FROM itemlist WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(query_err)?;
        status.as_deref().map(parse_visibility).transpose()
    }

    fn list_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT id FROM itemlist ORDER BY rowid")
            .map_err(query_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(query_err)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT id FROM itemlist WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()
        .map_err(query_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L1: &str = "http://localhost:3000/item_lists/1";

    #[test]
    fn membership_is_a_sorted_set() {
        let store = RelationalListStore::open_in_memory().unwrap();
        store.create(L1, "first", false).unwrap();
        store.add_item(L1, "http://x/b").unwrap();
        store.add_item(L1, "http://x/a").unwrap();
        store.add_item(L1, "http://x/b").unwrap();
        assert_eq!(store.get_items(L1).unwrap(), vec!["http://x/a", "http://x/b"]);
    }

    #[test]
    fn delete_cascades_to_members() {
        let store = RelationalListStore::open_in_memory().unwrap();
        store.create(L1, "first", true).unwrap();
        store.add_item(L1, "http://x/a").unwrap();
        store.delete(L1).unwrap();
        let conn = store.conn.lock();
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM item", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn mutations_on_missing_list_fail() {
        let store = RelationalListStore::open_in_memory().unwrap();
        assert!(matches!(
            store.add_item("ghost", "http://x/a").unwrap_err(),
            CatalogError::NotFound(_)
        ));
        assert!(matches!(
            store.set_shared("ghost", true).unwrap_err(),
            CatalogError::NotFound(_)
        ));
        assert!(store.get_items("ghost").unwrap().is_empty());
        assert_eq!(store.get_shared("ghost").unwrap(), None);
    }

    #[test]
    fn lists_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RelationalListStore::open(dir.path()).unwrap();
            store.create(L1, "kept", true).unwrap();
            store.add_item(L1, "http://x/a").unwrap();
        }
        let store = RelationalListStore::open(dir.path()).unwrap();
        assert_eq!(store.get_name(L1).unwrap().as_deref(), Some("kept"));
        assert_eq!(store.get_items(L1).unwrap(), vec!["http://x/a"]);
    }
}
