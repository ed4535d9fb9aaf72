use rusqlite::Connection;

use crate::errors::{CatalogError, Result};

pub const KIND_IRI: i64 = 0;
pub const KIND_BLANK: i64 = 1;
pub const KIND_LITERAL: i64 = 2;

/// `graph`, `datatype` and `lang` use `''` for "none" so the UNIQUE constraint
/// treats absent values as equal.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS triples (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            graph        TEXT NOT NULL DEFAULT '',
            subject      TEXT NOT NULL,
            subject_kind INTEGER NOT NULL,
            predicate    TEXT NOT NULL,
            object       TEXT NOT NULL,
            object_kind  INTEGER NOT NULL,
            datatype     TEXT NOT NULL DEFAULT '',
            lang         TEXT NOT NULL DEFAULT '',
            UNIQUE (graph, subject, subject_kind, predicate, object, object_kind, datatype, lang)
        );
        CREATE INDEX IF NOT EXISTS idx_triples_subject_predicate ON triples(subject, predicate);
        CREATE INDEX IF NOT EXISTS idx_triples_predicate_object ON triples(predicate, object);
        CREATE INDEX IF NOT EXISTS idx_triples_object ON triples(object);
        "#,
    )
    .map_err(|e| CatalogError::unavailable(e.to_string()))?;
    Ok(())
}
