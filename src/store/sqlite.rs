//! SQLite-backed [`TripleStore`].

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, params, params_from_iter, types::Value as SqlValue};
use tracing::warn;

use super::{
    TripleStore,
    schema::{KIND_BLANK, KIND_IRI, KIND_LITERAL, ensure_schema},
    types::{ChangeSet, ChangeStats, Literal, Term, Triple, TriplePattern},
};
use crate::errors::{CatalogError, Result};

const TRIPLE_COLUMNS: &str = "subject, subject_kind, predicate, object, object_kind, datatype, lang";

const INSERT_SQL: &str = "INSERT OR IGNORE INTO triples(graph, subject, subject_kind, predicate, object, object_kind, datatype, lang) VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

/// Triple store over a single SQLite connection.
///
/// The connection sits behind a mutex so the store can be shared between
/// threads; every [`TripleStore::apply`] runs in its own transaction.
pub struct SqliteTripleStore {
    conn: Mutex<Connection>,
}

impl SqliteTripleStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            CatalogError::unavailable(format!("{}: {e}", path.as_ref().display()))
        })?;
        for (pragma, value) in [("journal_mode", "WAL"), ("synchronous", "NORMAL")] {
            if let Err(e) = conn.pragma_update(None, pragma, value) {
                warn!(path = %path.as_ref().display(), pragma, error = %e, "pragma not applied");
            }
        }
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::unavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        ensure_schema(&conn)?;
        conn.set_prepared_statement_cache_capacity(64);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Named graphs present in the store, excluding the default graph.
    pub fn graphs(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT DISTINCT graph FROM triples WHERE graph <> '' ORDER BY graph")
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let mut graphs = Vec::new();
        for graph in rows {
            graphs.push(graph.map_err(|e| CatalogError::query(e.to_string()))?);
        }
        Ok(graphs)
    }
}

impl TripleStore for SqliteTripleStore {
    fn apply(&self, changes: &ChangeSet) -> Result<ChangeStats> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let mut stats = ChangeStats::default();
        for pattern in &changes.removals {
            let (clause, values) = where_clause(pattern);
            stats.removed += tx
                .execute(
                    &format!("DELETE FROM triples{clause}"),
                    params_from_iter(values),
                )
                .map_err(|e| CatalogError::query(e.to_string()))?;
        }
        {
            let graph = changes.graph.as_deref().unwrap_or("");
            let mut stmt = tx
                .prepare_cached(INSERT_SQL)
                .map_err(|e| CatalogError::query(e.to_string()))?;
            for triple in &changes.insertions {
                stats.inserted += insert_triple(&mut stmt, graph, triple)?;
            }
            for (graph, triple) in &changes.graph_insertions {
                stats.inserted += insert_triple(&mut stmt, graph.as_deref().unwrap_or(""), triple)?;
            }
        }
        tx.commit()
            .map_err(|e| CatalogError::query(e.to_string()))?;
        Ok(stats)
    }

    fn triples(&self, pattern: &TriplePattern) -> Result<Vec<Triple>> {
        let (clause, values) = where_clause(pattern);
        let sql = format!(
            "SELECT {TRIPLE_COLUMNS} FROM triples{clause} GROUP BY {TRIPLE_COLUMNS} ORDER BY MIN(id)"
        );
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params_from_iter(values), row_to_triple)
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let mut triples = Vec::new();
        for triple in rows {
            triples.push(triple.map_err(|e| CatalogError::query(e.to_string()))?);
        }
        Ok(triples)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM (SELECT 1 FROM triples GROUP BY {TRIPLE_COLUMNS})"),
                [],
                |row| row.get(0),
            )
            .map_err(|e| CatalogError::query(e.to_string()))?;
        Ok(count as usize)
    }
}

fn insert_triple(stmt: &mut rusqlite::CachedStatement<'_>, graph: &str, triple: &Triple) -> Result<usize> {
    let subject_kind = match &triple.subject {
        Term::Iri(_) => KIND_IRI,
        Term::Blank(_) => KIND_BLANK,
        Term::Literal(_) => {
            return Err(CatalogError::malformed(format!(
                "literal subject in triple {} <{}> {}",
                triple.subject, triple.predicate, triple.object
            )));
        }
    };
    let object = TermColumns::from(&triple.object);
    stmt.execute(params![
        graph,
        triple.subject.value(),
        subject_kind,
        triple.predicate.as_str(),
        object.value,
        object.kind,
        object.datatype,
        object.lang,
    ])
    .map_err(|e| CatalogError::query(e.to_string()))
}

struct TermColumns<'a> {
    value: &'a str,
    kind: i64,
    datatype: &'a str,
    lang: &'a str,
}

impl<'a> From<&'a Term> for TermColumns<'a> {
    fn from(term: &'a Term) -> Self {
        match term {
            Term::Iri(iri) => Self {
                value: iri,
                kind: KIND_IRI,
                datatype: "",
                lang: "",
            },
            Term::Blank(id) => Self {
                value: id,
                kind: KIND_BLANK,
                datatype: "",
                lang: "",
            },
            Term::Literal(lit) => Self {
                value: &lit.lexical,
                kind: KIND_LITERAL,
                datatype: lit.datatype.as_deref().unwrap_or(""),
                lang: lit.language.as_deref().unwrap_or(""),
            },
        }
    }
}

fn where_clause(pattern: &TriplePattern) -> (String, Vec<SqlValue>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();
    let mut push = |column: &str, value: SqlValue, values: &mut Vec<SqlValue>| {
        values.push(value);
        conditions.push(format!("{column} = ?{}", values.len()));
    };
    if let Some(subject) = &pattern.subject {
        let cols = TermColumns::from(subject);
        push("subject", SqlValue::Text(cols.value.to_string()), &mut values);
        push("subject_kind", SqlValue::Integer(cols.kind), &mut values);
    }
    if let Some(predicate) = &pattern.predicate {
        push("predicate", SqlValue::Text(predicate.clone()), &mut values);
    }
    if let Some(object) = &pattern.object {
        let cols = TermColumns::from(object);
        push("object", SqlValue::Text(cols.value.to_string()), &mut values);
        push("object_kind", SqlValue::Integer(cols.kind), &mut values);
        push("datatype", SqlValue::Text(cols.datatype.to_string()), &mut values);
        push("lang", SqlValue::Text(cols.lang.to_string()), &mut values);
    }
    if let Some(graph) = &pattern.graph {
        push("graph", SqlValue::Text(graph.clone()), &mut values);
    }
    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn row_to_triple(row: &rusqlite::Row<'_>) -> std::result::Result<Triple, rusqlite::Error> {
    let subject: String = row.get(0)?;
    let subject_kind: i64 = row.get(1)?;
    let predicate: String = row.get(2)?;
    let object: String = row.get(3)?;
    let object_kind: i64 = row.get(4)?;
    let datatype: String = row.get(5)?;
    let lang: String = row.get(6)?;
    let subject = if subject_kind == KIND_BLANK {
        Term::Blank(subject)
    } else {
        Term::Iri(subject)
    };
    let object = match object_kind {
        KIND_IRI => Term::Iri(object),
        KIND_BLANK => Term::Blank(object),
        _ => Term::Literal(Literal {
            lexical: object,
            datatype: (!datatype.is_empty()).then_some(datatype),
            language: (!lang.is_empty()).then_some(lang),
        }),
    };
    Ok(Triple {
        subject,
        predicate,
        object,
    })
}
