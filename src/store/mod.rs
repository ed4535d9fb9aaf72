//! Triple store: the graph of subject-predicate-object facts every other
//! component reads from and writes back to.
//!
//! [`TripleStore`] is the seam. Implementations provide atomic change sets,
//! pattern lookup and a size; graph-pattern queries, convenience lookups and
//! serialization are provided on top of those three.

pub mod bgp;
pub mod io;
mod schema;
pub mod sparql;
mod sqlite;
pub mod types;

use std::path::Path;

use ahash::AHashSet;

pub use io::{AttachStats, RdfFormat, attach_directory, parse_file, write_triples};
pub use sparql::{SelectQuery, SparqlResults, SparqlTerm};
pub use sqlite::SqliteTripleStore;
pub use types::{
    Bindings, ChangeSet, ChangeStats, GraphPattern, Literal, PatternTerm, QueryTriple, Term,
    Triple, TriplePattern,
};

use crate::errors::Result;

pub trait TripleStore: Send + Sync {
    /// Applies removals then insertions in one atomic step.
    fn apply(&self, changes: &ChangeSet) -> Result<ChangeStats>;

    /// Triples matching `pattern`, in insertion order, de-duplicated across graphs.
    fn triples(&self, pattern: &TriplePattern) -> Result<Vec<Triple>>;

    /// Number of distinct triples across all graphs.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn insert_all(&self, graph: Option<&str>, triples: &[Triple]) -> Result<usize> {
        let stats = self.apply(&ChangeSet::new(graph).insert_all(triples.iter().cloned()))?;
        Ok(stats.inserted)
    }

    fn remove(&self, pattern: &TriplePattern) -> Result<usize> {
        let stats = self.apply(&ChangeSet::new(None).remove(pattern.clone()))?;
        Ok(stats.removed)
    }

    /// Evaluates `pattern` with `bindings` pre-bound; one call is one query.
    fn query(
        &self,
        pattern: &GraphPattern,
        bindings: &Bindings,
        graph: Option<&str>,
    ) -> Result<Vec<Bindings>> {
        bgp::evaluate(self, pattern, bindings, graph)
    }

    /// First object of `(subject, predicate, ?)`.
    fn value(&self, subject: &Term, predicate: &str) -> Result<Option<Term>> {
        let found = self.triples(
            &TriplePattern::any()
                .subject(subject.clone())
                .predicate(predicate),
        )?;
        Ok(found.into_iter().next().map(|t| t.object))
    }

    fn objects(&self, subject: &Term, predicate: &str) -> Result<Vec<Term>> {
        let found = self.triples(
            &TriplePattern::any()
                .subject(subject.clone())
                .predicate(predicate),
        )?;
        Ok(found.into_iter().map(|t| t.object).collect())
    }

    fn subjects(&self, predicate: &str, object: &Term) -> Result<Vec<Term>> {
        let found = self.triples(&TriplePattern::any().predicate(predicate).object(object.clone()))?;
        Ok(found.into_iter().map(|t| t.subject).collect())
    }

    /// Writes every triple matching any of `scope` to `path`; returns the count written.
    fn serialize(&self, scope: &[TriplePattern], path: &Path) -> Result<usize> {
        let mut seen = AHashSet::new();
        let mut selected: Vec<Triple> = Vec::new();
        for pattern in scope {
            for triple in self.triples(pattern)? {
                if seen.insert(triple.clone()) {
                    selected.push(triple);
                }
            }
        }
        write_triples(path, &selected)?;
        Ok(selected.len())
    }
}

impl<S> TripleStore for &S
where
    S: TripleStore + ?Sized,
{
    fn apply(&self, changes: &ChangeSet) -> Result<ChangeStats> {
        (*self).apply(changes)
    }

    fn triples(&self, pattern: &TriplePattern) -> Result<Vec<Triple>> {
        (*self).triples(pattern)
    }

    fn len(&self) -> Result<usize> {
        (*self).len()
    }
}
