//! Term, triple and pattern types shared by every triple-store implementation.

use std::fmt;

use ahash::AHashMap;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::namespaces::terms;

/// RDF literal. `datatype` is `None` for simple (`xsd:string`) and language-tagged literals.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn simple(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        Self {
            lexical: lexical.into(),
            datatype: (datatype != terms::XSD_STRING).then_some(datatype),
            language: None,
        }
    }

    pub fn lang(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), terms::XSD_INTEGER)
    }

    pub fn double(value: f64) -> Self {
        Self::typed(value.to_string(), terms::XSD_DOUBLE)
    }

    pub fn date_time(value: DateTime<Utc>) -> Self {
        Self::typed(
            value.to_rfc3339_opts(SecondsFormat::Secs, true),
            terms::XSD_DATE_TIME,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::Blank(id.into())
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal::simple(lexical))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// IRI, blank-node label, or lexical form.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Blank(id) => id,
            Term::Literal(lit) => &lit.lexical,
        }
    }

    /// Plain string form: IRIs as-is, blank nodes as `_:id`, literals by lexical form.
    pub fn to_plain_string(&self) -> String {
        match self {
            Term::Blank(id) => format!("_:{id}"),
            other => other.value().to_string(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(id) => write!(f, "_:{id}"),
            Term::Literal(lit) => match (&lit.language, &lit.datatype) {
                (Some(lang), _) => write!(f, "{:?}@{lang}", lit.lexical),
                (None, Some(dt)) => write!(f, "{:?}^^<{dt}>", lit.lexical),
                (None, None) => write!(f, "{:?}", lit.lexical),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

/// Lookup pattern: `None` positions match anything. `graph` restricts the
/// lookup to one named graph; `None` searches all graphs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Option<Term>,
    pub predicate: Option<String>,
    pub object: Option<Term>,
    pub graph: Option<String>,
}

impl TriplePattern {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: Term) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    pub fn in_graph(mut self, graph: impl Into<String>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        self.subject.as_ref().is_none_or(|s| *s == triple.subject)
            && self
                .predicate
                .as_ref()
                .is_none_or(|p| *p == triple.predicate)
            && self.object.as_ref().is_none_or(|o| *o == triple.object)
    }
}

/// A position in a graph-pattern triple: a variable or a fixed term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternTerm {
    Var(String),
    Const(Term),
}

impl PatternTerm {
    pub fn var(name: &str) -> Self {
        PatternTerm::Var(name.to_string())
    }

    pub fn iri(iri: &str) -> Self {
        PatternTerm::Const(Term::iri(iri))
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            PatternTerm::Var(name) => Some(name),
            PatternTerm::Const(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryTriple {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

/// Conjunctive graph pattern (a SPARQL basic graph pattern).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphPattern {
    pub triples: Vec<QueryTriple>,
}

impl GraphPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triple(mut self, subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> Self {
        self.triples.push(QueryTriple {
            subject,
            predicate,
            object,
        });
        self
    }

    /// Variables in first-mention order.
    pub fn variables(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for t in &self.triples {
            for position in [&t.subject, &t.predicate, &t.object] {
                if let Some(name) = position.as_var() {
                    if !seen.iter().any(|s: &String| s == name) {
                        seen.push(name.to_string());
                    }
                }
            }
        }
        seen
    }
}

/// One solution row of a graph-pattern query.
pub type Bindings = AHashMap<String, Term>;

/// Atomic write unit: every removal and insertion lands, or none does.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    /// Graph receiving the insertions; `None` is the default graph.
    pub graph: Option<String>,
    pub removals: Vec<TriplePattern>,
    pub insertions: Vec<Triple>,
    /// Insertions naming their own graph, applied after `insertions`.
    pub graph_insertions: Vec<(Option<String>, Triple)>,
}

impl ChangeSet {
    pub fn new(graph: Option<&str>) -> Self {
        Self {
            graph: graph.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn remove(mut self, pattern: TriplePattern) -> Self {
        self.removals.push(pattern);
        self
    }

    pub fn insert(mut self, triple: Triple) -> Self {
        self.insertions.push(triple);
        self
    }

    pub fn insert_all<I: IntoIterator<Item = Triple>>(mut self, triples: I) -> Self {
        self.insertions.extend(triples);
        self
    }

    /// Adds `triples` to `graph` instead of the change set's own graph.
    pub fn insert_all_in<I: IntoIterator<Item = Triple>>(mut self, graph: Option<&str>, triples: I) -> Self {
        let graph = graph.map(str::to_string);
        self.graph_insertions
            .extend(triples.into_iter().map(|triple| (graph.clone(), triple)));
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeStats {
    pub removed: usize,
    pub inserted: usize,
}
