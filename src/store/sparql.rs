//! SPARQL `SELECT` over basic graph patterns.
//!
//! Queries are parsed with `spargebra` and lowered onto [`GraphPattern`], so
//! they run through the same join evaluator as every fixed traversal. Only the
//! conjunctive subset is accepted: projection, `DISTINCT`/`REDUCED`,
//! `LIMIT`/`OFFSET` and joined triple blocks. Everything else is rejected as
//! malformed input rather than half-evaluated.

use std::collections::BTreeMap;

use ahash::AHashSet;
use serde::Serialize;
use spargebra::{
    Query,
    algebra::GraphPattern as Algebra,
    term::{NamedNodePattern, TermPattern},
};

use super::{
    TripleStore,
    types::{Bindings, GraphPattern, Literal, PatternTerm, Term},
};
use crate::errors::{CatalogError, Result};

/// Hidden variables standing in for query blank nodes start with this; SPARQL
/// variable names cannot contain `:` so they never clash with user variables.
const BLANK_VAR_PREFIX: &str = "_:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectQuery {
    pub variables: Vec<String>,
    pub pattern: GraphPattern,
    pub distinct: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn parse(text: &str) -> Result<Self> {
        let query = Query::parse(text, None)
            .map_err(|e| CatalogError::malformed(format!("invalid SPARQL query: {e}")))?;
        let Query::Select {
            dataset, pattern, ..
        } = query
        else {
            return Err(CatalogError::malformed("only SELECT queries are supported"));
        };
        if dataset.is_some() {
            return Err(CatalogError::malformed(
                "FROM clauses are not supported; queries run against one collection graph",
            ));
        }
        let mut select = SelectQuery {
            variables: Vec::new(),
            pattern: GraphPattern::new(),
            distinct: false,
            offset: 0,
            limit: None,
        };
        let mut projected = None;
        select.lower(&pattern, &mut projected)?;
        select.variables = match projected {
            Some(variables) => variables,
            None => select
                .pattern
                .variables()
                .into_iter()
                .filter(|name| !name.starts_with(BLANK_VAR_PREFIX))
                .collect(),
        };
        Ok(select)
    }

    fn lower(&mut self, node: &Algebra, projected: &mut Option<Vec<String>>) -> Result<()> {
        match node {
            Algebra::Slice {
                inner,
                start,
                length,
            } => {
                self.offset = *start;
                self.limit = *length;
                self.lower(inner, projected)
            }
            Algebra::Distinct { inner } | Algebra::Reduced { inner } => {
                self.distinct = true;
                self.lower(inner, projected)
            }
            Algebra::Project { inner, variables } => {
                *projected = Some(variables.iter().map(|v| v.as_str().to_string()).collect());
                self.lower(inner, projected)
            }
            Algebra::Join { left, right } => {
                self.lower(left, projected)?;
                self.lower(right, projected)
            }
            Algebra::Bgp { patterns } => {
                for triple in patterns {
                    let predicate = match &triple.predicate {
                        NamedNodePattern::NamedNode(node) => PatternTerm::iri(node.as_str()),
                        NamedNodePattern::Variable(var) => PatternTerm::var(var.as_str()),
                    };
                    self.pattern = std::mem::take(&mut self.pattern).triple(
                        lower_term(&triple.subject)?,
                        predicate,
                        lower_term(&triple.object)?,
                    );
                }
                Ok(())
            }
            _ => Err(CatalogError::malformed(
                "unsupported SPARQL construct: only basic graph patterns are evaluated",
            )),
        }
    }

    /// Runs the query against `graph` (all graphs when `None`).
    pub fn evaluate<S: TripleStore + ?Sized>(
        &self,
        store: &S,
        graph: Option<&str>,
    ) -> Result<SparqlResults> {
        let rows = store.query(&self.pattern, &Bindings::new(), graph)?;
        let mut seen = AHashSet::new();
        let mut bindings = Vec::new();
        for row in rows {
            let projected: BTreeMap<String, SparqlTerm> = self
                .variables
                .iter()
                .filter_map(|name| row.get(name).map(|term| (name.clone(), SparqlTerm::from(term))))
                .collect();
            if self.distinct && !seen.insert(projected.clone()) {
                continue;
            }
            bindings.push(projected);
        }
        let bindings = bindings
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(SparqlResults {
            head: ResultsHead {
                vars: self.variables.clone(),
            },
            results: ResultsBody { bindings },
        })
    }
}

#[allow(unreachable_patterns)]
fn lower_term(term: &TermPattern) -> Result<PatternTerm> {
    Ok(match term {
        TermPattern::NamedNode(node) => PatternTerm::iri(node.as_str()),
        TermPattern::BlankNode(node) => PatternTerm::Var(format!("{BLANK_VAR_PREFIX}{}", node.as_str())),
        TermPattern::Literal(lit) => PatternTerm::Const(Term::Literal(match lit.language() {
            Some(lang) => Literal::lang(lit.value(), lang),
            None => Literal::typed(lit.value(), lit.datatype().as_str()),
        })),
        TermPattern::Variable(var) => PatternTerm::var(var.as_str()),
        _ => return Err(CatalogError::malformed("quoted triples are not supported")),
    })
}

/// One bound value in the SPARQL JSON results format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SparqlTerm {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl From<&Term> for SparqlTerm {
    fn from(term: &Term) -> Self {
        match term {
            Term::Iri(iri) => Self {
                kind: "uri",
                value: iri.clone(),
                datatype: None,
                lang: None,
            },
            Term::Blank(id) => Self {
                kind: "bnode",
                value: id.clone(),
                datatype: None,
                lang: None,
            },
            Term::Literal(lit) => Self {
                kind: "literal",
                value: lit.lexical.clone(),
                datatype: lit.datatype.clone(),
                lang: lit.language.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultsHead {
    pub vars: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultsBody {
    pub bindings: Vec<BTreeMap<String, SparqlTerm>>,
}

/// `{"head": {"vars": [..]}, "results": {"bindings": [..]}}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SparqlResults {
    pub head: ResultsHead,
    pub results: ResultsBody,
}

impl SparqlResults {
    pub fn vars(&self) -> &[String] {
        &self.head.vars
    }

    pub fn bindings(&self) -> &[BTreeMap<String, SparqlTerm>] {
        &self.results.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_star_projects_visible_variables_only() {
        let query = SelectQuery::parse(
            "SELECT * WHERE { ?item <http://purl.org/dc/terms/isPartOf> [ <http://purl.org/dc/terms/alternative> ?name ] }",
        )
        .unwrap();
        assert_eq!(query.variables, vec!["item", "name"]);
        assert_eq!(query.pattern.triples.len(), 2);
    }

    #[test]
    fn test_modifiers_are_lowered() {
        let query = SelectQuery::parse(
            "SELECT DISTINCT ?s WHERE { ?s ?p ?o } LIMIT 3 OFFSET 1",
        )
        .unwrap();
        assert!(query.distinct);
        assert_eq!(query.limit, Some(3));
        assert_eq!(query.offset, 1);
        assert_eq!(query.variables, vec!["s"]);
    }

    #[test]
    fn test_rejects_non_select_and_non_bgp() {
        for text in [
            "ASK { ?s ?p ?o }",
            "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }",
            "SELECT ?s WHERE { ?s ?p ?o OPTIONAL { ?s ?q ?r } }",
            "SELECT ?s WHERE { ?s ?p ?o FILTER(?o = 1) }",
            "SELECT ?s FROM <http://example.org/g> WHERE { ?s ?p ?o }",
            "SELECT ?s WHERE {",
        ] {
            let err = SelectQuery::parse(text).unwrap_err();
            assert!(matches!(err, CatalogError::MalformedInput(_)), "{text}");
        }
    }

    #[test]
    fn test_typed_literal_in_pattern_keeps_datatype() {
        let query = SelectQuery::parse(
            "SELECT ?s WHERE { ?s <http://purl.org/dada/schema/0.2#start> 12 }",
        )
        .unwrap();
        let object = &query.pattern.triples[0].object;
        assert_eq!(
            object,
            &PatternTerm::Const(Term::Literal(Literal::integer(12)))
        );
    }
}
