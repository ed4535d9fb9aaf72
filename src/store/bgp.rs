//! Basic-graph-pattern evaluation over any [`TripleStore`].
//!
//! Solutions are extended one pattern triple at a time, the way a chain query
//! extends its frontier hop by hop. The next triple is always the one with the
//! most positions already fixed, so a pre-bound source variable drives the join.

use ahash::AHashSet;

use super::{
    TripleStore,
    types::{Bindings, GraphPattern, PatternTerm, QueryTriple, Term, Triple, TriplePattern},
};
use crate::errors::Result;

pub fn evaluate<S: TripleStore + ?Sized>(
    store: &S,
    pattern: &GraphPattern,
    bindings: &Bindings,
    graph: Option<&str>,
) -> Result<Vec<Bindings>> {
    let mut remaining: Vec<&QueryTriple> = pattern.triples.iter().collect();
    let mut bound: AHashSet<String> = bindings.keys().cloned().collect();
    let mut rows = vec![bindings.clone()];

    while !remaining.is_empty() {
        let index = most_selective(&remaining, &bound);
        let step = remaining.remove(index);
        let mut next = Vec::new();
        for row in &rows {
            let Some(lookup) = lookup_for(step, row, graph) else {
                continue;
            };
            for triple in store.triples(&lookup)? {
                if let Some(extended) = extend(row, step, &triple) {
                    next.push(extended);
                }
            }
        }
        if next.is_empty() {
            return Ok(Vec::new());
        }
        for position in [&step.subject, &step.predicate, &step.object] {
            if let Some(name) = position.as_var() {
                bound.insert(name.to_string());
            }
        }
        rows = next;
    }
    Ok(rows)
}

fn most_selective(remaining: &[&QueryTriple], bound: &AHashSet<String>) -> usize {
    let fixed = |position: &PatternTerm| match position {
        PatternTerm::Const(_) => 1,
        PatternTerm::Var(name) if bound.contains(name) => 1,
        PatternTerm::Var(_) => 0,
    };
    let mut best = 0;
    let mut best_score = -1;
    for (index, step) in remaining.iter().enumerate() {
        let score = fixed(&step.subject) + fixed(&step.predicate) + fixed(&step.object);
        if score > best_score {
            best = index;
            best_score = score;
        }
    }
    best
}

fn resolve<'a>(position: &'a PatternTerm, row: &'a Bindings) -> Option<&'a Term> {
    match position {
        PatternTerm::Const(term) => Some(term),
        PatternTerm::Var(name) => row.get(name),
    }
}

/// Store lookup for one pattern triple under a partial solution. `None` when a
/// bound value cannot occur in that position, so the row has no extension.
fn lookup_for(step: &QueryTriple, row: &Bindings, graph: Option<&str>) -> Option<TriplePattern> {
    let mut lookup = TriplePattern::any();
    if let Some(subject) = resolve(&step.subject, row) {
        if matches!(subject, Term::Literal(_)) {
            return None;
        }
        lookup.subject = Some(subject.clone());
    }
    if let Some(predicate) = resolve(&step.predicate, row) {
        lookup.predicate = Some(predicate.as_iri()?.to_string());
    }
    if let Some(object) = resolve(&step.object, row) {
        lookup.object = Some(object.clone());
    }
    lookup.graph = graph.map(str::to_string);
    Some(lookup)
}

fn extend(row: &Bindings, step: &QueryTriple, triple: &Triple) -> Option<Bindings> {
    let predicate = Term::Iri(triple.predicate.clone());
    let mut extended = row.clone();
    for (position, value) in [
        (&step.subject, &triple.subject),
        (&step.predicate, &predicate),
        (&step.object, &triple.object),
    ] {
        if let PatternTerm::Var(name) = position {
            match extended.get(name) {
                Some(existing) if existing != value => return None,
                Some(_) => {}
                None => {
                    extended.insert(name.clone(), value.clone());
                }
            }
        }
    }
    Some(extended)
}
