//! Loading graph files from disk and writing triple subsets back.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use oxttl::{N3Parser, TurtleParser, TurtleSerializer, n3::N3Term};
use tracing::{debug, info};

use super::{
    TripleStore,
    types::{ChangeSet, Literal, Term, Triple},
};
use crate::errors::{CatalogError, Result};

/// Serialization formats recognised when attaching a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RdfFormat {
    /// `*.rdf` files, parsed as Turtle.
    Turtle,
    /// `*.n3` files.
    N3,
}

impl RdfFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("rdf") => Some(RdfFormat::Turtle),
            Some("n3") => Some(RdfFormat::N3),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttachStats {
    pub files: usize,
    pub inserted: usize,
}

/// Parses one graph file. Blank-node labels are prefixed with `scope` so that
/// labels from different files never collide.
pub fn parse_file(path: &Path, format: RdfFormat, scope: &str) -> Result<Vec<Triple>> {
    let file = File::open(path)
        .map_err(|e| CatalogError::io(format!("{}: {e}", path.display())))?;
    let reader = BufReader::new(file);
    let located = |e: &dyn std::fmt::Display| CatalogError::parse(format!("{}: {e}", path.display()));
    let mut triples = Vec::new();
    match format {
        RdfFormat::Turtle => {
            for parsed in TurtleParser::new().for_reader(reader) {
                let triple = parsed.map_err(|e| located(&e))?;
                if let Some(triple) = from_ox_triple(triple, scope) {
                    triples.push(triple);
                }
            }
        }
        RdfFormat::N3 => {
            for parsed in N3Parser::new().for_reader(reader) {
                let quad = parsed.map_err(|e| located(&e))?;
                let converted = (
                    from_n3_term(quad.subject, scope),
                    from_n3_term(quad.predicate, scope),
                    from_n3_term(quad.object, scope),
                );
                match converted {
                    (Some(subject), Some(Term::Iri(predicate)), Some(object))
                        if !matches!(subject, Term::Literal(_)) =>
                    {
                        triples.push(Triple::new(subject, predicate, object));
                    }
                    _ => debug!(file = %path.display(), "skipping N3 statement outside plain RDF"),
                }
            }
        }
    }
    Ok(triples)
}

/// Recursively loads every recognised graph file under `root`, visiting
/// entries in name order. `graph_for` names the graph each file lands in.
pub fn attach_directory<S, F>(store: &S, root: &Path, graph_for: F) -> Result<AttachStats>
where
    S: TripleStore + ?Sized,
    F: Fn(&Path) -> Option<String>,
{
    if !root.is_dir() {
        return Err(CatalogError::unavailable(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let mut files = Vec::new();
    collect_graph_files(root, &mut files)?;
    // everything is parsed before anything is written: one bad file leaves
    // the store untouched
    let mut changes = ChangeSet::new(None);
    let mut stats = AttachStats::default();
    for (index, (path, format)) in files.iter().enumerate() {
        let triples = parse_file(path, *format, &format!("f{index}"))?;
        debug!(file = %path.display(), parsed = triples.len(), "parsed graph file");
        changes = changes.insert_all_in(graph_for(path).as_deref(), triples);
        stats.files += 1;
    }
    stats.inserted = store.apply(&changes)?.inserted;
    info!(root = %root.display(), files = stats.files, inserted = stats.inserted, "attached directory");
    Ok(stats)
}

fn collect_graph_files(dir: &Path, out: &mut Vec<(PathBuf, RdfFormat)>) -> Result<()> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CatalogError::io(format!("{}: {e}", dir.display())))? {
        let entry = entry.map_err(|e| CatalogError::io(e.to_string()))?;
        entries.push(entry.path());
    }
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_graph_files(&path, out)?;
        } else if let Some(format) = RdfFormat::from_path(&path) {
            out.push((path, format));
        }
    }
    Ok(())
}

/// Writes `triples` as Turtle to `path`, replacing any existing file. The data
/// goes to a temporary sibling first and is renamed into place once complete.
pub fn write_triples(path: &Path, triples: &[Triple]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CatalogError::io(format!("{}: {e}", parent.display())))?;
    }
    let converted = triples
        .iter()
        .map(to_ox_triple)
        .collect::<Result<Vec<_>>>()?;
    let staging = staging_path(path);
    let write = || -> std::io::Result<()> {
        let file = File::create(&staging)?;
        let mut serializer = TurtleSerializer::new().for_writer(BufWriter::new(file));
        for triple in &converted {
            serializer.serialize_triple(triple)?;
        }
        let mut writer = serializer.finish()?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&staging, path)
    };
    write().map_err(|e| {
        let _ = fs::remove_file(&staging);
        CatalogError::io(format!("{}: {e}", path.display()))
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn scoped_blank(scope: &str, label: &str) -> String {
    format!("{scope}x{label}")
}

fn from_ox_literal(literal: &oxrdf::Literal) -> Literal {
    match literal.language() {
        Some(lang) => Literal::lang(literal.value(), lang),
        None => Literal::typed(literal.value(), literal.datatype().as_str()),
    }
}

fn from_ox_triple(triple: oxrdf::Triple, scope: &str) -> Option<Triple> {
    #[allow(unreachable_patterns)]
    let subject = match triple.subject {
        oxrdf::Subject::NamedNode(node) => Term::Iri(node.into_string()),
        oxrdf::Subject::BlankNode(node) => Term::Blank(scoped_blank(scope, node.as_str())),
        _ => return None,
    };
    #[allow(unreachable_patterns)]
    let object = match triple.object {
        oxrdf::Term::NamedNode(node) => Term::Iri(node.into_string()),
        oxrdf::Term::BlankNode(node) => Term::Blank(scoped_blank(scope, node.as_str())),
        oxrdf::Term::Literal(literal) => Term::Literal(from_ox_literal(&literal)),
        _ => return None,
    };
    Some(Triple::new(subject, triple.predicate.into_string(), object))
}

fn from_n3_term(term: N3Term, scope: &str) -> Option<Term> {
    #[allow(unreachable_patterns)]
    match term {
        N3Term::NamedNode(node) => Some(Term::Iri(node.into_string())),
        N3Term::BlankNode(node) => Some(Term::Blank(scoped_blank(scope, node.as_str()))),
        N3Term::Literal(literal) => Some(Term::Literal(from_ox_literal(&literal))),
        _ => None,
    }
}

fn named_node(iri: &str) -> Result<oxrdf::NamedNode> {
    oxrdf::NamedNode::new(iri).map_err(|e| CatalogError::malformed(format!("<{iri}>: {e}")))
}

fn to_ox_term(term: &Term) -> Result<oxrdf::Term> {
    Ok(match term {
        Term::Iri(iri) => named_node(iri)?.into(),
        Term::Blank(id) => oxrdf::BlankNode::new_unchecked(id.as_str()).into(),
        Term::Literal(lit) => match (&lit.language, &lit.datatype) {
            (Some(lang), _) => {
                oxrdf::Literal::new_language_tagged_literal_unchecked(lit.lexical.as_str(), lang.as_str())
                    .into()
            }
            (None, Some(datatype)) => {
                oxrdf::Literal::new_typed_literal(lit.lexical.as_str(), named_node(datatype)?).into()
            }
            (None, None) => oxrdf::Literal::new_simple_literal(lit.lexical.as_str()).into(),
        },
    })
}

fn to_ox_triple(triple: &Triple) -> Result<oxrdf::Triple> {
    let subject: oxrdf::Subject = match &triple.subject {
        Term::Iri(iri) => named_node(iri)?.into(),
        Term::Blank(id) => oxrdf::BlankNode::new_unchecked(id.as_str()).into(),
        Term::Literal(_) => {
            return Err(CatalogError::malformed("literal in subject position"));
        }
    };
    Ok(oxrdf::Triple::new(
        subject,
        named_node(&triple.predicate)?,
        to_ox_term(&triple.object)?,
    ))
}
