mod common;

use alveograph::store::{
    GraphPattern, PatternTerm, SelectQuery, attach_directory, Bindings,
};
use alveograph::{SqliteTripleStore, Term, TriplePattern, TripleStore, namespaces::terms};
use common::{COOEE, MITCHEL_DELBRIDGE, fixture_dir, item};

fn fixture_store() -> SqliteTripleStore {
    let store = SqliteTripleStore::open_in_memory().expect("store");
    let root = fixture_dir();
    let layout = alveograph::StorageLayout::new("http://localhost:3000/", &root);
    attach_directory(&store, &root, |file| layout.graph_for_file(&root, file)).expect("attach");
    store
}

#[test]
fn test_attach_names_graphs_after_top_level_directories() {
    let store = fixture_store();
    assert_eq!(
        store.graphs().expect("graphs"),
        vec![COOEE.to_string(), MITCHEL_DELBRIDGE.to_string()]
    );
    let in_cooee = store
        .triples(&TriplePattern::any().predicate(terms::DCTERMS_IS_PART_OF).in_graph(COOEE))
        .expect("triples");
    assert_eq!(in_cooee.len(), 7);
}

#[test]
fn test_graph_query_with_prebound_variable() {
    let store = fixture_store();
    let pattern = GraphPattern::new()
        .triple(
            PatternTerm::var("item"),
            PatternTerm::iri(terms::AUSNC_DOCUMENT),
            PatternTerm::var("doc"),
        )
        .triple(
            PatternTerm::var("doc"),
            PatternTerm::iri(terms::DCTERMS_SOURCE),
            PatternTerm::var("source"),
        );
    let mut bindings = Bindings::new();
    bindings.insert("item".to_string(), Term::iri(item("1-012")));
    let rows = store.query(&pattern, &bindings, Some(COOEE)).expect("query");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row["item"] == Term::iri(item("1-012"))));
    let outside = store
        .query(&pattern, &bindings, Some(MITCHEL_DELBRIDGE))
        .expect("query");
    assert!(outside.is_empty());
}

#[test]
fn test_serialize_scope_and_reload() {
    let store = fixture_store();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("item.n3");
    let subject = Term::iri(item("1-012"));
    let written = store
        .serialize(&[TriplePattern::any().subject(subject.clone())], &path)
        .expect("serialize");
    assert_eq!(
        written,
        store
            .triples(&TriplePattern::any().subject(subject.clone()))
            .expect("triples")
            .len()
    );

    let reloaded = SqliteTripleStore::open_in_memory().expect("store");
    let stats = attach_directory(&reloaded, dir.path(), |_| None).expect("attach");
    assert_eq!(stats.files, 1);
    assert_eq!(reloaded.len().expect("len"), written);
    assert_eq!(
        reloaded
            .value(&subject, terms::DCTERMS_IDENTIFIER)
            .expect("value")
            .map(|t| t.value().to_string()),
        Some("1-012".to_string())
    );
}

#[test]
fn test_select_query_evaluates_against_store() {
    let store = fixture_store();
    let query = SelectQuery::parse(
        "SELECT DISTINCT ?type WHERE { ?doc <http://purl.org/dc/terms/type> ?type } ORDER BY ?type",
    );
    // ORDER BY is outside the evaluated subset
    assert!(query.is_err());

    let query = SelectQuery::parse(
        "SELECT DISTINCT ?type WHERE { ?doc <http://purl.org/dc/terms/type> ?type }",
    )
    .expect("parse");
    let results = query.evaluate(&store, Some(COOEE)).expect("evaluate");
    let values: Vec<&str> = results
        .bindings()
        .iter()
        .map(|row| row["type"].value.as_str())
        .collect();
    assert_eq!(values, vec!["Text", "Raw"]);

    let limited = SelectQuery::parse(
        "SELECT ?doc WHERE { ?doc <http://purl.org/dc/terms/type> \"Raw\" } LIMIT 3 OFFSET 1",
    )
    .expect("parse")
    .evaluate(&store, None)
    .expect("evaluate");
    assert_eq!(limited.bindings().len(), 3);
}
