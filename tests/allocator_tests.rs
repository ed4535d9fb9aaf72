mod common;

use std::sync::Arc;
use std::thread;

use alveograph::{
    AnnotationIdAllocator, AnnotationUpload, NewAnnotation, SqliteTripleStore, Term, Triple,
    TripleStore, namespaces::terms,
};
use common::{COOEE, item, scratch_catalog, scratch_corpus};

fn trailing_number(id: &str) -> u64 {
    id.rsplit('/').next().expect("segment").parse().expect("number")
}

#[test]
fn test_fresh_collection_allocates_consecutively_from_one() {
    let store = SqliteTripleStore::open_in_memory().expect("store");
    let allocator = AnnotationIdAllocator::new();
    let first = allocator.next_id(&store, COOEE).expect("first");
    let second = allocator.next_id(&store, COOEE).expect("second");
    assert_eq!(first, format!("{COOEE}/annotation/1"));
    assert_eq!(second, format!("{COOEE}/annotation/2"));
}

#[test]
fn test_seed_ignores_other_collections_and_untyped_nodes() {
    let store = SqliteTripleStore::open_in_memory().expect("store");
    store
        .insert_all(
            None,
            &[
                Triple::new(
                    Term::iri("http://localhost:3000/catalog/other/annotation/90"),
                    terms::RDF_TYPE,
                    Term::iri(terms::DADA_ANNOTATION),
                ),
                Triple::new(
                    Term::iri(format!("{COOEE}/annotation/40")),
                    terms::RDFS_LABEL,
                    Term::literal("not typed as an annotation"),
                ),
                Triple::new(
                    Term::iri(format!("{COOEE}/annotation/7")),
                    terms::RDF_TYPE,
                    Term::iri(terms::DADA_ANNOTATION),
                ),
            ],
        )
        .expect("insert");
    let allocator = AnnotationIdAllocator::new();
    assert_eq!(
        allocator.next_id(&store, &format!("{COOEE}/")).expect("id"),
        format!("{COOEE}/annotation/8")
    );
}

#[test]
fn test_concurrent_callers_never_share_an_id() {
    let store = Arc::new(SqliteTripleStore::open_in_memory().expect("store"));
    let allocator = Arc::new(AnnotationIdAllocator::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                (0..25)
                    .map(|_| allocator.next_id(store.as_ref(), COOEE).expect("id"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let mut numbers: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("thread"))
        .map(|id| trailing_number(&id))
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=200).collect::<Vec<_>>());
}

#[test]
fn test_ids_keep_increasing_across_restart() {
    let dir = scratch_corpus();
    let issued = {
        let catalog = scratch_catalog(&dir);
        let receipt = catalog
            .add_annotation(
                "cooee",
                &AnnotationUpload {
                    item: item("1-010"),
                    user: "data_owner@alveo.edu.au".to_string(),
                    software: None,
                    annotations: vec![
                        NewAnnotation::text("cooee:pageno", Some("1"), 0, 5),
                        NewAnnotation::text("cooee:pageno", Some("2"), 5, 9),
                    ],
                },
            )
            .expect("recorded");
        receipt.annotations
    };
    let highest = issued.iter().map(|id| trailing_number(id)).max().expect("ids");

    let restarted = scratch_catalog(&dir);
    let next = restarted.next_annotation_id("cooee").expect("id");
    assert!(trailing_number(&next) > highest, "{next} must follow {highest}");
    assert_eq!(trailing_number(&next), highest + 1);
}

#[test]
fn test_issued_ids_survive_reopening_the_catalog() {
    let dir = scratch_corpus();
    let (first, second) = {
        let catalog = scratch_catalog(&dir);
        (
            catalog.next_annotation_id("cooee").expect("first"),
            catalog.next_annotation_id("cooee").expect("second"),
        )
    };
    assert_eq!(trailing_number(&second), trailing_number(&first) + 1);

    let reopened = scratch_catalog(&dir);
    let third = reopened.next_annotation_id("cooee").expect("third");
    assert_ne!(third, first);
    assert_eq!(trailing_number(&third), trailing_number(&second) + 1);
}

#[test]
fn test_later_attach_raises_the_counter() {
    let dir = scratch_corpus();
    let catalog = scratch_catalog(&dir);
    assert_eq!(
        catalog.next_annotation_id("cooee").expect("id"),
        format!("{COOEE}/annotation/4")
    );

    let extra = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(extra.path().join("cooee")).expect("collection dir");
    std::fs::write(
        extra.path().join("cooee").join("imported.n3"),
        format!(
            "<{COOEE}/annotation/9> a <{}> .\n",
            terms::DADA_ANNOTATION
        ),
    )
    .expect("write");
    catalog.attach(extra.path()).expect("attach");

    assert_eq!(
        catalog.next_annotation_id("cooee").expect("id"),
        format!("{COOEE}/annotation/10")
    );
}
