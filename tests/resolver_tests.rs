mod common;

use alveograph::EntityKind;
use common::{COOEE, MITCHEL_DELBRIDGE, fixture_catalog, item};

#[test]
fn test_item_and_collection_resolve_symmetrically() {
    let catalog = fixture_catalog();
    for collection in [COOEE, MITCHEL_DELBRIDGE] {
        let items = catalog
            .resolve(EntityKind::Item, EntityKind::Collection, collection)
            .expect("items");
        assert!(!items.is_empty());
        for member in &items {
            let owners = catalog
                .resolve(EntityKind::Collection, EntityKind::Item, member)
                .expect("owners");
            assert_eq!(owners, vec![collection.to_string()]);
        }
    }
}

#[test]
fn test_collection_lists_all_its_items() {
    let catalog = fixture_catalog();
    let items = catalog
        .resolve(EntityKind::Item, EntityKind::Collection, COOEE)
        .expect("items");
    assert_eq!(items.len(), 7);
    assert!(items.contains(&item("1-012")));
}

#[test]
fn test_annotation_resolves_through_its_batch() {
    let catalog = fixture_catalog();
    let annotation = format!("{COOEE}/annotation/3");
    assert_eq!(
        catalog
            .resolve(EntityKind::Item, EntityKind::Annotation, &annotation)
            .expect("item"),
        vec![item("1-012")]
    );
    assert_eq!(
        catalog
            .resolve(EntityKind::Collection, EntityKind::Annotation, &annotation)
            .expect("collection"),
        vec![COOEE.to_string()]
    );
    assert_eq!(
        catalog
            .resolve(EntityKind::AnnotationCollection, EntityKind::Annotation, &annotation)
            .expect("batch"),
        vec![format!("{COOEE}/annotation_collection/fixture-2")]
    );
}

#[test]
fn test_item_annotations_and_batches() {
    let catalog = fixture_catalog();
    let annotations = catalog
        .resolve(EntityKind::Annotation, EntityKind::Item, &item("1-012"))
        .expect("annotations");
    assert_eq!(annotations.len(), 3);
    let batches = catalog
        .resolve(EntityKind::AnnotationCollection, EntityKind::Collection, COOEE)
        .expect("batches");
    assert_eq!(batches.len(), 2);
}

#[test]
fn test_documents_resolve_both_ways() {
    let catalog = fixture_catalog();
    let documents = catalog
        .resolve(EntityKind::Document, EntityKind::Item, &item("1-012"))
        .expect("documents");
    assert_eq!(documents.len(), 2);
    for document in &documents {
        assert_eq!(
            catalog
                .resolve(EntityKind::Item, EntityKind::Document, document)
                .expect("item"),
            vec![item("1-012")]
        );
        assert_eq!(
            catalog
                .resolve(EntityKind::Collection, EntityKind::Document, document)
                .expect("collection"),
            vec![COOEE.to_string()]
        );
    }
}

#[test]
fn test_unsupported_pair_is_empty_not_an_error() {
    let catalog = fixture_catalog();
    assert!(catalog
        .resolve(EntityKind::ItemList, EntityKind::Annotation, &item("1-012"))
        .expect("empty")
        .is_empty());
    assert!(catalog
        .resolve(EntityKind::Collection, EntityKind::Item, &item("9-999"))
        .expect("empty")
        .is_empty());
}
