mod common;

use alveograph::metadata::{REQUIRED_FIELDS, UNSPECIFIED};
use alveograph::{
    Catalog, CatalogConfig, Term, Triple, TripleStore, Value, namespaces::terms,
};
use common::{MITCHEL_DELBRIDGE, fixture_catalog, item};

#[test]
fn test_bare_item_gets_every_required_field() {
    let catalog = fixture_catalog();
    let metadata = catalog
        .get_item_metadata(&format!("{MITCHEL_DELBRIDGE}/items/S1228s1"))
        .expect("query")
        .expect("item exists");
    assert_eq!(REQUIRED_FIELDS.len(), 18);
    for key in REQUIRED_FIELDS {
        assert_eq!(metadata.get(key), Some(&Value::text(UNSPECIFIED)), "{key}");
    }
    assert!(metadata.documents.is_empty());
    assert_eq!(metadata.get("dcterms:identifier"), Some(&Value::text("S1228s1")));
}

#[test]
fn test_explicit_values_survive_defaulting() {
    let catalog = fixture_catalog();
    let metadata = catalog
        .get_item_metadata(&item("1-012"))
        .expect("query")
        .expect("item exists");
    assert_eq!(metadata.get("ausnc:mode"), Some(&Value::text("written")));
    assert_eq!(metadata.get("ausnc:written_mode"), Some(&Value::text("print")));
    assert_eq!(metadata.get("olac:discourse_type"), Some(&Value::text("letter")));
    assert_eq!(metadata.get("ausnc:audience"), Some(&Value::text(UNSPECIFIED)));
    assert_eq!(
        metadata.get("alveo:indexable_document"),
        Some(&Value::Uri(
            "http://localhost:3000/catalog/cooee/documents/1-012-plain.txt".to_string()
        ))
    );
}

#[test]
fn test_documents_are_assembled_in_order() {
    let catalog = fixture_catalog();
    let metadata = catalog
        .get_item_metadata(&item("1-012"))
        .expect("query")
        .expect("item exists");
    assert_eq!(metadata.documents.len(), 2);
    let plain = &metadata.documents[0];
    assert_eq!(plain.url, "http://localhost:3000/documents/cooee/1-012-plain.txt");
    assert_eq!(plain.title, Value::text("1-012#Text"));
    assert_eq!(plain.extent, Value::Integer(1186));
    let raw = &metadata.documents[1];
    assert_eq!(raw.extent, Value::text(""));
    assert_eq!(raw.size, Value::text(""));
    assert_eq!(metadata.get("dcterms:type"), Some(&Value::text("Text, Raw")));
    assert_eq!(
        metadata.get("ausnc:document"),
        Some(&Value::text("1-012#Text, 1-012#Raw"))
    );
}

#[test]
fn test_record_urls_use_collection_and_identifier() {
    let catalog = fixture_catalog();
    let metadata = catalog
        .get_item_metadata(&item("1-012"))
        .expect("query")
        .expect("item exists");
    assert_eq!(metadata.catalog_url, "http://localhost:3000/catalog/cooee/1-012");
    assert_eq!(
        metadata.annotations_url,
        "http://localhost:3000/catalog/cooee/1-012/annotations.json"
    );
    assert_eq!(
        metadata.primary_text_url,
        "http://localhost:3000/catalog/cooee/1-012/primary_text.json"
    );
    let json = serde_json::to_value(&metadata).expect("json");
    assert_eq!(json["alveo:metadata"]["dc:created"], "1788");
    assert_eq!(json["alveo:documents"][0]["alveo:url"], metadata.documents[0].url);
}

#[test]
fn test_unknown_item_is_absent() {
    let catalog = fixture_catalog();
    assert!(catalog.get_item_metadata(&item("9-999")).expect("query").is_none());
}

#[test]
fn test_first_value_wins_for_repeated_predicates() {
    let catalog = Catalog::new(CatalogConfig::new("unused")).expect("catalog");
    let subject = Term::iri("http://localhost:3000/catalog/x/items/1");
    catalog
        .store()
        .insert_all(
            None,
            &[
                Triple::new(subject.clone(), terms::DCTERMS_IDENTIFIER, Term::literal("first")),
                Triple::new(subject.clone(), terms::DCTERMS_IDENTIFIER, Term::literal("second")),
            ],
        )
        .expect("insert");
    let metadata = catalog
        .get_item_metadata("http://localhost:3000/catalog/x/items/1")
        .expect("query")
        .expect("item");
    assert_eq!(metadata.get("dcterms:identifier"), Some(&Value::text("first")));
}
