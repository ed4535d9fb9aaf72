mod common;

use alveograph::{
    AnnotationFilter, AnnotationUpload, CatalogError, NewAnnotation, RegionKind, Value,
};
use chrono::{TimeZone, Utc};
use common::{COOEE, fixture_catalog, item, scratch_catalog, scratch_corpus};

const PAGENO: &str = "http://ns.ausnc.org.au/schemas/cooee/pageno";
const ELLIPSIS: &str = "http://ns.ausnc.org.au/schemas/cooee/ellipsis";
const SPEAKER: &str = "http://ns.ausnc.org.au/schemas/cooee/speaker";

fn ids(set: &alveograph::AnnotationSet) -> Vec<&str> {
    set.annotations.iter().map(|a| a.id.as_str()).collect()
}

#[test]
fn test_unfiltered_annotations_follow_collection_chain() {
    let catalog = fixture_catalog();
    let set = catalog
        .get_annotations(&item("1-012"), &AnnotationFilter::new())
        .expect("annotations");
    assert_eq!(set.len(), 3);
    assert_eq!(
        set.common_properties.annotates.as_deref(),
        Some("http://localhost:3000/documents/cooee/1-012-plain.txt")
    );

    let first = &set.annotations[0];
    assert_eq!(first.id, format!("{COOEE}/annotation/1"));
    assert_eq!(first.kind, RegionKind::Text);
    assert_eq!(first.annotation_type, PAGENO);
    assert_eq!(first.label.as_deref(), Some("11"));
    assert_eq!(first.start, Some(Value::Integer(2460)));
    assert_eq!(first.properties.get("cooee:note"), Some(&Value::text("page break")));
    assert!(!first.properties.contains_key("dada:partof"));

    let timed = &set.annotations[2];
    assert_eq!(timed.kind, RegionKind::Second);
    assert_eq!(timed.start, Some(Value::Float(0.5)));
    assert_eq!(timed.end, Some(Value::Float(1.25)));
}

#[test]
fn test_item_without_annotations_yields_empty_set() {
    let catalog = fixture_catalog();
    let set = catalog
        .get_annotations(&item("1-011"), &AnnotationFilter::new())
        .expect("annotations");
    assert!(set.is_empty());
    assert!(catalog.get_annotation_types(&item("9-999")).expect("types").is_empty());
}

#[test]
fn test_type_filter_selects_one_annotation() {
    let catalog = fixture_catalog();
    let set = catalog
        .get_annotations(&item("1-012"), &AnnotationFilter::new().with_type("cooee:pageno"))
        .expect("annotations");
    assert_eq!(ids(&set), vec![format!("{COOEE}/annotation/1").as_str()]);
}

#[test]
fn test_type_and_label_filters_are_anded() {
    let catalog = fixture_catalog();
    let by_label = catalog
        .get_annotations(&item("1-012"), &AnnotationFilter::new().with_label("11"))
        .expect("annotations");
    assert_eq!(by_label.len(), 2);

    let both = catalog
        .get_annotations(
            &item("1-012"),
            &AnnotationFilter::new().with_type("cooee:pageno").with_label("11"),
        )
        .expect("annotations");
    assert_eq!(ids(&both), vec![format!("{COOEE}/annotation/1").as_str()]);

    let disjoint = catalog
        .get_annotations(
            &item("1-012"),
            &AnnotationFilter::new().with_type("cooee:speaker").with_label("11"),
        )
        .expect("annotations");
    assert!(disjoint.is_empty());
}

#[test]
fn test_type_filter_accepts_full_iri() {
    let catalog = fixture_catalog();
    let set = catalog
        .get_annotations(&item("1-012"), &AnnotationFilter::new().with_type(ELLIPSIS))
        .expect("annotations");
    assert_eq!(set.len(), 1);
}

#[test]
fn test_prior_to_filters_by_generation_time() {
    let catalog = fixture_catalog();
    let cutoff = Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap();
    let set = catalog
        .get_annotations(&item("1-012"), &AnnotationFilter::new().prior_to(cutoff))
        .expect("annotations");
    assert_eq!(set.len(), 2);
    let exact = Utc.with_ymd_and_hms(2013, 12, 20, 12, 20, 0).unwrap();
    let none = catalog
        .get_annotations(&item("1-012"), &AnnotationFilter::new().prior_to(exact))
        .expect("annotations");
    assert!(none.is_empty(), "the threshold is exclusive");
}

#[test]
fn test_user_filter_matches_provenance_agent() {
    let catalog = fixture_catalog();
    let set = catalog
        .get_annotations(&item("1-012"), &AnnotationFilter::new().by_user("reviewer@example.org"))
        .expect("annotations");
    assert_eq!(ids(&set), vec![format!("{COOEE}/annotation/3").as_str()]);

    let combined = AnnotationFilter::from_params([
        ("user", "data_owner@alveo.edu.au"),
        ("type", "cooee:ellipsis"),
    ])
    .expect("params");
    let set = catalog.get_annotations(&item("1-012"), &combined).expect("annotations");
    assert_eq!(ids(&set), vec![format!("{COOEE}/annotation/2").as_str()]);
}

#[test]
fn test_unknown_prefix_in_type_filter_is_malformed() {
    let catalog = fixture_catalog();
    let err = catalog
        .get_annotations(&item("1-012"), &AnnotationFilter::new().with_type("nope:pageno"))
        .expect_err("bad prefix");
    assert!(matches!(err, CatalogError::MalformedInput(_)));
}

#[test]
fn test_annotation_types_are_distinct_in_first_seen_order() {
    let catalog = fixture_catalog();
    assert_eq!(
        catalog.get_annotation_types(&item("1-012")).expect("types"),
        vec![PAGENO, ELLIPSIS, SPEAKER]
    );
}

fn upload(item_uri: &str, annotations: Vec<NewAnnotation>) -> AnnotationUpload {
    AnnotationUpload {
        item: item_uri.to_string(),
        user: "Steve.Cassidy@mq.edu.au".to_string(),
        software: None,
        annotations,
    }
}

#[test]
fn test_add_annotation_records_batch_and_provenance() {
    let dir = scratch_corpus();
    let catalog = scratch_catalog(&dir);
    let receipt = catalog
        .add_annotation(
            "cooee",
            &upload(
                &item("1-011"),
                vec![
                    NewAnnotation::text("cooee:pageno", Some("2"), 10, 20),
                    NewAnnotation::seconds("cooee:speaker", None, 0.0, 2.5),
                ],
            ),
        )
        .expect("recorded");
    assert_eq!(
        receipt.annotations,
        vec![format!("{COOEE}/annotation/4"), format!("{COOEE}/annotation/5")]
    );
    assert!(receipt.file.starts_with(dir.path().join("cooee").join("annotations")));
    assert!(receipt.file.exists());

    let set = catalog
        .get_annotations(&item("1-011"), &AnnotationFilter::new())
        .expect("annotations");
    assert_eq!(set.len(), 2);
    assert_eq!(set.annotations[0].start, Some(Value::Integer(10)));
    assert_eq!(set.annotations[1].kind, RegionKind::Second);
    assert_eq!(set.annotations[1].label, None);

    let mine = catalog
        .get_annotations(
            &item("1-011"),
            &AnnotationFilter::new().by_user("Steve.Cassidy@mq.edu.au"),
        )
        .expect("annotations");
    assert_eq!(mine.len(), 2);
    let earlier = catalog
        .get_annotations(
            &item("1-011"),
            &AnnotationFilter::new().prior_to(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()),
        )
        .expect("annotations");
    assert!(earlier.is_empty());
}

#[test]
fn test_rejected_upload_leaves_nothing_behind() {
    let dir = scratch_corpus();
    let catalog = scratch_catalog(&dir);
    let before = catalog.store().len().expect("len");

    let wrong_collection = catalog
        .add_annotation(
            "mitcheldelbridge",
            &upload(&item("1-011"), vec![NewAnnotation::text("cooee:pageno", None, 1, 2)]),
        )
        .expect_err("item is not in that collection");
    assert!(matches!(wrong_collection, CatalogError::NotFound(_)));

    let backwards = catalog
        .add_annotation(
            "cooee",
            &upload(&item("1-011"), vec![NewAnnotation::text("cooee:pageno", None, 9, 2)]),
        )
        .expect_err("end before start");
    assert!(matches!(backwards, CatalogError::MalformedInput(_)));

    let empty = catalog
        .add_annotation("cooee", &upload(&item("1-011"), Vec::new()))
        .expect_err("empty batch");
    assert!(matches!(empty, CatalogError::MalformedInput(_)));

    let unknown = catalog
        .add_annotation(
            "austalk",
            &upload(&item("1-011"), vec![NewAnnotation::text("cooee:pageno", None, 1, 2)]),
        )
        .expect_err("unknown collection");
    assert!(matches!(unknown, CatalogError::NotFound(_)));

    assert_eq!(catalog.store().len().expect("len"), before);
    let written = std::fs::read_dir(dir.path().join("cooee").join("annotations"))
        .expect("annotation dir")
        .count();
    assert_eq!(written, 1, "only the fixture file remains");
    assert_eq!(
        catalog.next_annotation_id("cooee").expect("id"),
        format!("{COOEE}/annotation/4")
    );
}

#[test]
fn test_upload_payload_round_trips_through_catalog() {
    let dir = scratch_corpus();
    let catalog = scratch_catalog(&dir);
    let payload: AnnotationUpload = serde_json::from_value(serde_json::json!({
        "item": item("1-014"),
        "user": "data_owner@alveo.edu.au",
        "@graph": [
            {"@type": "dada:TextAnnotation", "type": "cooee:pageno", "label": "7", "start": 0, "end": 4}
        ]
    }))
    .expect("payload");
    let receipt = catalog.add_annotation(COOEE, &payload).expect("recorded");
    let json = serde_json::to_value(&receipt).expect("json");
    assert_eq!(json["annotations"][0], format!("{COOEE}/annotation/4"));
    assert!(json.get("file").is_none());

    let set = catalog
        .get_annotations(&item("1-014"), &AnnotationFilter::new().with_label("7"))
        .expect("annotations");
    let json = serde_json::to_value(&set).expect("json");
    assert_eq!(json["alveo:annotations"][0]["@type"], "dada:TextAnnotation");
    assert_eq!(json["alveo:annotations"][0]["type"], PAGENO);
    assert_eq!(json["alveo:annotations"][0]["end"], 4);
}
