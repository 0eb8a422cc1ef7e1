use geoingest_core_common::{FeatureSource, SourcePosition, SourceReadError};
use geoingest_geojson::{GeoJsonSource, GeoJsonWriterOptions, write_feature_collection};
use geojson::feature::Id;
use geojson::{FeatureCollection, GeoJson, Value};

/// Test reading a collection that declares its CRS with the 2008 EPSG form
#[test]
fn test_read_collection_with_epsg_code_crs() {
    let source = GeoJsonSource::open("tests/e2e_data/epsg_code_crs.geojson").expect("open");
    assert_eq!(source.crs(), Some("EPSG:26910"));
    assert_eq!(source.driver_name(), "GeoJSON");

    let items: Vec<_> = source.collect();
    assert_eq!(items.len(), 3);

    let first = items[0].as_ref().expect("first feature");
    assert_eq!(first.id, Some(Id::String("tract-1".to_string())));
    assert_eq!(
        first.geometry.as_ref().map(|g| g.value.clone()),
        Some(Value::Point(vec![551_000.0, 4_182_000.0, 12.5]))
    );

    // a broken feature does not take the collection down with it
    match &items[1] {
        Err(SourceReadError::Geometry { position, .. }) => {
            assert_eq!(position.as_ref(), Some(&SourcePosition::feature(1)));
        },
        other => panic!("expected geometry error, got {other:?}"),
    }

    let third = items[2].as_ref().expect("third feature");
    assert!(third.geometry.is_none());
    assert!(third.properties.is_empty());
}

/// Test reading a single `Feature` document
#[test]
fn test_read_single_feature() {
    let features: Vec<_> = GeoJsonSource::open("tests/e2e_data/single_feature.geojson")
        .expect("open")
        .collect();
    assert_eq!(features.len(), 1);
    let feature = features[0].as_ref().expect("feature");
    assert_eq!(feature.properties.get("name"), Some(&"lake".into()));
}

/// Test reading a bare geometry document
#[test]
fn test_read_bare_geometry() {
    let mut source = GeoJsonSource::open("tests/e2e_data/bare_geometry.json").expect("open");
    assert!(source.crs().is_none());
    let feature = source.next().expect("one item").expect("feature");
    assert!(matches!(
        feature.geometry.map(|g| g.value),
        Some(Value::LineString(line)) if line[0].len() == 3
    ));
    assert!(source.next().is_none());
}

/// Test streaming a record-separated sequence with blank and broken lines
#[test]
fn test_read_sequence_records() {
    let source = GeoJsonSource::open_sequence("tests/e2e_data/records.geojsons").expect("open");
    assert_eq!(source.driver_name(), "GeoJSONSeq");
    assert!(source.crs().is_none());

    let items: Vec<_> = source.collect();
    assert_eq!(items.len(), 5);
    assert_eq!(items.iter().filter(|item| item.is_ok()).count(), 4);

    match &items[3] {
        Err(SourceReadError::Parse { position, .. }) => {
            assert_eq!(position.as_ref().and_then(|p| p.line), Some(4));
        },
        other => panic!("expected parse error, got {other:?}"),
    }

    let last = items[4].as_ref().expect("bare geometry line");
    assert_eq!(
        last.geometry.as_ref().map(|g| g.value.clone()),
        Some(Value::Point(vec![4.0, 4.0]))
    );
}

/// Test that an unreadable document fails at open time
#[test]
fn test_open_rejects_non_geojson() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.geojson");
    std::fs::write(&path, "[1, 2, 3]").expect("write");

    let err = GeoJsonSource::open(&path).err().expect("error");
    assert!(err.to_string().contains("Expected a JSON object, found array"));

    let missing = GeoJsonSource::open(dir.path().join("missing.geojson"))
        .err()
        .expect("error");
    assert!(matches!(missing, SourceReadError::Io { .. }));
}

/// Test writing a collection and reading it back as `GeoJSON`
#[test]
fn test_write_feature_collection_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.geojson");

    let collection: FeatureCollection = r#"{
        "type": "FeatureCollection",
        "bbox": [1.0, 2.0, 1.0, 2.0],
        "features": [{
            "type": "Feature",
            "bbox": [1.0, 2.0, 1.0, 2.0],
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
            "properties": {"acres": 0.0}
        }]
    }"#
    .parse::<GeoJson>()
    .and_then(FeatureCollection::try_from)
    .expect("collection");

    let mut file = std::fs::File::create(&path).expect("create");
    write_feature_collection(
        &mut file,
        &collection,
        &GeoJsonWriterOptions::default().with_pretty(true),
    )
    .expect("write");

    let text = std::fs::read_to_string(&path).expect("read");
    assert!(text.ends_with("}\n"));
    assert!(text.lines().count() > 1);

    let reread = GeoJsonSource::open(&path).expect("reopen");
    assert_eq!(reread.count(), 1);
}
