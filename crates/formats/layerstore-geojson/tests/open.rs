use std::io::Write;

use geo_types::{Geometry, Rect, coord};
use layerstore_common::{FeatureLayer, FeatureQuery, Layer};
use layerstore_geojson::{GeoJsonLayer, GeoJsonLayerOptions, GeoJsonReadError};
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".geojson").expect("temp file");
    file.write_all(contents.as_bytes()).expect("write");
    file
}

/// Grid of `n` x `n` points at integer coordinates, named `p<x>_<y>`.
fn grid(n: usize) -> String {
    let features: Vec<String> = (0..n)
        .flat_map(|x| (0..n).map(move |y| (x, y)))
        .map(|(x, y)| {
            format!(
                r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{x},{y}]}},"properties":{{"name":"p{x}_{y}","x":{x}}}}}"#
            )
        })
        .collect();
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
}

#[tokio::test]
async fn open_reads_file_and_names_layer_after_stem() {
    let file = write_temp(&grid(3));
    let layer = GeoJsonLayer::open(7, file.path(), GeoJsonLayerOptions::new())
        .await
        .expect("open");

    assert_eq!(layer.id(), 7);
    assert_eq!(layer.len(), 9);
    let stem = file.path().file_stem().unwrap().to_str().unwrap();
    assert_eq!(layer.display_name(), stem);

    let fields: Vec<String> = layer.fields().into_iter().map(|f| f.keyname).collect();
    assert_eq!(fields, vec!["name", "x"]);
}

#[tokio::test]
async fn open_reads_geojson_sequence() {
    let file = write_temp(
        r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]},"properties":{"name":"a"}}
{"type":"Feature","geometry":{"type":"Point","coordinates":[1,1]},"properties":{"name":"b"}}
"#,
    );
    let layer = GeoJsonLayer::open(1, file.path(), GeoJsonLayerOptions::new().with_display_name("seq"))
        .await
        .expect("open");
    assert_eq!(layer.display_name(), "seq");
    assert_eq!(layer.len(), 2);
}

#[tokio::test]
async fn missing_file_is_io_error() {
    let err = GeoJsonLayer::open(1, "/nonexistent/layer.geojson", GeoJsonLayerOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GeoJsonReadError::Io { .. }));
}

#[tokio::test]
async fn intersecting_window_reports_full_total() {
    let file = write_temp(&grid(5));
    let layer = GeoJsonLayer::open(1, file.path(), GeoJsonLayerOptions::new())
        .await
        .expect("open");

    let area = Geometry::Rect(Rect::new(coord! { x: -0.5, y: -0.5 }, coord! { x: 2.5, y: 2.5 }));
    let query = FeatureQuery::new().intersects(area, 4326).limit(4, 0);
    let result = layer.execute(&query).await.expect("query");

    assert_eq!(result.total_count(), 9);
    assert_eq!(result.len(), 4);
}

#[tokio::test]
async fn fetch_by_id_round_trips() {
    let file = write_temp(&grid(4));
    let layer = GeoJsonLayer::open(1, file.path(), GeoJsonLayerOptions::new().with_label_field("name"))
        .await
        .expect("open");

    let listed = layer
        .execute(&FeatureQuery::new().like("p2_3"))
        .await
        .expect("query")
        .one()
        .expect("one feature");
    let again = layer
        .execute(&FeatureQuery::new().filter_by_id(listed.id))
        .await
        .expect("query");

    assert_eq!(again.len(), 1);
    assert_eq!(again.features()[0].id, listed.id);
    assert_eq!(again.features()[0].label, "p2_3");
}
