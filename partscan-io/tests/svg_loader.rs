use std::path::PathBuf;

use partscan_core::{geometry::Point2, units::PhysicalUnit};
use partscan_io::{DrawingLoader, SvgFacade, SvgOptions};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn reads_root_metadata_with_dtd() {
    let doc = SvgFacade::new()
        .load(&fixture("nested.svg"))
        .expect("读取 SVG 失败");
    assert_eq!(doc.view_box.width, 100.0);
    assert_eq!(doc.view_box.height, 50.0);
    let width = doc.physical.width.expect("应有物理宽度");
    assert_eq!(width.value, 200.0);
    assert_eq!(width.unit, PhysicalUnit::Millimeter);
}

#[test]
fn skips_non_rendered_subtrees_and_keeps_document_order() {
    let doc = SvgFacade::new()
        .load(&fixture("nested.svg"))
        .expect("读取 SVG 失败");
    let ids: Vec<_> = doc.elements.iter().filter_map(|e| e.id.as_deref()).collect();
    assert_eq!(ids, ["frame", "slot", "hole"]);
}

#[test]
fn composed_transforms_place_geometry() {
    let doc = SvgFacade::new()
        .load(&fixture("nested.svg"))
        .expect("读取 SVG 失败");
    let slot = doc
        .elements
        .iter()
        .find(|e| e.id.as_deref() == Some("slot"))
        .expect("缺少 slot");
    let bounds = slot.placed_geometry().bounds().expect("slot 应有包围盒");
    // scale(0.5) 后再 translate(10 5)
    assert_eq!(bounds.min(), Point2::new(15.0, 10.0));
    assert_eq!(bounds.max(), Point2::new(25.0, 12.0));

    let hole = doc
        .elements
        .iter()
        .find(|e| e.id.as_deref() == Some("hole"))
        .expect("缺少 hole");
    assert!(hole.transform.is_identity());
    let bounds = hole.placed_geometry().bounds().expect("hole 应有包围盒");
    assert!((bounds.width() - 10.0).abs() < 1e-9);
}

#[test]
fn paths_only_ignores_basic_shapes() {
    let doc = SvgFacade::with_options(SvgOptions {
        paths_only: true,
        ..SvgOptions::default()
    })
        .load(&fixture("nested.svg"))
        .expect("读取 SVG 失败");
    assert_eq!(doc.elements.len(), 1);
    assert_eq!(doc.elements[0].tag, "path");
}

#[test]
fn malformed_xml_is_invalid_document() {
    let err = SvgFacade::new().parse_str("<svg viewBox=\"0 0 1 1\">").unwrap_err();
    assert!(matches!(err, partscan_io::IoError::InvalidDocument(_)));
}
