//! 自包含的 SVG 缩略图，以 base64 data URI 形式嵌入报表。

use std::fmt::Write as _;

use base64::Engine as _;
use partscan_config::PreviewConfig;
use partscan_core::geometry::Bounds2D;
use partscan_core::path::PathGeometry;
use partscan_core::shape::{BoundingBox, Thumbnail};

pub const DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

pub fn encode_svg(svg: &str) -> String {
    let mut out = String::from(DATA_URI_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(svg.as_bytes(), &mut out);
    out
}

/// 零尺寸维度在渲染时按 1 个单位处理。
#[inline]
fn renderable(extent: f64) -> f64 {
    if extent > 0.0 { extent } else { 1.0 }
}

/// CAD 缩略图：以形状外框尺寸画一个描边矩形。
pub fn cad_preview(bbox: &BoundingBox, config: &PreviewConfig) -> Thumbnail {
    let width = bbox.width().max(1.0);
    let height = bbox.height().max(1.0);
    let stroke = width.max(height) * config.rect_stroke_ratio;
    let scale = config.cad_scale;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" width="{}" height="{}">"#,
        width * scale,
        height * scale
    );
    let _ = write!(
        svg,
        r#"<rect x="0" y="0" width="{width}" height="{height}" fill="none" stroke="black" stroke-width="{stroke}"/>"#
    );
    svg.push_str("</svg>");

    Thumbnail {
        preview: encode_svg(&svg),
        preview_global: None,
    }
}

/// 单条路径的预览。视口为路径在原始坐标下的包围盒；`flip_y` 时按
/// `translate(0, ymin+ymax) scale(1,-1)` 在视口内上下翻转。
pub fn path_preview(
    geometry: &PathGeometry,
    raw: &Bounds2D,
    scale: f64,
    stroke_ratio: f64,
    flip_y: bool,
) -> String {
    let (min_x, min_y) = (raw.min().x(), raw.min().y());
    let width = renderable(raw.width());
    let height = renderable(raw.height());
    let stroke = width.max(height) * stroke_ratio;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{min_x} {min_y} {width} {height}" width="{}" height="{}">"#,
        width * scale,
        height * scale
    );
    if flip_y {
        let _ = write!(
            svg,
            r#"<g transform="translate(0,{}) scale(1,-1)">"#,
            raw.min().y() + raw.max().y()
        );
    } else {
        svg.push_str("<g>");
    }
    let _ = write!(
        svg,
        r#"<path d="{}" fill="none" stroke="black" stroke-width="{stroke}"/>"#,
        geometry.to_svg_data()
    );
    svg.push_str("</g></svg>");
    encode_svg(&svg)
}

/// 矢量格式的两份预览：表格用放大版与 1:1 的全局版。
pub fn vector_previews(
    geometry: &PathGeometry,
    raw: &Bounds2D,
    config: &PreviewConfig,
    flip_y: bool,
) -> Thumbnail {
    Thumbnail {
        preview: path_preview(
            geometry,
            raw,
            config.table_scale,
            config.path_stroke_ratio,
            flip_y,
        ),
        preview_global: Some(path_preview(
            geometry,
            raw,
            config.global_scale,
            config.path_stroke_ratio,
            flip_y,
        )),
    }
}
