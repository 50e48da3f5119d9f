use std::path::Path;

use partscan_config::{AppConfig, CurveBoundsMode, PreviewConfig};
use partscan_core::{
    containment::filter_outer,
    drawing::{CadDrawing, CadEntity, insertion_units_label},
    geometry::Bounds2D,
    shape::{BoundingBox, ShapeRecord, SourceKind},
    units::UnitNormalizer,
};
use partscan_io::{DrawingLoader, DxfFacade, DxfOptions};
use tracing::{debug, info, warn};

use crate::adapter::FormatAdapter;
use crate::errors::EngineError;
use crate::thumbnail;

/// `$INSUNITS` 中毫米的代码。
const INSUNITS_MILLIMETERS: i16 = 4;

/// DXF 路径：模型空间实体逐个求包围盒，最后做包含过滤。
#[derive(Debug, Clone)]
pub struct DxfAdapter {
    options: DxfOptions,
    curve_bounds: CurveBoundsMode,
    preview: PreviewConfig,
}

impl DxfAdapter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            options: DxfOptions {
                include_paperspace: config.cad.include_paperspace,
            },
            curve_bounds: config.cad.curve_bounds,
            preview: config.preview.clone(),
        }
    }

    pub fn shapes_from_drawing(
        &self,
        drawing: &CadDrawing,
    ) -> Result<Vec<ShapeRecord>, EngineError> {
        match drawing.insertion_units() {
            Some(code) if code != 0 && code != INSUNITS_MILLIMETERS => warn!(
                code,
                units = insertion_units_label(code),
                "图纸单位不是毫米，坐标按原值输出"
            ),
            _ => {}
        }

        let normalizer = UnitNormalizer::cad();
        let mut records = Vec::with_capacity(drawing.len());
        for entity in drawing.entities() {
            let Some(raw) = entity_bounds(entity, self.curve_bounds) else {
                warn!(entity = entity.type_tag(), "实体没有可用的几何信息，已跳过");
                continue;
            };
            let bbox = BoundingBox::from(normalizer.normalize_bounds(&raw));
            let record = ShapeRecord::new(SourceKind::Cad, bbox)?
                .with_entity_kind(entity.type_tag())
                .with_layer(entity.layer_name());
            debug!(
                entity = entity.type_tag(),
                width = record.width(),
                height = record.height(),
                "CAD 形状"
            );
            records.push(record);
        }

        let total = records.len();
        let outer = filter_outer(records);
        info!(total, outer = outer.len(), "包含过滤完成");

        Ok(outer
            .into_iter()
            .map(|record| {
                let preview = thumbnail::cad_preview(record.bbox(), &self.preview);
                record.with_thumbnail(preview)
            })
            .collect())
    }
}

impl FormatAdapter for DxfAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Cad
    }

    fn analyze(&self, path: &Path) -> Result<Vec<ShapeRecord>, EngineError> {
        let drawing = DxfFacade::with_options(self.options).load(path)?;
        info!(entities = drawing.len(), "DXF 读取完成");
        self.shapes_from_drawing(&drawing)
    }
}

/// 单个实体的原始包围盒。
///
/// 默认模式下有顶点的实体取顶点外包；圆与椭圆没有顶点，以声明尺寸为边长、
/// 最小角位于原点，这是一个近似。解析模式按实际曲线计算。
pub fn entity_bounds(entity: &CadEntity, mode: CurveBoundsMode) -> Option<Bounds2D> {
    match mode {
        CurveBoundsMode::Analytic => entity.analytic_bounds(),
        CurveBoundsMode::DeclaredSize => Bounds2D::from_points(entity.vertices()).or_else(|| {
            entity
                .declared_size()
                .map(|size| Bounds2D::from_extents(0.0, 0.0, size, size))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partscan_core::drawing::{Circle, Line, Polyline, PolylineVertex};
    use partscan_core::geometry::Point2;

    fn rect_polyline(min: (f64, f64), max: (f64, f64)) -> CadEntity {
        CadEntity::Polyline(Polyline {
            vertices: [
                (min.0, min.1),
                (max.0, min.1),
                (max.0, max.1),
                (min.0, max.1),
            ]
            .into_iter()
            .map(|(x, y)| PolylineVertex::new(Point2::new(x, y)))
            .collect(),
            is_closed: true,
            layer: "CUT".into(),
        })
    }

    fn circle(cx: f64, cy: f64, r: f64) -> CadEntity {
        CadEntity::Circle(Circle {
            center: Point2::new(cx, cy),
            radius: r,
            layer: "0".into(),
        })
    }

    #[test]
    fn declared_size_places_circle_at_origin() {
        let bounds = entity_bounds(&circle(50.0, 50.0, 5.0), CurveBoundsMode::DeclaredSize)
            .expect("圆应有包围盒");
        assert_eq!(bounds, Bounds2D::from_extents(0.0, 0.0, 10.0, 10.0));

        let analytic = entity_bounds(&circle(50.0, 50.0, 5.0), CurveBoundsMode::Analytic)
            .expect("圆应有包围盒");
        assert_eq!(analytic, Bounds2D::from_extents(45.0, 45.0, 55.0, 55.0));
    }

    #[test]
    fn nested_entities_are_filtered_and_previewed() {
        let mut drawing = CadDrawing::new();
        drawing.push(rect_polyline((0.0, 0.0), (100.0, 100.0)));
        drawing.push(rect_polyline((10.0, 10.0), (20.0, 20.0)));
        drawing.push(CadEntity::Line(Line {
            start: Point2::new(150.0, 0.0),
            end: Point2::new(150.0, 40.0),
            layer: "0".into(),
        }));

        let adapter = DxfAdapter::from_config(&AppConfig::default());
        let shapes = adapter.shapes_from_drawing(&drawing).expect("分析应成功");
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].entity_kind(), Some("LWPOLYLINE"));
        assert_eq!(shapes[0].layer(), Some("CUT"));
        assert_eq!(shapes[0].area(), 10_000.0);
        // 竖直线宽度为零，仍然保留
        assert_eq!(shapes[1].width(), 0.0);
        assert!(
            shapes
                .iter()
                .all(|s| s.thumbnail().preview.starts_with(thumbnail::DATA_URI_PREFIX))
        );
    }

    #[test]
    fn declared_size_circles_can_be_swallowed_by_origin_shapes() {
        // 声明尺寸模式下圆被放到原点，位于大外框之内
        let mut drawing = CadDrawing::new();
        drawing.push(rect_polyline((0.0, 0.0), (100.0, 100.0)));
        drawing.push(circle(500.0, 500.0, 5.0));
        let adapter = DxfAdapter::from_config(&AppConfig::default());
        assert_eq!(adapter.shapes_from_drawing(&drawing).unwrap().len(), 1);

        let mut config = AppConfig::default();
        config.cad.curve_bounds = CurveBoundsMode::Analytic;
        let adapter = DxfAdapter::from_config(&config);
        assert_eq!(adapter.shapes_from_drawing(&drawing).unwrap().len(), 2);
    }

    #[test]
    fn negative_radius_is_malformed() {
        let mut drawing = CadDrawing::new();
        drawing.push(circle(0.0, 0.0, -2.0));
        let adapter = DxfAdapter::from_config(&AppConfig::default());
        let err = adapter.shapes_from_drawing(&drawing).unwrap_err();
        assert!(matches!(err, EngineError::MalformedGeometry(_)));
    }
}
