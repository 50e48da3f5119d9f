use std::borrow::Cow;
use std::path::Path;

use partscan_config::{AppConfig, PreviewConfig};
use partscan_core::{
    geometry::Bounds2D,
    path::PathGeometry,
    shape::{BoundingBox, ShapeRecord, SourceKind},
    units::UnitNormalizer,
};
use partscan_io::{DrawingLoader, SvgDocument, SvgElement, SvgFacade};
use tracing::{debug, info};

use crate::adapter::FormatAdapter;
use crate::errors::EngineError;
use crate::thumbnail;

/// SVG 路径：每个可见图元输出一条记录，不做包含过滤。
#[derive(Debug, Clone)]
pub struct SvgAdapter {
    apply_transforms: bool,
    preview: PreviewConfig,
}

impl SvgAdapter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            apply_transforms: config.svg.apply_transforms,
            preview: config.preview.clone(),
        }
    }

    pub fn shapes_from_document(
        &self,
        document: &SvgDocument,
    ) -> Result<Vec<ShapeRecord>, EngineError> {
        let normalizer = UnitNormalizer::vector(document.physical, document.view_box)?;
        let scale = normalizer.scale();
        debug!(scale_x = scale.x, scale_y = scale.y, "SVG 单位比例");

        let mut records = Vec::with_capacity(document.elements.len());
        for element in &document.elements {
            let Some(raw) = placed_bounds(element, self.apply_transforms) else {
                continue;
            };
            let geometry = placed_geometry(element, self.apply_transforms);
            let bbox = BoundingBox::from(normalizer.normalize_bounds(&raw));
            let preview =
                thumbnail::vector_previews(&geometry, &raw, &self.preview, normalizer.flips_y());
            let mut record = ShapeRecord::new(SourceKind::Vector, bbox)?.with_thumbnail(preview);
            if let Some(id) = &element.id {
                record = record.with_description(id.as_str());
            }
            records.push(record);
        }
        Ok(records)
    }
}

impl FormatAdapter for SvgAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Vector
    }

    fn analyze(&self, path: &Path) -> Result<Vec<ShapeRecord>, EngineError> {
        let document = SvgFacade::new().load(path)?;
        info!(elements = document.elements.len(), "SVG 读取完成");
        self.shapes_from_document(&document)
    }
}

pub(crate) fn placed_bounds(
    element: &SvgElement,
    apply_transforms: bool,
) -> Option<Bounds2D> {
    if apply_transforms {
        element.placed_bounds()
    } else {
        element.geometry.bounds()
    }
}

/// 图元在根坐标系下的几何。关闭变换时直接使用原始路径坐标。
pub(crate) fn placed_geometry(
    element: &SvgElement,
    apply_transforms: bool,
) -> Cow<'_, PathGeometry> {
    if apply_transforms {
        element.placed_geometry()
    } else {
        Cow::Borrowed(&element.geometry)
    }
}
