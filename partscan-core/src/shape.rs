use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Bounds2D;

/// 形状来源格式，序列化为报表中的 `type` 字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "DXF")]
    Cad,
    #[serde(rename = "SVG")]
    Vector,
    #[serde(rename = "AI")]
    ConvertedVector,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Cad => "DXF",
            SourceKind::Vector => "SVG",
            SourceKind::ConvertedVector => "AI",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("包围盒包含非有限数值：({min_x}, {min_y}) - ({max_x}, {max_y})")]
    NonFinite {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
    #[error("包围盒尺寸为负：宽 {width}，高 {height}")]
    NegativeExtent { width: f64, height: f64 },
}

/// 毫米空间中的轴对齐包围盒，字段名与报表键一致。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "minx")]
    pub min_x: f64,
    #[serde(rename = "miny")]
    pub min_y: f64,
    #[serde(rename = "maxx")]
    pub max_x: f64,
    #[serde(rename = "maxy")]
    pub max_y: f64,
}

impl BoundingBox {
    #[inline]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// 非严格包含：四条边允许重合。角点按 `min` 与 `min + 宽高` 计算。
    pub fn encloses(&self, other: &BoundingBox) -> bool {
        let self_max_x = self.min_x + self.width();
        let self_max_y = self.min_y + self.height();
        let other_max_x = other.min_x + other.width();
        let other_max_y = other.min_y + other.height();
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self_max_x >= other_max_x
            && self_max_y >= other_max_y
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        let values = [self.min_x, self.min_y, self.max_x, self.max_y];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite {
                min_x: self.min_x,
                min_y: self.min_y,
                max_x: self.max_x,
                max_y: self.max_y,
            });
        }
        if self.width() < 0.0 || self.height() < 0.0 {
            return Err(GeometryError::NegativeExtent {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }
}

impl From<Bounds2D> for BoundingBox {
    fn from(bounds: Bounds2D) -> Self {
        Self::new(
            bounds.min().x(),
            bounds.min().y(),
            bounds.max().x(),
            bounds.max().y(),
        )
    }
}

/// 缩略图：`preview` 为表格用预览，矢量格式另带 1:1 的全局预览。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_global: Option<String>,
}

/// 一次分析产出的单个形状记录，构造后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    #[serde(rename = "type")]
    source_kind: SourceKind,
    #[serde(rename = "dxftype", skip_serializing_if = "Option::is_none")]
    entity_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layer: Option<String>,
    #[serde(flatten)]
    bbox: BoundingBox,
    width: f64,
    height: f64,
    area: f64,
    description: String,
    #[serde(flatten)]
    thumbnail: Thumbnail,
}

impl ShapeRecord {
    pub fn new(source_kind: SourceKind, bbox: BoundingBox) -> Result<Self, GeometryError> {
        bbox.validate()?;
        let width = bbox.width();
        let height = bbox.height();
        Ok(Self {
            source_kind,
            entity_kind: None,
            layer: None,
            bbox,
            width,
            height,
            area: width * height,
            description: String::new(),
            thumbnail: Thumbnail::default(),
        })
    }

    pub fn with_entity_kind(mut self, kind: impl Into<String>) -> Self {
        self.entity_kind = Some(kind.into());
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: Thumbnail) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    #[inline]
    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    #[inline]
    pub fn entity_kind(&self) -> Option<&str> {
        self.entity_kind.as_deref()
    }

    #[inline]
    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    #[inline]
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.area
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn thumbnail(&self) -> &Thumbnail {
        &self.thumbnail
    }
}
