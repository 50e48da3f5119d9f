//! 单位换算：把各格式的原生坐标换算为毫米。
//!
//! 三个常量数值上有两个相同，但语义不同，不可混用：
//! `PX_TO_MM` 用于带 `px` 后缀的物理尺寸，`UNSIZED_UNIT_TO_MM` 用于缺少物理尺寸时
//! 把 viewBox 单位按 72 dpi 直接换算，`PT_TO_MM` 用于转换器输出的 PDF 点坐标。

use thiserror::Error;

use crate::geometry::{Bounds2D, Point2};
use crate::shape::SourceKind;

/// 1 px 对应的毫米数（96 dpi 约定）。
pub const PX_TO_MM: f64 = 0.264583;
/// 1 pt 对应的毫米数。
pub const PT_TO_MM: f64 = 25.4 / 72.0;
/// 缺少物理尺寸时，viewBox 单位按 72 单位/英寸换算。
pub const UNSIZED_UNIT_TO_MM: f64 = 25.4 / 72.0;

pub const IN_TO_MM: f64 = 25.4;
pub const CM_TO_MM: f64 = 10.0;
pub const PC_TO_MM: f64 = 25.4 / 6.0;

#[derive(Debug, Error, PartialEq)]
pub enum UnitError {
    #[error("viewBox 尺寸无效（宽 {width}，高 {height}），无法建立坐标空间")]
    InvalidViewBox { width: f64, height: f64 },
    #[error("物理尺寸无效：{value}")]
    InvalidPhysicalSize { value: f64 },
}

/// 物理长度的单位。`Unitless` 表示裸数字，按毫米处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalUnit {
    Unitless,
    Millimeter,
    Centimeter,
    Inch,
    Pixel,
    Point,
    Pica,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalLength {
    pub value: f64,
    pub unit: PhysicalUnit,
}

impl PhysicalLength {
    #[inline]
    pub fn new(value: f64, unit: PhysicalUnit) -> Self {
        Self { value, unit }
    }

    pub fn to_mm(self) -> f64 {
        let factor = match self.unit {
            PhysicalUnit::Unitless | PhysicalUnit::Millimeter => 1.0,
            PhysicalUnit::Centimeter => CM_TO_MM,
            PhysicalUnit::Inch => IN_TO_MM,
            PhysicalUnit::Pixel => PX_TO_MM,
            PhysicalUnit::Point => PT_TO_MM,
            PhysicalUnit::Pica => PC_TO_MM,
        };
        self.value * factor
    }
}

/// 文件声明的物理宽高，任一维可缺失。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalSize {
    pub width: Option<PhysicalLength>,
    pub height: Option<PhysicalLength>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Result<Self, UnitError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) || !min_x.is_finite() || !min_y.is_finite() {
            return Err(UnitError::InvalidViewBox { width, height });
        }
        Ok(Self {
            min_x,
            min_y,
            width,
            height,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    pub x: f64,
    pub y: f64,
}

impl UnitScale {
    pub const IDENTITY: UnitScale = UnitScale { x: 1.0, y: 1.0 };

    #[inline]
    pub fn uniform(factor: f64) -> Self {
        Self {
            x: factor,
            y: factor,
        }
    }
}

/// 针对单个文件的单位换算器，构造时确定比例与是否翻转 Y 轴。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitNormalizer {
    kind: SourceKind,
    scale: UnitScale,
    flip_height: Option<f64>,
}

impl UnitNormalizer {
    /// CAD 坐标视为已是目标单位，1:1。
    pub fn cad() -> Self {
        Self {
            kind: SourceKind::Cad,
            scale: UnitScale::IDENTITY,
            flip_height: None,
        }
    }

    /// SVG：宽高都声明且为正时按 物理尺寸 / viewBox 计算比例，否则退回 72 dpi 常量。
    pub fn vector(physical: PhysicalSize, view_box: ViewBox) -> Result<Self, UnitError> {
        let width_mm = physical_mm(physical.width)?;
        let height_mm = physical_mm(physical.height)?;
        let scale = match (width_mm, height_mm) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => UnitScale {
                x: w / view_box.width,
                y: h / view_box.height,
            },
            _ => UnitScale::uniform(UNSIZED_UNIT_TO_MM),
        };
        Ok(Self {
            kind: SourceKind::Vector,
            scale,
            flip_height: None,
        })
    }

    /// 转换器输出：固定按点换算，并以 viewBox 高度翻转 Y 轴。
    pub fn converted(view_box: ViewBox) -> Self {
        Self {
            kind: SourceKind::ConvertedVector,
            scale: UnitScale::uniform(PT_TO_MM),
            flip_height: Some(view_box.height),
        }
    }

    #[inline]
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    #[inline]
    pub fn scale(&self) -> UnitScale {
        self.scale
    }

    #[inline]
    pub fn flips_y(&self) -> bool {
        self.flip_height.is_some()
    }

    /// 单个长度（宽或高）换算为毫米。
    #[inline]
    pub fn normalize_extent(&self, raw: f64, axis: Axis) -> f64 {
        match axis {
            Axis::X => raw * self.scale.x,
            Axis::Y => raw * self.scale.y,
        }
    }

    /// 原始坐标下的包围盒换算到毫米空间。缩放与轴向翻转和求包围盒可交换，
    /// 因此直接作用于四个边界值即可。
    pub fn normalize_bounds(&self, raw: &Bounds2D) -> Bounds2D {
        let min_x = self.normalize_extent(raw.min().x(), Axis::X);
        let max_x = self.normalize_extent(raw.max().x(), Axis::X);
        let (low_y, high_y) = match self.flip_height {
            Some(height) => (height - raw.max().y(), height - raw.min().y()),
            None => (raw.min().y(), raw.max().y()),
        };
        let min_y = self.normalize_extent(low_y, Axis::Y);
        let max_y = self.normalize_extent(high_y, Axis::Y);
        Bounds2D::new(Point2::new(min_x, min_y), Point2::new(max_x, max_y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

fn physical_mm(length: Option<PhysicalLength>) -> Result<Option<f64>, UnitError> {
    let Some(length) = length else {
        return Ok(None);
    };
    let mm = length.to_mm();
    if !mm.is_finite() || mm < 0.0 {
        return Err(UnitError::InvalidPhysicalSize { value: length.value });
    }
    Ok(Some(mm))
}
