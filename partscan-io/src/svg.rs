//! SVG 读取：根节点尺寸元数据、可见图元的路径几何及其累积变换。

use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;

use partscan_core::{
    geometry::{Affine2, Bounds2D, Point2},
    path::PathGeometry,
    units::{PhysicalLength, PhysicalSize, PhysicalUnit, ViewBox},
};
use roxmltree::{Document, Node, ParsingOptions};
use svgtypes::{LengthUnit, SimplePathSegment, SimplifyingPathParser};
use tracing::{debug, warn};

use crate::{DrawingLoader, IoError, read_text};

/// 不参与渲染的容器，其子树中的图元一律忽略。
const NON_RENDERED: &[&str] = &["defs", "clipPath", "mask", "symbol", "pattern", "marker"];

const BASIC_SHAPES: &[&str] = &["rect", "circle", "ellipse", "line", "polyline", "polygon"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SvgOptions {
    /// 只读取 `path` 元素；为假时基本图形也转换为路径。
    pub paths_only: bool,
    /// 同时读取 `defs`、`clipPath` 等容器中的图元，按文档顺序排列。
    pub include_non_rendered: bool,
}

/// 单个可见图元。`geometry` 为原始坐标，`transform` 为自身及全部祖先的累积变换。
#[derive(Debug, Clone, PartialEq)]
pub struct SvgElement {
    pub tag: String,
    pub id: Option<String>,
    pub geometry: PathGeometry,
    pub transform: Affine2,
}

impl SvgElement {
    /// 把累积变换作用到几何上；恒等变换时直接借用原几何。
    pub fn placed_geometry(&self) -> Cow<'_, PathGeometry> {
        self.geometry.transformed(&self.transform)
    }

    /// 根坐标系下的包围盒。轴对齐变换直接映射原始包围盒，含旋转或斜切时先变换完整几何再求。
    pub fn placed_bounds(&self) -> Option<Bounds2D> {
        if self.transform.is_axis_aligned() {
            self.geometry
                .bounds()
                .and_then(|raw| self.transform.map_bounds(&raw))
        } else {
            self.placed_geometry().bounds()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub physical: PhysicalSize,
    pub view_box: ViewBox,
    pub elements: Vec<SvgElement>,
}

#[derive(Debug, Clone, Default)]
pub struct SvgFacade {
    options: SvgOptions,
}

impl SvgFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SvgOptions) -> Self {
        Self { options }
    }

    pub fn parse_str(&self, source: &str) -> Result<SvgDocument, IoError> {
        let document = Document::parse_with_options(
            source,
            ParsingOptions {
                allow_dtd: true,
                ..ParsingOptions::default()
            },
        )
        .map_err(|err| IoError::InvalidDocument(format!("XML 解析失败：{err}")))?;

        let root = document.root_element();
        if root.tag_name().name() != "svg" {
            return Err(IoError::InvalidDocument(format!(
                "根元素为 <{}>，期望 <svg>",
                root.tag_name().name()
            )));
        }

        let view_box = parse_view_box(root.attribute("viewBox"))?;
        let physical = PhysicalSize {
            width: parse_physical_length(root.attribute("width"), "width"),
            height: parse_physical_length(root.attribute("height"), "height"),
        };

        let mut elements = Vec::new();
        for node in root.descendants().filter(|n| n.is_element()) {
            let tag = node.tag_name().name();
            let wanted = tag == "path" || (!self.options.paths_only && BASIC_SHAPES.contains(&tag));
            let hidden = !self.options.include_non_rendered && is_inside_non_rendered(node);
            if !wanted || hidden {
                continue;
            }
            let Some(geometry) = element_geometry(node) else {
                continue;
            };
            if geometry.is_empty() {
                continue;
            }
            elements.push(SvgElement {
                tag: tag.to_string(),
                id: node.attribute("id").map(str::to_string),
                geometry,
                transform: compose_ancestor_transforms(node),
            });
        }
        debug!(count = elements.len(), "SVG 图元读取完成");

        Ok(SvgDocument {
            physical,
            view_box,
            elements,
        })
    }
}

impl DrawingLoader for SvgFacade {
    type Output = SvgDocument;

    fn load(&self, path: &Path) -> Result<SvgDocument, IoError> {
        let data = read_text(path)?;
        self.parse_str(&data)
    }
}

/// 从元素自身开始沿祖先链向上，依次以 `祖先 × 累积` 组合变换，
/// 因此最靠近根的矩阵最后作用。缺失或无法解析的属性视为恒等变换。
pub fn compose_ancestor_transforms(node: Node<'_, '_>) -> Affine2 {
    let mut accumulated = Affine2::IDENTITY;
    for ancestor in node.ancestors().filter(|n| n.is_element()) {
        let local = parse_transform(ancestor.attribute("transform")).unwrap_or_else(|| {
            warn!(
                element = ancestor.tag_name().name(),
                "transform 属性无法解析，按恒等变换处理"
            );
            Affine2::IDENTITY
        });
        accumulated = local.compose(accumulated);
    }
    accumulated
}

/// 把一个 transform 属性作用到几何上。属性缺失、为空或解析为恒等变换时原样借用。
pub fn apply_transform<'a>(
    geometry: &'a PathGeometry,
    transform: Option<&str>,
) -> Cow<'a, PathGeometry> {
    match parse_transform(transform) {
        Some(matrix) => geometry.transformed(&matrix),
        None => Cow::Borrowed(geometry),
    }
}

/// 解析 transform 属性。缺失或空白返回恒等变换，语法错误返回 `None`。
pub fn parse_transform(raw: Option<&str>) -> Option<Affine2> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Some(Affine2::IDENTITY);
    };
    let ts = svgtypes::Transform::from_str(raw).ok()?;
    let matrix = Affine2::from_matrix(ts.a, ts.b, ts.c, ts.d, ts.e, ts.f);
    matrix.to_array().iter().all(|v| v.is_finite()).then_some(matrix)
}

fn is_inside_non_rendered(node: Node<'_, '_>) -> bool {
    node.ancestors()
        .skip(1)
        .any(|a| a.is_element() && NON_RENDERED.contains(&a.tag_name().name()))
}

fn parse_view_box(raw: Option<&str>) -> Result<ViewBox, IoError> {
    let raw = raw.ok_or_else(|| IoError::MissingMetadata("SVG 缺少 viewBox 属性".into()))?;
    let parsed = svgtypes::ViewBox::from_str(raw)
        .map_err(|err| IoError::MissingMetadata(format!("viewBox \"{raw}\" 无法解析：{err}")))?;
    ViewBox::new(parsed.x, parsed.y, parsed.w, parsed.h)
        .map_err(|err| IoError::MissingMetadata(err.to_string()))
}

/// 根节点宽高。相对单位（%、em、ex）与无法解析的值按缺失处理。
fn parse_physical_length(raw: Option<&str>, name: &str) -> Option<PhysicalLength> {
    let raw = raw?.trim();
    let length = match svgtypes::Length::from_str(raw) {
        Ok(length) => length,
        Err(_) => {
            warn!(attribute = name, value = raw, "物理尺寸无法解析，视为缺失");
            return None;
        }
    };
    let unit = match length.unit {
        LengthUnit::None => PhysicalUnit::Unitless,
        LengthUnit::Mm => PhysicalUnit::Millimeter,
        LengthUnit::Cm => PhysicalUnit::Centimeter,
        LengthUnit::In => PhysicalUnit::Inch,
        LengthUnit::Px => PhysicalUnit::Pixel,
        LengthUnit::Pt => PhysicalUnit::Point,
        LengthUnit::Pc => PhysicalUnit::Pica,
        LengthUnit::Percent | LengthUnit::Em | LengthUnit::Ex => {
            debug!(attribute = name, value = raw, "相对单位不构成物理尺寸");
            return None;
        }
    };
    Some(PhysicalLength::new(length.number, unit))
}

fn element_geometry(node: Node<'_, '_>) -> Option<PathGeometry> {
    match node.tag_name().name() {
        "path" => node.attribute("d").map(parse_path_data),
        "rect" => {
            let width = number_attr(node, "width")?;
            let height = number_attr(node, "height")?;
            if width <= 0.0 || height <= 0.0 {
                return None;
            }
            Some(PathGeometry::rect(
                number_attr(node, "x").unwrap_or(0.0),
                number_attr(node, "y").unwrap_or(0.0),
                width,
                height,
            ))
        }
        "circle" => {
            let r = number_attr(node, "r")?;
            (r > 0.0).then(|| {
                PathGeometry::ellipse(
                    number_attr(node, "cx").unwrap_or(0.0),
                    number_attr(node, "cy").unwrap_or(0.0),
                    r,
                    r,
                )
            })
        }
        "ellipse" => {
            let rx = number_attr(node, "rx")?;
            let ry = number_attr(node, "ry")?;
            (rx > 0.0 && ry > 0.0).then(|| {
                PathGeometry::ellipse(
                    number_attr(node, "cx").unwrap_or(0.0),
                    number_attr(node, "cy").unwrap_or(0.0),
                    rx,
                    ry,
                )
            })
        }
        "line" => Some(PathGeometry::polyline(
            [
                Point2::new(
                    number_attr(node, "x1").unwrap_or(0.0),
                    number_attr(node, "y1").unwrap_or(0.0),
                ),
                Point2::new(
                    number_attr(node, "x2").unwrap_or(0.0),
                    number_attr(node, "y2").unwrap_or(0.0),
                ),
            ],
            false,
        )),
        tag @ ("polyline" | "polygon") => {
            let points = node.attribute("points")?;
            let points = svgtypes::PointsParser::from(points).map(|(x, y)| Point2::new(x, y));
            Some(PathGeometry::polyline(points, tag == "polygon"))
        }
        _ => None,
    }
}

fn number_attr(node: Node<'_, '_>, name: &str) -> Option<f64> {
    let raw = node.attribute(name)?;
    svgtypes::Length::from_str(raw.trim())
        .ok()
        .map(|length| length.number)
        .filter(|v| v.is_finite())
}

/// 路径数据解析为绝对坐标的直线/贝塞尔段（圆弧已转为三次曲线）。
/// 遇到语法错误时保留已解析部分，与浏览器的容错渲染一致。
pub fn parse_path_data(data: &str) -> PathGeometry {
    let mut path = PathGeometry::new();
    for segment in SimplifyingPathParser::from(data) {
        let segment = match segment {
            Ok(segment) => segment,
            Err(err) => {
                warn!(error = %err, "路径数据存在语法错误，截断其后的内容");
                break;
            }
        };
        match segment {
            SimplePathSegment::MoveTo { x, y } => {
                path.move_to(Point2::new(x, y));
            }
            SimplePathSegment::LineTo { x, y } => {
                path.line_to(Point2::new(x, y));
            }
            SimplePathSegment::Quadratic { x1, y1, x, y } => {
                path.quad_to(Point2::new(x1, y1), Point2::new(x, y));
            }
            SimplePathSegment::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                path.cubic_to(Point2::new(x1, y1), Point2::new(x2, y2), Point2::new(x, y));
            }
            SimplePathSegment::ClosePath => {
                path.close();
            }
        }
    }
    path
}
