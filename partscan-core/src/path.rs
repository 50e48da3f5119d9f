//! 矢量路径几何：由绝对坐标的直线与贝塞尔段组成，提供精确包围盒与仿射映射。

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::geometry::{Affine2, Bounds2D, Point2};

/// 圆弧近似为三次贝塞尔时的控制柄系数（四段拼整圆）。
const KAPPA: f64 = 0.552_284_749_830_793_4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point2),
    LineTo(Point2),
    QuadTo {
        ctrl: Point2,
        to: Point2,
    },
    CubicTo {
        ctrl1: Point2,
        ctrl2: Point2,
        to: Point2,
    },
    Close,
}

impl PathSegment {
    fn map(self, transform: &Affine2) -> Self {
        let p = |point: Point2| transform.transform_point(point);
        match self {
            PathSegment::MoveTo(to) => PathSegment::MoveTo(p(to)),
            PathSegment::LineTo(to) => PathSegment::LineTo(p(to)),
            PathSegment::QuadTo { ctrl, to } => PathSegment::QuadTo {
                ctrl: p(ctrl),
                to: p(to),
            },
            PathSegment::CubicTo { ctrl1, ctrl2, to } => PathSegment::CubicTo {
                ctrl1: p(ctrl1),
                ctrl2: p(ctrl2),
                to: p(to),
            },
            PathSegment::Close => PathSegment::Close,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathGeometry {
    segments: Vec<PathSegment>,
}

impl PathGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn move_to(&mut self, to: Point2) -> &mut Self {
        self.segments.push(PathSegment::MoveTo(to));
        self
    }

    pub fn line_to(&mut self, to: Point2) -> &mut Self {
        self.segments.push(PathSegment::LineTo(to));
        self
    }

    pub fn quad_to(&mut self, ctrl: Point2, to: Point2) -> &mut Self {
        self.segments.push(PathSegment::QuadTo { ctrl, to });
        self
    }

    pub fn cubic_to(&mut self, ctrl1: Point2, ctrl2: Point2, to: Point2) -> &mut Self {
        self.segments.push(PathSegment::CubicTo { ctrl1, ctrl2, to });
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.segments.push(PathSegment::Close);
        self
    }

    /// 轴对齐矩形，顺时针（SVG 坐标系下）。
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        let mut path = Self::new();
        path.move_to(Point2::new(x, y))
            .line_to(Point2::new(x + width, y))
            .line_to(Point2::new(x + width, y + height))
            .line_to(Point2::new(x, y + height))
            .close();
        path
    }

    /// 轴对齐椭圆，四段三次贝塞尔，端点落在四个轴向极值上。
    pub fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64) -> Self {
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);
        let mut path = Self::new();
        path.move_to(Point2::new(cx + rx, cy))
            .cubic_to(
                Point2::new(cx + rx, cy + ky),
                Point2::new(cx + kx, cy + ry),
                Point2::new(cx, cy + ry),
            )
            .cubic_to(
                Point2::new(cx - kx, cy + ry),
                Point2::new(cx - rx, cy + ky),
                Point2::new(cx - rx, cy),
            )
            .cubic_to(
                Point2::new(cx - rx, cy - ky),
                Point2::new(cx - kx, cy - ry),
                Point2::new(cx, cy - ry),
            )
            .cubic_to(
                Point2::new(cx + kx, cy - ry),
                Point2::new(cx + rx, cy - ky),
                Point2::new(cx + rx, cy),
            )
            .close();
        path
    }

    pub fn polyline<I>(points: I, closed: bool) -> Self
    where
        I: IntoIterator<Item = Point2>,
    {
        let mut path = Self::new();
        for (index, point) in points.into_iter().enumerate() {
            if index == 0 {
                path.move_to(point);
            } else {
                path.line_to(point);
            }
        }
        if closed && !path.is_empty() {
            path.close();
        }
        path
    }

    /// 路径的精确包围盒：曲线段求导数零点得到极值，而不是取控制点外包。
    /// 只有 MoveTo 的路径没有可见几何，返回 `None`。
    pub fn bounds(&self) -> Option<Bounds2D> {
        let mut bounds = Bounds2D::empty();
        let mut current: Option<Point2> = None;
        let mut subpath_start: Option<Point2> = None;

        for segment in &self.segments {
            match *segment {
                PathSegment::MoveTo(to) => {
                    current = Some(to);
                    subpath_start = Some(to);
                }
                PathSegment::LineTo(to) => {
                    let from = current.unwrap_or(to);
                    bounds.include_point(from);
                    bounds.include_point(to);
                    current = Some(to);
                }
                PathSegment::QuadTo { ctrl, to } => {
                    let from = current.unwrap_or(to);
                    include_quad(&mut bounds, from, ctrl, to);
                    current = Some(to);
                }
                PathSegment::CubicTo { ctrl1, ctrl2, to } => {
                    let from = current.unwrap_or(to);
                    include_cubic(&mut bounds, from, ctrl1, ctrl2, to);
                    current = Some(to);
                }
                PathSegment::Close => {
                    if let (Some(from), Some(start)) = (current, subpath_start) {
                        bounds.include_point(from);
                        bounds.include_point(start);
                    }
                    current = subpath_start;
                }
            }
        }

        if bounds.is_empty() { None } else { Some(bounds) }
    }

    /// 将仿射变换作用到每个端点与控制点。恒等变换直接借用原几何，不复制。
    pub fn transformed(&self, transform: &Affine2) -> Cow<'_, PathGeometry> {
        if transform.is_identity() {
            return Cow::Borrowed(self);
        }
        Cow::Owned(PathGeometry {
            segments: self.segments.iter().map(|s| s.map(transform)).collect(),
        })
    }

    /// 序列化为 SVG `d` 属性（绝对坐标命令）。
    pub fn to_svg_data(&self) -> String {
        let mut out = String::with_capacity(self.segments.len() * 24);
        for (index, segment) in self.segments.iter().enumerate() {
            if index != 0 {
                out.push(' ');
            }
            let _ = match *segment {
                PathSegment::MoveTo(p) => write!(out, "M {} {}", p.x(), p.y()),
                PathSegment::LineTo(p) => write!(out, "L {} {}", p.x(), p.y()),
                PathSegment::QuadTo { ctrl, to } => {
                    write!(out, "Q {} {} {} {}", ctrl.x(), ctrl.y(), to.x(), to.y())
                }
                PathSegment::CubicTo { ctrl1, ctrl2, to } => write!(
                    out,
                    "C {} {} {} {} {} {}",
                    ctrl1.x(),
                    ctrl1.y(),
                    ctrl2.x(),
                    ctrl2.y(),
                    to.x(),
                    to.y()
                ),
                PathSegment::Close => write!(out, "Z"),
            };
        }
        out
    }
}

fn include_quad(bounds: &mut Bounds2D, p0: Point2, p1: Point2, p2: Point2) {
    bounds.include_point(p0);
    bounds.include_point(p2);
    let (a, b, c) = (p0.as_vec2(), p1.as_vec2(), p2.as_vec2());
    let denom = a - b * 2.0 + c;
    for (num, den) in [(a.x - b.x, denom.x), (a.y - b.y, denom.y)] {
        if den.abs() <= f64::EPSILON {
            continue;
        }
        let t = num / den;
        if t > 0.0 && t < 1.0 {
            let mt = 1.0 - t;
            let point = a * (mt * mt) + b * (2.0 * mt * t) + c * (t * t);
            bounds.include_point(Point2::from_vec(point));
        }
    }
}

fn include_cubic(bounds: &mut Bounds2D, p0: Point2, p1: Point2, p2: Point2, p3: Point2) {
    bounds.include_point(p0);
    bounds.include_point(p3);
    let (a0, a1, a2, a3) = (p0.as_vec2(), p1.as_vec2(), p2.as_vec2(), p3.as_vec2());
    let eval = |t: f64| {
        let mt = 1.0 - t;
        a0 * (mt * mt * mt) + a1 * (3.0 * mt * mt * t) + a2 * (3.0 * mt * t * t) + a3 * (t * t * t)
    };

    // B'(t)/3 = a·t² + b·t + c
    let a = a3 - a0 + (a1 - a2) * 3.0;
    let b = (a0 - a1 * 2.0 + a2) * 2.0;
    let c = a1 - a0;
    for (qa, qb, qc) in [(a.x, b.x, c.x), (a.y, b.y, c.y)] {
        for t in quadratic_roots(qa, qb, qc).into_iter().flatten() {
            if t > 0.0 && t < 1.0 {
                bounds.include_point(Point2::from_vec(eval(t)));
            }
        }
    }
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> [Option<f64>; 2] {
    if a.abs() <= 1e-12 {
        if b.abs() <= 1e-12 {
            return [None, None];
        }
        return [Some(-c / b), None];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return [None, None];
    }
    let sq = disc.sqrt();
    [Some((-b + sq) / (2.0 * a)), Some((-b - sq) / (2.0 * a))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn cubic_bounds_use_extrema_not_control_points() {
        let mut path = PathGeometry::new();
        path.move_to(Point2::new(0.0, 0.0)).cubic_to(
            Point2::new(0.0, 100.0),
            Point2::new(100.0, 100.0),
            Point2::new(100.0, 0.0),
        );
        let bounds = path.bounds().expect("bounds");
        // 对称曲线在 t=0.5 处取得最高点 0.75·100
        assert!(approx(bounds.max().y(), 75.0));
        assert!(approx(bounds.min().y(), 0.0));
        assert!(approx(bounds.width(), 100.0));
    }

    #[test]
    fn quad_bounds_use_extremum() {
        let mut path = PathGeometry::new();
        path.move_to(Point2::new(0.0, 0.0))
            .quad_to(Point2::new(5.0, 10.0), Point2::new(10.0, 0.0));
        let bounds = path.bounds().expect("bounds");
        assert!(approx(bounds.max().y(), 5.0));
    }

    #[test]
    fn ellipse_bounds_are_exact() {
        let bounds = PathGeometry::ellipse(10.0, 20.0, 4.0, 2.0)
            .bounds()
            .expect("bounds");
        assert!(approx(bounds.min().x(), 6.0));
        assert!(approx(bounds.max().x(), 14.0));
        assert!(approx(bounds.min().y(), 18.0));
        assert!(approx(bounds.max().y(), 22.0));
    }

    #[test]
    fn move_only_path_has_no_bounds() {
        let mut path = PathGeometry::new();
        path.move_to(Point2::new(3.0, 3.0));
        assert!(path.bounds().is_none());
        assert!(PathGeometry::new().bounds().is_none());
    }

    #[test]
    fn identity_transform_borrows_original() {
        let path = PathGeometry::rect(1.0, 2.0, 3.0, 4.0);
        let mapped = path.transformed(&Affine2::IDENTITY);
        assert!(matches!(mapped, Cow::Borrowed(_)));
        assert_eq!(mapped.bounds(), path.bounds());
    }

    #[test]
    fn rotation_applies_to_geometry_not_to_bbox_corners() {
        // 非正方形矩形，宽 40 高 10，绕原点外的点旋转 90°
        let path = PathGeometry::rect(10.0, 0.0, 40.0, 10.0);
        let raw = path.bounds().expect("raw bounds");
        let rotate = Affine2::translation(50.0, 50.0)
            .compose(Affine2::rotation(FRAC_PI_2))
            .compose(Affine2::translation(-50.0, -50.0));

        let exact = path.transformed(&rotate).bounds().expect("rotated bounds");
        assert!(approx(exact.width(), 10.0));
        assert!(approx(exact.height(), 40.0));

        // 直接把 min/max 角点当作新的 min/max，宽度变成负数
        let naive_min = rotate.transform_point(raw.min());
        let naive_max = rotate.transform_point(raw.max());
        assert!(approx(naive_max.x() - naive_min.x(), -10.0));
        assert_ne!((naive_min, naive_max), (exact.min(), exact.max()));
        assert!(rotate.map_bounds(&raw).is_none());
    }

    #[test]
    fn oblique_rotation_differs_from_rotated_corner_box() {
        let path = PathGeometry::rect(0.0, 0.0, 40.0, 10.0);
        let raw = path.bounds().expect("raw bounds");
        let rotate = Affine2::rotation(30f64.to_radians());

        let exact = path.transformed(&rotate).bounds().expect("rotated bounds");
        let (sin, cos) = 30f64.to_radians().sin_cos();
        assert!(approx(exact.width(), 40.0 * cos + 10.0 * sin));

        let naive = Bounds2D::from_points([
            rotate.transform_point(raw.min()),
            rotate.transform_point(raw.max()),
        ])
        .expect("naive bounds");
        assert!((naive.width() - exact.width()).abs() > 1.0);
    }

    #[test]
    fn svg_data_round_trips_commands() {
        let mut path = PathGeometry::new();
        path.move_to(Point2::new(0.0, 0.0))
            .line_to(Point2::new(10.0, 0.5))
            .quad_to(Point2::new(1.0, 2.0), Point2::new(3.0, 4.0))
            .close();
        assert_eq!(path.to_svg_data(), "M 0 0 L 10 0.5 Q 1 2 3 4 Z");
    }
}
