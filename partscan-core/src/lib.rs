pub mod containment;
pub mod path;
pub mod shape;
pub mod units;

pub mod geometry {
    use glam::{DAffine2, DVec2};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，坐标均为双精度。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，目前用于椭圆主轴等方向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，累积点集或子范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
            Self::new(Point2::new(min_x, min_y), Point2::new(max_x, max_y))
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        /// 由点集构建范围，空集合返回 `None`。
        pub fn from_points<I>(points: I) -> Option<Self>
        where
            I: IntoIterator<Item = Point2>,
        {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(point);
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            self.min = Point2::from_vec(self.min.as_vec2().min(point.as_vec2()));
            self.max = Point2::from_vec(self.max.as_vec2().max(point.as_vec2()));
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }
    }

    /// 二维仿射变换，矩阵布局与 SVG `matrix(a b c d e f)` 一致：
    /// `x' = a·x + c·y + e`，`y' = b·x + d·y + f`。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Affine2(pub DAffine2);

    impl Affine2 {
        pub const IDENTITY: Affine2 = Affine2(DAffine2::IDENTITY);

        #[inline]
        pub fn from_matrix(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
            Self(DAffine2::from_cols_array(&[a, b, c, d, e, f]))
        }

        #[inline]
        pub fn translation(tx: f64, ty: f64) -> Self {
            Self(DAffine2::from_translation(DVec2::new(tx, ty)))
        }

        #[inline]
        pub fn scale(sx: f64, sy: f64) -> Self {
            Self(DAffine2::from_scale(DVec2::new(sx, sy)))
        }

        /// 逆时针旋转（弧度）。
        #[inline]
        pub fn rotation(angle: f64) -> Self {
            Self(DAffine2::from_angle(angle))
        }

        /// 以 `self` 为外层、`inner` 为内层组合：先应用 `inner`，再应用 `self`。
        #[inline]
        pub fn compose(self, inner: Affine2) -> Affine2 {
            Affine2(self.0 * inner.0)
        }

        #[inline]
        pub fn is_identity(&self) -> bool {
            self.0 == DAffine2::IDENTITY
        }

        /// 不含旋转/斜切（仅缩放、镜像、平移）时为真。
        #[inline]
        pub fn is_axis_aligned(&self) -> bool {
            self.0.matrix2.x_axis.y == 0.0 && self.0.matrix2.y_axis.x == 0.0
        }

        #[inline]
        pub fn transform_point(&self, point: Point2) -> Point2 {
            Point2::from_vec(self.0.transform_point2(point.as_vec2()))
        }

        /// 直接变换包围盒的两个角点。仅对轴对齐变换成立，含旋转/斜切时返回 `None`，
        /// 此时必须先变换完整几何再重新求包围盒。
        pub fn map_bounds(&self, bounds: &Bounds2D) -> Option<Bounds2D> {
            if !self.is_axis_aligned() {
                return None;
            }
            Bounds2D::from_points([
                self.transform_point(bounds.min()),
                self.transform_point(bounds.max()),
            ])
        }

        #[inline]
        pub fn abs_diff_eq(&self, other: &Affine2, max_abs_diff: f64) -> bool {
            self.0.abs_diff_eq(other.0, max_abs_diff)
        }

        /// 以 `[a, b, c, d, e, f]` 形式导出。
        #[inline]
        pub fn to_array(&self) -> [f64; 6] {
            self.0.to_cols_array()
        }
    }

    impl Default for Affine2 {
        fn default() -> Self {
            Self::IDENTITY
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::f64::consts::FRAC_PI_2;

        #[test]
        fn bounds_accumulate_points() {
            let bounds = Bounds2D::from_points([
                Point2::new(3.0, -1.0),
                Point2::new(-2.0, 4.0),
                Point2::new(0.5, 0.5),
            ])
            .expect("points produce bounds");
            assert_eq!(bounds.min(), Point2::new(-2.0, -1.0));
            assert_eq!(bounds.max(), Point2::new(3.0, 4.0));
            assert!((bounds.width() - 5.0).abs() < 1e-12);
            assert!((bounds.height() - 5.0).abs() < 1e-12);
            assert!(Bounds2D::from_points(std::iter::empty()).is_none());
        }

        #[test]
        fn composition_is_associative() {
            let a = Affine2::from_matrix(1.2, 0.3, -0.4, 0.9, 5.0, -2.0);
            let b = Affine2::rotation(0.7).compose(Affine2::scale(2.0, 0.5));
            let c = Affine2::translation(-13.0, 8.5);

            let left = a.compose(b).compose(c);
            let right = a.compose(b.compose(c));
            assert!(left.abs_diff_eq(&right, 1e-9));
        }

        #[test]
        fn composition_is_not_commutative() {
            let t = Affine2::translation(10.0, 0.0);
            let s = Affine2::scale(2.0, 2.0);
            let point = Point2::new(1.0, 1.0);

            // 先缩放再平移
            assert_eq!(t.compose(s).transform_point(point), Point2::new(12.0, 2.0));
            // 先平移再缩放
            assert_eq!(s.compose(t).transform_point(point), Point2::new(22.0, 2.0));
        }

        #[test]
        fn matrix_layout_follows_svg_order() {
            let m = Affine2::from_matrix(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
            let p = m.transform_point(Point2::new(1.0, 1.0));
            assert_eq!(p, Point2::new(1.0 + 3.0 + 5.0, 2.0 + 4.0 + 6.0));
            assert_eq!(m.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        }

        #[test]
        fn map_bounds_handles_flip_and_rejects_rotation() {
            let bounds = Bounds2D::from_extents(0.0, 10.0, 4.0, 30.0);
            let flip = Affine2::translation(0.0, 200.0).compose(Affine2::scale(1.0, -1.0));
            let mapped = flip.map_bounds(&bounds).expect("flip is axis aligned");
            assert_eq!(mapped.min(), Point2::new(0.0, 170.0));
            assert_eq!(mapped.max(), Point2::new(4.0, 190.0));

            assert!(Affine2::rotation(FRAC_PI_2).map_bounds(&bounds).is_none());
            assert!(Affine2::IDENTITY.is_identity());
            assert!(!Affine2::rotation(0.1).is_axis_aligned());
        }
    }
}

pub mod drawing {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Vector2};

    /// 模型空间中参与统计的 CAD 实体。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum CadEntity {
        Line(Line),
        Circle(Circle),
        Ellipse(Ellipse),
        Polyline(Polyline),
        Spline(Spline),
    }

    impl CadEntity {
        /// DXF 类型标记（组码 0 的取值）。
        pub fn type_tag(&self) -> &'static str {
            match self {
                CadEntity::Line(_) => "LINE",
                CadEntity::Circle(_) => "CIRCLE",
                CadEntity::Ellipse(_) => "ELLIPSE",
                CadEntity::Polyline(_) => "LWPOLYLINE",
                CadEntity::Spline(_) => "SPLINE",
            }
        }

        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                CadEntity::Line(line) => &line.layer,
                CadEntity::Circle(circle) => &circle.layer,
                CadEntity::Ellipse(ellipse) => &ellipse.layer,
                CadEntity::Polyline(polyline) => &polyline.layer,
                CadEntity::Spline(spline) => &spline.layer,
            }
        }

        /// 显式顶点/控制点列表。圆与椭圆没有顶点，返回空列表。
        /// 样条优先使用控制点，缺失时退回拟合点。
        pub fn vertices(&self) -> Vec<Point2> {
            match self {
                CadEntity::Line(line) => vec![line.start, line.end],
                CadEntity::Polyline(polyline) => {
                    polyline.vertices.iter().map(|v| v.position).collect()
                }
                CadEntity::Spline(spline) => {
                    if spline.control_points.is_empty() {
                        spline.fit_points.clone()
                    } else {
                        spline.control_points.clone()
                    }
                }
                CadEntity::Circle(_) | CadEntity::Ellipse(_) => Vec::new(),
            }
        }

        /// 无顶点实体的声明尺寸：圆取直径，椭圆取主轴全长。
        pub fn declared_size(&self) -> Option<f64> {
            match self {
                CadEntity::Circle(circle) => Some(circle.radius * 2.0),
                CadEntity::Ellipse(ellipse) => Some(ellipse.major_axis.length() * 2.0),
                _ => None,
            }
        }

        /// 解析几何意义上的包围盒：圆按半径展开、椭圆按参数采样、多段线考虑 bulge 圆弧。
        pub fn analytic_bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                CadEntity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                CadEntity::Circle(circle) => {
                    let r = circle.radius.abs();
                    let c = circle.center;
                    bounds.include_point(Point2::new(c.x() - r, c.y() - r));
                    bounds.include_point(Point2::new(c.x() + r, c.y() + r));
                }
                CadEntity::Ellipse(ellipse) => ellipse_bounds(ellipse, &mut bounds),
                CadEntity::Polyline(polyline) => {
                    let vertices = &polyline.vertices;
                    for (index, vertex) in vertices.iter().enumerate() {
                        bounds.include_point(vertex.position);
                        let next = if index + 1 < vertices.len() {
                            Some(&vertices[index + 1])
                        } else if polyline.is_closed && vertices.len() > 1 {
                            Some(&vertices[0])
                        } else {
                            None
                        };
                        if let Some(next) = next {
                            bulge_arc_bounds(
                                vertex.position,
                                next.position,
                                vertex.bulge,
                                &mut bounds,
                            );
                        }
                    }
                }
                CadEntity::Spline(_) => {
                    for point in self.vertices() {
                        bounds.include_point(point);
                    }
                }
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 椭圆：主轴向量、短长轴比与参数范围（弧度）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Spline {
        pub is_closed: bool,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub layer: String,
    }

    /// DXF 模型空间的实体序列，保持文件中的出现顺序。
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct CadDrawing {
        entities: Vec<CadEntity>,
        insertion_units: Option<i16>,
    }

    impl CadDrawing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&mut self, entity: CadEntity) {
            self.entities.push(entity);
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &CadEntity> {
            self.entities.iter()
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        /// HEADER 中 `$INSUNITS` 的原始取值。
        #[inline]
        pub fn insertion_units(&self) -> Option<i16> {
            self.insertion_units
        }

        pub fn set_insertion_units(&mut self, code: i16) {
            self.insertion_units = Some(code);
        }
    }

    /// `$INSUNITS` 代码的可读名称。
    pub fn insertion_units_label(code: i16) -> &'static str {
        match code {
            0 => "unitless",
            1 => "inches",
            2 => "feet",
            4 => "millimeters",
            5 => "centimeters",
            6 => "meters",
            _ => "other",
        }
    }

    fn normalize_angle(angle: f64) -> f64 {
        let result = angle % TAU;
        if result < 0.0 { result + TAU } else { result }
    }

    fn arc_bounds(center: Point2, radius: f64, start: f64, end: f64, bounds: &mut Bounds2D) {
        let at = |angle: f64| {
            center.translate(Vector2::new(radius * angle.cos(), radius * angle.sin()))
        };
        let start = normalize_angle(start);
        let mut end = normalize_angle(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        bounds.include_point(at(start));
        bounds.include_point(at(end));

        // 扫过的象限点即为极值
        for base in [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0] {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(at(candidate));
            }
        }
    }

    fn ellipse_bounds(ellipse: &Ellipse, bounds: &mut Bounds2D) {
        let major = ellipse.major_axis.as_vec2();
        let major_length = major.length();
        if major_length <= f64::EPSILON {
            bounds.include_point(ellipse.center);
            return;
        }
        let minor = DVec2::new(-major.y, major.x) / major_length
            * (major_length * ellipse.ratio.abs());

        let start = ellipse.start_parameter;
        let mut end = ellipse.end_parameter;
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        }
        while end < start {
            end += TAU;
        }
        let span = end - start;
        let steps = ((span / (TAU / 64.0)).ceil() as usize).max(16);
        for i in 0..=steps {
            let t = start + span * (i as f64 / steps as f64);
            let offset = major * t.cos() + minor * t.sin();
            bounds.include_point(ellipse.center.translate(Vector2::from(offset)));
        }
    }

    fn bulge_arc_bounds(start: Point2, end: Point2, bulge: f64, bounds: &mut Bounds2D) {
        if bulge.abs() <= 1e-9 {
            return;
        }
        let (a, b) = (start.as_vec2(), end.as_vec2());
        let chord = b - a;
        let chord_len = chord.length();
        if chord_len <= f64::EPSILON {
            return;
        }
        let theta = 4.0 * bulge.atan();
        let sin_half = (theta / 2.0).sin();
        if sin_half.abs() <= 1e-9 {
            return;
        }
        let radius = (chord_len / (2.0 * sin_half)).abs();
        // 圆心位于弦中垂线上，距弦中点 (r² - (c/2)²) 的平方根，方向由 bulge 符号决定
        let half = chord_len / 2.0;
        let offset = (radius * radius - half * half).max(0.0).sqrt();
        let normal = DVec2::new(-chord.y, chord.x) / chord_len;
        let sign = if (bulge.abs() < 1.0) == (bulge > 0.0) { 1.0 } else { -1.0 };
        let center = (a + b) * 0.5 + normal * offset * sign;

        let start_angle = (a - center).y.atan2((a - center).x);
        let end_angle = (b - center).y.atan2((b - center).x);
        let center = Point2::from_vec(center);
        if bulge > 0.0 {
            arc_bounds(center, radius, start_angle, end_angle, bounds);
        } else {
            arc_bounds(center, radius, end_angle, start_angle, bounds);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn layer() -> String {
            "0".to_string()
        }

        #[test]
        fn circle_has_no_vertices_but_declares_diameter() {
            let circle = CadEntity::Circle(Circle {
                center: Point2::new(50.0, 50.0),
                radius: 5.0,
                layer: layer(),
            });
            assert!(circle.vertices().is_empty());
            assert_eq!(circle.declared_size(), Some(10.0));
            let bounds = circle.analytic_bounds().expect("circle bounds");
            assert_eq!(bounds.min(), Point2::new(45.0, 45.0));
            assert_eq!(bounds.max(), Point2::new(55.0, 55.0));
        }

        #[test]
        fn spline_falls_back_to_fit_points() {
            let spline = CadEntity::Spline(Spline {
                is_closed: false,
                control_points: Vec::new(),
                fit_points: vec![Point2::new(1.0, 2.0), Point2::new(3.0, 4.0)],
                layer: layer(),
            });
            assert_eq!(spline.vertices().len(), 2);
            assert_eq!(spline.type_tag(), "SPLINE");
        }

        #[test]
        fn semicircle_bulge_extends_bounds() {
            // bulge = 1 表示半圆，逆时针从 (0,0) 到 (10,0)，圆弧位于弦的下方
            let polyline = CadEntity::Polyline(Polyline {
                vertices: vec![
                    PolylineVertex {
                        position: Point2::new(0.0, 0.0),
                        bulge: 1.0,
                    },
                    PolylineVertex::new(Point2::new(10.0, 0.0)),
                ],
                is_closed: false,
                layer: layer(),
            });
            let bounds = polyline.analytic_bounds().expect("polyline bounds");
            assert!((bounds.min().y() + 5.0).abs() < 1e-9);
            assert!(bounds.max().y().abs() < 1e-9);
            assert!((bounds.width() - 10.0).abs() < 1e-9);
        }

        #[test]
        fn full_ellipse_bounds_follow_axes() {
            let ellipse = CadEntity::Ellipse(Ellipse {
                center: Point2::new(0.0, 0.0),
                major_axis: Vector2::new(6.0, 0.0),
                ratio: 0.5,
                start_parameter: 0.0,
                end_parameter: TAU,
                layer: layer(),
            });
            let bounds = ellipse.analytic_bounds().expect("ellipse bounds");
            assert!((bounds.width() - 12.0).abs() < 1e-6);
            assert!((bounds.height() - 6.0).abs() < 1e-6);
            assert_eq!(ellipse.declared_size(), Some(12.0));
        }
    }
}
