use std::convert::TryFrom;
use std::f64::consts::TAU;
use std::path::Path;

use partscan_core::{
    drawing::{CadDrawing, CadEntity, Circle, Ellipse, Line, Polyline, PolylineVertex, Spline},
    geometry::{Point2, Vector2},
};
use tracing::{debug, warn};

use crate::{DrawingLoader, IoError, read_text};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DxfOptions {
    /// 为真时图纸空间（组码 67 = 1）实体同样参与统计。
    pub include_paperspace: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DxfFacade {
    options: DxfOptions,
}

impl DxfFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DxfOptions) -> Self {
        Self { options }
    }

    pub fn parse_str(&self, source: &str) -> Result<CadDrawing, IoError> {
        DxfParser::new(source, self.options)
            .parse()
            .map_err(|err| IoError::InvalidDocument(err.message))
    }
}

impl DrawingLoader for DxfFacade {
    type Output = CadDrawing;

    fn load(&self, path: &Path) -> Result<CadDrawing, IoError> {
        let data = read_text(path)?;
        self.parse_str(&data)
    }
}

#[derive(Debug)]
struct DxfError {
    message: String,
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 各实体共有的组码：图层（8）与图纸空间标记（67）。
#[derive(Debug, Default)]
struct CommonFields {
    layer: Option<String>,
    paperspace: bool,
}

impl CommonFields {
    fn accept(&mut self, code: i32, value: &str) -> Result<bool, DxfError> {
        match code {
            8 => {
                self.layer = Some(value.trim().to_string());
                Ok(true)
            }
            67 => {
                self.paperspace = parse_i32(value, "图纸空间标记（组码 67）")? == 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn layer(&mut self) -> String {
        self.layer.take().unwrap_or_else(|| "0".to_string())
    }
}

struct ParsedEntity {
    entity: CadEntity,
    paperspace: bool,
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
    options: DxfOptions,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str, options: DxfOptions) -> Self {
        Self {
            reader: DxfReader::new(source),
            options,
        }
    }

    fn parse(mut self) -> Result<CadDrawing, DxfError> {
        let mut drawing = CadDrawing::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "HEADER" => self.parse_header(&mut drawing)?,
                        "ENTITIES" => self.parse_entities(&mut drawing)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(drawing)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_header(&mut self, drawing: &mut CadDrawing) -> Result<(), DxfError> {
        let mut in_insunits = false;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some((9, name)) => in_insunits = name.trim() == "$INSUNITS",
                Some((70, value)) if in_insunits => {
                    drawing.set_insertion_units(parse_i16(&value, "$INSUNITS（组码 70）")?);
                    in_insunits = false;
                }
                Some(_) => {}
                None => return Err(DxfError::invalid("HEADER 段提前结束")),
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, drawing: &mut CadDrawing) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            let kind = value.trim();
            let parsed = match kind {
                "ENDSEC" => break,
                "LINE" => self.parse_line()?,
                "CIRCLE" => self.parse_circle()?,
                "ELLIPSE" => self.parse_ellipse()?,
                "LWPOLYLINE" => self.parse_lwpolyline()?,
                "SPLINE" => self.parse_spline()?,
                other => {
                    debug!(entity = other, "跳过不参与统计的实体类型");
                    self.skip_entity_body()?;
                    continue;
                }
            };
            if parsed.paperspace && !self.options.include_paperspace {
                debug!(entity = kind, "跳过图纸空间实体");
                continue;
            }
            drawing.push(parsed.entity);
        }
        Ok(())
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    return Ok(());
                }
                Some(_) => {}
                None => return Err(DxfError::invalid("实体未正确结束")),
            }
        }
    }

    /// 读取当前实体的其余组码，直到下一个组码 0。共有组码先交给 `common`。
    fn entity_pairs(
        &mut self,
        kind: &str,
        common: &mut CommonFields,
    ) -> Result<Vec<(i32, String)>, DxfError> {
        let mut pairs = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    return Ok(pairs);
                }
                Some((code, value)) => {
                    if !common.accept(code, &value)? {
                        pairs.push((code, value));
                    }
                }
                None => return Err(DxfError::invalid(format!("{kind} 未正确结束"))),
            }
        }
    }

    fn parse_line(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonFields::default();
        let mut start_x = None;
        let mut start_y = None;
        let mut end_x = None;
        let mut end_y = None;
        for (code, value) in self.entity_pairs("LINE", &mut common)? {
            match code {
                10 => assign_coord(&mut start_x, &value, "LINE 起点 X（组码 10）")?,
                20 => assign_coord(&mut start_y, &value, "LINE 起点 Y（组码 20）")?,
                11 => assign_coord(&mut end_x, &value, "LINE 终点 X（组码 11）")?,
                21 => assign_coord(&mut end_y, &value, "LINE 终点 Y（组码 21）")?,
                _ => {}
            }
        }

        let sx = start_x.ok_or_else(|| DxfError::invalid("LINE 缺少起点 X（组码 10）"))?;
        let sy = start_y.ok_or_else(|| DxfError::invalid("LINE 缺少起点 Y（组码 20）"))?;
        let ex = end_x.ok_or_else(|| DxfError::invalid("LINE 缺少终点 X（组码 11）"))?;
        let ey = end_y.ok_or_else(|| DxfError::invalid("LINE 缺少终点 Y（组码 21）"))?;

        Ok(ParsedEntity {
            entity: CadEntity::Line(Line {
                start: Point2::new(sx, sy),
                end: Point2::new(ex, ey),
                layer: common.layer(),
            }),
            paperspace: common.paperspace,
        })
    }

    fn parse_circle(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonFields::default();
        let mut center_x = None;
        let mut center_y = None;
        let mut radius = None;
        for (code, value) in self.entity_pairs("CIRCLE", &mut common)? {
            match code {
                10 => assign_coord(&mut center_x, &value, "CIRCLE 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, &value, "CIRCLE 圆心 Y（组码 20）")?,
                40 => assign_coord(&mut radius, &value, "CIRCLE 半径（组码 40）")?,
                _ => {}
            }
        }

        let cx = center_x.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("CIRCLE 缺少圆心 Y（组码 20）"))?;
        let radius = radius.ok_or_else(|| DxfError::invalid("CIRCLE 缺少半径（组码 40）"))?;

        Ok(ParsedEntity {
            entity: CadEntity::Circle(Circle {
                center: Point2::new(cx, cy),
                radius,
                layer: common.layer(),
            }),
            paperspace: common.paperspace,
        })
    }

    fn parse_ellipse(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonFields::default();
        let mut center_x = None;
        let mut center_y = None;
        let mut major_x = None;
        let mut major_y = None;
        let mut ratio = None;
        let mut start_parameter = None;
        let mut end_parameter = None;
        for (code, value) in self.entity_pairs("ELLIPSE", &mut common)? {
            match code {
                10 => assign_coord(&mut center_x, &value, "ELLIPSE 中心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, &value, "ELLIPSE 中心 Y（组码 20）")?,
                11 => assign_coord(&mut major_x, &value, "ELLIPSE 主轴 X（组码 11）")?,
                21 => assign_coord(&mut major_y, &value, "ELLIPSE 主轴 Y（组码 21）")?,
                40 => assign_coord(&mut ratio, &value, "ELLIPSE 短长轴比（组码 40）")?,
                41 => assign_coord(&mut start_parameter, &value, "ELLIPSE 起始参数（组码 41）")?,
                42 => assign_coord(&mut end_parameter, &value, "ELLIPSE 终止参数（组码 42）")?,
                _ => {}
            }
        }

        let cx = center_x.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少中心 X（组码 10）"))?;
        let cy = center_y.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少中心 Y（组码 20）"))?;
        let mx = major_x.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少主轴 X（组码 11）"))?;
        let my = major_y.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少主轴 Y（组码 21）"))?;
        let ratio = ratio.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少短长轴比（组码 40）"))?;

        Ok(ParsedEntity {
            entity: CadEntity::Ellipse(Ellipse {
                center: Point2::new(cx, cy),
                major_axis: Vector2::new(mx, my),
                ratio,
                start_parameter: start_parameter.unwrap_or(0.0),
                end_parameter: end_parameter.unwrap_or(TAU),
                layer: common.layer(),
            }),
            paperspace: common.paperspace,
        })
    }

    fn parse_lwpolyline(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonFields::default();
        let mut is_closed = false;
        let mut vertices: Vec<PolylineVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        for (code, value) in self.entity_pairs("LWPOLYLINE", &mut common)? {
            match code {
                70 => {
                    let flag = parse_i32(&value, "LWPOLYLINE 标志")?;
                    is_closed = flag & 0x01 == 0x01;
                }
                10 => {
                    let x = parse_f64(&value, "LWPOLYLINE 顶点 X")?;
                    if pending_x.replace(x).is_some() {
                        return Err(DxfError::invalid(
                            "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                        ));
                    }
                }
                20 => {
                    let y = parse_f64(&value, "LWPOLYLINE 顶点 Y")?;
                    let x = pending_x.take().ok_or_else(|| {
                        DxfError::invalid("LWPOLYLINE 顶点缺少对应的 X（组码 10）")
                    })?;
                    vertices.push(PolylineVertex::new(Point2::new(x, y)));
                }
                42 => {
                    let bulge = parse_f64(&value, "LWPOLYLINE 顶点 bulge")?;
                    let vertex = vertices.last_mut().ok_or_else(|| {
                        DxfError::invalid("LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）")
                    })?;
                    vertex.bulge = bulge;
                }
                _ => {}
            }
        }

        if pending_x.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }
        if vertices.is_empty() {
            warn!("LWPOLYLINE 未解析到任何顶点");
        }

        Ok(ParsedEntity {
            entity: CadEntity::Polyline(Polyline {
                vertices,
                is_closed,
                layer: common.layer(),
            }),
            paperspace: common.paperspace,
        })
    }

    fn parse_spline(&mut self) -> Result<ParsedEntity, DxfError> {
        let mut common = CommonFields::default();
        let mut flags: i16 = 0;
        let mut control_points: Vec<Point2> = Vec::new();
        let mut fit_points: Vec<Point2> = Vec::new();
        let mut pending_control_x: Option<f64> = None;
        let mut pending_fit_x: Option<f64> = None;
        for (code, value) in self.entity_pairs("SPLINE", &mut common)? {
            match code {
                70 => flags = parse_i16(&value, "SPLINE 类型标志（组码 70）")?,
                10 => {
                    if pending_control_x
                        .replace(parse_f64(&value, "SPLINE 控制点 X（组码 10）")?)
                        .is_some()
                    {
                        return Err(DxfError::invalid(
                            "SPLINE 控制点 X（组码 10）在未提供 Y 之前重复出现",
                        ));
                    }
                }
                20 => {
                    let y = parse_f64(&value, "SPLINE 控制点 Y（组码 20）")?;
                    let x = pending_control_x.take().ok_or_else(|| {
                        DxfError::invalid("SPLINE 控制点 Y（组码 20）缺少对应的 X")
                    })?;
                    control_points.push(Point2::new(x, y));
                }
                11 => {
                    if pending_fit_x
                        .replace(parse_f64(&value, "SPLINE 拟合点 X（组码 11）")?)
                        .is_some()
                    {
                        return Err(DxfError::invalid(
                            "SPLINE 拟合点 X（组码 11）在未提供 Y 之前重复出现",
                        ));
                    }
                }
                21 => {
                    let y = parse_f64(&value, "SPLINE 拟合点 Y（组码 21）")?;
                    let x = pending_fit_x.take().ok_or_else(|| {
                        DxfError::invalid("SPLINE 拟合点 Y（组码 21）缺少对应的 X")
                    })?;
                    fit_points.push(Point2::new(x, y));
                }
                _ => {}
            }
        }

        if pending_control_x.is_some() || pending_fit_x.is_some() {
            return Err(DxfError::invalid("SPLINE 存在不完整的点坐标"));
        }

        Ok(ParsedEntity {
            entity: CadEntity::Spline(Spline {
                is_closed: flags & 0x01 == 0x01,
                control_points,
                fit_points,
                layer: common.layer(),
            }),
            paperspace: common.paperspace,
        })
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }
        loop {
            let Some(pair) = self.read_raw_pair()? else {
                return Ok(None);
            };
            // 999 为注释
            if pair.0 != 999 {
                return Ok(Some(pair));
            }
        }
    }

    fn read_raw_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只能回退一次");
        self.buffer = Some(pair);
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::invalid(format!("{context} 超出 i16 范围（值：{value}）")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dxf(body: &[(i32, &str)]) -> String {
        let mut out = String::new();
        for (code, value) in body {
            out.push_str(&format!("{code}\n{value}\n"));
        }
        out
    }

    #[test]
    fn reader_skips_comments_and_blank_lines() {
        let source = "999\nwritten by hand\n\n0\nEOF\n";
        let mut reader = DxfReader::new(source);
        let pair = reader.next_pair().unwrap();
        assert_eq!(pair, Some((0, "EOF".to_string())));
        assert_eq!(reader.next_pair().unwrap(), None);
    }

    #[test]
    fn paperspace_entities_are_skipped_by_default() {
        let source = dxf(&[
            (0, "SECTION"),
            (2, "ENTITIES"),
            (0, "CIRCLE"),
            (8, "0"),
            (67, "1"),
            (10, "0"),
            (20, "0"),
            (40, "3"),
            (0, "LINE"),
            (10, "0"),
            (20, "0"),
            (11, "5"),
            (21, "5"),
            (0, "ENDSEC"),
            (0, "EOF"),
        ]);
        let drawing = DxfFacade::new().parse_str(&source).unwrap();
        assert_eq!(drawing.len(), 1);
        assert_eq!(drawing.entities().next().unwrap().type_tag(), "LINE");

        let facade = DxfFacade::with_options(DxfOptions {
            include_paperspace: true,
        });
        assert_eq!(facade.parse_str(&source).unwrap().len(), 2);
    }

    #[test]
    fn header_insunits_is_recorded() {
        let source = dxf(&[
            (0, "SECTION"),
            (2, "HEADER"),
            (9, "$ACADVER"),
            (1, "AC1015"),
            (9, "$INSUNITS"),
            (70, "1"),
            (0, "ENDSEC"),
            (0, "EOF"),
        ]);
        let drawing = DxfFacade::new().parse_str(&source).unwrap();
        assert_eq!(drawing.insertion_units(), Some(1));
        assert!(drawing.is_empty());
    }

    #[test]
    fn unterminated_section_is_invalid() {
        let source = dxf(&[(0, "SECTION"), (2, "ENTITIES"), (0, "LINE"), (10, "0")]);
        let err = DxfFacade::new().parse_str(&source).unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(_)));
    }

    #[test]
    fn bad_group_code_is_invalid() {
        let err = DxfFacade::new().parse_str("abc\nSECTION\n").unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(message) if message.contains("abc")));
    }
}
