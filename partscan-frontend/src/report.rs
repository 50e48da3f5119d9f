//! 分析结果的输出格式。

use std::fmt::Write as _;

use partscan_core::shape::ShapeRecord;
use partscan_engine::quote::QuoteRequest;

use crate::errors::FrontendError;
use crate::loader::AnalysisReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Table,
}

pub fn render(
    report: &AnalysisReport,
    format: ReportFormat,
    pretty: bool,
) -> Result<String, FrontendError> {
    match format {
        ReportFormat::Json => render_json(&report.shapes, pretty),
        ReportFormat::Table => Ok(render_table(report)),
    }
}

/// 形状记录数组，键名与下游报表约定一致。
pub fn render_json(shapes: &[ShapeRecord], pretty: bool) -> Result<String, FrontendError> {
    let text = if pretty {
        serde_json::to_string_pretty(shapes)?
    } else {
        serde_json::to_string(shapes)?
    };
    Ok(text)
}

/// 便于终端阅读的摘要：文件信息、数量与每个形状的尺寸和单件估价。
pub fn render_table(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "文件: {}（{}）",
        report.path.display(),
        report.format.source_kind().label()
    );
    let _ = writeln!(out, "形状数量: {}", report.shapes.len());
    if report.shapes.is_empty() {
        return out;
    }

    let _ = writeln!(
        out,
        "{:>4}  {:<12} {:<10} {:>10} {:>10} {:>12} {:>10}",
        "#", "类型", "图层", "宽(mm)", "高(mm)", "面积(mm²)", "估价"
    );
    for (index, shape) in report.shapes.iter().enumerate() {
        let kind = shape
            .entity_kind()
            .unwrap_or_else(|| shape.source_kind().label());
        let price = QuoteRequest::new(shape.width(), shape.height(), 1)
            .map(|quote| format!("{:.2}", quote.price()))
            .unwrap_or_else(|_| "-".to_string());
        let _ = writeln!(
            out,
            "{:>4}  {:<12} {:<10} {:>10.2} {:>10.2} {:>12.2} {:>10}",
            index + 1,
            kind,
            shape.layer().unwrap_or("-"),
            shape.width(),
            shape.height(),
            shape.area(),
            price
        );
    }
    let _ = writeln!(out, "总面积: {:.2} mm²", report.total_area());
    out
}

pub fn render_quote(request: &QuoteRequest) -> String {
    format!(
        "尺寸 {:.2} × {:.2} mm，数量 {}，报价 {:.2}",
        request.width_mm,
        request.height_mm,
        request.parts,
        request.price()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use partscan_core::shape::{BoundingBox, SourceKind};
    use partscan_engine::FormatKind;

    fn sample() -> AnalysisReport {
        let frame = ShapeRecord::new(SourceKind::Cad, BoundingBox::new(0.0, 0.0, 100.0, 50.0))
            .unwrap()
            .with_entity_kind("LWPOLYLINE")
            .with_layer("CUT");
        let line = ShapeRecord::new(SourceKind::Cad, BoundingBox::new(150.0, 0.0, 150.0, 40.0))
            .unwrap()
            .with_entity_kind("LINE");
        AnalysisReport {
            path: PathBuf::from("part.dxf"),
            format: FormatKind::Dxf,
            shapes: vec![frame, line],
        }
    }

    #[test]
    fn json_uses_flat_record_keys() {
        let text = render(&sample(), ReportFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let first = &value[0];
        assert_eq!(first["type"], "DXF");
        assert_eq!(first["dxftype"], "LWPOLYLINE");
        assert_eq!(first["maxx"], 100.0);
        assert_eq!(first["area"], 5000.0);
        assert!(!text.contains('\n'));

        let pretty = render(&sample(), ReportFormat::Json, true).unwrap();
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn table_lists_counts_and_sizes() {
        let text = render_table(&sample());
        assert!(text.contains("形状数量: 2"), "{text}");
        assert!(text.contains("LWPOLYLINE"), "{text}");
        assert!(text.contains("100.00"), "{text}");
        assert!(text.contains("总面积: 5000.00"), "{text}");
        // 零宽度的线段没有估价
        let line_row = text.lines().find(|l| l.contains(" LINE ")).unwrap();
        assert!(line_row.trim_end().ends_with('-'), "{line_row}");
    }

    #[test]
    fn empty_table_stops_after_count() {
        let mut report = sample();
        report.shapes.clear();
        let text = render_table(&report);
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn quote_line_has_two_decimals() {
        let request = QuoteRequest::new(100.0, 100.0, 2).unwrap();
        let text = render_quote(&request);
        assert!(text.contains("数量 2"));
        assert!(text.contains(&format!("{:.2}", request.price())));
    }
}
