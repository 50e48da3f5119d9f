use std::path::Path;

use partscan_config::AppConfig;
use partscan_core::shape::{ShapeRecord, SourceKind};
use partscan_io::InkscapeConverter;
use tracing::info;

use crate::cad::DxfAdapter;
use crate::converted::ConvertedAdapter;
use crate::errors::EngineError;
use crate::vector::SvgAdapter;

/// 由扩展名（不区分大小写）决定的输入格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Dxf,
    Svg,
    Ai,
}

impl FormatKind {
    pub fn from_path(path: &Path) -> Result<Self, EngineError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "dxf" => Ok(FormatKind::Dxf),
            "svg" => Ok(FormatKind::Svg),
            "ai" => Ok(FormatKind::Ai),
            _ => Err(EngineError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    pub fn source_kind(self) -> SourceKind {
        match self {
            FormatKind::Dxf => SourceKind::Cad,
            FormatKind::Svg => SourceKind::Vector,
            FormatKind::Ai => SourceKind::ConvertedVector,
        }
    }
}

/// 单一格式的完整分析流程：解析、单位与变换归一、求包围盒，按需过滤。
pub trait FormatAdapter {
    fn kind(&self) -> SourceKind;

    fn analyze(&self, path: &Path) -> Result<Vec<ShapeRecord>, EngineError>;
}

pub fn adapter_for(kind: FormatKind, config: &AppConfig) -> Box<dyn FormatAdapter> {
    match kind {
        FormatKind::Dxf => Box::new(DxfAdapter::from_config(config)),
        FormatKind::Svg => Box::new(SvgAdapter::from_config(config)),
        FormatKind::Ai => {
            let converter = InkscapeConverter::new(
                config.converter.program.clone(),
                config.converter.timeout(),
            );
            Box::new(ConvertedAdapter::from_config(converter, config))
        }
    }
}

/// 分析单个文件，返回按出现顺序排列的形状记录。
pub fn analyze_file(path: &Path, config: &AppConfig) -> Result<Vec<ShapeRecord>, EngineError> {
    let kind = FormatKind::from_path(path)?;
    let adapter = adapter_for(kind, config);
    info!(path = %path.display(), format = adapter.kind().label(), "开始分析文件");
    let shapes = adapter.analyze(path)?;
    info!(count = shapes.len(), "分析完成");
    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(
            FormatKind::from_path(Path::new("part.DXF")).unwrap(),
            FormatKind::Dxf
        );
        assert_eq!(
            FormatKind::from_path(Path::new("/a/b/logo.Svg")).unwrap(),
            FormatKind::Svg
        );
        assert_eq!(
            FormatKind::from_path(Path::new("art.ai")).unwrap().source_kind(),
            SourceKind::ConvertedVector
        );
    }

    #[test]
    fn unknown_extension_fails_immediately() {
        for name in ["drawing.pdf", "noext", "archive.dxf.zip"] {
            let err = FormatKind::from_path(Path::new(name)).unwrap_err();
            assert!(matches!(err, EngineError::UnsupportedFormat { .. }), "{name}");
        }
    }

    #[test]
    fn analyze_rejects_unsupported_before_reading() {
        let err = analyze_file(Path::new("/nonexistent/file.png"), &AppConfig::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat { .. }));
    }
}
