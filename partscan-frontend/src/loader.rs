use std::path::{Path, PathBuf};

use partscan_config::AppConfig;
use partscan_core::shape::ShapeRecord;
use partscan_engine::{FormatKind, analyze_file};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 一次分析的结果与来源信息。
#[derive(Debug)]
pub struct AnalysisReport {
    pub path: PathBuf,
    pub format: FormatKind,
    pub shapes: Vec<ShapeRecord>,
}

impl AnalysisReport {
    pub fn total_area(&self) -> f64 {
        self.shapes.iter().map(ShapeRecord::area).sum()
    }
}

/// 按扩展名选择格式并分析单个文件。
pub fn analyze_path(path: &Path, config: &AppConfig) -> Result<AnalysisReport, FrontendError> {
    let wrap = |source| FrontendError::Analysis {
        path: path.to_path_buf(),
        source,
    };
    let format = FormatKind::from_path(path).map_err(wrap)?;
    let shapes = analyze_file(path, config).map_err(wrap)?;
    if shapes.is_empty() {
        warn!(path = %path.display(), "文件中没有可输出的形状");
    } else {
        info!(path = %path.display(), count = shapes.len(), "已得到形状列表");
    }
    Ok(AnalysisReport {
        path: path.to_path_buf(),
        format,
        shapes,
    })
}
