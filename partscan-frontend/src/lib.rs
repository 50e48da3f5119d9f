pub mod errors;
pub mod loader;
pub mod report;

use std::path::Path;

use errors::FrontendError;
use partscan_config::AppConfig;
use partscan_engine::quote::QuoteRequest;
use report::ReportFormat;
use tracing::info;

/// 分析文件并按指定格式生成报表文本。
pub fn run_analysis(
    path: &Path,
    config: &AppConfig,
    format: ReportFormat,
    pretty: bool,
) -> Result<String, FrontendError> {
    let analysis = loader::analyze_path(path, config)?;
    info!(format = ?format, "生成报表");
    report::render(&analysis, format, pretty)
}

/// 计算报价并生成一行说明。
pub fn run_quote(width: f64, height: f64, parts: u32) -> Result<String, FrontendError> {
    let request = QuoteRequest::new(width, height, parts).map_err(FrontendError::Quote)?;
    info!(width, height, parts, price = request.price(), "报价完成");
    Ok(report::render_quote(&request))
}
