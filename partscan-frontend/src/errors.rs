use std::path::PathBuf;

use partscan_engine::errors::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("分析 {path:?} 失败: {source}")]
    Analysis {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
    #[error("报价失败: {0}")]
    Quote(#[source] EngineError),
    #[error("序列化报表失败: {0}")]
    Serialize(#[from] serde_json::Error),
}
