use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub mod converter;
pub mod dxf;
pub mod svg;

pub use converter::{InkscapeConverter, VectorConverter};
pub use dxf::{DxfFacade, DxfOptions};
pub use svg::{SvgDocument, SvgElement, SvgFacade, SvgOptions};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
    #[error("缺少必需的尺寸元数据：{0}")]
    MissingMetadata(String),
    #[error("无法启动转换程序 {program}: {source}")]
    ConverterSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("转换程序 {program} 异常退出（{status}）：{stderr}")]
    ConverterFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("转换程序 {program} 超时（{timeout:?}），已终止")]
    ConverterTimeout { program: String, timeout: Duration },
    #[error("转换程序未生成有效输出 {path:?}")]
    ConverterOutputMissing { path: PathBuf },
}

/// 按格式读取文件并产出对应的内存模型。
pub trait DrawingLoader {
    type Output;

    fn load(&self, path: &Path) -> Result<Self::Output, IoError>;
}

pub(crate) fn read_text(path: &Path) -> Result<String, IoError> {
    let bytes = std::fs::read(path).map_err(|source| IoError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    // DXF 常见 ANSI 代码页，非 UTF-8 字节只影响图层名等文本
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}
