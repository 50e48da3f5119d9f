pub mod adapter;
pub mod cad;
pub mod converted;
pub mod quote;
pub mod thumbnail;
pub mod vector;

pub use adapter::{FormatAdapter, FormatKind, adapter_for, analyze_file};

pub mod errors {
    use std::path::PathBuf;

    use partscan_core::shape::GeometryError;
    use partscan_core::units::UnitError;
    use partscan_io::IoError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("不支持的文件格式 {extension:?}（{path:?}），仅支持 .dxf / .svg / .ai")]
        UnsupportedFormat { path: PathBuf, extension: String },
        #[error("缺少必需的尺寸元数据: {0}")]
        MissingMetadata(String),
        #[error("外部转换失败: {0}")]
        ExternalProcess(#[source] IoError),
        #[error("几何数据无效: {0}")]
        MalformedGeometry(#[from] GeometryError),
        #[error("读取输入失败: {0}")]
        Input(#[source] IoError),
        #[error("报价参数无效: {0}")]
        InvalidQuote(String),
    }

    impl From<IoError> for EngineError {
        fn from(err: IoError) -> Self {
            match err {
                IoError::MissingMetadata(message) => EngineError::MissingMetadata(message),
                IoError::ConverterSpawn { .. }
                | IoError::ConverterFailed { .. }
                | IoError::ConverterTimeout { .. }
                | IoError::ConverterOutputMissing { .. } => EngineError::ExternalProcess(err),
                IoError::ReadError { .. } | IoError::InvalidDocument(_) => EngineError::Input(err),
            }
        }
    }

    impl From<UnitError> for EngineError {
        fn from(err: UnitError) -> Self {
            EngineError::MissingMetadata(err.to_string())
        }
    }
}
