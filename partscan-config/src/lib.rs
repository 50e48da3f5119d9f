use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub cad: CadConfig,
    #[serde(default)]
    pub svg: SvgConfig,
    #[serde(default)]
    pub converted: ConvertedConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `PARTSCAN_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("PARTSCAN_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.converter.program.trim().is_empty() {
            return Err(ConfigError::Invalid("converter.program 不能为空".into()));
        }
        if self.converter.timeout_secs == 0 {
            return Err(ConfigError::Invalid("converter.timeout_secs 必须大于 0".into()));
        }
        let ratios = [
            ("preview.table_scale", self.preview.table_scale),
            ("preview.global_scale", self.preview.global_scale),
            ("preview.cad_scale", self.preview.cad_scale),
            ("preview.path_stroke_ratio", self.preview.path_stroke_ratio),
            ("preview.rect_stroke_ratio", self.preview.rect_stroke_ratio),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} 必须为正数（当前 {value}）")));
            }
        }
        if self.converted.dedupe_decimals > 12 {
            return Err(ConfigError::Invalid(format!(
                "converted.dedupe_decimals 过大（当前 {}，上限 12）",
                self.converted.dedupe_decimals
            )));
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// `.ai` 转换程序。
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "ConverterConfig::default_program")]
    pub program: String,
    #[serde(default = "ConverterConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ConverterConfig {
    fn default_program() -> String {
        "inkscape".to_string()
    }

    fn default_timeout_secs() -> u64 {
        120
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// 缩略图参数：缩放倍数与描边宽度占形状尺寸的比例。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub table_scale: f64,
    pub global_scale: f64,
    pub cad_scale: f64,
    pub path_stroke_ratio: f64,
    pub rect_stroke_ratio: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            table_scale: 3.0,
            global_scale: 1.0,
            cad_scale: 1.0,
            path_stroke_ratio: 0.0045,
            rect_stroke_ratio: 0.02,
        }
    }
}

/// 无顶点实体（圆、椭圆）的包围盒取法。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurveBoundsMode {
    /// 以声明尺寸为边长、最小角位于原点。
    #[default]
    DeclaredSize,
    /// 按实际几何计算。
    Analytic,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CadConfig {
    pub curve_bounds: CurveBoundsMode,
    pub include_paperspace: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SvgConfig {
    /// 为假时忽略 transform 属性，直接使用原始路径坐标。
    pub apply_transforms: bool,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            apply_transforms: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConvertedConfig {
    pub dedupe: bool,
    pub dedupe_decimals: u32,
    pub drop_leading_artboard: bool,
}

impl Default for ConvertedConfig {
    fn default() -> Self {
        Self {
            dedupe: true,
            dedupe_decimals: 2,
            drop_leading_artboard: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置无效: {0}")]
    Invalid(String),
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
