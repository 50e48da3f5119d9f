use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use partscan_config::{AppConfig, ConfigError};
use partscan_frontend::report::ReportFormat;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "partscan", version, about = "从 DXF / SVG / AI 图纸中提取零件外形尺寸")]
struct Cli {
    /// 配置文件路径，缺省时依次查找 PARTSCAN_CONFIG 与 ./config/default.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 分析单个图纸文件并输出形状列表
    Analyze {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// 以缩进格式输出 JSON
        #[arg(long)]
        pretty: bool,
    },
    /// 按外形尺寸估算报价
    Price {
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
        #[arg(long, default_value_t = 1)]
        parts: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Table => ReportFormat::Table,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!(error = %err, "执行失败");
        eprintln!("错误: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let (config, fallback) = load_configuration(cli.config)?;
    init_logging(&config);
    if let Some(err) = fallback {
        warn!(error = %err, "加载默认配置失败，使用内建默认值");
    }
    info!("启动 partscan");

    let output = match cli.command {
        Command::Analyze {
            file,
            format,
            pretty,
        } => partscan_frontend::run_analysis(&file, &config, format.into(), pretty)
            .with_context(|| format!("无法分析 {}", file.display()))?,
        Command::Price {
            width,
            height,
            parts,
        } => partscan_frontend::run_quote(width, height, parts)?,
    };
    println!("{output}");
    Ok(())
}

/// 显式指定的配置必须可用；自动发现失败时回退到默认值，错误留待日志初始化后输出。
fn load_configuration(
    override_path: Option<PathBuf>,
) -> anyhow::Result<(AppConfig, Option<ConfigError>)> {
    match override_path {
        Some(path) => {
            let config = AppConfig::from_file(&path)
                .with_context(|| format!("加载配置 {} 失败", path.display()))?;
            Ok((config, None))
        }
        None => match AppConfig::discover() {
            Ok(config) => Ok((config, None)),
            Err(err) => Ok((AppConfig::default(), Some(err))),
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
