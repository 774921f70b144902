//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Page Probe - HTTP页面探测工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "page-probe",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "PAGE_PROBE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，未指定时使用配置文件中的 `log_level`
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "PAGE_PROBE_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 是否启用详细输出
    #[arg(short, long, help = "启用详细输出")]
    pub verbose: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 依次执行三种检查
    Run {
        /// 只探测该URL（不读取配置中的目标）
        #[arg(short, long, value_name = "URL", help = "只探测该URL")]
        url: Option<String>,

        /// 覆盖期望文本
        #[arg(short, long, value_name = "TEXT", help = "覆盖期望文本")]
        expect: Option<String>,

        /// 覆盖限时预算（毫秒）
        #[arg(short, long, value_name = "MS", help = "覆盖限时预算（毫秒）")]
        timeout_ms: Option<u64>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 页面加载检查
    Load {
        /// 页面URL
        #[arg(value_name = "URL", help = "页面URL")]
        url: String,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 内容匹配检查
    Content {
        /// 页面URL
        #[arg(value_name = "URL", help = "页面URL")]
        url: String,

        /// 期望文本（区分大小写）
        #[arg(value_name = "TEXT", help = "期望文本")]
        text: String,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 限时加载检查
    Timeout {
        /// 页面URL
        #[arg(value_name = "URL", help = "页面URL")]
        url: String,

        /// 限时预算（毫秒），未指定时使用配置中的 `default_timeout_ms`
        #[arg(short, long, value_name = "MS", help = "限时预算（毫秒）")]
        timeout_ms: Option<u64>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = "page-probe.toml"
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }

    /// 是否启用详细输出
    pub fn is_verbose(&self) -> bool {
        self.verbose || matches!(self.log_level, Some(LogLevel::Debug))
    }
}
