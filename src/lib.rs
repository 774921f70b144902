//! Page Probe - HTTP页面探测工具
//!
//! 这是一个用Rust编写的页面探测工具，支持：
//! - 页面加载检查
//! - 页面内容匹配
//! - 带截止时间的加载检查
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;

// 重新导出主要类型
pub use config::{Config, GlobalConfig, TargetConfig};
pub use error::PageProbeError;
pub use probe::{HttpPageProbe, PageProbe, ProbeErrorKind, ProbeResult};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
