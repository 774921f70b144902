//! 错误处理模块
//!
//! 定义探测边界之外的统一错误类型。探测操作本身从不返回错误，
//! 网络失败和超时都折叠进 [`crate::probe::ProbeResult`]。

use thiserror::Error;

/// Page Probe 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum PageProbeError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探测器构建相关错误
    #[error("探测器初始化错误: {0}")]
    ProbeSetup(#[from] ProbeSetupError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 配置文件已存在（init 时未指定 --force）
    #[error("配置文件已存在: {path}")]
    AlreadyExists { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 探测器构建错误类型
#[derive(Error, Debug)]
pub enum ProbeSetupError {
    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// 无效的 User-Agent
    #[error("无效的User-Agent: {0}")]
    InvalidUserAgent(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, PageProbeError>;
