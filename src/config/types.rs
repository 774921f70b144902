//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::probe::DEFAULT_TIMEOUT_MS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 主配置结构，包含全局配置和探测目标列表
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 探测目标列表
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 日志文件路径，未设置时输出到控制台
    pub log_file: Option<PathBuf>,
    /// 是否使用JSON格式日志
    #[serde(default)]
    pub log_json: bool,
    /// 限时加载的默认预算（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// User-Agent
    pub user_agent: Option<String>,
    /// 连接超时（毫秒）
    pub connect_timeout_ms: Option<u64>,
    /// 是否接受无效证书
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
            log_json: false,
            default_timeout_ms: default_timeout_ms(),
            user_agent: None,
            connect_timeout_ms: None,
            accept_invalid_certs: false,
        }
    }
}

/// 探测目标配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// 目标名称
    pub name: String,
    /// 页面URL
    pub url: String,
    /// 内容匹配使用的期望文本
    #[serde(default = "default_expected_text")]
    pub expected_text: String,
    /// 目标特定的限时预算（毫秒）
    pub timeout_ms: Option<u64>,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl TargetConfig {
    /// 以默认设置创建目标
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            expected_text: default_expected_text(),
            timeout_ms: None,
            enabled: true,
        }
    }

    /// 生效的限时预算，目标未指定时回落到全局配置
    pub fn effective_timeout(&self, global: &GlobalConfig) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(global.default_timeout_ms))
    }
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
pub(crate) fn default_expected_text() -> String {
    "\"fullStateName\"".to_string()
}
fn default_enabled() -> bool {
    true
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.global.default_timeout_ms == 0 {
        return Err("默认限时预算不能为0".to_string());
    }

    if config.global.connect_timeout_ms == Some(0) {
        return Err("连接超时不能为0".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    if config.targets.is_empty() {
        return Err("至少需要配置一个探测目标".to_string());
    }

    for target in &config.targets {
        if target.name.trim().is_empty() {
            return Err("目标名称不能为空".to_string());
        }

        if !target.url.starts_with("http://") && !target.url.starts_with("https://") {
            return Err(format!("目标 {} 的URL格式无效", target.name));
        }

        if target.expected_text.is_empty() {
            return Err(format!("目标 {} 的期望文本不能为空", target.name));
        }

        if target.timeout_ms == Some(0) {
            return Err(format!("目标 {} 的限时预算不能为0", target.name));
        }
    }

    Ok(())
}
