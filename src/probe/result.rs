//! 探测结果数据结构
//!
//! 定义单次页面探测的结果类型和错误分类

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 探测失败的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// 截止时间先于响应到达
    Timeout,
    /// 传输层、DNS、协议或响应体解码失败
    NetworkError,
}

impl std::fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeErrorKind::Timeout => write!(f, "超时"),
            ProbeErrorKind::NetworkError => write!(f, "网络错误"),
        }
    }
}

/// 失败分类及其原始信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub kind: ProbeErrorKind,
    pub message: String,
}

impl ProbeFailure {
    /// 截止时间触发
    pub fn timeout() -> Self {
        Self {
            kind: ProbeErrorKind::Timeout,
            message: "timeout".to_string(),
        }
    }

    /// 网络错误；空信息会被替换为通用描述
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ProbeErrorKind::NetworkError,
            message: if message.trim().is_empty() {
                "Network error".to_string()
            } else {
                message
            },
        }
    }
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// 产生结果的探测操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// 页面加载检查
    PageLoad,
    /// 内容匹配检查
    ContentMatch,
    /// 带截止时间的加载检查
    Deadline,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::PageLoad => write!(f, "页面加载"),
            ProbeKind::ContentMatch => write!(f, "内容匹配"),
            ProbeKind::Deadline => write!(f, "限时加载"),
        }
    }
}

/// 单次探测的结果
///
/// 每次调用新建，按值返回，返回后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 探测的URL
    pub url: String,
    /// 探测操作
    pub kind: ProbeKind,
    /// 探测时间戳
    pub timestamp: DateTime<Utc>,
    /// 是否成功
    pub success: bool,
    /// HTTP状态码（收到响应时存在）
    pub status_code: Option<u16>,
    /// 响应体（读取成功时存在）
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub body: Option<String>,
    /// 响应体字符数，与 `body` 同时存在
    pub body_length: Option<usize>,
    /// 期望文本（仅内容匹配）
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expected_text: Option<String>,
    /// 是否找到期望文本（仅内容匹配）
    pub content_found: Option<bool>,
    /// 截止时间预算（仅限时加载）
    pub timeout_ms: Option<u64>,
    /// 耗时
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// 失败信息（仅失败路径）
    pub error: Option<ProbeFailure>,
}

impl ProbeResult {
    /// 创建新的探测结果
    pub fn new(url: impl Into<String>, kind: ProbeKind, success: bool) -> Self {
        Self {
            url: url.into(),
            kind,
            timestamp: Utc::now(),
            success,
            status_code: None,
            body: None,
            body_length: None,
            expected_text: None,
            content_found: None,
            timeout_ms: None,
            elapsed: Duration::from_millis(0),
            error: None,
        }
    }

    /// 创建失败结果
    pub fn failed(url: impl Into<String>, kind: ProbeKind, failure: ProbeFailure) -> Self {
        Self::new(url, kind, false).with_failure(failure)
    }

    /// 设置HTTP状态码
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// 设置响应体，同时记录字符数
    pub fn with_body(mut self, body: String) -> Self {
        self.body_length = Some(body.chars().count());
        self.body = Some(body);
        self
    }

    /// 设置内容匹配结果
    pub fn with_content_match(mut self, expected_text: impl Into<String>, found: bool) -> Self {
        self.expected_text = Some(expected_text.into());
        self.content_found = Some(found);
        self
    }

    /// 设置截止时间预算
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// 设置耗时
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// 设置失败信息
    pub fn with_failure(mut self, failure: ProbeFailure) -> Self {
        self.success = false;
        self.error = Some(failure);
        self
    }

    /// 失败分类
    pub fn error_kind(&self) -> Option<ProbeErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// 是否因截止时间失败
    pub fn timed_out(&self) -> bool {
        self.error_kind() == Some(ProbeErrorKind::Timeout)
    }

    /// 耗时（毫秒）
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }

    /// 比较两次结果，忽略 `timestamp` 和 `elapsed`
    pub fn same_outcome(&self, other: &Self) -> bool {
        self.url == other.url
            && self.kind == other.kind
            && self.success == other.success
            && self.status_code == other.status_code
            && self.body == other.body
            && self.body_length == other.body_length
            && self.expected_text == other.expected_text
            && self.content_found == other.content_found
            && self.timeout_ms == other.timeout_ms
            && self.error == other.error
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 从JSON字符串创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Duration序列化模块
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
