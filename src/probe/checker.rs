//! HTTP页面探测器实现
//!
//! 提供页面加载、内容匹配和限时加载三种检查，所有失败都折叠进结果

use crate::config::GlobalConfig;
use crate::error::{ProbeSetupError, Result};
use crate::probe::deadline::Deadline;
use crate::probe::result::{ProbeFailure, ProbeKind, ProbeResult};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 限时加载的默认预算（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// 页面探测器trait，定义三种检查
///
/// 所有方法都不会失败，调用方根据 `success` 和 `error` 分支。
#[async_trait]
pub trait PageProbe: Send + Sync {
    /// 检查页面是否加载成功
    ///
    /// 仅在 2xx 时读取响应体。
    async fn check_page_loads(&self, url: &str) -> ProbeResult;

    /// 检查页面是否包含期望文本
    ///
    /// 无论状态码如何都会读取响应体，匹配区分大小写。
    async fn check_specific_content(&self, url: &str, expected_text: &str) -> ProbeResult;

    /// 在截止时间内检查页面是否加载
    ///
    /// # 参数
    /// * `url` - 页面地址
    /// * `timeout` - 截止时间预算
    async fn check_page_with_timeout(&self, url: &str, timeout: Duration) -> ProbeResult;

    /// 使用默认预算的限时加载
    async fn check_page_with_default_timeout(&self, url: &str) -> ProbeResult {
        self.check_page_with_timeout(url, Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .await
    }
}

/// HTTP客户端设置
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeSettings {
    /// User-Agent，缺省时使用 `page-probe/<版本>`
    pub user_agent: Option<String>,
    /// 连接超时
    pub connect_timeout: Option<Duration>,
    /// 是否接受无效证书
    pub accept_invalid_certs: bool,
}

impl From<&GlobalConfig> for ProbeSettings {
    fn from(global: &GlobalConfig) -> Self {
        Self {
            user_agent: global.user_agent.clone(),
            connect_timeout: global.connect_timeout_ms.map(Duration::from_millis),
            accept_invalid_certs: global.accept_invalid_certs,
        }
    }
}

/// 基于 reqwest 的页面探测器
#[derive(Debug, Clone)]
pub struct HttpPageProbe {
    /// HTTP客户端
    client: Client,
}

impl HttpPageProbe {
    /// 根据设置创建探测器
    ///
    /// # 参数
    /// * `settings` - 客户端设置
    ///
    /// # 返回
    /// * `Result<Self>` - 探测器实例
    pub fn new(settings: &ProbeSettings) -> Result<Self> {
        let user_agent = settings
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("{}/{}", crate::APP_NAME, crate::VERSION));
        let user_agent = HeaderValue::from_str(&user_agent)
            .map_err(|_| ProbeSetupError::InvalidUserAgent(user_agent.clone()))?;

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .danger_accept_invalid_certs(settings.accept_invalid_certs);

        if let Some(connect_timeout) = settings.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder.build().map_err(ProbeSetupError::ClientBuild)?;

        Ok(Self::with_client(client))
    }

    /// 使用已配置的客户端创建探测器
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn network_failure(
        url: &str,
        kind: ProbeKind,
        failure: ProbeFailure,
        started: Instant,
    ) -> ProbeResult {
        error!("✗ {}出错: {} - {}", kind, url, failure.message);
        ProbeResult::failed(url, kind, failure).with_elapsed(started.elapsed())
    }
}

/// 读取完整响应体
async fn read_body(response: Response) -> std::result::Result<String, ProbeFailure> {
    response
        .text()
        .await
        .map_err(|e| ProbeFailure::network(describe_request_error(&e)))
}

/// 格式化请求错误信息：分类标签加完整的错误链
fn describe_request_error(error: &reqwest::Error) -> String {
    let detail = error_chain(error);
    let lowered = detail.to_lowercase();

    let label = if error.is_builder() {
        "Invalid request"
    } else if error.is_timeout() {
        "Request timeout"
    } else if error.is_connect() {
        if lowered.contains("dns") || lowered.contains("resolve") {
            "DNS resolution failed"
        } else if lowered.contains("refused") {
            "Connection refused"
        } else {
            "Connection failed"
        }
    } else if error.is_body() || error.is_decode() {
        "Response decode error"
    } else if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl")
    {
        "SSL/TLS certificate error"
    } else {
        "Request failed"
    };

    format!("{label}: {detail}")
}

fn error_chain(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = err.to_string();
    while let Some(src) = err.source() {
        s.push_str(": ");
        s.push_str(&src.to_string());
        err = src;
    }
    s
}

#[async_trait]
impl PageProbe for HttpPageProbe {
    async fn check_page_loads(&self, url: &str) -> ProbeResult {
        let started = Instant::now();
        let kind = ProbeKind::PageLoad;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return Self::network_failure(
                    url,
                    kind,
                    ProbeFailure::network(describe_request_error(&e)),
                    started,
                )
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("✗ 页面加载失败: {}, 状态码: {}", url, status.as_u16());
            return ProbeResult::new(url, kind, false)
                .with_status_code(status.as_u16())
                .with_elapsed(started.elapsed());
        }

        match read_body(response).await {
            Ok(body) => {
                let result = ProbeResult::new(url, kind, true)
                    .with_status_code(status.as_u16())
                    .with_body(body)
                    .with_elapsed(started.elapsed());
                info!(
                    "✓ 页面加载成功: {}, 状态码: {}, 内容长度: {} 字符",
                    url,
                    status.as_u16(),
                    result.body_length.unwrap_or_default()
                );
                result
            }
            Err(failure) => Self::network_failure(url, kind, failure, started)
                .with_status_code(status.as_u16()),
        }
    }

    async fn check_specific_content(&self, url: &str, expected_text: &str) -> ProbeResult {
        let started = Instant::now();
        let kind = ProbeKind::ContentMatch;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return Self::network_failure(
                    url,
                    kind,
                    ProbeFailure::network(describe_request_error(&e)),
                    started,
                )
            }
        };

        let status = response.status();
        let body = match read_body(response).await {
            Ok(body) => body,
            Err(failure) => {
                return Self::network_failure(url, kind, failure, started)
                    .with_status_code(status.as_u16())
            }
        };

        let found = body.contains(expected_text);
        if found {
            info!("✓ 找到期望内容: \"{}\" ({})", expected_text, url);
        } else {
            warn!("✗ 未找到期望内容: \"{}\" ({})", expected_text, url);
        }

        ProbeResult::new(url, kind, status.is_success())
            .with_status_code(status.as_u16())
            .with_content_match(expected_text, found)
            .with_elapsed(started.elapsed())
    }

    async fn check_page_with_timeout(&self, url: &str, timeout: Duration) -> ProbeResult {
        let started = Instant::now();
        let kind = ProbeKind::Deadline;

        let mut deadline = Deadline::arm(timeout);
        let outcome = tokio::select! {
            biased;
            response = self.client.get(url).send() => Some(response),
            _ = deadline.expired() => None,
        };
        deadline.clear();

        let response = match outcome {
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                return Self::network_failure(
                    url,
                    kind,
                    ProbeFailure::network(describe_request_error(&e)),
                    started,
                )
                .with_timeout(timeout)
            }
            None => {
                warn!("✗ 页面加载超过 {}ms: {}", timeout.as_millis(), url);
                return ProbeResult::failed(url, kind, ProbeFailure::timeout())
                    .with_timeout(timeout)
                    .with_elapsed(started.elapsed());
            }
        };

        let status = response.status();
        match read_body(response).await {
            Ok(body) => {
                info!("✓ 页面在 {}ms 内加载完成: {}", timeout.as_millis(), url);
                let result = ProbeResult::new(url, kind, true)
                    .with_status_code(status.as_u16())
                    .with_body(body)
                    .with_timeout(timeout)
                    .with_elapsed(started.elapsed());
                debug!("限时加载实际耗时: {}ms", result.elapsed_ms());
                result
            }
            Err(failure) => Self::network_failure(url, kind, failure, started)
                .with_status_code(status.as_u16())
                .with_timeout(timeout),
        }
    }
}
