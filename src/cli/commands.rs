//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, TargetConfig, TomlConfigLoader, SAMPLE_CONFIG};
use crate::error::{ConfigError, Result};
use crate::logging::LoggingSystem;
use crate::probe::{HttpPageProbe, PageProbe, ProbeResult, ProbeSettings, DEFAULT_TIMEOUT_MS};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// 命令执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 命令完成，所有探测成功
    Success,
    /// 至少一次探测失败
    ProbeFailed,
}

impl Outcome {
    /// 根据探测结果汇总
    pub fn from_results(results: &[ProbeResult]) -> Self {
        if results.iter().all(|r| r.success) {
            Outcome::Success
        } else {
            Outcome::ProbeFailed
        }
    }

    /// 进程退出码
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::ProbeFailed => 1,
        }
    }
}

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<Outcome>;
}

/// 根据子命令选择处理器
pub fn command_for(args: &Args) -> Box<dyn Command> {
    match &args.command {
        Commands::Run { .. } => Box::new(RunCommand),
        Commands::Load { .. } | Commands::Content { .. } | Commands::Timeout { .. } => {
            Box::new(ProbeCommand)
        }
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    }
}

/// 加载配置
///
/// 显式指定的配置文件必须存在；使用默认路径且文件不存在时返回 `None`。
pub async fn load_optional_config(args: &Args) -> Result<Option<Config>> {
    let loader = TomlConfigLoader::new(true);
    match &args.config {
        Some(path) => Ok(Some(loader.load_from_file(path).await?)),
        None => {
            let path = args.get_config_path();
            if path.exists() {
                Ok(Some(loader.load_from_file(&path).await?))
            } else {
                debug!("未找到配置文件 {}，使用默认设置", path.display());
                Ok(None)
            }
        }
    }
}

fn build_probe(config: Option<&Config>) -> Result<HttpPageProbe> {
    let settings = config
        .map(|c| ProbeSettings::from(&c.global))
        .unwrap_or_default();
    HttpPageProbe::new(&settings)
}

/// 打印探测结果
fn print_results(results: &[ProbeResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            // 输出中不携带响应体，只保留长度
            let display: Vec<ProbeResult> = results
                .iter()
                .cloned()
                .map(|mut r| {
                    r.body = None;
                    r
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&display)?);
        }
        OutputFormat::Text => {
            for (index, result) in results.iter().enumerate() {
                println!("{}. {}", index + 1, describe_result(result));
            }
        }
    }
    Ok(())
}

/// 单条结果的文本描述
pub fn describe_result(result: &ProbeResult) -> String {
    let icon = if result.success { "✓" } else { "✗" };
    let mut line = format!("{} {}", icon, result.kind);

    if let Some(code) = result.status_code {
        line.push_str(&format!(" - 状态码: {code}"));
    }
    if let Some(length) = result.body_length {
        line.push_str(&format!(" - 内容长度: {length} 字符"));
    }
    if let (Some(text), Some(found)) = (&result.expected_text, result.content_found) {
        if found {
            line.push_str(&format!(" - 找到期望内容: \"{text}\""));
        } else {
            line.push_str(&format!(" - 未找到期望内容: \"{text}\""));
        }
    }
    if let Some(timeout_ms) = result.timeout_ms {
        if result.success {
            line.push_str(&format!(" - 在 {timeout_ms}ms 内完成"));
        } else if result.timed_out() {
            line.push_str(&format!(" - 超过 {timeout_ms}ms"));
        }
    }
    if let Some(error) = &result.error {
        line.push_str(&format!(" - 错误: {error}"));
    }
    line.push_str(&format!(" ({}ms)", result.elapsed_ms()));
    line
}

/// 依次执行三种检查的命令
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, args: &Args) -> Result<Outcome> {
        if let Commands::Run {
            url,
            expect,
            timeout_ms,
            format,
        } = &args.command
        {
            let config = load_optional_config(args).await?;
            let targets = Self::select_targets(
                config.as_ref(),
                url.as_deref(),
                expect.as_deref(),
                *timeout_ms,
            )?;
            let probe = build_probe(config.as_ref())?;
            let global = config.map(|c| c.global).unwrap_or_default();

            let mut all_results = Vec::new();
            for target in &targets {
                let timeout = target.effective_timeout(&global);
                if *format == OutputFormat::Text {
                    println!("=== {} ({}) ===", target.name, target.url);
                }

                let results = Self::run_target(&probe, target, timeout).await;
                if *format == OutputFormat::Text {
                    print_results(&results, *format)?;
                    println!();
                }
                all_results.extend(results);
            }

            if *format == OutputFormat::Json {
                print_results(&all_results, *format)?;
            }

            Ok(Outcome::from_results(&all_results))
        } else {
            Ok(Outcome::Success)
        }
    }
}

impl RunCommand {
    /// 确定要探测的目标
    ///
    /// `--url` 优先于配置中的目标；`--expect` 和 `--timeout-ms` 覆盖每个目标的设置。
    pub fn select_targets(
        config: Option<&Config>,
        url: Option<&str>,
        expect: Option<&str>,
        timeout_ms: Option<u64>,
    ) -> Result<Vec<TargetConfig>> {
        let mut targets = match (url, config) {
            (Some(url), _) => vec![TargetConfig::new(url, url)],
            (None, Some(config)) => config
                .targets
                .iter()
                .filter(|t| t.enabled)
                .cloned()
                .collect(),
            (None, None) => {
                return Err(ConfigError::ValidationError(
                    "未指定 --url 且没有可用的配置文件".to_string(),
                )
                .into())
            }
        };

        if targets.is_empty() {
            return Err(ConfigError::ValidationError("没有启用的探测目标".to_string()).into());
        }

        for target in &mut targets {
            if let Some(text) = expect {
                target.expected_text = text.to_string();
            }
            if timeout_ms.is_some() {
                target.timeout_ms = timeout_ms;
            }
        }

        Ok(targets)
    }

    /// 对单个目标依次执行三种检查
    pub async fn run_target<P: PageProbe + ?Sized>(
        probe: &P,
        target: &TargetConfig,
        timeout: Duration,
    ) -> Vec<ProbeResult> {
        info!("开始探测: {} ({})", target.name, target.url);

        let results = vec![
            probe.check_page_loads(&target.url).await,
            probe
                .check_specific_content(&target.url, &target.expected_text)
                .await,
            probe.check_page_with_timeout(&target.url, timeout).await,
        ];

        for result in &results {
            LoggingSystem::probe_log(result);
        }
        results
    }
}

/// 单项检查命令（load / content / timeout）
pub struct ProbeCommand;

#[async_trait]
impl Command for ProbeCommand {
    async fn execute(&self, args: &Args) -> Result<Outcome> {
        let config = load_optional_config(args).await?;
        let probe = build_probe(config.as_ref())?;

        let (result, format) = match &args.command {
            Commands::Load { url, format } => (probe.check_page_loads(url).await, *format),
            Commands::Content { url, text, format } => {
                (probe.check_specific_content(url, text).await, *format)
            }
            Commands::Timeout {
                url,
                timeout_ms,
                format,
            } => {
                let budget = Self::timeout_budget(*timeout_ms, config.as_ref());
                (probe.check_page_with_timeout(url, budget).await, *format)
            }
            _ => return Ok(Outcome::Success),
        };

        LoggingSystem::probe_log(&result);
        let results = [result];
        print_results(&results, format)?;
        Ok(Outcome::from_results(&results))
    }
}

impl ProbeCommand {
    /// 限时检查的预算：命令行优先，其次是配置中的默认预算
    pub fn timeout_budget(timeout_ms: Option<u64>, config: Option<&Config>) -> Duration {
        let fallback = config
            .map(|c| c.global.default_timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Duration::from_millis(timeout_ms.unwrap_or(fallback))
    }
}

/// 初始化配置命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<Outcome> {
        if let Commands::Init { config_path, force } = &args.command {
            Self::write_sample(config_path, *force).await?;
            println!("配置文件已生成: {}", config_path.display());
        }
        Ok(Outcome::Success)
    }
}

impl InitCommand {
    /// 写出示例配置
    pub async fn write_sample(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, SAMPLE_CONFIG).await?;
        Ok(())
    }
}

/// 验证配置命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<Outcome> {
        if let Commands::Validate { config_path } = &args.command {
            let path = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());
            let loader = TomlConfigLoader::new(true);
            let config = loader.load_from_file(&path).await?;

            println!("✓ 配置文件有效: {}", path.display());
            if args.is_verbose() {
                println!("默认限时预算: {}ms", config.global.default_timeout_ms);
                for target in &config.targets {
                    println!(
                        "  - {} ({}) {}",
                        target.name,
                        target.url,
                        if target.enabled { "启用" } else { "禁用" }
                    );
                }
            }
        }
        Ok(Outcome::Success)
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<Outcome> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(Outcome::Success)
    }
}
