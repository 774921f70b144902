//! 日志系统模块
//!
//! 提供结构化日志配置和探测结果日志

use crate::config::GlobalConfig;
use crate::probe::ProbeResult;
use log::LevelFilter;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化失败时的错误信息
    init_error: Option<String>,
    /// 当前配置
    current_config: Option<LogConfig>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径，未设置时输出到控制台
    pub file_path: Option<PathBuf>,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// 由命令行级别和全局配置合成日志配置
    ///
    /// 命令行显式指定的级别优先，其次是配置文件中的 `log_level`。
    pub fn resolve(
        level_override: Option<LevelFilter>,
        global: Option<&GlobalConfig>,
    ) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(global) = global {
            config.level = global
                .log_level
                .parse()
                .map_err(|_| anyhow::anyhow!("无效的日志级别: {}", global.log_level))?;
            config.file_path = global.log_file.clone();
            config.json_format = global.log_json;
        }

        if let Some(level) = level_override {
            config.level = level;
        }

        Ok(config)
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 重复调用不会重复安装 subscriber。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        Self::setup_logging_with_options(config, false)
    }

    /// 初始化日志系统（带选项）
    ///
    /// # 参数
    /// * `config` - 日志配置
    /// * `force_reinit` - 是否强制重新初始化（主要用于测试）
    pub fn setup_logging_with_options(
        config: LogConfig,
        force_reinit: bool,
    ) -> anyhow::Result<Self> {
        let state_mutex =
            GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));

        {
            let state = Self::lock_state(state_mutex);
            if state.initialized && !force_reinit {
                return match &state.init_error {
                    None => Ok(Self { config }),
                    Some(e) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
                };
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = Self::lock_state(state_mutex);
            state.initialized = true;
            state.current_config = Some(config.clone());
            state.init_error = init_result.as_ref().err().map(|e| e.to_string());
        }

        init_result?;
        Ok(Self { config })
    }

    fn lock_state(
        state_mutex: &Mutex<GlobalLoggingState>,
    ) -> std::sync::MutexGuard<'_, GlobalLoggingState> {
        state_mutex
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)?;
        Ok(())
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        // 文件输出，不做轮转
        let file = match &config.file_path {
            Some(path) => Some(
                std::fs::File::create(path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?,
            ),
            None => None,
        };

        let fmt_layer = match (file, config.json_format) {
            (Some(file), true) => fmt::layer()
                .json()
                .with_writer(file)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            (Some(file), false) => fmt::layer()
                .with_writer(file)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            (None, true) => fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            (None, false) => fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_target(false)
                .boxed(),
        };

        let result = registry().with(env_filter).with(fmt_layer).try_init();

        match result {
            Ok(()) => {
                tracing::debug!("日志系统初始化完成: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains(
                    "attempted to set a logger after the logging system was already initialized",
                ) || error_msg.contains("a global default trace dispatcher has already been set")
                {
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "tracing subscriber初始化失败: {}",
                        error_msg
                    ))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        GLOBAL_LOGGING_STATE
            .get()
            .map(|state_mutex| Self::lock_state(state_mutex).initialized)
            .unwrap_or(false)
    }

    /// 获取当前日志配置（如果已初始化）
    pub fn current_config() -> Option<LogConfig> {
        GLOBAL_LOGGING_STATE
            .get()
            .and_then(|state_mutex| Self::lock_state(state_mutex).current_config.clone())
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state_mutex) = GLOBAL_LOGGING_STATE.get() {
            let mut state = Self::lock_state(state_mutex);
            state.initialized = false;
            state.init_error = None;
            state.current_config = None;
        }
    }

    /// 构造一条探测结果日志
    pub fn probe_entry(result: &ProbeResult) -> serde_json::Value {
        json!({
            "timestamp": result.timestamp.to_rfc3339(),
            "type": "probe",
            "kind": result.kind,
            "url": result.url,
            "success": result.success,
            "status_code": result.status_code,
            "body_length": result.body_length,
            "content_found": result.content_found,
            "timeout_ms": result.timeout_ms,
            "elapsed_ms": result.elapsed_ms(),
            "error": result.error,
        })
    }

    /// 记录探测结果日志
    ///
    /// 格式跟随当前生效的日志配置。
    pub fn probe_log(result: &ProbeResult) {
        let json_format = Self::current_config()
            .map(|config| config.json_format)
            .unwrap_or(false);

        if json_format {
            tracing::debug!("{}", Self::probe_entry(result));
        } else {
            tracing::debug!(
                "PROBE: {} {} - {} ({}ms) {}",
                result.kind,
                result.url,
                if result.success { "SUCCESS" } else { "FAILED" },
                result.elapsed_ms(),
                result
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_default()
            );
        }
    }

    /// 本实例的日志配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeFailure, ProbeKind};
    use serial_test::serial;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    /// 创建测试用的日志配置
    fn create_test_config() -> LogConfig {
        LogConfig {
            level: LevelFilter::Info,
            file_path: None,
            json_format: false,
        }
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();

        let first = LoggingSystem::setup_logging(config.clone());
        assert!(first.is_ok());
        assert!(LoggingSystem::is_initialized());

        // 第二次初始化直接复用之前的结果
        let second = LoggingSystem::setup_logging(config);
        assert!(second.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_force_reinit() {
        LoggingSystem::reset_for_testing();

        let config = create_test_config();
        let _first = LoggingSystem::setup_logging(config.clone()).unwrap();

        let second = LoggingSystem::setup_logging_with_options(config, true);
        assert!(second.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_file_output() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let mut config = create_test_config();
        config.file_path = Some(temp_file.path().to_path_buf());

        assert!(LoggingSystem::setup_logging(config).is_ok());
    }

    #[test]
    #[serial]
    fn test_current_config_retrieval() {
        LoggingSystem::reset_for_testing();

        let mut config = create_test_config();
        config.json_format = true;
        let _system = LoggingSystem::setup_logging(config.clone()).unwrap();

        let retrieved = LoggingSystem::current_config().unwrap();
        assert_eq!(retrieved.level, config.level);
        assert!(retrieved.json_format);
    }

    #[test]
    fn test_resolve_uses_global_config() {
        let global = GlobalConfig {
            log_level: "error".to_string(),
            log_file: Some(PathBuf::from("/tmp/page-probe.log")),
            log_json: true,
            ..Default::default()
        };

        let config = LogConfig::resolve(None, Some(&global)).unwrap();
        assert_eq!(config.level, LevelFilter::Error);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/page-probe.log")));
        assert!(config.json_format);
    }

    #[test]
    fn test_resolve_command_line_level_wins() {
        let global = GlobalConfig {
            log_level: "error".to_string(),
            ..Default::default()
        };

        let config = LogConfig::resolve(Some(LevelFilter::Debug), Some(&global)).unwrap();
        assert_eq!(config.level, LevelFilter::Debug);

        let config = LogConfig::resolve(Some(LevelFilter::Warn), None).unwrap();
        assert_eq!(config.level, LevelFilter::Warn);
        assert!(config.file_path.is_none());
        assert!(!config.json_format);
    }

    #[test]
    fn test_resolve_rejects_unknown_level() {
        let global = GlobalConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(LogConfig::resolve(None, Some(&global)).is_err());
    }

    #[test]
    #[serial]
    fn test_json_file_output_is_written() {
        LoggingSystem::reset_for_testing();

        let temp_file = NamedTempFile::new().unwrap();
        let config = LogConfig {
            level: LevelFilter::Debug,
            file_path: Some(temp_file.path().to_path_buf()),
            json_format: true,
        };

        assert!(LoggingSystem::setup_logging(config).is_ok());
        assert!(LoggingSystem::current_config().unwrap().json_format);
    }

    #[test]
    fn test_probe_entry_fields() {
        let result = ProbeResult::failed(
            "https://slow.example.com",
            ProbeKind::Deadline,
            ProbeFailure::timeout(),
        )
        .with_timeout(Duration::from_millis(100))
        .with_elapsed(Duration::from_millis(101));

        let entry = LoggingSystem::probe_entry(&result);
        assert_eq!(entry["type"], "probe");
        assert_eq!(entry["kind"], "deadline");
        assert_eq!(entry["success"], false);
        assert_eq!(entry["timeout_ms"], 100);
        assert_eq!(entry["elapsed_ms"], 101);
        assert_eq!(entry["error"]["kind"], "timeout");
        assert!(entry.get("body").is_none());
    }
}
