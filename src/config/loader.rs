//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// 示例配置，`init` 命令写出的内容
pub const SAMPLE_CONFIG: &str = r#"# Page Probe 配置文件

[global]
log_level = "info"
# log_file = "page-probe.log"
log_json = false
# 限时加载的默认预算（毫秒）
default_timeout_ms = 5000
# connect_timeout_ms = 3000
# user_agent = "page-probe/0.1.0"
accept_invalid_certs = false

[[targets]]
name = "示例页面"
url = "https://example.com"
expected_text = "Example Domain"
timeout_ms = 2000
enabled = true
"#;

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中 `${VAR_NAME}` 形式的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;

        Ok(config)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        log::info!("成功加载配置文件: {}", path.display());
        log::debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        log::debug!("成功解析配置字符串");

        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 当前目录存在 `page-probe.toml` 时使用它，否则使用
/// `<配置目录>/page-probe/config.toml`。
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from("page-probe.toml");
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("page-probe").join("config.toml"))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    const TEST_CONFIG_TOML: &str = r#"
[global]
log_level = "debug"
log_file = "/var/log/page-probe.log"
log_json = true
default_timeout_ms = 2500

[[targets]]
name = "Test Page"
url = "https://example.com/status"
expected_text = "ok"

[[targets]]
name = "Disabled"
url = "http://localhost:8080"
enabled = false
timeout_ms = 100
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[global]
user_agent = "${PAGE_PROBE_TEST_AGENT}"

[[targets]]
name = "Env Page"
url = "${PAGE_PROBE_TEST_URL}"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.global.log_level, "debug");
        assert_eq!(
            config.global.log_file,
            Some(PathBuf::from("/var/log/page-probe.log"))
        );
        assert!(config.global.log_json);
        assert_eq!(config.global.default_timeout_ms, 2500);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].name, "Test Page");
        assert_eq!(config.targets[0].expected_text, "ok");
        assert!(config.targets[0].enabled);
        // 未指定期望文本时使用默认值
        assert_eq!(config.targets[1].expected_text, "\"fullStateName\"");
        assert!(!config.targets[1].enabled);
        assert_eq!(config.targets[1].timeout_ms, Some(100));
    }

    #[tokio::test]
    async fn test_sample_config_is_valid() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(SAMPLE_CONFIG).await.unwrap();

        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].name, "示例页面");
        assert_eq!(config.targets[0].timeout_ms, Some(2000));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("PAGE_PROBE_TEST_AGENT", "probe-agent/9");
        env::set_var("PAGE_PROBE_TEST_URL", "https://env.example.com");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        assert_eq!(config.global.user_agent.as_deref(), Some("probe-agent/9"));
        assert_eq!(config.targets[0].url, "https://env.example.com");

        env::remove_var("PAGE_PROBE_TEST_AGENT");
        env::remove_var("PAGE_PROBE_TEST_URL");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        env::remove_var("PAGE_PROBE_MISSING_VAR");
        let content = r#"
[[targets]]
name = "Test"
url = "${PAGE_PROBE_MISSING_VAR}"
"#;

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(content).await;

        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("PAGE_PROBE_MISSING_VAR"));
        }
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG_TOML.as_bytes()).unwrap();

        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_file(file.path()).await.unwrap();
        assert_eq!(config.targets.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let loader = TomlConfigLoader::new(false);
        let result = loader.load_from_file("/nonexistent/page-probe.toml").await;

        assert!(matches!(
            result,
            Err(crate::error::PageProbeError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let loader = TomlConfigLoader::new(false);
        let result = loader.load_from_string("[[targets]\nname = ").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_env_vars_disabled() {
        let loader = TomlConfigLoader::new(false);
        let content = "test ${VAR} content";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, content);
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        assert!(path.to_string_lossy().ends_with(".toml"));
    }
}
