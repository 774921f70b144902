//! Page Probe 主程序入口
//!
//! HTTP页面探测工具

use anyhow::{Context, Result};
use clap::Parser;
use page_probe::cli::{command_for, load_optional_config, Args};
use page_probe::logging::{LogConfig, LoggingSystem};
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 日志设置来自配置文件，加载失败时先用默认设置，由命令自行报告错误
    let loaded = load_optional_config(&args).await;
    let global = loaded
        .as_ref()
        .ok()
        .and_then(|config| config.as_ref())
        .map(|config| &config.global);

    // 初始化日志系统
    let log_config = LogConfig::resolve(args.log_level.clone().map(Into::into), global)
        .context("解析日志配置失败")?;
    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    debug!("Page Probe v{} 启动", page_probe::VERSION);
    if let Err(e) = &loaded {
        debug!("配置文件不可用，日志使用默认设置: {}", e);
    }

    // 执行命令
    match command_for(&args).execute(&args).await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            error!("命令执行失败: {}", e);
            std::process::exit(1);
        }
    }
}
