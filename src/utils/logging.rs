use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、会话日志文件和文本截断的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::report::AnalysisReport;

/// 初始化 tracing 日志
///
/// 默认 info 级别，可通过 RUST_LOG 覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 初始化会话日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n德语学习会话日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 德语学习分析助手");
    info!("📖 语法服务: {}", config.languagetool_base_url);
    info!("🤖 推理服务: {}", config.llm_api_base_url);
    info!("🌍 语言变体: {}", config.language_variant);
    info!("{}", "=".repeat(60));
}

/// 把报告以 JSON 行的形式追加到会话日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `report`: 要记录的分析报告
pub fn append_report(log_file_path: &str, report: &AnalysisReport) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let line = serde_json::to_string(report)?;
    writeln!(file, "{}", line)?;

    Ok(())
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_short_passthrough() {
        assert_eq!(truncate_text("Hallo", 10), "Hallo");
    }

    #[test]
    fn test_truncate_text_counts_chars_not_bytes() {
        // 变音符号按字符计数
        assert_eq!(truncate_text("Schüler üben", 7), "Schüler...");
    }
}
