//! 命令交互层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，把用户命令映射到编排器操作并渲染报告。
//!
//! ## 命令一览
//!
//! - `init [档案名]` - 初始化分析编排器
//! - `check <文本>` - 快速语法检查
//! - `analyze <文本>` - 综合分析（按档案开关生成讲解/例句）
//! - `correct <文本>` - 纠错并按规则讲解
//! - `explain <主题>` - 讲解语法主题
//! - `session <主题...>` - 构建学习会话
//! - `status` - 显示后端状态
//! - `cleanup` - 释放后端资源
//!
//! ## 设计特点
//!
//! - **单一会话**：一个 App 持有至多一个编排器
//! - **部分初始化保留**：初始化失败时保留编排器，已就绪的后端仍可用
//! - **命令错误不中断**：交互循环里单条命令失败只打印错误

use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::loaders::load_custom_profiles;
use crate::models::profile::ProfileRegistry;
use crate::models::report::AnalysisReport;
use crate::orchestrator::{AnalysisOrchestrator, OrchestratorStatus};
use crate::utils::logging::{append_report, init_log_file, log_startup, truncate_text};

/// 学习会话默认的每主题时长（分钟）
const DEFAULT_MINUTES_PER_TOPIC: u32 = 15;

/// 应用主结构
pub struct App {
    config: Config,
    registry: ProfileRegistry,
    orchestrator: Option<AnalysisOrchestrator>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config);

        // 加载自定义档案
        let mut registry = ProfileRegistry::new();
        load_custom_profiles(&config.profile_file, &mut registry).await?;

        Ok(Self {
            config,
            registry,
            orchestrator: None,
        })
    }

    /// 运行应用主逻辑
    ///
    /// 带命令行参数时单次执行；否则进入交互循环
    pub async fn run(&mut self) -> Result<()> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if !args.is_empty() {
            return self.dispatch(&args).await;
        }

        print_help();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("deutsch> ");
            std::io::stdout().flush()?;

            let line = match lines.next_line().await? {
                Some(line) => line,
                None => break,
            };

            let args: Vec<String> = line
                .split_whitespace()
                .map(|s| s.to_string())
                .collect();
            if args.is_empty() {
                continue;
            }
            if matches!(args[0].as_str(), "quit" | "exit") {
                break;
            }

            // 单条命令失败不中断交互循环
            if let Err(e) = self.dispatch(&args).await {
                error!("❌ {}", e);
            }
        }

        // 退出前释放资源
        if let Some(orchestrator) = &mut self.orchestrator {
            orchestrator.cleanup();
        }
        info!("👋 再见!");
        Ok(())
    }

    /// 分发单条命令
    async fn dispatch(&mut self, args: &[String]) -> Result<()> {
        let command = args[0].to_ascii_lowercase();
        let rest = &args[1..];

        match command.as_str() {
            "init" => self.cmd_init(rest).await,
            "check" => self.cmd_check(rest).await,
            "analyze" => self.cmd_analyze(rest).await,
            "correct" => self.cmd_correct(rest).await,
            "explain" => self.cmd_explain(rest).await,
            "session" => self.cmd_session(rest).await,
            "status" => {
                self.cmd_status();
                Ok(())
            }
            "cleanup" => {
                self.cmd_cleanup();
                Ok(())
            }
            "help" => {
                print_help();
                Ok(())
            }
            _ => {
                warn!("未知命令: {} (输入 help 查看用法)", command);
                Ok(())
            }
        }
    }

    /// init [档案名]
    async fn cmd_init(&mut self, rest: &[String]) -> Result<()> {
        let profile_name = rest.first().map(String::as_str).unwrap_or("default");
        let profile = self.registry.resolve(profile_name)?;

        info!("🔄 正在初始化 (档案: {})...", profile.name);

        let mut orchestrator = AnalysisOrchestrator::new(&self.config, profile);
        let result = orchestrator.initialize().await;

        // 部分初始化也保留：已就绪的后端仍可用
        self.orchestrator = Some(orchestrator);
        result?;

        info!("✅ 就绪!");
        Ok(())
    }

    /// check <文本>
    async fn cmd_check(&mut self, rest: &[String]) -> Result<()> {
        let text = join_text(rest, "check <文本>")?;
        let report = self.orchestrator()?.quick_check(&text).await?;
        render_report(&report, self.config.verbose_logging);
        self.log_report(&report);
        Ok(())
    }

    /// analyze <文本>
    async fn cmd_analyze(&mut self, rest: &[String]) -> Result<()> {
        let text = join_text(rest, "analyze <文本>")?;
        let orchestrator = self.orchestrator()?;
        // 生成式步骤的开关来自档案
        let profile = orchestrator.profile().clone();
        let report = orchestrator
            .analyze_comprehensive(
                &text,
                profile.explanations_enabled,
                profile.provide_examples,
            )
            .await?;
        render_report(&report, self.config.verbose_logging);
        self.log_report(&report);
        Ok(())
    }

    /// correct <文本>
    async fn cmd_correct(&mut self, rest: &[String]) -> Result<()> {
        let text = join_text(rest, "correct <文本>")?;
        let report = self.orchestrator()?.correct(&text).await?;
        render_report(&report, self.config.verbose_logging);
        self.log_report(&report);
        Ok(())
    }

    /// explain <主题>
    async fn cmd_explain(&mut self, rest: &[String]) -> Result<()> {
        let topic = join_text(rest, "explain <主题>")?;
        let explanation = self.orchestrator()?.explain_topic(&topic, None).await?;
        info!("📚 {}:", topic);
        info!("{}", explanation);
        Ok(())
    }

    /// session <主题...>
    async fn cmd_session(&mut self, rest: &[String]) -> Result<()> {
        let topics: Vec<String> = rest
            .iter()
            .flat_map(|arg| arg.split(','))
            .map(|t| t.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if topics.is_empty() {
            anyhow::bail!("用法: session <主题1> <主题2> ...");
        }

        let duration = DEFAULT_MINUTES_PER_TOPIC * topics.len() as u32;
        let report = self
            .orchestrator()?
            .build_session(&topics, duration)
            .await?;
        render_session(&report);
        self.log_report(&report);
        Ok(())
    }

    /// status
    fn cmd_status(&self) {
        match &self.orchestrator {
            Some(orchestrator) => render_status(&orchestrator.status()),
            None => info!("❌ 尚未初始化，请先运行 init [档案名]"),
        }
    }

    /// cleanup
    fn cmd_cleanup(&mut self) {
        match &mut self.orchestrator {
            Some(orchestrator) => orchestrator.cleanup(),
            None => info!("💡 尚未初始化，无需清理"),
        }
    }

    /// 获取编排器引用
    fn orchestrator(&self) -> Result<&AnalysisOrchestrator> {
        self.orchestrator
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("尚未初始化，请先运行 init [档案名]"))
    }

    /// 把报告追加到会话日志文件（失败只告警）
    fn log_report(&self, report: &AnalysisReport) {
        if let Err(e) = append_report(&self.config.output_log_file, report) {
            warn!("⚠️ 会话日志写入失败: {}", e);
        }
    }
}

// ========== 辅助函数 ==========

/// 把命令参数拼成一段文本（去掉包裹的引号）
fn join_text(rest: &[String], usage: &str) -> Result<String> {
    if rest.is_empty() {
        anyhow::bail!("用法: {}", usage);
    }
    Ok(rest
        .join(" ")
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string())
}

/// 打印命令帮助
fn print_help() {
    info!("德语学习命令:");
    info!("  init [grammar-only|fast|default|comprehensive|beginner] - 初始化");
    info!("  check <文本>     - 快速语法检查");
    info!("  analyze <文本>   - 综合分析");
    info!("  correct <文本>   - 纠错并讲解");
    info!("  explain <主题>   - 讲解语法主题");
    info!("  session <主题...> - 构建学习会话");
    info!("  status           - 显示状态");
    info!("  cleanup          - 释放资源");
    info!("  quit             - 退出");
    info!("");
    info!("档案:");
    info!("  grammar-only - 只用 LanguageTool（最快，无 LLM）");
    info!("  fast         - 小模型 + LanguageTool");
    info!("  default      - 7B 模型 + LanguageTool");
    info!("  comprehensive - 13B 模型，例句 + 练习全开");
    info!("  beginner     - 7B 模型，初级难度");
}

// ========== 报告渲染 ==========

/// 渲染分析报告
fn render_report(report: &AnalysisReport, verbose: bool) {
    info!("📝 文本: {}", truncate_text(&report.original_text, 80));

    if !report.has_issues() {
        info!("✅ 未发现错误!");
    } else {
        info!("📊 发现 {} 个问题:", report.issue_count());
        for (i, issue) in report.issues.iter().enumerate() {
            info!(
                "  {}. [{}] {} ({}-{}): {}",
                i + 1,
                issue.severity.name(),
                issue.category_german,
                issue.start,
                issue.end,
                issue.message
            );
            if let Some(replacement) = &issue.replacement {
                info!("     建议: '{}' → '{}'", issue.error_text, replacement);
            }
            // 详细模式下显示全部候选建议
            if verbose && issue.suggestions.len() > 1 {
                info!("     其他建议: {}", issue.suggestions[1..].join(", "));
            }
        }
        if let Some(corrected) = &report.corrected_text {
            info!("✏️ 修正: {}", corrected);
        }
    }

    if let Some(quality) = &report.quality {
        info!("🏅 质量评价: {}", quality);
    }

    if let Some(explanation) = &report.explanation {
        info!("📖 讲解:");
        info!("{}", explanation);
    }

    for rule in &report.rule_explanations {
        info!("📚 规则 {} ({}):", rule.rule_id, rule.category_german);
        info!("{}", rule.explanation);
    }

    if !report.examples.is_empty() {
        info!("💬 例句:");
        for example in &report.examples {
            info!("  - {}", example);
        }
    }

    if !report.exercises.is_empty() {
        info!("✍️ 练习:");
        for exercise in &report.exercises {
            info!("  - {}", exercise);
        }
    }

    if !report.recommendations.is_empty() {
        info!("💡 学习建议:");
        for recommendation in &report.recommendations {
            info!("  - {}", recommendation);
        }
    }
}

/// 渲染学习会话报告
fn render_session(report: &AnalysisReport) {
    info!("{}", "=".repeat(60));
    info!(
        "📚 学习会话 ({} 个主题, 难度: {})",
        report.sections.len(),
        report.difficulty.german()
    );
    info!("{}", "=".repeat(60));

    for section in &report.sections {
        info!("\n📖 主题: {} ({} 分钟)", section.topic, section.minutes);
        match &section.error {
            Some(error) => warn!("⚠️ 生成失败: {}", error),
            None => {
                if let Some(explanation) = &section.explanation {
                    info!("{}", explanation);
                }
                if !section.examples.is_empty() {
                    info!("💬 例句:");
                    for example in &section.examples {
                        info!("  - {}", example);
                    }
                }
                for exercise in &section.exercises {
                    info!("✍️ 练习: {}", exercise);
                }
            }
        }
    }

    for exercise in &report.exercises {
        info!("\n🎯 综合练习: {}", exercise);
    }
}

/// 渲染状态信息
fn render_status(status: &OrchestratorStatus) {
    info!("{}", "─".repeat(60));
    info!("📊 当前状态 (档案: {})", status.profile_name);
    info!("  语法后端: {} (语言: {})", status.grammar_state, status.language_variant);
    if status.explanations_enabled {
        let model = if status.model_name.is_empty() {
            "未加载"
        } else {
            &status.model_name
        };
        info!("  讲解后端: {} (模型: {})", status.explanation_state, model);
    } else {
        info!("  讲解后端: 档案未启用");
    }
    info!("{}", "─".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_text_strips_quotes() {
        let rest = vec!["'Der".to_string(), "Lehrer".to_string(), "geben'".to_string()];
        assert_eq!(join_text(&rest, "check").unwrap(), "Der Lehrer geben");
    }

    #[test]
    fn test_join_text_rejects_empty() {
        assert!(join_text(&[], "check <文本>").is_err());
    }
}
