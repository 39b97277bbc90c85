//! 分析编排器 - 编排层
//!
//! ## 职责
//!
//! 本模块是分析功能的核心，负责后端生命周期和结果合并。
//!
//! ## 核心功能
//!
//! 1. **惰性初始化**：语法后端总是初始化；讲解后端只在档案启用时加载
//! 2. **状态把关**：未就绪的后端拒绝请求（BackendNotReady / FeatureUnavailable）
//! 3. **结果合并**：把规则检查结果和生成式输出合并为统一报告
//! 4. **资源管理**：独占持有两个后端，清理幂等且容忍部分初始化
//!
//! ## 设计特点
//!
//! - **先快后慢**：先初始化语法后端（秒级），再加载模型（分钟级），
//!   模型加载失败不影响已就绪的语法后端
//! - **原子操作**：analyze_comprehensive 和 correct 要么全部成功要么整体失败；
//!   只有学习会话按主题记录部分失败

use futures::future::join_all;
use tracing::{info, warn};

use crate::backends::{grammar, BackendState, ExplanationBackend, GrammarCheckBackend};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::profile::{ConfigurationProfile, Difficulty};
use crate::models::report::{AnalysisReport, GrammarIssue, RuleExplanation};
use crate::orchestrator::session_builder::SessionBuilder;
use std::time::Duration;

/// 综合分析时为关键错误生成讲解的数量上限
const MAX_ERROR_EXPLANATIONS: usize = 3;

/// 综合分析时生成例句/练习的类别数量上限
const MAX_GENERATIVE_CATEGORIES: usize = 2;

/// 编排器状态快照（status 命令展示用）
#[derive(Debug, Clone)]
pub struct OrchestratorStatus {
    /// 当前档案名
    pub profile_name: String,
    /// 语法后端状态
    pub grammar_state: BackendState,
    /// 讲解后端状态
    pub explanation_state: BackendState,
    /// 语言变体
    pub language_variant: String,
    /// 模型标识（讲解后端未加载时为空）
    pub model_name: String,
    /// 档案是否启用讲解功能
    pub explanations_enabled: bool,
}

/// 分析编排器
///
/// 一个编排器服务一个交互会话，独占持有两个后端句柄
pub struct AnalysisOrchestrator {
    config: Config,
    profile: ConfigurationProfile,
    grammar: GrammarCheckBackend,
    explanation: ExplanationBackend,
}

impl AnalysisOrchestrator {
    /// 创建新的编排器（不发起任何网络请求）
    pub fn new(config: &Config, profile: ConfigurationProfile) -> Self {
        let grammar = GrammarCheckBackend::new(
            &config.languagetool_base_url,
            Duration::from_secs(config.request_timeout_secs),
        );
        let explanation = ExplanationBackend::new(config, &profile);

        Self {
            config: config.clone(),
            profile,
            grammar,
            explanation,
        }
    }

    /// 当前档案
    pub fn profile(&self) -> &ConfigurationProfile {
        &self.profile
    }

    /// 初始化档案要求的后端
    ///
    /// 语法后端总是初始化；讲解后端只在档案启用讲解时加载。
    /// 遇到第一个初始化错误立即返回，已就绪的后端保持可用。
    /// 清理后允许重新初始化。
    pub async fn initialize(&mut self) -> Result<()> {
        info!("🔄 正在初始化分析编排器 (档案: {})...", self.profile.name);

        // 语法后端优先：速度快，失败时也不用白等模型加载
        self.grammar
            .initialize(&self.config.language_variant)
            .await?;

        if self.profile.explanations_enabled {
            self.explanation.initialize(self.profile.model_size).await?;
        } else {
            info!("💡 档案 {} 未启用讲解功能，跳过模型加载", self.profile.name);
        }

        info!("✓ 分析编排器就绪");
        Ok(())
    }

    /// 快速语法检查
    ///
    /// 只调用语法后端，不做任何生成式调用
    pub async fn quick_check(&self, text: &str) -> Result<AnalysisReport> {
        let issues = self.grammar.check(text).await?;

        let mut report = AnalysisReport::new(text, self.profile.difficulty);
        report.corrected_text = Some(grammar::apply_suggestions(text, &issues));
        report.recommendations = learning_recommendations(&issues);
        report.quality = Some(assess_quality(issues.len()).to_string());
        report.issues = issues;

        Ok(report)
    }

    /// 综合分析
    ///
    /// 总是执行语法检查；请求了生成式步骤但讲解后端未就绪时，
    /// 整个操作失败（不返回部分报告），调用方不会被误导
    pub async fn analyze_comprehensive(
        &self,
        text: &str,
        generate_explanations: bool,
        generate_examples: bool,
    ) -> Result<AnalysisReport> {
        // 先验可用性，避免产出半份报告
        if generate_explanations || generate_examples || self.profile.generate_exercises {
            self.require_explanation_ready("综合分析的生成式步骤")?;
        }

        let mut report = self.quick_check(text).await?;

        // 没有错误就没有可讲解的内容，生成式步骤自然为空
        if !report.has_issues() {
            return Ok(report);
        }

        let categories: Vec<String> = report
            .main_categories(MAX_GENERATIVE_CATEGORIES)
            .iter()
            .map(|c| grammar::category_german(c).to_string())
            .collect();

        if generate_explanations {
            let overview = self.explanation.analyze_text(text, &categories).await?;
            report.explanation = Some(overview);

            report.rule_explanations = self
                .explain_critical_issues(&report.issues, MAX_ERROR_EXPLANATIONS)
                .await?;
        }

        if generate_examples {
            let mut examples = Vec::new();
            for category in &categories {
                examples.extend(
                    self.explanation
                        .generate_examples(category, 2, self.profile.difficulty)
                        .await?,
                );
            }
            report.examples = examples;
        }

        if self.profile.generate_exercises {
            let mut exercises = Vec::new();
            for category in &categories {
                exercises.extend(
                    self.explanation
                        .generate_exercises(category, self.profile.difficulty)
                        .await?,
                );
            }
            report.exercises = exercises;
        }

        Ok(report)
    }

    /// 纠错
    ///
    /// 应用每个问题的首选建议生成修正文本；讲解后端就绪时，
    /// 按规则去重生成讲解（每条规则一次，不按出现次数重复）。
    /// 对已经正确的文本是幂等的：原样返回且不生成任何讲解。
    pub async fn correct(&self, text: &str) -> Result<AnalysisReport> {
        let issues = self.grammar.check(text).await?;

        let mut report = AnalysisReport::new(text, self.profile.difficulty);
        report.corrected_text = Some(grammar::apply_suggestions(text, &issues));
        report.recommendations = learning_recommendations(&issues);
        report.quality = Some(assess_quality(issues.len()).to_string());
        report.issues = issues;

        if report.has_issues() && self.explanation.state().is_ready() {
            let rule_count = report.distinct_rule_ids().len();
            report.rule_explanations = self
                .explain_critical_issues(&report.issues, rule_count)
                .await?;
        }

        Ok(report)
    }

    /// 为问题列表生成按规则去重的讲解
    ///
    /// 规则按首次出现顺序取前 `limit` 条，讲解并发生成
    async fn explain_critical_issues(
        &self,
        issues: &[GrammarIssue],
        limit: usize,
    ) -> Result<Vec<RuleExplanation>> {
        let mut selected: Vec<&GrammarIssue> = Vec::new();
        for issue in issues {
            if selected.iter().any(|i| i.rule_id == issue.rule_id) {
                continue;
            }
            selected.push(issue);
            if selected.len() == limit {
                break;
            }
        }

        let futures = selected.iter().copied().map(|issue| async move {
            let context = format!(
                "Fehler: '{}' sollte '{}' sein.",
                issue.error_text,
                issue.replacement.as_deref().unwrap_or("–")
            );
            let explanation = self
                .explanation
                .generate_explanation(
                    &issue.category_german,
                    self.profile.difficulty,
                    Some(&context),
                )
                .await?;

            Ok(RuleExplanation {
                rule_id: issue.rule_id.clone(),
                category_german: issue.category_german.clone(),
                explanation,
            })
        });

        join_all(futures).await.into_iter().collect()
    }

    /// 讲解语法主题
    pub async fn explain_topic(
        &self,
        topic: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<String> {
        self.require_explanation_ready("语法主题讲解")?;

        let difficulty = difficulty.unwrap_or(self.profile.difficulty);
        self.explanation
            .generate_explanation(topic, difficulty, None)
            .await
    }

    /// 构建学习会话
    ///
    /// 每个主题生成讲解 + 例句 + 练习；单个主题失败只记录在对应小节。
    /// 学习时长在主题间平均分配。
    pub async fn build_session(
        &self,
        topics: &[String],
        duration_minutes: u32,
    ) -> Result<AnalysisReport> {
        self.require_explanation_ready("学习会话")?;

        let builder = SessionBuilder::new(&self.explanation, self.profile.difficulty);
        Ok(builder.build(topics, duration_minutes).await)
    }

    /// 状态快照
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            profile_name: self.profile.name.clone(),
            grammar_state: self.grammar.state(),
            explanation_state: self.explanation.state(),
            language_variant: self.config.language_variant.clone(),
            model_name: self.explanation.model_name().to_string(),
            explanations_enabled: self.profile.explanations_enabled,
        }
    }

    /// 释放两个后端的资源
    ///
    /// 幂等；部分初始化失败后调用也安全（释放已获取的，忽略未获取的）。
    /// 清理后的编排器可以重新初始化。
    pub fn cleanup(&mut self) {
        self.grammar.cleanup();
        self.explanation.cleanup();
        info!("✓ 分析编排器已清理");
    }

    /// 检查讲解后端是否就绪，未就绪时给出档案建议
    fn require_explanation_ready(&self, feature: &str) -> Result<()> {
        if self.explanation.state().is_ready() {
            return Ok(());
        }

        let hint = format!(
            "请使用启用讲解的档案重新初始化: {}",
            ConfigurationProfile::explanation_profile_names().join(" / ")
        );
        warn!("⚠️ 功能不可用: {} ({})", feature, hint);
        Err(AppError::feature_unavailable(feature, hint))
    }
}

// ========== 学习反馈辅助函数 ==========

/// 根据问题数量评估文本整体质量（德语）
pub fn assess_quality(issue_count: usize) -> &'static str {
    match issue_count {
        0 => "Exzellent",
        1..=2 => "Gut",
        3..=5 => "Befriedigend",
        _ => "Verbesserungsbedürftig",
    }
}

/// 根据问题数量和类别生成学习建议（德语）
pub fn learning_recommendations(issues: &[GrammarIssue]) -> Vec<String> {
    let mut recommendations = Vec::new();

    match issues.len() {
        0 => {
            recommendations.push("Ausgezeichnet! Ihr Text ist grammatikalisch korrekt.".to_string());
            recommendations.push("Versuchen Sie komplexere Satzstrukturen zu verwenden.".to_string());
        }
        1..=2 => {
            recommendations.push("Gute Arbeit! Nur wenige kleine Fehler.".to_string());
            recommendations.push("Achten Sie auf die Details bei der Kasuskongruenz.".to_string());
        }
        _ => {
            recommendations.push("Konzentrieren Sie sich auf die Grundgrammatik.".to_string());
            recommendations.push("Üben Sie regelmäßig mit einfacheren Texten.".to_string());
        }
    }

    if issues.iter().any(|i| i.category == "TYPOS") {
        recommendations.push("Verwenden Sie eine Rechtschreibprüfung.".to_string());
    }
    if issues.iter().any(|i| i.category == "GRAMMAR") {
        recommendations.push("Wiederholen Sie die deutschen Kasusregeln.".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, FeatureError};
    use crate::models::report::Severity;

    fn issue(category: &str) -> GrammarIssue {
        GrammarIssue {
            start: 0,
            end: 1,
            rule_id: "R".to_string(),
            category: category.to_string(),
            category_german: String::new(),
            message: String::new(),
            error_text: String::new(),
            replacement: None,
            suggestions: Vec::new(),
            severity: Severity::Error,
        }
    }

    fn orchestrator(profile_name: &str) -> AnalysisOrchestrator {
        let config = Config::default();
        let profile = ConfigurationProfile::builtin(profile_name).unwrap();
        AnalysisOrchestrator::new(&config, profile)
    }

    #[test]
    fn test_assess_quality_thresholds() {
        assert_eq!(assess_quality(0), "Exzellent");
        assert_eq!(assess_quality(2), "Gut");
        assert_eq!(assess_quality(5), "Befriedigend");
        assert_eq!(assess_quality(6), "Verbesserungsbedürftig");
    }

    #[test]
    fn test_recommendations_for_clean_text() {
        let recs = learning_recommendations(&[]);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("Ausgezeichnet"));
    }

    #[test]
    fn test_recommendations_mention_categories() {
        let issues = vec![issue("TYPOS"), issue("GRAMMAR"), issue("GRAMMAR")];
        let recs = learning_recommendations(&issues);
        assert!(recs.iter().any(|r| r.contains("Rechtschreibprüfung")));
        assert!(recs.iter().any(|r| r.contains("Kasusregeln")));
    }

    #[tokio::test]
    async fn test_quick_check_requires_grammar_backend() {
        let orchestrator = orchestrator("grammar-only");
        let err = orchestrator.quick_check("Hallo Welt").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Backend(BackendError::NotReady { .. })
        ));
    }

    #[tokio::test]
    async fn test_explain_topic_unavailable_without_explanation_backend() {
        // grammar-only 档案从不启动讲解后端
        let orchestrator = orchestrator("grammar-only");
        let err = orchestrator
            .explain_topic("Kasus", Some(Difficulty::Beginner))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Feature(FeatureError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_analyze_comprehensive_fails_fast_without_explanation_backend() {
        let orchestrator = orchestrator("grammar-only");
        // 请求了生成式步骤，讲解后端未就绪：整体失败，不产出部分报告
        let err = orchestrator
            .analyze_comprehensive("Der Lehrer geben uns Hausaufgaben.", true, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Feature(FeatureError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_session_unavailable_without_explanation_backend() {
        let orchestrator = orchestrator("grammar-only");
        let topics = vec!["Artikel".to_string(), "Kasus".to_string()];
        let err = orchestrator.build_session(&topics, 30).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Feature(FeatureError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let mut orchestrator = orchestrator("default");

        orchestrator.cleanup();
        let first = orchestrator.status();
        assert_eq!(first.grammar_state, BackendState::CleanedUp);
        assert_eq!(first.explanation_state, BackendState::CleanedUp);

        orchestrator.cleanup();
        let second = orchestrator.status();
        assert_eq!(second.grammar_state, BackendState::CleanedUp);
        assert_eq!(second.explanation_state, BackendState::CleanedUp);
    }

    #[test]
    fn test_status_reports_profile() {
        let orchestrator = orchestrator("grammar-only");
        let status = orchestrator.status();
        assert_eq!(status.profile_name, "grammar-only");
        assert!(!status.explanations_enabled);
        assert_eq!(status.grammar_state, BackendState::Uninitialized);
    }
}
