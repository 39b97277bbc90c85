//! 分析结果模型
//!
//! 定义语法问题、规则讲解、学习小节与统一分析报告等值类型。
//! 报告在单次请求内构造完成，返回后不再修改。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::profile::Difficulty;

/// 问题严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 风格建议
    Info,
    /// 需要注意
    Warning,
    /// 必须修正
    Error,
}

impl Severity {
    /// 获取名称
    pub fn name(self) -> &'static str {
        match self {
            Severity::Info => "提示",
            Severity::Warning => "警告",
            Severity::Error => "错误",
        }
    }
}

/// 单个语法问题
///
/// 由语法检查后端产出的不可变值；偏移量指向被检查文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarIssue {
    /// 起始偏移
    pub start: usize,
    /// 结束偏移（不含）
    pub end: usize,
    /// 规则标识
    pub rule_id: String,
    /// 规则类别标识（TYPOS / GRAMMAR / ...）
    pub category: String,
    /// 类别的德语名称
    pub category_german: String,
    /// 问题描述
    pub message: String,
    /// 出错的原文片段
    pub error_text: String,
    /// 首选修正建议
    pub replacement: Option<String>,
    /// 全部修正建议（最多 5 条）
    pub suggestions: Vec<String>,
    /// 严重程度
    pub severity: Severity,
}

/// 按规则去重后的生成式讲解
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleExplanation {
    /// 规则标识
    pub rule_id: String,
    /// 类别的德语名称
    pub category_german: String,
    /// 生成的讲解文本
    pub explanation: String,
}

/// 学习会话中单个主题的小节
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSection {
    /// 主题名
    pub topic: String,
    /// 生成的讲解（该主题失败时为 None）
    pub explanation: Option<String>,
    /// 生成的例句
    pub examples: Vec<String>,
    /// 生成的练习
    pub exercises: Vec<String>,
    /// 分配到该主题的学习时长（分钟）
    pub minutes: u32,
    /// 该主题的失败原因（部分失败不影响整个会话）
    pub error: Option<String>,
}

impl TopicSection {
    /// 小节是否生成成功
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// 统一分析报告
///
/// 合并一次请求中各后端的输出；构造一次，返回后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// 原始文本（学习会话时为空）
    pub original_text: String,
    /// 语法问题列表（按起始偏移升序，偏移相同按规则标识）
    pub issues: Vec<GrammarIssue>,
    /// 应用首选建议后的修正文本
    pub corrected_text: Option<String>,
    /// 生成的整体讲解
    pub explanation: Option<String>,
    /// 生成的例句
    pub examples: Vec<String>,
    /// 生成的练习
    pub exercises: Vec<String>,
    /// 按规则去重的讲解（correct 操作产出）
    pub rule_explanations: Vec<RuleExplanation>,
    /// 学习建议
    pub recommendations: Vec<String>,
    /// 整体质量评价（德语）
    pub quality: Option<String>,
    /// 学习会话的各主题小节
    pub sections: Vec<TopicSection>,
    /// 难度标签
    pub difficulty: Difficulty,
    /// 报告生成时间
    pub created_at: DateTime<Local>,
}

impl AnalysisReport {
    /// 创建空白报告
    pub fn new(original_text: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            original_text: original_text.into(),
            issues: Vec::new(),
            corrected_text: None,
            explanation: None,
            examples: Vec::new(),
            exercises: Vec::new(),
            rule_explanations: Vec::new(),
            recommendations: Vec::new(),
            quality: None,
            sections: Vec::new(),
            difficulty,
            created_at: Local::now(),
        }
    }

    /// 问题数量
    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// 是否发现问题
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// 出现的主要类别（按首次出现顺序，最多 `limit` 个）
    pub fn main_categories(&self, limit: usize) -> Vec<&str> {
        let mut seen = Vec::new();
        for issue in &self.issues {
            if !seen.contains(&issue.category.as_str()) {
                seen.push(issue.category.as_str());
                if seen.len() == limit {
                    break;
                }
            }
        }
        seen
    }

    /// 出现的不同规则标识（按首次出现顺序去重）
    pub fn distinct_rule_ids(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for issue in &self.issues {
            if !seen.contains(&issue.rule_id.as_str()) {
                seen.push(issue.rule_id.as_str());
            }
        }
        seen
    }
}
