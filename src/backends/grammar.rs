//! 规则语法检查后端 - 业务能力层
//!
//! 只负责"语法检查"能力，不关心流程
//!
//! ## 技术栈
//! - 通过 `reqwest` 调用 LanguageTool HTTP 服务（`/v2/check`）
//! - 支持德语变体（de-DE / de-AT / de-CH）
//!
//! ## 职责
//! - 把 LanguageTool 的匹配结果转换为 [`GrammarIssue`] 列表
//! - 结果按起始偏移升序排序，偏移相同按规则标识，保证可复现
//! - 提供 apply_suggestions：应用首选建议生成修正文本
//! - 不出现报告合并逻辑，不关心 LLM

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::backends::{BackendKind, BackendState};
use crate::error::{AppError, GrammarError, Result};
use crate::models::report::{GrammarIssue, Severity};

/// 每个问题保留的建议数量上限
const MAX_SUGGESTIONS: usize = 5;

/// 类别标识到德语名称的映射（面向学习者展示）
static CATEGORY_LABELS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "TYPOS" => "Rechtschreibfehler",
    "GRAMMAR" => "Grammatikfehler",
    "PUNCTUATION" => "Zeichensetzung",
    "STYLE" => "Stil und Ausdruck",
    "CONFUSED_WORDS" => "Verwechselte Wörter",
    "REDUNDANCY" => "Redundanz",
    "GENDER_NEUTRALITY" => "Geschlechtergerechte Sprache",
    "COLLOQUIALISMS" => "Umgangssprache",
    "REGIONALISMS" => "Regionalismen",
};

/// 获取类别的德语名称（未知类别原样返回）
pub fn category_german(category: &str) -> &str {
    CATEGORY_LABELS.get(category).copied().unwrap_or(category)
}

/// 根据类别判定严重程度
///
/// 拼写和语法错误必须修正；标点需要注意；风格类只作提示
pub fn severity_for_category(category: &str) -> Severity {
    match category {
        "TYPOS" | "GRAMMAR" | "CONFUSED_WORDS" => Severity::Error,
        "PUNCTUATION" => Severity::Warning,
        "STYLE" | "REDUNDANCY" | "COLLOQUIALISMS" | "REGIONALISMS" => Severity::Info,
        _ => Severity::Warning,
    }
}

/// 排序规则：起始偏移升序，偏移相同按规则标识
pub fn sort_issues(issues: &mut [GrammarIssue]) {
    issues.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
}

/// 应用每个问题的首选建议，生成修正文本
///
/// 按偏移从后向前替换，避免前面的替换使后面的偏移失效。
/// 偏移以字符为单位，兼容变音符号等多字节字符。
pub fn apply_suggestions(text: &str, issues: &[GrammarIssue]) -> String {
    if issues.is_empty() {
        return text.to_string();
    }

    let mut with_replacement: Vec<&GrammarIssue> =
        issues.iter().filter(|i| i.replacement.is_some()).collect();
    with_replacement.sort_by(|a, b| b.start.cmp(&a.start));

    let mut chars: Vec<char> = text.chars().collect();
    for issue in with_replacement {
        if let Some(replacement) = &issue.replacement {
            if issue.start <= issue.end && issue.end <= chars.len() {
                chars.splice(issue.start..issue.end, replacement.chars());
            }
        }
    }

    chars.into_iter().collect()
}

// ========== LanguageTool 响应结构 ==========

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<LtMatch>,
}

#[derive(Debug, Deserialize)]
struct LtMatch {
    message: String,
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<LtReplacement>,
    rule: LtRule,
}

#[derive(Debug, Deserialize)]
struct LtReplacement {
    value: String,
}

#[derive(Debug, Deserialize)]
struct LtRule {
    id: String,
    category: LtCategory,
}

#[derive(Debug, Deserialize)]
struct LtCategory {
    id: String,
}

#[derive(Debug, Deserialize)]
struct LtLanguage {
    #[serde(rename = "longCode")]
    long_code: String,
}

/// 把 LanguageTool 的匹配结果转换为排好序的问题列表
fn convert_matches(text: &str, matches: Vec<LtMatch>) -> Vec<GrammarIssue> {
    let chars: Vec<char> = text.chars().collect();

    let mut issues: Vec<GrammarIssue> = matches
        .into_iter()
        .map(|m| {
            let start = m.offset;
            let end = (m.offset + m.length).min(chars.len());
            let error_text: String = chars
                .get(start..end)
                .map(|slice| slice.iter().collect())
                .unwrap_or_default();

            let mut suggestions: Vec<String> =
                m.replacements.into_iter().map(|r| r.value).collect();
            suggestions.truncate(MAX_SUGGESTIONS);

            GrammarIssue {
                start,
                end,
                rule_id: m.rule.id,
                category_german: category_german(&m.rule.category.id).to_string(),
                severity: severity_for_category(&m.rule.category.id),
                category: m.rule.category.id,
                message: m.message,
                error_text,
                replacement: suggestions.first().cloned(),
                suggestions,
            }
        })
        .collect();

    sort_issues(&mut issues);
    issues
}

/// 规则语法检查后端
///
/// 职责：
/// - 持有 LanguageTool 的 HTTP 客户端
/// - 初始化时探测服务可用性和语言变体支持
/// - 只处理单段文本的检查
/// - 不关心流程顺序
pub struct GrammarCheckBackend {
    base_url: String,
    language: String,
    request_timeout: Duration,
    client: Option<reqwest::Client>,
    state: BackendState,
}

impl GrammarCheckBackend {
    /// 创建新的语法检查后端（不发起任何网络请求）
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            language: String::new(),
            request_timeout,
            client: None,
            state: BackendState::Uninitialized,
        }
    }

    /// 当前状态
    pub fn state(&self) -> BackendState {
        self.state
    }

    /// 当前语言变体
    pub fn language(&self) -> &str {
        &self.language
    }

    /// 初始化后端
    ///
    /// 探测服务是否可达、请求的语言变体是否受支持。
    /// 幂等：已就绪且变体一致时为无操作。
    pub async fn initialize(&mut self, language_variant: &str) -> Result<()> {
        if self.state.is_ready() && self.language == language_variant {
            debug!("语法后端已就绪，跳过初始化");
            return Ok(());
        }
        if !self.state.can_initialize() && !self.state.is_ready() {
            return Err(AppError::backend_not_ready(BackendKind::Grammar, self.state));
        }

        info!("🔄 正在初始化语法后端 (语言: {})...", language_variant);
        self.state = BackendState::Initializing;

        match self.probe_language(language_variant).await {
            Ok(()) => {
                self.language = language_variant.to_string();
                self.state = BackendState::Ready;
                info!("✓ 语法后端就绪");
                Ok(())
            }
            Err(e) => {
                self.client = None;
                self.state = BackendState::Failed;
                warn!("❌ 语法后端初始化失败: {}", e);
                Err(AppError::backend_init_failed(BackendKind::Grammar, e))
            }
        }
    }

    /// 探测服务并验证语言变体
    async fn probe_language(&mut self, language_variant: &str) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(AppError::from)?;

        let endpoint = format!("{}/v2/languages", self.base_url);
        let response = client.get(&endpoint).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Grammar(GrammarError::BadResponse {
                endpoint,
                status: Some(response.status().as_u16()),
                message: None,
            }));
        }

        let languages: Vec<LtLanguage> = response.json().await?;
        let supported = languages
            .iter()
            .any(|l| l.long_code == language_variant);

        if !supported {
            return Err(AppError::Grammar(GrammarError::UnsupportedLanguage {
                language: language_variant.to_string(),
            }));
        }

        self.client = Some(client);
        Ok(())
    }

    /// 检查文本，返回排好序的问题列表
    ///
    /// 相同文本和规则集下结果是确定性的
    pub async fn check(&self, text: &str) -> Result<Vec<GrammarIssue>> {
        let client = match (&self.client, self.state) {
            (Some(client), BackendState::Ready) => client,
            _ => return Err(AppError::backend_not_ready(BackendKind::Grammar, self.state)),
        };

        debug!("检查文本，长度: {} 字符", text.chars().count());

        let endpoint = format!("{}/v2/check", self.base_url);
        let response = client
            .post(&endpoint)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.ok();
            return Err(AppError::Grammar(GrammarError::BadResponse {
                endpoint,
                status: Some(status),
                message,
            }));
        }

        let parsed: CheckResponse = response.json().await?;
        let issues = convert_matches(text, parsed.matches);

        debug!("发现 {} 个问题", issues.len());
        Ok(issues)
    }

    /// 释放资源
    ///
    /// 幂等；未初始化时也可安全调用
    pub fn cleanup(&mut self) {
        self.client = None;
        self.state = BackendState::CleanedUp;
        debug!("语法后端已清理");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造测试用的问题
    fn issue(start: usize, end: usize, rule_id: &str, replacement: Option<&str>) -> GrammarIssue {
        GrammarIssue {
            start,
            end,
            rule_id: rule_id.to_string(),
            category: "GRAMMAR".to_string(),
            category_german: "Grammatikfehler".to_string(),
            message: String::new(),
            error_text: String::new(),
            replacement: replacement.map(|s| s.to_string()),
            suggestions: replacement.map(|s| vec![s.to_string()]).unwrap_or_default(),
            severity: Severity::Error,
        }
    }

    #[test]
    fn test_sort_issues_by_offset_then_rule_id() {
        let mut issues = vec![
            issue(10, 14, "B_RULE", None),
            issue(3, 7, "Z_RULE", None),
            issue(10, 14, "A_RULE", None),
        ];
        sort_issues(&mut issues);

        let order: Vec<(usize, &str)> = issues
            .iter()
            .map(|i| (i.start, i.rule_id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(3, "Z_RULE"), (10, "A_RULE"), (10, "B_RULE")]
        );
    }

    #[test]
    fn test_convert_matches_sorts_and_maps_fields() {
        let json = r#"{
            "matches": [
                {
                    "message": "Möglicher Tippfehler",
                    "offset": 12,
                    "length": 5,
                    "replacements": [{"value": "gibt"}],
                    "rule": {"id": "GERMAN_SPELLER_RULE", "category": {"id": "TYPOS"}}
                },
                {
                    "message": "Kongruenzfehler",
                    "offset": 4,
                    "length": 6,
                    "replacements": [{"value": "gibt"}, {"value": "geben wir"}],
                    "rule": {"id": "DE_AGREEMENT", "category": {"id": "GRAMMAR"}}
                }
            ]
        }"#;
        let parsed: CheckResponse = serde_json::from_str(json).unwrap();
        let text = "Der Lehrer geben uns Hausaufgaben.";
        let issues = convert_matches(text, parsed.matches);

        assert_eq!(issues.len(), 2);
        // 按偏移升序
        assert_eq!(issues[0].start, 4);
        assert_eq!(issues[0].rule_id, "DE_AGREEMENT");
        assert_eq!(issues[0].category_german, "Grammatikfehler");
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].replacement.as_deref(), Some("gibt"));
        assert_eq!(issues[1].start, 12);
    }

    #[test]
    fn test_convert_matches_truncates_suggestions() {
        let json = r#"{
            "matches": [{
                "message": "m",
                "offset": 0,
                "length": 3,
                "replacements": [
                    {"value": "a"}, {"value": "b"}, {"value": "c"},
                    {"value": "d"}, {"value": "e"}, {"value": "f"}, {"value": "g"}
                ],
                "rule": {"id": "R", "category": {"id": "TYPOS"}}
            }]
        }"#;
        let parsed: CheckResponse = serde_json::from_str(json).unwrap();
        let issues = convert_matches("abc", parsed.matches);
        assert_eq!(issues[0].suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(issues[0].replacement.as_deref(), Some("a"));
    }

    #[test]
    fn test_apply_suggestions_back_to_front() {
        let text = "Der Lehrer geben uns viele Hausaufgabe.";
        let issues = vec![
            issue(11, 16, "DE_AGREEMENT", Some("gibt")),
            issue(27, 38, "GERMAN_SPELLER_RULE", Some("Hausaufgaben")),
        ];
        let corrected = apply_suggestions(text, &issues);
        assert_eq!(corrected, "Der Lehrer gibt uns viele Hausaufgaben.");
    }

    #[test]
    fn test_apply_suggestions_with_umlauts() {
        // 偏移以字符计，"Schüler" 中的 ü 占一个字符
        let text = "Die Schüler gehen in die Schule.";
        let issues = vec![issue(12, 17, "R", Some("geht"))];
        let corrected = apply_suggestions(text, &issues);
        assert_eq!(corrected, "Die Schüler geht in die Schule.");
    }

    #[test]
    fn test_apply_suggestions_no_issues_returns_input() {
        let text = "Alles ist korrekt.";
        assert_eq!(apply_suggestions(text, &[]), text);
    }

    #[test]
    fn test_apply_suggestions_skips_issues_without_replacement() {
        let text = "Der Lehrer geben uns Hausaufgaben.";
        let issues = vec![issue(11, 16, "R", None)];
        assert_eq!(apply_suggestions(text, &issues), text);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_for_category("TYPOS"), Severity::Error);
        assert_eq!(severity_for_category("GRAMMAR"), Severity::Error);
        assert_eq!(severity_for_category("PUNCTUATION"), Severity::Warning);
        assert_eq!(severity_for_category("STYLE"), Severity::Info);
        assert_eq!(severity_for_category("SONSTIGES"), Severity::Warning);
    }

    #[test]
    fn test_category_german_fallback() {
        assert_eq!(category_german("TYPOS"), "Rechtschreibfehler");
        assert_eq!(category_german("UNBEKANNT"), "UNBEKANNT");
    }

    #[test]
    fn test_check_requires_ready_state() {
        let backend =
            GrammarCheckBackend::new("http://localhost:8081", Duration::from_secs(5));
        let err = tokio_test::block_on(backend.check("Hallo Welt")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Backend(crate::error::BackendError::NotReady { .. })
        ));
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut backend =
            GrammarCheckBackend::new("http://localhost:8081", Duration::from_secs(5));
        backend.cleanup();
        assert_eq!(backend.state(), BackendState::CleanedUp);
        backend.cleanup();
        assert_eq!(backend.state(), BackendState::CleanedUp);
    }
}
