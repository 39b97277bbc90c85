//! 学习会话构建器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责把一组语法主题组装成完整的学习会话。
//!
//! ## 核心功能
//!
//! 1. **逐主题生成**：每个主题依次生成讲解、例句和练习
//! 2. **部分失败容忍**：单个主题失败只记录在对应小节，不中断整个会话
//! 3. **时长分配**：请求的学习时长在主题间平均分配
//! 4. **综合练习**：多主题会话结尾生成覆盖全部主题的练习（尽力而为）

use tracing::{info, warn};

use crate::backends::explanation::{ExerciseKind, ExplanationBackend};
use crate::models::profile::Difficulty;
use crate::models::report::{AnalysisReport, TopicSection};

/// 每个主题生成的例句数量
const EXAMPLES_PER_TOPIC: usize = 3;

/// 学习会话构建器
///
/// 只借用讲解后端，不持有任何资源
pub struct SessionBuilder<'a> {
    explanation: &'a ExplanationBackend,
    difficulty: Difficulty,
}

impl<'a> SessionBuilder<'a> {
    /// 创建新的会话构建器
    pub fn new(explanation: &'a ExplanationBackend, difficulty: Difficulty) -> Self {
        Self {
            explanation,
            difficulty,
        }
    }

    /// 构建学习会话报告
    ///
    /// 每个主题一个小节；`duration_minutes` 在主题间平均分配
    pub async fn build(&self, topics: &[String], duration_minutes: u32) -> AnalysisReport {
        let mut report = AnalysisReport::new("", self.difficulty);

        if topics.is_empty() {
            warn!("⚠️ 学习会话没有任何主题");
            return report;
        }

        let minutes_per_topic = (duration_minutes / topics.len() as u32).max(1);

        for (idx, topic) in topics.iter().enumerate() {
            info!(
                "[主题 {}/{}] 📚 正在生成学习内容: {}",
                idx + 1,
                topics.len(),
                topic
            );

            let section = self.build_topic(topic, minutes_per_topic).await;
            if let Some(error) = &section.error {
                warn!("[主题 {}/{}] ⚠️ 部分失败: {}", idx + 1, topics.len(), error);
            } else {
                info!("[主题 {}/{}] ✓ 完成", idx + 1, topics.len());
            }
            report.sections.push(section);
        }

        // 结尾的综合练习失败不影响已生成的小节
        if topics.len() > 1 {
            let combined_topic = format!("Kombinierte Übung zu: {}", topics.join(", "));
            match self
                .explanation
                .generate_exercise(&combined_topic, ExerciseKind::FillBlank, self.difficulty)
                .await
            {
                Ok(exercise) => report.exercises.push(exercise),
                Err(e) => warn!("⚠️ 综合练习生成失败: {}", e),
            }
        }

        let ok_count = report.sections.iter().filter(|s| s.is_ok()).count();
        info!(
            "✓ 学习会话完成: {}/{} 个主题成功",
            ok_count,
            report.sections.len()
        );

        report
    }

    /// 为单个主题生成小节
    ///
    /// 讲解失败时跳过该主题的后续步骤；例句或练习失败时保留已生成的内容
    async fn build_topic(&self, topic: &str, minutes: u32) -> TopicSection {
        let mut section = TopicSection {
            topic: topic.to_string(),
            explanation: None,
            examples: Vec::new(),
            exercises: Vec::new(),
            minutes,
            error: None,
        };

        match self
            .explanation
            .generate_explanation(topic, self.difficulty, None)
            .await
        {
            Ok(text) => section.explanation = Some(text),
            Err(e) => {
                // 没有讲解的主题没有继续的价值
                section.error = Some(e.to_string());
                return section;
            }
        }

        match self
            .explanation
            .generate_examples(topic, EXAMPLES_PER_TOPIC, self.difficulty)
            .await
        {
            Ok(examples) => section.examples = examples,
            Err(e) => {
                section.error = Some(e.to_string());
                return section;
            }
        }

        match self
            .explanation
            .generate_exercise(topic, ExerciseKind::FillBlank, self.difficulty)
            .await
        {
            Ok(exercise) => section.exercises.push(exercise),
            Err(e) => section.error = Some(e.to_string()),
        }

        section
    }
}
