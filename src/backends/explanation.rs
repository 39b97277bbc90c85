//! 生成式讲解后端 - 业务能力层
//!
//! 只负责"德语讲解生成"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 调用兼容 OpenAI API 的本地推理服务
//! - 模型由配置档案的规格决定（DialoGPT / LeoLM 7B / LeoLM 13B）
//!
//! ## 职责
//! - 按任务类型（讲解 / 例句 / 练习 / 纠错）构建德语提示词
//! - 生成语法讲解、例句和练习
//! - 清理生成文本中的对话模板残留
//! - 输出是非确定性的：相同输入不保证相同输出

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use regex::Regex;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::backends::{BackendKind, BackendState};
use crate::config::Config;
use crate::error::{AppError, BackendError, LlmError, Result};
use crate::models::profile::{ConfigurationProfile, Difficulty, ModelSize};

/// 任务类型，决定系统提示词
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// 语法讲解
    Explanation,
    /// 例句生成
    Example,
    /// 练习生成
    Exercise,
    /// 文本纠错分析
    Correction,
}

impl TaskType {
    /// 获取任务标识（出现在用户提示词中）
    pub fn name(self) -> &'static str {
        match self {
            TaskType::Explanation => "Erklärung",
            TaskType::Example => "Beispiele",
            TaskType::Exercise => "Übung",
            TaskType::Correction => "Korrektur",
        }
    }

    /// 获取对应的系统提示词（德语教师人设）
    fn system_prompt(self) -> &'static str {
        match self {
            TaskType::Explanation => {
                "Du bist ein erfahrener Deutschlehrer. Erkläre deutsche Grammatikregeln klar und verständlich. \
                 Verwende einfache Sprache und gib konkrete Beispiele. Strukturiere deine Antworten logisch."
            }
            TaskType::Example => {
                "Du bist ein Deutschlehrer, der hilfreiche Beispiele erstellt. \
                 Generiere klare, relevante Beispielsätze, die die gewünschte Grammatikregel demonstrieren. \
                 Variiere die Komplexität basierend auf dem Schwierigkeitsgrad."
            }
            TaskType::Exercise => {
                "Du bist ein Deutschlehrer, der Übungen erstellt. \
                 Erstelle ansprechende und lehrreiche Übungen für deutsche Grammatik. \
                 Stelle Fragen, Lückentexte oder Umformungsaufgaben bereit."
            }
            TaskType::Correction => {
                "Du bist ein Deutschlehrer, der Texte korrigiert. \
                 Analysiere den Text auf Grammatikfehler, erkläre die Fehler und gib Verbesserungsvorschläge."
            }
        }
    }
}

/// 练习形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    /// 填空
    FillBlank,
    /// 选择题
    MultipleChoice,
    /// 句子改写
    Transformation,
    /// 改错
    Correction,
}

impl ExerciseKind {
    /// 获取练习的生成指令
    pub fn instruction(self) -> &'static str {
        match self {
            ExerciseKind::FillBlank => "Erstelle eine Lückentext-Übung",
            ExerciseKind::MultipleChoice => "Erstelle eine Multiple-Choice-Aufgabe",
            ExerciseKind::Transformation => "Erstelle eine Satz-Umformungsaufgabe",
            ExerciseKind::Correction => "Erstelle eine Fehlerkorrektur-Aufgabe",
        }
    }
}

/// 结构化的德语任务提示词
#[derive(Debug, Clone)]
pub struct GermanPrompt {
    /// 任务类型
    pub task_type: TaskType,
    /// 任务内容
    pub content: String,
    /// 补充上下文（可选）
    pub context: Option<String>,
    /// 难度等级
    pub difficulty: Difficulty,
    /// 语法焦点（可选）
    pub target_grammar: Option<String>,
}

impl GermanPrompt {
    /// 构建用户消息
    ///
    /// 返回的文本按"任务 / 难度 / 焦点 / 上下文 / 内容"分行组织
    fn user_message(&self) -> String {
        let mut message = format!(
            "Aufgabe: {}\nSchwierigkeitsgrad: {}\n",
            self.task_type.name(),
            self.difficulty.german()
        );

        if let Some(target) = &self.target_grammar {
            message.push_str(&format!("Grammatik-Fokus: {}\n", target));
        }
        if let Some(context) = &self.context {
            message.push_str(&format!("Kontext: {}\n", context));
        }

        message.push_str(&format!("Inhalt: {}", self.content));
        message
    }
}

/// 清理生成文本中的对话模板残留
///
/// 本地推理服务偶尔会把 `<|im_start|>` / `<|im_end|>` 标记一并输出
fn clean_generated_text(text: &str) -> String {
    if let Ok(re) = Regex::new(r"<\|im_(?:start|end)\|>(?:assistant)?\n?") {
        re.replace_all(text, "").trim().to_string()
    } else {
        text.trim().to_string()
    }
}

/// 从生成文本中提取编号列表项
///
/// 识别 `1.` / `2)` / `-` / `•` 前缀；没有编号时按非空行拆分
fn parse_list_items(text: &str) -> Vec<String> {
    if let Ok(re) = Regex::new(r"(?m)^\s*(?:\d+\s*[.)]|[-•])\s*(.+)$") {
        let numbered: Vec<String> = re
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().trim().to_string()))
            .filter(|s| !s.is_empty())
            .collect();

        if !numbered.is_empty() {
            return numbered;
        }
    }

    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}

/// 生成式讲解后端
///
/// 职责：
/// - 独占持有推理服务的客户端句柄（不使用全局单例）
/// - 初始化时发送预热请求触发模型加载（可能耗时数分钟，受超时保护）
/// - 只处理单次生成请求
/// - 不关心流程顺序
pub struct ExplanationBackend {
    api_base: String,
    api_key: String,
    model_name: String,
    temperature: f32,
    max_length: u32,
    init_timeout: Duration,
    client: Option<Client<OpenAIConfig>>,
    state: BackendState,
}

impl ExplanationBackend {
    /// 创建新的讲解后端（不发起任何网络请求）
    pub fn new(config: &Config, profile: &ConfigurationProfile) -> Self {
        Self {
            api_base: config.llm_api_base_url.clone(),
            api_key: config.llm_api_key.clone(),
            model_name: String::new(),
            temperature: profile.temperature,
            max_length: profile.max_length,
            init_timeout: Duration::from_secs(config.init_timeout_secs),
            client: None,
            state: BackendState::Uninitialized,
        }
    }

    /// 当前状态
    pub fn state(&self) -> BackendState {
        self.state
    }

    /// 当前模型标识（未初始化时为空）
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 初始化后端
    ///
    /// 连接推理服务并发送预热请求，触发模型加载。
    /// 整个过程受 `init_timeout` 保护，超时后标记为失败。
    /// 幂等：已就绪且模型一致时为无操作。
    pub async fn initialize(&mut self, model_size: ModelSize) -> Result<()> {
        let model_id = model_size.model_id();

        if self.state.is_ready() && self.model_name == model_id {
            debug!("讲解后端已就绪，跳过初始化");
            return Ok(());
        }
        if !self.state.can_initialize() && !self.state.is_ready() {
            return Err(AppError::backend_not_ready(
                BackendKind::Explanation,
                self.state,
            ));
        }

        info!("🔄 正在加载模型: {} (可能需要数分钟)...", model_id);
        self.state = BackendState::Initializing;

        let openai_config = OpenAIConfig::new()
            .with_api_key(&self.api_key)
            .with_api_base(&self.api_base);
        let client = Client::with_config(openai_config);

        // 预热请求触发模型加载；整体受显式超时保护，可以被取消
        let warm_up = Self::warm_up(&client, model_id);
        match tokio::time::timeout(self.init_timeout, warm_up).await {
            Ok(Ok(())) => {
                self.client = Some(client);
                self.model_name = model_id.to_string();
                self.state = BackendState::Ready;
                info!("✓ 讲解后端就绪 (模型: {})", model_id);
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = BackendState::Failed;
                warn!("❌ 讲解后端初始化失败: {}", e);
                Err(AppError::backend_init_failed(BackendKind::Explanation, e))
            }
            Err(_elapsed) => {
                self.state = BackendState::Failed;
                warn!(
                    "❌ 模型加载超时 (超过 {} 秒)",
                    self.init_timeout.as_secs()
                );
                Err(AppError::Backend(BackendError::InitTimeout {
                    kind: BackendKind::Explanation,
                    seconds: self.init_timeout.as_secs(),
                }))
            }
        }
    }

    /// 发送最小的预热请求
    async fn warm_up(client: &Client<OpenAIConfig>, model_id: &str) -> Result<()> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content("Sag nur: Hallo")
            .build()
            .map_err(|e| AppError::llm_api_failed(model_id, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model_id)
            .messages(vec![ChatCompletionRequestMessage::User(message)])
            .max_tokens(8u32)
            .build()
            .map_err(|e| AppError::llm_api_failed(model_id, e))?;

        client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::llm_api_failed(model_id, e))?;

        Ok(())
    }

    /// 通用的生成函数
    ///
    /// 这是最基础的生成接口，其他所有生成功能都基于此函数
    pub async fn generate(&self, prompt: &GermanPrompt) -> Result<String> {
        let client = match (&self.client, self.state) {
            (Some(client), BackendState::Ready) => client,
            _ => {
                return Err(AppError::backend_not_ready(
                    BackendKind::Explanation,
                    self.state,
                ))
            }
        };

        debug!(
            "调用生成服务，任务: {}, 模型: {}",
            prompt.task_type.name(),
            self.model_name
        );

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.task_type.system_prompt())
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user_message())
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_length)
            .build()
            .map_err(|e| AppError::llm_api_failed(&self.model_name, e))?;

        let response = client.chat().create(request).await.map_err(|e| {
            warn!("生成服务调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        let choice = response.choices.first().ok_or_else(|| {
            AppError::Llm(LlmError::EmptyResponse {
                model: self.model_name.clone(),
            })
        })?;

        let content = choice.message.content.clone().ok_or_else(|| {
            AppError::Llm(LlmError::EmptyContent {
                model: self.model_name.clone(),
            })
        })?;

        Ok(clean_generated_text(&content))
    }

    /// 生成语法主题讲解
    pub async fn generate_explanation(
        &self,
        topic: &str,
        difficulty: Difficulty,
        context: Option<&str>,
    ) -> Result<String> {
        let prompt = GermanPrompt {
            task_type: TaskType::Explanation,
            content: format!("Erkläre mir die deutsche Grammatikregel: {}", topic),
            context: context.map(|s| s.to_string()),
            difficulty,
            target_grammar: Some(topic.to_string()),
        };
        self.generate(&prompt).await
    }

    /// 生成例句
    pub async fn generate_examples(
        &self,
        topic: &str,
        count: usize,
        difficulty: Difficulty,
    ) -> Result<Vec<String>> {
        let prompt = GermanPrompt {
            task_type: TaskType::Example,
            content: format!("Erstelle {} Beispielsätze für: {}", count, topic),
            context: None,
            difficulty,
            target_grammar: Some(topic.to_string()),
        };
        let text = self.generate(&prompt).await?;
        Ok(parse_list_items(&text))
    }

    /// 生成指定形式的练习
    pub async fn generate_exercise(
        &self,
        topic: &str,
        kind: ExerciseKind,
        difficulty: Difficulty,
    ) -> Result<String> {
        let prompt = GermanPrompt {
            task_type: TaskType::Exercise,
            content: format!("{} für das Thema: {}", kind.instruction(), topic),
            context: None,
            difficulty,
            target_grammar: Some(topic.to_string()),
        };
        self.generate(&prompt).await
    }

    /// 生成一组练习（默认填空形式，按条目拆分）
    pub async fn generate_exercises(
        &self,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<Vec<String>> {
        let text = self
            .generate_exercise(topic, ExerciseKind::FillBlank, difficulty)
            .await?;
        let items = parse_list_items(&text);
        if items.is_empty() {
            Ok(vec![text])
        } else {
            Ok(items)
        }
    }

    /// 分析文本并给出语法评述
    pub async fn analyze_text(&self, text: &str, focus_areas: &[String]) -> Result<String> {
        let focus = if focus_areas.is_empty() {
            "allgemeine Grammatik".to_string()
        } else {
            focus_areas.join(", ")
        };

        let prompt = GermanPrompt {
            task_type: TaskType::Correction,
            content: format!("Analysiere diesen deutschen Text auf {}: {}", focus, text),
            context: Some("Textanalyse".to_string()),
            difficulty: Difficulty::Intermediate,
            target_grammar: None,
        };
        self.generate(&prompt).await
    }

    /// 释放资源
    ///
    /// 幂等；未初始化时也可安全调用
    pub fn cleanup(&mut self) {
        self.client = None;
        self.model_name.clear();
        self.state = BackendState::CleanedUp;
        debug!("讲解后端已清理");
    }
}
