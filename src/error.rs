use std::fmt;

use crate::backends::{BackendKind, BackendState};

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 配置档案错误
    Profile(ProfileError),
    /// 后端生命周期错误
    Backend(BackendError),
    /// 功能不可用错误
    Feature(FeatureError),
    /// 语法检查服务错误
    Grammar(GrammarError),
    /// LLM 服务错误
    Llm(LlmError),
    /// 配置错误
    Config(ConfigError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Profile(e) => write!(f, "配置档案错误: {}", e),
            AppError::Backend(e) => write!(f, "后端错误: {}", e),
            AppError::Feature(e) => write!(f, "功能错误: {}", e),
            AppError::Grammar(e) => write!(f, "语法检查错误: {}", e),
            AppError::Llm(e) => write!(f, "LLM错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Profile(e) => Some(e),
            AppError::Backend(e) => Some(e),
            AppError::Feature(e) => Some(e),
            AppError::Grammar(e) => Some(e),
            AppError::Llm(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// 配置档案错误
#[derive(Debug)]
pub enum ProfileError {
    /// 档案名不存在
    UnknownProfile {
        name: String,
    },
    /// 档案文件解析失败
    FileParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 覆盖项引用的基础档案不存在
    UnknownBaseProfile {
        name: String,
        base: String,
    },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::UnknownProfile { name } => {
                write!(f, "未知的配置档案: {}", name)
            }
            ProfileError::FileParseFailed { path, source } => {
                write!(f, "档案文件解析失败 ({}): {}", path, source)
            }
            ProfileError::UnknownBaseProfile { name, base } => {
                write!(f, "档案 {} 引用了不存在的基础档案: {}", name, base)
            }
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfileError::FileParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 后端生命周期错误
#[derive(Debug)]
pub enum BackendError {
    /// 后端初始化失败
    InitFailed {
        kind: BackendKind,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 后端初始化超时
    InitTimeout {
        kind: BackendKind,
        seconds: u64,
    },
    /// 后端尚未就绪
    NotReady {
        kind: BackendKind,
        state: BackendState,
    },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::InitFailed { kind, source } => {
                write!(f, "{} 后端初始化失败: {}", kind, source)
            }
            BackendError::InitTimeout { kind, seconds } => {
                write!(f, "{} 后端初始化超时 (超过 {} 秒)", kind, seconds)
            }
            BackendError::NotReady { kind, state } => {
                write!(f, "{} 后端尚未就绪 (当前状态: {})", kind, state)
            }
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::InitFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 功能不可用错误
#[derive(Debug)]
pub enum FeatureError {
    /// 当前档案未启用所需功能
    Unavailable {
        feature: String,
        hint: String,
    },
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureError::Unavailable { feature, hint } => {
                write!(f, "功能不可用: {} ({})", feature, hint)
            }
        }
    }
}

impl std::error::Error for FeatureError {}

/// 语法检查服务错误
#[derive(Debug)]
pub enum GrammarError {
    /// 网络请求失败
    RequestFailed {
        endpoint: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务返回错误响应
    BadResponse {
        endpoint: String,
        status: Option<u16>,
        message: Option<String>,
    },
    /// 服务不支持请求的语言变体
    UnsupportedLanguage {
        language: String,
    },
    /// JSON 解析失败
    JsonParseFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::RequestFailed { endpoint, source } => {
                write!(f, "语法服务请求失败 ({}): {}", endpoint, source)
            }
            GrammarError::BadResponse {
                endpoint,
                status,
                message,
            } => {
                write!(
                    f,
                    "语法服务返回错误响应 ({}): status={:?}, message={:?}",
                    endpoint, status, message
                )
            }
            GrammarError::UnsupportedLanguage { language } => {
                write!(f, "语法服务不支持语言变体: {}", language)
            }
            GrammarError::JsonParseFailed { source } => {
                write!(f, "JSON解析失败: {}", source)
            }
        }
    }
}

impl std::error::Error for GrammarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GrammarError::RequestFailed { source, .. }
            | GrammarError::JsonParseFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// LLM 服务错误
#[derive(Debug)]
pub enum LlmError {
    /// API 调用失败
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回结果为空
    EmptyResponse {
        model: String,
    },
    /// 返回内容为空
    EmptyContent {
        model: String,
    },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ApiCallFailed { model, source } => {
                write!(f, "LLM API调用失败 (模型: {}): {}", model, source)
            }
            LlmError::EmptyResponse { model } => {
                write!(f, "LLM返回结果为空 (模型: {})", model)
            }
            LlmError::EmptyContent { model } => {
                write!(f, "LLM返回内容为空 (模型: {})", model)
            }
        }
    }
}

impl std::error::Error for LlmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LlmError::ApiCallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ========== 从常见错误类型转换 ==========
// 注意：不需要手动实现 From<AppError> for anyhow::Error，
// 因为 anyhow 已经为所有实现了 std::error::Error 的类型提供了自动实现

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err.url().map(|u| u.to_string()).unwrap_or_default();
        AppError::Grammar(GrammarError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Grammar(GrammarError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Profile(ProfileError::FileParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(format!("IO错误: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建未知档案错误
    pub fn unknown_profile(name: impl Into<String>) -> Self {
        AppError::Profile(ProfileError::UnknownProfile { name: name.into() })
    }

    /// 创建后端初始化失败错误
    pub fn backend_init_failed(
        kind: BackendKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Backend(BackendError::InitFailed {
            kind,
            source: Box::new(source),
        })
    }

    /// 创建后端未就绪错误
    pub fn backend_not_ready(kind: BackendKind, state: BackendState) -> Self {
        AppError::Backend(BackendError::NotReady { kind, state })
    }

    /// 创建功能不可用错误
    pub fn feature_unavailable(feature: impl Into<String>, hint: impl Into<String>) -> Self {
        AppError::Feature(FeatureError::Unavailable {
            feature: feature.into(),
            hint: hint.into(),
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type Result<T> = std::result::Result<T, AppError>;
