use tracing::warn;

use crate::error::{AppError, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// LanguageTool 服务地址
    pub languagetool_base_url: String,
    /// 默认语言变体
    pub language_variant: String,
    /// LLM 推理服务地址（兼容 OpenAI API）
    pub llm_api_base_url: String,
    /// LLM API Key（本地推理服务通常忽略）
    pub llm_api_key: String,
    /// 后端初始化超时（秒），模型加载可能需要数分钟
    pub init_timeout_secs: u64,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 自定义档案文件路径
    pub profile_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languagetool_base_url: "http://localhost:8081".to_string(),
            language_variant: "de-DE".to_string(),
            llm_api_base_url: "http://localhost:5000/v1".to_string(),
            llm_api_key: "not-needed".to_string(),
            init_timeout_secs: 300,
            request_timeout_secs: 120,
            profile_file: "profiles.toml".to_string(),
            verbose_logging: false,
            output_log_file: "session.log".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            languagetool_base_url: std::env::var("LANGUAGETOOL_URL").unwrap_or(default.languagetool_base_url),
            language_variant: std::env::var("LANGUAGE_VARIANT").unwrap_or(default.language_variant),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            init_timeout_secs: parse_env("INIT_TIMEOUT_SECS", "u64", default.init_timeout_secs),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", "u64", default.request_timeout_secs),
            profile_file: std::env::var("PROFILE_FILE").unwrap_or(default.profile_file),
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool", default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }
}

/// 解析环境变量，解析失败时告警并回退到默认值
fn parse_env<T: std::str::FromStr>(var_name: &str, expected_type: &str, default: T) -> T {
    match std::env::var(var_name) {
        Ok(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "{}",
                    AppError::Config(ConfigError::EnvVarParseFailed {
                        var_name: var_name.to_string(),
                        value,
                        expected_type: expected_type.to_string(),
                    })
                );
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        std::env::set_var("GERMAN_ANALYZER_TEST_TIMEOUT", "viele");
        let parsed: u64 = parse_env("GERMAN_ANALYZER_TEST_TIMEOUT", "u64", 42);
        assert_eq!(parsed, 42);
        std::env::remove_var("GERMAN_ANALYZER_TEST_TIMEOUT");
    }

    #[test]
    fn test_parse_env_uses_valid_value() {
        std::env::set_var("GERMAN_ANALYZER_TEST_SECS", "7");
        let parsed: u64 = parse_env("GERMAN_ANALYZER_TEST_SECS", "u64", 42);
        assert_eq!(parsed, 7);
        std::env::remove_var("GERMAN_ANALYZER_TEST_SECS");
    }

    #[test]
    fn test_default_endpoints() {
        let config = Config::default();
        assert_eq!(config.language_variant, "de-DE");
        assert!(config.languagetool_base_url.starts_with("http://"));
    }
}
