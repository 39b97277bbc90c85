//! 自定义档案加载器
//!
//! 进程启动时从 TOML 文件加载自定义档案定义。每个条目以某个内置档案
//! 为基础（`base`，缺省为 `default`），覆盖个别字段：
//!
//! ```toml
//! [profiles.mein-schnell]
//! base = "fast"
//! temperature = 0.3
//! max_length = 256
//!
//! [profiles.pruefung]
//! base = "comprehensive"
//! difficulty = "advanced"
//! ```
//!
//! 文件不存在不算错误；单个条目损坏时跳过该条目并继续。

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{AppError, ProfileError, Result};
use crate::models::profile::{ConfigurationProfile, Difficulty, ModelSize, ProfileRegistry};

/// 档案文件的顶层结构
#[derive(Debug, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    profiles: HashMap<String, ProfileOverride>,
}

/// 单个档案条目：在基础档案上覆盖的字段
#[derive(Debug, Deserialize)]
struct ProfileOverride {
    base: Option<String>,
    model_size: Option<ModelSize>,
    temperature: Option<f32>,
    max_length: Option<u32>,
    difficulty: Option<Difficulty>,
    provide_examples: Option<bool>,
    generate_exercises: Option<bool>,
    explanations_enabled: Option<bool>,
}

impl ProfileOverride {
    /// 应用覆盖项，生成完整档案
    fn apply(&self, name: &str, base: ConfigurationProfile) -> ConfigurationProfile {
        let mut profile = base.derive(name.to_string());
        if let Some(model_size) = self.model_size {
            profile = profile.with_model_size(model_size);
        }
        if let Some(temperature) = self.temperature {
            profile = profile.with_temperature(temperature);
        }
        if let Some(max_length) = self.max_length {
            profile = profile.with_max_length(max_length);
        }
        if let Some(difficulty) = self.difficulty {
            profile = profile.with_difficulty(difficulty);
        }
        if let Some(enabled) = self.provide_examples {
            profile = profile.with_provide_examples(enabled);
        }
        if let Some(enabled) = self.generate_exercises {
            profile = profile.with_generate_exercises(enabled);
        }
        if let Some(enabled) = self.explanations_enabled {
            profile = profile.with_explanations_enabled(enabled);
        }
        profile
    }
}

/// 从 TOML 文件加载自定义档案并注册
///
/// # 返回
/// 成功注册的档案数量；文件不存在时返回 0
pub async fn load_custom_profiles(path: &str, registry: &mut ProfileRegistry) -> Result<usize> {
    if !Path::new(path).exists() {
        info!("未找到档案文件 {}，仅使用内置档案", path);
        return Ok(0);
    }

    let content = fs::read_to_string(path).await.map_err(|e| {
        AppError::Profile(ProfileError::FileParseFailed {
            path: path.to_string(),
            source: Box::new(e),
        })
    })?;

    let file: ProfileFile = toml::from_str(&content).map_err(|e| {
        AppError::Profile(ProfileError::FileParseFailed {
            path: path.to_string(),
            source: Box::new(e),
        })
    })?;

    let mut loaded = 0;
    for (name, entry) in &file.profiles {
        let base_name = entry.base.as_deref().unwrap_or("default");

        let base = match ConfigurationProfile::builtin(base_name) {
            Ok(base) => base,
            Err(_) => {
                // 单个条目损坏不影响其他条目
                warn!(
                    "跳过档案: {}",
                    AppError::Profile(ProfileError::UnknownBaseProfile {
                        name: name.clone(),
                        base: base_name.to_string(),
                    })
                );
                continue;
            }
        };

        registry.register(entry.apply(name, base));
        loaded += 1;
    }

    info!("✓ 从 {} 加载了 {} 个自定义档案", path, loaded);
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ProfileFile {
        toml::from_str(content).expect("解析测试档案失败")
    }

    #[test]
    fn test_override_applies_only_given_fields() {
        let file = parse(
            r#"
            [profiles.mein-schnell]
            base = "fast"
            temperature = 0.3
            max_length = 256
            "#,
        );
        let entry = &file.profiles["mein-schnell"];
        let base = ConfigurationProfile::builtin("fast").unwrap();
        let profile = entry.apply("mein-schnell", base.clone());

        assert_eq!(profile.name, "mein-schnell");
        assert_eq!(profile.temperature, 0.3);
        assert_eq!(profile.max_length, 256);
        assert_eq!(profile.model_size, base.model_size);
        assert_eq!(profile.difficulty, base.difficulty);
    }

    #[test]
    fn test_override_parses_enums_lowercase() {
        let file = parse(
            r#"
            [profiles.pruefung]
            base = "comprehensive"
            model_size = "large"
            difficulty = "advanced"
            "#,
        );
        let entry = &file.profiles["pruefung"];
        assert_eq!(entry.model_size, Some(ModelSize::Large));
        assert_eq!(entry.difficulty, Some(Difficulty::Advanced));
    }

    #[test]
    fn test_empty_file_has_no_profiles() {
        let file = parse("");
        assert!(file.profiles.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_loads_nothing() {
        let mut registry = ProfileRegistry::new();
        let loaded = load_custom_profiles("nicht-vorhanden.toml", &mut registry)
            .await
            .unwrap();
        assert_eq!(loaded, 0);
        assert_eq!(registry.custom_count(), 0);
    }
}
