//! 配置档案
//!
//! 一个档案是一组不可变的初始化设置：模型规格、采样温度、生成长度、
//! 难度等级以及功能开关。内置档案静态枚举，自定义档案在内置档案的
//! 基础上覆盖个别字段。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// 模型规格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    /// 小模型，加载快，质量一般
    Small,
    /// 中等模型（默认）
    Medium,
    /// 大模型，加载慢，质量最好
    Large,
}

impl ModelSize {
    /// 获取对应的模型标识
    pub fn model_id(self) -> &'static str {
        match self {
            ModelSize::Small => "microsoft/DialoGPT-medium",
            ModelSize::Medium => "LeoLM/leo-hessianai-7b-chat",
            ModelSize::Large => "LeoLM/leo-hessianai-13b-chat",
        }
    }

    /// 获取规格名称
    pub fn name(self) -> &'static str {
        match self {
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }
}

/// 难度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// 初级
    Beginner,
    /// 中级（默认）
    Intermediate,
    /// 高级
    Advanced,
}

impl Difficulty {
    /// 获取英文标识（用于命令行参数和档案文件）
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// 获取德语名称（用于提示词）
    pub fn german(self) -> &'static str {
        match self {
            Difficulty::Beginner => "Anfänger",
            Difficulty::Intermediate => "Mittelstufe",
            Difficulty::Advanced => "Fortgeschritten",
        }
    }

    /// 尝试从字符串解析难度
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" | "anfänger" => Some(Difficulty::Beginner),
            "intermediate" | "mittelstufe" => Some(Difficulty::Intermediate),
            "advanced" | "fortgeschritten" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

/// 配置档案
///
/// 构造后不可变；按名称在初始化时选定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationProfile {
    /// 档案名（唯一键）
    pub name: String,
    /// 模型规格
    pub model_size: ModelSize,
    /// 采样温度
    pub temperature: f32,
    /// 最大生成长度（token 数）
    pub max_length: u32,
    /// 难度等级
    pub difficulty: Difficulty,
    /// 综合分析时是否生成例句
    pub provide_examples: bool,
    /// 综合分析时是否生成练习
    pub generate_exercises: bool,
    /// 是否启用生成式讲解后端
    pub explanations_enabled: bool,
}

/// 内置档案的静态描述（phf 表的值必须可常量构造）
struct ProfileSpec {
    model_size: ModelSize,
    temperature: f32,
    max_length: u32,
    difficulty: Difficulty,
    provide_examples: bool,
    generate_exercises: bool,
    explanations_enabled: bool,
}

/// 内置档案表
///
/// - `grammar-only`: 只用 LanguageTool，不加载 LLM（最快）
/// - `fast`: 小模型 + LanguageTool
/// - `default`: 7B 模型 + LanguageTool，生成例句
/// - `comprehensive`: 13B 模型，例句 + 练习全开
/// - `beginner`: 7B 模型，初级难度，例句 + 练习全开
static BUILTIN_PROFILES: phf::Map<&'static str, ProfileSpec> = phf::phf_map! {
    "grammar-only" => ProfileSpec {
        model_size: ModelSize::Small,
        temperature: 0.7,
        max_length: 512,
        difficulty: Difficulty::Intermediate,
        provide_examples: false,
        generate_exercises: false,
        explanations_enabled: false,
    },
    "fast" => ProfileSpec {
        model_size: ModelSize::Small,
        temperature: 0.7,
        max_length: 512,
        difficulty: Difficulty::Intermediate,
        provide_examples: false,
        generate_exercises: false,
        explanations_enabled: true,
    },
    "default" => ProfileSpec {
        model_size: ModelSize::Medium,
        temperature: 0.7,
        max_length: 1024,
        difficulty: Difficulty::Intermediate,
        provide_examples: true,
        generate_exercises: false,
        explanations_enabled: true,
    },
    "comprehensive" => ProfileSpec {
        model_size: ModelSize::Large,
        temperature: 0.7,
        max_length: 2048,
        difficulty: Difficulty::Intermediate,
        provide_examples: true,
        generate_exercises: true,
        explanations_enabled: true,
    },
    "beginner" => ProfileSpec {
        model_size: ModelSize::Medium,
        temperature: 0.5,
        max_length: 1024,
        difficulty: Difficulty::Beginner,
        provide_examples: true,
        generate_exercises: true,
        explanations_enabled: true,
    },
};

impl ConfigurationProfile {
    /// 按名称解析内置档案
    ///
    /// 名称不存在时返回 `UnknownProfile`，无任何副作用
    pub fn builtin(name: &str) -> Result<Self> {
        let spec = BUILTIN_PROFILES
            .get(name)
            .ok_or_else(|| AppError::unknown_profile(name))?;

        Ok(Self {
            name: name.to_string(),
            model_size: spec.model_size,
            temperature: spec.temperature,
            max_length: spec.max_length,
            difficulty: spec.difficulty,
            provide_examples: spec.provide_examples,
            generate_exercises: spec.generate_exercises,
            explanations_enabled: spec.explanations_enabled,
        })
    }

    /// 内置档案名列表（按声明顺序不保证，仅用于提示信息）
    pub fn builtin_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = BUILTIN_PROFILES.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// 启用了讲解功能的内置档案名（用于 FeatureUnavailable 的提示）
    pub fn explanation_profile_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = BUILTIN_PROFILES
            .entries()
            .filter(|(_, spec)| spec.explanations_enabled)
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }

    // ========== 自定义档案（基于某个内置档案覆盖字段） ==========

    /// 以本档案为基础派生新档案
    pub fn derive(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model_size(mut self, model_size: ModelSize) -> Self {
        self.model_size = model_size;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_provide_examples(mut self, enabled: bool) -> Self {
        self.provide_examples = enabled;
        self
    }

    pub fn with_generate_exercises(mut self, enabled: bool) -> Self {
        self.generate_exercises = enabled;
        self
    }

    pub fn with_explanations_enabled(mut self, enabled: bool) -> Self {
        self.explanations_enabled = enabled;
        self
    }
}

/// 档案注册表
///
/// 自定义档案优先于内置档案；解析失败时返回 `UnknownProfile`
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    custom: HashMap<String, ConfigurationProfile>,
}

impl ProfileRegistry {
    /// 创建只含内置档案的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个自定义档案（同名覆盖）
    pub fn register(&mut self, profile: ConfigurationProfile) {
        self.custom.insert(profile.name.clone(), profile);
    }

    /// 自定义档案数量
    pub fn custom_count(&self) -> usize {
        self.custom.len()
    }

    /// 按名称解析档案
    pub fn resolve(&self, name: &str) -> Result<ConfigurationProfile> {
        if let Some(profile) = self.custom.get(name) {
            return Ok(profile.clone());
        }
        ConfigurationProfile::builtin(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProfileError;

    #[test]
    fn test_builtin_profile_resolution() {
        let profile = ConfigurationProfile::builtin("default").unwrap();
        assert_eq!(profile.name, "default");
        assert_eq!(profile.model_size, ModelSize::Medium);
        assert!(profile.explanations_enabled);
        assert!(profile.provide_examples);
        assert!(!profile.generate_exercises);
    }

    #[test]
    fn test_grammar_only_disables_llm() {
        let profile = ConfigurationProfile::builtin("grammar-only").unwrap();
        assert!(!profile.explanations_enabled);
        assert!(!profile.provide_examples);
        assert!(!profile.generate_exercises);
    }

    #[test]
    fn test_unknown_profile_name() {
        let err = ConfigurationProfile::builtin("turbo").unwrap_err();
        assert!(matches!(
            err,
            AppError::Profile(ProfileError::UnknownProfile { ref name }) if name == "turbo"
        ));
    }

    #[test]
    fn test_builtin_names_cover_both_readme_variants() {
        let names = ConfigurationProfile::builtin_names();
        for expected in ["grammar-only", "fast", "default", "comprehensive", "beginner"] {
            assert!(names.contains(&expected), "缺少内置档案: {}", expected);
        }
    }

    #[test]
    fn test_derived_profile_overrides_fields() {
        let base = ConfigurationProfile::builtin("fast").unwrap();
        let custom = base
            .clone()
            .derive("mein-schnell")
            .with_temperature(0.3)
            .with_max_length(256);

        assert_eq!(custom.name, "mein-schnell");
        assert_eq!(custom.temperature, 0.3);
        assert_eq!(custom.max_length, 256);
        // 未覆盖的字段保持基础档案的值
        assert_eq!(custom.model_size, base.model_size);
        assert_eq!(custom.explanations_enabled, base.explanations_enabled);
    }

    #[test]
    fn test_registry_custom_shadows_builtin() {
        let mut registry = ProfileRegistry::new();
        let custom = ConfigurationProfile::builtin("fast")
            .unwrap()
            .derive("default")
            .with_temperature(0.1);
        registry.register(custom);

        let resolved = registry.resolve("default").unwrap();
        assert_eq!(resolved.temperature, 0.1);
        // 其他内置档案不受影响
        assert!(registry.resolve("comprehensive").is_ok());
        assert!(registry.resolve("nicht-da").is_err());
    }

    #[test]
    fn test_explanation_profile_hint_excludes_grammar_only() {
        let names = ConfigurationProfile::explanation_profile_names();
        assert!(!names.contains(&"grammar-only"));
        assert!(names.contains(&"default"));
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::parse("beginner"), Some(Difficulty::Beginner));
        assert_eq!(Difficulty::parse("Anfänger"), Some(Difficulty::Beginner));
        assert_eq!(Difficulty::parse("advanced"), Some(Difficulty::Advanced));
        assert_eq!(Difficulty::parse("expert"), None);
    }
}
