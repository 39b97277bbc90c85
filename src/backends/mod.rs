//! 分析后端 - 业务能力层
//!
//! ## 职责
//!
//! 本层封装两个外部分析引擎，只暴露"分析能力"，不关心流程：
//!
//! ### `grammar` - 规则语法检查后端
//! - 封装 LanguageTool HTTP 服务
//! - 提供 check（结构化问题列表）与 apply_suggestions（生成修正文本）能力
//!
//! ### `explanation` - 生成式讲解后端
//! - 封装兼容 OpenAI API 的本地推理服务（LeoLM 等德语模型）
//! - 提供讲解、例句、练习的生成能力
//!
//! ## 设计原则
//!
//! 1. **显式后端种类**：只有 Grammar / Explanation 两种后端，
//!    由 [`BackendKind`] 枚举标识，不做鸭子类型
//! 2. **统一状态机**：每个后端各自维护一份 [`BackendState`]，
//!    未就绪的后端拒绝请求
//! 3. **资源独占**：后端句柄由上层编排器独占持有，不使用全局单例

pub mod explanation;
pub mod grammar;

pub use explanation::ExplanationBackend;
pub use grammar::GrammarCheckBackend;

use std::fmt;

/// 后端种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// 规则语法检查（LanguageTool）
    Grammar,
    /// 生成式讲解（LLM）
    Explanation,
}

impl BackendKind {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Grammar => "语法检查",
            BackendKind::Explanation => "生成式讲解",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 后端生命周期状态
///
/// 状态迁移：
///
/// ```text
/// Uninitialized → Initializing → Ready ──┐
///                      │                 ├──→ CleanedUp ──→ (可重新初始化)
///                      └───→ Failed ─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    /// 尚未初始化
    Uninitialized,
    /// 初始化进行中（模型加载可能耗时数分钟）
    Initializing,
    /// 就绪，可接受分析请求
    Ready,
    /// 初始化失败
    Failed,
    /// 资源已释放
    CleanedUp,
}

impl BackendState {
    /// 是否可以接受分析请求
    pub fn is_ready(self) -> bool {
        matches!(self, BackendState::Ready)
    }

    /// 是否允许发起（重新）初始化
    ///
    /// Ready 状态下重复初始化是无操作；Initializing 状态下不允许再次发起
    pub fn can_initialize(self) -> bool {
        matches!(
            self,
            BackendState::Uninitialized | BackendState::Failed | BackendState::CleanedUp
        )
    }

    /// 获取状态名称
    pub fn name(self) -> &'static str {
        match self {
            BackendState::Uninitialized => "未初始化",
            BackendState::Initializing => "初始化中",
            BackendState::Ready => "就绪",
            BackendState::Failed => "失败",
            BackendState::CleanedUp => "已清理",
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_ready() {
        assert!(BackendState::Ready.is_ready());
        assert!(!BackendState::Uninitialized.is_ready());
        assert!(!BackendState::Initializing.is_ready());
        assert!(!BackendState::Failed.is_ready());
        assert!(!BackendState::CleanedUp.is_ready());
    }

    #[test]
    fn test_state_can_initialize() {
        // 清理后和失败后都允许重新初始化
        assert!(BackendState::Uninitialized.can_initialize());
        assert!(BackendState::Failed.can_initialize());
        assert!(BackendState::CleanedUp.can_initialize());
        // 就绪时重复初始化走无操作分支，初始化中不允许再次发起
        assert!(!BackendState::Ready.can_initialize());
        assert!(!BackendState::Initializing.can_initialize());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(BackendKind::Grammar.to_string(), "语法检查");
        assert_eq!(BackendKind::Explanation.to_string(), "生成式讲解");
    }
}
