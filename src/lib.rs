//! # German Analyzer
//!
//! 一个面向德语学习的文本分析 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 模型层（Models）
//! - `models/` - 值类型与配置档案
//! - `ConfigurationProfile` - 不可变的初始化设置包
//! - `GrammarIssue` / `AnalysisReport` - 分析结果值类型
//!
//! ### ② 业务能力层（Backends）
//! - `backends/` - 描述"我能做什么"，只处理单次请求
//! - `GrammarCheckBackend` - LanguageTool 规则检查能力
//! - `ExplanationBackend` - LLM 生成式讲解能力
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/analyzer` - 后端生命周期管理与结果合并
//! - `orchestrator/session_builder` - 学习会话构建，容忍部分失败
//!
//! ### ④ 交互层（App）
//! - `app` - 命令循环，把用户命令映射到编排器操作
//!
//! ## 模块结构

pub mod app;
pub mod backends;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use backends::{BackendKind, BackendState, ExplanationBackend, GrammarCheckBackend};
pub use config::Config;
pub use error::{AppError, Result};
pub use models::{AnalysisReport, ConfigurationProfile, GrammarIssue, ProfileRegistry};
pub use orchestrator::{AnalysisOrchestrator, OrchestratorStatus};
