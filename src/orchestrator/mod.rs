//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责后端生命周期管理和结果合并，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `analyzer` - 分析编排器
//! - 管理两个后端的生命周期（初始化、状态跟踪、清理）
//! - 提供统一操作（快速检查、综合分析、纠错、主题讲解）
//! - 把各后端的输出合并为统一报告
//! - 独占持有后端句柄
//!
//! ### `session_builder` - 学习会话构建器
//! - 遍历会话的所有主题（Vec<String>）
//! - 每个主题生成讲解 + 例句 + 练习
//! - 单个主题失败只记录在对应小节，不中断整个会话
//! - 生成覆盖全部主题的综合练习
//!
//! ## 层次关系
//!
//! ```text
//! app (命令循环)
//!     ↓
//! orchestrator::analyzer (统一操作和生命周期)
//!     ↓
//! orchestrator::session_builder (处理 Vec<Topic>)
//!     ↓
//! backends (能力层：grammar / explanation)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一会话**：一个编排器服务一个交互会话，不跨会话共享可变状态
//! 2. **资源隔离**：只有编排层持有后端句柄，绝不使用进程级单例
//! 3. **快速失败**：后端未就绪的请求立即返回错误，不做静默排队
//! 4. **无静默吞错**：部分失败只出现在定义为尽力而为的操作（学习会话）中

pub mod analyzer;
pub mod session_builder;

// 重新导出主要类型
pub use analyzer::{AnalysisOrchestrator, OrchestratorStatus};
