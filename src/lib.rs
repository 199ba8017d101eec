//! Tutor - Rust 个性化教学智能体
//!
//! 模块划分：
//! - **cli**: 控制台交互（收集学生档案、读取参考文档目录）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **crew**: 角色名册、任务序列、任务执行器
//! - **llm**: LLM 客户端与嵌入提供方（OpenAI 兼容 / DeepSeek / Mock / 本地哈希）
//! - **memory**: 消息、参考文档分块与向量索引、索引持久化
//! - **observability**: 日志
//! - **profile**: 学生档案
//! - **session**: 教学会话运行器

pub mod cli;
pub mod config;
pub mod core;
pub mod crew;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod profile;
pub mod session;

pub use crate::core::TutorError;
pub use profile::StudentProfile;
pub use session::{SessionResult, SessionRunner, TaskOutput};
