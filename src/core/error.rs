//! 教学会话错误类型
//!
//! 会话层不做重试或恢复：索引、嵌入、LLM 调用的失败原样向上传播，终止本次会话。

use thiserror::Error;

/// 会话运行过程中可能出现的错误（配置、嵌入、索引、LLM、持久化）
#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Store error: {0}")]
    Store(String),

    /// 任务计划引用了名册中不存在的角色
    #[error("No persona for {0} in roster")]
    MissingPersona(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for TutorError {
    fn from(e: rusqlite::Error) -> Self {
        TutorError::Store(e.to_string())
    }
}
