//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 回显 system 消息首行（角色）与 user 消息首行（任务），便于本地跑通整个教学会话。

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// Mock 客户端：按「角色: 任务首行」格式回显
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let first_line = |role: Role| {
            messages
                .iter()
                .rev()
                .find(|m| m.role == role)
                .and_then(|m| m.content.lines().find(|l| !l.trim().is_empty()))
                .map(str::trim)
        };

        let persona = first_line(Role::System).unwrap_or("(no persona)");
        let task = first_line(Role::User).unwrap_or("(no input)");

        Ok(format!("[Mock] {} -> {}", persona, task))
    }
}
