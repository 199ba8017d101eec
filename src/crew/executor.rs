//! 任务执行器
//!
//! TaskExecutor 把一个任务交给其绑定的角色完成，返回原始文本输出。
//! LlmTaskExecutor 为每个任务构造一轮 system（角色设定）+ user（任务描述）消息并调用 LLM。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::TutorError;
use crate::crew::TeachingTask;
use crate::llm::LlmClient;
use crate::memory::Message;

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// 执行单个任务；`reference` 为可选的检索参考资料
    async fn execute(
        &self,
        task: &TeachingTask,
        reference: Option<&str>,
    ) -> Result<String, TutorError>;

    /// 累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

pub struct LlmTaskExecutor {
    llm: Arc<dyn LlmClient>,
}

impl LlmTaskExecutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 组装发送给 LLM 的消息；有参考资料时放在任务描述之前
    pub fn build_messages(task: &TeachingTask, reference: Option<&str>) -> Vec<Message> {
        let mut user = String::new();
        if let Some(reference) = reference {
            user.push_str(reference);
            user.push_str("\n\n");
        }
        user.push_str("Current Task: ");
        user.push_str(&task.description);
        user.push_str("\n\nGive your complete final answer to the task.");

        vec![
            Message::system(task.persona.system_prompt()),
            Message::user(user),
        ]
    }
}

#[async_trait]
impl TaskExecutor for LlmTaskExecutor {
    async fn execute(
        &self,
        task: &TeachingTask,
        reference: Option<&str>,
    ) -> Result<String, TutorError> {
        let messages = Self::build_messages(task, reference);
        let output = self
            .llm
            .complete(&messages)
            .await
            .map_err(TutorError::Llm)?;

        if task.persona.verbose {
            tracing::info!("[{}] {}:\n{}", task.persona.role, task.name, output);
        } else {
            tracing::debug!("[{}] {} finished", task.persona.role, task.name);
        }
        Ok(output)
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }
}
