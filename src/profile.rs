//! 学生档案：会话开始时从用户输入收集，之后只读

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentProfile {
    pub name: String,
    pub topic: String,
    /// 学习风格描述（visual / auditory / reading / writing 等自由文本）
    pub learning_style: String,
    pub prior_knowledge: String,
    pub goals: String,
    /// 参考文档全文；为空时跳过索引
    pub documents: Vec<String>,
}

impl StudentProfile {
    pub fn new(name: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn with_learning_style(mut self, style: impl Into<String>) -> Self {
        self.learning_style = style.into();
        self
    }

    pub fn with_prior_knowledge(mut self, prior: impl Into<String>) -> Self {
        self.prior_knowledge = prior.into();
        self
    }

    pub fn with_goals(mut self, goals: impl Into<String>) -> Self {
        self.goals = goals.into();
        self
    }

    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.documents = documents;
        self
    }

    pub fn has_documents(&self) -> bool {
        !self.documents.is_empty()
    }

    /// 模板占位符取值：{name} {topic} {learning_style} {prior_knowledge} {goals}
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(&self.name),
            "topic" => Some(&self.topic),
            "learning_style" => Some(&self.learning_style),
            "prior_knowledge" => Some(&self.prior_knowledge),
            "goals" => Some(&self.goals),
            _ => None,
        }
    }
}
