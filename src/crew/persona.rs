//! 角色名册：三个固定的教学角色（学科专家、学习风格分析师、进度追踪者）
//!
//! 角色只是配置数据，无内部状态；任何角色都不允许把工作委派给其他角色。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonaKind {
    SubjectExpert,
    LearningStyleAnalyzer,
    ProgressTracker,
}

impl fmt::Display for PersonaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersonaKind::SubjectExpert => "subject_expert",
            PersonaKind::LearningStyleAnalyzer => "learning_style_analyzer",
            PersonaKind::ProgressTracker => "progress_tracker",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPersona {
    pub kind: PersonaKind,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// 为 true 时执行器以 info 级别输出该角色的完整回复
    pub verbose: bool,
    pub allow_delegation: bool,
}

impl AgentPersona {
    fn fixed(kind: PersonaKind, role: &str, goal: &str, backstory: &str) -> Self {
        Self {
            kind,
            role: role.to_string(),
            goal: goal.to_string(),
            backstory: backstory.to_string(),
            verbose: true,
            allow_delegation: false,
        }
    }

    pub fn subject_expert() -> Self {
        Self::fixed(
            PersonaKind::SubjectExpert,
            "Subject Matter Expert",
            "Provide accurate and comprehensive knowledge about the subject",
            "You are an expert in your field with years of teaching experience. \
             You excel at breaking down complex concepts into understandable parts.",
        )
    }

    pub fn learning_style_analyzer() -> Self {
        Self::fixed(
            PersonaKind::LearningStyleAnalyzer,
            "Learning Style Analyzer",
            "Analyze and adapt teaching methods based on student learning style",
            "You specialize in understanding different learning styles \
             and adapting teaching methods accordingly.",
        )
    }

    pub fn progress_tracker() -> Self {
        Self::fixed(
            PersonaKind::ProgressTracker,
            "Progress Tracker",
            "Monitor and evaluate student progress",
            "You are responsible for tracking student progress \
             and providing feedback for improvement.",
        )
    }

    /// 作为 system 消息的角色设定
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}.\n{}\n\nYour personal goal is: {}\n\
             Work on the task yourself; you cannot delegate it to other agents.",
            self.role, self.backstory, self.goal
        )
    }
}

/// 会话内的角色名册，顺序固定
#[derive(Debug, Clone)]
pub struct Roster {
    personas: Vec<Arc<AgentPersona>>,
}

impl Roster {
    /// 标准名册：学科专家、学习风格分析师、进度追踪者
    pub fn standard() -> Self {
        Self {
            personas: vec![
                Arc::new(AgentPersona::subject_expert()),
                Arc::new(AgentPersona::learning_style_analyzer()),
                Arc::new(AgentPersona::progress_tracker()),
            ],
        }
    }

    pub fn get(&self, kind: PersonaKind) -> Option<Arc<AgentPersona>> {
        self.personas.iter().find(|p| p.kind == kind).cloned()
    }

    pub fn personas(&self) -> &[Arc<AgentPersona>] {
        &self.personas
    }
}

impl From<Vec<AgentPersona>> for Roster {
    fn from(personas: Vec<AgentPersona>) -> Self {
        Self {
            personas: personas.into_iter().map(Arc::new).collect(),
        }
    }
}
