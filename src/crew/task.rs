//! 任务序列：有序的（角色, 任务模板）列表
//!
//! 模板在会话开始时用学生档案渲染一次；任务之间不传递输出。
//! 增加新角色只需追加一个 TaskTemplate，不改控制流。

use std::sync::Arc;

use crate::core::TutorError;
use crate::crew::{AgentPersona, PersonaKind, Roster};
use crate::profile::StudentProfile;

/// 计划中的一步：由哪个角色执行、任务名、描述模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTemplate {
    pub persona: PersonaKind,
    pub name: String,
    pub template: String,
}

impl TaskTemplate {
    pub fn new(persona: PersonaKind, name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            persona,
            name: name.into(),
            template: template.into(),
        }
    }
}

/// 渲染后的任务，绑定唯一角色
#[derive(Debug, Clone)]
pub struct TeachingTask {
    pub name: String,
    pub description: String,
    pub persona: Arc<AgentPersona>,
}

const LEARNING_STYLE_TEMPLATE: &str = "Analyze the student's learning style and preferences:
{learning_style}
Create a personalized learning plan.";

const SUBJECT_MATERIAL_TEMPLATE: &str = "Based on the learning plan, prepare comprehensive \
teaching materials for the topic: {topic}";

const PROGRESS_FEEDBACK_TEMPLATE: &str = "Monitor the student's progress and provide \
detailed feedback for improvement.";

#[derive(Debug, Clone)]
pub struct TaskPlan {
    steps: Vec<TaskTemplate>,
}

impl TaskPlan {
    pub fn new(steps: Vec<TaskTemplate>) -> Result<Self, TutorError> {
        if steps.is_empty() {
            return Err(TutorError::Config("task plan has no steps".to_string()));
        }
        Ok(Self { steps })
    }

    /// 标准计划：学习风格分析 → 学科材料准备 → 进度反馈
    pub fn standard() -> Self {
        Self {
            steps: vec![
                TaskTemplate::new(
                    PersonaKind::LearningStyleAnalyzer,
                    "learning_style_analysis",
                    LEARNING_STYLE_TEMPLATE,
                ),
                TaskTemplate::new(
                    PersonaKind::SubjectExpert,
                    "subject_material",
                    SUBJECT_MATERIAL_TEMPLATE,
                ),
                TaskTemplate::new(
                    PersonaKind::ProgressTracker,
                    "progress_feedback",
                    PROGRESS_FEEDBACK_TEMPLATE,
                ),
            ],
        }
    }

    pub fn with_step(mut self, step: TaskTemplate) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[TaskTemplate] {
        &self.steps
    }

    /// 按计划顺序渲染任务；计划引用的角色不在名册中时报错
    pub fn sequence(
        &self,
        roster: &Roster,
        profile: &StudentProfile,
    ) -> Result<Vec<TeachingTask>, TutorError> {
        self.steps
            .iter()
            .map(|step| {
                let persona = roster
                    .get(step.persona)
                    .ok_or_else(|| TutorError::MissingPersona(step.persona.to_string()))?;
                Ok(TeachingTask {
                    name: step.name.clone(),
                    description: render_template(&step.template, profile),
                    persona,
                })
            })
            .collect()
    }
}

impl Default for TaskPlan {
    fn default() -> Self {
        Self::standard()
    }
}

/// 单遍替换 `{key}` 占位符：未知占位符原样保留，代入的值不会再次展开
pub fn render_template(template: &str, profile: &StudentProfile) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match profile.field(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> StudentProfile {
        StudentProfile::new("Ada", "Photosynthesis").with_learning_style("visual")
    }

    #[test]
    fn test_standard_sequence_binding_order() {
        let tasks = TaskPlan::standard()
            .sequence(&Roster::standard(), &profile())
            .unwrap();
        let kinds: Vec<PersonaKind> = tasks.iter().map(|t| t.persona.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PersonaKind::LearningStyleAnalyzer,
                PersonaKind::SubjectExpert,
                PersonaKind::ProgressTracker,
            ]
        );
    }

    #[test]
    fn test_descriptions_interpolate_profile() {
        let tasks = TaskPlan::standard()
            .sequence(&Roster::standard(), &profile())
            .unwrap();
        assert!(tasks[0].description.contains("visual"));
        assert!(tasks[1]
            .description
            .ends_with("teaching materials for the topic: Photosynthesis"));
        assert_eq!(tasks[2].description, PROGRESS_FEEDBACK_TEMPLATE);
    }

    #[test]
    fn test_feedback_task_is_profile_invariant() {
        let plan = TaskPlan::standard();
        let roster = Roster::standard();
        let a = plan.sequence(&roster, &profile()).unwrap();
        let other = StudentProfile::new("Lin", "Calculus")
            .with_learning_style("auditory")
            .with_goals("pass the exam")
            .with_documents(vec!["notes".to_string()]);
        let b = plan.sequence(&roster, &other).unwrap();
        assert_eq!(a[2].description, b[2].description);
        assert_ne!(a[0].description, b[0].description);
    }

    #[test]
    fn test_missing_persona_is_error() {
        let roster = Roster::from(vec![AgentPersona::subject_expert()]);
        let err = TaskPlan::standard().sequence(&roster, &profile()).unwrap_err();
        assert!(matches!(err, TutorError::MissingPersona(ref k) if k == "learning_style_analyzer"));
    }

    #[test]
    fn test_extra_step_needs_no_control_flow_change() {
        let plan = TaskPlan::standard().with_step(TaskTemplate::new(
            PersonaKind::SubjectExpert,
            "quiz",
            "Write a short quiz for {name} on {topic}.",
        ));
        let tasks = plan.sequence(&Roster::standard(), &profile()).unwrap();
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[3].description, "Write a short quiz for Ada on Photosynthesis.");
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert!(TaskPlan::new(vec![]).is_err());
    }

    #[test]
    fn test_render_is_single_pass() {
        let p = StudentProfile::new("{topic}", "Optics");
        assert_eq!(render_template("{name} / {topic}", &p), "{topic} / Optics");
        assert_eq!(render_template("{unknown} {topic", &p), "{unknown} {topic");
        assert_eq!(render_template("no placeholders", &p), "no placeholders");
    }
}
