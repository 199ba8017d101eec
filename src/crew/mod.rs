//! 教学团队：角色名册、任务序列与任务执行器

pub mod executor;
pub mod persona;
pub mod task;

pub use executor::{LlmTaskExecutor, TaskExecutor};
pub use persona::{AgentPersona, PersonaKind, Roster};
pub use task::{render_template, TaskPlan, TaskTemplate, TeachingTask};
