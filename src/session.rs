//! 教学会话运行器
//!
//! 流程：（可选）参考文档索引 → 角色名册 → 任务序列 → 逐个顺序执行 → 返回最后一个任务的输出。
//! 所有依赖（嵌入、执行器、持久化）由调用方构造后注入。
//! 配置了索引缓存时，相同文档集合直接复用已保存的索引，SQLite 读写放在阻塞线程池中执行。
//! 任一环节失败都直接返回错误，不重试、不返回部分结果。

use std::fmt;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::TutorError;
use crate::crew::{Roster, TaskExecutor, TaskPlan};
use crate::llm::EmbeddingProvider;
use crate::memory::{index_key, ChunkingConfig, DocumentIndexer, IndexStore, SimilarityIndex};
use crate::profile::StudentProfile;

/// 单个任务的输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutput {
    pub task: String,
    pub role: String,
    pub output: String,
}

/// 会话结果：final_output 即最后一个任务的输出
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub session_id: String,
    pub final_output: String,
    /// 按执行顺序排列的各任务输出
    pub tasks_output: Vec<TaskOutput>,
    /// 本次会话建立的索引块数；未提供参考文档时为 None
    pub indexed_chunks: Option<usize>,
    /// 索引是否取自缓存（未重新嵌入）
    pub index_reused: bool,
}

impl fmt::Display for SessionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.final_output)
    }
}

pub struct SessionRunner {
    indexer: DocumentIndexer,
    executor: Arc<dyn TaskExecutor>,
    plan: TaskPlan,
    store: Option<Arc<IndexStore>>,
    retrieval_top_k: usize,
}

impl SessionRunner {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            indexer: DocumentIndexer::new(embedder),
            executor,
            plan: TaskPlan::standard(),
            store: None,
            retrieval_top_k: 0,
        }
    }

    /// 按配置组装：分块参数、检索 top_k、持久化目录
    pub fn from_config(
        cfg: &AppConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Self, TutorError> {
        let chunking = ChunkingConfig::new(cfg.indexer.chunk_size, cfg.indexer.chunk_overlap)?;
        let mut runner = Self::new(embedder, executor)
            .with_chunking_config(chunking)
            .with_retrieval_top_k(cfg.retrieval.top_k);
        if let Some(dir) = cfg.persist_directory() {
            tracing::info!("Persisting document index under {}", dir.display());
            let store = IndexStore::open(&dir)?.with_max_indexes(cfg.store.max_indexes);
            runner = runner.with_store(store);
        }
        Ok(runner)
    }

    pub fn with_chunking_config(mut self, config: ChunkingConfig) -> Self {
        self.indexer = self.indexer.with_chunking_config(config);
        self
    }

    pub fn with_plan(mut self, plan: TaskPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_store(mut self, store: IndexStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// 每个任务注入的参考片段数；0 表示只建索引不做检索增强
    pub fn with_retrieval_top_k(mut self, k: usize) -> Self {
        self.retrieval_top_k = k;
        self
    }

    pub async fn run(&self, profile: &StudentProfile) -> Result<SessionResult, TutorError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            "Starting teaching session {} for {} on {:?}",
            session_id,
            profile.name,
            profile.topic
        );

        let (index, index_reused) = if profile.has_documents() {
            let (index, reused) = self.load_or_build_index(&profile.documents).await?;
            (Some(index), reused)
        } else {
            tracing::info!("No reference documents supplied, skipping indexing");
            (None, false)
        };

        let roster = Roster::standard();
        let tasks = self.plan.sequence(&roster, profile)?;

        let mut tasks_output = Vec::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            tracing::info!(
                "Task {}/{} [{}] -> {}",
                i + 1,
                tasks.len(),
                task.name,
                task.persona.role
            );

            let reference = match &index {
                Some(index) if self.retrieval_top_k > 0 => {
                    index
                        .build_context(&task.description, self.retrieval_top_k)
                        .await?
                }
                _ => None,
            };

            let output = self.executor.execute(task, reference.as_deref()).await?;
            tasks_output.push(TaskOutput {
                task: task.name.clone(),
                role: task.persona.role.clone(),
                output,
            });
        }

        let final_output = tasks_output
            .last()
            .map(|t| t.output.clone())
            .unwrap_or_default();

        let (prompt, completion, total) = self.executor.token_usage();
        tracing::info!(
            "Session {} finished: {} tasks, tokens prompt={} completion={} total={}",
            session_id,
            tasks_output.len(),
            prompt,
            completion,
            total
        );

        Ok(SessionResult {
            session_id,
            final_output,
            tasks_output,
            indexed_chunks: index.as_ref().map(|i| i.len()),
            index_reused,
        })
    }

    /// 有缓存命中则直接恢复索引，否则嵌入建索引并写回缓存
    async fn load_or_build_index(
        &self,
        documents: &[String],
    ) -> Result<(SimilarityIndex, bool), TutorError> {
        let Some(store) = &self.store else {
            return Ok((self.indexer.build(documents).await?, false));
        };

        let embedder = self.indexer.embedder();
        let model = embedder.model_name().to_string();
        let key = index_key(&model, self.indexer.chunking(), documents);

        let cached = {
            let store = Arc::clone(store);
            let key = key.clone();
            tokio::task::spawn_blocking(move || store.load(&key, embedder))
                .await
                .map_err(|e| TutorError::Store(format!("index load task failed: {}", e)))??
        };
        if let Some(index) = cached {
            tracing::info!("Reusing cached index {} ({} chunks)", key, index.len());
            return Ok((index, true));
        }

        let index = self.indexer.build(documents).await?;
        let store = Arc::clone(store);
        let index = tokio::task::spawn_blocking(move || {
            store.save(&key, &index, &model).map(|_| index)
        })
        .await
        .map_err(|e| TutorError::Store(format!("index save task failed: {}", e)))??;
        Ok((index, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::TeachingTask;
    use crate::llm::HashingEmbedder;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 记录收到的任务与参考资料，按「任务名#序号」回复
    #[derive(Default)]
    struct ScriptedExecutor {
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl TaskExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            task: &TeachingTask,
            reference: Option<&str>,
        ) -> Result<String, TutorError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((task.description.clone(), reference.map(String::from)));
            Ok(format!("{}#{}", task.name, calls.len()))
        }
    }

    #[tokio::test]
    async fn test_outputs_in_plan_order() {
        let executor = Arc::new(ScriptedExecutor::default());
        let runner = SessionRunner::new(Arc::new(HashingEmbedder::default()), executor.clone());
        let result = runner
            .run(&StudentProfile::new("Ada", "Optics").with_learning_style("visual"))
            .await
            .unwrap();

        let outputs: Vec<&str> = result.tasks_output.iter().map(|t| t.output.as_str()).collect();
        assert_eq!(
            outputs,
            vec![
                "learning_style_analysis#1",
                "subject_material#2",
                "progress_feedback#3"
            ]
        );
        assert_eq!(result.final_output, "progress_feedback#3");
        assert_eq!(result.to_string(), "progress_feedback#3");
        assert!(result.indexed_chunks.is_none());
    }

    #[tokio::test]
    async fn test_reference_material_only_with_top_k() {
        let profile = StudentProfile::new("Ada", "Photosynthesis")
            .with_learning_style("visual")
            .with_documents(vec!["Photosynthesis happens in the chloroplast of plant cells.".to_string()]);

        let executor = Arc::new(ScriptedExecutor::default());
        let runner = SessionRunner::new(Arc::new(HashingEmbedder::default()), executor.clone())
            .with_retrieval_top_k(2);
        let result = runner.run(&profile).await.unwrap();
        assert_eq!(result.indexed_chunks, Some(1));
        {
            let calls = executor.calls.lock().unwrap();
            // 第二个任务描述含 Photosynthesis，必然检索到参考资料
            assert!(calls[1].1.as_deref().unwrap().contains("chloroplast"));
        }

        let plain = Arc::new(ScriptedExecutor::default());
        SessionRunner::new(Arc::new(HashingEmbedder::default()), plain.clone())
            .run(&profile)
            .await
            .unwrap();
        assert!(plain.calls.lock().unwrap().iter().all(|(_, r)| r.is_none()));
    }

    #[tokio::test]
    async fn test_index_persisted_under_content_key() {
        let dir = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
        let runner = SessionRunner::new(Arc::clone(&embedder), Arc::new(ScriptedExecutor::default()))
            .with_store(IndexStore::open(dir.path()).unwrap());

        let documents = vec!["Light bends when entering glass.".to_string()];
        let profile = StudentProfile::new("Ada", "Optics").with_documents(documents.clone());
        let result = runner.run(&profile).await.unwrap();
        assert!(!result.index_reused);

        let key = index_key("local-hashing", ChunkingConfig::default(), &documents);
        let store = IndexStore::open(dir.path()).unwrap();
        assert_eq!(store.keys().unwrap(), vec![key.clone()]);
        assert_eq!(store.load(&key, embedder).unwrap().unwrap().len(), 1);

        let again = runner.run(&profile).await.unwrap();
        assert!(again.index_reused);
        assert_eq!(again.indexed_chunks, Some(1));
    }

    #[test]
    fn test_from_config_rejects_bad_chunking() {
        let mut cfg = AppConfig::default();
        cfg.indexer.chunk_overlap = cfg.indexer.chunk_size;
        let result = SessionRunner::from_config(
            &cfg,
            Arc::new(HashingEmbedder::default()),
            Arc::new(ScriptedExecutor::default()),
        );
        assert!(matches!(result, Err(TutorError::Config(_))));
    }
}
