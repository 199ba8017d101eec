//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TUTOR__*` 覆盖（双下划线表示嵌套，如 `TUTOR__LLM__PROVIDER=openai`）。
//! 向量索引持久化目录另外兼容 `CHROMA_DB_DIRECTORY`。

use std::path::PathBuf;

use serde::Deserialize;

/// 持久化目录的环境变量（配置文件未设置时生效）
pub const PERSIST_DIRECTORY_ENV: &str = "CHROMA_DB_DIRECTORY";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub embedding: EmbeddingSection,
    pub indexer: IndexerSection,
    pub retrieval: RetrievalSection,
    pub store: StoreSection,
}

/// [app] 段：参考文档目录
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    /// 该目录下的 .txt / .md 文件作为参考文档参与索引
    pub documents_dir: Option<PathBuf>,
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / deepseek / mock；缺少对应 API Key 时报错，mock 只能显式指定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub deepseek: LlmDeepSeekSection,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

/// [embedding] 段：嵌入模型与端点（与 LLM 共用 OPENAI_API_KEY）
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSection {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            base_url: None,
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// [indexer] 段：分块大小与重叠（字符数）
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerSection {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for IndexerSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

/// [retrieval] 段：每个任务注入的参考片段数，0 表示不做检索增强
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSection {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

/// [store] 段：向量索引缓存目录；未设置时不持久化
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    pub persist_directory: Option<PathBuf>,
    /// 最多保留的索引数，超出后淘汰最早写入的
    #[serde(default = "default_max_indexes")]
    pub max_indexes: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            persist_directory: None,
            max_indexes: default_max_indexes(),
        }
    }
}

fn default_max_indexes() -> usize {
    crate::memory::store::DEFAULT_MAX_INDEXES
}

impl AppConfig {
    /// 持久化目录：配置优先，其次 `CHROMA_DB_DIRECTORY`
    pub fn persist_directory(&self) -> Option<PathBuf> {
        self.store.persist_directory.clone().or_else(|| {
            std::env::var(PERSIST_DIRECTORY_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
    }
}

/// 从 config 目录加载配置，环境变量 TUTOR__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TUTOR__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TUTOR")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.indexer.chunk_size, 1000);
        assert_eq!(cfg.indexer.chunk_overlap, 200);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert!(cfg.store.persist_directory.is_none());
        assert_eq!(cfg.store.max_indexes, 20);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutor.toml");
        std::fs::write(
            &path,
            r#"
[indexer]
chunk_size = 400
chunk_overlap = 40

[store]
persist_directory = "/tmp/tutor-index"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.indexer.chunk_size, 400);
        assert_eq!(cfg.indexer.chunk_overlap, 40);
        assert_eq!(
            cfg.persist_directory(),
            Some(PathBuf::from("/tmp/tutor-index"))
        );
        assert_eq!(cfg.store.max_indexes, 20);
    }

    #[test]
    fn test_invalid_value_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tutor.toml");
        std::fs::write(&path, "[indexer]\nchunk_size = \"lots\"\n").unwrap();

        assert!(load_config(Some(path)).is_err());
    }
}
