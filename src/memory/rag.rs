//! 参考文档索引（检索增强）
//!
//! 提供文档分块、向量化存储与相似度检索。
//! 分块为固定窗口：逐字符从左到右切分，相邻块按配置重叠，不感知段落或句子边界。

use std::sync::Arc;

use crate::core::TutorError;
use crate::llm::EmbeddingProvider;

/// 文档块
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 块 ID（`<source_id>_<序号>`）
    pub id: String,
    /// 原始文本
    pub text: String,
    /// 来源文档 ID
    pub source_id: String,
    /// 在原文档中的位置（字符偏移）
    pub offset: usize,
}

impl Chunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_id: source_id.into(),
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// 分块策略：块大小与相邻块重叠（均为字符数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkingConfig {
    /// 要求 `chunk_size > 0` 且 `chunk_overlap < chunk_size`，否则窗口无法前进
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, TutorError> {
        if chunk_size == 0 {
            return Err(TutorError::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(TutorError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// 文档分块器
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// 将文档切成固定窗口（UTF-8 安全）；第 i+1 块从第 i 块起点后 `size - overlap` 个字符开始
    pub fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let step = self.config.chunk_size - self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let end = (start + self.config.chunk_size).min(total);
            let chunk_text: String = chars[start..end].iter().collect();
            chunks.push(
                Chunk::new(format!("{}_{}", doc_id, chunks.len()), chunk_text, doc_id)
                    .with_offset(start),
            );
            if end == total {
                break;
            }
            start += step;
        }
        chunks
    }
}

/// 检索结果
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    /// 余弦相似度
    pub score: f32,
}

/// 内存向量索引：(chunk, embedding) 列表，查询时线性扫描
pub struct SimilarityIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for SimilarityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityIndex")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl SimilarityIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            entries: Vec::new(),
            embedder,
        }
    }

    /// 插入一条已编码的块；向量为空或维度与已有条目不一致时报错
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<(), TutorError> {
        if embedding.is_empty() {
            return Err(TutorError::Embedding(format!(
                "empty embedding for chunk {}",
                chunk.id
            )));
        }
        if let Some(dim) = self.dimension() {
            if dim != embedding.len() {
                return Err(TutorError::Index(format!(
                    "dimension mismatch for chunk {}: expected {}, got {}",
                    chunk.id,
                    dim,
                    embedding.len()
                )));
            }
        }
        self.entries.push((chunk, embedding));
        Ok(())
    }

    /// 检索最相关的 k 个块（仅保留正相似度）
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>, TutorError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(TutorError::Embedding)?;
        Ok(self.search_by_vector(&query_embedding, k))
    }

    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Vec<RetrievalResult> {
        let mut scored: Vec<(f32, &Chunk)> = self
            .entries
            .iter()
            .map(|(chunk, emb)| (cosine_similarity(query, emb), chunk))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(score, chunk)| RetrievalResult {
                chunk: chunk.clone(),
                score,
            })
            .collect()
    }

    /// 把检索结果整理成可直接拼进提示的参考资料段落；无结果时返回 None
    pub async fn build_context(&self, query: &str, k: usize) -> Result<Option<String>, TutorError> {
        let results = self.search(query, k).await?;
        if results.is_empty() {
            return Ok(None);
        }

        let mut context = String::from("Relevant reference material:\n\n");
        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[Reference {}] (source: {}, relevance: {:.2})\n{}\n\n",
                i + 1,
                result.chunk.source_id,
                result.score,
                result.chunk.text.trim()
            ));
        }
        Ok(Some(context.trim_end().to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Chunk, &[f32])> {
        self.entries.iter().map(|(c, e)| (c, e.as_slice()))
    }

    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|(_, e)| e.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 余弦相似度
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// 文档索引器：分块 → 批量嵌入 → 写入内存索引
pub struct DocumentIndexer {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl DocumentIndexer {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            chunker: Chunker::default(),
            embedder,
        }
    }

    pub fn with_chunking_config(mut self, config: ChunkingConfig) -> Self {
        self.chunker = Chunker::new(config);
        self
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(&self.embedder)
    }

    pub fn chunking(&self) -> ChunkingConfig {
        self.chunker.config()
    }

    /// 为全部文档建立索引；文档 i 的来源 ID 为 `doc-i`，纯空白块不参与嵌入
    pub async fn build(&self, documents: &[String]) -> Result<SimilarityIndex, TutorError> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .enumerate()
            .flat_map(|(i, doc)| self.chunker.chunk(&format!("doc-{}", i), doc))
            .filter(|c| !c.text.trim().is_empty())
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(TutorError::Embedding)?;
        if embeddings.len() != chunks.len() {
            return Err(TutorError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut index = SimilarityIndex::new(Arc::clone(&self.embedder));
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            index.insert(chunk, embedding)?;
        }

        tracing::info!(
            "Indexed {} documents into {} chunks ({})",
            documents.len(),
            index.len(),
            self.embedder.model_name()
        );
        Ok(index)
    }
}
