//! 向量索引缓存（SQLite）
//!
//! 以「嵌入模型 + 分块参数 + 文档全文」的 SHA-256 作为键，把建好的 SimilarityIndex 写入
//! `<persist_directory>/index.sqlite3`。同一组文档再次出现时直接恢复索引，不再调用嵌入接口。
//! 超过 `max_indexes` 个键时按写入顺序淘汰最旧的索引。嵌入向量以 JSON 数组存储。

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};

use crate::core::TutorError;
use crate::llm::EmbeddingProvider;
use crate::memory::{Chunk, ChunkingConfig, SimilarityIndex};

pub const INDEX_DB_FILE: &str = "index.sqlite3";

pub const DEFAULT_MAX_INDEXES: usize = 20;

/// 计算索引键；任一输入变化都会得到不同的键
pub fn index_key(embedding_model: &str, chunking: ChunkingConfig, documents: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(embedding_model.as_bytes());
    hasher.update(b"|");
    hasher.update((chunking.chunk_size() as u64).to_le_bytes());
    hasher.update((chunking.chunk_overlap() as u64).to_le_bytes());
    for doc in documents {
        // 长度前缀避免 ["ab", "c"] 与 ["a", "bc"] 冲突
        hasher.update((doc.len() as u64).to_le_bytes());
        hasher.update(doc.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub struct IndexStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    max_indexes: usize,
}

impl IndexStore {
    /// 在目录下打开（或创建）索引数据库；目录不存在时自动创建
    pub fn open(persist_directory: impl AsRef<Path>) -> Result<Self, TutorError> {
        let dir = persist_directory.as_ref();
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(INDEX_DB_FILE);

        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            max_indexes: DEFAULT_MAX_INDEXES,
        })
    }

    /// 最多保留的索引数（至少 1）
    pub fn with_max_indexes(mut self, max_indexes: usize) -> Self {
        self.max_indexes = max_indexes.max(1);
        self
    }

    fn init_schema(conn: &Connection) -> Result<(), TutorError> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS index_chunks (
                index_key TEXT NOT NULL,
                position INTEGER NOT NULL,
                chunk_id TEXT NOT NULL,
                source_id TEXT NOT NULL,
                char_offset INTEGER NOT NULL,
                text TEXT NOT NULL,
                embedding TEXT NOT NULL,
                embedding_model TEXT NOT NULL,
                saved_at TEXT NOT NULL,
                PRIMARY KEY (index_key, position)
            );
            ",
        )?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, TutorError> {
        self.conn
            .lock()
            .map_err(|_| TutorError::Store("index store lock poisoned".to_string()))
    }

    /// 保存索引（覆盖同键旧数据），随后淘汰超出上限的旧索引；返回写入条数
    pub fn save(
        &self,
        key: &str,
        index: &SimilarityIndex,
        embedding_model: &str,
    ) -> Result<usize, TutorError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM index_chunks WHERE index_key = ?1", params![key])?;

        let saved_at = chrono::Utc::now().to_rfc3339();
        let mut written = 0;
        for (position, (chunk, embedding)) in index.entries().enumerate() {
            let embedding_json = serde_json::to_string(embedding)
                .map_err(|e| TutorError::Store(e.to_string()))?;
            tx.execute(
                "INSERT INTO index_chunks
                 (index_key, position, chunk_id, source_id, char_offset, text, embedding, embedding_model, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    key,
                    position as i64,
                    chunk.id,
                    chunk.source_id,
                    chunk.offset as i64,
                    chunk.text,
                    embedding_json,
                    embedding_model,
                    saved_at,
                ],
            )?;
            written += 1;
        }

        let pruned = tx.execute(
            "DELETE FROM index_chunks WHERE index_key NOT IN (
                SELECT index_key FROM index_chunks
                GROUP BY index_key
                ORDER BY MAX(rowid) DESC
                LIMIT ?1
            )",
            params![self.max_indexes as i64],
        )?;
        tx.commit()?;

        if pruned > 0 {
            tracing::debug!("Pruned {} chunks of old indexes", pruned);
        }
        tracing::debug!("Persisted {} chunks under index {}", written, key);
        Ok(written)
    }

    /// 恢复索引；该键没有数据时返回 None。查询时使用传入的 embedder 编码
    pub fn load(
        &self,
        key: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Option<SimilarityIndex>, TutorError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT chunk_id, source_id, char_offset, text, embedding
             FROM index_chunks WHERE index_key = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut index = SimilarityIndex::new(embedder);
        for row in rows {
            let (chunk_id, source_id, offset, text, embedding_json) = row?;
            let embedding: Vec<f32> = serde_json::from_str(&embedding_json).map_err(|e| {
                TutorError::Store(format!("corrupt embedding for {}: {}", chunk_id, e))
            })?;
            let chunk = Chunk::new(chunk_id, text, source_id).with_offset(offset as usize);
            index.insert(chunk, embedding)?;
        }

        if index.is_empty() {
            Ok(None)
        } else {
            Ok(Some(index))
        }
    }

    /// 已保存的索引键，最新写入的在前
    pub fn keys(&self) -> Result<Vec<String>, TutorError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT index_key FROM index_chunks GROUP BY index_key ORDER BY MAX(rowid) DESC",
        )?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashingEmbedder;
    use crate::memory::DocumentIndexer;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(dir.path().join("chroma_db")).unwrap();
        assert!(store.db_path().ends_with(INDEX_DB_FILE));

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
        let index = DocumentIndexer::new(Arc::clone(&embedder))
            .build(&docs(&[
                "Plants use sunlight to make glucose.",
                "Mitochondria release energy.",
            ]))
            .await
            .unwrap();

        let written = store.save("k1", &index, "local-hashing").unwrap();
        assert_eq!(written, 2);

        let restored = store.load("k1", embedder).unwrap().unwrap();
        let original: Vec<_> = index.entries().map(|(c, e)| (c.clone(), e.to_vec())).collect();
        let loaded: Vec<_> = restored.entries().map(|(c, e)| (c.clone(), e.to_vec())).collect();
        assert_eq!(original, loaded);

        let results = restored.search("sunlight glucose", 1).await.unwrap();
        assert_eq!(results[0].chunk.source_id, "doc-0");
    }

    #[tokio::test]
    async fn test_save_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(16));
        let indexer = DocumentIndexer::new(Arc::clone(&embedder));

        let first = indexer.build(&docs(&["one", "two"])).await.unwrap();
        let second = indexer.build(&docs(&["three"])).await.unwrap();
        store.save("k1", &first, "local-hashing").unwrap();
        store.save("k2", &first, "local-hashing").unwrap();
        store.save("k1", &second, "local-hashing").unwrap();

        assert_eq!(store.load("k1", Arc::clone(&embedder)).unwrap().unwrap().len(), 1);
        assert_eq!(store.keys().unwrap(), vec!["k1".to_string(), "k2".to_string()]);
    }

    #[tokio::test]
    async fn test_oldest_indexes_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap().with_max_indexes(2);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(16));
        let index = DocumentIndexer::new(Arc::clone(&embedder))
            .build(&docs(&["alpha beta"]))
            .await
            .unwrap();

        for key in ["a", "b", "c"] {
            store.save(key, &index, "local-hashing").unwrap();
        }

        assert_eq!(store.keys().unwrap(), vec!["c".to_string(), "b".to_string()]);
        assert!(store.load("a", embedder).unwrap().is_none());
    }

    #[test]
    fn test_load_unknown_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(dir.path()).unwrap();
        assert!(store
            .load("missing", Arc::new(HashingEmbedder::new(4)))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_index_key_depends_on_all_inputs() {
        let chunking = ChunkingConfig::default();
        let base = index_key("m", chunking, &docs(&["ab", "c"]));

        assert_eq!(base, index_key("m", chunking, &docs(&["ab", "c"])));
        assert_eq!(base.len(), 64);
        assert_ne!(base, index_key("m", chunking, &docs(&["a", "bc"])));
        assert_ne!(base, index_key("other", chunking, &docs(&["ab", "c"])));
        assert_ne!(
            base,
            index_key("m", ChunkingConfig::new(500, 50).unwrap(), &docs(&["ab", "c"]))
        );
    }
}
