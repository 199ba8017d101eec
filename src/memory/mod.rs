//! 记忆层：LLM 消息、参考文档索引（分块 / 嵌入 / 检索）与索引持久化

pub mod conversation;
pub mod rag;
pub mod store;

pub use conversation::{Message, Role};
pub use rag::{
    Chunk, Chunker, ChunkingConfig, DocumentIndexer, RetrievalResult, SimilarityIndex,
};
pub use store::{index_key, IndexStore};
