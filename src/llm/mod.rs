//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、嵌入提供方

pub mod deepseek;
pub mod embedding;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::TutorError;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use embedding::{
    create_embedder_from_config, EmbeddingProvider, HashingEmbedder, OpenAiEmbedder,
};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

/// 选定的 LLM 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    DeepSeek,
    OpenAi,
    Mock,
}

/// 根据 provider 与可用的 API Key 选择后端
///
/// - `mock`：显式选择 Mock，不需要 Key
/// - `deepseek`：需要 DEEPSEEK_API_KEY 或 OPENAI_API_KEY（走 DeepSeek 兼容端点）
/// - `openai`：需要 OPENAI_API_KEY
pub fn select_backend(
    provider: &str,
    has_deepseek_key: bool,
    has_openai_key: bool,
) -> Result<LlmBackend, TutorError> {
    match provider.to_lowercase().as_str() {
        "mock" => Ok(LlmBackend::Mock),
        "deepseek" if has_deepseek_key || has_openai_key => Ok(LlmBackend::DeepSeek),
        "deepseek" => Err(TutorError::Config(
            "llm.provider = \"deepseek\" requires DEEPSEEK_API_KEY or OPENAI_API_KEY".to_string(),
        )),
        "openai" if has_openai_key => Ok(LlmBackend::OpenAi),
        "openai" => Err(TutorError::Config(
            "llm.provider = \"openai\" requires OPENAI_API_KEY".to_string(),
        )),
        other => Err(TutorError::Config(format!(
            "unknown llm.provider {:?} (expected openai, deepseek or mock)",
            other
        ))),
    }
}

fn env_key_present(name: &str) -> bool {
    std::env::var(name)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

/// 根据配置与环境变量中的 API Key 创建 LLM 客户端；缺少 Key 时返回配置错误
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, TutorError> {
    let backend = select_backend(
        &cfg.llm.provider,
        env_key_present("DEEPSEEK_API_KEY"),
        env_key_present("OPENAI_API_KEY"),
    )?;

    let client: Arc<dyn LlmClient> = match backend {
        LlmBackend::DeepSeek => {
            let model = cfg
                .llm
                .deepseek
                .model
                .clone()
                .unwrap_or_else(|| DEEPSEEK_CHAT.to_string());
            tracing::info!("Using DeepSeek LLM ({})", model);
            Arc::new(create_deepseek_client(Some(&model)))
        }
        LlmBackend::OpenAi => {
            let model = cfg
                .llm
                .openai
                .model
                .clone()
                .unwrap_or_else(|| cfg.llm.model.clone());
            tracing::info!("Using OpenAI LLM ({})", model);
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
            ))
        }
        LlmBackend::Mock => {
            tracing::warn!("llm.provider = \"mock\", answers are canned");
            Arc::new(MockLlmClient)
        }
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyless_provider_is_config_error() {
        assert!(matches!(
            select_backend("openai", false, false),
            Err(TutorError::Config(_))
        ));
        assert!(matches!(
            select_backend("deepseek", false, false),
            Err(TutorError::Config(_))
        ));
        // 只有 DeepSeek Key 不足以使用 OpenAI
        assert!(matches!(
            select_backend("openai", true, false),
            Err(TutorError::Config(_))
        ));
    }

    #[test]
    fn test_mock_only_when_requested() {
        assert_eq!(select_backend("mock", false, false).unwrap(), LlmBackend::Mock);
        assert_eq!(select_backend("MOCK", true, true).unwrap(), LlmBackend::Mock);
        assert_eq!(select_backend("openai", false, true).unwrap(), LlmBackend::OpenAi);
    }

    #[test]
    fn test_deepseek_accepts_either_key() {
        assert_eq!(
            select_backend("deepseek", true, false).unwrap(),
            LlmBackend::DeepSeek
        );
        assert_eq!(
            select_backend("deepseek", false, true).unwrap(),
            LlmBackend::DeepSeek
        );
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(matches!(
            select_backend("anthropic", true, true),
            Err(TutorError::Config(ref m)) if m.contains("anthropic")
        ));
    }

    #[test]
    fn test_explicit_mock_config_builds_client() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        let llm = create_llm_from_config(&cfg).unwrap();
        assert_eq!(llm.token_usage(), (0, 0, 0));
    }
}
