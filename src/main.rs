//! Tutor - 个性化教学会话
//!
//! 入口：初始化日志与配置，构造 LLM / 嵌入依赖，在控制台收集学生档案后运行一次教学会话。

use std::sync::Arc;

use anyhow::Context;
use tutor::cli::{load_documents, prompt_student_profile};
use tutor::config::load_config;
use tutor::crew::LlmTaskExecutor;
use tutor::llm::{create_embedder_from_config, create_llm_from_config};
use tutor::{observability, SessionRunner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    let llm = create_llm_from_config(&cfg).context("Failed to create LLM client")?;
    let embedder = create_embedder_from_config(
        cfg.embedding.base_url.as_deref(),
        &cfg.embedding.model,
        None,
    );
    let runner = SessionRunner::from_config(&cfg, embedder, Arc::new(LlmTaskExecutor::new(llm)))
        .context("Failed to set up teaching session")?;

    let mut profile = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        prompt_student_profile(&mut input, &mut output).context("Failed to read student profile")?
    };

    if let Some(dir) = &cfg.app.documents_dir {
        profile.documents = load_documents(dir)
            .with_context(|| format!("Failed to load documents from {}", dir.display()))?;
    }

    let result = runner
        .run(&profile)
        .await
        .context("Teaching session failed")?;

    println!("\nTeaching Session Results:");
    println!("{}", result);

    Ok(())
}
