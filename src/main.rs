use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use louru::config::AppConfig;
use louru::db;
use louru::services::ai::ollama::OllamaProvider;
use louru::services::ai::openai::{hosted_base_url, OpenAiProvider};
use louru::services::ai::LlmProvider;
use louru::services::extraction::ExperienceExtractor;
use louru::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    let extraction = config.extraction.clone();

    let conn = db::init_db(&config.database_url)?;

    let llm: Arc<dyn LlmProvider> = match config.llm_provider.as_str() {
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {})", config.ollama_url);
            Arc::new(OllamaProvider::new(
                config.ollama_url.clone(),
                extraction.model_name.clone(),
                extraction.timeout,
            )?)
        }
        provider => {
            let Some(base_url) = hosted_base_url(provider) else {
                anyhow::bail!("unknown LLM_PROVIDER: {provider}");
            };
            anyhow::ensure!(
                !extraction.provider_key.is_empty(),
                "LLM_API_KEY must be set when LLM_PROVIDER={provider}"
            );
            tracing::info!("using {provider} LLM provider (model: {})", extraction.model_name);
            Arc::new(OpenAiProvider::new(
                base_url,
                extraction.provider_key.clone(),
                extraction.model_name.clone(),
                extraction.timeout,
            )?)
        }
    };

    let extractor = ExperienceExtractor::new(llm, extraction)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        extractor,
    });

    let app = louru::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
