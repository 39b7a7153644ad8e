use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitals_gateway::providers::{CompletionProvider, OpenAiCompatibleClient};
use vitals_gateway::server;
use vitals_gateway::state::AppState;
use vitals_knowledge::RetrievalService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = vitals_core::Config::load()?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.settings.logging.level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Configuration loaded (completion model: {}, endpoint: {})",
        config.settings.completion.model, config.settings.openai.base_url
    );
    if config.openai_api_key().is_none() {
        warn!("OPENAI_API_KEY is not set; embedding and completion calls will be unauthenticated");
    }

    // Open the retrieval service
    let retrieval_settings = config.retrieval_settings();
    let chat_top_k = retrieval_settings.chat_top_k;
    let retrieval = Arc::new(RetrievalService::open(retrieval_settings).await?);
    info!("Retrieval service ready ({})", retrieval.kind());

    // Create the completion client
    let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiCompatibleClient::new(
        config.settings.openai.base_url.clone(),
        config.openai_api_key().map(str::to_string),
        &config.settings.completion,
    )?);
    info!(
        "Completion client created ({}/{})",
        provider.name(),
        provider.model()
    );

    let state = Arc::new(AppState::new(retrieval, provider, chat_top_k));

    // Security: Verify localhost-only binding
    if config.settings.gateway.host != "127.0.0.1" && config.settings.gateway.host != "localhost" {
        warn!(
            "Gateway binding to non-localhost address: {}. This may expose the API to remote access.",
            config.settings.gateway.host
        );
    }

    let bind_addr = config.bind_addr();
    info!("Starting vitals gateway on {}", bind_addr);

    server::run(state, &bind_addr).await
}
