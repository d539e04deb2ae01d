//! # polcheck-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 5000).

use polcheck_api::config::{AppConfig, EvaluationMode};
use polcheck_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::info!(mode = %config.mode, upload_dir = ?config.upload_dir, "configuration loaded");

    // Optional: absent DATABASE_URL means in-memory only.
    let db_pool = polcheck_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let llm_client = match polcheck_llm::LlmConfig::from_env() {
        Ok(llm_config) => {
            tracing::info!(model = %llm_config.model, "model client configured");
            match polcheck_llm::LlmClient::new(llm_config) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::error!("Failed to create model client: {e}");
                    return Err(e.into());
                }
            }
        }
        Err(e) if config.mode == EvaluationMode::Prompt => {
            tracing::warn!("Model client not configured: {e}. /check_document will return 503.");
            None
        }
        Err(_) => None,
    };

    let upload_dir = config.upload_dir.clone();
    let state = AppState::with_config(config, llm_client).with_db_pool(db_pool);

    state.policies.hydrate().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    if let Some(dir) = &upload_dir {
        polcheck_api::uploads::load_upload_dir(dir, state.extractor.clone(), &state.policies)
            .await
            .map_err(|e| {
                tracing::error!("Loading upload directory failed: {e}");
                e
            })?;
    }

    let port = state.config.port;
    let app = polcheck_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("polcheck API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` filter (default `info`); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
