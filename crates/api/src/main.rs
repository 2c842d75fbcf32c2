use anyhow::{Context, Result};
use api::logging::init_logging;
use api::routes::{router, AppState};
use api::{AppConfig, Pipeline};
use extract::LanguageModel;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Config file path from KGRAPHER_CONFIG, everything else has defaults
    let config_path = std::env::var_os("KGRAPHER_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    init_logging(config.logging.format, "info")?;

    let client = config.llm_client()?;
    tracing::info!(
        provider = ?config.llm.provider,
        model = client.name(),
        "Language model configured"
    );

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(client, &config),
        defaults: config.request.clone(),
    });
    let app = router(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    tracing::info!("Server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
