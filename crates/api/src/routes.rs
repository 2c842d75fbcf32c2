use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use extract::LanguageModel;
use ingest::PageRange;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::CacheStats;
use crate::config::RequestDefaults;
use crate::error::PipelineError;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{DocumentInput, GraphRequest, Pipeline, PipelineOutcome};

pub struct AppState<M> {
    pub pipeline: Pipeline<M>,
    pub defaults: RequestDefaults,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
}

#[derive(Deserialize)]
struct ParseRequest {
    completion: String,
}

#[derive(Serialize)]
struct StatsResponse {
    metrics: MetricsSnapshot,
    cache: Option<CacheStats>,
}

pub fn router<M>(state: Arc<AppState<M>>, max_upload_bytes: usize) -> Router
where
    M: LanguageModel + 'static,
{
    Router::new()
        .route("/health", get(health_check::<M>))
        .route("/graph", post(generate_graph::<M>))
        .route("/parse", post(parse_completion::<M>))
        .route("/stats", get(get_stats::<M>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check<M: LanguageModel>(State(state): State<Arc<AppState<M>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.pipeline.model_name().to_string(),
    })
}

/// Multipart fields: `file` (required), `context`, `pages_from`, `pages_to`
async fn generate_graph<M: LanguageModel>(
    State(state): State<Arc<AppState<M>>>,
    multipart: Multipart,
) -> Result<Json<PipelineOutcome>, PipelineError> {
    let request = read_graph_form(multipart, &state.defaults).await?;

    if let DocumentInput::Upload { file_name, bytes } = &request.document {
        info!(
            file = %file_name,
            bytes = bytes.len(),
            context = %request.context,
            from = request.pages.from,
            to = request.pages.to,
            "Graph request"
        );
    }

    let outcome = state.pipeline.run(request).await?;
    Ok(Json(outcome))
}

async fn parse_completion<M: LanguageModel>(
    State(state): State<Arc<AppState<M>>>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<PipelineOutcome>, PipelineError> {
    let outcome = state.pipeline.from_completion(req.completion)?;
    Ok(Json(outcome))
}

async fn get_stats<M: LanguageModel>(State(state): State<Arc<AppState<M>>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        metrics: state.pipeline.metrics().snapshot(),
        cache: state.pipeline.cache_stats(),
    })
}

async fn read_graph_form(
    mut multipart: Multipart,
    defaults: &RequestDefaults,
) -> Result<GraphRequest, PipelineError> {
    let mut upload = None;
    let mut context = defaults.context.clone();
    let mut from = defaults.pages_from;
    let mut to = defaults.pages_to;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
                upload = Some(DocumentInput::Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "context" | "pages_from" | "pages_to" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
                match name.as_str() {
                    "context" => {
                        if !value.trim().is_empty() {
                            context = value.trim().to_string();
                        }
                    }
                    "pages_from" => from = parse_page(&name, &value)?,
                    _ => to = parse_page(&name, &value)?,
                }
            }
            _ => {}
        }
    }

    let document = upload
        .ok_or_else(|| PipelineError::InvalidRequest("Missing multipart field: file".to_string()))?;

    Ok(GraphRequest {
        document,
        context,
        pages: PageRange::new(from, to),
    })
}

fn parse_page(field: &str, value: &str) -> Result<usize, PipelineError> {
    value.trim().parse().map_err(|_| {
        PipelineError::InvalidRequest(format!("{} must be a non-negative integer, got {:?}", field, value))
    })
}
