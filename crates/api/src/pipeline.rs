//! Document -> page text -> prompt -> completion -> parse -> graph -> HTML

use anyhow::Context;
use extract::{build_graph_prompt, parse_response, Extraction, LanguageModel};
use graph::{render_html, KnowledgeGraph, RenderOptions, VisData};
use ingest::{Document, DocumentFormat, FileReader, PageRange};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheStats, CompletionCache};
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::metrics::{Metrics, RequestOutcome, TimedOperation};
use crate::retry::RetryPolicy;

pub const NOTHING_EXTRACTED_WARNING: &str = "No entities or relationships found in the output.";

pub enum DocumentInput {
    Path(PathBuf),
    Upload { file_name: String, bytes: Vec<u8> },
}

pub struct GraphRequest {
    pub document: DocumentInput,
    pub context: String,
    pub pages: PageRange,
}

/// Which part of which document was sent to the model
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub source: String,
    pub total_pages: usize,
    pub range: (usize, usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentSummary>,
    pub extraction: Extraction,
    pub graph: VisData,
    pub html: String,
    #[serde(skip)]
    pub knowledge_graph: KnowledgeGraph,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum PipelineOutcome {
    #[serde(rename = "ok")]
    Graph(GraphReport),
    /// The model answered but nothing could be parsed out of it
    #[serde(rename = "empty")]
    NothingExtracted {
        warning: &'static str,
        completion: String,
    },
}

pub struct Pipeline<M> {
    model: M,
    retry: RetryPolicy,
    cache: Option<CompletionCache>,
    render: RenderOptions,
    metrics: Arc<Metrics>,
}

impl<M: LanguageModel> Pipeline<M> {
    pub fn new(model: M, config: &AppConfig) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| CompletionCache::new(config.cache.max_entries));

        Self {
            model,
            retry: RetryPolicy::from(&config.retry),
            cache,
            render: config.render.clone(),
            metrics: Metrics::new(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Full run for one document
    pub async fn run(&self, request: GraphRequest) -> Result<PipelineOutcome, PipelineError> {
        let result = self.run_inner(request).await;
        self.record(&result);
        result
    }

    /// Skip the document and the model: parse and render a completion
    /// the caller already has
    pub fn from_completion(&self, completion: String) -> Result<PipelineOutcome, PipelineError> {
        let result = self.build(None, completion, false);
        self.record(&result);
        result
    }

    async fn run_inner(&self, request: GraphRequest) -> Result<PipelineOutcome, PipelineError> {
        let document = self.load(request.document).await?;

        let selection = document
            .select_non_empty(request.pages)
            .map_err(PipelineError::Document)?;

        info!(
            doc_id = %document.doc_id,
            source = %document.source,
            pages = selection.pages,
            from = selection.range.0,
            to = selection.range.1,
            "Selected pages"
        );

        let summary = DocumentSummary {
            doc_id: document.doc_id.clone(),
            source: document.source.clone(),
            total_pages: document.page_count(),
            range: selection.range,
        };

        let prompt = build_graph_prompt(&request.context, &selection.text);
        let (completion, cached) = self.complete(&prompt).await?;

        self.build(Some(summary), completion, cached)
    }

    async fn load(&self, input: DocumentInput) -> Result<Document, PipelineError> {
        let document = match input {
            DocumentInput::Path(path) => FileReader::read_file(&path).await,
            DocumentInput::Upload { file_name, bytes } => {
                match DocumentFormat::from_name(&file_name) {
                    Ok(format) => FileReader::read_bytes(file_name, format, bytes).await,
                    Err(e) => Err(e),
                }
            }
        };

        document.map_err(PipelineError::Document)
    }

    /// Completion for `prompt`, from the cache when possible
    async fn complete(&self, prompt: &str) -> Result<(String, bool), PipelineError> {
        let model_name = self.model.name();

        if let Some(completion) = self.cache.as_ref().and_then(|c| c.get(model_name, prompt)) {
            info!(model = model_name, cached = true, "Using cached completion");
            self.metrics.record_cache_hit();
            return Ok((completion, true));
        }

        let timer = TimedOperation::start();
        let completion = self
            .retry
            .retry("llm_complete", || self.model.complete(prompt))
            .await
            .with_context(|| format!("Model {} did not return a completion", model_name))
            .map_err(PipelineError::Model)?;
        self.metrics.record_model_call(timer.elapsed());

        info!(
            model = model_name,
            cached = false,
            chars = completion.len(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "Model completion received"
        );

        if let Some(cache) = &self.cache {
            cache.set(model_name, prompt, completion.clone());
        }

        Ok((completion, false))
    }

    fn build(
        &self,
        document: Option<DocumentSummary>,
        completion: String,
        cached: bool,
    ) -> Result<PipelineOutcome, PipelineError> {
        let parsed = parse_response(&completion);
        self.metrics
            .record_extraction(parsed.entities.len(), parsed.relationships.len());

        if parsed.is_empty() {
            warn!(chars = completion.len(), "{}", NOTHING_EXTRACTED_WARNING);
            return Ok(PipelineOutcome::NothingExtracted {
                warning: NOTHING_EXTRACTED_WARNING,
                completion,
            });
        }

        let knowledge_graph = KnowledgeGraph::assemble(&parsed);
        let html = render_html(&knowledge_graph, &self.render).map_err(PipelineError::Render)?;

        info!(
            entities = parsed.entities.len(),
            relationships = parsed.relationships.len(),
            nodes = knowledge_graph.node_count(),
            edges = knowledge_graph.edge_count(),
            "Graph rendered"
        );

        Ok(PipelineOutcome::Graph(GraphReport {
            document,
            extraction: Extraction {
                completion,
                parsed,
                cached,
            },
            graph: VisData::from(&knowledge_graph),
            html,
            knowledge_graph,
        }))
    }

    fn record(&self, result: &Result<PipelineOutcome, PipelineError>) {
        let outcome = match result {
            Ok(PipelineOutcome::Graph(_)) => Some(RequestOutcome::Graph),
            Ok(PipelineOutcome::NothingExtracted { .. }) => Some(RequestOutcome::NothingExtracted),
            Err(e) => e.outcome(),
        };
        if let Some(outcome) = outcome {
            self.metrics.record_request(outcome);
        }
    }
}
