//! Build a knowledge graph from a local document
//!
//! ```text
//! kgrapher contract.pdf --context lawyer --from 0 --to 5 --output contract.html
//! ```

use anyhow::{Context, Result};
use api::config::LogFormat;
use api::logging::init_logging;
use api::{AppConfig, DocumentInput, GraphRequest, Pipeline, PipelineOutcome};
use clap::{Parser, ValueEnum};
use extract::LanguageModel;
use graph::{render_dot, render_json};
use ingest::PageRange;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Html,
    Dot,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "kgrapher", version, about = "Turn a document into a knowledge graph with a language model")]
struct Args {
    /// PDF, .txt or .md document
    file: PathBuf,

    /// Expert persona for the prompt (defaults to the configured one)
    #[arg(long)]
    context: Option<String>,

    /// First page, 0-based inclusive
    #[arg(long)]
    from: Option<usize>,

    /// Last page, exclusive
    #[arg(long)]
    to: Option<usize>,

    #[arg(short, long, default_value = "graph.html")]
    output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Html)]
    format: OutputFormat,

    /// TOML config file
    #[arg(long, env = "KGRAPHER_CONFIG")]
    config: Option<PathBuf>,

    /// Print the raw model output to stdout
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    init_logging(LogFormat::Pretty, "warn")?;

    let client = config.llm_client()?;
    let pipeline = Pipeline::new(client, &config);

    let request = GraphRequest {
        document: DocumentInput::Path(args.file.clone()),
        context: args
            .context
            .clone()
            .unwrap_or_else(|| config.request.context.clone()),
        pages: PageRange::new(
            args.from.unwrap_or(config.request.pages_from),
            args.to.unwrap_or(config.request.pages_to),
        ),
    };

    eprintln!(
        "Generating graph for {:?} with {}...",
        args.file,
        pipeline.model_name()
    );

    let outcome = pipeline.run(request).await.map_err(|e| {
        anyhow::anyhow!("{} {}", e.message(), e.detail())
    })?;

    let report = match outcome {
        PipelineOutcome::NothingExtracted { warning, completion } => {
            if args.raw {
                println!("{}", completion);
            }
            eprintln!("Warning: {}", warning);
            return Ok(());
        }
        PipelineOutcome::Graph(report) => report,
    };

    if args.raw {
        println!("{}", report.extraction.completion);
    }

    let rendered = match args.format {
        OutputFormat::Html => report.html,
        OutputFormat::Dot => render_dot(&report.knowledge_graph),
        OutputFormat::Json => render_json(&report.knowledge_graph)?,
    };

    tokio::fs::write(&args.output, rendered)
        .await
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    eprintln!(
        "Wrote {} entities and {} relationships to {:?}",
        report.extraction.parsed.entities.len(),
        report.extraction.parsed.relationships.len(),
        args.output
    );

    Ok(())
}
