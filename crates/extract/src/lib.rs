//! Prompting a language model for a knowledge graph and parsing its answer.

pub mod schema;
pub mod llm;
pub mod parser;
pub mod prompt;

pub use schema::{Extraction, ParsedResponse, Relationship};
pub use llm::{CohereClient, LanguageModel, LlmClient, OllamaClient};
pub use parser::parse_response;
pub use prompt::{build_graph_prompt, DEFAULT_CONTEXT};
