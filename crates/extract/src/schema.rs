use serde::{Deserialize, Serialize};

/// One directed, labeled edge as written by the model:
/// `Source - (relation) -> Target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub relation: String,
    pub target: String,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            target: target.into(),
        }
    }
}

/// Everything the parser pulled out of a completion, in order of appearance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub entities: Vec<String>,
    pub relationships: Vec<Relationship>,
}

impl ParsedResponse {
    /// True when the completion yielded neither entities nor relationships
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Raw model output together with what was parsed from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub completion: String,
    pub parsed: ParsedResponse,
    pub cached: bool,
}
