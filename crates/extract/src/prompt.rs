/// Persona used when the caller does not name one
pub const DEFAULT_CONTEXT: &str = "lawyer";

/// Build the knowledge-graph prompt. `context` is the expert persona
/// ("poet", "lawyer", "doctor"), `content` the selected page text.
///
/// The output contract spelled out here is what [`crate::parser`] expects.
pub fn build_graph_prompt(context: &str, content: &str) -> String {
    let context = if context.trim().is_empty() {
        DEFAULT_CONTEXT
    } else {
        context.trim()
    };

    format!(
        r#"You are an expert {context}. I need to design a knowledge graph from the following text.
Please analyze the content, extract the key entities (such as characters, themes, symbols, emotions, etc.),
and identify the relationships between them.

For each relationship, specify the type (e.g., 'is associated with', 'is influenced by', 'symbolizes', etc.),
and link the related entities.

The output should be structured with:

Entities: [list of key elements identified in the content]
Relationships: [list of relationships, each described with the entities involved and the type of relationship,
e.g., 'Entity A - (symbolizes) -> Entity B']

Here is the content to analyze: {content}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_persona_and_content() {
        let prompt = build_graph_prompt("poet", "To be, or not to be");

        assert!(prompt.starts_with("You are an expert poet."));
        assert!(prompt.ends_with("Here is the content to analyze: To be, or not to be\n"));
    }

    #[test]
    fn test_prompt_spells_out_output_contract() {
        let prompt = build_graph_prompt("lawyer", "text");

        assert!(prompt.contains("\nEntities: ["));
        assert!(prompt.contains("\nRelationships: ["));
        assert!(prompt.contains("Entity A - (symbolizes) -> Entity B"));
    }

    #[test]
    fn test_blank_context_falls_back_to_default() {
        let prompt = build_graph_prompt("   ", "text");
        assert!(prompt.starts_with("You are an expert lawyer."));
    }
}
