//! Parse the model's free-text answer into entities and relationships
//!
//! The model is asked for two sections:
//!
//! ```text
//! Entities:
//! ["Hamlet"]
//! ["Death"]
//! Relationships:
//! Hamlet - (fears) -> Death
//! ```
//!
//! Parsing is line oriented and tolerant: lines that do not fit the
//! current section are dropped, never reported.

use tracing::{debug, trace};

use crate::schema::{ParsedResponse, Relationship};

const ENTITIES_MARKER: &str = "entities:";
const RELATIONSHIPS_MARKER: &str = "relationships:";
const ARROW: &str = "->";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Before the first marker; everything here is discarded
    Preamble,
    Entities,
    Relationships,
}

/// Parse a completion. Never fails: the worst case is an empty result.
pub fn parse_response(completion: &str) -> ParsedResponse {
    let mut section = Section::Preamble;
    let mut parsed = ParsedResponse::default();

    for raw_line in split_lines(completion) {
        let line = raw_line.trim();
        let lowered = line.to_lowercase();

        if lowered.starts_with(ENTITIES_MARKER) {
            section = Section::Entities;
            continue;
        }
        if lowered.starts_with(RELATIONSHIPS_MARKER) {
            section = Section::Relationships;
            continue;
        }

        match section {
            Section::Entities if !line.is_empty() => {
                if let Some(entity) = parse_entity(line) {
                    parsed.entities.push(entity);
                }
            }
            Section::Relationships if line.contains(ARROW) => {
                match parse_relationship(line) {
                    Some(rel) => parsed.relationships.push(rel),
                    None => trace!(line, "Skipping relationship line without source/relation split"),
                }
            }
            _ => {}
        }
    }

    debug!(
        entities = parsed.entities.len(),
        relationships = parsed.relationships.len(),
        "Parsed model response"
    );

    parsed
}

/// Split on every Unicode line boundary (`\n`, `\r`, `\r\n`, vertical tab,
/// form feed, `\x1c`..`\x1e`, NEL, U+2028, U+2029). A trailing boundary does
/// not produce an empty last line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_boundary(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && matches!(chars.peek(), Some(&(_, '\n'))) {
            chars.next();
            start += 1;
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// `["Hamlet"],` -> `Hamlet`. Empty after stripping means no entity.
fn parse_entity(line: &str) -> Option<String> {
    let cleaned = line.trim_matches(|c| matches!(c, '[' | ']' | ',' | '"' | ' '));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// `Hamlet - (fears) -> Death`. Splits on the first `->`, then on the first
/// `-` of the left side. Anything after the first arrow is the target.
fn parse_relationship(line: &str) -> Option<Relationship> {
    let (left, right) = line.split_once(ARROW)?;
    let (source, relation) = left.trim().split_once('-')?;

    Some(Relationship {
        source: source.trim().to_string(),
        relation: relation
            .trim_matches(|c| matches!(c, '(' | ')' | ' '))
            .to_string(),
        target: right.trim().to_string(),
    })
}
