//! Turn a [`KnowledgeGraph`] into something a person can look at.
//!
//! The interactive page loads vis-network from a CDN and can be opened
//! directly or embedded in an iframe.

use anyhow::{Context, Result};
use petgraph::dot::Dot;
use serde::{Deserialize, Serialize};

use crate::assembly::KnowledgeGraph;

const VIS_NETWORK_JS: &str =
    "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Knowledge Graph</title>
<script type="text/javascript" src="__VIS_JS__"></script>
<style type="text/css">
  #graph { width: __WIDTH__; height: __HEIGHT__; border: 1px solid lightgray; }
</style>
</head>
<body>
<div id="graph"></div>
<script type="text/javascript">
  var nodes = new vis.DataSet(__NODES__);
  var edges = new vis.DataSet(__EDGES__);
  var container = document.getElementById("graph");
  var options = {
    edges: { arrows: { to: { enabled: true } }, font: { align: "middle" } },
    physics: { stabilization: true }
  };
  var network = new vis.Network(container, { nodes: nodes, edges: edges }, options);
</script>
</body>
</html>
"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisEdge {
    pub from: String,
    pub to: String,
    pub label: String,
}

/// What a renderer needs: `(id, label)` nodes and labeled `(from, to)` edges
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisData {
    pub nodes: Vec<VisNode>,
    pub edges: Vec<VisEdge>,
}

impl From<&KnowledgeGraph> for VisData {
    fn from(graph: &KnowledgeGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|label| VisNode {
                id: label.to_string(),
                label: label.to_string(),
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(from, to, label)| VisEdge {
                from: from.to_string(),
                to: to.to_string(),
                label: label.to_string(),
            })
            .collect();

        Self { nodes, edges }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// CSS height of the graph canvas
    pub height: String,
    /// CSS width of the graph canvas
    pub width: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            height: "600px".to_string(),
            width: "100%".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> Result<()> {
        validate_dimension("height", &self.height)?;
        validate_dimension("width", &self.width)?;
        Ok(())
    }
}

fn validate_dimension(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("Render {} cannot be empty", field);
    }
    if value.chars().any(|c| matches!(c, '"' | '<' | '>' | ';' | '{' | '}')) {
        anyhow::bail!("Render {} contains invalid characters: {:?}", field, value);
    }
    Ok(())
}

/// Serialize for embedding inside a `<script>` element
fn script_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("Failed to serialize graph data")?;
    Ok(json.replace("</", "<\\/"))
}

/// Standalone interactive HTML page
pub fn render_html(graph: &KnowledgeGraph, options: &RenderOptions) -> Result<String> {
    options.validate()?;

    let data = VisData::from(graph);
    let nodes = script_json(&data.nodes)?;
    let edges = script_json(&data.edges)?;

    Ok(fill_template(
        HTML_TEMPLATE,
        &[
            ("__VIS_JS__", VIS_NETWORK_JS),
            ("__WIDTH__", options.width.trim()),
            ("__HEIGHT__", options.height.trim()),
            ("__NODES__", nodes.as_str()),
            ("__EDGES__", edges.as_str()),
        ],
    ))
}

/// Substitute placeholders in a single left-to-right pass. Inserted values
/// are never scanned again.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let next = values
            .iter()
            .filter_map(|&(key, value)| rest.find(key).map(|pos| (pos, key, value)))
            .min_by_key(|&(pos, _, _)| pos);

        match next {
            Some((pos, key, value)) => {
                out.push_str(&rest[..pos]);
                out.push_str(value);
                rest = &rest[pos + key.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Graphviz DOT with node and edge labels
pub fn render_dot(graph: &KnowledgeGraph) -> String {
    format!("{}", Dot::new(graph.inner()))
}

/// Pretty JSON of the renderer contract
pub fn render_json(graph: &KnowledgeGraph) -> Result<String> {
    serde_json::to_string_pretty(&VisData::from(graph)).context("Failed to serialize graph data")
}
