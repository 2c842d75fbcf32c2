pub mod assembly;
pub mod render;

pub use assembly::KnowledgeGraph;
pub use render::{render_dot, render_html, render_json, RenderOptions, VisData, VisEdge, VisNode};
