use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{Result, VisualizeError};
use crate::nix::Graph;

#[derive(Debug, Serialize)]
pub struct LayoutSnapshot<'a> {
    pub roots: &'a [String],
    pub depth: usize,
    pub nodes: Vec<LayoutNode<'a>>,
}

#[derive(Debug, Serialize)]
pub struct LayoutNode<'a> {
    pub name: &'a str,
    pub raw_name: &'a str,
    pub level: Option<usize>,
    pub x: f64,
    pub y: f64,
    pub in_degree: usize,
    pub out_degree: usize,
    pub parents: Vec<&'a str>,
}

impl<'a> LayoutSnapshot<'a> {
    pub fn of(graph: &'a Graph) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|node| LayoutNode {
                name: &node.name,
                raw_name: &node.raw_name,
                level: node.level,
                x: node.x,
                y: node.y,
                in_degree: node.in_degree,
                out_degree: node.out_degree,
                parents: node
                    .parents
                    .iter()
                    .map(|&parent| graph.node(parent).name.as_str())
                    .collect(),
            })
            .collect();

        Self {
            roots: &graph.root_package_names,
            depth: graph.depth,
            nodes,
        }
    }
}

pub fn write_layout_json(graph: &Graph, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&LayoutSnapshot::of(graph))
        .map_err(|err| VisualizeError::Render(format!("failed to serialize layout: {err}")))?;

    info!("Writing layout file: {}", path.display());
    fs::write(path, json)
        .map_err(|err| VisualizeError::io(format!("failed to write {}", path.display()), err))
}
