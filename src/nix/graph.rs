use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::util::package_name;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One package in the closure.
///
/// `parents` are the packages that depend on this one (closer to the root),
/// `children` the packages it depends on.
#[derive(Clone, Debug)]
pub struct Node {
    pub raw_name: String,
    pub name: String,
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
    pub in_degree: usize,
    pub out_degree: usize,
    pub level: Option<usize>,
    pub x: f64,
    pub y: f64,
}

impl Node {
    pub fn new(raw_name: &str) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            name: package_name(raw_name),
            parents: Vec::new(),
            children: Vec::new(),
            in_degree: 0,
            out_degree: 0,
            level: None,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn add_parent(&mut self, parent: NodeId) {
        self.parents.push(parent);
        self.out_degree = self.parents.len();
    }

    pub fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
        self.in_degree = self.children.len();
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub from_raw: String,
    pub to_raw: String,
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from_raw: &str, to_raw: &str) -> Self {
        Self {
            from_raw: from_raw.to_string(),
            to_raw: to_raw.to_string(),
            from: package_name(from_raw),
            to: package_name(to_raw),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub root_package_names: Vec<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub depth: usize,
    index: HashMap<String, NodeId>,
}

impl Graph {
    pub fn new(root_package_names: Vec<String>) -> Self {
        Self {
            root_package_names,
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.id_of(name).map(|id| self.node(id))
    }

    /// Adds the node unless one with the same normalized name exists.
    /// Returns the id of whichever node now owns that name.
    pub fn insert_node(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.index.get(&node.name) {
            return *id;
        }

        let id = NodeId(self.nodes.len());
        self.index.insert(node.name.clone(), id);
        self.nodes.push(node);
        id
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn level(&self, level: usize) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|node| node.level == Some(level))
            .collect()
    }

    pub fn level_ids(&self, level: usize) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.level == Some(level))
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    pub fn levels(&self, min_level: usize) -> impl Iterator<Item = Vec<&Node>> + '_ {
        (min_level..self.depth).map(move |level| self.level(level))
    }

    pub fn nodes_by_prefix(&self, prefix: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|node| node.name.starts_with(prefix))
            .collect()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self
            .level(0)
            .into_iter()
            .map(|node| node.name.as_str())
            .collect::<Vec<_>>();
        write!(f, "Graph of package: {}", head.join(", "))?;
        for (offset, level) in self.levels(1).enumerate() {
            write!(
                f,
                "\n\tOn level {} there are {} packages",
                offset + 1,
                level.len()
            )?;
        }
        Ok(())
    }
}
