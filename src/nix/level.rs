use std::collections::VecDeque;

use tracing::debug;

use super::graph::Graph;
use crate::error::{Result, VisualizeError};

/// Assigns every node its depth below the roots and sets `graph.depth`.
///
/// A node's level is the length of the longest parent chain above it, so a
/// package pulled in at several depths sits below its deepest consumer.
/// Parentless nodes are level 0.
pub fn assign_levels(graph: &mut Graph) -> Result<()> {
    if graph.nodes.is_empty() {
        return Err(VisualizeError::MalformedGraph(
            "discovery returned no packages".to_string(),
        ));
    }

    let mut pending = graph
        .nodes
        .iter()
        .map(|node| node.parents.len())
        .collect::<Vec<_>>();
    let mut levels = vec![0usize; graph.nodes.len()];
    let mut queue = graph
        .ids()
        .filter(|id| pending[id.0] == 0)
        .collect::<VecDeque<_>>();

    let mut visited = 0usize;
    while let Some(id) = queue.pop_front() {
        visited += 1;
        let level = levels[id.0];
        for &child in &graph.node(id).children {
            levels[child.0] = levels[child.0].max(level + 1);
            pending[child.0] -= 1;
            if pending[child.0] == 0 {
                queue.push_back(child);
            }
        }
    }

    if visited < graph.nodes.len() {
        let stuck = graph
            .ids()
            .find(|id| pending[id.0] > 0)
            .map(|id| graph.node(id).name.clone())
            .unwrap_or_default();
        return Err(VisualizeError::MalformedGraph(format!(
            "dependency cycle through {stuck}"
        )));
    }

    for (node, level) in graph.nodes.iter_mut().zip(levels) {
        node.level = Some(level);
    }
    graph.depth = graph
        .nodes
        .iter()
        .filter_map(|node| node.level)
        .max()
        .map_or(0, |level| level + 1);

    debug!(depth = graph.depth, "assigned levels");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nix::collect::build_graph;

    /// Builds from `(dependency, consumer)` pairs.
    fn graph_of(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut out = String::new();
        for node in nodes {
            out.push_str(&format!("\"h-{node}\" [label = \"{node}\"];\n"));
        }
        for (dep, consumer) in edges {
            out.push_str(&format!("\"h-{dep}\" -> \"h-{consumer}\";\n"));
        }
        build_graph(&["h-root"], &[out.as_str()]).unwrap()
    }

    fn level_of(graph: &Graph, name: &str) -> Option<usize> {
        graph.get(name).and_then(|node| node.level)
    }

    #[test]
    fn chain_levels_increase_away_from_root() {
        let mut graph = graph_of(&["root", "a", "b"], &[("a", "root"), ("b", "a")]);
        assign_levels(&mut graph).unwrap();

        assert_eq!(level_of(&graph, "root"), Some(0));
        assert_eq!(level_of(&graph, "a"), Some(1));
        assert_eq!(level_of(&graph, "b"), Some(2));
        assert_eq!(graph.depth, 3);
    }

    #[test]
    fn diamond_takes_longest_path() {
        let mut graph = graph_of(
            &["root", "a", "b", "c"],
            &[("a", "root"), ("b", "root"), ("c", "a"), ("c", "b")],
        );
        assign_levels(&mut graph).unwrap();
        assert_eq!(level_of(&graph, "c"), Some(2));
        assert_eq!(graph.depth, 3);
    }

    #[test]
    fn shortcut_edge_does_not_pull_node_up() {
        let mut graph = graph_of(
            &["root", "a", "b", "c"],
            &[("a", "root"), ("b", "a"), ("c", "b"), ("c", "root")],
        );
        assign_levels(&mut graph).unwrap();
        assert_eq!(level_of(&graph, "c"), Some(3));
        assert_eq!(graph.depth, 4);
    }

    #[test]
    fn lone_package_is_depth_one() {
        let mut graph = graph_of(&["root"], &[]);
        assign_levels(&mut graph).unwrap();
        assert_eq!(level_of(&graph, "root"), Some(0));
        assert_eq!(graph.depth, 1);
    }

    #[test]
    fn cycle_is_malformed() {
        let mut graph = graph_of(
            &["root", "a", "b"],
            &[("a", "root"), ("b", "a"), ("a", "b")],
        );
        let err = assign_levels(&mut graph).unwrap_err();
        match err {
            VisualizeError::MalformedGraph(message) => assert!(message.contains("cycle")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(graph.nodes.iter().all(|node| node.level.is_none()));
    }

    #[test]
    fn empty_graph_is_malformed() {
        let mut graph = Graph::default();
        assert!(matches!(
            assign_levels(&mut graph),
            Err(VisualizeError::MalformedGraph(_))
        ));
    }
}
