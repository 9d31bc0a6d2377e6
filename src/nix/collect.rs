use std::time::Duration;

use tracing::{debug, info};

use super::graph::{Edge, Graph, Node, NodeId};
use super::level::assign_levels;
use super::nix_cmd::query_graph;
use super::parse::parse_graph_output;
use crate::error::{Result, VisualizeError};
use crate::util::package_name;

pub fn collect_graph(packages: &[String], timeout: Duration) -> Result<Graph> {
    let mut outputs = Vec::with_capacity(packages.len());
    for package in packages {
        info!(package = %package, "querying dependency graph");
        outputs.push(query_graph(package, timeout)?);
    }

    let mut graph = build_graph(packages, &outputs)?;
    assign_levels(&mut graph)?;

    info!(
        "Graph has {} nodes, {} edges and a depth of {}",
        graph.node_count(),
        graph.edge_count(),
        graph.depth
    );
    Ok(graph)
}

pub fn build_graph<S: AsRef<str>>(packages: &[S], outputs: &[S]) -> Result<Graph> {
    let root_names = packages
        .iter()
        .map(|package| package_name(package.as_ref()))
        .collect();
    let mut graph = Graph::new(root_names);

    for output in outputs {
        let raw = parse_graph_output(output.as_ref());
        for name in &raw.nodes {
            graph.insert_node(Node::new(name));
        }
        graph
            .edges
            .extend(raw.edges.iter().map(|(from, to)| Edge::new(from, to)));
    }

    add_edges_to_nodes(&mut graph)?;
    Ok(graph)
}

/// Records every edge as parent/child adjacency. Safe to call repeatedly.
pub fn add_edges_to_nodes(graph: &mut Graph) -> Result<()> {
    for index in 0..graph.edges.len() {
        let edge = &graph.edges[index];
        let from = resolve(graph, &edge.from, edge)?;
        let to = resolve(graph, &edge.to, edge)?;

        if from == to {
            debug!(package = %graph.node(from).name, "skipping self-reference");
            continue;
        }

        if !graph.node(from).parents.contains(&to) {
            graph.node_mut(from).add_parent(to);
        }
        if !graph.node(to).children.contains(&from) {
            graph.node_mut(to).add_child(from);
        }
    }

    Ok(())
}

fn resolve(graph: &Graph, name: &str, edge: &Edge) -> Result<NodeId> {
    graph.id_of(name).ok_or_else(|| {
        VisualizeError::MalformedGraph(format!(
            "edge {edge} references undeclared package {name}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn dot(nodes: &[&str], edges: &[(&str, &str)]) -> String {
        let mut out = String::from("digraph G {\n");
        for node in nodes {
            out.push_str(&format!("\"{node}\" [label = \"{node}\", shape = box];\n"));
        }
        for (from, to) in edges {
            out.push_str(&format!("\"{from}\" -> \"{to}\" [color = \"black\"];\n"));
        }
        out.push_str("}\n");
        out
    }

    fn names(graph: &Graph, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|id| graph.node(*id).name.clone()).collect()
    }

    #[test]
    fn dependency_points_at_its_consumer_as_parent() {
        let output = dot(
            &["h1-app", "h2-lib"],
            &[("h2-lib", "h1-app")],
        );
        let graph = build_graph(&["/nix/store/h1-app"], &[output.as_str()]).unwrap();

        assert_eq!(graph.root_package_names, ["app"]);
        let lib = graph.get("lib").unwrap();
        let app = graph.get("app").unwrap();
        assert_eq!(names(&graph, &lib.parents), ["app"]);
        assert_eq!(names(&graph, &app.children), ["lib"]);
        assert_eq!((lib.out_degree, lib.in_degree), (1, 0));
        assert_eq!((app.out_degree, app.in_degree), (0, 1));
    }

    #[test]
    fn nodes_are_shared_across_roots() {
        let first = dot(&["h1-app", "h9-glibc"], &[("h9-glibc", "h1-app")]);
        let second = dot(&["h2-tool", "h8-glibc"], &[("h8-glibc", "h2-tool")]);
        let graph = build_graph(&["h1-app", "h2-tool"], &[first.as_str(), second.as_str()]).unwrap();

        assert_eq!(graph.node_count(), 3);
        let glibc = graph.get("glibc").unwrap();
        assert_eq!(names(&graph, &glibc.parents), ["app", "tool"]);
        assert_eq!(glibc.raw_name, "h9-glibc");
    }

    #[test]
    fn self_references_are_dropped() {
        let output = dot(&["h1-app", "h2-app"], &[("h1-app", "h2-app")]);
        let graph = build_graph(&["h1-app"], &[output.as_str()]).unwrap();

        let app = graph.get("app").unwrap();
        assert!(app.parents.is_empty());
        assert!(app.children.is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edge_to_unknown_package_is_malformed() {
        let output = dot(&["h1-app"], &[("h2-ghost", "h1-app")]);
        let err = build_graph(&["h1-app"], &[output.as_str()]).unwrap_err();
        assert!(matches!(err, VisualizeError::MalformedGraph(_)));
    }

    #[test]
    fn folding_twice_keeps_adjacency() {
        let output = dot(
            &["h1-app", "h2-a", "h3-b"],
            &[("h2-a", "h1-app"), ("h3-b", "h2-a"), ("h3-b", "h1-app")],
        );
        let mut graph = build_graph(&["h1-app"], &[output.as_str()]).unwrap();
        let before = graph
            .nodes
            .iter()
            .map(|node| (node.parents.len(), node.children.len()))
            .collect::<Vec<_>>();

        add_edges_to_nodes(&mut graph).unwrap();
        let after = graph
            .nodes
            .iter()
            .map(|node| (node.parents.len(), node.children.len()))
            .collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    fn raw_name() -> impl Strategy<Value = String> {
        ("[a-z0-9]{2}", prop::sample::select(vec!["zlib", "bash", "curl", "glibc", "perl"]))
            .prop_map(|(hash, name)| format!("{hash}-{name}"))
    }

    proptest! {
        #[test]
        fn one_node_per_normalized_name(
            nodes in prop::collection::vec(raw_name(), 1..30),
            picks in prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 0..40),
        ) {
            let edges = picks
                .iter()
                .map(|(a, b)| (a.get(&nodes).as_str(), b.get(&nodes).as_str()))
                .collect::<Vec<_>>();
            let node_refs = nodes.iter().map(String::as_str).collect::<Vec<_>>();
            let output = dot(&node_refs, &edges);
            let mut graph = build_graph(&[nodes[0].as_str()], &[output.as_str()]).unwrap();

            let distinct = nodes.iter().map(|raw| package_name(raw)).collect::<HashSet<_>>();
            prop_assert_eq!(graph.node_count(), distinct.len());

            for (index, node) in graph.nodes.iter().enumerate() {
                let id = NodeId(index);
                prop_assert!(!node.parents.contains(&id));
                prop_assert!(!node.children.contains(&id));
                prop_assert_eq!(node.out_degree, node.parents.len());
                prop_assert_eq!(node.in_degree, node.children.len());
            }

            let before = graph.nodes.clone();
            add_edges_to_nodes(&mut graph).unwrap();
            for (old, new) in before.iter().zip(&graph.nodes) {
                prop_assert_eq!(&old.parents, &new.parents);
                prop_assert_eq!(&old.children, &new.children);
            }
        }
    }
}
