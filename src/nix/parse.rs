#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct RawGraph {
    pub(super) nodes: Vec<String>,
    pub(super) edges: Vec<(String, String)>,
}

/// Edge lines look like `"a" -> "b" [color = "black"];`, node lines like
/// `"a" [label = "a", shape = box];`. Anything else is ignored.
pub(super) fn parse_graph_output(raw: &str) -> RawGraph {
    let mut graph = RawGraph::default();

    for line in raw.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('"') else {
            continue;
        };
        let Some((first, rest)) = rest.split_once('"') else {
            continue;
        };

        let after = rest.trim_start();
        if let Some(target) = after.strip_prefix("->") {
            let Some(second) = leading_quoted(target.trim_start()) else {
                continue;
            };
            graph.edges.push((first.to_string(), second.to_string()));
        } else {
            graph.nodes.push(first.to_string());
        }
    }

    graph
}

fn leading_quoted(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('"')?;
    rest.split_once('"').map(|(value, _)| value)
}
