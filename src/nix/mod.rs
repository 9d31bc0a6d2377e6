mod collect;
mod graph;
mod level;
mod nix_cmd;
mod parse;

pub use collect::{add_edges_to_nodes, build_graph, collect_graph};
pub use graph::{Edge, Graph, Node, NodeId};
pub use level::assign_levels;
