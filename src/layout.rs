use rand::Rng;
use tracing::{debug, info};

use crate::config::Config;
use crate::nix::{Graph, NodeId};
use crate::util::clamp;

/// Vertical distance between levels, in layout units.
pub const LEVEL_HEIGHT: f64 = 10.0;

/// Siblings closer than this exert no repulsion.
const MIN_SIBLING_DISTANCE: f64 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    pub level_height: f64,
    pub max_displacement: f64,
    pub dt: f64,
    pub num_iterations: usize,
    pub top_level_spacing: f64,
    pub y_sublevels: usize,
    pub y_sublevel_spacing: f64,
    pub repulsive_force_normalization: f64,
    pub attractive_force_normalization: f64,
}

impl LayoutParams {
    pub fn from_config(config: &Config) -> Self {
        let num_iterations = usize::try_from(config.num_iterations).unwrap_or(0);
        let dt = if num_iterations == 0 {
            0.0
        } else {
            config.tmax / num_iterations as f64
        };

        Self {
            level_height: LEVEL_HEIGHT,
            max_displacement: LEVEL_HEIGHT * config.max_displacement,
            dt,
            num_iterations,
            top_level_spacing: config.top_level_spacing,
            y_sublevels: usize::try_from(config.y_sublevels).unwrap_or(1).max(1),
            y_sublevel_spacing: config.y_sublevel_spacing,
            repulsive_force_normalization: config.repulsive_force_normalization,
            attractive_force_normalization: config.attractive_force_normalization,
        }
    }
}

/// Per-node horizontal displacement for one step, each part already clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Displacement {
    pub parent: f64,
    pub sibling: f64,
}

/// Places every node of a leveled graph.
///
/// Roots sit evenly spaced on the top row. Every other node starts at a
/// random x and is then pulled toward the mean x of its parents and pushed
/// away from the other nodes on its level, for a fixed number of steps. Each
/// level is a horizontal band, split into `y_sublevels` staggered rows so
/// neighbours on the same level don't overlap.
pub fn add_positions<R: Rng + ?Sized>(graph: &mut Graph, params: &LayoutParams, rng: &mut R) {
    info!("Adding positions to nodes");
    initialize(graph, params, rng);

    let report_every = (params.num_iterations / 10).max(1);
    let levels = (1..graph.depth)
        .map(|level| graph.level_ids(level))
        .collect::<Vec<_>>();

    for iteration in 0..params.num_iterations {
        let mut total_abs_displacement = 0.0;

        for (offset, ids) in levels.iter().enumerate() {
            let level = offset + 1;
            assign_sublevels(graph, ids, level, params);

            let steps = displacements(graph, ids, params);
            for (&id, step) in ids.iter().zip(&steps) {
                let node = graph.node_mut(id);
                node.x += step.parent * params.dt;
                node.x += step.sibling * params.dt;
                total_abs_displacement += (step.parent * params.dt).abs()
                    + (step.sibling * params.dt).abs();
            }
        }

        if iteration % report_every == 0 {
            debug!(
                "Completed iteration {} of {}, total displacement {:.3}",
                iteration, params.num_iterations, total_abs_displacement
            );
        }
    }
}

fn initialize<R: Rng + ?Sized>(graph: &mut Graph, params: &LayoutParams, rng: &mut R) {
    let top_level = graph
        .nodes
        .iter()
        .filter(|node| node.level == Some(0))
        .count();
    let spread = (top_level + 1) as f64 * params.top_level_spacing;
    let top_y = graph.depth as f64 * params.level_height;

    let mut placed = 0usize;
    for node in &mut graph.nodes {
        if node.level == Some(0) {
            node.x = placed as f64 * params.top_level_spacing;
            node.y = top_y;
            placed += 1;
        } else {
            node.x = spread * rng.r#gen::<f64>();
        }
    }
}

fn assign_sublevels(graph: &mut Graph, ids: &[NodeId], level: usize, params: &LayoutParams) {
    let mut order = ids.to_vec();
    order.sort_by(|a, b| graph.node(*a).x.total_cmp(&graph.node(*b).x));

    let base = (graph.depth - level) as f64 * params.level_height;
    for (rank, id) in order.into_iter().enumerate() {
        let band = (rank % params.y_sublevels) as f64;
        graph.node_mut(id).y = base + band * params.y_sublevel_spacing * params.level_height;
    }
}

pub fn displacements(graph: &Graph, ids: &[NodeId], params: &LayoutParams) -> Vec<Displacement> {
    ids.iter()
        .map(|&id| {
            let node = graph.node(id);

            let parent = if node.parents.is_empty() {
                0.0
            } else {
                let pull = node
                    .parents
                    .iter()
                    .map(|&parent| graph.node(parent).x - node.x)
                    .sum::<f64>();
                params.attractive_force_normalization * pull / node.parents.len() as f64
            };

            let push = ids
                .iter()
                .map(|&sibling| graph.node(sibling).x - node.x)
                .filter(|distance| distance.abs() > MIN_SIBLING_DISTANCE)
                .map(|distance| 1.0 / distance)
                .sum::<f64>()
                * params.repulsive_force_normalization;

            Displacement {
                parent: clamp(parent, params.max_displacement),
                sibling: -clamp(push, params.max_displacement),
            }
        })
        .collect()
}
