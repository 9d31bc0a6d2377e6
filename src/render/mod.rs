mod colormap;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use rand::Rng;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, VisualizeError};
use crate::nix::{Graph, Node};
pub use colormap::ColorMap;

const POINTS_PER_INCH: f64 = 72.0;
const BASE_FONT_POINTS: f64 = 12.0;
const EDGE_WIDTH_POINTS: f64 = 1.0;
const MARGIN_FRACTION: f64 = 0.02;

/// Node marker area in points², the way scatter plots size markers.
pub fn node_size(node: &Node, config: &Config) -> f64 {
    let max_size = config.max_node_size();
    if node.level.unwrap_or(0) == 0 {
        return max_size;
    }
    let grown = config.min_node_size
        + (node.out_degree as f64 - 1.0) * config.add_size_per_out_link as f64;
    grown.min(max_size)
}

fn canvas_size(config: &Config) -> Result<(f64, f64)> {
    let height = config.img_y_height_inches * config.dpi as f64;
    let width = height * config.aspect_ratio;
    if !(width.is_finite() && height.is_finite()) || width < 1.0 || height < 1.0 {
        return Err(VisualizeError::Render(format!(
            "image size {width:.0}x{height:.0} px is not drawable; check img_y_height_inches, \
             aspect_ratio and dpi"
        )));
    }
    Ok((width.round(), height.round()))
}

/// Maps layout coordinates onto the canvas, y pointing up.
struct Frame {
    min_x: f64,
    min_y: f64,
    scale_x: f64,
    scale_y: f64,
    pad: f64,
    height: f64,
}

impl Frame {
    fn fit(nodes: &[Node], width: f64, height: f64, pad: f64) -> Self {
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for node in nodes {
            min_x = min_x.min(node.x);
            max_x = max_x.max(node.x);
            min_y = min_y.min(node.y);
            max_y = max_y.max(node.y);
        }
        if !min_x.is_finite() {
            (min_x, max_x, min_y, max_y) = (0.0, 1.0, 0.0, 1.0);
        }

        let span_x = (max_x - min_x).max(f64::EPSILON);
        let span_y = (max_y - min_y).max(f64::EPSILON);
        let pad = pad.min(width / 2.0 - 1.0).min(height / 2.0 - 1.0).max(0.0);

        Self {
            min_x,
            min_y,
            scale_x: (width - 2.0 * pad) / span_x,
            scale_y: (height - 2.0 * pad) / span_y,
            pad,
            height,
        }
    }

    fn project(&self, node: &Node) -> (f64, f64) {
        (
            self.pad + (node.x - self.min_x) * self.scale_x,
            self.height - self.pad - (node.y - self.min_y) * self.scale_y,
        )
    }
}

/// Builds the SVG document for a laid-out graph.
///
/// Nodes are coloured by level with a little random scatter, so the
/// random source decides the exact shades.
pub fn render_svg<R: Rng + ?Sized>(graph: &Graph, config: &Config, rng: &mut R) -> Result<String> {
    let cmap = ColorMap::from_name(&config.color_map)?;
    let (width, height) = canvas_size(config)?;
    let px_per_point = config.dpi as f64 / POINTS_PER_INCH;

    let radii = graph
        .nodes
        .iter()
        .map(|node| node_size(node, config).max(0.0).sqrt() / 2.0 * px_per_point)
        .collect::<Vec<_>>();
    let largest = radii.iter().copied().fold(0.0_f64, f64::max);
    let frame = Frame::fit(
        &graph.nodes,
        width,
        height,
        largest + height * MARGIN_FRACTION,
    );
    let points = graph
        .nodes
        .iter()
        .map(|node| frame.project(node))
        .collect::<Vec<_>>();

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" \
         viewBox=\"0 0 {width:.0} {height:.0}\" font-family=\"sans-serif\">"
    );
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\" />\n");

    let _ = writeln!(
        svg,
        "  <g stroke=\"{}\" stroke-opacity=\"{}\" stroke-width=\"{:.2}\">",
        escape_xml(&config.edge_color),
        config.edge_alpha.clamp(0.0, 1.0),
        EDGE_WIDTH_POINTS * px_per_point
    );
    for (index, node) in graph.nodes.iter().enumerate() {
        let (x1, y1) = points[index];
        for parent in &node.parents {
            let (x2, y2) = points[parent.0];
            let _ = writeln!(
                svg,
                "    <line x1=\"{x1:.1}\" y1=\"{y1:.1}\" x2=\"{x2:.1}\" y2=\"{y2:.1}\" />"
            );
        }
    }
    svg.push_str("  </g>\n");

    let color_scale = 255.0 / (graph.depth as f64 + 1.0);
    svg.push_str("  <g stroke=\"none\">\n");
    for (index, node) in graph.nodes.iter().enumerate() {
        let level = node.level.unwrap_or(0) as f64;
        let value = ((level + rng.r#gen::<f64>() * config.color_scatter) * color_scale).min(255.0);
        let [r, g, b] = cmap.sample(value / 255.0);
        let (cx, cy) = points[index];
        let _ = writeln!(
            svg,
            "    <circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"{:.1}\" fill=\"#{r:02x}{g:02x}{b:02x}\" />",
            radii[index]
        );
    }
    svg.push_str("  </g>\n");

    if config.show_labels != 0 {
        let _ = writeln!(
            svg,
            "  <g fill=\"{}\" font-size=\"{:.1}\" font-weight=\"300\" text-anchor=\"middle\" \
             dominant-baseline=\"central\">",
            escape_xml(&config.font_color),
            BASE_FONT_POINTS * config.font_scale * px_per_point
        );
        for (index, node) in graph.nodes.iter().enumerate() {
            let (x, y) = points[index];
            let _ = writeln!(
                svg,
                "    <text x=\"{x:.1}\" y=\"{y:.1}\">{}</text>",
                escape_xml(&node.name)
            );
        }
        svg.push_str("  </g>\n");
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

pub fn write_frame_png<R: Rng + ?Sized>(
    graph: &Graph,
    config: &Config,
    path: &Path,
    rng: &mut R,
) -> Result<()> {
    let svg = render_svg(graph, config, rng)?;
    debug!(bytes = svg.len(), "built svg document");

    let mut options = usvg::Options::default();
    if config.show_labels != 0 {
        options.fontdb_mut().load_system_fonts();
    }

    let tree = usvg::Tree::from_str(&svg, &options)
        .map_err(|err| VisualizeError::Render(format!("failed to parse generated SVG: {err}")))?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        VisualizeError::Render(format!(
            "failed to allocate {}x{} surface",
            size.width(),
            size.height()
        ))
    })?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    let png = pixmap
        .encode_png()
        .map_err(|err| VisualizeError::Render(format!("failed to encode PNG output: {err}")))?;

    info!("Writing png file: {}", path.display());
    fs::write(path, png)
        .map_err(|err| VisualizeError::io(format!("failed to write {}", path.display()), err))
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
