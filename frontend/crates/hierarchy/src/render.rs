//! Per-cell drawing, independent of any canvas library.
//!
//! Each visualization mode has its own renderer producing a [`Scene`] in cell
//! coordinates; the frontend turns the shapes into canvas objects.

use crate::cell::{Cell, LoadState};
use crate::color::Rgba;
use shared::{
    GraphNode, GraphPayload, MatrixOrder, NodeId, NodeMetric, TimeSeriesPoint, VisualizationMode,
};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Inset between the cell border and its content.
pub const CELL_MARGIN: f64 = 5.0;

pub const POSITIVE_LINK: Rgba = Rgba::rgb(0x4e, 0x79, 0xa7);
pub const NEGATIVE_LINK: Rgba = Rgba::rgb(0xe1, 0x57, 0x59);
const NODE_FILL: Rgba = Rgba::rgb(0xa0, 0xcb, 0xe8);
const NODE_BORDER: Rgba = Rgba::rgb(0x20, 0x20, 0x20);
const CLUSTER_BORDER: Rgba = Rgba::rgb(0, 0, 0);
const TEXT: Rgba = Rgba::rgb(0x33, 0x33, 0x33);
const MATRIX_BACKGROUND: Rgba = Rgba::rgb(0xee, 0xee, 0xee);
const NODE_RADIUS: f64 = 5.0;
/// Radius range of metric-sized nodes.
const NODE_RADIUS_RANGE: (f64, f64) = (2.0, 8.0);

/// Metrics drawn by the line chart, with their series colours.
pub const LINE_CHART_SERIES: [(&str, Rgba); 6] = [
    ("average_clustering", Rgba::rgb(0x2d, 0x40, 0x57)),
    ("density", Rgba::rgb(0x7c, 0x8d, 0xa4)),
    ("number_of_nodes", Rgba::rgb(0xb7, 0x43, 0x3d)),
    ("number_of_edges", Rgba::rgb(0x2e, 0x75, 0x76)),
    ("number_connected_components", Rgba::rgb(0xee, 0x81, 0x1d)),
    ("transitivity", Rgba::rgb(0xaf, 0x7a, 0xa1)),
];

pub fn link_color(sentiment: f64) -> Rgba {
    if sentiment > 0.0 { POSITIVE_LINK } else { NEGATIVE_LINK }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
        color: Rgba,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        width: f64,
        color: Rgba,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        width: f64,
        color: Rgba,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Rgba,
    },
    Text {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        text: String,
        size: f64,
        color: Rgba,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub shapes: Vec<Shape>,
}

impl Scene {
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    fn centered_text(surface: Surface, text: &str) -> Self {
        let mut scene = Scene::default();
        let width = (surface.width - 2.0 * CELL_MARGIN).max(0.0);
        scene.push(Shape::Text {
            x: CELL_MARGIN,
            y: surface.height / 2.0 - 8.0,
            width,
            height: 16.0,
            text: text.to_string(),
            size: 12.0,
            color: TEXT,
        });
        scene
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

/// View settings shared by every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub matrix_order: MatrixOrder,
    pub node_size: Option<NodeMetric>,
}

pub trait CellRenderer {
    fn render(&self, cell: &Cell, surface: Surface) -> Scene;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphRenderer {
    pub node_size: Option<NodeMetric>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationRenderer {
    pub node_size: Option<NodeMetric>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixRenderer {
    pub order: MatrixOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    Graph(GraphRenderer),
    Animation(AnimationRenderer),
    Matrix(MatrixRenderer),
    Timeline(TimelineRenderer),
}

impl Renderer {
    pub fn for_mode(mode: VisualizationMode, options: RenderOptions) -> Self {
        let RenderOptions {
            matrix_order,
            node_size,
        } = options;
        match mode {
            VisualizationMode::Graph => Renderer::Graph(GraphRenderer { node_size }),
            VisualizationMode::Animation => Renderer::Animation(AnimationRenderer { node_size }),
            VisualizationMode::Matrix => Renderer::Matrix(MatrixRenderer {
                order: matrix_order,
            }),
            VisualizationMode::Timeline => Renderer::Timeline(TimelineRenderer),
        }
    }
}

impl CellRenderer for Renderer {
    fn render(&self, cell: &Cell, surface: Surface) -> Scene {
        match self {
            Renderer::Graph(renderer) => renderer.render(cell, surface),
            Renderer::Animation(renderer) => renderer.render(cell, surface),
            Renderer::Matrix(renderer) => renderer.render(cell, surface),
            Renderer::Timeline(renderer) => renderer.render(cell, surface),
        }
    }
}

/// Scene of a cell in its current state: nothing while collapsed or loading,
/// a "No data." placeholder for empty and failed loads.
pub fn scene_for(cell: &Cell, options: RenderOptions) -> Scene {
    let surface = surface_of(cell);
    if cell.is_abstract() {
        return Scene::default();
    }
    match cell.load_state() {
        LoadState::Uninitialized | LoadState::Loading => Scene::default(),
        LoadState::Empty | LoadState::Failed => Scene::centered_text(surface, "No data."),
        LoadState::Loaded => Renderer::for_mode(cell.visualization(), options).render(cell, surface),
    }
}

fn surface_of(cell: &Cell) -> Surface {
    let geometry = cell.geometry();
    Surface {
        width: geometry.width,
        height: geometry.height,
    }
}

/// Graph drawn by a node-link cell right now: the snapshot, or the current
/// animation frame.
fn node_link_graph(cell: &Cell) -> Option<&GraphPayload> {
    if cell.is_abstract() {
        return None;
    }
    match cell.visualization() {
        VisualizationMode::Graph => cell.graph(),
        VisualizationMode::Animation => cell.frames()?.get(cell.frame_index()),
        VisualizationMode::Matrix | VisualizationMode::Timeline => None,
    }
}

/// Node under a point in cell coordinates, topmost first.
pub fn node_at(cell: &Cell, options: RenderOptions, x: f64, y: f64) -> Option<NodeId> {
    let graph = node_link_graph(cell)?;
    place_nodes(graph, surface_of(cell), options.node_size)
        .into_iter()
        .rev()
        .find(|node| {
            let reach = node.radius + node.border_width;
            (node.cx - x).powi(2) + (node.cy - y).powi(2) <= reach * reach
        })
        .map(|node| node.id.clone())
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

fn scale(value: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let span = domain.1 - domain.0;
    if span.abs() < f64::EPSILON {
        return (range.0 + range.1) / 2.0;
    }
    range.0 + (value - domain.0) / span * (range.1 - range.0)
}

/// A node as drawn: centre, fill radius and border.
#[derive(Debug, Clone, PartialEq)]
struct PlacedNode<'a> {
    id: &'a NodeId,
    cx: f64,
    cy: f64,
    radius: f64,
    border_width: f64,
    is_cluster: bool,
}

/// Radius of a node under the chosen size metric. Nodes without a value, or
/// with a zero value, keep the default radius.
fn node_radius(node: &GraphNode, node_size: Option<NodeMetric>, domain: Option<(f64, f64)>) -> f64 {
    let (Some(metric), Some(domain)) = (node_size, domain) else {
        return NODE_RADIUS;
    };
    match node.metric(metric) {
        Some(value) if value != 0.0 => scale(value, domain, NODE_RADIUS_RANGE),
        _ => NODE_RADIUS,
    }
}

fn place_nodes(graph: &GraphPayload, surface: Surface, node_size: Option<NodeMetric>) -> Vec<PlacedNode<'_>> {
    let nodes: Vec<(&GraphNode, [f64; 2])> = graph
        .nodes
        .iter()
        .filter_map(|node| node.coord.map(|coord| (node, coord)))
        .collect();
    let (Some(x_domain), Some(y_domain)) = (
        extent(nodes.iter().map(|(_, coord)| coord[0])),
        extent(nodes.iter().map(|(_, coord)| coord[1])),
    ) else {
        return Vec::new();
    };
    let size_domain =
        node_size.and_then(|metric| extent(graph.nodes.iter().filter_map(|node| node.metric(metric))));
    let inset = 3.0 * CELL_MARGIN;
    let x_range = (inset, (surface.width - inset).max(inset));
    let y_range = (inset, (surface.height - inset).max(inset));
    nodes
        .into_iter()
        .map(|(node, coord)| PlacedNode {
            id: &node.id,
            cx: scale(coord[0], x_domain, x_range),
            cy: scale(coord[1], y_domain, y_range),
            radius: node_radius(node, node_size, size_domain),
            border_width: if node.is_cluster { 2.0 } else { 1.0 },
            is_cluster: node.is_cluster,
        })
        .collect()
}

fn draw_graph(graph: &GraphPayload, surface: Surface, node_size: Option<NodeMetric>, scene: &mut Scene) {
    let placed = place_nodes(graph, surface, node_size);
    let positions: HashMap<&NodeId, (f64, f64)> =
        placed.iter().map(|node| (node.id, (node.cx, node.cy))).collect();

    for link in &graph.links {
        if let (Some(from), Some(to)) = (positions.get(&link.source), positions.get(&link.target)) {
            scene.push(Shape::Line {
                from: *from,
                to: *to,
                width: 1.0,
                color: link_color(link.sentiment),
            });
        }
    }
    for node in &placed {
        let border = if node.is_cluster { CLUSTER_BORDER } else { NODE_BORDER };
        scene.push(Shape::Circle {
            cx: node.cx,
            cy: node.cy,
            radius: node.radius + node.border_width,
            color: border,
        });
        scene.push(Shape::Circle {
            cx: node.cx,
            cy: node.cy,
            radius: node.radius,
            color: NODE_FILL,
        });
    }
}

impl CellRenderer for GraphRenderer {
    fn render(&self, cell: &Cell, surface: Surface) -> Scene {
        let mut scene = Scene::default();
        if let Some(graph) = cell.graph() {
            draw_graph(graph, surface, self.node_size, &mut scene);
        }
        scene
    }
}

impl CellRenderer for AnimationRenderer {
    fn render(&self, cell: &Cell, surface: Surface) -> Scene {
        let Some(frames) = cell.frames() else {
            return Scene::default();
        };
        let Some(frame) = frames.get(cell.frame_index()) else {
            return Scene::centered_text(surface, "No data.");
        };
        let mut scene = Scene::default();
        draw_graph(frame, surface, self.node_size, &mut scene);
        scene.push(Shape::Text {
            x: CELL_MARGIN,
            y: (surface.height - CELL_MARGIN - 14.0).max(0.0),
            width: (surface.width - 2.0 * CELL_MARGIN).max(0.0),
            height: 14.0,
            text: format!("Frame {}/{}", cell.frame_index() + 1, frames.len()),
            size: 10.0,
            color: TEXT,
        });
        scene
    }
}

fn node_metric(node: &GraphNode, order: MatrixOrder) -> Option<f64> {
    order.metric().and_then(|metric| node.metric(metric))
}

/// Row and column order of the matrix, ascending; nodes lacking the metric go last.
pub fn matrix_order<'a>(nodes: &'a [GraphNode], order: MatrixOrder) -> Vec<&'a GraphNode> {
    let mut ordered: Vec<&GraphNode> = nodes.iter().collect();
    match order {
        MatrixOrder::Name => ordered.sort_by_key(|node| node.name.display()),
        _ => ordered.sort_by(|a, b| match (node_metric(a, order), node_metric(b, order)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
    ordered
}

impl CellRenderer for MatrixRenderer {
    fn render(&self, cell: &Cell, surface: Surface) -> Scene {
        let mut scene = Scene::default();
        let Some(graph) = cell.graph() else {
            return scene;
        };
        let ordered = matrix_order(&graph.nodes, self.order);
        if ordered.is_empty() {
            return scene;
        }
        let inset = 2.0 * CELL_MARGIN;
        let width = (surface.width - 2.0 * inset).max(0.0);
        let height = (surface.height - 2.0 * inset).max(0.0);
        let step_x = width / ordered.len() as f64;
        let step_y = height / ordered.len() as f64;
        let index: HashMap<&NodeId, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, node)| (&node.id, i))
            .collect();

        scene.push(Shape::Rect {
            x: inset,
            y: inset,
            width,
            height,
            color: MATRIX_BACKGROUND,
        });
        for link in &graph.links {
            let (Some(&source), Some(&target)) = (index.get(&link.source), index.get(&link.target))
            else {
                continue;
            };
            for (row, column) in [(source, target), (target, source)] {
                scene.push(Shape::Rect {
                    x: inset + column as f64 * step_x,
                    y: inset + row as f64 * step_y,
                    width: step_x,
                    height: step_y,
                    color: link_color(link.sentiment),
                });
            }
        }
        scene
    }
}

fn series_points(
    series: &[TimeSeriesPoint],
    key: &str,
) -> Vec<(chrono::DateTime<chrono::Utc>, f64)> {
    series
        .iter()
        .filter_map(|point| {
            let value = point.values.get(key)?.as_f64()?;
            Some((point.time()?, value))
        })
        .collect()
}

impl CellRenderer for TimelineRenderer {
    fn render(&self, cell: &Cell, surface: Surface) -> Scene {
        let mut scene = Scene::default();
        let Some(series) = cell.time_series() else {
            return scene;
        };
        let Some(time_domain) = extent(
            series
                .iter()
                .filter_map(TimeSeriesPoint::time)
                .map(|time| time.timestamp_millis() as f64),
        ) else {
            return Scene::centered_text(surface, "No data.");
        };
        let max_value = LINE_CHART_SERIES
            .iter()
            .flat_map(|(key, _)| series_points(series, key))
            .map(|(_, value)| value)
            .fold(1.0_f64, f64::max);

        let (left, right, top, bottom) = (30.0, 10.0, 10.0, 20.0);
        let x_range = (left, (surface.width - right).max(left));
        let y_range = ((surface.height - bottom).max(top), top);
        for (key, color) in LINE_CHART_SERIES {
            let points: Vec<(f64, f64)> = series_points(series, key)
                .into_iter()
                .map(|(time, value)| {
                    (
                        scale(time.timestamp_millis() as f64, time_domain, x_range),
                        scale(value, (0.0, max_value), y_range),
                    )
                })
                .collect();
            if points.len() > 1 {
                scene.push(Shape::Polyline {
                    points,
                    width: 1.5,
                    color,
                });
            }
        }
        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellKey;
    use shared::{GraphLink, GraphMode, NodeName};

    fn node(id: &str, name: &str, coord: [f64; 2], degree: Option<f64>) -> GraphNode {
        GraphNode {
            id: NodeId(id.into()),
            name: NodeName::Single(name.into()),
            coord: Some(coord),
            is_cluster: false,
            degree,
            clustering: None,
            degree_centrality: None,
            cluster_size: None,
        }
    }

    fn loaded_cell(mode: VisualizationMode) -> Cell {
        let mut cell = Cell::new(CellKey::new(3, 0), GraphMode::Union, mode);
        cell.geometry.width = 200.0;
        cell.geometry.height = 100.0;
        cell.store_graph(Some(GraphPayload {
            graph: None,
            nodes: vec![
                node("a", "zed", [0.0, 0.0], Some(3.0)),
                node("b", "amy", [10.0, 5.0], Some(1.0)),
            ],
            links: vec![GraphLink {
                source: NodeId("a".into()),
                target: NodeId("b".into()),
                sentiment: 0.4,
            }],
        }));
        cell
    }

    #[test]
    fn graph_scene_colors_links_by_sentiment() {
        let cell = loaded_cell(VisualizationMode::Graph);
        let scene = scene_for(&cell, RenderOptions::default());
        let line = scene.shapes.iter().find_map(|shape| match shape {
            Shape::Line { from, to, color, .. } => Some((*from, *to, *color)),
            _ => None,
        });
        let (from, to, color) = line.unwrap();
        assert_eq!(color, POSITIVE_LINK);
        assert_eq!(from, (15.0, 15.0));
        assert_eq!(to, (185.0, 85.0));
        assert_eq!(link_color(0.0), NEGATIVE_LINK);
    }

    fn fill_radii(scene: &Scene) -> Vec<f64> {
        scene
            .shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Circle { radius, color, .. } if *color == NODE_FILL => Some(*radius),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn node_size_follows_the_chosen_metric() {
        let cell = loaded_cell(VisualizationMode::Graph);
        assert_eq!(fill_radii(&scene_for(&cell, RenderOptions::default())), vec![5.0, 5.0]);

        let by_degree = RenderOptions {
            node_size: Some(NodeMetric::Degree),
            ..RenderOptions::default()
        };
        assert_eq!(fill_radii(&scene_for(&cell, by_degree)), vec![8.0, 2.0]);

        // no node carries a clustering value
        let by_clustering = RenderOptions {
            node_size: Some(NodeMetric::Clustering),
            ..RenderOptions::default()
        };
        assert_eq!(fill_radii(&scene_for(&cell, by_clustering)), vec![5.0, 5.0]);
    }

    #[test]
    fn clicked_point_resolves_to_the_node_under_it() {
        let cell = loaded_cell(VisualizationMode::Graph);
        let options = RenderOptions::default();
        assert_eq!(node_at(&cell, options, 17.0, 14.0), Some(NodeId("a".into())));
        assert_eq!(node_at(&cell, options, 185.0, 85.0), Some(NodeId("b".into())));
        assert_eq!(node_at(&cell, options, 100.0, 50.0), None);

        let small_b = RenderOptions {
            node_size: Some(NodeMetric::Degree),
            ..options
        };
        assert_eq!(node_at(&cell, small_b, 190.0, 85.0), None);

        let matrix = loaded_cell(VisualizationMode::Matrix);
        assert_eq!(node_at(&matrix, options, 15.0, 15.0), None);
    }

    #[test]
    fn abstract_and_empty_cells() {
        let mut cell = loaded_cell(VisualizationMode::Graph);
        cell.is_abstract = true;
        assert!(scene_for(&cell, RenderOptions::default()).is_empty());

        let mut empty = Cell::new(CellKey::new(2, 0), GraphMode::Union, VisualizationMode::Graph);
        empty.store_graph(None);
        let scene = scene_for(&empty, RenderOptions::default());
        assert!(matches!(&scene.shapes[0], Shape::Text { text, .. } if text == "No data."));
    }

    #[test]
    fn matrix_orders_by_name_or_metric() {
        let cell = loaded_cell(VisualizationMode::Matrix);
        let graph = cell.graph().unwrap();
        let by_name: Vec<&str> = matrix_order(&graph.nodes, MatrixOrder::Name)
            .iter()
            .map(|node| node.id.0.as_str())
            .collect();
        assert_eq!(by_name, vec!["b", "a"]);
        let by_degree: Vec<&str> = matrix_order(&graph.nodes, MatrixOrder::Degree)
            .iter()
            .map(|node| node.id.0.as_str())
            .collect();
        assert_eq!(by_degree, vec!["b", "a"]);

        let scene = scene_for(&cell, RenderOptions::default());
        // background plus both directions of the single link
        assert_eq!(scene.shapes.len(), 3);
    }

    #[test]
    fn animation_without_frames_draws_nothing_yet() {
        let cell = loaded_cell(VisualizationMode::Animation);
        assert!(scene_for(&cell, RenderOptions::default()).is_empty());
    }
}
