//! Immutable snapshot of the explorer, published to the views after every
//! state change.

use super::state::ExplorerState;
use hierarchy::{
    CellGeometry, CellKey, HoverMark, IndicatorSlot, Legend, LoadState, Playback, PlotRow, Rgba,
    Scene,
};
use shared::{GraphMode, LevelOrdering, MatrixOrder, NodeId, NodeMetric, VisualizationMode};

#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    pub key: CellKey,
    pub geometry: CellGeometry,
    pub is_abstract: bool,
    pub color: Rgba,
    pub load_state: LoadState,
    pub graph_mode: GraphMode,
    pub visualization: VisualizationMode,
    pub frame_index: usize,
    pub frame_count: usize,
    pub playback: Playback,
    pub selected: bool,
    pub label: String,
    pub scene: Option<Scene>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelView {
    pub index: u32,
    pub y: f64,
    pub height: f64,
    pub width: f64,
    pub is_abstract: bool,
    pub window_size: u32,
    pub overlap: u32,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimelineView {
    pub start_label: String,
    pub end_label: String,
    pub track: (f64, f64),
    pub marks: Vec<HoverMark>,
    pub highlighted: Option<HoverMark>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotView {
    pub rows: Vec<PlotRow>,
    pub ordering: LevelOrdering,
    pub zoom: f64,
    pub marked_count: usize,
    pub has_results: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeOption {
    pub id: NodeId,
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolbarView {
    pub node_query: String,
    pub nodes: Vec<NodeOption>,
    pub interval_start: String,
    pub interval_end: String,
    pub search_levels: Vec<u32>,
    pub search_k: u32,
    pub metric_options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExplorerView {
    pub busy: bool,
    pub pending: usize,
    pub height: u32,
    pub visualization: VisualizationMode,
    pub graph_mode: GraphMode,
    pub matrix_order: MatrixOrder,
    pub node_size: Option<NodeMetric>,
    pub cluster: bool,
    pub auto_collapse: bool,
    pub max_levels: usize,
    pub max_cells: usize,
    pub color_metric: Option<String>,
    pub legend: Option<Legend>,
    pub levels: Vec<LevelView>,
    pub indicator: Vec<IndicatorSlot>,
    pub timeline: TimelineView,
    pub plot: PlotView,
    pub toolbar: ToolbarView,
}

impl ExplorerView {
    pub fn level(&self, index: u32) -> Option<&LevelView> {
        self.levels.iter().find(|level| level.index == index)
    }

    pub fn cell(&self, key: CellKey) -> Option<&CellView> {
        self.level(key.level)?
            .cells
            .iter()
            .find(|cell| cell.key == key)
    }

    /// Total height of the visible level rows.
    pub fn content_height(&self) -> f64 {
        self.levels
            .iter()
            .map(|level| level.y + level.height)
            .fold(0.0, f64::max)
    }
}

impl ExplorerState {
    pub fn view(&self) -> ExplorerView {
        let hierarchy = &self.hierarchy;
        let selected = hierarchy.session().selected().map(|selected| selected.key);
        let levels = hierarchy
            .levels_top_down()
            .filter(|level| level.is_visible())
            .map(|level| LevelView {
                index: level.index(),
                y: level.y(),
                height: level.height(),
                width: level.width(),
                is_abstract: level.is_abstract(),
                window_size: level.window_size(),
                overlap: level.overlap(),
                cells: level
                    .cells()
                    .filter(|cell| cell.is_visible())
                    .map(|cell| CellView {
                        key: cell.key(),
                        geometry: cell.geometry(),
                        is_abstract: cell.is_abstract(),
                        color: hierarchy.cell_color(cell.key()),
                        load_state: cell.load_state(),
                        graph_mode: cell.graph_mode(),
                        visualization: cell.visualization(),
                        frame_index: cell.frame_index(),
                        frame_count: cell.frame_count(),
                        playback: cell.playback(),
                        selected: selected == Some(cell.key()),
                        label: cell
                            .span()
                            .map_or_else(|| cell.key().to_string(), |span| span.to_string()),
                        scene: hierarchy.scene(cell.key()),
                    })
                    .collect(),
            })
            .collect();

        let (interval_start, interval_end) = self.toolbar.interval_texts();
        let toolbar = ToolbarView {
            node_query: self.toolbar.node_query().to_string(),
            nodes: self
                .toolbar
                .matching_nodes()
                .into_iter()
                .map(|entry| NodeOption {
                    id: entry.0.clone(),
                    name: entry.1.display(),
                    selected: self.toolbar.is_node_selected(&entry.0),
                })
                .collect(),
            interval_start: interval_start.to_string(),
            interval_end: interval_end.to_string(),
            search_levels: self.toolbar.search_levels(),
            search_k: self.toolbar.search_k(),
            metric_options: self.toolbar.metric_options(hierarchy),
        };

        ExplorerView {
            busy: hierarchy.is_busy(),
            pending: hierarchy.pending_requests(),
            height: hierarchy.height(),
            visualization: hierarchy.visualization(),
            graph_mode: hierarchy.graph_mode(),
            matrix_order: hierarchy.matrix_order(),
            node_size: hierarchy.node_size(),
            cluster: hierarchy.cluster(),
            auto_collapse: hierarchy.auto_collapse().enabled,
            max_levels: hierarchy.auto_collapse().max_levels,
            max_cells: hierarchy.auto_collapse().max_cells,
            color_metric: hierarchy.session().color_metric().map(str::to_string),
            legend: hierarchy.legend(),
            levels,
            indicator: self
                .indicator
                .slots(hierarchy, hierarchy.viewport().height),
            timeline: TimelineView {
                start_label: self.timeline.start_label(),
                end_label: self.timeline.end_label(),
                track: self.timeline.track(),
                marks: self.timeline.marks().to_vec(),
                highlighted: self.timeline.highlighted().copied(),
            },
            plot: PlotView {
                rows: self.query_plot.rows(hierarchy),
                ordering: self.query_plot.ordering(),
                zoom: self.query_plot.zoom(),
                marked_count: self.query_plot.marked_count(),
                has_results: self.query_plot.has_results(),
            },
            toolbar,
        }
    }
}
