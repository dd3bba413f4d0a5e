use crate::controller::HierarchyController;
use crate::error::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use shared::{
    GraphMode, IntervalHit, MatrixOrder, NodeEntry, NodeId, NodeMetric, TimeSpan,
    VisualizationMode, parse_http_date,
};
use std::collections::BTreeSet;

/// Settings changes coming from the toolbar widgets.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarAction {
    Visualization(VisualizationMode),
    GraphMode(GraphMode),
    ColorMetric(Option<String>),
    MatrixOrder(MatrixOrder),
    NodeSize(Option<NodeMetric>),
    Cluster(bool),
    AutoCollapse(bool),
    MaxLevels(usize),
    MaxCells(usize),
    Reset,
}

/// Accepts `datetime-local` input values, plain dates and HTTP dates.
pub fn parse_form_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
        .or_else(|| parse_http_date(text))
}

/// Form state of the toolbar: node filter, interval lookup and search inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolbarController {
    nodes: Vec<NodeEntry>,
    node_query: String,
    filtered: BTreeSet<NodeId>,
    interval_start: String,
    interval_end: String,
    search_levels: BTreeSet<u32>,
    search_k: u32,
}

impl ToolbarController {
    pub fn new() -> Self {
        Self {
            search_k: 5,
            ..Self::default()
        }
    }

    pub fn dispatch(&self, controller: &mut HierarchyController, action: ToolbarAction) {
        log::debug!("[TOOLBAR] {action:?}");
        match action {
            ToolbarAction::Visualization(mode) => controller.change_visualization_mode(mode),
            ToolbarAction::GraphMode(mode) => controller.change_graph_mode(mode),
            ToolbarAction::ColorMetric(metric) => controller.set_color_metric(metric),
            ToolbarAction::MatrixOrder(order) => controller.set_matrix_order(order),
            ToolbarAction::NodeSize(metric) => controller.set_node_size(metric),
            ToolbarAction::Cluster(cluster) => controller.set_cluster(cluster),
            ToolbarAction::AutoCollapse(enabled) => controller.set_auto_collapse(enabled),
            ToolbarAction::MaxLevels(max) => controller.set_max_levels(max),
            ToolbarAction::MaxCells(max) => controller.set_max_cells(max),
            ToolbarAction::Reset => controller.reset_to_default(),
        }
    }

    /// Metrics offered by the colour selector.
    pub fn metric_options(&self, controller: &HierarchyController) -> Vec<String> {
        controller.session().metrics().metric_names().into_iter().collect()
    }

    // ===== NODE FILTER =====

    pub fn set_nodes(&mut self, nodes: Vec<NodeEntry>) {
        self.nodes = nodes;
    }

    pub fn set_node_query(&mut self, query: impl Into<String>) {
        self.node_query = query.into();
    }

    pub fn node_query(&self) -> &str {
        &self.node_query
    }

    /// Nodes whose name contains the query, case-insensitively.
    pub fn matching_nodes(&self) -> Vec<&NodeEntry> {
        let query = self.node_query.trim().to_lowercase();
        self.nodes
            .iter()
            .filter(|entry| query.is_empty() || entry.1.display().to_lowercase().contains(&query))
            .collect()
    }

    pub fn toggle_node(&mut self, id: NodeId) {
        if !self.filtered.remove(&id) {
            self.filtered.insert(id);
        }
    }

    /// Adds a node clicked in a cell to the filter. A selection holding every
    /// known node starts over with just this one.
    pub fn pick_node(&mut self, id: NodeId) {
        if !self.nodes.is_empty() && self.filtered.len() >= self.nodes.len() {
            self.filtered.clear();
        }
        self.filtered.insert(id);
    }

    pub fn is_node_selected(&self, id: &NodeId) -> bool {
        self.filtered.contains(id)
    }

    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.filtered.iter().cloned().collect()
    }

    /// The backend applied the filter; every cell must reload.
    pub fn finish_filter(&self, controller: &mut HierarchyController) {
        controller.reset_data();
    }

    // ===== INTERVAL LOOKUP =====

    pub fn set_interval_start(&mut self, text: impl Into<String>) {
        self.interval_start = text.into();
    }

    pub fn set_interval_end(&mut self, text: impl Into<String>) {
        self.interval_end = text.into();
    }

    pub fn interval_texts(&self) -> (&str, &str) {
        (&self.interval_start, &self.interval_end)
    }

    /// Both dates must parse, lie inside the hierarchy span and be ordered.
    pub fn interval_request(&self, hierarchy: TimeSpan) -> Result<TimeSpan, ValidationError> {
        let start = parse_form_date(&self.interval_start)
            .ok_or_else(|| ValidationError::InvalidDate(self.interval_start.clone()))?;
        let end = parse_form_date(&self.interval_end)
            .ok_or_else(|| ValidationError::InvalidDate(self.interval_end.clone()))?;
        if !hierarchy.contains(start) || !hierarchy.contains(end) {
            return Err(ValidationError::OutsideSpan {
                span: hierarchy.to_string(),
            });
        }
        if start >= end {
            return Err(ValidationError::StartNotBeforeEnd);
        }
        Ok(TimeSpan { start, end })
    }

    pub fn finish_interval(
        &self,
        controller: &mut HierarchyController,
        hit: IntervalHit,
    ) -> Result<(), ValidationError> {
        controller.add_snapshot(hit.level, hit.pos)
    }

    // ===== SIMILARITY SEARCH INPUTS =====

    pub fn toggle_search_level(&mut self, level: u32) {
        if !self.search_levels.remove(&level) {
            self.search_levels.insert(level);
        }
    }

    pub fn search_levels(&self) -> Vec<u32> {
        self.search_levels.iter().copied().collect()
    }

    pub fn set_search_k(&mut self, k: u32) {
        self.search_k = k.max(1);
    }

    pub fn search_k(&self) -> u32 {
        self.search_k
    }
}
